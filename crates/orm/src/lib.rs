#![doc = include_str!("../README.md")]

//! # Schema-driven SQL engine
//!
//! Compiles loosely shaped entity parameters into parameterized, batched SQL
//! for a bracket-quoted, `@name`-parameter dialect and runs it through an
//! injected [`ConnectionProvider`].
//!
//! ## Declare an entity
//!
//! ```ignore
//! use tabula_orm::{ColumnDef, EntityDescriptor, ForeignKey, SqlType};
//!
//! let posts = EntityDescriptor::builder("post")
//!     .description("Blog Posts") // table: blog_posts
//!     .column(ColumnDef::new("id", SqlType::Int))
//!     .column(ColumnDef::new("title", SqlType::NVarChar).max_length(200))
//!     .column(ColumnDef::new("author_id", SqlType::Int).nullable())
//!     .column(ColumnDef::new("created_at", SqlType::DateTime2))
//!     .foreign_key(ForeignKey::new("author_id", "users", "id"))
//!     .build();
//! ```
//!
//! ## Query
//!
//! ```ignore
//! use tabula_orm::{Dao, EntityParameter, FieldQuery, FindOptions, Hooks, Options};
//!
//! let dao = Dao::new(posts, provider, Hooks::default(), Options::from_env()?);
//!
//! // items are OR'd, fields of one item AND'd
//! let rows = dao
//!     .find(
//!         vec![
//!             EntityParameter::new()
//!                 .with_query("title", FieldQuery::like("rust").mode(LikeMode::Contains))
//!                 .with_query("created_at", FieldQuery::between(from, to)),
//!             EntityParameter::new().with_all("id", [1, 2, 3]),
//!         ],
//!         &FindOptions::default().limit(20),
//!     )
//!     .await?;
//!
//! // rows of different shapes become separate INSERT statements in one batch
//! dao.insert(vec![
//!     EntityParameter::new().with("title", "a"),
//!     EntityParameter::new().with("title", "b").with("author_id", 7),
//! ])
//! .await?;
//!
//! // MERGE ... WHEN MATCHED THEN UPDATE, keyed on `id` (or any column)
//! dao.update(EntityParameter::new().with_all("id", [1, 2]).with("title", "c"), None).await?;
//!
//! dao.delete(EntityParameter::new().with_all("id", [1, 2])).await?;
//! ```
//!
//! ## Relations
//!
//! ```ignore
//! let registry = DaoRegistry::new().with(users_dao).with(posts_dao.clone());
//! let resolved = posts_dao
//!     .find_resolved(EntityParameters::None, &FindOptions::default(), &registry, &RelationRequest::all())
//!     .await?;
//! let json = resolved_to_json(resolved);
//! ```
//!
//! ## Transactions
//!
//! ```ignore
//! with_transaction(provider.as_ref(), async |tx| {
//!     let dao = posts_dao.bind(tx);
//!     dao.insert(EntityParameter::new().with("title", "x")).await?;
//!     dao.delete(EntityParameter::new().with("id", 9)).await?;
//!     Ok(())
//! })
//! .await?;
//! ```

#![forbid(unsafe_code)]

mod bind;
mod dao;
mod delete;
mod entity;
mod error;
mod filter;
mod group;
mod hooks;
mod insert;
mod options;
mod params;
mod query;
mod registry;
mod relation;
mod select;
mod update;
mod value;

pub use tabula_sql::{
    Connection, ConnectionProvider, DataType, Field, FutureResult, Param, Row, SqlType,
    Statement, Transaction, into_json, row_to_json, with_transaction,
};

pub use self::bind::{VALUE_PREFIX, bind_row, bind_where};
pub use self::dao::{Dao, Session};
pub use self::delete::DeleteBuilder;
pub use self::entity::{
    Check, ColumnDef, EntityDescriptor, EntityDescriptorBuilder, ForeignKey, Relations,
    bind_value, storage_name, value_from_datatype,
};
pub use self::error::{Action, Error, Result, Violation};
pub use self::filter::{Compiler, Predicate, Slot, where_clause};
pub use self::group::{ShapeGroup, group_by_shape, shape_key};
pub use self::hooks::{AfterHook, BeforeHook, HookContext, Hooks, Outcome, default_before};
pub use self::insert::InsertBuilder;
pub use self::options::{ColumnMode, EnvOptions, Options};
pub use self::params::{EntityParameter, EntityParameters, normalize};
pub use self::query::{Bound, Params, QueryType, batch, quote_ident};
pub use self::registry::DaoRegistry;
pub use self::relation::{RelationRequest, Resolved, resolved_to_json};
pub use self::select::{FindOptions, OrderBy, SelectBuilder};
pub use self::update::UpdateBuilder;
pub use self::value::{FieldQuery, FieldValue, LikeMode, Operand, Operator, is_null, null};
