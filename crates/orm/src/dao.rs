use std::sync::Arc;

use tabula_sql::{Connection, ConnectionProvider, Row};
use tracing::instrument;

use crate::delete::DeleteBuilder;
use crate::entity::EntityDescriptor;
use crate::error::{Action, Result};
use crate::hooks::{HookContext, Hooks, Outcome};
use crate::insert::InsertBuilder;
use crate::options::Options;
use crate::params::{EntityParameters, normalize};
use crate::query::QueryType;
use crate::select::{FindOptions, SelectBuilder};
use crate::update::UpdateBuilder;

/// Where a DAO gets its connection from.
#[derive(Clone, Debug)]
pub enum Session {
    /// Acquire a connection from the provider for every call.
    Pooled(Arc<dyn ConnectionProvider>),
    /// Run every call on one caller-owned connection or transaction.
    Bound(Arc<dyn Connection>),
}

impl Session {
    async fn connection(&self) -> Result<Arc<dyn Connection>> {
        match self {
            Self::Pooled(provider) => Ok(provider.acquire().await?),
            Self::Bound(connection) => Ok(Arc::clone(connection)),
        }
    }
}

/// Data access object for one entity.
///
/// Every call runs: normalize, before hook, compile, bind, execute, after
/// hook. Compilation and validation errors are raised before anything is
/// sent to the backend.
#[derive(Clone, Debug)]
pub struct Dao {
    entity: Arc<EntityDescriptor>,
    session: Session,
    hooks: Arc<Hooks>,
    options: Arc<Options>,
}

impl Dao {
    /// Creates a DAO executing through `provider`.
    #[must_use]
    pub fn new(
        entity: EntityDescriptor, provider: Arc<dyn ConnectionProvider>, hooks: Hooks,
        options: Options,
    ) -> Self {
        Self {
            entity: Arc::new(entity),
            session: Session::Pooled(provider),
            hooks: Arc::new(hooks),
            options: Arc::new(options),
        }
    }

    /// A copy of this DAO running on `connection`, typically an open
    /// transaction.
    #[must_use]
    pub fn bind(&self, connection: Arc<dyn Connection>) -> Self {
        Self {
            entity: Arc::clone(&self.entity),
            session: Session::Bound(connection),
            hooks: Arc::clone(&self.hooks),
            options: Arc::clone(&self.options),
        }
    }

    /// The entity this DAO serves.
    #[must_use]
    pub fn entity(&self) -> &EntityDescriptor {
        &self.entity
    }

    /// Compilation settings.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Find rows matching any of the items in `params`.
    ///
    /// # Errors
    ///
    /// Returns validation and compilation errors before execution, and
    /// backend errors unchanged.
    #[instrument(skip_all, fields(table = self.entity.table(), action = "find"))]
    pub async fn find(
        &self, params: impl Into<EntityParameters>, find: &FindOptions,
    ) -> Result<Vec<Row>> {
        let ctx = self.context(Action::Find, self.entity.identifier());
        let items = self.hooks.run_before(&ctx, normalize(params))?;
        let query = SelectBuilder::new(&self.entity, &self.options).build(items, find)?;

        let statement = query.bind(&self.entity)?;
        let rows = self.session.connection().await?.query(statement).await?;
        tracing::debug!(rows = rows.len(), "find complete");

        self.hooks.run_after(&ctx, &Outcome::Rows(&rows))?;
        Ok(rows)
    }

    /// Insert every item in `params`.
    ///
    /// # Errors
    ///
    /// Returns validation and compilation errors before execution, and
    /// backend errors unchanged.
    #[instrument(skip_all, fields(table = self.entity.table(), action = "insert"))]
    pub async fn insert(&self, params: impl Into<EntityParameters>) -> Result<u32> {
        let ctx = self.context(Action::Insert, self.entity.identifier());
        let items = self.hooks.run_before(&ctx, normalize(params))?;
        let query = InsertBuilder::new(&self.entity, &self.options).build(items)?;
        self.execute(&ctx, query).await
    }

    /// Update existing rows matched by `key`, the identifier when `None`.
    ///
    /// # Errors
    ///
    /// Returns validation and compilation errors before execution, and
    /// backend errors unchanged.
    #[instrument(skip_all, fields(table = self.entity.table(), action = "update"))]
    pub async fn update(
        &self, params: impl Into<EntityParameters>, key: Option<&str>,
    ) -> Result<u32> {
        let key = key.unwrap_or_else(|| self.entity.identifier());
        let ctx = self.context(Action::Update, key);
        let items = self.hooks.run_before(&ctx, normalize(params))?;
        let query = UpdateBuilder::new(&self.entity, &self.options).build(items, key)?;
        self.execute(&ctx, query).await
    }

    /// Delete rows by identifier.
    ///
    /// # Errors
    ///
    /// Returns validation and compilation errors before execution, and
    /// backend errors unchanged.
    #[instrument(skip_all, fields(table = self.entity.table(), action = "delete"))]
    pub async fn delete(&self, params: impl Into<EntityParameters>) -> Result<u32> {
        let ctx = self.context(Action::Delete, self.entity.identifier());
        let items = self.hooks.run_before(&ctx, normalize(params))?;
        let query = DeleteBuilder::new(&self.entity, &self.options).build(items)?;
        self.execute(&ctx, query).await
    }

    async fn execute(&self, ctx: &HookContext<'_>, query: QueryType) -> Result<u32> {
        let affected = if query.is_empty() {
            tracing::debug!("nothing to execute");
            0
        } else {
            let statement = query.bind(&self.entity)?;
            self.session.connection().await?.exec(statement).await?
        };

        self.hooks.run_after(ctx, &Outcome::Affected(affected))?;
        Ok(affected)
    }

    fn context<'a>(&'a self, action: Action, key: &'a str) -> HookContext<'a> {
        HookContext {
            entity: &self.entity,
            action,
            key,
        }
    }
}
