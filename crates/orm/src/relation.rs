//! # Relation resolution
//!
//! Batch-loads rows referenced through foreign keys and joins them to the
//! primary rows in memory.
//!
//! * Foreign keys are optionally narrowed to the requested tables.
//! * Foreign keys sharing a referenced `(table, key)` share one query.
//! * Each query is an `IN` over the distinct non-null owning values, issued
//!   through the foreign table's DAO; all queries run concurrently.
//! * Every primary row gets a related list per owning column. Null or
//!   unmatched values get an empty list.

use std::collections::{BTreeMap, HashMap, HashSet};

use futures::future::try_join_all;
use sea_query::Value;
use serde_json::{Map, Value as Json};
use tabula_sql::{DataType, Row, into_json, row_to_json};

use crate::dao::Dao;
use crate::entity::{ForeignKey, value_from_datatype};
use crate::error::{Error, Result};
use crate::params::{EntityParameter, EntityParameters};
use crate::registry::DaoRegistry;
use crate::select::FindOptions;
use crate::value::FieldValue;

/// Which relations to resolve and how to narrow them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RelationRequest {
    /// Referenced tables to resolve; all foreign keys when `None`.
    pub tables: Option<Vec<String>>,

    /// Extra match conditions per referenced table, merged into that
    /// table's query. The generated key condition takes precedence.
    pub filters: HashMap<String, EntityParameter>,
}

impl RelationRequest {
    /// Resolve every foreign key.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Resolve only foreign keys referencing `tables`.
    #[must_use]
    pub fn tables(tables: &[&str]) -> Self {
        Self {
            tables: Some(tables.iter().map(ToString::to_string).collect()),
            filters: HashMap::new(),
        }
    }

    /// Adds a filter for `table`.
    #[must_use]
    pub fn filter(mut self, table: impl Into<String>, filter: EntityParameter) -> Self {
        self.filters.insert(table.into(), filter);
        self
    }
}

/// A primary row with its related rows, keyed by owning column.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resolved {
    /// The primary row.
    pub row: Row,

    /// Related rows per owning foreign-key column.
    pub related: BTreeMap<String, Vec<Row>>,
}

impl Resolved {
    /// Render as `{ "row": {...}, "related": { column: [...] } }`.
    #[must_use]
    pub fn into_json(self) -> Json {
        let related: Map<String, Json> =
            self.related.into_iter().map(|(column, rows)| (column, into_json(rows))).collect();

        let mut map = Map::new();
        map.insert("row".to_string(), row_to_json(self.row));
        map.insert("related".to_string(), Json::Object(related));
        Json::Object(map)
    }
}

/// Render resolved rows as a JSON array.
#[must_use]
pub fn resolved_to_json(resolved: Vec<Resolved>) -> Json {
    Json::Array(resolved.into_iter().map(Resolved::into_json).collect())
}

/// Canonical join key for a value: integers of different widths compare
/// equal. `None` for NULL.
fn join_key(value: &DataType) -> Option<String> {
    let key = match value {
        DataType::Boolean(Some(v)) => v.to_string(),
        DataType::Int32(Some(v)) => v.to_string(),
        DataType::Int64(Some(v)) => v.to_string(),
        DataType::Uint32(Some(v)) => v.to_string(),
        DataType::Uint64(Some(v)) => v.to_string(),
        DataType::Float(Some(v)) => v.to_string(),
        DataType::Double(Some(v)) => v.to_string(),
        DataType::Str(Some(v))
        | DataType::Date(Some(v))
        | DataType::Time(Some(v))
        | DataType::Timestamp(Some(v)) => v.clone(),
        DataType::Binary(Some(v)) => format!("{v:?}"),
        _ => return None,
    };
    Some(key)
}

/// Foreign keys referencing one `(table, key)`.
struct Target<'a> {
    table: &'a str,
    key: &'a str,
    columns: Vec<&'a str>,
}

fn targets<'a>(foreign_keys: &'a [ForeignKey], request: &RelationRequest) -> Vec<Target<'a>> {
    if let Some(tables) = &request.tables {
        for table in tables {
            if !foreign_keys.iter().any(|fk| &fk.table == table) {
                tracing::warn!(table = %table, "no foreign key references requested table");
            }
        }
    }

    let mut targets: Vec<Target<'a>> = Vec::new();
    let wanted = foreign_keys.iter().filter(|fk| {
        request.tables.as_ref().is_none_or(|tables| tables.iter().any(|t| *t == fk.table))
    });
    for fk in wanted {
        if let Some(target) = targets.iter_mut().find(|t| t.table == fk.table && t.key == fk.key) {
            target.columns.push(fk.column.as_str());
        } else {
            targets.push(Target {
                table: &fk.table,
                key: &fk.key,
                columns: vec![fk.column.as_str()],
            });
        }
    }
    targets
}

/// Distinct non-null values of `columns` across `rows`, in first-seen order.
fn distinct_values(rows: &[Row], columns: &[&str]) -> Vec<Value> {
    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for row in rows {
        for column in columns {
            let Some(value) = row.get(column) else {
                continue;
            };
            if let Some(key) = join_key(value)
                && seen.insert(key)
            {
                values.push(value_from_datatype(value));
            }
        }
    }
    values
}

impl Dao {
    /// Resolve foreign-key relations of `rows` already fetched by this DAO.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEntity`] when a referenced table has no
    /// registered DAO, and any error raised by the foreign finds.
    pub async fn resolve(
        &self, rows: Vec<Row>, registry: &DaoRegistry, request: &RelationRequest,
    ) -> Result<Vec<Resolved>> {
        let targets = targets(&self.entity().relations().foreign_keys, request);

        let mut queries = Vec::new();
        for (i, target) in targets.iter().enumerate() {
            let values = distinct_values(&rows, &target.columns);
            if values.is_empty() {
                continue;
            }

            let dao = registry.by_table(target.table)?;
            let filter = request
                .filters
                .get(target.table)
                .cloned()
                .unwrap_or_default()
                .with_value(target.key, FieldValue::Array(values));

            tracing::debug!(
                table = target.table,
                key = target.key,
                values = filter.get(target.key).map_or(0, |v| v.values().len()),
                "resolving relation"
            );

            queries.push(async move {
                let related = dao.find(EntityParameters::One(filter), &FindOptions::default()).await?;
                Ok::<_, Error>((i, related))
            });
        }

        // join index per target: key value -> related rows
        let mut indexes: Vec<HashMap<String, Vec<Row>>> = vec![HashMap::new(); targets.len()];
        for (i, related) in try_join_all(queries).await? {
            let key = targets[i].key;
            for row in related {
                if let Some(k) = row.get(key).and_then(join_key) {
                    indexes[i].entry(k).or_default().push(row);
                }
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let mut related = BTreeMap::new();
                for (target, index) in targets.iter().zip(&indexes) {
                    for column in &target.columns {
                        let matched = row
                            .get(column)
                            .and_then(join_key)
                            .and_then(|k| index.get(&k))
                            .cloned()
                            .unwrap_or_default();
                        related.insert((*column).to_string(), matched);
                    }
                }
                Resolved { row, related }
            })
            .collect())
    }

    /// [`Dao::find`] followed by [`Dao::resolve`].
    ///
    /// # Errors
    ///
    /// See [`Dao::find`] and [`Dao::resolve`].
    pub async fn find_resolved(
        &self, params: impl Into<EntityParameters>, find: &FindOptions, registry: &DaoRegistry,
        request: &RelationRequest,
    ) -> Result<Vec<Resolved>> {
        let rows = self.find(params, find).await?;
        self.resolve(rows, registry, request).await
    }
}
