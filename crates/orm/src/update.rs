use std::collections::HashSet;

use sea_query::Value;

use crate::bind::{bind_row, key_identity, key_values};
use crate::entity::EntityDescriptor;
use crate::error::{Action, Error, Result};
use crate::group::group_by_shape;
use crate::options::{ColumnMode, Options};
use crate::params::{EntityParameter, EntityParameters, normalize};
use crate::query::{Params, QueryType, batch, quote_ident};
use crate::value::FieldValue;

/// Builder for keyed `MERGE` updates.
///
/// Each item names the rows to update through its key column; an array key
/// updates every listed row with the same values. Only existing rows are
/// touched: the statement has a `WHEN MATCHED` branch and nothing else.
#[derive(Debug)]
pub struct UpdateBuilder<'a> {
    entity: &'a EntityDescriptor,
    options: &'a Options,
}

impl<'a> UpdateBuilder<'a> {
    /// Creates an UPDATE builder for `entity`.
    #[must_use]
    pub const fn new(entity: &'a EntityDescriptor, options: &'a Options) -> Self {
        Self { entity, options }
    }

    /// Build the MERGE batch keyed on `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRequiredColumn`] when an item has no key value,
    /// [`Error::UnknownColumn`] when `key` is not declared, and
    /// [`Error::UnsupportedValue`] when a non-key value is not a single value.
    pub fn build(&self, params: impl Into<EntityParameters>, key: &str) -> Result<QueryType> {
        if self.options.column_mode != ColumnMode::Off && !self.entity.has_column(key) {
            return Err(Error::UnknownColumn {
                table: self.entity.table().to_string(),
                action: Action::Update,
                column: key.to_string(),
            });
        }

        let mut rows = Vec::new();
        for item in normalize(params) {
            rows.extend(self.expand(item, key)?);
        }

        let table = quote_ident(self.entity.table());
        let key_ident = quote_ident(key);
        let mut statements = Vec::new();
        let mut params = Params::new();
        let mut row = 0;

        for group in group_by_shape(rows) {
            let set: Vec<String> = group
                .columns
                .iter()
                .filter(|column| *column != key)
                .map(|column| {
                    let column = quote_ident(column);
                    format!("target.{column} = source.{column}")
                })
                .collect();
            if set.is_empty() {
                continue;
            }

            let mut values = Vec::with_capacity(group.items.len());
            for item in &group.items {
                let markers =
                    bind_row(self.entity, Action::Update, row, &group.columns, item, &mut params)?;
                values.push(format!("({})", markers.join(", ")));
                row += 1;
            }

            let columns = group.columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ");
            statements.push(format!(
                "MERGE INTO {table} AS target USING (VALUES {}) AS source ({columns}) ON target.{key_ident} = source.{key_ident} WHEN MATCHED THEN UPDATE SET {}",
                values.join(", "),
                set.join(", ")
            ));
        }

        if statements.is_empty() {
            return Ok(QueryType::empty(Action::Update));
        }
        let sql = batch(statements);

        tracing::debug!(
            table = self.entity.table(),
            sql = %sql,
            param_count = params.len(),
            "UpdateBuilder generated SQL"
        );

        Ok(QueryType {
            action: Action::Update,
            sql,
            params,
        })
    }

    /// One row per distinct key value, each carrying the item's other values.
    fn expand(&self, item: EntityParameter, key: &str) -> Result<Vec<EntityParameter>> {
        let Some(value) = item.get(key) else {
            return Err(Error::MissingRequiredColumn {
                table: self.entity.table().to_string(),
                action: Action::Update,
                column: key.to_string(),
            });
        };

        let mut seen = HashSet::new();
        let keys: Vec<Value> = key_values(self.entity, Action::Update, key, value)?
            .iter()
            .filter(|value| seen.insert(key_identity(self.entity, key, value)))
            .cloned()
            .collect();

        Ok(keys
            .into_iter()
            .map(|value| {
                let mut row = item.clone();
                row.set(key, FieldValue::Value(value));
                row
            })
            .collect())
    }
}
