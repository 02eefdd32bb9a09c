use std::collections::HashSet;

use sea_query::Value;

use crate::bind::{bind_where, key_identity, key_values};
use crate::entity::EntityDescriptor;
use crate::error::{Action, Error, Result};
use crate::filter::{Compiler, where_clause};
use crate::options::Options;
use crate::params::{EntityParameter, EntityParameters, normalize};
use crate::query::{QueryType, batch, quote_ident};
use crate::value::{FieldValue, is_null};

/// Builder for `DELETE` statements keyed on the identifier column.
///
/// Only the identifier of each item is used. Key values from every item are
/// merged into one list, de-duplicated on their bound value, and deleted with
/// a single statement.
#[derive(Debug)]
pub struct DeleteBuilder<'a> {
    entity: &'a EntityDescriptor,
    options: &'a Options,
}

impl<'a> DeleteBuilder<'a> {
    /// Creates a DELETE builder for `entity`.
    #[must_use]
    pub const fn new(entity: &'a EntityDescriptor, options: &'a Options) -> Self {
        Self { entity, options }
    }

    /// Build the DELETE statement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRequiredColumn`] when no item carries a key
    /// value, and [`Error::UnsupportedValue`] when a key is given through an
    /// operator other than `=` or `IN`.
    pub fn build(&self, params: impl Into<EntityParameters>) -> Result<QueryType> {
        let key = self.entity.identifier();

        let mut seen = HashSet::new();
        let mut keys: Vec<Value> = Vec::new();
        for item in normalize(params) {
            let Some(value) = item.get(key) else {
                continue;
            };
            let values = key_values(self.entity, Action::Delete, key, value)?;
            for value in values.iter().filter(|v| !is_null(v)) {
                if seen.insert(key_identity(self.entity, key, value)) {
                    keys.push(value.clone());
                }
            }
        }

        if keys.is_empty() {
            return Err(Error::MissingRequiredColumn {
                table: self.entity.table().to_string(),
                action: Action::Delete,
                column: key.to_string(),
            });
        }

        let items = vec![EntityParameter::new().with_value(key, FieldValue::Array(keys))];
        let compiler = Compiler::new(self.entity, self.options, Action::Delete);
        let groups = compiler.compile(&items)?;
        let params = bind_where(&compiler, &items)?;

        let clause = where_clause(&groups).unwrap_or_else(|| "1=0".to_string());
        let sql = batch(vec![format!(
            "DELETE FROM {} WHERE {clause}",
            quote_ident(self.entity.table())
        )]);

        tracing::debug!(
            table = self.entity.table(),
            sql = %sql,
            param_count = params.len(),
            "DeleteBuilder generated SQL"
        );

        Ok(QueryType {
            action: Action::Delete,
            sql,
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use tabula_sql::SqlType;

    use super::*;
    use crate::entity::ColumnDef;
    use crate::value::FieldQuery;

    fn entity() -> EntityDescriptor {
        EntityDescriptor::builder("user")
            .table("users")
            .column(ColumnDef::new("id", SqlType::Int))
            .column(ColumnDef::new("name", SqlType::NVarChar))
            .build()
    }

    #[test]
    fn merges_and_dedups_keys() {
        let entity = entity();
        let options = Options::default();
        let items = vec![
            EntityParameter::new().with_all("id", [1, 2]).with("name", "ignored"),
            EntityParameter::new().with_query("id", FieldQuery::r#in([2, 3])),
            EntityParameter::new().with("id", 1),
        ];
        let query = DeleteBuilder::new(&entity, &options).build(items).unwrap();
        assert_eq!(
            query.sql,
            "DELETE FROM [users] WHERE [id] IN (@w0_0_0_0, @w0_0_0_1, @w0_0_0_2);"
        );
        let values: Vec<&Value> = query.params.iter().map(|(_, b)| &b.value).collect();
        assert_eq!(values, vec![&Value::from(1), &Value::from(2), &Value::from(3)]);
    }

    #[test]
    fn dedups_on_bound_value() {
        let entity = entity();
        let options = Options::default();
        let items = vec![
            EntityParameter::new().with("id", 1),
            EntityParameter::new().with("id", Value::BigInt(Some(1))),
            EntityParameter::new().with("id", "1"),
        ];
        let query = DeleteBuilder::new(&entity, &options).build(items).unwrap();
        assert_eq!(query.sql, "DELETE FROM [users] WHERE [id] IN (@w0_0_0_0);");
        assert_eq!(query.params.len(), 1);
    }

    #[test]
    fn rejects_non_equality_keys() {
        let entity = entity();
        let options = Options::default();
        let err = DeleteBuilder::new(&entity, &options)
            .build(EntityParameter::new().with_query("id", FieldQuery::ne(5)))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedValue { action: Action::Delete, .. }));
    }

    #[test]
    fn requires_key() {
        let entity = entity();
        let options = Options::default();
        let err = DeleteBuilder::new(&entity, &options)
            .build(EntityParameter::new().with("name", "a"))
            .unwrap_err();
        assert!(matches!(err, Error::MissingRequiredColumn { .. }));

        DeleteBuilder::new(&entity, &options).build(EntityParameters::None).unwrap_err();
    }
}
