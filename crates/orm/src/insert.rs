use crate::bind::bind_row;
use crate::entity::EntityDescriptor;
use crate::error::{Action, Result};
use crate::group::group_by_shape;
use crate::options::Options;
use crate::params::{EntityParameters, normalize};
use crate::query::{Params, QueryType, batch, quote_ident};

/// Builder for batched `INSERT` statements.
///
/// Items are grouped by column shape; each group becomes one multi-row
/// `INSERT ... VALUES` (split at the configured row limit), and all
/// statements are sent as a single batch.
#[derive(Debug)]
pub struct InsertBuilder<'a> {
    entity: &'a EntityDescriptor,
    options: &'a Options,
}

impl<'a> InsertBuilder<'a> {
    /// Creates an INSERT builder for `entity`.
    #[must_use]
    pub const fn new(entity: &'a EntityDescriptor, options: &'a Options) -> Self {
        Self { entity, options }
    }

    /// Build the INSERT batch.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnsupportedValue`] when a written value is an
    /// array or a field query.
    pub fn build(&self, params: impl Into<EntityParameters>) -> Result<QueryType> {
        let mut items = normalize(params);
        if !self.options.insert_identifier {
            for item in &mut items {
                item.remove(self.entity.identifier());
            }
        }
        items.retain(|item| !item.is_empty());

        let table = quote_ident(self.entity.table());
        let mut statements = Vec::new();
        let mut params = Params::new();
        let mut row = 0;

        for group in group_by_shape(items) {
            let columns = group.columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ");

            for chunk in group.items.chunks(self.options.max_insert_rows.max(1)) {
                let mut values = Vec::with_capacity(chunk.len());
                for item in chunk {
                    let markers =
                        bind_row(self.entity, Action::Insert, row, &group.columns, item, &mut params)?;
                    values.push(format!("({})", markers.join(", ")));
                    row += 1;
                }
                statements.push(format!(
                    "INSERT INTO {table} ({columns}) VALUES {}",
                    values.join(", ")
                ));
            }
        }

        if statements.is_empty() {
            return Ok(QueryType::empty(Action::Insert));
        }
        let sql = batch(statements);

        tracing::debug!(
            table = self.entity.table(),
            sql = %sql,
            param_count = params.len(),
            "InsertBuilder generated SQL"
        );

        Ok(QueryType {
            action: Action::Insert,
            sql,
            params,
        })
    }
}
