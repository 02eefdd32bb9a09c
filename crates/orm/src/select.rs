use sea_query::Order;

use crate::bind::bind_where;
use crate::entity::EntityDescriptor;
use crate::error::{Action, Error, Result};
use crate::filter::{Compiler, where_clause};
use crate::options::Options;
use crate::params::{EntityParameters, normalize};
use crate::query::{QueryType, batch, quote_ident};

/// One ORDER BY term.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    /// Column to sort by.
    pub column: String,

    /// Sort direction.
    pub order: Order,
}

impl OrderBy {
    /// Ascending order on `column`.
    #[must_use]
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: Order::Asc,
        }
    }

    /// Descending order on `column`.
    #[must_use]
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: Order::Desc,
        }
    }

    /// Parse a sort specification such as `"name desc, id"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOrderBy`] when a term is empty, has more than a
    /// column and a direction, or the direction is not `asc`/`desc`.
    pub fn parse(entity: &EntityDescriptor, spec: &str) -> Result<Vec<Self>> {
        let invalid = || Error::InvalidOrderBy {
            table: entity.table().to_string(),
            action: Action::Find,
            spec: spec.to_string(),
        };

        spec.split(',')
            .map(|term| {
                let mut tokens = term.split_whitespace();
                let column = tokens.next().ok_or_else(invalid)?;
                let order = match tokens.next().map(str::to_ascii_lowercase).as_deref() {
                    None | Some("asc") => Order::Asc,
                    Some("desc") => Order::Desc,
                    Some(_) => return Err(invalid()),
                };
                if tokens.next().is_some() {
                    return Err(invalid());
                }
                Ok(Self {
                    column: column.to_string(),
                    order,
                })
            })
            .collect()
    }

    fn to_sql(&self) -> String {
        let direction = match self.order {
            Order::Desc => "DESC",
            _ => "ASC",
        };
        format!("{} {direction}", quote_ident(&self.column))
    }
}

/// Ordering and paging for a find.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindOptions {
    /// Explicit sort terms.
    pub order_by: Vec<OrderBy>,

    /// Rows to skip. Setting it requests paging.
    pub offset: Option<u64>,

    /// Rows to return. Setting it requests paging.
    pub limit: Option<u64>,
}

impl FindOptions {
    /// Adds a sort term.
    #[must_use]
    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by.push(order_by);
        self
    }

    /// Sets the number of rows to skip.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the maximum number of rows to return.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    const fn paged(&self) -> bool {
        self.offset.is_some() || self.limit.is_some()
    }
}

/// Builder for `SELECT` statements.
#[derive(Debug)]
pub struct SelectBuilder<'a> {
    entity: &'a EntityDescriptor,
    options: &'a Options,
}

impl<'a> SelectBuilder<'a> {
    /// Creates a SELECT builder for `entity`.
    #[must_use]
    pub const fn new(entity: &'a EntityDescriptor, options: &'a Options) -> Self {
        Self { entity, options }
    }

    /// Build the SELECT statement. Items of `params` are alternative matches.
    ///
    /// # Errors
    ///
    /// Returns an error when a predicate cannot be compiled or a sort column
    /// is not declared on the entity.
    pub fn build(
        &self, params: impl Into<EntityParameters>, find: &FindOptions,
    ) -> Result<QueryType> {
        let items = normalize(params);
        let compiler = Compiler::new(self.entity, self.options, Action::Find);
        let groups = compiler.compile(&items)?;
        let params = bind_where(&compiler, &items)?;

        let mut sql = format!("SELECT * FROM {}", quote_ident(self.entity.table()));
        if let Some(clause) = where_clause(&groups) {
            sql.push_str(" WHERE ");
            sql.push_str(&clause);
        }

        let order = self.ordering(find)?;
        if !order.is_empty() {
            let terms = order.iter().map(OrderBy::to_sql).collect::<Vec<_>>().join(", ");
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms);
        }

        if find.paged() {
            let offset = find.offset.unwrap_or(0);
            let limit = find.limit.unwrap_or(self.options.page_size);
            sql.push_str(&format!(" OFFSET {offset} ROWS FETCH NEXT {limit} ROWS ONLY"));
        }

        let sql = batch(vec![sql]);

        tracing::debug!(
            table = self.entity.table(),
            sql = %sql,
            param_count = params.len(),
            "SelectBuilder generated SQL"
        );

        Ok(QueryType {
            action: Action::Find,
            sql,
            params,
        })
    }

    fn ordering(&self, find: &FindOptions) -> Result<Vec<OrderBy>> {
        if let Some(term) = find.order_by.iter().find(|term| !self.entity.has_column(&term.column))
        {
            return Err(Error::InvalidOrderByColumn {
                table: self.entity.table().to_string(),
                action: Action::Find,
                column: term.column.clone(),
            });
        }

        if !find.order_by.is_empty() || !find.paged() {
            return Ok(find.order_by.clone());
        }

        // paging needs a deterministic order
        let column = if self.entity.has_column(&self.options.default_order) {
            self.options.default_order.as_str()
        } else {
            self.entity.identifier()
        };
        Ok(vec![OrderBy::asc(column)])
    }
}

#[cfg(test)]
mod tests {
    use tabula_sql::SqlType;

    use super::*;
    use crate::entity::ColumnDef;
    use crate::params::EntityParameter;

    fn entity() -> EntityDescriptor {
        EntityDescriptor::builder("user")
            .table("users")
            .column(ColumnDef::new("id", SqlType::Int))
            .column(ColumnDef::new("name", SqlType::NVarChar))
            .column(ColumnDef::new("created_at", SqlType::DateTime2))
            .build()
    }

    #[test]
    fn select_all() {
        let entity = entity();
        let options = Options::default();
        let query = SelectBuilder::new(&entity, &options)
            .build(EntityParameters::None, &FindOptions::default())
            .unwrap();
        assert_eq!(query.sql, "SELECT * FROM [users];");
        assert!(query.params.is_empty());
    }

    #[test]
    fn paging_defaults_order() {
        let entity = entity();
        let options = Options::default();
        let query = SelectBuilder::new(&entity, &options)
            .build(EntityParameter::new().with("name", "a"), &FindOptions::default().offset(20))
            .unwrap();
        assert_eq!(
            query.sql,
            "SELECT * FROM [users] WHERE [name] = @w0_0 ORDER BY [created_at] ASC OFFSET 20 ROWS FETCH NEXT 100 ROWS ONLY;"
        );
    }

    #[test]
    fn paging_falls_back_to_identifier() {
        let entity = EntityDescriptor::builder("tag")
            .identifier("tag_id")
            .column(ColumnDef::new("tag_id", SqlType::Int))
            .build();
        let options = Options::default();
        let query = SelectBuilder::new(&entity, &options)
            .build(EntityParameters::None, &FindOptions::default().limit(5))
            .unwrap();
        assert!(query.sql.ends_with("ORDER BY [tag_id] ASC OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY;"));
    }

    #[test]
    fn explicit_order() {
        let entity = entity();
        let options = Options::default();
        let order_by = OrderBy::parse(&entity, "name DESC, id").unwrap();
        assert_eq!(order_by, vec![OrderBy::desc("name"), OrderBy::asc("id")]);

        let find = FindOptions {
            order_by,
            ..FindOptions::default()
        };
        let query = SelectBuilder::new(&entity, &options).build(EntityParameters::None, &find).unwrap();
        assert_eq!(query.sql, "SELECT * FROM [users] ORDER BY [name] DESC, [id] ASC;");
    }

    #[test]
    fn invalid_order() {
        let entity = entity();
        for spec in ["", "name sideways", "name asc extra", "id,,name"] {
            let err = OrderBy::parse(&entity, spec).unwrap_err();
            assert!(matches!(err, Error::InvalidOrderBy { .. }), "{spec}");
        }

        let options = Options::default();
        let find = FindOptions::default().order_by(OrderBy::asc("password"));
        let err = SelectBuilder::new(&entity, &options).build(EntityParameters::None, &find).unwrap_err();
        assert_eq!(err.to_string(), "users.find: invalid ORDER BY column `password`");
    }
}
