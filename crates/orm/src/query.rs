use sea_query::Value;
use tabula_sql::{Param, Statement};

use crate::entity::{EntityDescriptor, bind_value};
use crate::error::{Action, Error, Result};

/// A parameter value and the column it was taken from.
#[derive(Clone, Debug, PartialEq)]
pub struct Bound {
    /// The value.
    pub value: Value,

    /// Source column; decides the backend type at bind time.
    pub column: String,
}

/// Named parameters of a compiled statement, in the order they were added.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, Bound)>,
}

impl Params {
    /// Creates an empty parameter map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter. Names are unique within one statement.
    pub fn push(&mut self, name: String, value: Value, column: &str) {
        debug_assert!(self.get(&name).is_none(), "duplicate parameter `{name}`");
        self.entries.push((
            name,
            Bound {
                value,
                column: column.to_string(),
            },
        ));
    }

    /// Moves every parameter of `other` into `self`.
    pub fn extend(&mut self, other: Self) {
        for (name, bound) in other.entries {
            self.push(name, bound.value, &bound.column);
        }
    }

    /// The named parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Bound> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, bound)| bound)
    }

    /// Parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bound)> {
        self.entries.iter().map(|(name, bound)| (name.as_str(), bound))
    }

    /// Parameter names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Number of parameters.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when there are no parameters.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A compiled statement: SQL text plus named parameters.
///
/// An empty `sql` means there was nothing to do (for example an insert
/// without rows); the DAO skips execution for it.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryType {
    /// The action the statement was compiled for.
    pub action: Action,

    /// Parameterized SQL in the target dialect.
    pub sql: String,

    /// Named parameters referenced by `sql`.
    pub params: Params,
}

impl QueryType {
    /// A statement that does nothing.
    #[must_use]
    pub fn empty(action: Action) -> Self {
        Self {
            action,
            sql: String::new(),
            params: Params::new(),
        }
    }

    /// `true` when there is no SQL to execute.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Resolve each parameter's backend type from `entity` and coerce its
    /// value, producing a statement ready for execution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeBindingMissing`] when a parameter's column has no
    /// declared backend type, or [`Error::InvalidBinding`] when a value cannot
    /// be coerced to it.
    pub fn bind(self, entity: &EntityDescriptor) -> Result<Statement> {
        let mut params = Vec::with_capacity(self.params.len());
        for (name, bound) in self.params.entries {
            let Some(sql_type) = entity.column(&bound.column).and_then(|column| column.sql_type)
            else {
                return Err(Error::TypeBindingMissing {
                    table: entity.table().to_string(),
                    action: self.action,
                    column: bound.column,
                });
            };

            let value = bind_value(&bound.value, sql_type).map_err(|reason| {
                Error::InvalidBinding {
                    table: entity.table().to_string(),
                    action: self.action,
                    column: bound.column.clone(),
                    reason,
                }
            })?;

            params.push(Param {
                name,
                sql_type,
                value,
            });
        }

        Ok(Statement {
            sql: self.sql,
            params,
        })
    }
}

/// Quote an identifier with brackets, doubling any closing bracket.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Join statements into one batch: `;\n` separated and `;` terminated.
#[must_use]
pub fn batch(statements: Vec<String>) -> String {
    if statements.is_empty() {
        return String::new();
    }
    let mut sql = statements.join(";\n");
    sql.push(';');
    sql
}
