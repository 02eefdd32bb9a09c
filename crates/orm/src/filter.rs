//! # Predicate compiler
//!
//! Each field of each entity parameter item is classified into a
//! [`Predicate`]. The predicate renders to SQL text here and to named
//! parameters in [`crate::bind`]; both sides derive parameter names from the
//! same classification, so text and parameters always agree.
//!
//! Fragments are grouped by item: fragments of one item are AND'd, and the
//! statement builders OR the item groups together.

use sea_query::Value;

use crate::entity::EntityDescriptor;
use crate::error::{Action, Error, Result};
use crate::options::{ColumnMode, Options};
use crate::params::EntityParameter;
use crate::query::quote_ident;
use crate::value::{FieldValue, LikeMode, Operand, Operator, is_null};

/// A named parameter slot produced by classification.
#[derive(Clone, Debug, PartialEq)]
pub struct Slot {
    /// Parameter name without the `@` marker.
    pub name: String,

    /// Value to bind.
    pub value: Value,
}

impl Slot {
    fn new(name: String, value: Value) -> Self {
        Self { name, value }
    }

    fn marker(&self) -> String {
        format!("@{}", self.name)
    }
}

/// The classified form of one field predicate.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// `1=1` when `true`, `1=0` when `false`. Needs no parameters.
    Always(bool),

    /// `IS NULL`, or `IS NOT NULL` when negated.
    Null {
        /// Column name.
        column: String,
        /// Negated form.
        negated: bool,
    },

    /// One comparison per slot, OR'd (AND'd when negated).
    Compare {
        /// Column name.
        column: String,
        /// Comparison operator.
        operator: Operator,
        /// One slot per compared value.
        slots: Vec<Slot>,
    },

    /// One `LIKE` per pattern, OR'd.
    Like {
        /// Column name.
        column: String,
        /// One slot per pattern.
        slots: Vec<Slot>,
        /// Escape character appended to each fragment.
        escape: Option<char>,
    },

    /// Order-independent range.
    Between {
        /// Column name.
        column: String,
        /// First bound as given.
        low: Slot,
        /// Second bound as given.
        high: Slot,
    },

    /// Chunked membership; chunks OR'd, or AND'd for `NOT IN`.
    In {
        /// Column name.
        column: String,
        /// `NOT IN`.
        negated: bool,
        /// Value chunks, each at most the configured chunk size.
        chunks: Vec<Vec<Slot>>,
    },
}

impl Predicate {
    /// Render the predicate as a SQL fragment.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Always(true) => "1=1".to_string(),
            Self::Always(false) => "1=0".to_string(),
            Self::Null { column, negated } => {
                let not = if *negated { " NOT" } else { "" };
                format!("{} IS{not} NULL", quote_ident(column))
            }
            Self::Compare {
                column,
                operator,
                slots,
            } => {
                let col = quote_ident(column);
                let parts = slots.iter().map(|slot| format!("{col} {operator} {}", slot.marker()));
                let joiner = if operator.is_negated() { " AND " } else { " OR " };
                enclose(parts.collect(), joiner)
            }
            Self::Like {
                column,
                slots,
                escape,
            } => {
                let col = quote_ident(column);
                let escape = escape.map(|esc| format!(" ESCAPE '{esc}'")).unwrap_or_default();
                let parts =
                    slots.iter().map(|slot| format!("{col} LIKE {}{escape}", slot.marker()));
                enclose(parts.collect(), " OR ")
            }
            Self::Between { column, low, high } => {
                let (a, b) = (low.marker(), high.marker());
                format!(
                    "{} BETWEEN (CASE WHEN {a} <= {b} THEN {a} ELSE {b} END) AND (CASE WHEN {a} <= {b} THEN {b} ELSE {a} END)",
                    quote_ident(column)
                )
            }
            Self::In {
                column,
                negated,
                chunks,
            } => {
                let col = quote_ident(column);
                let operator = if *negated { Operator::NotIn } else { Operator::In };
                let parts = chunks.iter().map(|chunk| {
                    let markers = chunk.iter().map(Slot::marker).collect::<Vec<_>>().join(", ");
                    format!("{col} {operator} ({markers})")
                });
                let joiner = if *negated { " AND " } else { " OR " };
                enclose(parts.collect(), joiner)
            }
        }
    }

    /// Every parameter slot, in marker order.
    #[must_use]
    pub fn slots(&self) -> Vec<&Slot> {
        match self {
            Self::Always(_) | Self::Null { .. } => Vec::new(),
            Self::Compare { slots, .. } | Self::Like { slots, .. } => slots.iter().collect(),
            Self::Between { low, high, .. } => vec![low, high],
            Self::In { chunks, .. } => chunks.iter().flatten().collect(),
        }
    }

    /// Consume the predicate, returning its parameter slots.
    #[must_use]
    pub fn into_slots(self) -> Vec<Slot> {
        match self {
            Self::Always(_) | Self::Null { .. } => Vec::new(),
            Self::Compare { slots, .. } | Self::Like { slots, .. } => slots,
            Self::Between { low, high, .. } => vec![low, high],
            Self::In { chunks, .. } => chunks.into_iter().flatten().collect(),
        }
    }
}

fn enclose(parts: Vec<String>, joiner: &str) -> String {
    if parts.len() == 1 {
        parts.into_iter().collect()
    } else {
        format!("({})", parts.join(joiner))
    }
}

/// Classifies and compiles match predicates for one entity and action.
#[derive(Debug)]
pub struct Compiler<'a> {
    entity: &'a EntityDescriptor,
    options: &'a Options,
    action: Action,
}

impl<'a> Compiler<'a> {
    /// Parameter name prefix for match predicates.
    pub const PREFIX: &'static str = "w";

    /// Creates a compiler for predicates on `entity`.
    #[must_use]
    pub const fn new(entity: &'a EntityDescriptor, options: &'a Options, action: Action) -> Self {
        Self {
            entity,
            options,
            action,
        }
    }

    /// Classify the field at `field` of item `item`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownColumn`] for a column outside the entity in
    /// throw mode and [`Error::InvalidBetween`] for a BETWEEN operand without
    /// exactly two values.
    pub fn classify(
        &self, item: usize, field: usize, column: &str, value: &FieldValue,
    ) -> Result<Predicate> {
        if !self.entity.has_column(column) {
            match self.options.column_mode {
                ColumnMode::Ignore => return Ok(Predicate::Always(true)),
                ColumnMode::Throw => {
                    return Err(Error::UnknownColumn {
                        table: self.entity.table().to_string(),
                        action: self.action,
                        column: column.to_string(),
                    });
                }
                ColumnMode::Off => {}
            }
        }

        let base = format!("{}{item}_{field}", Self::PREFIX);
        let (operator, operand) = value.parts();
        let mode = value.like_mode().unwrap_or(self.options.like_mode);

        if operator == Operator::Between {
            let len = operand.values().len();
            return match operand {
                Operand::Array(values) => match <[Value; 2]>::try_from(values) {
                    Ok([low, high]) => Ok(Predicate::Between {
                        column: column.to_string(),
                        low: Slot::new(format!("{base}_0"), low),
                        high: Slot::new(format!("{base}_1"), high),
                    }),
                    Err(_) => Err(self.invalid_between(column, len)),
                },
                Operand::Scalar(_) => Err(self.invalid_between(column, len)),
            };
        }

        let predicate = match operand {
            Operand::Scalar(value) if is_null(&value) => Predicate::Null {
                column: column.to_string(),
                negated: operator.is_negated(),
            },
            Operand::Array(values) if values.is_empty() => {
                Predicate::Always(operator.is_negated())
            }
            operand if matches!(operator, Operator::In | Operator::NotIn) => {
                let chunks = operand
                    .values()
                    .chunks(self.options.chunk_size.max(1))
                    .enumerate()
                    .map(|(c, chunk)| {
                        chunk
                            .iter()
                            .enumerate()
                            .map(|(e, v)| Slot::new(format!("{base}_{c}_{e}"), v.clone()))
                            .collect()
                    })
                    .collect();
                Predicate::In {
                    column: column.to_string(),
                    negated: operator == Operator::NotIn,
                    chunks,
                }
            }
            Operand::Scalar(pattern) if operator == Operator::Like => Predicate::Like {
                column: column.to_string(),
                slots: vec![Slot::new(base, self.pattern(mode, pattern))],
                escape: self.options.like_escape,
            },
            Operand::Array(values) if operator == Operator::Like => {
                let slots = values
                    .into_iter()
                    .enumerate()
                    .map(|(e, v)| Slot::new(format!("{base}_{e}"), self.pattern(mode, v)))
                    .collect();
                Predicate::Like {
                    column: column.to_string(),
                    slots,
                    escape: self.options.like_escape,
                }
            }
            Operand::Scalar(value) => Predicate::Compare {
                column: column.to_string(),
                operator,
                slots: vec![Slot::new(base, value)],
            },
            Operand::Array(values) => Predicate::Compare {
                column: column.to_string(),
                operator,
                slots: values
                    .into_iter()
                    .enumerate()
                    .map(|(e, v)| Slot::new(format!("{base}_{e}"), v))
                    .collect(),
            },
        };
        Ok(predicate)
    }

    /// Classify every field of every item, grouped by item.
    ///
    /// # Errors
    ///
    /// See [`Compiler::classify`].
    pub fn predicates(&self, items: &[EntityParameter]) -> Result<Vec<Vec<Predicate>>> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.iter()
                    .enumerate()
                    .map(|(f, (column, value))| self.classify(i, f, column, value))
                    .collect()
            })
            .collect()
    }

    /// Compile SQL fragments grouped by item index.
    ///
    /// # Errors
    ///
    /// See [`Compiler::classify`].
    pub fn compile(&self, items: &[EntityParameter]) -> Result<Vec<Vec<String>>> {
        Ok(self
            .predicates(items)?
            .iter()
            .map(|group| group.iter().map(Predicate::to_sql).collect())
            .collect())
    }

    fn invalid_between(&self, column: &str, len: usize) -> Error {
        Error::InvalidBetween {
            table: self.entity.table().to_string(),
            action: self.action,
            column: column.to_string(),
            len,
        }
    }

    fn pattern(&self, mode: LikeMode, value: Value) -> Value {
        match value {
            Value::String(Some(s)) => Value::from(mode.pattern(&s, self.options.like_escape)),
            other => other,
        }
    }
}

/// Combine item groups into a WHERE condition: fragments of one group are
/// AND'd and groups are OR'd. `None` when there are no groups.
#[must_use]
pub fn where_clause(groups: &[Vec<String>]) -> Option<String> {
    let rendered: Vec<String> = groups
        .iter()
        .map(|group| if group.is_empty() { "1=1".to_string() } else { group.join(" AND ") })
        .collect();

    match rendered.len() {
        0 => None,
        1 => rendered.into_iter().next(),
        _ => Some(rendered.iter().map(|group| format!("({group})")).collect::<Vec<_>>().join(" OR ")),
    }
}
