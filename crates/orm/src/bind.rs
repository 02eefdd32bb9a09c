//! # Parameter binder
//!
//! Emits the named parameters matching the text produced by
//! [`crate::filter`] for match predicates, and the `v`-prefixed value
//! parameters used by insert and update rows.

use sea_query::Value;

use crate::entity::{EntityDescriptor, bind_value};
use crate::error::{Action, Error, Result};
use crate::filter::Compiler;
use crate::params::EntityParameter;
use crate::query::Params;
use crate::value::{FieldValue, Operator, null};

/// Parameter name prefix for written values.
pub const VALUE_PREFIX: &str = "v";

/// Named parameters for the match predicates of `items`.
///
/// Predicates that need no value (`1=1`, `1=0`, `IS [NOT] NULL`) add nothing.
///
/// # Errors
///
/// Fails under the same conditions as [`Compiler::classify`].
pub fn bind_where(compiler: &Compiler<'_>, items: &[EntityParameter]) -> Result<Params> {
    let mut params = Params::new();
    for (i, item) in items.iter().enumerate() {
        for (f, (column, value)) in item.iter().enumerate() {
            for slot in compiler.classify(i, f, column, value)?.into_slots() {
                params.push(slot.name, slot.value, column);
            }
        }
    }
    Ok(params)
}

/// Binds one row of written values in `columns` order, returning the
/// parameter markers for the row.
///
/// Names are `v{row}_{column index}`; callers number rows across the whole
/// batch so names stay unique. A column missing from `item` is written as
/// `NULL`.
///
/// # Errors
///
/// Returns [`Error::UnsupportedValue`] when a value is an array or a field
/// query.
pub fn bind_row(
    entity: &EntityDescriptor, action: Action, row: usize, columns: &[String],
    item: &EntityParameter, params: &mut Params,
) -> Result<Vec<String>> {
    let mut markers = Vec::with_capacity(columns.len());
    for (c, column) in columns.iter().enumerate() {
        let value = match item.get(column) {
            None => null(),
            Some(FieldValue::Value(value)) => value.clone(),
            Some(FieldValue::Array(_) | FieldValue::Query(_)) => {
                return Err(Error::UnsupportedValue {
                    table: entity.table().to_string(),
                    action,
                    column: column.clone(),
                });
            }
        };

        let name = format!("{VALUE_PREFIX}{row}_{c}");
        markers.push(format!("@{name}"));
        params.push(name, value, column);
    }
    Ok(markers)
}

/// The key values named by a key column's field value.
///
/// A raw value, a raw array and an `=` or `IN` query select rows by key; any
/// other operator cannot name rows and is rejected.
///
/// # Errors
///
/// Returns [`Error::UnsupportedValue`] for any other field query.
pub fn key_values<'v>(
    entity: &EntityDescriptor, action: Action, column: &str, value: &'v FieldValue,
) -> Result<&'v [Value]> {
    match value {
        FieldValue::Value(_) | FieldValue::Array(_) => Ok(value.values()),
        FieldValue::Query(query) if matches!(query.operator, Operator::Eq | Operator::In) => {
            Ok(query.value.values())
        }
        FieldValue::Query(_) => Err(Error::UnsupportedValue {
            table: entity.table().to_string(),
            action,
            column: column.to_string(),
        }),
    }
}

/// Identity of a key value once coerced to the column's declared type, so
/// `1`, `1i64` and `"1"` on an `INT` key are the same row.
///
/// Values on untyped columns, or that do not coerce, fall back to their own
/// representation.
#[must_use]
pub fn key_identity(entity: &EntityDescriptor, column: &str, value: &Value) -> String {
    entity
        .column(column)
        .and_then(|def| def.sql_type)
        .and_then(|sql_type| bind_value(value, sql_type).ok())
        .map_or_else(|| format!("{value:?}"), |bound| format!("{bound:?}"))
}
