use anyhow::{Context, anyhow, bail};
use sea_query::Value;
use serde_json::Value as Json;

use crate::value::{FieldQuery, FieldValue, LikeMode, Operand, Operator, null};

/// Field name → value entries describing either what to write (insert and
/// update) or what to match (find, update target and delete target).
///
/// Entries keep insertion order; setting a column twice replaces the first
/// entry in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityParameter {
    entries: Vec<(String, FieldValue)>,
}

impl EntityParameter {
    /// Creates an empty entity parameter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `column` to a raw value.
    #[must_use]
    pub fn with(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_value(column, FieldValue::Value(value.into()))
    }

    /// Sets `column` to a raw list of values.
    #[must_use]
    pub fn with_all(
        self, column: impl Into<String>, values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        self.with_value(column, FieldValue::Array(values.into_iter().map(Into::into).collect()))
    }

    /// Sets `column` to an explicit field query.
    #[must_use]
    pub fn with_query(self, column: impl Into<String>, query: FieldQuery) -> Self {
        self.with_value(column, FieldValue::Query(query))
    }

    /// Sets `column` to `value`.
    #[must_use]
    pub fn with_value(mut self, column: impl Into<String>, value: FieldValue) -> Self {
        self.set(column, value);
        self
    }

    /// Sets `column` to `value`, replacing an existing entry in place.
    pub fn set(&mut self, column: impl Into<String>, value: FieldValue) {
        let column = column.into();
        if let Some(entry) = self.entries.iter_mut().find(|(name, _)| *name == column) {
            entry.1 = value;
        } else {
            self.entries.push((column, value));
        }
    }

    /// The value for `column`, if present.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(name, _)| name == column).map(|(_, value)| value)
    }

    /// Removes and returns the value for `column`.
    pub fn remove(&mut self, column: &str) -> Option<FieldValue> {
        let pos = self.entries.iter().position(|(name, _)| name == column)?;
        Some(self.entries.remove(pos).1)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Column names in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Column names, sorted.
    #[must_use]
    pub fn sorted_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = self.columns().collect();
        columns.sort_unstable();
        columns
    }

    /// Keeps only the entries matching `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &FieldValue) -> bool) {
        self.entries.retain(|(name, value)| keep(name, value));
    }

    /// `true` when there are no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Parse a JSON object of `column: value` entries.
    ///
    /// Values may be scalars, arrays, or `{ "operator": "...", "value": ... }`
    /// field queries (with an optional `"like"` mode).
    ///
    /// # Errors
    ///
    /// Returns an error when `json` is not an object or a field query is
    /// malformed.
    pub fn from_json(json: &Json) -> anyhow::Result<Self> {
        let Json::Object(map) = json else {
            bail!("expected an object of column values, got `{json}`");
        };

        let mut param = Self::new();
        for (column, value) in map {
            let field = field_from_json(value).with_context(|| format!("column `{column}`"))?;
            param.set(column.clone(), field);
        }
        Ok(param)
    }
}

/// One entity parameter or an ordered list of them.
///
/// List entries are alternative matches (find) or independent batch rows
/// (insert, update and delete).
#[derive(Clone, Debug, Default, PartialEq)]
pub enum EntityParameters {
    /// Nothing supplied.
    #[default]
    None,
    /// A single entity.
    One(EntityParameter),
    /// A list of entities.
    Many(Vec<EntityParameter>),
}

impl EntityParameters {
    /// Parse the loose JSON shape callers send: `null`, an object, or an array
    /// of objects.
    ///
    /// # Errors
    ///
    /// Returns an error when the JSON is neither of those shapes or an entry
    /// is malformed.
    pub fn from_json(json: &Json) -> anyhow::Result<Self> {
        match json {
            Json::Null => Ok(Self::None),
            Json::Object(_) => Ok(Self::One(EntityParameter::from_json(json)?)),
            Json::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| EntityParameter::from_json(item).with_context(|| format!("[{i}]")))
                .collect::<anyhow::Result<Vec<_>>>()
                .map(Self::Many),
            _ => bail!("expected null, an object or an array of objects, got `{json}`"),
        }
    }
}

impl From<EntityParameter> for EntityParameters {
    fn from(param: EntityParameter) -> Self {
        Self::One(param)
    }
}

impl From<Vec<EntityParameter>> for EntityParameters {
    fn from(params: Vec<EntityParameter>) -> Self {
        Self::Many(params)
    }
}

impl From<Option<EntityParameter>> for EntityParameters {
    fn from(param: Option<EntityParameter>) -> Self {
        param.map_or(Self::None, Self::One)
    }
}

/// Coerce any input shape into a list of entities.
///
/// Nothing becomes an empty list, one entity a singleton, a list itself.
#[must_use]
pub fn normalize(params: impl Into<EntityParameters>) -> Vec<EntityParameter> {
    match params.into() {
        EntityParameters::None => Vec::new(),
        EntityParameters::One(param) => vec![param],
        EntityParameters::Many(params) => params,
    }
}

fn field_from_json(json: &Json) -> anyhow::Result<FieldValue> {
    match json {
        Json::Array(items) => {
            Ok(FieldValue::Array(items.iter().map(scalar_from_json).collect::<anyhow::Result<_>>()?))
        }
        Json::Object(map) if map.contains_key("operator") => {
            let operator: Operator = map
                .get("operator")
                .and_then(Json::as_str)
                .ok_or_else(|| anyhow!("operator must be a string"))?
                .parse()?;
            let value = match map.get("value") {
                Some(Json::Array(items)) => Operand::Array(
                    items.iter().map(scalar_from_json).collect::<anyhow::Result<_>>()?,
                ),
                Some(item) => Operand::Scalar(scalar_from_json(item)?),
                None => Operand::Scalar(null()),
            };
            let like: Option<LikeMode> = map
                .get("like")
                .and_then(Json::as_str)
                .map(str::parse)
                .transpose()?;
            Ok(FieldValue::Query(FieldQuery {
                operator,
                value,
                like,
            }))
        }
        _ => Ok(FieldValue::Value(scalar_from_json(json)?)),
    }
}

fn scalar_from_json(json: &Json) -> anyhow::Result<Value> {
    let value = match json {
        Json::Null => null(),
        Json::Bool(v) => Value::from(*v),
        Json::String(v) => Value::from(v.clone()),
        Json::Number(n) => {
            if let Some(v) = n.as_i64() {
                Value::from(v)
            } else if let Some(v) = n.as_u64() {
                Value::from(v)
            } else if let Some(v) = n.as_f64() {
                Value::from(v)
            } else {
                bail!("unsupported number `{n}`")
            }
        }
        Json::Array(_) | Json::Object(_) => bail!("expected a scalar value, got `{json}`"),
    };
    Ok(value)
}
