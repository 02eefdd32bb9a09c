use std::fmt::{self, Debug};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use sea_query::Value;
use tabula_sql::{DataType, SqlType};

use crate::value::is_null;

/// Boolean-plus-message field validator: `Err(message)` rejects the value.
pub type Check = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Declared schema of one column.
#[derive(Clone)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,

    /// Backend type tag. `None` when the declared type has no backend
    /// mapping; binding such a column fails.
    pub sql_type: Option<SqlType>,

    /// Whether the column accepts `NULL`.
    pub nullable: bool,

    /// Maximum character length for character types.
    pub max_length: Option<usize>,

    /// Additional field-level validator.
    pub check: Option<Check>,
}

impl Debug for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("name", &self.name)
            .field("sql_type", &self.sql_type)
            .field("nullable", &self.nullable)
            .field("max_length", &self.max_length)
            .field("check", &self.check.is_some())
            .finish()
    }
}

impl ColumnDef {
    /// A non-nullable column of the given backend type.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type: Some(sql_type),
            nullable: false,
            max_length: None,
            check: None,
        }
    }

    /// A column whose declared type has no backend mapping.
    #[must_use]
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: None,
            nullable: true,
            max_length: None,
            check: None,
        }
    }

    /// Allows `NULL`.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Limits character length.
    #[must_use]
    pub const fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Adds a field validator.
    #[must_use]
    pub fn check(
        mut self, check: impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.check = Some(Arc::new(check));
        self
    }

    /// Validate a single value against the column's schema.
    ///
    /// `typed` turns the type and length checks on; LIKE patterns skip them.
    ///
    /// # Errors
    ///
    /// Returns the first failed check's message.
    pub fn validate(&self, value: &Value, typed: bool) -> Result<(), String> {
        if is_null(value) {
            return if self.nullable { Ok(()) } else { Err("must not be null".to_string()) };
        }

        if typed {
            if let Some(sql_type) = self.sql_type {
                bind_value(value, sql_type)?;
            }
            if let (Some(max), Some(len)) = (self.max_length, text_len(value))
                && len > max
            {
                return Err(format!("must be at most {max} characters"));
            }
        }

        self.check.as_ref().map_or(Ok(()), |check| check(value))
    }
}

/// A column of this entity referencing a key of another table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignKey {
    /// Owning column on this entity.
    pub column: String,

    /// Referenced table.
    pub table: String,

    /// Referenced column on `table`.
    pub key: String,
}

impl ForeignKey {
    /// Creates a foreign-key descriptor.
    #[must_use]
    pub fn new(column: impl Into<String>, table: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            table: table.into(),
            key: key.into(),
        }
    }
}

/// Static key and relation metadata of an entity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Relations {
    /// Primary key columns.
    pub primary_keys: Vec<String>,

    /// Unique key columns.
    pub unique_keys: Vec<String>,

    /// Columns referencing other tables.
    pub foreign_keys: Vec<ForeignKey>,

    /// Human readable entity description.
    pub description: String,
}

/// Statically declared schema of an entity: storage name, columns and
/// relations.
#[derive(Clone, Debug)]
pub struct EntityDescriptor {
    name: String,
    table: String,
    identifier: String,
    columns: Vec<ColumnDef>,
    relations: Relations,
}

impl EntityDescriptor {
    /// Starts declaring an entity with the given logical name.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> EntityDescriptorBuilder {
        EntityDescriptorBuilder {
            name: name.into(),
            table: None,
            identifier: "id".to_string(),
            columns: Vec::new(),
            relations: Relations::default(),
        }
    }

    /// Logical entity name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Storage table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Identifier column.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Declared columns, in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// The named column's declaration.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// `true` if the entity declares `name`.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Declared column names, used as the predicate whitelist.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }

    /// Key and relation metadata.
    #[must_use]
    pub const fn relations(&self) -> &Relations {
        &self.relations
    }
}

/// Builder for [`EntityDescriptor`].
#[derive(Debug)]
pub struct EntityDescriptorBuilder {
    name: String,
    table: Option<String>,
    identifier: String,
    columns: Vec<ColumnDef>,
    relations: Relations,
}

impl EntityDescriptorBuilder {
    /// Sets the storage table name explicitly.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Sets the entity description; the table name derives from it unless
    /// set explicitly.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.relations.description = description.into();
        self
    }

    /// Sets the identifier column (default `id`).
    #[must_use]
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Declares a column.
    #[must_use]
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Declares primary key columns.
    #[must_use]
    pub fn primary_keys(mut self, columns: &[&str]) -> Self {
        self.relations.primary_keys = columns.iter().map(ToString::to_string).collect();
        self
    }

    /// Declares unique key columns.
    #[must_use]
    pub fn unique_keys(mut self, columns: &[&str]) -> Self {
        self.relations.unique_keys = columns.iter().map(ToString::to_string).collect();
        self
    }

    /// Declares a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.relations.foreign_keys.push(foreign_key);
        self
    }

    /// Finish the declaration.
    #[must_use]
    pub fn build(self) -> EntityDescriptor {
        let table = self.table.unwrap_or_else(|| {
            let source = if self.relations.description.is_empty() {
                &self.name
            } else {
                &self.relations.description
            };
            storage_name(source)
        });

        let mut relations = self.relations;
        if relations.primary_keys.is_empty() {
            relations.primary_keys.push(self.identifier.clone());
        }

        EntityDescriptor {
            name: self.name,
            table,
            identifier: self.identifier,
            columns: self.columns,
            relations,
        }
    }
}

/// Derive a storage name from a description: lowercase, with runs of
/// non-alphanumeric characters collapsed to `_`.
#[must_use]
pub fn storage_name(description: &str) -> String {
    let mut name = String::with_capacity(description.len());
    for ch in description.trim().chars() {
        if ch.is_alphanumeric() {
            name.extend(ch.to_lowercase());
        } else if !name.is_empty() && !name.ends_with('_') {
            name.push('_');
        }
    }
    name.trim_end_matches('_').to_string()
}

fn text_len(value: &Value) -> Option<usize> {
    match value {
        Value::String(Some(s)) => Some(s.chars().count()),
        _ => None,
    }
}

/// Convert an engine value into the backend value for `sql_type`.
///
/// # Errors
///
/// Returns a message when the value cannot represent the declared type.
pub fn bind_value(value: &Value, sql_type: SqlType) -> Result<DataType, String> {
    if is_null(value) {
        return Ok(null_of(sql_type));
    }

    let data_type = match sql_type {
        SqlType::Bit => DataType::Boolean(Some(as_bool(value)?)),
        SqlType::TinyInt | SqlType::SmallInt | SqlType::Int => {
            let v = as_i64(value)?;
            DataType::Int32(Some(i32::try_from(v).map_err(|_e| format!("{v} is out of range"))?))
        }
        SqlType::BigInt => DataType::Int64(Some(as_i64(value)?)),
        #[allow(clippy::cast_possible_truncation)]
        SqlType::Real => DataType::Float(Some(as_f64(value)? as f32)),
        SqlType::Float | SqlType::Decimal => DataType::Double(Some(as_f64(value)?)),
        SqlType::Char
        | SqlType::NChar
        | SqlType::VarChar
        | SqlType::NVarChar
        | SqlType::Text
        | SqlType::UniqueIdentifier => DataType::Str(Some(as_string(value)?)),
        SqlType::Date => DataType::Date(Some(as_date(value)?.to_string())),
        SqlType::Time => DataType::Time(Some(as_time(value)?.to_string())),
        SqlType::DateTime | SqlType::DateTime2 => {
            DataType::Timestamp(Some(as_naive_datetime(value)?.to_string()))
        }
        SqlType::DateTimeOffset => DataType::Timestamp(Some(
            as_datetime_utc(value)?.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        )),
        SqlType::Binary | SqlType::VarBinary => DataType::Binary(Some(as_bytes(value)?)),
    };
    Ok(data_type)
}

/// Convert a value read from the backend back into an engine value.
#[must_use]
pub fn value_from_datatype(value: &DataType) -> Value {
    match value {
        DataType::Boolean(v) => Value::Bool(*v),
        DataType::Int32(v) => Value::Int(*v),
        DataType::Int64(v) => Value::BigInt(*v),
        DataType::Uint32(v) => Value::Unsigned(*v),
        DataType::Uint64(v) => Value::BigUnsigned(*v),
        DataType::Float(v) => Value::Float(*v),
        DataType::Double(v) => Value::Double(*v),
        DataType::Str(v) | DataType::Date(v) | DataType::Time(v) | DataType::Timestamp(v) => {
            Value::String(v.clone().map(Box::new))
        }
        DataType::Binary(v) => Value::Bytes(v.clone().map(Box::new)),
    }
}

const fn null_of(sql_type: SqlType) -> DataType {
    match sql_type {
        SqlType::Bit => DataType::Boolean(None),
        SqlType::TinyInt | SqlType::SmallInt | SqlType::Int => DataType::Int32(None),
        SqlType::BigInt => DataType::Int64(None),
        SqlType::Real => DataType::Float(None),
        SqlType::Float | SqlType::Decimal => DataType::Double(None),
        SqlType::Char
        | SqlType::NChar
        | SqlType::VarChar
        | SqlType::NVarChar
        | SqlType::Text
        | SqlType::UniqueIdentifier => DataType::Str(None),
        SqlType::Date => DataType::Date(None),
        SqlType::Time => DataType::Time(None),
        SqlType::DateTime | SqlType::DateTime2 | SqlType::DateTimeOffset => {
            DataType::Timestamp(None)
        }
        SqlType::Binary | SqlType::VarBinary => DataType::Binary(None),
    }
}

fn as_bool(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(Some(v)) => Ok(*v),
        Value::String(Some(s)) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(format!("expected a boolean, got `{s}`")),
        },
        _ => match as_i64(value) {
            Ok(0) => Ok(false),
            Ok(1) => Ok(true),
            _ => Err("expected a boolean".to_string()),
        },
    }
}

fn as_i64(value: &Value) -> Result<i64, String> {
    let v = match value {
        Value::TinyInt(Some(v)) => i64::from(*v),
        Value::SmallInt(Some(v)) => i64::from(*v),
        Value::Int(Some(v)) => i64::from(*v),
        Value::BigInt(Some(v)) => *v,
        Value::TinyUnsigned(Some(v)) => i64::from(*v),
        Value::SmallUnsigned(Some(v)) => i64::from(*v),
        Value::Unsigned(Some(v)) => i64::from(*v),
        Value::BigUnsigned(Some(v)) => {
            i64::try_from(*v).map_err(|_e| format!("{v} is out of range"))?
        }
        Value::String(Some(s)) => {
            s.trim().parse().map_err(|_e| format!("expected an integer, got `{s}`"))?
        }
        _ => return Err("expected an integer".to_string()),
    };
    Ok(v)
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(value: &Value) -> Result<f64, String> {
    match value {
        Value::Float(Some(v)) => Ok(f64::from(*v)),
        Value::Double(Some(v)) => Ok(*v),
        Value::String(Some(s)) => {
            s.trim().parse().map_err(|_e| format!("expected a number, got `{s}`"))
        }
        _ => as_i64(value).map(|v| v as f64).map_err(|_e| "expected a number".to_string()),
    }
}

fn as_string(value: &Value) -> Result<String, String> {
    let s = match value {
        Value::String(Some(s)) => s.as_ref().clone(),
        Value::Char(Some(c)) => c.to_string(),
        Value::Bool(Some(b)) => b.to_string(),
        Value::Float(Some(v)) => v.to_string(),
        Value::Double(Some(v)) => v.to_string(),
        Value::ChronoDate(Some(d)) => d.to_string(),
        Value::ChronoTime(Some(t)) => t.to_string(),
        Value::ChronoDateTime(Some(dt)) => dt.to_string(),
        Value::ChronoDateTimeUtc(Some(dt)) => dt.to_rfc3339(),
        _ => as_i64(value).map(|v| v.to_string()).map_err(|_e| "expected text".to_string())?,
    };
    Ok(s)
}

fn as_date(value: &Value) -> Result<NaiveDate, String> {
    match value {
        Value::ChronoDate(Some(d)) => Ok(**d),
        Value::ChronoDateTime(Some(dt)) => Ok(dt.date()),
        Value::ChronoDateTimeUtc(Some(dt)) => Ok(dt.date_naive()),
        Value::String(Some(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .or_else(|_e| as_naive_datetime(value).map(|dt| dt.date()))
            .map_err(|_e| format!("unsupported date: {s}; expected \"%Y-%m-%d\" format")),
        _ => Err("expected a date".to_string()),
    }
}

fn as_time(value: &Value) -> Result<NaiveTime, String> {
    match value {
        Value::ChronoTime(Some(t)) => Ok(**t),
        Value::String(Some(s)) => NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
            .map_err(|_e| format!("unsupported time: {s}; expected \"%H:%M:%S%.f\" format")),
        _ => Err("expected a time".to_string()),
    }
}

fn as_naive_datetime(value: &Value) -> Result<NaiveDateTime, String> {
    match value {
        Value::ChronoDateTime(Some(dt)) => Ok(**dt),
        Value::ChronoDateTimeUtc(Some(dt)) => Ok(dt.naive_utc()),
        Value::ChronoDate(Some(d)) => Ok(d.and_time(NaiveTime::MIN)),
        Value::String(Some(s)) => {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
                return Ok(parsed.naive_utc());
            }
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .or_else(|_e| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
                .map_err(|_e| {
                    format!(
                        "unsupported timestamp: {s}; expected RFC3339 or \"%Y-%m-%d %H:%M:%S%.f\" format"
                    )
                })
        }
        _ => Err("expected a timestamp".to_string()),
    }
}

fn as_datetime_utc(value: &Value) -> Result<DateTime<Utc>, String> {
    match value {
        Value::ChronoDateTimeUtc(Some(dt)) => Ok(**dt),
        Value::ChronoDateTimeWithTimeZone(Some(dt)) => Ok(dt.with_timezone(&Utc)),
        _ => as_naive_datetime(value).map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc)),
    }
}

fn as_bytes(value: &Value) -> Result<Vec<u8>, String> {
    match value {
        Value::Bytes(Some(bytes)) => Ok(bytes.as_ref().clone()),
        Value::String(Some(s)) => Ok(s.as_bytes().to_vec()),
        _ => Err("expected binary data".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::null;

    #[test]
    fn storage_name_from_description() {
        assert_eq!(storage_name("Dealer Contacts"), "dealer_contacts");
        assert_eq!(storage_name("  Order -- Line (v2) "), "order_line_v2");

        let entity = EntityDescriptor::builder("contact").description("Dealer Contacts").build();
        assert_eq!(entity.table(), "dealer_contacts");
        assert_eq!(entity.relations().primary_keys, vec!["id"]);

        let entity = EntityDescriptor::builder("contact").table("contacts").build();
        assert_eq!(entity.table(), "contacts");
    }

    #[test]
    fn bind_numeric_types() {
        assert_eq!(bind_value(&Value::BigInt(Some(42)), SqlType::Int), Ok(DataType::Int32(Some(42))));
        assert_eq!(bind_value(&"42".into(), SqlType::BigInt), Ok(DataType::Int64(Some(42))));
        assert_eq!(bind_value(&1.into(), SqlType::Bit), Ok(DataType::Boolean(Some(true))));
        assert_eq!(bind_value(&2.5f64.into(), SqlType::Decimal), Ok(DataType::Double(Some(2.5))));
        bind_value(&Value::BigInt(Some(i64::MAX)), SqlType::Int).unwrap_err();
        bind_value(&"abc".into(), SqlType::Int).unwrap_err();
    }

    #[test]
    fn bind_text_and_binary_types() {
        assert_eq!(
            bind_value(&7.into(), SqlType::NVarChar),
            Ok(DataType::Str(Some("7".to_string())))
        );
        assert_eq!(
            bind_value(&Value::Bytes(Some(Box::new(vec![1, 2]))), SqlType::VarBinary),
            Ok(DataType::Binary(Some(vec![1, 2])))
        );
    }

    #[test]
    fn bind_temporal_types() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(
            bind_value(&date.into(), SqlType::Date),
            Ok(DataType::Date(Some("2024-01-15".to_string())))
        );
        assert_eq!(
            bind_value(&"2024-01-15T10:30:45Z".into(), SqlType::DateTime2),
            Ok(DataType::Timestamp(Some("2024-01-15 10:30:45".to_string())))
        );

        let DataType::Timestamp(Some(ts)) =
            bind_value(&"2024-01-15 10:30:45".into(), SqlType::DateTimeOffset).unwrap()
        else {
            panic!("expected timestamp");
        };
        assert_eq!(ts, "2024-01-15T10:30:45Z");

        let err = bind_value(&"yesterday".into(), SqlType::DateTime).unwrap_err();
        assert!(err.contains("unsupported timestamp"));
    }

    #[test]
    fn bind_null_keeps_declared_type() {
        assert_eq!(bind_value(&null(), SqlType::Int), Ok(DataType::Int32(None)));
        assert_eq!(bind_value(&Value::Int(None), SqlType::Date), Ok(DataType::Date(None)));
    }

    #[test]
    fn validate_column() {
        let email = ColumnDef::new("email", SqlType::NVarChar).max_length(8).check(|value| {
            match value {
                Value::String(Some(s)) if s.contains('@') => Ok(()),
                _ => Err("must be an email address".to_string()),
            }
        });

        email.validate(&"a@b.io".into(), true).unwrap();
        assert_eq!(email.validate(&null(), true), Err("must not be null".to_string()));
        assert_eq!(
            email.validate(&"someone@example.com".into(), true),
            Err("must be at most 8 characters".to_string())
        );
        assert_eq!(email.validate(&"nobody".into(), true), Err("must be an email address".to_string()));

        let age = ColumnDef::new("age", SqlType::Int).nullable();
        age.validate(&null(), true).unwrap();
        age.validate(&"x".into(), true).unwrap_err();
        // untyped validation skips the coercion check
        age.validate(&"1%".into(), false).unwrap();
    }

    #[test]
    fn datatype_round_trip_for_keys() {
        assert_eq!(value_from_datatype(&DataType::Int32(Some(2))), Value::Int(Some(2)));
        assert_eq!(
            value_from_datatype(&DataType::Str(Some("a".to_string()))),
            Value::String(Some(Box::new("a".to_string())))
        );
    }
}
