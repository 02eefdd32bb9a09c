use std::fmt::{self, Display};
use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};

/// A typed value exchanged with the execution backend.
///
/// Every variant carries an optional payload: `None` is SQL `NULL` of that
/// type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DataType {
    /// Boolean (`BIT`).
    Boolean(Option<bool>),
    /// 32-bit signed integer.
    Int32(Option<i32>),
    /// 64-bit signed integer.
    Int64(Option<i64>),
    /// 32-bit unsigned integer.
    Uint32(Option<u32>),
    /// 64-bit unsigned integer.
    Uint64(Option<u64>),
    /// Single precision float.
    Float(Option<f32>),
    /// Double precision float.
    Double(Option<f64>),
    /// Character data.
    Str(Option<String>),
    /// Raw bytes.
    Binary(Option<Vec<u8>>),
    /// Date formatted as `%Y-%m-%d`.
    Date(Option<String>),
    /// Time of day formatted as `%H:%M:%S%.f`.
    Time(Option<String>),
    /// Timestamp, either `%Y-%m-%d %H:%M:%S%.f` or RFC 3339.
    Timestamp(Option<String>),
}

impl DataType {
    /// Returns `true` when the value is SQL `NULL`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(
            self,
            Self::Boolean(None)
                | Self::Int32(None)
                | Self::Int64(None)
                | Self::Uint32(None)
                | Self::Uint64(None)
                | Self::Float(None)
                | Self::Double(None)
                | Self::Str(None)
                | Self::Binary(None)
                | Self::Date(None)
                | Self::Time(None)
                | Self::Timestamp(None)
        )
    }
}

/// Backend storage type tag declared for a column.
///
/// Tags follow the target dialect's type names and decide how a parameter is
/// sent to the backend.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    Bit,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Real,
    Float,
    Decimal,
    Char,
    NChar,
    VarChar,
    NVarChar,
    Text,
    UniqueIdentifier,
    Date,
    Time,
    DateTime,
    DateTime2,
    DateTimeOffset,
    Binary,
    VarBinary,
}

impl SqlType {
    /// Returns `true` for character types.
    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(
            self,
            Self::Char
                | Self::NChar
                | Self::VarChar
                | Self::NVarChar
                | Self::Text
                | Self::UniqueIdentifier
        )
    }

    /// The dialect spelling of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bit => "bit",
            Self::TinyInt => "tinyint",
            Self::SmallInt => "smallint",
            Self::Int => "int",
            Self::BigInt => "bigint",
            Self::Real => "real",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Char => "char",
            Self::NChar => "nchar",
            Self::VarChar => "varchar",
            Self::NVarChar => "nvarchar",
            Self::Text => "text",
            Self::UniqueIdentifier => "uniqueidentifier",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "datetime",
            Self::DateTime2 => "datetime2",
            Self::DateTimeOffset => "datetimeoffset",
            Self::Binary => "binary",
            Self::VarBinary => "varbinary",
        }
    }
}

impl Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SqlType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        // length/precision suffixes such as `nvarchar(255)` are ignored
        let base = s.split('(').next().unwrap_or_default().trim().to_ascii_lowercase();
        let ty = match base.as_str() {
            "bit" => Self::Bit,
            "tinyint" => Self::TinyInt,
            "smallint" => Self::SmallInt,
            "int" | "integer" => Self::Int,
            "bigint" => Self::BigInt,
            "real" => Self::Real,
            "float" => Self::Float,
            "decimal" | "numeric" | "money" => Self::Decimal,
            "char" => Self::Char,
            "nchar" => Self::NChar,
            "varchar" => Self::VarChar,
            "nvarchar" => Self::NVarChar,
            "text" | "ntext" => Self::Text,
            "uniqueidentifier" => Self::UniqueIdentifier,
            "date" => Self::Date,
            "time" => Self::Time,
            "datetime" | "smalldatetime" => Self::DateTime,
            "datetime2" => Self::DateTime2,
            "datetimeoffset" => Self::DateTimeOffset,
            "binary" => Self::Binary,
            "varbinary" | "image" => Self::VarBinary,
            _ => bail!("unknown sql type `{s}`"),
        };
        Ok(ty)
    }
}

/// A named statement parameter: `@name`, its backend type tag and its value.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    /// Parameter name without the `@` marker.
    pub name: String,

    /// Backend type tag the value is sent as.
    pub sql_type: SqlType,

    /// The value.
    pub value: DataType,
}

/// SQL text plus its bound parameters, ready for execution.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Statement {
    /// Parameterized SQL, possibly several `;`-separated statements.
    pub sql: String,

    /// Parameters referenced by `sql`.
    pub params: Vec<Param>,
}

impl Statement {
    /// Look up a parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// A named column value in a result row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Column name.
    pub name: String,

    /// Column value.
    pub value: DataType,
}

/// A result row.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Backend-assigned row index.
    pub index: String,

    /// Column values in select order.
    pub fields: Vec<Field>,
}

impl Row {
    /// Value of the named column, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DataType> {
        self.fields.iter().find(|field| field.name == name).map(|field| &field.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sql_type() {
        assert_eq!("NVARCHAR(255)".parse::<SqlType>().unwrap(), SqlType::NVarChar);
        assert_eq!("datetime2".parse::<SqlType>().unwrap(), SqlType::DateTime2);
        assert_eq!("integer".parse::<SqlType>().unwrap(), SqlType::Int);
        "geography".parse::<SqlType>().unwrap_err();
    }

    #[test]
    fn row_lookup() {
        let row = Row {
            index: "0".to_string(),
            fields: vec![
                Field {
                    name: "id".to_string(),
                    value: DataType::Int32(Some(7)),
                },
                Field {
                    name: "name".to_string(),
                    value: DataType::Str(None),
                },
            ],
        };

        assert_eq!(row.get("id"), Some(&DataType::Int32(Some(7))));
        assert!(row.get("name").is_some_and(DataType::is_null));
        assert!(row.get("missing").is_none());
    }
}
