use base64ct::{Base64, Encoding};
use serde_json::{Map, Value};

use crate::types::{DataType, Row};

/// Render rows returned by a query as a JSON array of objects.
///
/// Binary values are base64 encoded; dates and timestamps keep their
/// formatted string.
#[must_use]
pub fn into_json(rows: Vec<Row>) -> Value {
    Value::Array(rows.into_iter().map(row_to_json).collect())
}

/// Render a single row as a JSON object keyed by column name.
#[must_use]
pub fn row_to_json(row: Row) -> Value {
    let mut map = Map::new();
    for field in row.fields {
        map.insert(field.name, datatype_to_json(field.value));
    }
    Value::Object(map)
}

fn datatype_to_json(value: DataType) -> Value {
    match value {
        DataType::Int32(Some(v)) => Value::Number(v.into()),
        DataType::Int64(Some(v)) => Value::Number(v.into()),
        DataType::Uint32(Some(v)) => Value::Number(v.into()),
        DataType::Uint64(Some(v)) => Value::Number(v.into()),
        DataType::Float(Some(v)) => {
            serde_json::Number::from_f64(f64::from(v)).map_or(Value::Null, Value::Number)
        }
        DataType::Double(Some(v)) => {
            serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
        }
        DataType::Str(Some(v))
        | DataType::Date(Some(v))
        | DataType::Time(Some(v))
        | DataType::Timestamp(Some(v)) => Value::String(v),
        DataType::Boolean(Some(v)) => Value::Bool(v),
        DataType::Binary(Some(v)) => Value::String(Base64::encode_string(&v)),
        DataType::Int32(None)
        | DataType::Int64(None)
        | DataType::Uint32(None)
        | DataType::Uint64(None)
        | DataType::Float(None)
        | DataType::Double(None)
        | DataType::Str(None)
        | DataType::Boolean(None)
        | DataType::Date(None)
        | DataType::Time(None)
        | DataType::Timestamp(None)
        | DataType::Binary(None) => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::Field;

    #[test]
    fn rows_as_json() {
        let rows = vec![Row {
            index: "0".to_string(),
            fields: vec![
                Field {
                    name: "id".to_string(),
                    value: DataType::Int64(Some(1)),
                },
                Field {
                    name: "avatar".to_string(),
                    value: DataType::Binary(Some(vec![1, 2, 3])),
                },
                Field {
                    name: "deleted_at".to_string(),
                    value: DataType::Timestamp(None),
                },
            ],
        }];

        assert_eq!(
            into_json(rows),
            json!([{ "id": 1, "avatar": "AQID", "deleted_at": null }])
        );
    }
}
