use std::fmt::{self, Display};
use std::str::FromStr;

use anyhow::anyhow;
use sea_query::Value;

/// Comparison operator of a [`FieldQuery`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`
    #[default]
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `LIKE`
    Like,
    /// `IN`
    In,
    /// `NOT IN`
    NotIn,
    /// `BETWEEN`
    Between,
}

impl Operator {
    /// SQL spelling of the operator.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Like => "LIKE",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Between => "BETWEEN",
        }
    }

    /// `!=` and `NOT IN` negate membership: an empty set makes them vacuously
    /// true, a null value makes them `IS NOT NULL`, and array expansion joins
    /// with `AND` instead of `OR`.
    #[must_use]
    pub const fn is_negated(self) -> bool {
        matches!(self, Self::Ne | Self::NotIn)
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Operator {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_uppercase();
        let op = match normalized.as_str() {
            "=" | "==" => Self::Eq,
            "!=" | "<>" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Lte,
            ">" => Self::Gt,
            ">=" => Self::Gte,
            "LIKE" => Self::Like,
            "IN" => Self::In,
            "NOT IN" => Self::NotIn,
            "BETWEEN" => Self::Between,
            _ => return Err(anyhow!("unknown operator `{s}`")),
        };
        Ok(op)
    }
}

/// How a LIKE operand is turned into a pattern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LikeMode {
    /// Use the value as the pattern, unchanged.
    #[default]
    Raw,
    /// `%value%`
    Contains,
    /// `value%`
    StartsWith,
    /// `%value`
    EndsWith,
}

impl LikeMode {
    /// Build the pattern for `value`.
    ///
    /// Outside [`LikeMode::Raw`], `%`, `_` and the escape character itself are
    /// escaped before wildcards are added, so the value matches literally.
    #[must_use]
    pub fn pattern(self, value: &str, escape: Option<char>) -> String {
        let (prefix, suffix) = match self {
            Self::Raw => return value.to_string(),
            Self::Contains => ("%", "%"),
            Self::StartsWith => ("", "%"),
            Self::EndsWith => ("%", ""),
        };

        let mut escaped = String::with_capacity(value.len() + 2);
        for ch in value.chars() {
            if let Some(esc) = escape
                && (ch == '%' || ch == '_' || ch == esc)
            {
                escaped.push(esc);
            }
            escaped.push(ch);
        }

        format!("{prefix}{escaped}{suffix}")
    }
}

impl FromStr for LikeMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "contains" => Ok(Self::Contains),
            "startswith" | "starts_with" => Ok(Self::StartsWith),
            "endswith" | "ends_with" => Ok(Self::EndsWith),
            _ => Err(anyhow!("unknown like mode `{s}`")),
        }
    }
}

/// The value side of a field query.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// A single value.
    Scalar(Value),
    /// A list of values.
    Array(Vec<Value>),
}

impl Operand {
    /// All values, a scalar as a one-element slice.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        match self {
            Self::Scalar(value) => std::slice::from_ref(value),
            Self::Array(values) => values,
        }
    }
}

/// An operator paired with a value, describing a match predicate for one
/// field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldQuery {
    /// Comparison operator.
    pub operator: Operator,

    /// Operand.
    pub value: Operand,

    /// Pattern mode for LIKE operands, overriding the configured default.
    pub like: Option<LikeMode>,
}

impl FieldQuery {
    /// Creates a field query from its parts.
    #[must_use]
    pub const fn new(operator: Operator, value: Operand) -> Self {
        Self {
            operator,
            value,
            like: None,
        }
    }

    fn scalar(operator: Operator, value: impl Into<Value>) -> Self {
        Self::new(operator, Operand::Scalar(value.into()))
    }

    fn array(operator: Operator, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::new(operator, Operand::Array(values.into_iter().map(Into::into).collect()))
    }

    /// `column = value`
    #[must_use]
    pub fn eq(value: impl Into<Value>) -> Self {
        Self::scalar(Operator::Eq, value)
    }

    /// `column != value`
    #[must_use]
    pub fn ne(value: impl Into<Value>) -> Self {
        Self::scalar(Operator::Ne, value)
    }

    /// `column < value`
    #[must_use]
    pub fn lt(value: impl Into<Value>) -> Self {
        Self::scalar(Operator::Lt, value)
    }

    /// `column <= value`
    #[must_use]
    pub fn lte(value: impl Into<Value>) -> Self {
        Self::scalar(Operator::Lte, value)
    }

    /// `column > value`
    #[must_use]
    pub fn gt(value: impl Into<Value>) -> Self {
        Self::scalar(Operator::Gt, value)
    }

    /// `column >= value`
    #[must_use]
    pub fn gte(value: impl Into<Value>) -> Self {
        Self::scalar(Operator::Gte, value)
    }

    /// `column LIKE pattern`
    #[must_use]
    pub fn like(pattern: impl Into<Value>) -> Self {
        Self::scalar(Operator::Like, pattern)
    }

    /// `column LIKE p1 OR column LIKE p2 ...`
    #[must_use]
    pub fn like_any(patterns: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::array(Operator::Like, patterns)
    }

    /// `column IN (values)`
    #[must_use]
    pub fn r#in(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::array(Operator::In, values)
    }

    /// `column NOT IN (values)`
    #[must_use]
    pub fn not_in(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::array(Operator::NotIn, values)
    }

    /// `column BETWEEN low AND high`, in either order.
    #[must_use]
    pub fn between(low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self::new(Operator::Between, Operand::Array(vec![low.into(), high.into()]))
    }

    /// Sets the LIKE pattern mode for this query.
    #[must_use]
    pub const fn mode(mut self, like: LikeMode) -> Self {
        self.like = Some(like);
        self
    }
}

/// The value stored against a field of an entity parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// A raw value, matched with `=` or written as-is.
    Value(Value),
    /// A raw list of values, matched with `IN`.
    Array(Vec<Value>),
    /// An explicit operator and operand.
    Query(FieldQuery),
}

impl FieldValue {
    /// The effective operator and operand.
    #[must_use]
    pub fn parts(&self) -> (Operator, Operand) {
        match self {
            Self::Value(value) => (Operator::Eq, Operand::Scalar(value.clone())),
            Self::Array(values) => (Operator::In, Operand::Array(values.clone())),
            Self::Query(query) => (query.operator, query.value.clone()),
        }
    }

    /// All values carried, regardless of shape.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        match self {
            Self::Value(value) => std::slice::from_ref(value),
            Self::Array(values) => values,
            Self::Query(query) => query.value.values(),
        }
    }

    /// The LIKE mode override, if any.
    #[must_use]
    pub const fn like_mode(&self) -> Option<LikeMode> {
        match self {
            Self::Query(query) => query.like,
            Self::Value(_) | Self::Array(_) => None,
        }
    }

    /// `true` for a raw null value.
    #[must_use]
    pub fn is_raw_null(&self) -> bool {
        matches!(self, Self::Value(value) if is_null(value))
    }

    /// The single value carried, when the field is scalar.
    #[must_use]
    pub const fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Value(value)
            | Self::Query(FieldQuery {
                value: Operand::Scalar(value),
                ..
            }) => Some(value),
            Self::Array(_)
            | Self::Query(FieldQuery {
                value: Operand::Array(_),
                ..
            }) => None,
        }
    }
}

impl From<FieldQuery> for FieldValue {
    fn from(query: FieldQuery) -> Self {
        Self::Query(query)
    }
}

/// An untyped SQL `NULL`.
#[must_use]
pub const fn null() -> Value {
    Value::String(None)
}

/// Returns `true` when `value` carries no payload.
#[must_use]
pub const fn is_null(value: &Value) -> bool {
    matches!(
        value,
        Value::Bool(None)
            | Value::TinyInt(None)
            | Value::SmallInt(None)
            | Value::Int(None)
            | Value::BigInt(None)
            | Value::TinyUnsigned(None)
            | Value::SmallUnsigned(None)
            | Value::Unsigned(None)
            | Value::BigUnsigned(None)
            | Value::Float(None)
            | Value::Double(None)
            | Value::String(None)
            | Value::Char(None)
            | Value::Bytes(None)
            | Value::ChronoDate(None)
            | Value::ChronoTime(None)
            | Value::ChronoDateTime(None)
            | Value::ChronoDateTimeUtc(None)
            | Value::ChronoDateTimeLocal(None)
            | Value::ChronoDateTimeWithTimeZone(None)
    )
}
