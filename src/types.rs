use std::any::Any;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value as JsonValue;

use crate::error::BoxError;

/// A single cell as exchanged with a driver.
///
/// Drivers read cells into this enum and accept it when binding statement
/// parameters, so the registry never has to branch on driver types:
/// ```rust
/// use sql_streams::SqlValue;
///
/// let cells = vec![SqlValue::Int(1), SqlValue::Text("alice".into()), SqlValue::Null];
/// assert!(cells[2].is_null());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Date value
    Date(NaiveDate),
    /// Time of day value
    Time(NaiveTime),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    Json(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl SqlValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SqlValue::Int(value) => Some(*value),
            SqlValue::Bool(value) => Some(i64::from(*value)),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            SqlValue::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            SqlValue::Int(value) => Some(*value as f64),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let SqlValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(value) => Some(*value),
            SqlValue::Int(1) => Some(true),
            SqlValue::Int(0) => Some(false),
            SqlValue::Text(s) => match s.as_str() {
                "1" | "true" | "TRUE" | "t" => Some(true),
                "0" | "false" | "FALSE" | "f" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            SqlValue::Timestamp(value) => Some(*value),
            SqlValue::Date(d) => d.and_hms_opt(0, 0, 0),
            SqlValue::Text(s) => {
                // Try "YYYY-MM-DD HH:MM:SS" and then with fractional seconds
                NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                    .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                    .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
                    .ok()
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            SqlValue::Date(d) => Some(*d),
            SqlValue::Timestamp(ts) => Some(ts.date()),
            SqlValue::Text(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .or_else(|| self.as_timestamp().map(|ts| ts.date())),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            SqlValue::Time(t) => Some(*t),
            SqlValue::Timestamp(ts) => Some(ts.time()),
            SqlValue::Text(s) => NaiveTime::parse_from_str(s, "%H:%M:%S%.f").ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            SqlValue::Blob(bytes) => Some(bytes),
            SqlValue::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }
}

/// The closed set of scalar kinds with builtin bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Text,
    Bytes,
    Date,
    Time,
    Timestamp,
    Json,
}

/// Encode/decode pair for a builtin scalar kind.
///
/// `decode` mirrors driver accessors that hand back the zero value for a SQL NULL
/// cell; callers must check the cursor's `was_null` signal afterwards.
pub trait SqlScalar: Default + Send + Sync + Sized + 'static {
    const KIND: ScalarKind;

    /// Convert a raw cell into the host type.
    ///
    /// # Errors
    /// Returns an error if the cell holds a value that cannot represent `Self`.
    fn decode(value: SqlValue) -> Result<Self, BoxError>;

    fn encode(&self) -> SqlValue;
}

fn mismatch<T>(kind: ScalarKind, value: &SqlValue) -> Result<T, BoxError> {
    Err(format!("cannot read {value:?} as {kind:?}").into())
}

macro_rules! impl_integer_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl SqlScalar for $ty {
                const KIND: ScalarKind = ScalarKind::$kind;

                fn decode(value: SqlValue) -> Result<Self, BoxError> {
                    if value.is_null() {
                        return Ok(Self::default());
                    }
                    match value.as_int() {
                        Some(i) => <$ty>::try_from(i).map_err(|e| {
                            format!("{i} out of range for {:?}: {e}", ScalarKind::$kind).into()
                        }),
                        None => mismatch(ScalarKind::$kind, &value),
                    }
                }

                fn encode(&self) -> SqlValue {
                    SqlValue::Int(i64::from(*self))
                }
            }
        )*
    };
}

impl_integer_scalar!(i8 => I8, i16 => I16, i32 => I32, i64 => I64);

impl SqlScalar for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn decode(value: SqlValue) -> Result<Self, BoxError> {
        if value.is_null() {
            return Ok(false);
        }
        value
            .as_bool()
            .map_or_else(|| mismatch(Self::KIND, &value), Ok)
    }

    fn encode(&self) -> SqlValue {
        SqlValue::Bool(*self)
    }
}

impl SqlScalar for f64 {
    const KIND: ScalarKind = ScalarKind::F64;

    fn decode(value: SqlValue) -> Result<Self, BoxError> {
        if value.is_null() {
            return Ok(0.0);
        }
        value
            .as_float()
            .map_or_else(|| mismatch(Self::KIND, &value), Ok)
    }

    fn encode(&self) -> SqlValue {
        SqlValue::Float(*self)
    }
}

impl SqlScalar for f32 {
    const KIND: ScalarKind = ScalarKind::F32;

    #[allow(clippy::cast_possible_truncation)]
    fn decode(value: SqlValue) -> Result<Self, BoxError> {
        if value.is_null() {
            return Ok(0.0);
        }
        value
            .as_float()
            .map_or_else(|| mismatch(Self::KIND, &value), |f| Ok(f as f32))
    }

    fn encode(&self) -> SqlValue {
        SqlValue::Float(f64::from(*self))
    }
}

impl SqlScalar for String {
    const KIND: ScalarKind = ScalarKind::Text;

    fn decode(value: SqlValue) -> Result<Self, BoxError> {
        match value {
            SqlValue::Null => Ok(String::new()),
            SqlValue::Text(s) => Ok(s),
            SqlValue::Int(i) => Ok(i.to_string()),
            SqlValue::Float(f) => Ok(f.to_string()),
            SqlValue::Bool(b) => Ok(b.to_string()),
            SqlValue::Date(d) => Ok(d.to_string()),
            SqlValue::Time(t) => Ok(t.to_string()),
            SqlValue::Timestamp(ts) => Ok(ts.format("%F %T%.f").to_string()),
            SqlValue::Json(j) => Ok(j.to_string()),
            SqlValue::Blob(b) => String::from_utf8(b).map_err(Into::into),
        }
    }

    fn encode(&self) -> SqlValue {
        SqlValue::Text(self.clone())
    }
}

impl SqlScalar for Vec<u8> {
    const KIND: ScalarKind = ScalarKind::Bytes;

    fn decode(value: SqlValue) -> Result<Self, BoxError> {
        match value {
            SqlValue::Null => Ok(Vec::new()),
            SqlValue::Blob(b) => Ok(b),
            SqlValue::Text(s) => Ok(s.into_bytes()),
            other => mismatch(Self::KIND, &other),
        }
    }

    fn encode(&self) -> SqlValue {
        SqlValue::Blob(self.clone())
    }
}

impl SqlScalar for NaiveDate {
    const KIND: ScalarKind = ScalarKind::Date;

    fn decode(value: SqlValue) -> Result<Self, BoxError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        value
            .as_date()
            .map_or_else(|| mismatch(Self::KIND, &value), Ok)
    }

    fn encode(&self) -> SqlValue {
        SqlValue::Date(*self)
    }
}

impl SqlScalar for NaiveTime {
    const KIND: ScalarKind = ScalarKind::Time;

    fn decode(value: SqlValue) -> Result<Self, BoxError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        value
            .as_time()
            .map_or_else(|| mismatch(Self::KIND, &value), Ok)
    }

    fn encode(&self) -> SqlValue {
        SqlValue::Time(*self)
    }
}

impl SqlScalar for NaiveDateTime {
    const KIND: ScalarKind = ScalarKind::Timestamp;

    fn decode(value: SqlValue) -> Result<Self, BoxError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        value
            .as_timestamp()
            .map_or_else(|| mismatch(Self::KIND, &value), Ok)
    }

    fn encode(&self) -> SqlValue {
        SqlValue::Timestamp(*self)
    }
}

impl SqlScalar for JsonValue {
    const KIND: ScalarKind = ScalarKind::Json;

    fn decode(value: SqlValue) -> Result<Self, BoxError> {
        match value {
            SqlValue::Null => Ok(JsonValue::Null),
            SqlValue::Json(j) => Ok(j),
            SqlValue::Text(s) => serde_json::from_str(&s).map_err(Into::into),
            other => mismatch(Self::KIND, &other),
        }
    }

    fn encode(&self) -> SqlValue {
        SqlValue::Json(self.clone())
    }
}

/// A fieldless enum stored as its ordinal position.
///
/// Usually implemented through [`sql_enum!`](crate::sql_enum).
pub trait SqlEnum: Clone + Send + Sync + Sized + 'static {
    /// Declared constants, in ordinal order.
    const CONSTANTS: &'static [Self];

    fn ordinal(&self) -> usize;

    #[must_use]
    fn from_ordinal(ordinal: usize) -> Option<Self> {
        Self::CONSTANTS.get(ordinal).cloned()
    }
}

/// A value that can be bound to a statement parameter.
///
/// Binding dispatches on the runtime type behind `as_any`; enumerated values
/// report an ordinal and skip the registry.
pub trait SqlParam: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn type_name(&self) -> &'static str;

    fn enum_ordinal(&self) -> Option<usize> {
        None
    }
}

crate::sql_param!(
    bool,
    i8,
    i16,
    i32,
    i64,
    f32,
    f64,
    String,
    Vec<u8>,
    NaiveDate,
    NaiveTime,
    NaiveDateTime,
    JsonValue,
    SqlValue,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_decodes_to_zero_value() {
        assert_eq!(i32::decode(SqlValue::Null).unwrap(), 0);
        assert_eq!(String::decode(SqlValue::Null).unwrap(), "");
        assert!(!bool::decode(SqlValue::Null).unwrap());
    }

    #[test]
    fn integers_do_not_overflow_silently() {
        let err = i8::decode(SqlValue::Int(300)).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn timestamps_parse_from_text() {
        let ts = NaiveDateTime::decode(SqlValue::Text("2024-02-03 04:05:06.789".into())).unwrap();
        assert_eq!(ts.format("%F %T%.3f").to_string(), "2024-02-03 04:05:06.789");
    }

    #[test]
    fn bools_accept_integer_flags() {
        assert!(bool::decode(SqlValue::Int(1)).unwrap());
        assert!(bool::decode(SqlValue::Int(7)).is_err());
    }
}
