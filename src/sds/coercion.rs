//! Type-code driven value coercion
//!
//! `TypeCode::empty_column` picks the typed container for a property and
//! `ColumnData::append` decodes one raw JSON cell into it. `decode_value` is
//! derived from `append`, so the empty-column and decode rules live in one
//! table and cannot drift apart.
//!
//! Null handling:
//! - non-nullable codes: null/missing → zero value (0, 0.0, false, epoch)
//! - nullable codes, `String` and unknown codes: null/missing → absent
//!
//! JSON numbers are narrowed to the target width with `as` casts
//! (saturating, NaN → 0). Callers are expected to supply in-range values.

use super::error::{Result, SdsError};
use super::types::TypeCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Number, Value};

/// How malformed booleans, dates and strings are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// Reference behavior: any present boolean is `true`, unparseable dates
    /// become the zero time, non-string values are rendered as JSON text
    #[default]
    Lenient,
    /// Literal booleans only, RFC3339 dates only, strings only
    Strict,
}

impl DecodePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "lenient" | "" => Some(DecodePolicy::Lenient),
            "strict" => Some(DecodePolicy::Strict),
            _ => None,
        }
    }
}

/// Zero value used for non-nullable date columns
pub fn zero_time() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

/// A single decoded cell; `Null` is the absent marker of nullable columns
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Boolean(bool),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Single(f32),
    Double(f64),
    DateTime(DateTime<Utc>),
    String(String),
}

/// Strongly-typed homogeneous column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Boolean(Vec<bool>),
    NullableBoolean(Vec<Option<bool>>),
    Int16(Vec<i16>),
    NullableInt16(Vec<Option<i16>>),
    UInt16(Vec<u16>),
    NullableUInt16(Vec<Option<u16>>),
    Int32(Vec<i32>),
    NullableInt32(Vec<Option<i32>>),
    UInt32(Vec<u32>),
    NullableUInt32(Vec<Option<u32>>),
    Int64(Vec<i64>),
    NullableInt64(Vec<Option<i64>>),
    UInt64(Vec<u64>),
    NullableUInt64(Vec<Option<u64>>),
    Single(Vec<f32>),
    NullableSingle(Vec<Option<f32>>),
    Double(Vec<f64>),
    NullableDouble(Vec<Option<f64>>),
    DateTime(Vec<DateTime<Utc>>),
    NullableDateTime(Vec<Option<DateTime<Utc>>>),
    /// `String` and every unrecognized code
    String(Vec<Option<String>>),
}

impl TypeCode {
    /// Zero-length column matching this code
    pub fn empty_column(&self) -> ColumnData {
        match self {
            TypeCode::Boolean => ColumnData::Boolean(Vec::new()),
            TypeCode::NullableBoolean => ColumnData::NullableBoolean(Vec::new()),
            TypeCode::Int16 => ColumnData::Int16(Vec::new()),
            TypeCode::NullableInt16 => ColumnData::NullableInt16(Vec::new()),
            TypeCode::UInt16 => ColumnData::UInt16(Vec::new()),
            TypeCode::NullableUInt16 => ColumnData::NullableUInt16(Vec::new()),
            TypeCode::Int32 => ColumnData::Int32(Vec::new()),
            TypeCode::NullableInt32 => ColumnData::NullableInt32(Vec::new()),
            TypeCode::UInt32 => ColumnData::UInt32(Vec::new()),
            TypeCode::NullableUInt32 => ColumnData::NullableUInt32(Vec::new()),
            TypeCode::Int64 => ColumnData::Int64(Vec::new()),
            TypeCode::NullableInt64 => ColumnData::NullableInt64(Vec::new()),
            TypeCode::UInt64 => ColumnData::UInt64(Vec::new()),
            TypeCode::NullableUInt64 => ColumnData::NullableUInt64(Vec::new()),
            TypeCode::Single => ColumnData::Single(Vec::new()),
            TypeCode::NullableSingle => ColumnData::NullableSingle(Vec::new()),
            TypeCode::Double => ColumnData::Double(Vec::new()),
            TypeCode::NullableDouble => ColumnData::NullableDouble(Vec::new()),
            TypeCode::DateTime => ColumnData::DateTime(Vec::new()),
            TypeCode::NullableDateTime => ColumnData::NullableDateTime(Vec::new()),
            TypeCode::String | TypeCode::Other(_) => ColumnData::String(Vec::new()),
        }
    }

    /// Decode one raw value (`None` = key missing from the record)
    pub fn decode_value(&self, raw: Option<&Value>, policy: DecodePolicy) -> Result<CellValue> {
        let mut column = self.empty_column();
        column.append(raw, policy)?;
        Ok(column.get(0).unwrap_or(CellValue::Null))
    }
}

impl ColumnData {
    /// Decode `raw` and push it onto the column
    pub fn append(&mut self, raw: Option<&Value>, policy: DecodePolicy) -> Result<()> {
        let raw = raw.filter(|v| !v.is_null());
        match self {
            ColumnData::Boolean(v) => v.push(decode_bool(raw, policy)?.unwrap_or_default()),
            ColumnData::NullableBoolean(v) => v.push(decode_bool(raw, policy)?),
            ColumnData::Int16(v) => v.push(decode_number(raw)?.unwrap_or_default()),
            ColumnData::NullableInt16(v) => v.push(decode_number(raw)?),
            ColumnData::UInt16(v) => v.push(decode_number(raw)?.unwrap_or_default()),
            ColumnData::NullableUInt16(v) => v.push(decode_number(raw)?),
            ColumnData::Int32(v) => v.push(decode_number(raw)?.unwrap_or_default()),
            ColumnData::NullableInt32(v) => v.push(decode_number(raw)?),
            ColumnData::UInt32(v) => v.push(decode_number(raw)?.unwrap_or_default()),
            ColumnData::NullableUInt32(v) => v.push(decode_number(raw)?),
            ColumnData::Int64(v) => v.push(decode_number(raw)?.unwrap_or_default()),
            ColumnData::NullableInt64(v) => v.push(decode_number(raw)?),
            ColumnData::UInt64(v) => v.push(decode_number(raw)?.unwrap_or_default()),
            ColumnData::NullableUInt64(v) => v.push(decode_number(raw)?),
            ColumnData::Single(v) => v.push(decode_number(raw)?.unwrap_or_default()),
            ColumnData::NullableSingle(v) => v.push(decode_number(raw)?),
            ColumnData::Double(v) => v.push(decode_number(raw)?.unwrap_or_default()),
            ColumnData::NullableDouble(v) => v.push(decode_number(raw)?),
            ColumnData::DateTime(v) => {
                v.push(decode_datetime(raw, policy)?.unwrap_or_else(zero_time))
            }
            ColumnData::NullableDateTime(v) => v.push(decode_datetime(raw, policy)?),
            ColumnData::String(v) => v.push(decode_string(raw, policy)?),
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Boolean(v) => v.len(),
            ColumnData::NullableBoolean(v) => v.len(),
            ColumnData::Int16(v) => v.len(),
            ColumnData::NullableInt16(v) => v.len(),
            ColumnData::UInt16(v) => v.len(),
            ColumnData::NullableUInt16(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::NullableInt32(v) => v.len(),
            ColumnData::UInt32(v) => v.len(),
            ColumnData::NullableUInt32(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::NullableInt64(v) => v.len(),
            ColumnData::UInt64(v) => v.len(),
            ColumnData::NullableUInt64(v) => v.len(),
            ColumnData::Single(v) => v.len(),
            ColumnData::NullableSingle(v) => v.len(),
            ColumnData::Double(v) => v.len(),
            ColumnData::NullableDouble(v) => v.len(),
            ColumnData::DateTime(v) => v.len(),
            ColumnData::NullableDateTime(v) => v.len(),
            ColumnData::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell at `idx`; absent cells of nullable columns are `CellValue::Null`
    pub fn get(&self, idx: usize) -> Option<CellValue> {
        fn opt<T: Clone>(v: &[Option<T>], idx: usize, f: fn(T) -> CellValue) -> Option<CellValue> {
            v.get(idx).map(|c| c.clone().map(f).unwrap_or(CellValue::Null))
        }

        match self {
            ColumnData::Boolean(v) => v.get(idx).map(|&b| CellValue::Boolean(b)),
            ColumnData::NullableBoolean(v) => opt(v, idx, CellValue::Boolean),
            ColumnData::Int16(v) => v.get(idx).map(|&n| CellValue::Int16(n)),
            ColumnData::NullableInt16(v) => opt(v, idx, CellValue::Int16),
            ColumnData::UInt16(v) => v.get(idx).map(|&n| CellValue::UInt16(n)),
            ColumnData::NullableUInt16(v) => opt(v, idx, CellValue::UInt16),
            ColumnData::Int32(v) => v.get(idx).map(|&n| CellValue::Int32(n)),
            ColumnData::NullableInt32(v) => opt(v, idx, CellValue::Int32),
            ColumnData::UInt32(v) => v.get(idx).map(|&n| CellValue::UInt32(n)),
            ColumnData::NullableUInt32(v) => opt(v, idx, CellValue::UInt32),
            ColumnData::Int64(v) => v.get(idx).map(|&n| CellValue::Int64(n)),
            ColumnData::NullableInt64(v) => opt(v, idx, CellValue::Int64),
            ColumnData::UInt64(v) => v.get(idx).map(|&n| CellValue::UInt64(n)),
            ColumnData::NullableUInt64(v) => opt(v, idx, CellValue::UInt64),
            ColumnData::Single(v) => v.get(idx).map(|&n| CellValue::Single(n)),
            ColumnData::NullableSingle(v) => opt(v, idx, CellValue::Single),
            ColumnData::Double(v) => v.get(idx).map(|&n| CellValue::Double(n)),
            ColumnData::NullableDouble(v) => opt(v, idx, CellValue::Double),
            ColumnData::DateTime(v) => v.get(idx).map(|&t| CellValue::DateTime(t)),
            ColumnData::NullableDateTime(v) => opt(v, idx, CellValue::DateTime),
            ColumnData::String(v) => opt(v, idx, CellValue::String),
        }
    }
}

/// Narrowing conversion from a JSON number
trait FromJsonNumber: Sized {
    fn from_json_number(n: &Number) -> Self;
}

macro_rules! narrow_from_f64 {
    ($($t:ty),*) => {
        $(impl FromJsonNumber for $t {
            fn from_json_number(n: &Number) -> Self {
                n.as_f64().unwrap_or_default() as $t
            }
        })*
    };
}

narrow_from_f64!(i16, u16, i32, u32, f32, f64);

// 64-bit targets keep exact integers instead of rounding through f64
impl FromJsonNumber for i64 {
    fn from_json_number(n: &Number) -> Self {
        n.as_i64()
            .unwrap_or_else(|| n.as_f64().unwrap_or_default() as i64)
    }
}

impl FromJsonNumber for u64 {
    fn from_json_number(n: &Number) -> Self {
        n.as_u64()
            .unwrap_or_else(|| n.as_f64().unwrap_or_default() as u64)
    }
}

fn decode_number<T: FromJsonNumber>(raw: Option<&Value>) -> Result<Option<T>> {
    match raw {
        None => Ok(None),
        Some(Value::Number(n)) => Ok(Some(T::from_json_number(n))),
        Some(other) => Err(SdsError::Decode(format!("expected number, got {}", other))),
    }
}

fn decode_bool(raw: Option<&Value>, policy: DecodePolicy) -> Result<Option<bool>> {
    match (raw, policy) {
        (None, _) => Ok(None),
        (Some(_), DecodePolicy::Lenient) => Ok(Some(true)),
        (Some(Value::Bool(b)), DecodePolicy::Strict) => Ok(Some(*b)),
        (Some(other), DecodePolicy::Strict) => {
            Err(SdsError::Decode(format!("expected boolean, got {}", other)))
        }
    }
}

fn decode_datetime(raw: Option<&Value>, policy: DecodePolicy) -> Result<Option<DateTime<Utc>>> {
    let raw = match raw {
        None => return Ok(None),
        Some(v) => v,
    };

    let parsed = match raw {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| format!("invalid RFC3339 timestamp '{}': {}", s, e)),
        other => Err(format!("expected timestamp string, got {}", other)),
    };

    match (parsed, policy) {
        (Ok(t), _) => Ok(Some(t)),
        (Err(_), DecodePolicy::Lenient) => Ok(Some(zero_time())),
        (Err(msg), DecodePolicy::Strict) => Err(SdsError::Decode(msg)),
    }
}

fn decode_string(raw: Option<&Value>, policy: DecodePolicy) -> Result<Option<String>> {
    match (raw, policy) {
        (None, _) => Ok(None),
        (Some(Value::String(s)), _) => Ok(Some(s.clone())),
        (Some(other), DecodePolicy::Lenient) => Ok(Some(other.to_string())),
        (Some(other), DecodePolicy::Strict) => {
            Err(SdsError::Decode(format!("expected string, got {}", other)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    const NON_NULLABLE_NUMERIC: [TypeCode; 8] = [
        TypeCode::Int16,
        TypeCode::UInt16,
        TypeCode::Int32,
        TypeCode::UInt32,
        TypeCode::Int64,
        TypeCode::UInt64,
        TypeCode::Single,
        TypeCode::Double,
    ];

    const NULLABLE_NUMERIC: [TypeCode; 8] = [
        TypeCode::NullableInt16,
        TypeCode::NullableUInt16,
        TypeCode::NullableInt32,
        TypeCode::NullableUInt32,
        TypeCode::NullableInt64,
        TypeCode::NullableUInt64,
        TypeCode::NullableSingle,
        TypeCode::NullableDouble,
    ];

    fn all_codes() -> Vec<TypeCode> {
        let mut codes: Vec<TypeCode> = NON_NULLABLE_NUMERIC
            .iter()
            .chain(NULLABLE_NUMERIC.iter())
            .cloned()
            .collect();
        codes.extend([
            TypeCode::Boolean,
            TypeCode::NullableBoolean,
            TypeCode::DateTime,
            TypeCode::NullableDateTime,
            TypeCode::String,
            TypeCode::Other("Guid".into()),
        ]);
        codes
    }

    #[test]
    fn test_null_maps_to_zero_for_non_nullable_numeric() {
        let expected = [
            CellValue::Int16(0),
            CellValue::UInt16(0),
            CellValue::Int32(0),
            CellValue::UInt32(0),
            CellValue::Int64(0),
            CellValue::UInt64(0),
            CellValue::Single(0.0),
            CellValue::Double(0.0),
        ];
        for (code, zero) in NON_NULLABLE_NUMERIC.iter().zip(expected) {
            let null = json!(null);
            assert_eq!(code.decode_value(Some(&null), DecodePolicy::Lenient).unwrap(), zero);
            assert_eq!(code.decode_value(None, DecodePolicy::Strict).unwrap(), zero);
        }
    }

    #[test]
    fn test_null_maps_to_absent_for_nullable() {
        let null = json!(null);
        for code in NULLABLE_NUMERIC.iter().chain(
            [
                TypeCode::NullableBoolean,
                TypeCode::NullableDateTime,
                TypeCode::String,
                TypeCode::Other("Guid".into()),
            ]
            .iter(),
        ) {
            assert!(code.is_nullable());
            assert_eq!(
                code.decode_value(Some(&null), DecodePolicy::Lenient).unwrap(),
                CellValue::Null,
                "code {}",
                code
            );
        }
    }

    #[test]
    fn test_non_nullable_bool_and_date_defaults() {
        assert_eq!(
            TypeCode::Boolean.decode_value(None, DecodePolicy::Lenient).unwrap(),
            CellValue::Boolean(false)
        );
        assert_eq!(
            TypeCode::DateTime.decode_value(None, DecodePolicy::Lenient).unwrap(),
            CellValue::DateTime(zero_time())
        );
    }

    #[test]
    fn test_numeric_narrowing() {
        let v = json!(12.9);
        assert_eq!(
            TypeCode::Int16.decode_value(Some(&v), DecodePolicy::Lenient).unwrap(),
            CellValue::Int16(12)
        );
        let v = json!(70000);
        assert_eq!(
            TypeCode::Int16.decode_value(Some(&v), DecodePolicy::Lenient).unwrap(),
            CellValue::Int16(i16::MAX)
        );
        let v = json!(-5);
        assert_eq!(
            TypeCode::NullableUInt32.decode_value(Some(&v), DecodePolicy::Lenient).unwrap(),
            CellValue::UInt32(0)
        );
        let v = json!(1.5);
        assert_eq!(
            TypeCode::Single.decode_value(Some(&v), DecodePolicy::Lenient).unwrap(),
            CellValue::Single(1.5)
        );
    }

    #[test]
    fn test_64_bit_integers_are_exact() {
        let v = json!(9_007_199_254_740_993_i64);
        assert_eq!(
            TypeCode::Int64.decode_value(Some(&v), DecodePolicy::Lenient).unwrap(),
            CellValue::Int64(9_007_199_254_740_993)
        );
        let v = json!(u64::MAX);
        assert_eq!(
            TypeCode::NullableUInt64.decode_value(Some(&v), DecodePolicy::Lenient).unwrap(),
            CellValue::UInt64(u64::MAX)
        );
    }

    #[test]
    fn test_non_numeric_value_fails_numeric_code() {
        let v = json!("12");
        for policy in [DecodePolicy::Lenient, DecodePolicy::Strict] {
            assert!(matches!(
                TypeCode::Double.decode_value(Some(&v), policy),
                Err(SdsError::Decode(_))
            ));
        }
    }

    #[test]
    fn test_lenient_boolean_quirk() {
        let f = json!(false);
        assert_eq!(
            TypeCode::Boolean.decode_value(Some(&f), DecodePolicy::Lenient).unwrap(),
            CellValue::Boolean(true)
        );
        let s = json!("no");
        assert_eq!(
            TypeCode::NullableBoolean.decode_value(Some(&s), DecodePolicy::Lenient).unwrap(),
            CellValue::Boolean(true)
        );
    }

    #[test]
    fn test_strict_boolean() {
        let f = json!(false);
        assert_eq!(
            TypeCode::Boolean.decode_value(Some(&f), DecodePolicy::Strict).unwrap(),
            CellValue::Boolean(false)
        );
        let s = json!("no");
        assert!(TypeCode::NullableBoolean
            .decode_value(Some(&s), DecodePolicy::Strict)
            .is_err());
    }

    #[test]
    fn test_datetime_parsing() {
        let v = json!("2020-01-01T00:00:00Z");
        let expected = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            TypeCode::DateTime.decode_value(Some(&v), DecodePolicy::Strict).unwrap(),
            CellValue::DateTime(expected)
        );

        let v = json!("2020-01-01T02:00:00.1234567+02:00");
        match TypeCode::NullableDateTime.decode_value(Some(&v), DecodePolicy::Strict).unwrap() {
            CellValue::DateTime(t) => {
                assert_eq!(t.timestamp(), expected.timestamp());
                assert_eq!(t.timestamp_subsec_nanos(), 123_456_700);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bad_datetime_by_policy() {
        let v = json!("yesterday");
        assert_eq!(
            TypeCode::DateTime.decode_value(Some(&v), DecodePolicy::Lenient).unwrap(),
            CellValue::DateTime(zero_time())
        );
        assert_eq!(
            TypeCode::NullableDateTime.decode_value(Some(&v), DecodePolicy::Lenient).unwrap(),
            CellValue::DateTime(zero_time())
        );
        assert!(matches!(
            TypeCode::DateTime.decode_value(Some(&v), DecodePolicy::Strict),
            Err(SdsError::Decode(_))
        ));
    }

    #[test]
    fn test_string_and_unknown_codes() {
        let s = json!("abc");
        let n = json!(42);
        let guid = TypeCode::Other("Guid".into());

        assert_eq!(
            guid.decode_value(Some(&s), DecodePolicy::Strict).unwrap(),
            CellValue::String("abc".into())
        );
        assert_eq!(
            TypeCode::String.decode_value(Some(&n), DecodePolicy::Lenient).unwrap(),
            CellValue::String("42".into())
        );
        assert!(guid.decode_value(Some(&n), DecodePolicy::Strict).is_err());
        assert!(matches!(guid.empty_column(), ColumnData::String(_)));
    }

    #[test]
    fn test_appending_n_values_gives_length_n() {
        let values = [json!(null), json!(1), json!("2021-06-01T00:00:00Z"), json!(true)];
        for code in all_codes() {
            let mut column = code.empty_column();
            assert!(column.is_empty());
            let mut appended = 0;
            for v in &values {
                if column.append(Some(v), DecodePolicy::Lenient).is_ok() {
                    appended += 1;
                }
            }
            column.append(None, DecodePolicy::Lenient).unwrap();
            assert_eq!(column.len(), appended + 1, "code {}", code);
        }
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(DecodePolicy::parse("Strict"), Some(DecodePolicy::Strict));
        assert_eq!(DecodePolicy::parse(""), Some(DecodePolicy::Lenient));
        assert_eq!(DecodePolicy::parse("loose"), None);
    }
}
