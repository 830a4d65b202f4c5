//! Columnar result frames
//!
//! `build_frame` turns a type definition plus row records into one typed
//! column per property. `ResultFrame::to_dataframe` hands the result to Polars,
//! staying columnar the whole way.

use super::coercion::{ColumnData, DecodePolicy};
use super::error::{Result, SdsError};
use super::types::TypeDefinition;
use polars::prelude::*;
use serde_json::{Map, Value};

/// One raw data point: property id → JSON value
pub type DataRecord = Map<String, Value>;

/// A named column of a result frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameColumn {
    pub name: String,
    pub data: ColumnData,
}

/// Named set of equal-length typed columns
#[derive(Debug, Clone, PartialEq)]
pub struct ResultFrame {
    pub name: String,
    pub columns: Vec<FrameColumn>,
}

impl ResultFrame {
    /// Frame with no columns
    pub fn empty(name: impl Into<String>) -> Self {
        ResultFrame {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.iter().find(|c| c.name == name).map(|c| &c.data)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    /// Convert to a Polars DataFrame (datetimes become UTC millisecond timestamps)
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns_vec = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let series = column_to_series(&column.name, &column.data)?;
            columns_vec.push(series.into_column());
        }
        Ok(DataFrame::new(columns_vec)?)
    }
}

/// Build a frame with one column per property and one row per record
///
/// A record missing a property's key decodes as null. Any cell failure aborts
/// the whole frame.
pub fn build_frame(
    name: &str,
    type_def: &TypeDefinition,
    records: &[DataRecord],
    policy: DecodePolicy,
) -> Result<ResultFrame> {
    let mut columns: Vec<FrameColumn> = type_def
        .properties
        .iter()
        .map(|p| FrameColumn {
            name: p.id.clone(),
            data: p.type_code().empty_column(),
        })
        .collect();

    for (row, record) in records.iter().enumerate() {
        for (property, column) in type_def.properties.iter().zip(columns.iter_mut()) {
            column
                .data
                .append(record.get(&property.id), policy)
                .map_err(|e| match e {
                    SdsError::Decode(msg) => SdsError::Decode(format!(
                        "property '{}' ({}) row {}: {}",
                        property.id,
                        property.type_code(),
                        row,
                        msg
                    )),
                    other => other,
                })?;
        }
    }

    Ok(ResultFrame {
        name: name.to_string(),
        columns,
    })
}

fn column_to_series(name: &str, data: &ColumnData) -> Result<Series> {
    let name: PlSmallStr = name.into();
    let series = match data {
        ColumnData::Boolean(v) => Series::new(name, v.as_slice()),
        ColumnData::NullableBoolean(v) => Series::new(name, v.as_slice()),
        ColumnData::Int16(v) => Series::new(name, v.as_slice()),
        ColumnData::NullableInt16(v) => Series::new(name, v.as_slice()),
        ColumnData::UInt16(v) => Series::new(name, v.as_slice()),
        ColumnData::NullableUInt16(v) => Series::new(name, v.as_slice()),
        ColumnData::Int32(v) => Series::new(name, v.as_slice()),
        ColumnData::NullableInt32(v) => Series::new(name, v.as_slice()),
        ColumnData::UInt32(v) => Series::new(name, v.as_slice()),
        ColumnData::NullableUInt32(v) => Series::new(name, v.as_slice()),
        ColumnData::Int64(v) => Series::new(name, v.as_slice()),
        ColumnData::NullableInt64(v) => Series::new(name, v.as_slice()),
        ColumnData::UInt64(v) => Series::new(name, v.as_slice()),
        ColumnData::NullableUInt64(v) => Series::new(name, v.as_slice()),
        ColumnData::Single(v) => Series::new(name, v.as_slice()),
        ColumnData::NullableSingle(v) => Series::new(name, v.as_slice()),
        ColumnData::Double(v) => Series::new(name, v.as_slice()),
        ColumnData::NullableDouble(v) => Series::new(name, v.as_slice()),
        ColumnData::DateTime(v) => {
            let millis: Vec<i64> = v.iter().map(|t| t.timestamp_millis()).collect();
            Series::new(name, millis).cast(&utc_millis())?
        }
        ColumnData::NullableDateTime(v) => {
            let millis: Vec<Option<i64>> =
                v.iter().map(|t| t.map(|t| t.timestamp_millis())).collect();
            Series::new(name, millis).cast(&utc_millis())?
        }
        ColumnData::String(v) => Series::new(name, v.as_slice()),
    };
    Ok(series)
}

/// Millisecond timestamps tagged as UTC
fn utc_millis() -> DataType {
    DataType::Datetime(TimeUnit::Milliseconds, Some(TimeZone::UTC))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sds::coercion::CellValue;
    use crate::sds::types::TypeCode;
    use chrono::TimeZone;
    use serde_json::json;

    fn type_def(props: &[(&str, &str)]) -> TypeDefinition {
        let properties: Vec<Value> = props
            .iter()
            .map(|(id, code)| json!({"Id": id, "SdsType": {"SdsTypeCode": code}}))
            .collect();
        serde_json::from_value(json!({"Id": "T", "Properties": properties})).unwrap()
    }

    fn records(value: Value) -> Vec<DataRecord> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_datetime_and_nullable_double_frame() {
        let def = type_def(&[("T", "DateTime"), ("V", "NullableDouble")]);
        let rows = records(json!([
            {"T": "2020-01-01T00:00:00Z", "V": 1.5},
            {"T": "2020-01-02T00:00:00Z", "V": null}
        ]));

        let frame = build_frame("pump", &def, &rows, DecodePolicy::Lenient).unwrap();

        assert_eq!(frame.name, "pump");
        assert_eq!(frame.column_names(), vec!["T", "V"]);
        assert_eq!(frame.row_count(), 2);
        assert_eq!(
            frame.column("V"),
            Some(&ColumnData::NullableDouble(vec![Some(1.5), None]))
        );
        assert_eq!(
            frame.column("T").unwrap().get(1),
            Some(CellValue::DateTime(
                chrono::Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap()
            ))
        );
    }

    #[test]
    fn test_missing_keys_use_null_rule() {
        let def = type_def(&[("A", "Int32"), ("B", "NullableInt32"), ("C", "Boolean")]);
        let rows = records(json!([{"A": 7}, {}]));

        let frame = build_frame("f", &def, &rows, DecodePolicy::Lenient).unwrap();

        assert_eq!(frame.column("A"), Some(&ColumnData::Int32(vec![7, 0])));
        assert_eq!(frame.column("B"), Some(&ColumnData::NullableInt32(vec![None, None])));
        assert_eq!(frame.column("C"), Some(&ColumnData::Boolean(vec![false, false])));
    }

    #[test]
    fn test_every_column_has_record_count_rows() {
        let def = type_def(&[
            ("a", "Int16"),
            ("b", "UInt64"),
            ("c", "NullableSingle"),
            ("d", "String"),
            ("e", "NullableDateTime"),
            ("f", "Guid"),
        ]);
        let rows = records(json!([{"a": 1}, {"b": 2}, {"c": 3.0}, {"d": "x"}, {"f": "g"}]));

        let frame = build_frame("f", &def, &rows, DecodePolicy::Lenient).unwrap();

        assert_eq!(frame.columns.len(), 6);
        for column in &frame.columns {
            assert_eq!(column.data.len(), 5, "column {}", column.name);
        }
    }

    #[test]
    fn test_no_records_keeps_schema() {
        let def = type_def(&[("T", "DateTime"), ("V", "Double")]);
        let frame = build_frame("empty", &def, &[], DecodePolicy::Lenient).unwrap();

        assert_eq!(frame.column_names(), vec!["T", "V"]);
        assert_eq!(frame.row_count(), 0);
        assert_eq!(frame.column("V"), Some(&TypeCode::Double.empty_column()));
    }

    #[test]
    fn test_cell_failure_aborts_frame() {
        let def = type_def(&[("V", "Double")]);
        let rows = records(json!([{"V": 1.0}, {"V": "oops"}]));

        match build_frame("f", &def, &rows, DecodePolicy::Lenient) {
            Err(SdsError::Decode(msg)) => {
                assert!(msg.contains("'V'"));
                assert!(msg.contains("row 1"));
            }
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_to_dataframe_dtypes() {
        let def = type_def(&[
            ("T", "DateTime"),
            ("V", "NullableDouble"),
            ("N", "UInt16"),
            ("S", "String"),
        ]);
        let rows = records(json!([
            {"T": "2020-01-01T00:00:00Z", "V": 1.5, "N": 3, "S": "a"},
            {"T": "2020-01-02T00:00:00Z", "V": null, "N": 4, "S": null}
        ]));
        let frame = build_frame("f", &def, &rows, DecodePolicy::Lenient).unwrap();

        let df = frame.to_dataframe().unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 4);
        assert_eq!(
            df.column("T").unwrap().dtype(),
            &DataType::Datetime(TimeUnit::Milliseconds, Some(polars::prelude::TimeZone::UTC))
        );
        assert_eq!(df.column("V").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("V").unwrap().null_count(), 1);
        assert_eq!(df.column("N").unwrap().dtype(), &DataType::UInt16);
        assert_eq!(df.column("S").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_nullable_datetime_keeps_utc_instant() {
        let def = type_def(&[("T", "NullableDateTime")]);
        let rows = records(json!([{"T": "2020-01-01T01:00:00+01:00"}, {"T": null}]));
        let frame = build_frame("f", &def, &rows, DecodePolicy::Lenient).unwrap();

        let df = frame.to_dataframe().unwrap();
        let column = df.column("T").unwrap();

        assert_eq!(
            column.dtype(),
            &DataType::Datetime(TimeUnit::Milliseconds, Some(polars::prelude::TimeZone::UTC))
        );
        assert_eq!(column.null_count(), 1);

        let millis = column
            .as_materialized_series()
            .cast(&DataType::Int64)
            .unwrap();
        let expected = chrono::Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap().timestamp_millis();
        assert_eq!(millis.i64().unwrap().get(0), Some(expected));
    }

    #[test]
    fn test_empty_frame_to_dataframe() {
        let df = ResultFrame::empty("response").to_dataframe().unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 0);
    }
}
