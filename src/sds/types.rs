//! Platform metadata: streams, types, properties and type codes

use serde::Deserialize;
use std::fmt;

/// Stream metadata as returned by `GET streams/<id>` and the stream listing
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Stream {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub type_id: String,
}

/// Ordered schema of a stream's data points
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TypeDefinition {
    pub id: String,
    #[serde(default)]
    pub properties: Vec<Property>,
}

/// One typed property; `id` is both the column name and the record key
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Property {
    pub id: String,
    pub sds_type: PropertyType,
}

impl Property {
    pub fn type_code(&self) -> &TypeCode {
        &self.sds_type.sds_type_code
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PropertyType {
    pub sds_type_code: TypeCode,
}

/// Storage type and nullability of a property
///
/// Codes outside this set are kept as `Other` and rendered as optional strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawTypeCode")]
pub enum TypeCode {
    Boolean,
    NullableBoolean,
    Int16,
    NullableInt16,
    UInt16,
    NullableUInt16,
    Int32,
    NullableInt32,
    UInt32,
    NullableUInt32,
    Int64,
    NullableInt64,
    UInt64,
    NullableUInt64,
    Single,
    NullableSingle,
    Double,
    NullableDouble,
    DateTime,
    NullableDateTime,
    String,
    Other(std::string::String),
}

/// Wire form: the platform sends either the code name or its numeric value
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTypeCode {
    Name(std::string::String),
    Number(i64),
}

impl From<RawTypeCode> for TypeCode {
    fn from(raw: RawTypeCode) -> Self {
        match raw {
            RawTypeCode::Name(name) => TypeCode::from_name(&name),
            RawTypeCode::Number(n) => TypeCode::from_number(n),
        }
    }
}

impl TypeCode {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Boolean" => TypeCode::Boolean,
            "NullableBoolean" => TypeCode::NullableBoolean,
            "Int16" => TypeCode::Int16,
            "NullableInt16" => TypeCode::NullableInt16,
            "UInt16" => TypeCode::UInt16,
            "NullableUInt16" => TypeCode::NullableUInt16,
            "Int32" => TypeCode::Int32,
            "NullableInt32" => TypeCode::NullableInt32,
            "UInt32" => TypeCode::UInt32,
            "NullableUInt32" => TypeCode::NullableUInt32,
            "Int64" => TypeCode::Int64,
            "NullableInt64" => TypeCode::NullableInt64,
            "UInt64" => TypeCode::UInt64,
            "NullableUInt64" => TypeCode::NullableUInt64,
            "Single" => TypeCode::Single,
            "NullableSingle" => TypeCode::NullableSingle,
            "Double" => TypeCode::Double,
            "NullableDouble" => TypeCode::NullableDouble,
            "DateTime" => TypeCode::DateTime,
            "NullableDateTime" => TypeCode::NullableDateTime,
            "String" => TypeCode::String,
            other => TypeCode::Other(other.to_string()),
        }
    }

    /// Numeric codes: nullable variants sit at +100 of their base code
    pub fn from_number(code: i64) -> Self {
        match code {
            3 => TypeCode::Boolean,
            7 => TypeCode::Int16,
            8 => TypeCode::UInt16,
            9 => TypeCode::Int32,
            10 => TypeCode::UInt32,
            11 => TypeCode::Int64,
            12 => TypeCode::UInt64,
            13 => TypeCode::Single,
            14 => TypeCode::Double,
            16 => TypeCode::DateTime,
            18 => TypeCode::String,
            103 => TypeCode::NullableBoolean,
            107 => TypeCode::NullableInt16,
            108 => TypeCode::NullableUInt16,
            109 => TypeCode::NullableInt32,
            110 => TypeCode::NullableUInt32,
            111 => TypeCode::NullableInt64,
            112 => TypeCode::NullableUInt64,
            113 => TypeCode::NullableSingle,
            114 => TypeCode::NullableDouble,
            116 => TypeCode::NullableDateTime,
            other => TypeCode::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TypeCode::Boolean => "Boolean",
            TypeCode::NullableBoolean => "NullableBoolean",
            TypeCode::Int16 => "Int16",
            TypeCode::NullableInt16 => "NullableInt16",
            TypeCode::UInt16 => "UInt16",
            TypeCode::NullableUInt16 => "NullableUInt16",
            TypeCode::Int32 => "Int32",
            TypeCode::NullableInt32 => "NullableInt32",
            TypeCode::UInt32 => "UInt32",
            TypeCode::NullableUInt32 => "NullableUInt32",
            TypeCode::Int64 => "Int64",
            TypeCode::NullableInt64 => "NullableInt64",
            TypeCode::UInt64 => "UInt64",
            TypeCode::NullableUInt64 => "NullableUInt64",
            TypeCode::Single => "Single",
            TypeCode::NullableSingle => "NullableSingle",
            TypeCode::Double => "Double",
            TypeCode::NullableDouble => "NullableDouble",
            TypeCode::DateTime => "DateTime",
            TypeCode::NullableDateTime => "NullableDateTime",
            TypeCode::String => "String",
            TypeCode::Other(name) => name,
        }
    }

    /// True when null input decodes to an absent marker rather than a zero value
    pub fn is_nullable(&self) -> bool {
        matches!(
            self,
            TypeCode::NullableBoolean
                | TypeCode::NullableInt16
                | TypeCode::NullableUInt16
                | TypeCode::NullableInt32
                | TypeCode::NullableUInt32
                | TypeCode::NullableInt64
                | TypeCode::NullableUInt64
                | TypeCode::NullableSingle
                | TypeCode::NullableDouble
                | TypeCode::NullableDateTime
                | TypeCode::String
                | TypeCode::Other(_)
        )
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
