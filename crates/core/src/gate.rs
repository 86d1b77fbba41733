//! Numeric validity gate for device readings.
//!
//! Rejects floating-point readings carrying NaN before they reach downstream
//! processing. Infinities pass; range and scale checks live elsewhere.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Declared kind of a reading's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Bool,
    String,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Binary,
    Object,
}

impl FromStr for ValueType {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = match s.to_ascii_lowercase().as_str() {
            "bool" => ValueType::Bool,
            "string" => ValueType::String,
            "uint8" => ValueType::Uint8,
            "uint16" => ValueType::Uint16,
            "uint32" => ValueType::Uint32,
            "uint64" => ValueType::Uint64,
            "int8" => ValueType::Int8,
            "int16" => ValueType::Int16,
            "int32" => ValueType::Int32,
            "int64" => ValueType::Int64,
            "float32" => ValueType::Float32,
            "float64" => ValueType::Float64,
            "binary" => ValueType::Binary,
            "object" => ValueType::Object,
            _ => return Err(GateError::UnknownType(s.to_string())),
        };
        Ok(t)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("cannot decode {value_type:?} from {actual} bytes (expected {expected})")]
    Decode {
        value_type: ValueType,
        expected: usize,
        actual: usize,
    },

    #[error("NaN error for device resource {resource}")]
    NotANumber { resource: String },

    #[error("unknown value type: {0}")]
    UnknownType(String),
}

/// One value read from a device. Floats are big-endian encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub value_type: ValueType,
    pub raw: Vec<u8>,
}

impl Reading {
    pub fn new(value_type: ValueType, raw: impl Into<Vec<u8>>) -> Self {
        Self {
            value_type,
            raw: raw.into(),
        }
    }

    pub fn float32(v: f32) -> Self {
        Self::new(ValueType::Float32, v.to_be_bytes())
    }

    pub fn float64(v: f64) -> Self {
        Self::new(ValueType::Float64, v.to_be_bytes())
    }

    fn decode<const N: usize>(&self) -> Result<[u8; N], GateError> {
        self.raw
            .as_slice()
            .try_into()
            .map_err(|_| GateError::Decode {
                value_type: self.value_type,
                expected: N,
                actual: self.raw.len(),
            })
    }
}

/// `Ok(false)` iff the reading is a float carrying NaN.
///
/// Non-float types are valid without decoding. A malformed float encoding is
/// an `Err`, not an invalid value.
pub fn is_valid(reading: &Reading) -> Result<bool, GateError> {
    let v = match reading.value_type {
        ValueType::Float32 => f32::from_be_bytes(reading.decode::<4>()?) as f64,
        ValueType::Float64 => f64::from_be_bytes(reading.decode::<8>()?),
        _ => return Ok(true),
    };
    Ok(!v.is_nan())
}

/// Like [`is_valid`], but turns a NaN into an error naming the resource.
pub fn ensure_valid(resource: &str, reading: &Reading) -> Result<(), GateError> {
    if is_valid(reading)? {
        Ok(())
    } else {
        Err(GateError::NotANumber {
            resource: resource.to_string(),
        })
    }
}
