use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{MapperError, Result, Value};

/// The closed set of column shapes an entity field may have.
///
/// `List`, `Map` and `Set` are recognized so they can be rejected with a
/// precise error; they cannot be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    Boolean,
    Decimal,
    Varint,
    Timestamp,
    Double,
    Float,
    Inet,
    Int,
    BigInt,
    Text,
    Uuid,
    List,
    Map,
    Set,
}

impl ColumnKind {
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::List | Self::Map | Self::Set)
    }

    /// CQL type name used in generated DDL.
    pub fn cql_type(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Decimal => "decimal",
            Self::Varint => "varint",
            Self::Timestamp => "timestamp",
            Self::Double => "double",
            Self::Float => "float",
            Self::Inet => "inet",
            Self::Int => "int",
            Self::BigInt => "bigint",
            Self::Text => "text",
            Self::Uuid => "uuid",
            Self::List => "list",
            Self::Map => "map",
            Self::Set => "set",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cql_type())
    }
}

/// Conversion contract between an in-memory field type and a storage [`Value`].
pub trait ColumnType: Sized + Send + Sync + 'static {
    const KIND: ColumnKind;

    /// Whether the type has a null state a field can be left in.
    const NULLABLE: bool = false;

    fn encode(&self) -> Result<Value>;

    fn decode(value: Value) -> Result<Self>;
}

fn mismatch<T>(expected: ColumnKind, found: &Value) -> Result<T> {
    Err(MapperError::UnsupportedType {
        column: String::new(),
        expected,
        found: found.type_name(),
    })
}

macro_rules! scalar_column_type {
    ($ty:ty, $kind:ident, $variant:ident) => {
        impl ColumnType for $ty {
            const KIND: ColumnKind = ColumnKind::$kind;

            fn encode(&self) -> Result<Value> {
                Ok(Value::$variant(self.clone()))
            }

            fn decode(value: Value) -> Result<Self> {
                match value {
                    Value::$variant(inner) => Ok(inner),
                    other => mismatch(Self::KIND, &other),
                }
            }
        }
    };
}

scalar_column_type!(bool, Boolean, Boolean);
scalar_column_type!(Decimal, Decimal, Decimal);
scalar_column_type!(BigInt, Varint, Varint);
scalar_column_type!(DateTime<Utc>, Timestamp, Timestamp);
scalar_column_type!(f64, Double, Double);
scalar_column_type!(f32, Float, Float);
scalar_column_type!(IpAddr, Inet, Inet);
scalar_column_type!(i32, Int, Int);
scalar_column_type!(i64, BigInt, BigInt);
scalar_column_type!(String, Text, Text);
scalar_column_type!(Uuid, Uuid, Uuid);

impl<T: ColumnType> ColumnType for Option<T> {
    const KIND: ColumnKind = T::KIND;
    const NULLABLE: bool = true;

    fn encode(&self) -> Result<Value> {
        match self {
            Some(inner) => inner.encode(),
            None => Ok(Value::Null),
        }
    }

    fn decode(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::decode(other).map(Some),
        }
    }
}

macro_rules! collection_column_type {
    ($kind:ident, [$($generics:tt)*], $ty:ty) => {
        impl<$($generics)*> ColumnType for $ty {
            const KIND: ColumnKind = ColumnKind::$kind;

            fn encode(&self) -> Result<Value> {
                Err(MapperError::UnsupportedOperation(format!(
                    "{} columns cannot be encoded",
                    Self::KIND
                )))
            }

            fn decode(_value: Value) -> Result<Self> {
                Err(MapperError::UnsupportedOperation(format!(
                    "{} columns cannot be decoded",
                    Self::KIND
                )))
            }
        }
    };
}

collection_column_type!(List, [T: Send + Sync + 'static], Vec<T>);
collection_column_type!(Set, [T: Send + Sync + 'static], BTreeSet<T>);
collection_column_type!(Set, [T: Send + Sync + 'static, S: Send + Sync + 'static], HashSet<T, S>);
collection_column_type!(Map, [K: Send + Sync + 'static, V: Send + Sync + 'static], BTreeMap<K, V>);
collection_column_type!(
    Map,
    [K: Send + Sync + 'static, V: Send + Sync + 'static, S: Send + Sync + 'static],
    HashMap<K, V, S>
);
