use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;

use chrono::{DateTime, SecondsFormat, Utc};
use num_bigint::BigInt;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::types::ColumnKind;

/// A single storage-native scalar, as exchanged with a session.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Decimal(Decimal),
    Varint(BigInt),
    Timestamp(DateTime<Utc>),
    Double(f64),
    Float(f32),
    Inet(IpAddr),
    Int(i32),
    BigInt(i64),
    Text(String),
    Uuid(Uuid),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Decimal(_) => "decimal",
            Self::Varint(_) => "varint",
            Self::Timestamp(_) => "timestamp",
            Self::Double(_) => "double",
            Self::Float(_) => "float",
            Self::Inet(_) => "inet",
            Self::Int(_) => "int",
            Self::BigInt(_) => "bigint",
            Self::Text(_) => "text",
            Self::Uuid(_) => "uuid",
        }
    }

    /// The column kind this value belongs to, `None` for null.
    pub fn kind(&self) -> Option<ColumnKind> {
        let kind = match self {
            Self::Null => return None,
            Self::Boolean(_) => ColumnKind::Boolean,
            Self::Decimal(_) => ColumnKind::Decimal,
            Self::Varint(_) => ColumnKind::Varint,
            Self::Timestamp(_) => ColumnKind::Timestamp,
            Self::Double(_) => ColumnKind::Double,
            Self::Float(_) => ColumnKind::Float,
            Self::Inet(_) => ColumnKind::Inet,
            Self::Int(_) => ColumnKind::Int,
            Self::BigInt(_) => ColumnKind::BigInt,
            Self::Text(_) => ColumnKind::Text,
            Self::Uuid(_) => ColumnKind::Uuid,
        };
        Some(kind)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Uuid(id) => Some(*id),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a == b,
            (Self::Varint(a), Self::Varint(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            // NaN equals NaN so an unchanged NaN column is not rewritten
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits() || a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits() || a == b,
            (Self::Inet(a), Self::Inet(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::BigInt(a), Self::BigInt(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Uuid(a), Self::Uuid(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Boolean(b) => b.hash(state),
            Self::Decimal(d) => d.normalize().hash(state),
            Self::Varint(i) => i.hash(state),
            Self::Timestamp(t) => t.hash(state),
            Self::Double(f) => {
                if *f == 0.0 {
                    0.0f64.to_bits().hash(state)
                } else {
                    f.to_bits().hash(state)
                }
            }
            Self::Float(f) => {
                if *f == 0.0 {
                    0.0f32.to_bits().hash(state)
                } else {
                    f.to_bits().hash(state)
                }
            }
            Self::Inet(ip) => ip.hash(state),
            Self::Int(i) => i.hash(state),
            Self::BigInt(i) => i.hash(state),
            Self::Text(s) => s.hash(state),
            Self::Uuid(u) => u.hash(state),
        }
    }
}

/// Renders the value as a CQL literal.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Decimal(d) => write!(f, "{}", d),
            Self::Varint(i) => write!(f, "{}", i),
            Self::Timestamp(t) => write!(f, "'{}'", t.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Self::Double(v) => write_float(f, *v),
            Self::Float(v) => write_float(f, f64::from(*v)),
            Self::Inet(ip) => write!(f, "'{}'", ip),
            Self::Int(i) => write!(f, "{}", i),
            Self::BigInt(i) => write!(f, "{}", i),
            Self::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Uuid(u) => write!(f, "{}", u),
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        write!(f, "NaN")
    } else if v.is_infinite() {
        write!(f, "{}Infinity", if v < 0.0 { "-" } else { "" })
    } else {
        write!(f, "{:?}", v)
    }
}
