use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Owned property value.
///
/// Values are totally ordered so they can key transaction-local index state:
/// variants order by their declaration position and floats use
/// [`f64::total_cmp`].
#[derive(Clone, Debug)]
pub enum PropValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point number.
    Float(f64),
    /// Owned string.
    Str(String),
    /// Owned byte vector.
    Bytes(Vec<u8>),
    /// Date value represented as Unix timestamp (days since epoch).
    Date(i64),
    /// DateTime value represented as Unix timestamp (milliseconds since epoch).
    DateTime(i64),
}

impl PropValue {
    fn rank(&self) -> u8 {
        match self {
            PropValue::Null => 0,
            PropValue::Bool(_) => 1,
            PropValue::Int(_) => 2,
            PropValue::Float(_) => 3,
            PropValue::Str(_) => 4,
            PropValue::Bytes(_) => 5,
            PropValue::Date(_) => 6,
            PropValue::DateTime(_) => 7,
        }
    }

    /// Returns the string payload, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PropValue {}

impl PartialOrd for PropValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PropValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (PropValue::Null, PropValue::Null) => Ordering::Equal,
            (PropValue::Bool(a), PropValue::Bool(b)) => a.cmp(b),
            (PropValue::Int(a), PropValue::Int(b)) => a.cmp(b),
            (PropValue::Float(a), PropValue::Float(b)) => a.total_cmp(b),
            (PropValue::Str(a), PropValue::Str(b)) => a.cmp(b),
            (PropValue::Bytes(a), PropValue::Bytes(b)) => a.cmp(b),
            (PropValue::Date(a), PropValue::Date(b)) => a.cmp(b),
            (PropValue::DateTime(a), PropValue::DateTime(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for PropValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            PropValue::Null => {}
            PropValue::Bool(v) => v.hash(state),
            PropValue::Int(v) | PropValue::Date(v) | PropValue::DateTime(v) => v.hash(state),
            PropValue::Float(v) => v.to_bits().hash(state),
            PropValue::Str(v) => v.hash(state),
            PropValue::Bytes(v) => v.hash(state),
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Null => write!(f, "null"),
            PropValue::Bool(v) => write!(f, "{v}"),
            PropValue::Int(v) => write!(f, "{v}"),
            PropValue::Float(v) => write!(f, "{v}"),
            PropValue::Str(v) => write!(f, "{v}"),
            PropValue::Bytes(v) => write!(f, "bytes(len={})", v.len()),
            PropValue::Date(v) => write!(f, "date({v})"),
            PropValue::DateTime(v) => write!(f, "datetime({v})"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.to_owned())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}
