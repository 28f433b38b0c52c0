use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;

use crate::bitset::BitSet;
use crate::errors::{Error, Result};

pub mod datetime;
pub mod decimal;
pub mod lang;
pub mod word;

pub use datetime::{Date, Timestamp};
pub use decimal::Decimal;
pub use lang::LanguageSet;
pub use word::{Word, WordCategory};

/// Type tags in cross-type sort order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum TypeCode {
    Null,
    Integer,
    Unsigned,
    Long,
    Double,
    Decimal,
    String,
    Binary,
    Date,
    Timestamp,
    Language,
    Word,
    BitSet,
    Array,
}

/// Payload of a [`Value`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Integer(i32),
    Unsigned(u32),
    Long(i64),
    Double(f64),
    Decimal(Decimal),
    String(String),
    Binary(Vec<u8>),
    Date(Date),
    Timestamp(Timestamp),
    Language(LanguageSet),
    Word(Word),
    BitSet(BitSet),
    Array(Vec<Value>),
}

impl Scalar {
    pub fn type_code(&self) -> TypeCode {
        match self {
            Scalar::Null => TypeCode::Null,
            Scalar::Integer(_) => TypeCode::Integer,
            Scalar::Unsigned(_) => TypeCode::Unsigned,
            Scalar::Long(_) => TypeCode::Long,
            Scalar::Double(_) => TypeCode::Double,
            Scalar::Decimal(_) => TypeCode::Decimal,
            Scalar::String(_) => TypeCode::String,
            Scalar::Binary(_) => TypeCode::Binary,
            Scalar::Date(_) => TypeCode::Date,
            Scalar::Timestamp(_) => TypeCode::Timestamp,
            Scalar::Language(_) => TypeCode::Language,
            Scalar::Word(_) => TypeCode::Word,
            Scalar::BitSet(_) => TypeCode::BitSet,
            Scalar::Array(_) => TypeCode::Array,
        }
    }

    /// Total order: payload order within a type, type-code order across
    /// types. Doubles use IEEE total ordering so the relation stays total.
    fn total_cmp(&self, other: &Scalar) -> Ordering {
        match (self, other) {
            (Scalar::Integer(a), Scalar::Integer(b)) => a.cmp(b),
            (Scalar::Unsigned(a), Scalar::Unsigned(b)) => a.cmp(b),
            (Scalar::Long(a), Scalar::Long(b)) => a.cmp(b),
            (Scalar::Double(a), Scalar::Double(b)) => a.total_cmp(b),
            (Scalar::Decimal(a), Scalar::Decimal(b)) => a.cmp(b),
            (Scalar::String(a), Scalar::String(b)) => a.cmp(b),
            (Scalar::Binary(a), Scalar::Binary(b)) => a.cmp(b),
            (Scalar::Date(a), Scalar::Date(b)) => a.cmp(b),
            (Scalar::Timestamp(a), Scalar::Timestamp(b)) => a.cmp(b),
            (Scalar::Language(a), Scalar::Language(b)) => a.cmp(b),
            (Scalar::Word(a), Scalar::Word(b)) => a.cmp(b),
            (Scalar::BitSet(a), Scalar::BitSet(b)) => {
                a.iter().cmp(b.iter())
            }
            (Scalar::Array(a), Scalar::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.compare_to(y) {
                        Ordering::Equal => continue,
                        unequal => return unequal,
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.type_code().cmp(&other.type_code()),
        }
    }

    fn hash_into<H: Hasher>(&self, state: &mut H) {
        self.type_code().hash(state);
        match self {
            Scalar::Null => {}
            Scalar::Integer(v) => v.hash(state),
            Scalar::Unsigned(v) => v.hash(state),
            Scalar::Long(v) => v.hash(state),
            Scalar::Double(v) => v.to_bits().hash(state),
            Scalar::Decimal(v) => v.hash(state),
            Scalar::String(v) => v.hash(state),
            Scalar::Binary(v) => v.hash(state),
            Scalar::Date(v) => v.hash(state),
            Scalar::Timestamp(v) => v.hash(state),
            Scalar::Language(v) => v.hash(state),
            Scalar::Word(v) => v.hash(state),
            Scalar::BitSet(v) => {
                for position in v.iter() {
                    position.hash(state);
                }
            }
            Scalar::Array(v) => {
                for element in v {
                    element.hash(state);
                }
            }
        }
    }
}

/// Function tags accepted by [`Value::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionTag {
    /// Expand a packed (nested) array into its full element sequence.
    Unfold,
}

/// Polymorphic runtime value.
///
/// The null and default markers are flags carried next to the payload so a
/// typed slot stays typed when it goes null, the way column buffers behave.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Value {
    body: Scalar,
    null: bool,
    default: bool,
}

impl Value {
    pub fn new(body: Scalar) -> Value {
        Value {
            body,
            null: false,
            default: false,
        }
    }

    /// The SQL NULL marker.
    pub fn null() -> Value {
        Value {
            body: Scalar::Null,
            null: true,
            default: false,
        }
    }

    /// The "unspecified in INSERT" marker.
    pub fn default_marker() -> Value {
        Value {
            body: Scalar::Null,
            null: true,
            default: true,
        }
    }

    pub fn array(elements: Vec<Value>) -> Value {
        Value::new(Scalar::Array(elements))
    }

    pub fn body(&self) -> &Scalar {
        &self.body
    }

    pub fn is_null(&self) -> bool {
        self.null || matches!(self.body, Scalar::Null)
    }

    pub fn is_default(&self) -> bool {
        self.default
    }

    pub fn set_null(&mut self) {
        self.null = true;
    }

    pub fn set_default(&mut self) {
        self.null = true;
        self.default = true;
    }

    pub fn type_code(&self) -> TypeCode {
        self.body.type_code()
    }

    /// Element type of an array value; `None` for anything else.
    pub fn element_type(&self) -> Option<TypeCode> {
        match &self.body {
            Scalar::Array(elements) => Some(
                elements
                    .iter()
                    .find(|e| !e.is_null())
                    .map_or(TypeCode::Null, Value::type_code),
            ),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.body, Scalar::Array(_))
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match &self.body {
            Scalar::Array(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match &mut self.body {
            Scalar::Array(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.body {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bitset(&self) -> Option<&BitSet> {
        match &self.body {
            Scalar::BitSet(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bitset_mut(&mut self) -> Option<&mut BitSet> {
        match &mut self.body {
            Scalar::BitSet(b) => Some(b),
            _ => None,
        }
    }

    /// Numeric payload widened to i64, if this is an integral value.
    pub fn to_long(&self) -> Option<i64> {
        if self.is_null() {
            return None;
        }
        match self.body {
            Scalar::Integer(v) => Some(i64::from(v)),
            Scalar::Unsigned(v) => Some(i64::from(v)),
            Scalar::Long(v) => Some(v),
            _ => None,
        }
    }

    /// Total order over values: null first, then cross-type by type code,
    /// then payload.
    pub fn compare_to(&self, other: &Value) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.body.total_cmp(&other.body),
        }
    }

    /// Case-insensitive variant, defined for string payloads only; other
    /// types fall back to [`Value::compare_to`]. Used on user-name paths.
    pub fn compare_ci(&self, other: &Value) -> Ordering {
        match (&self.body, &other.body) {
            (Scalar::String(a), Scalar::String(b)) if !self.is_null() && !other.is_null() => {
                a.to_lowercase().cmp(&b.to_lowercase())
            }
            _ => self.compare_to(other),
        }
    }

    pub fn equals(&self, other: &Value) -> bool {
        self.compare_to(other) == Ordering::Equal
    }

    /// NULL-aware inequality: two nulls are *not* distinct, a null and a
    /// non-null *are*.
    pub fn distinct(&self, other: &Value) -> bool {
        match (self.is_null(), other.is_null()) {
            (true, true) => false,
            (true, false) | (false, true) => true,
            (false, false) => !self.equals(other),
        }
    }

    /// Copy payload and both marker flags from `other`.
    pub fn assign(&mut self, other: &Value) {
        self.body = other.body.clone();
        self.null = other.null;
        self.default = other.default;
    }

    pub fn apply(&self, tag: FunctionTag) -> Result<Value> {
        match tag {
            FunctionTag::Unfold => Ok(self.unfold()),
        }
    }

    fn unfold(&self) -> Value {
        match &self.body {
            Scalar::Array(elements) => {
                let mut flat = Vec::with_capacity(elements.len());
                for element in elements {
                    match element.as_array() {
                        Some(_) => {
                            let unfolded = element.unfold();
                            flat.extend(unfolded.as_array().unwrap_or(&[]).iter().cloned());
                        }
                        None => flat.push(element.clone()),
                    }
                }
                Value::array(flat)
            }
            _ => self.clone(),
        }
    }

    pub fn check_type(&self, expected: TypeCode) -> Result<()> {
        let found = self.type_code();
        if found == expected {
            Ok(())
        } else {
            Err(Error::NotCompatible { expected, found })
        }
    }
}

impl Default for Value {
    fn default() -> Value {
        Value::null()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        if self.default != other.default {
            return false;
        }
        match (self.is_null(), other.is_null()) {
            (true, true) => true,
            (false, false) => self.body.total_cmp(&other.body) == Ordering::Equal,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.default.hash(state);
        if self.is_null() {
            true.hash(state);
        } else {
            false.hash(state);
            self.body.hash_into(state);
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default() {
            return f.write_str("(default)");
        }
        if self.is_null() {
            return f.write_str("(null)");
        }
        match &self.body {
            Scalar::Null => f.write_str("(null)"),
            Scalar::Integer(v) => write!(f, "{v}"),
            Scalar::Unsigned(v) => write!(f, "{v}"),
            Scalar::Long(v) => write!(f, "{v}"),
            Scalar::Double(v) => write!(f, "{v}"),
            Scalar::Decimal(v) => write!(f, "{v}"),
            Scalar::String(v) => write!(f, "{v}"),
            Scalar::Binary(v) => {
                write!(f, "X'")?;
                for byte in v {
                    write!(f, "{byte:02x}")?;
                }
                write!(f, "'")
            }
            Scalar::Date(v) => write!(f, "{v}"),
            Scalar::Timestamp(v) => write!(f, "{v}"),
            Scalar::Language(v) => write!(f, "{v}"),
            Scalar::Word(v) => write!(f, "{v}"),
            Scalar::BitSet(v) => write!(f, "bitset({})", v.count()),
            Scalar::Array(elements) => {
                write!(f, "[{}]", elements.iter().format(", "))
            }
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Value {
        Value::new(Scalar::Integer(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Value {
        Value::new(Scalar::Unsigned(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Value {
        Value::new(Scalar::Long(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::new(Scalar::Double(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::new(Scalar::String(v.to_owned()))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::new(Scalar::String(v))
    }
}

impl From<BitSet> for Value {
    fn from(v: BitSet) -> Value {
        Value::new(Scalar::BitSet(v))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn null_sorts_first_and_compares_equal_to_null() {
        let null = Value::null();
        let one = Value::from(1);

        assert_eq!(null.compare_to(&one), Ordering::Less);
        assert_eq!(one.compare_to(&null), Ordering::Greater);
        assert_eq!(null.compare_to(&Value::null()), Ordering::Equal);
    }

    #[test]
    fn distinct_is_null_aware() {
        let null = Value::null();
        let one = Value::from(1);
        let two = Value::from(2);

        assert!(!null.distinct(&Value::null()));
        assert!(null.distinct(&one));
        assert!(one.distinct(&null));
        assert!(one.distinct(&two));
        assert!(!one.distinct(&Value::from(1)));
    }

    #[test]
    fn cross_type_order_follows_type_code() {
        let int = Value::from(7);
        let string = Value::from("7");
        let double = Value::from(0.5);

        assert_eq!(int.compare_to(&string), Ordering::Less);
        assert_eq!(double.compare_to(&string), Ordering::Less);
        assert_eq!(string.compare_to(&int), Ordering::Greater);
    }

    #[test]
    fn assign_copies_flags() {
        let mut target = Value::from(10);
        target.assign(&Value::default_marker());
        assert!(target.is_null());
        assert!(target.is_default());

        target.assign(&Value::from("abc"));
        assert!(!target.is_null());
        assert_eq!(target.as_str(), Some("abc"));
    }

    #[test]
    fn unfold_flattens_nested_arrays() {
        let packed = Value::array(vec![
            Value::array(vec![Value::from(1), Value::from(2)]),
            Value::from(3),
            Value::array(vec![Value::array(vec![Value::from(4)])]),
        ]);

        let full = packed.apply(FunctionTag::Unfold).unwrap();
        let elements = full.as_array().unwrap();
        assert_eq!(
            elements.to_vec(),
            vec![Value::from(1), Value::from(2), Value::from(3), Value::from(4)]
        );

        let scalar = Value::from(9).apply(FunctionTag::Unfold).unwrap();
        assert_eq!(scalar, Value::from(9));
    }

    #[test]
    fn element_type_reported_for_arrays_only() {
        let array = Value::array(vec![Value::null(), Value::from("x")]);
        assert_eq!(array.element_type(), Some(TypeCode::String));
        assert_eq!(Value::from(1).element_type(), None);
        assert_eq!(Value::array(vec![]).element_type(), Some(TypeCode::Null));
    }

    #[test]
    fn case_insensitive_compare_is_string_only() {
        let a = Value::from("Alice");
        let b = Value::from("aLICE");
        assert_eq!(a.compare_ci(&b), Ordering::Equal);
        assert_ne!(a.compare_to(&b), Ordering::Equal);
    }
}
