//! Parameter Mappings
//!
//! Named, immutable parameter sets identifying a single benchmark run or a
//! single test parametrization. Mappings are compared for resume/dedup, so
//! equality is element-wise and floats compare by total order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// A single dimension value: a scalar or a tuple of values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DimensionValue {
    /// Boolean flag
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// String
    Str(String),
    /// Ordered tuple (lists in YAML/JSON)
    Tuple(Vec<DimensionValue>),
}

impl DimensionValue {
    /// String contents, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DimensionValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value, if this is an integer or a float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DimensionValue::Int(i) => Some(*i as f64),
            DimensionValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer value, if this is an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DimensionValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Boolean value, if this is a bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DimensionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether this value is a tuple
    pub fn is_tuple(&self) -> bool {
        matches!(self, DimensionValue::Tuple(_))
    }

    /// Whether `needle` equals this value, or is an element of it when this is a tuple
    pub fn contains_or_equals(&self, needle: &DimensionValue) -> bool {
        if self == needle {
            return true;
        }
        match self {
            DimensionValue::Tuple(items) if !needle.is_tuple() => {
                items.iter().any(|item| item == needle)
            }
            _ => false,
        }
    }

    /// Flatten to a list of strings: a string becomes one item, a tuple its
    /// elements rendered with `Display`.
    pub fn to_string_list(&self) -> Vec<String> {
        match self {
            DimensionValue::Tuple(items) => items.iter().map(|v| v.to_string()).collect(),
            other => vec![other.to_string()],
        }
    }

    fn rank(&self) -> u8 {
        match self {
            DimensionValue::Bool(_) => 0,
            DimensionValue::Int(_) | DimensionValue::Float(_) => 1,
            DimensionValue::Str(_) => 2,
            DimensionValue::Tuple(_) => 3,
        }
    }
}

impl PartialEq for DimensionValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DimensionValue {}

impl PartialOrd for DimensionValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DimensionValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use DimensionValue::*;
        match (self, other) {
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Int(a), Float(b)) => cmp_int_float(*a, *b),
            (Float(a), Int(b)) => cmp_int_float(*b, *a).reverse(),
            (Str(a), Str(b)) => a.cmp(b),
            (Tuple(a), Tuple(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

/// The integer a float equals exactly, if any. `-0.0` has none so that it
/// stays below `0` as it does under `f64::total_cmp`.
fn exact_int(f: f64) -> Option<i64> {
    let integral = f.is_finite() && f.fract() == 0.0 && !(f == 0.0 && f.is_sign_negative());
    (integral && (-TWO_POW_63..TWO_POW_63).contains(&f)).then(|| f as i64)
}

/// Compare an integer with a float without rounding the integer
fn cmp_int_float(i: i64, f: f64) -> Ordering {
    if f.is_nan() {
        return if f.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if f >= TWO_POW_63 {
        return Ordering::Less;
    }
    if f < -TWO_POW_63 {
        return Ordering::Greater;
    }
    let truncated = f.trunc();
    match i.cmp(&(truncated as i64)) {
        Ordering::Equal if f > truncated => Ordering::Less,
        Ordering::Equal if f < truncated => Ordering::Greater,
        // 0 sits above -0.0
        Ordering::Equal if i == 0 && f.is_sign_negative() => Ordering::Greater,
        ordering => ordering,
    }
}

impl std::hash::Hash for DimensionValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            DimensionValue::Bool(b) => b.hash(state),
            // Ints and floats that compare equal must hash equally
            DimensionValue::Int(i) => i.hash(state),
            DimensionValue::Float(f) => match exact_int(*f) {
                Some(i) => i.hash(state),
                None => f.to_bits().hash(state),
            },
            DimensionValue::Str(s) => s.hash(state),
            DimensionValue::Tuple(items) => items.hash(state),
        }
    }
}

impl fmt::Display for DimensionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionValue::Bool(b) => write!(f, "{}", b),
            DimensionValue::Int(i) => write!(f, "{}", i),
            DimensionValue::Float(x) => write!(f, "{}", x),
            DimensionValue::Str(s) => write!(f, "{}", s),
            DimensionValue::Tuple(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(" "))
            }
        }
    }
}

impl From<&str> for DimensionValue {
    fn from(s: &str) -> Self {
        DimensionValue::Str(s.to_string())
    }
}

impl From<String> for DimensionValue {
    fn from(s: String) -> Self {
        DimensionValue::Str(s)
    }
}

impl From<i64> for DimensionValue {
    fn from(i: i64) -> Self {
        DimensionValue::Int(i)
    }
}

impl From<i32> for DimensionValue {
    fn from(i: i32) -> Self {
        DimensionValue::Int(i64::from(i))
    }
}

impl From<f64> for DimensionValue {
    fn from(f: f64) -> Self {
        DimensionValue::Float(f)
    }
}

impl From<bool> for DimensionValue {
    fn from(b: bool) -> Self {
        DimensionValue::Bool(b)
    }
}

impl<T: Into<DimensionValue>> From<Vec<T>> for DimensionValue {
    fn from(items: Vec<T>) -> Self {
        DimensionValue::Tuple(items.into_iter().map(Into::into).collect())
    }
}

/// Ordered mapping from dimension name to value
///
/// Keys iterate in sorted order, so two mappings built in different orders
/// serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterMapping(BTreeMap<String, DimensionValue>);

impl ParameterMapping {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<DimensionValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Get a dimension
    pub fn get(&self, name: &str) -> Option<&DimensionValue> {
        self.0.get(name)
    }

    /// Get a string dimension
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(DimensionValue::as_str)
    }

    /// Whether the dimension is present
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of dimensions
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no dimensions
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate dimensions in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &DimensionValue)> {
        self.0.iter()
    }

    /// Dimension names in key order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Return a copy with extra dimensions added (existing names are overwritten)
    #[must_use]
    pub fn augmented(&self, extra: impl IntoIterator<Item = (String, DimensionValue)>) -> Self {
        let mut copy = self.clone();
        copy.0.extend(extra);
        copy
    }

    /// Return a copy without the given dimensions
    #[must_use]
    pub fn without<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut copy = self.clone();
        for name in names {
            copy.0.remove(name);
        }
        copy
    }

    /// Remove and return a dimension
    pub fn remove(&mut self, name: &str) -> Option<DimensionValue> {
        self.0.remove(name)
    }
}

impl FromIterator<(String, DimensionValue)> for ParameterMapping {
    fn from_iter<I: IntoIterator<Item = (String, DimensionValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ParameterMapping {
    type Item = (String, DimensionValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, DimensionValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for ParameterMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        write!(f, "}}")
    }
}

/// Build a [`ParameterMapping`] from `name => value` pairs
///
/// ```ignore
/// let params = params! { "XAnnot" => "fruit::Annotated<Annotation1, X>", "num" => 3 };
/// ```
#[macro_export]
macro_rules! params {
    () => { $crate::ParameterMapping::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {
        $crate::ParameterMapping::new()$(.with($name, $value))+
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_insertion_order() {
        let a = ParameterMapping::new().with("b", 1).with("a", "x");
        let b = ParameterMapping::new().with("a", "x").with("b", 1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_int_and_float_compare_numerically() {
        assert_eq!(DimensionValue::Int(3), DimensionValue::Float(3.0));
        assert!(DimensionValue::Int(2) < DimensionValue::Float(2.5));
    }

    #[test]
    fn test_large_ints_order_exactly_against_floats() {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let two_pow_53 = 1i64 << 53;
        let float = DimensionValue::Float(two_pow_53 as f64);
        let exact = DimensionValue::Int(two_pow_53);
        let above = DimensionValue::Int(two_pow_53 + 1);

        assert_eq!(exact, float);
        assert!(above > float);
        assert!(above > exact);
        assert_ne!(above, float);
        assert!(DimensionValue::Int(i64::MAX) < DimensionValue::Float(9.3e18));
        assert_eq!(DimensionValue::Int(i64::MIN), DimensionValue::Float(-TWO_POW_63));
        assert!(DimensionValue::Int(2) > DimensionValue::Float(1.5));
        assert!(DimensionValue::Int(-2) < DimensionValue::Float(-1.5));
        assert!(DimensionValue::Int(0) > DimensionValue::Float(-0.0));
        assert!(DimensionValue::Int(0) < DimensionValue::Float(f64::NAN));

        let hash = |v: &DimensionValue| {
            let mut hasher = DefaultHasher::new();
            v.hash(&mut hasher);
            hasher.finish()
        };
        assert_eq!(hash(&exact), hash(&float));
        assert_eq!(hash(&DimensionValue::Int(3)), hash(&DimensionValue::Float(3.0)));
    }

    #[test]
    fn test_json_round_trip_keeps_value_kinds() {
        let mapping = ParameterMapping::new()
            .with("num_classes", 100)
            .with("loop_factor", 0.5)
            .with("compiler", "g++")
            .with("additional_cmake_args", vec!["-DX=1", "-DY=2"]);
        let json = serde_json::to_string(&mapping).unwrap();
        assert_eq!(
            json,
            r#"{"additional_cmake_args":["-DX=1","-DY=2"],"compiler":"g++","loop_factor":0.5,"num_classes":100}"#
        );
        let back: ParameterMapping = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mapping);
        assert!(matches!(back.get("num_classes"), Some(DimensionValue::Int(100))));
    }

    #[test]
    fn test_contains_or_equals_matches_tuple_members() {
        let args = DimensionValue::from(vec!["-DFRUIT_USES_BOOST=False", "-DX"]);
        assert!(args.contains_or_equals(&"-DX".into()));
        assert!(!args.contains_or_equals(&"-DY".into()));
        assert!(DimensionValue::from("a").contains_or_equals(&"a".into()));
    }

    #[test]
    fn test_params_macro() {
        let p = params! { "X" => "int", "n" => 3 };
        assert_eq!(p.get_str("X"), Some("int"));
        assert_eq!(p.get("n").and_then(DimensionValue::as_i64), Some(3));
        assert!(params!().is_empty());
    }
}
