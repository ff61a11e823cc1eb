use crate::interpreter::object::JsObjectData;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

#[derive(Clone, Debug, Default)]
pub enum JsValue {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Symbol(JsSymbol),
    Object(JsObject),
}

// UTF-16 code unit string (ES5 §8.4)
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct JsString {
    pub code_units: Vec<u16>,
}

impl JsString {
    pub fn from_str(s: &str) -> Self {
        Self {
            code_units: s.encode_utf16().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.code_units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.code_units.len()
    }

    pub fn to_rust_string(&self) -> String {
        String::from_utf16_lossy(&self.code_units)
    }

    pub fn index_of(&self, search: &JsString, from: usize) -> Option<usize> {
        let s_len = self.code_units.len();
        let search_len = search.code_units.len();
        if search_len == 0 {
            return if from <= s_len { Some(from) } else { None };
        }
        if from + search_len > s_len {
            return None;
        }
        (from..=(s_len - search_len))
            .find(|&i| self.code_units[i..i + search_len] == search.code_units[..])
    }

    pub fn last_index_of(&self, search: &JsString, from: usize) -> Option<usize> {
        let s_len = self.code_units.len();
        let search_len = search.code_units.len();
        if search_len == 0 {
            return Some(from.min(s_len));
        }
        if search_len > s_len {
            return None;
        }
        let max_start = from.min(s_len - search_len);
        (0..=max_start)
            .rev()
            .find(|&i| self.code_units[i..i + search_len] == search.code_units[..])
    }

    pub fn slice_utf16(&self, start: usize, end: usize) -> JsString {
        let s = start.min(self.code_units.len());
        let e = end.min(self.code_units.len());
        if s >= e {
            return JsString::default();
        }
        JsString {
            code_units: self.code_units[s..e].to_vec(),
        }
    }

    pub fn concat(&self, other: &JsString) -> JsString {
        let mut code_units = Vec::with_capacity(self.len() + other.len());
        code_units.extend_from_slice(&self.code_units);
        code_units.extend_from_slice(&other.code_units);
        JsString { code_units }
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString::from_str(s)
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rust_string())
    }
}

#[derive(Clone, Debug)]
pub struct JsSymbol {
    pub id: u64,
    pub description: Option<JsString>,
}

/// Property keys produced for symbols start with this marker so they never
/// show up among string-keyed own properties. String names that begin with
/// the marker are stored with a second one in front (see
/// [`string_property_key`]).
pub(crate) const SYMBOL_KEY_PREFIX: char = '\0';

impl JsSymbol {
    /// Convert to the internal property key string. The id keeps two symbols
    /// with the same description apart.
    pub fn to_property_key(&self) -> String {
        match &self.description {
            Some(desc) => format!("{SYMBOL_KEY_PREFIX}Symbol({desc})#{}", self.id),
            None => format!("{SYMBOL_KEY_PREFIX}Symbol()#{}", self.id),
        }
    }
}

pub(crate) fn is_symbol_key(key: &str) -> bool {
    key.strip_prefix(SYMBOL_KEY_PREFIX)
        .is_some_and(|rest| rest.starts_with("Symbol("))
}

/// Internal key for a string property name.
pub(crate) fn string_property_key(name: &str) -> String {
    if name.starts_with(SYMBOL_KEY_PREFIX) {
        format!("{SYMBOL_KEY_PREFIX}{name}")
    } else {
        name.to_string()
    }
}

/// The property name stored under a string key; inverse of
/// [`string_property_key`].
pub(crate) fn property_key_name(key: &str) -> &str {
    key.strip_prefix(SYMBOL_KEY_PREFIX).unwrap_or(key)
}

/// Shared handle to a mutable object. Cloning the handle shares the object.
#[derive(Clone)]
pub struct JsObject(Rc<RefCell<JsObjectData>>);

impl JsObject {
    pub(crate) fn new(data: JsObjectData) -> Self {
        JsObject(Rc::new(RefCell::new(data)))
    }

    pub fn borrow(&self) -> Ref<'_, JsObjectData> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, JsObjectData> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &JsObject) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn class_name(&self) -> &'static str {
        self.0.borrow().class_name
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for JsObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(data) => write!(f, "JsObject({}@{:#x})", data.class_name, self.addr()),
            Err(_) => write!(f, "JsObject(<borrowed>@{:#x})", self.addr()),
        }
    }
}

impl JsValue {
    pub fn string(s: &str) -> Self {
        JsValue::String(JsString::from_str(s))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsValue::Null)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, JsValue::Boolean(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, JsValue::Number(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, JsValue::String(_))
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, JsValue::Symbol(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsValue::Object(_))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, JsValue::Number(n) if n.is_nan())
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            JsValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            JsValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&JsString> {
        match self {
            JsValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&JsSymbol> {
        match self {
            JsValue::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&JsObject> {
        match self {
            JsValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// True when the value is an object that can be called.
    pub fn is_callable(&self) -> bool {
        match self {
            JsValue::Object(o) => o.borrow().is_callable(),
            _ => false,
        }
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::string(s)
    }
}

impl From<JsString> for JsValue {
    fn from(s: JsString) -> Self {
        JsValue::String(s)
    }
}

impl From<JsObject> for JsValue {
    fn from(o: JsObject) -> Self {
        JsValue::Object(o)
    }
}

// Identity equality: tags must match, numbers compare by SameValue.
impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) | (JsValue::Null, JsValue::Null) => true,
            (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
            (JsValue::Number(a), JsValue::Number(b)) => number_ops::same_value(*a, *b),
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Symbol(a), JsValue::Symbol(b)) => a.id == b.id,
            (JsValue::Object(a), JsValue::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Eq for JsValue {}

impl Hash for JsValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            JsValue::Undefined | JsValue::Null => {}
            JsValue::Boolean(b) => b.hash(state),
            JsValue::Number(n) => {
                let bits = if n.is_nan() { f64::NAN.to_bits() } else { n.to_bits() };
                bits.hash(state);
            }
            JsValue::String(s) => s.hash(state),
            JsValue::Symbol(s) => s.id.hash(state),
            JsValue::Object(o) => o.addr().hash(state),
        }
    }
}

// §8.5 Number type operations
pub mod number_ops {
    const TWO_32: f64 = 4294967296.0;

    pub fn unary_minus(x: f64) -> f64 {
        if x.is_nan() { f64::NAN } else { -x }
    }

    pub fn bitwise_not(x: f64) -> f64 {
        f64::from(!to_int32(x))
    }

    pub fn left_shift(x: f64, y: f64) -> f64 {
        let shift = to_uint32(y) & 0x1F;
        f64::from(to_int32(x).wrapping_shl(shift))
    }

    pub fn signed_right_shift(x: f64, y: f64) -> f64 {
        let shift = to_uint32(y) & 0x1F;
        f64::from(to_int32(x).wrapping_shr(shift))
    }

    pub fn unsigned_right_shift(x: f64, y: f64) -> f64 {
        let shift = to_uint32(y) & 0x1F;
        f64::from(to_uint32(x).wrapping_shr(shift))
    }

    pub fn bitwise_and(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) & to_int32(y))
    }

    pub fn bitwise_xor(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) ^ to_int32(y))
    }

    pub fn bitwise_or(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) | to_int32(y))
    }

    pub fn less_than(x: f64, y: f64) -> Option<bool> {
        if x.is_nan() || y.is_nan() {
            None
        } else {
            Some(x < y)
        }
    }

    pub fn same_value(x: f64, y: f64) -> bool {
        if x.is_nan() && y.is_nan() {
            return true;
        }
        if x == 0.0 && y == 0.0 {
            return x.is_sign_positive() == y.is_sign_positive();
        }
        x == y
    }

    pub fn to_string(x: f64) -> String {
        if x.is_nan() {
            return "NaN".to_string();
        }
        if x == 0.0 {
            return "0".to_string();
        }
        if x.is_infinite() {
            return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
        }
        let mut buf = ryu_js::Buffer::new();
        buf.format(x).to_string()
    }

    /// Number.prototype.toString with a radix other than 10.
    pub fn to_string_radix(x: f64, radix: u32) -> String {
        if radix == 10 || !x.is_finite() || x == 0.0 {
            return to_string(x);
        }
        let negative = x < 0.0;
        let x = x.abs();
        let mut int_part = x.trunc();
        let mut frac_part = x - int_part;

        let mut int_digits = Vec::new();
        if int_part == 0.0 {
            int_digits.push('0');
        }
        while int_part >= 1.0 {
            let digit = (int_part % f64::from(radix)) as u32;
            int_digits.push(char::from_digit(digit, radix).unwrap_or('0'));
            int_part = (int_part / f64::from(radix)).trunc();
        }
        let mut out = String::new();
        if negative {
            out.push('-');
        }
        out.extend(int_digits.iter().rev());

        if frac_part > 0.0 {
            out.push('.');
            // 52 bits of mantissa never need more digits than this in base 2
            for _ in 0..52 {
                frac_part *= f64::from(radix);
                let digit = frac_part.trunc() as u32;
                out.push(char::from_digit(digit, radix).unwrap_or('0'));
                frac_part -= f64::from(digit);
                if frac_part <= 0.0 {
                    break;
                }
            }
        }
        out
    }

    // §9.6 ToUint32
    /// Value of a big-endian run of hex digit values, rounded once to the
    /// nearest double.
    pub fn from_hex_digits(digits: &[u8]) -> f64 {
        let start = digits.iter().position(|&d| d != 0).unwrap_or(digits.len());
        let digits = &digits[start..];
        // 32 digits fill a u128 exactly; anything past that only matters as
        // a sticky bit far below the 53-bit mantissa
        let (head, tail) = digits.split_at(digits.len().min(32));
        let mut acc = head.iter().fold(0u128, |acc, &d| (acc << 4) | u128::from(d));
        if tail.iter().any(|&d| d != 0) {
            acc |= 1;
        }
        let scale = i32::try_from(tail.len().saturating_mul(4)).unwrap_or(i32::MAX);
        acc as f64 * 2f64.powi(scale)
    }

    pub fn to_uint32(x: f64) -> u32 {
        if !x.is_finite() || x == 0.0 {
            return 0;
        }
        x.trunc().rem_euclid(TWO_32) as u32
    }

    // §9.5 ToInt32
    pub fn to_int32(x: f64) -> i32 {
        to_uint32(x) as i32
    }

    // §9.7 ToUint16
    pub fn to_uint16(x: f64) -> u16 {
        to_uint32(x) as u16
    }

    // §9.4 ToInteger
    pub fn to_integer(x: f64) -> f64 {
        if x.is_nan() {
            0.0
        } else if x.is_infinite() || x == 0.0 {
            x
        } else {
            x.trunc()
        }
    }
}

impl fmt::Display for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{b}"),
            JsValue::Number(n) => write!(f, "{}", number_ops::to_string(*n)),
            JsValue::String(s) => write!(f, "{s}"),
            JsValue::Symbol(s) => match &s.description {
                Some(desc) => write!(f, "Symbol({desc})"),
                None => write!(f, "Symbol()"),
            },
            JsValue::Object(o) => write!(f, "[object {}]", o.class_name()),
        }
    }
}
