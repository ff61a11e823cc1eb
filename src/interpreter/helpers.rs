use super::Interpreter;
use super::object::{JsObjectData, ObjectKind};
use crate::types::{JsObject, JsString, JsValue, number_ops, string_property_key};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreferredType {
    Default,
    Number,
    String,
}

// ES5 §7.2 / §7.3: WhiteSpace and LineTerminator
pub(crate) fn is_js_whitespace(c: char) -> bool {
    matches!(
        c,
        '\u{0009}' | '\u{000B}' | '\u{000C}' | ' ' | '\u{00A0}' | '\u{FEFF}' | '\n' | '\r' | '\u{2028}' | '\u{2029}'
    ) || (!c.is_ascii() && c != '\u{0085}' && c.is_whitespace())
}

pub(crate) fn trim_js(s: &str) -> &str {
    s.trim_matches(is_js_whitespace)
}

// §9.2 ToBoolean
pub(crate) fn to_boolean(val: &JsValue) -> bool {
    match val {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
        JsValue::String(s) => !s.is_empty(),
        JsValue::Symbol(_) | JsValue::Object(_) => true,
    }
}

// §9.3.1 ToNumber applied to the String type
pub(crate) fn string_to_number(s: &JsString) -> f64 {
    let rust_str = s.to_rust_string();
    let trimmed = trim_js(&rust_str);
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return f64::NAN;
        }
        let digits: Vec<u8> = hex
            .bytes()
            .map(|b| (b as char).to_digit(16).map_or(0, |d| d as u8))
            .collect();
        return number_ops::from_hex_digits(&digits);
    }
    let (sign, unsigned) = match trimmed.as_bytes()[0] {
        b'+' => (1.0, &trimmed[1..]),
        b'-' => (-1.0, &trimmed[1..]),
        _ => (1.0, trimmed),
    };
    if unsigned == "Infinity" {
        return sign * f64::INFINITY;
    }
    if !is_str_decimal_literal(unsigned) {
        return f64::NAN;
    }
    unsigned.parse::<f64>().map_or(f64::NAN, |n| sign * n)
}

/// Digits with an optional fraction and exponent. Rejects what Rust's float
/// parser would otherwise accept (`inf`, `nan`, `1_000`).
fn is_str_decimal_literal(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    let digits = |i: &mut usize| {
        let start = *i;
        while *i < bytes.len() && bytes[*i].is_ascii_digit() {
            *i += 1;
        }
        *i - start
    };
    let int_digits = digits(&mut i);
    let mut frac_digits = 0;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        frac_digits = digits(&mut i);
    }
    if int_digits + frac_digits == 0 {
        return false;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        if digits(&mut i) == 0 {
            return false;
        }
    }
    i == bytes.len()
}

/// ToNumber for non-object values.
pub(crate) fn primitive_to_number(val: &JsValue) -> f64 {
    match val {
        JsValue::Undefined => f64::NAN,
        JsValue::Null => 0.0,
        JsValue::Boolean(b) => f64::from(u8::from(*b)),
        JsValue::Number(n) => *n,
        JsValue::String(s) => string_to_number(s),
        JsValue::Symbol(_) | JsValue::Object(_) => f64::NAN,
    }
}

// §11.9.6 The Strict Equality Comparison Algorithm
pub(crate) fn strict_equality(left: &JsValue, right: &JsValue) -> bool {
    match (left, right) {
        (JsValue::Number(a), JsValue::Number(b)) => a == b,
        _ => left == right,
    }
}

// §11.4.3
pub(crate) fn typeof_val(val: &JsValue) -> &'static str {
    match val {
        JsValue::Undefined => "undefined",
        JsValue::Null => "object",
        JsValue::Boolean(_) => "boolean",
        JsValue::Number(_) => "number",
        JsValue::String(_) => "string",
        JsValue::Symbol(_) => "symbol",
        JsValue::Object(o) => {
            if o.borrow().is_callable() {
                "function"
            } else {
                "object"
            }
        }
    }
}

pub(crate) fn to_integer_or_infinity(n: f64) -> f64 {
    number_ops::to_integer(n)
}

/// Clamps a relative index argument (as in `slice`) into `0..=len`.
pub(crate) fn relative_index(n: f64, len: f64) -> f64 {
    let n = to_integer_or_infinity(n);
    if n < 0.0 { (len + n).max(0.0) } else { n.min(len) }
}

impl Interpreter {
    // §9.1 ToPrimitive
    pub fn to_primitive(&mut self, val: &JsValue, hint: PreferredType) -> Result<JsValue, JsValue> {
        match val {
            JsValue::Object(obj) => self.default_value(obj, hint),
            _ => Ok(val.clone()),
        }
    }

    // §8.12.8 [[DefaultValue]]
    pub(crate) fn default_value(&mut self, obj: &JsObject, hint: PreferredType) -> Result<JsValue, JsValue> {
        let order = if hint == PreferredType::String {
            ["toString", "valueOf"]
        } else {
            ["valueOf", "toString"]
        };
        for name in order {
            let method = self.get(obj, name)?;
            if method.is_callable() {
                let result = self.call(&method, &JsValue::Object(obj.clone()), &[])?;
                if !result.is_object() {
                    return Ok(result);
                }
            }
        }
        Err(self.create_type_error("Cannot convert object to primitive value"))
    }

    // §9.3 ToNumber
    pub fn to_number(&mut self, val: &JsValue) -> Result<f64, JsValue> {
        match val {
            JsValue::Symbol(_) => Err(self.create_type_error("Cannot convert a Symbol value to a number")),
            JsValue::Object(_) => {
                let prim = self.to_primitive(val, PreferredType::Number)?;
                self.to_number(&prim)
            }
            _ => Ok(primitive_to_number(val)),
        }
    }

    pub(crate) fn to_int32(&mut self, val: &JsValue) -> Result<i32, JsValue> {
        Ok(number_ops::to_int32(self.to_number(val)?))
    }

    pub(crate) fn to_uint32(&mut self, val: &JsValue) -> Result<u32, JsValue> {
        Ok(number_ops::to_uint32(self.to_number(val)?))
    }

    pub(crate) fn to_integer(&mut self, val: &JsValue) -> Result<f64, JsValue> {
        Ok(number_ops::to_integer(self.to_number(val)?))
    }

    // §9.8 ToString
    pub fn to_js_string(&mut self, val: &JsValue) -> Result<JsString, JsValue> {
        match val {
            JsValue::Undefined => Ok(JsString::from_str("undefined")),
            JsValue::Null => Ok(JsString::from_str("null")),
            JsValue::Boolean(b) => Ok(JsString::from_str(if *b { "true" } else { "false" })),
            JsValue::Number(n) => Ok(JsString::from_str(&number_ops::to_string(*n))),
            JsValue::String(s) => Ok(s.clone()),
            JsValue::Symbol(_) => Err(self.create_type_error("Cannot convert a Symbol value to a string")),
            JsValue::Object(_) => {
                let prim = self.to_primitive(val, PreferredType::String)?;
                self.to_js_string(&prim)
            }
        }
    }

    pub fn to_string(&mut self, val: &JsValue) -> Result<String, JsValue> {
        Ok(self.to_js_string(val)?.to_rust_string())
    }

    /// ToString for diagnostics; never throws.
    pub fn to_display_string(&mut self, val: &JsValue) -> String {
        match val {
            JsValue::Symbol(s) => match &s.description {
                Some(d) => format!("Symbol({d})"),
                None => "Symbol()".to_string(),
            },
            _ => self.to_string(val).unwrap_or_else(|_| format!("{val}")),
        }
    }

    /// ToPropertyKey: symbols map to their internal key, everything else
    /// through ToString.
    pub(crate) fn to_property_key(&mut self, val: &JsValue) -> Result<String, JsValue> {
        match val {
            JsValue::Symbol(s) => Ok(s.to_property_key()),
            JsValue::String(s) => Ok(string_property_key(&s.to_rust_string())),
            JsValue::Object(_) => {
                let prim = self.to_primitive(val, PreferredType::String)?;
                self.to_property_key(&prim)
            }
            _ => self.to_string(val),
        }
    }

    // §9.9 ToObject
    pub fn to_object(&mut self, val: &JsValue) -> Result<JsObject, JsValue> {
        let (proto, class_name, kind) = match val {
            JsValue::Object(o) => return Ok(o.clone()),
            JsValue::Undefined | JsValue::Null => {
                return Err(self.create_type_error(&format!("Cannot convert {val} to object")));
            }
            JsValue::Boolean(b) => (self.realm.boolean_prototype.clone(), "Boolean", ObjectKind::Boolean(*b)),
            JsValue::Number(n) => (self.realm.number_prototype.clone(), "Number", ObjectKind::Number(*n)),
            JsValue::String(s) => (self.realm.string_prototype.clone(), "String", ObjectKind::String(s.clone())),
            JsValue::Symbol(_) => (self.realm.symbol_prototype.clone(), "Symbol", ObjectKind::Ordinary),
        };
        Ok(JsObject::new(JsObjectData::new(Some(proto), class_name, kind)))
    }

    // §9.10 CheckObjectCoercible
    pub(crate) fn check_object_coercible(&mut self, val: &JsValue, method: &str) -> Result<(), JsValue> {
        if val.is_nullish() {
            return Err(self.create_type_error(&format!("{method} called on null or undefined")));
        }
        Ok(())
    }

    pub fn to_boolean(&self, val: &JsValue) -> bool {
        to_boolean(val)
    }

    // §11.9.3 The Abstract Equality Comparison Algorithm
    pub(crate) fn abstract_equality(&mut self, left: &JsValue, right: &JsValue) -> Result<bool, JsValue> {
        if std::mem::discriminant(left) == std::mem::discriminant(right) {
            return Ok(strict_equality(left, right));
        }
        match (left, right) {
            (JsValue::Undefined, JsValue::Null) | (JsValue::Null, JsValue::Undefined) => Ok(true),
            (JsValue::Number(_), JsValue::String(_)) => {
                Ok(strict_equality(left, &JsValue::Number(primitive_to_number(right))))
            }
            (JsValue::String(_), JsValue::Number(_)) => {
                Ok(strict_equality(&JsValue::Number(primitive_to_number(left)), right))
            }
            (JsValue::Boolean(_), _) => {
                self.abstract_equality(&JsValue::Number(primitive_to_number(left)), right)
            }
            (_, JsValue::Boolean(_)) => {
                self.abstract_equality(left, &JsValue::Number(primitive_to_number(right)))
            }
            (JsValue::Number(_) | JsValue::String(_) | JsValue::Symbol(_), JsValue::Object(_)) => {
                let prim = self.to_primitive(right, PreferredType::Default)?;
                self.abstract_equality(left, &prim)
            }
            (JsValue::Object(_), JsValue::Number(_) | JsValue::String(_) | JsValue::Symbol(_)) => {
                let prim = self.to_primitive(left, PreferredType::Default)?;
                self.abstract_equality(&prim, right)
            }
            _ => Ok(false),
        }
    }

    /// §11.8.5 The Abstract Relational Comparison Algorithm; `None` means
    /// undefined (a NaN was involved).
    pub(crate) fn abstract_relational(
        &mut self,
        left: &JsValue,
        right: &JsValue,
        left_first: bool,
    ) -> Result<Option<bool>, JsValue> {
        let (px, py) = if left_first {
            let px = self.to_primitive(left, PreferredType::Number)?;
            let py = self.to_primitive(right, PreferredType::Number)?;
            (px, py)
        } else {
            let py = self.to_primitive(right, PreferredType::Number)?;
            let px = self.to_primitive(left, PreferredType::Number)?;
            (px, py)
        };
        if let (JsValue::String(a), JsValue::String(b)) = (&px, &py) {
            return Ok(Some(a.code_units < b.code_units));
        }
        let nx = self.to_number(&px)?;
        let ny = self.to_number(&py)?;
        Ok(number_ops::less_than(nx, ny))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(s: &str) -> f64 {
        string_to_number(&JsString::from_str(s))
    }

    #[test]
    fn string_to_number_grammar() {
        assert_eq!(num(""), 0.0);
        assert_eq!(num("   "), 0.0);
        assert_eq!(num("\n\t 12 \u{2028}"), 12.0);
        assert_eq!(num("0x1F"), 31.0);
        assert_eq!(num("0XfF"), 255.0);
        assert_eq!(num("-Infinity"), f64::NEG_INFINITY);
        assert_eq!(num("+Infinity"), f64::INFINITY);
        assert_eq!(num("1e3"), 1000.0);
        assert_eq!(num(".5"), 0.5);
        assert_eq!(num("5."), 5.0);
        assert_eq!(num("-0.25"), -0.25);
    }

    #[test]
    fn hex_strings_round_once() {
        // digit-by-digit folding would round 0x100000000000008 down first
        assert_eq!(num("0x1000000000000081"), 2f64.powi(60) + 256.0);
        assert_eq!(num("0x20000000000001"), 9007199254740992.0);
        assert_eq!(num(&format!("0x1{}", "0".repeat(39))), 2f64.powi(156));
        let sticky = format!("0x20000000000001{}1", "0".repeat(31));
        assert_eq!(num(&sticky), 9007199254740994.0 * 2f64.powi(128));
        assert_eq!(num(&format!("0x{}ff", "0".repeat(40))), 255.0);
    }

    #[test]
    fn string_to_number_rejects_non_literals() {
        for s in ["inf", "nan", "NaN", "infinity", "1_000", "0x", "-0x10", "1e", "abc", "1 2", "."] {
            assert!(num(s).is_nan(), "{s} should be NaN");
        }
    }

    #[test]
    fn int32_edge_cases() {
        for n in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(number_ops::to_int32(n), 0);
            assert_eq!(number_ops::to_uint32(n), 0);
        }
        assert_eq!(number_ops::to_int32(4294967296.0 + 5.0), 5);
        assert_eq!(number_ops::to_uint32(-1.0), 4294967295);
    }

    #[test]
    fn to_boolean_values() {
        assert!(!to_boolean(&JsValue::Number(f64::NAN)));
        assert!(!to_boolean(&JsValue::Number(-0.0)));
        assert!(!to_boolean(&JsValue::string("")));
        assert!(to_boolean(&JsValue::string("0")));
    }

    #[test]
    fn strict_equality_uses_ieee_for_numbers() {
        assert!(!strict_equality(&JsValue::Number(f64::NAN), &JsValue::Number(f64::NAN)));
        assert!(strict_equality(&JsValue::Number(0.0), &JsValue::Number(-0.0)));
        assert!(!strict_equality(&JsValue::Null, &JsValue::Undefined));
    }

    #[test]
    fn to_primitive_default_prefers_value_of() {
        let mut interp = Interpreter::new();
        let v = interp
            .execute(
                "var called = false; \
                 var o = { valueOf: function () { return 7; }, toString: function () { called = true; return 's'; } }; \
                 (o + 1) + ':' + called",
            )
            .unwrap();
        assert_eq!(v, JsValue::string("8:false"));
    }

    #[test]
    fn to_primitive_string_hint_prefers_to_string() {
        let mut interp = Interpreter::new();
        let v = interp
            .execute("var o = { valueOf: function () { return 7; }, toString: function () { return 's'; } }; String(o)")
            .unwrap();
        assert_eq!(v, JsValue::string("s"));
    }

    #[test]
    fn to_primitive_without_primitive_result_throws() {
        let mut interp = Interpreter::new();
        let v = interp
            .execute(
                "var o = { valueOf: function () { return {}; }, toString: function () { return {}; } }; \
                 try { o * 1; 'no' } catch (e) { e instanceof TypeError }",
            )
            .unwrap();
        assert_eq!(v, JsValue::Boolean(true));
    }

    #[test]
    fn to_object_rejects_nullish() {
        let mut interp = Interpreter::new();
        assert!(interp.to_object(&JsValue::Null).is_err());
        assert!(interp.to_object(&JsValue::Undefined).is_err());
        let wrapped = interp.to_object(&JsValue::string("ab")).unwrap();
        assert_eq!(wrapped.class_name(), "String");
        assert_eq!(interp.get(&wrapped, "length").unwrap(), JsValue::Number(2.0));
    }

    #[test]
    fn abstract_equality_coerces() {
        let mut interp = Interpreter::new();
        assert!(interp.abstract_equality(&JsValue::Null, &JsValue::Undefined).unwrap());
        assert!(interp.abstract_equality(&JsValue::string("1"), &JsValue::Number(1.0)).unwrap());
        assert!(interp.abstract_equality(&JsValue::Boolean(true), &JsValue::string("1")).unwrap());
        assert!(!interp.abstract_equality(&JsValue::Null, &JsValue::Number(0.0)).unwrap());
    }

    #[test]
    fn relational_compares_strings_by_code_unit() {
        let mut interp = Interpreter::new();
        let r = interp.abstract_relational(&JsValue::string("a"), &JsValue::string("b"), true);
        assert_eq!(r.unwrap(), Some(true));
        let r = interp.abstract_relational(&JsValue::Number(f64::NAN), &JsValue::Number(1.0), true);
        assert_eq!(r.unwrap(), None);
    }

    #[test]
    fn relative_index_clamps() {
        assert_eq!(relative_index(-1.0, 5.0), 4.0);
        assert_eq!(relative_index(-10.0, 5.0), 0.0);
        assert_eq!(relative_index(10.0, 5.0), 5.0);
        assert_eq!(relative_index(f64::NAN, 5.0), 0.0);
    }
}
