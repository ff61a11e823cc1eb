mod array;
mod error;
mod function;
mod number;
mod object;
mod string;
mod symbol;

use super::Interpreter;
use super::helpers::{is_js_whitespace, string_to_number};
use super::property::{PropertyDescriptor, PropertyFlag};
use super::types::{Completion, JsFunction};
use crate::types::{JsObject, JsString, JsValue};

/// Signature shared by the library's native functions.
pub(super) type Builtin = fn(&mut Interpreter, &JsValue, &[JsValue]) -> Result<JsValue, JsValue>;
pub(super) type BuiltinCtor = fn(&mut Interpreter, &[JsValue]) -> Result<JsValue, JsValue>;

pub(super) fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or_default()
}

// §15.1.2.2 parseInt
fn parse_int(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let input = interp.to_string(&arg(args, 0))?;
    let mut radix = interp.to_int32(&arg(args, 1))?;
    let s = input.trim_start_matches(is_js_whitespace);
    let (sign, mut s) = match s.as_bytes().first() {
        Some(b'-') => (-1.0, &s[1..]),
        Some(b'+') => (1.0, &s[1..]),
        _ => (1.0, s),
    };
    let mut strip_prefix = true;
    if radix != 0 {
        if !(2..=36).contains(&radix) {
            return Ok(JsValue::Number(f64::NAN));
        }
        if radix != 16 {
            strip_prefix = false;
        }
    } else {
        radix = 10;
    }
    if strip_prefix && let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        s = rest;
        radix = 16;
    }
    let radix = radix as u32;
    let end = s.find(|c: char| !c.is_digit(radix)).unwrap_or(s.len());
    let digits = &s[..end];
    if digits.is_empty() {
        return Ok(JsValue::Number(f64::NAN));
    }
    let value = if radix == 10 {
        digits.parse::<f64>().unwrap_or(f64::NAN)
    } else {
        digits
            .chars()
            .filter_map(|c| c.to_digit(radix))
            .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d))
    };
    Ok(JsValue::Number(sign * value))
}

/// Length of the longest prefix of `s` that is a StrDecimalLiteral.
fn decimal_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    if s[i..].starts_with("Infinity") {
        return i + "Infinity".len();
    }
    let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();
    let int_digits = digits(i);
    i += int_digits;
    let mut frac_digits = 0;
    if bytes.get(i) == Some(&b'.') {
        frac_digits = digits(i + 1);
        if int_digits > 0 || frac_digits > 0 {
            i += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return 0;
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_digits = digits(j);
        if exp_digits > 0 {
            i = j + exp_digits;
        }
    }
    i
}

// §15.1.2.3 parseFloat
fn parse_float(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let input = interp.to_string(&arg(args, 0))?;
    let s = input.trim_start_matches(is_js_whitespace);
    let len = decimal_prefix_len(s);
    if len == 0 {
        return Ok(JsValue::Number(f64::NAN));
    }
    Ok(JsValue::Number(string_to_number(&JsString::from_str(&s[..len]))))
}

fn is_nan(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    Ok(JsValue::Boolean(interp.to_number(&arg(args, 0))?.is_nan()))
}

fn is_finite(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    Ok(JsValue::Boolean(interp.to_number(&arg(args, 0))?.is_finite()))
}

impl Interpreter {
    pub(crate) fn setup_globals(&mut self) {
        let global = self.realm.global_object.clone();
        {
            let mut g = global.borrow_mut();
            for (name, value) in [
                ("undefined", JsValue::Undefined),
                ("NaN", JsValue::Number(f64::NAN)),
                ("Infinity", JsValue::Number(f64::INFINITY)),
            ] {
                g.insert_property(name.to_string(), PropertyDescriptor::new(value, PropertyFlag::ALL_FORBIDDEN));
            }
            g.insert_builtin("eval".to_string(), JsValue::Object(self.realm.eval.clone()));
        }
        self.install_methods(
            &global,
            &[
                ("isNaN", 1, is_nan),
                ("isFinite", 1, is_finite),
                ("parseInt", 2, parse_int),
                ("parseFloat", 1, parse_float),
            ],
        );

        self.setup_object_prototype();
        self.setup_function_prototype();
        self.setup_array_prototype();
        self.setup_boolean_prototype();
        self.setup_number_prototype();
        self.setup_string_prototype();
        self.setup_error_prototypes();
        self.setup_symbol_prototype();
    }

    /// Installs native methods as non-enumerable properties of `target`.
    pub(super) fn install_methods(&mut self, target: &JsObject, methods: &[(&str, usize, Builtin)]) {
        for &(name, arity, f) in methods {
            let func = self.create_function(JsFunction::native(name, arity, move |interp, this, args| {
                Completion::from(f(interp, this, args))
            }));
            target.borrow_mut().insert_builtin(name.to_string(), func);
        }
    }

    /// Creates a global constructor wired to `proto` through `prototype`
    /// and `constructor`.
    pub(super) fn install_constructor(
        &mut self,
        name: &str,
        arity: usize,
        call: Builtin,
        construct: BuiltinCtor,
        proto: &JsObject,
    ) -> JsObject {
        let ctor = self.new_function_object(JsFunction::constructor(
            name,
            arity,
            move |interp, this, args| Completion::from(call(interp, this, args)),
            move |interp, args| Completion::from(construct(interp, args)),
        ));
        ctor.borrow_mut().insert_property(
            "prototype".to_string(),
            PropertyDescriptor::new(JsValue::Object(proto.clone()), PropertyFlag::ALL_FORBIDDEN),
        );
        proto
            .borrow_mut()
            .insert_builtin("constructor".to_string(), JsValue::Object(ctor.clone()));
        self.realm
            .global_object
            .borrow_mut()
            .insert_builtin(name.to_string(), JsValue::Object(ctor.clone()));
        ctor
    }

    /// Installs read-only constant properties.
    pub(super) fn install_constants(target: &JsObject, constants: &[(&str, f64)]) {
        let mut t = target.borrow_mut();
        for &(name, value) in constants {
            t.insert_property(
                name.to_string(),
                PropertyDescriptor::new(JsValue::Number(value), PropertyFlag::ALL_FORBIDDEN),
            );
        }
    }

    /// Requires `value` to be callable, naming `method` in the TypeError.
    pub(super) fn require_callable(&mut self, value: &JsValue, method: &str) -> Result<(), JsValue> {
        if value.is_callable() {
            return Ok(());
        }
        let shown = self.describe(value);
        Err(self.create_type_error(&format!("{method}: {shown} is not a function")))
    }

    /// `length` of an array-like as a uint32 (ES5 §15.4.4 generic methods).
    pub(super) fn length_of(&mut self, obj: &JsObject) -> Result<u32, JsValue> {
        let len = self.get(obj, "length")?;
        self.to_uint32(&len)
    }

    /// A new empty array with the given `length`.
    pub(super) fn array_with_length(&mut self, len: u32) -> Result<JsObject, JsValue> {
        let arr = self.create_array(Vec::new());
        let JsValue::Object(obj) = arr else {
            return Err(self.create_type_error("array allocation failed"));
        };
        if len > 0 {
            self.put(&obj, "length", JsValue::Number(f64::from(len)), true)?;
        }
        Ok(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> JsValue {
        let mut interp = Interpreter::new();
        match interp.execute(src) {
            Ok(v) => v,
            Err(e) => panic!("script failed: {e}"),
        }
    }

    #[test]
    fn global_constants_are_read_only() {
        assert_eq!(run("NaN = 1; typeof NaN === 'number' && NaN !== NaN"), JsValue::Boolean(true));
        assert_eq!(run("undefined = 1; undefined"), JsValue::Undefined);
        assert_eq!(
            run("var d = Object.getOwnPropertyDescriptor(this, 'Infinity'); d.writable || d.enumerable || d.configurable"),
            JsValue::Boolean(false)
        );
    }

    #[test]
    fn parse_int_radix_and_prefix() {
        assert_eq!(run("parseInt('  42px')"), JsValue::Number(42.0));
        assert_eq!(run("parseInt('0x1f')"), JsValue::Number(31.0));
        assert_eq!(run("parseInt('-ff', 16)"), JsValue::Number(-255.0));
        assert_eq!(run("parseInt('101', 2)"), JsValue::Number(5.0));
        assert_eq!(run("parseInt('08')"), JsValue::Number(8.0));
        assert!(run("parseInt('z', 37)").is_nan());
        assert!(run("parseInt('')").is_nan());
    }

    #[test]
    fn parse_float_prefixes() {
        assert_eq!(run("parseFloat('3.5e2abc')"), JsValue::Number(350.0));
        assert_eq!(run("parseFloat('  -.5')"), JsValue::Number(-0.5));
        assert_eq!(run("parseFloat('1e')"), JsValue::Number(1.0));
        assert_eq!(run("parseFloat('-Infinityx')"), JsValue::Number(f64::NEG_INFINITY));
        assert!(run("parseFloat('.')").is_nan());
        assert!(run("parseFloat('inf')").is_nan());
    }

    #[test]
    fn is_nan_and_is_finite_convert() {
        assert_eq!(run("isNaN('abc') && !isNaN('12')"), JsValue::Boolean(true));
        assert_eq!(run("isFinite('1e3') && !isFinite(Infinity)"), JsValue::Boolean(true));
    }

    #[test]
    fn decimal_prefix() {
        assert_eq!(decimal_prefix_len("12.5e+3x"), 7);
        assert_eq!(decimal_prefix_len("5."), 2);
        assert_eq!(decimal_prefix_len("e5"), 0);
    }
}
