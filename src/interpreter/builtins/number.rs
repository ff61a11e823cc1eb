use super::arg;
use crate::interpreter::Interpreter;
use crate::interpreter::object::ObjectKind;
use crate::types::{JsValue, number_ops};

fn this_number_value(interp: &mut Interpreter, this: &JsValue, method: &str) -> Result<f64, JsValue> {
    match this {
        JsValue::Number(n) => return Ok(*n),
        JsValue::Object(o) => {
            if let ObjectKind::Number(n) = o.borrow().kind {
                return Ok(n);
            }
        }
        _ => {}
    }
    Err(interp.create_type_error(&format!("Number.prototype.{method} requires that 'this' be a Number")))
}

fn this_boolean_value(interp: &mut Interpreter, this: &JsValue, method: &str) -> Result<bool, JsValue> {
    match this {
        JsValue::Boolean(b) => return Ok(*b),
        JsValue::Object(o) => {
            if let ObjectKind::Boolean(b) = o.borrow().kind {
                return Ok(b);
            }
        }
        _ => {}
    }
    Err(interp.create_type_error(&format!("Boolean.prototype.{method} requires that 'this' be a Boolean")))
}

fn number_call(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    match args.first() {
        Some(v) => interp.to_number(v).map(JsValue::Number),
        None => Ok(JsValue::Number(0.0)),
    }
}

fn number_construct(interp: &mut Interpreter, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let n = number_call(interp, &JsValue::Undefined, args)?;
    interp.to_object(&n).map(JsValue::Object)
}

// §15.7.4.2
fn number_to_string(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let n = this_number_value(interp, this, "toString")?;
    let radix = match arg(args, 0) {
        JsValue::Undefined => 10.0,
        r => interp.to_integer(&r)?,
    };
    if !(2.0..=36.0).contains(&radix) {
        return Err(interp.create_range_error("toString() radix must be between 2 and 36"));
    }
    let text = if radix == 10.0 {
        number_ops::to_string(n)
    } else {
        number_ops::to_string_radix(n, radix as u32)
    };
    Ok(JsValue::string(&text))
}

fn number_value_of(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Result<JsValue, JsValue> {
    this_number_value(interp, this, "valueOf").map(JsValue::Number)
}

fn boolean_call(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    Ok(JsValue::Boolean(interp.to_boolean(&arg(args, 0))))
}

fn boolean_construct(interp: &mut Interpreter, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let b = JsValue::Boolean(interp.to_boolean(&arg(args, 0)));
    interp.to_object(&b).map(JsValue::Object)
}

fn boolean_to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Result<JsValue, JsValue> {
    let b = this_boolean_value(interp, this, "toString")?;
    Ok(JsValue::string(if b { "true" } else { "false" }))
}

fn boolean_value_of(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Result<JsValue, JsValue> {
    this_boolean_value(interp, this, "valueOf").map(JsValue::Boolean)
}

impl Interpreter {
    pub(super) fn setup_number_prototype(&mut self) {
        let proto = self.realm.number_prototype.clone();
        let ctor = self.install_constructor("Number", 1, number_call, number_construct, &proto);
        Self::install_constants(
            &ctor,
            &[
                ("MAX_VALUE", f64::MAX),
                ("MIN_VALUE", 5e-324),
                ("NaN", f64::NAN),
                ("POSITIVE_INFINITY", f64::INFINITY),
                ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
            ],
        );
        self.install_methods(
            &proto,
            &[("toString", 1, number_to_string), ("valueOf", 0, number_value_of)],
        );
    }

    pub(super) fn setup_boolean_prototype(&mut self) {
        let proto = self.realm.boolean_prototype.clone();
        self.install_constructor("Boolean", 1, boolean_call, boolean_construct, &proto);
        self.install_methods(
            &proto,
            &[("toString", 0, boolean_to_string), ("valueOf", 0, boolean_value_of)],
        );
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

    fn error_of(src: &str) -> String {
        let mut interp = Interpreter::new();
        match interp.execute(src) {
            Ok(v) => panic!("expected an error, got {v}"),
            Err(e) => e.to_string(),
        }
    }

    #[test]
    fn number_conversion_and_wrapping() {
        assert_eq!(run("Number('  12  ')"), JsValue::Number(12.0));
        assert_eq!(run("Number()"), JsValue::Number(0.0));
        assert_eq!(run("typeof new Number(1)"), JsValue::string("object"));
        assert_eq!(run("new Number(5) + 1"), JsValue::Number(6.0));
        assert!(run("Number('1_000')").is_nan());
    }

    #[test]
    fn number_constants() {
        assert_eq!(run("Number.MAX_VALUE"), JsValue::Number(f64::MAX));
        assert_eq!(run("Number.MIN_VALUE > 0 && Number.MIN_VALUE / 2 === 0"), JsValue::Boolean(true));
        assert_eq!(run("Number.POSITIVE_INFINITY = 1; Number.POSITIVE_INFINITY"), JsValue::Number(f64::INFINITY));
    }

    #[test]
    fn to_string_with_radix() {
        assert_eq!(run("(255).toString(16)"), JsValue::string("ff"));
        assert_eq!(run("(-5).toString(2)"), JsValue::string("-101"));
        assert_eq!(run("(0.5).toString()"), JsValue::string("0.5"));
        assert_eq!(run("(1e21).toString()"), JsValue::string("1e+21"));
        assert!(error_of("(1).toString(1)").starts_with("RangeError"));
    }

    #[test]
    fn this_checks() {
        assert!(error_of("Number.prototype.valueOf.call('1')").starts_with("TypeError"));
        assert!(error_of("Boolean.prototype.toString.call(1)").starts_with("TypeError"));
        assert_eq!(run("Number.prototype.valueOf.call(new Number(3))"), JsValue::Number(3.0));
    }

    #[test]
    fn booleans() {
        assert_eq!(run("Boolean('') || Boolean(0)"), JsValue::Boolean(false));
        assert_eq!(run("new Boolean(false) ? 'truthy' : 'falsy'"), JsValue::string("truthy"));
        assert_eq!(run("true.toString() + new Boolean(0).valueOf()"), JsValue::string("truefalse"));
    }
}
