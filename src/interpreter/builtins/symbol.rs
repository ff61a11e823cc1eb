use super::arg;
use crate::interpreter::Interpreter;
use crate::interpreter::property::{PropertyDescriptor, PropertyFlag};
use crate::interpreter::types::{Completion, JsFunction};
use crate::types::{JsSymbol, JsValue};

fn symbol_call(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let description = match arg(args, 0) {
        JsValue::Undefined => None,
        d => Some(interp.to_js_string(&d)?),
    };
    let id = interp.next_symbol_id;
    interp.next_symbol_id += 1;
    Ok(JsValue::Symbol(JsSymbol { id, description }))
}

fn this_symbol(interp: &mut Interpreter, this: &JsValue, method: &str) -> Result<JsSymbol, JsValue> {
    match this {
        JsValue::Symbol(s) => Ok(s.clone()),
        _ => Err(interp.create_type_error(&format!("Symbol.prototype.{method} requires that 'this' be a Symbol"))),
    }
}

fn to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Result<JsValue, JsValue> {
    let sym = this_symbol(interp, this, "toString")?;
    let desc = sym.description.map(|d| d.to_rust_string()).unwrap_or_default();
    Ok(JsValue::string(&format!("Symbol({desc})")))
}

fn value_of(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Result<JsValue, JsValue> {
    this_symbol(interp, this, "valueOf").map(JsValue::Symbol)
}

impl Interpreter {
    pub(super) fn setup_symbol_prototype(&mut self) {
        let proto = self.realm.symbol_prototype.clone();
        // callable but not a constructor
        let ctor = self.new_function_object(JsFunction::native("Symbol", 0, |interp, this, args| {
            Completion::from(symbol_call(interp, this, args))
        }));
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
            .insert_builtin("Symbol".to_string(), JsValue::Object(ctor));
        self.install_methods(&proto, &[("toString", 0, to_string), ("valueOf", 0, value_of)]);
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
    fn symbols_are_unique_keys() {
        assert_eq!(run("Symbol('a') === Symbol('a')"), JsValue::Boolean(false));
        assert_eq!(run("var s = Symbol('k'); var o = {}; o[s] = 1; o[s] + Object.keys(o).length"), JsValue::Number(1.0));
        assert_eq!(run("typeof Symbol()"), JsValue::string("symbol"));
    }

    #[test]
    fn describes_itself() {
        assert_eq!(run("Symbol('tag').toString()"), JsValue::string("Symbol(tag)"));
        assert_eq!(run("Symbol().toString()"), JsValue::string("Symbol()"));
        let mut interp = Interpreter::new();
        assert!(interp.execute("new Symbol()").is_err());
        assert!(interp.execute("Symbol() + ''").is_err());
    }
}
