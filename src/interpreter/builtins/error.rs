use super::arg;
use crate::interpreter::Interpreter;
use crate::interpreter::object::{JsObjectData, ObjectKind};
use crate::interpreter::property::{PropertyDescriptor, PropertyFlag};
use crate::interpreter::types::{Completion, JsFunction};
use crate::types::{JsObject, JsValue};

const NATIVE_ERRORS: [&str; 6] = [
    "TypeError",
    "ReferenceError",
    "SyntaxError",
    "RangeError",
    "EvalError",
    "URIError",
];

// §15.11.1.1: calling and constructing behave alike
fn construct_error(interp: &mut Interpreter, proto: &JsObject, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let mut data = JsObjectData::new(Some(proto.clone()), "Error", ObjectKind::Error);
    let message = arg(args, 0);
    if !message.is_undefined() {
        let message = interp.to_js_string(&message)?;
        data.insert_builtin("message".to_string(), JsValue::String(message));
    }
    Ok(JsValue::Object(JsObject::new(data)))
}

// §15.11.4.4
fn to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Result<JsValue, JsValue> {
    let JsValue::Object(obj) = this else {
        let shown = interp.describe(this);
        return Err(interp.create_type_error(&format!("Error.prototype.toString called on non-object {shown}")));
    };
    let name = match interp.get(obj, "name")? {
        JsValue::Undefined => "Error".to_string(),
        v => interp.to_string(&v)?,
    };
    let message = match interp.get(obj, "message")? {
        JsValue::Undefined => String::new(),
        v => interp.to_string(&v)?,
    };
    let text = match (name.is_empty(), message.is_empty()) {
        (true, _) => message,
        (false, true) => name,
        (false, false) => format!("{name}: {message}"),
    };
    Ok(JsValue::string(&text))
}

impl Interpreter {
    fn install_error_constructor(&mut self, name: &'static str, proto: &JsObject) {
        {
            let mut p = proto.borrow_mut();
            p.insert_builtin("name".to_string(), JsValue::string(name));
            p.insert_builtin("message".to_string(), JsValue::string(""));
        }
        let call_proto = proto.clone();
        let construct_proto = proto.clone();
        let ctor = self.new_function_object(JsFunction::constructor(
            name,
            1,
            move |interp, _this, args| Completion::from(construct_error(interp, &call_proto, args)),
            move |interp, args| Completion::from(construct_error(interp, &construct_proto, args)),
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
            .insert_builtin(name.to_string(), JsValue::Object(ctor));
    }

    pub(super) fn setup_error_prototypes(&mut self) {
        let base = self.realm.error_prototype.clone();
        self.install_error_constructor("Error", &base);
        self.install_methods(&base, &[("toString", 0, to_string)]);
        for name in NATIVE_ERRORS {
            let proto = JsObject::new(JsObjectData::new(Some(base.clone()), "Error", ObjectKind::Error));
            self.install_error_constructor(name, &proto);
            self.realm.error_prototypes.insert(name, proto);
        }
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
    fn constructors_with_and_without_new() {
        assert_eq!(run("var e = new Error('boom'); e.message + '|' + e.name"), JsValue::string("boom|Error"));
        assert_eq!(run("TypeError('t') instanceof TypeError"), JsValue::Boolean(true));
        assert_eq!(run("new RangeError() instanceof Error"), JsValue::Boolean(true));
        assert_eq!(run("new Error().hasOwnProperty('message')"), JsValue::Boolean(false));
        assert_eq!(run("Object.keys(new Error('x')).length"), JsValue::Number(0.0));
    }

    #[test]
    fn to_string_formats_name_and_message() {
        assert_eq!(run("String(new SyntaxError('bad'))"), JsValue::string("SyntaxError: bad"));
        assert_eq!(run("String(new EvalError())"), JsValue::string("EvalError"));
        assert_eq!(run("var e = new Error('m'); e.name = ''; e.toString()"), JsValue::string("m"));
        assert_eq!(
            run("Error.prototype.toString.call({ name: 'Custom', message: 'x' })"),
            JsValue::string("Custom: x")
        );
    }

    #[test]
    fn engine_errors_use_the_realm_prototypes() {
        assert_eq!(run("try { null.x; } catch (e) { e instanceof TypeError && e.constructor === TypeError }"), JsValue::Boolean(true));
        assert_eq!(run("try { missing; } catch (e) { e.name }"), JsValue::string("ReferenceError"));
        assert_eq!(run("try { eval('var'); } catch (e) { e instanceof SyntaxError }"), JsValue::Boolean(true));
    }

    #[test]
    fn class_is_error() {
        assert_eq!(run("Object.prototype.toString.call(new URIError())"), JsValue::string("[object Error]"));
    }
}
