use super::arg;
use crate::ast::{Expression, Statement};
use crate::interpreter::Interpreter;
use crate::interpreter::property::{PropertyDescriptor, PropertyFlag};
use crate::interpreter::types::JsFunction;
use crate::parser;
use crate::types::JsValue;

fn function_call(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    function_construct(interp, args)
}

// §15.3.2.1: the new function always closes over the global environment
fn function_construct(interp: &mut Interpreter, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let (body, params) = match args.split_last() {
        Some((body, params)) => (interp.to_string(body)?, params),
        None => (String::new(), &[][..]),
    };
    let mut names = Vec::with_capacity(params.len());
    for p in params {
        names.push(interp.to_string(p)?);
    }
    let source = format!("(function anonymous({}\n) {{\n{body}\n}})", names.join(","));
    let program = parser::parse_program(&source, false).map_err(|e| interp.parse_error_value(&e))?;
    let node = match program.body.as_slice() {
        [Statement::Expression(Expression::Function(node))] => node.clone(),
        _ => return Err(interp.create_error("SyntaxError", "Invalid function body")),
    };
    let scope = interp.global_env.clone();
    Ok(JsValue::Object(interp.create_function_object(node, scope)))
}

fn this_function(interp: &mut Interpreter, this: &JsValue, method: &str) -> Result<(), JsValue> {
    if this.is_callable() {
        return Ok(());
    }
    let shown = interp.describe(this);
    Err(interp.create_type_error(&format!("Function.prototype.{method} called on {shown}, which is not a function")))
}

fn to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Result<JsValue, JsValue> {
    this_function(interp, this, "toString")?;
    let Some(func) = this.as_object().and_then(|o| o.callable()) else {
        return Ok(JsValue::Undefined);
    };
    let text = match &func {
        JsFunction::User { node, .. } if node.source_text.is_some() => node.source_text.clone().unwrap_or_default(),
        other => format!("function {}() {{ [native code] }}", other.name()),
    };
    Ok(JsValue::string(&text))
}

fn call(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    this_function(interp, this, "call")?;
    let (this_arg, rest) = match args.split_first() {
        Some((first, rest)) => (first.clone(), rest),
        None => (JsValue::Undefined, &[][..]),
    };
    interp.call(this, &this_arg, rest)
}

// §15.3.4.3
fn apply(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    this_function(interp, this, "apply")?;
    let this_arg = arg(args, 0);
    let list = match arg(args, 1) {
        JsValue::Undefined | JsValue::Null => return interp.call(this, &this_arg, &[]),
        JsValue::Object(o) => o,
        other => {
            let shown = interp.describe(&other);
            return Err(interp.create_type_error(&format!("CreateListFromArrayLike called on non-object {shown}")));
        }
    };
    let len = interp.length_of(&list)?;
    let mut values = interp.arguments_pool.rent_vec();
    for i in 0..len {
        match interp.get(&list, &i.to_string()) {
            Ok(v) => values.push(v),
            Err(e) => {
                interp.arguments_pool.return_vec(values);
                return Err(e);
            }
        }
    }
    let result = interp.call(this, &this_arg, &values);
    interp.arguments_pool.return_vec(values);
    result
}

// §15.3.4.5
fn bind(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    this_function(interp, this, "bind")?;
    let Some(target) = this.as_object().cloned() else {
        return Ok(JsValue::Undefined);
    };
    let bound_args = args.get(1..).unwrap_or_default().to_vec();
    let target_len = match interp.get(&target, "length")? {
        JsValue::Number(n) => n,
        _ => 0.0,
    };
    let length = (target_len - bound_args.len() as f64).max(0.0);
    let target_name = match interp.get(&target, "name")? {
        JsValue::String(s) => s.to_rust_string(),
        _ => String::new(),
    };
    let bound = interp.new_function_object(JsFunction::Bound {
        target,
        this: arg(args, 0),
        args: bound_args,
    });
    let thrower = Some(JsValue::Object(interp.realm.throw_type_error.clone()));
    {
        let mut b = bound.borrow_mut();
        b.insert_property(
            "length".to_string(),
            PropertyDescriptor::new(JsValue::Number(length), PropertyFlag::ALL_FORBIDDEN),
        );
        b.insert_property(
            "name".to_string(),
            PropertyDescriptor::new(JsValue::string(&format!("bound {target_name}")), PropertyFlag::ONLY_CONFIGURABLE),
        );
        for key in ["caller", "arguments"] {
            b.insert_property(
                key.to_string(),
                PropertyDescriptor::accessor(thrower.clone(), thrower.clone(), false, false),
            );
        }
    }
    Ok(JsValue::Object(bound))
}

impl Interpreter {
    pub(super) fn setup_function_prototype(&mut self) {
        let proto = self.realm.function_prototype.clone();
        self.install_constructor("Function", 1, function_call, function_construct, &proto);
        self.install_methods(
            &proto,
            &[
                ("toString", 0, to_string),
                ("call", 1, call),
                ("apply", 2, apply),
                ("bind", 1, bind),
            ],
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
    fn constructor_builds_global_closures() {
        assert_eq!(run("new Function('a', 'b', 'return a + b')(2, 3)"), JsValue::Number(5.0));
        assert_eq!(run("Function('a, b', 'return b')(1, 7)"), JsValue::Number(7.0));
        assert_eq!(
            run("var x = 'global'; function f() { var x = 'local'; return Function('return x')(); } f()"),
            JsValue::string("global")
        );
        assert_eq!(run("Function()()"), JsValue::Undefined);
        assert!(error_of("Function('return +')").starts_with("SyntaxError"));
    }

    #[test]
    fn call_and_apply() {
        assert_eq!(run("function f(a, b) { return this.k + a + b; } f.call({ k: 1 }, 2, 3)"), JsValue::Number(6.0));
        assert_eq!(run("function f(a, b) { return this.k + a + b; } f.apply({ k: 1 }, [2, 3])"), JsValue::Number(6.0));
        assert_eq!(
            run("function f() { return arguments.length; } f.apply(null, { length: 2, 0: 'a', 1: 'b' })"),
            JsValue::Number(2.0)
        );
        assert_eq!(run("function f() { return arguments.length; } f.apply(null)"), JsValue::Number(0.0));
        assert!(error_of("(function () {}).apply(null, 1)").starts_with("TypeError"));
        assert!(error_of("Function.prototype.call.call(1)").starts_with("TypeError"));
    }

    #[test]
    fn bind_fixes_this_and_arguments() {
        let src = "
            function f(a, b, c) { return [this.v, a, b, c].join(); }
            var g = f.bind({ v: 0 }, 1, 2);
            [g(3), g.length, g.name, g.hasOwnProperty('prototype')].join('|')";
        assert_eq!(run(src), JsValue::string("0,1,2,3|1|bound f|false"));
        assert_eq!(run("function P(x) { this.x = x; } var B = P.bind(null, 4); var o = new B(); o.x === 4 && o instanceof P"), JsValue::Boolean(true));
        assert!(error_of("(function () {}).bind().caller").starts_with("TypeError"));
    }

    #[test]
    fn to_string_renders_source_or_native_marker() {
        assert_eq!(run("(function add(a, b) { return a + b; }).toString()"), JsValue::string("function add(a, b) { return a + b; }"));
        assert_eq!(run("parseInt.toString()"), JsValue::string("function parseInt() { [native code] }"));
    }

    #[test]
    fn prototype_is_callable() {
        assert_eq!(run("Function.prototype()"), JsValue::Undefined);
        assert_eq!(run("Object.getPrototypeOf(Function) === Function.prototype"), JsValue::Boolean(true));
    }
}
