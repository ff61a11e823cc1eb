use super::{Builtin, arg};
use crate::interpreter::Interpreter;
use crate::interpreter::property::PropertyDescriptor;
use crate::types::{JsObject, JsValue, is_symbol_key, property_key_name};

fn object_arg(interp: &mut Interpreter, args: &[JsValue], method: &str) -> Result<JsObject, JsValue> {
    match arg(args, 0) {
        JsValue::Object(o) => Ok(o),
        other => {
            let shown = interp.describe(&other);
            Err(interp.create_type_error(&format!("Object.{method} called on non-object {shown}")))
        }
    }
}

fn object_call(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    object_construct(interp, args)
}

// §15.2.2.1
fn object_construct(interp: &mut Interpreter, args: &[JsValue]) -> Result<JsValue, JsValue> {
    match arg(args, 0) {
        JsValue::Undefined | JsValue::Null => Ok(JsValue::Object(interp.create_object())),
        JsValue::Object(o) => Ok(JsValue::Object(o)),
        value => interp.to_object(&value).map(JsValue::Object),
    }
}

fn get_prototype_of(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let obj = object_arg(interp, args, "getPrototypeOf")?;
    Ok(obj.prototype().map_or(JsValue::Null, JsValue::Object))
}

fn get_own_property_descriptor(
    interp: &mut Interpreter,
    _this: &JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsValue> {
    let obj = object_arg(interp, args, "getOwnPropertyDescriptor")?;
    let key = interp.to_property_key(&arg(args, 1))?;
    match obj.get_own_property(&key) {
        Some(desc) => Ok(interp.from_property_descriptor(&desc)),
        None => Ok(JsValue::Undefined),
    }
}

fn get_own_property_names(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let obj = object_arg(interp, args, "getOwnPropertyNames")?;
    let names = obj
        .own_keys()
        .into_iter()
        .filter(|k| !is_symbol_key(k))
        .map(|k| JsValue::string(property_key_name(&k)))
        .collect();
    Ok(interp.create_array(names))
}

/// Own enumerable string keys in enumeration order.
pub(super) fn enumerable_own_keys(obj: &JsObject) -> Vec<String> {
    obj.own_keys()
        .into_iter()
        .filter(|k| !is_symbol_key(k) && obj.get_own_property(k).is_some_and(|d| d.enumerable()))
        .collect()
}

fn keys(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let obj = object_arg(interp, args, "keys")?;
    let names = enumerable_own_keys(&obj).iter().map(|k| JsValue::string(property_key_name(k))).collect();
    Ok(interp.create_array(names))
}

// §15.2.3.7
fn define_properties_from(interp: &mut Interpreter, obj: &JsObject, props: &JsValue) -> Result<(), JsValue> {
    let props = interp.to_object(props)?;
    let mut descriptors = Vec::new();
    for key in enumerable_own_keys(&props) {
        let desc_obj = interp.get(&props, &key)?;
        descriptors.push((key, interp.to_property_descriptor(&desc_obj)?));
    }
    for (key, desc) in descriptors {
        interp.define_own_property(obj, &key, desc, true)?;
    }
    Ok(())
}

fn create(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let proto = match arg(args, 0) {
        JsValue::Object(o) => Some(o),
        JsValue::Null => None,
        other => {
            let shown = interp.describe(&other);
            return Err(interp.create_type_error(&format!("Object prototype may only be an Object or null: {shown}")));
        }
    };
    let obj = interp.create_object();
    obj.borrow_mut().prototype = proto;
    let props = arg(args, 1);
    if !props.is_undefined() {
        define_properties_from(interp, &obj, &props)?;
    }
    Ok(JsValue::Object(obj))
}

fn define_property(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let obj = object_arg(interp, args, "defineProperty")?;
    let key = interp.to_property_key(&arg(args, 1))?;
    let desc = interp.to_property_descriptor(&arg(args, 2))?;
    interp.define_own_property(&obj, &key, desc, true)?;
    Ok(JsValue::Object(obj))
}

fn define_properties(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let obj = object_arg(interp, args, "defineProperties")?;
    define_properties_from(interp, &obj, &arg(args, 1))?;
    Ok(JsValue::Object(obj))
}

fn prevent_extensions(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let obj = object_arg(interp, args, "preventExtensions")?;
    obj.borrow_mut().extensible = false;
    Ok(JsValue::Object(obj))
}

fn is_extensible(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let obj = object_arg(interp, args, "isExtensible")?;
    Ok(JsValue::Boolean(obj.borrow().extensible))
}

/// Shared body of `seal` and `freeze` (§15.2.3.8, §15.2.3.9).
fn restrict(interp: &mut Interpreter, obj: &JsObject, freeze: bool) -> Result<(), JsValue> {
    for key in obj.own_keys() {
        let Some(current) = obj.get_own_property(&key) else {
            continue;
        };
        let writable = (freeze && current.is_data_descriptor()).then_some(false);
        let update = PropertyDescriptor::partial(None, writable, None, None, None, Some(false))
            .map_err(|msg| interp.create_type_error(msg))?;
        interp.define_own_property(obj, &key, update, true)?;
    }
    obj.borrow_mut().extensible = false;
    Ok(())
}

fn is_restricted(obj: &JsObject, frozen: bool) -> bool {
    if obj.borrow().extensible {
        return false;
    }
    obj.own_keys().iter().all(|key| {
        obj.get_own_property(key).is_none_or(|d| {
            !d.configurable() && !(frozen && d.is_data_descriptor() && d.writable())
        })
    })
}

fn seal(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let obj = object_arg(interp, args, "seal")?;
    restrict(interp, &obj, false)?;
    Ok(JsValue::Object(obj))
}

fn freeze(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let obj = object_arg(interp, args, "freeze")?;
    restrict(interp, &obj, true)?;
    Ok(JsValue::Object(obj))
}

fn is_sealed(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let obj = object_arg(interp, args, "isSealed")?;
    Ok(JsValue::Boolean(is_restricted(&obj, false)))
}

fn is_frozen(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let obj = object_arg(interp, args, "isFrozen")?;
    Ok(JsValue::Boolean(is_restricted(&obj, true)))
}

// §15.2.4.2
fn to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Result<JsValue, JsValue> {
    let class = match this {
        JsValue::Undefined => "Undefined",
        JsValue::Null => "Null",
        other => interp.to_object(other)?.class_name(),
    };
    Ok(JsValue::string(&format!("[object {class}]")))
}

fn to_locale_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Result<JsValue, JsValue> {
    let obj = interp.to_object(this)?;
    let func = interp.get(&obj, "toString")?;
    interp.require_callable(&func, "toLocaleString")?;
    interp.call(&func, this, &[])
}

fn value_of(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Result<JsValue, JsValue> {
    interp.to_object(this).map(JsValue::Object)
}

fn has_own_property(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let key = interp.to_property_key(&arg(args, 0))?;
    let obj = interp.to_object(this)?;
    Ok(JsValue::Boolean(obj.has_own_property(&key)))
}

fn is_prototype_of(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let JsValue::Object(value) = arg(args, 0) else {
        return Ok(JsValue::Boolean(false));
    };
    let obj = interp.to_object(this)?;
    let mut current = value.prototype();
    while let Some(p) = current {
        if p.ptr_eq(&obj) {
            return Ok(JsValue::Boolean(true));
        }
        current = p.prototype();
    }
    Ok(JsValue::Boolean(false))
}

fn property_is_enumerable(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let key = interp.to_property_key(&arg(args, 0))?;
    let obj = interp.to_object(this)?;
    Ok(JsValue::Boolean(obj.get_own_property(&key).is_some_and(|d| d.enumerable())))
}

impl Interpreter {
    pub(super) fn setup_object_prototype(&mut self) {
        let proto = self.realm.object_prototype.clone();
        let ctor = self.install_constructor("Object", 1, object_call, object_construct, &proto);
        const STATICS: &[(&str, usize, Builtin)] = &[
            ("getPrototypeOf", 1, get_prototype_of),
            ("getOwnPropertyDescriptor", 2, get_own_property_descriptor),
            ("getOwnPropertyNames", 1, get_own_property_names),
            ("keys", 1, keys),
            ("create", 2, create),
            ("defineProperty", 3, define_property),
            ("defineProperties", 2, define_properties),
            ("preventExtensions", 1, prevent_extensions),
            ("isExtensible", 1, is_extensible),
            ("seal", 1, seal),
            ("isSealed", 1, is_sealed),
            ("freeze", 1, freeze),
            ("isFrozen", 1, is_frozen),
        ];
        self.install_methods(&ctor, STATICS);
        self.install_methods(
            &proto,
            &[
                ("toString", 0, to_string),
                ("toLocaleString", 0, to_locale_string),
                ("valueOf", 0, value_of),
                ("hasOwnProperty", 1, has_own_property),
                ("isPrototypeOf", 1, is_prototype_of),
                ("propertyIsEnumerable", 1, property_is_enumerable),
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
    fn constructor_wraps_primitives() {
        assert_eq!(run("typeof Object(1)"), JsValue::string("object"));
        assert_eq!(run("var o = {}; Object(o) === o && new Object(o) === o"), JsValue::Boolean(true));
        assert_eq!(run("Object(null) instanceof Object"), JsValue::Boolean(true));
        assert_eq!(run("Object.prototype.constructor === Object"), JsValue::Boolean(true));
    }

    #[test]
    fn class_tags() {
        assert_eq!(
            run("var ts = Object.prototype.toString; [ts.call(null), ts.call(undefined), ts.call([]), ts.call(1), ts.call(function(){})].join()"),
            JsValue::string("[object Null],[object Undefined],[object Array],[object Number],[object Function]")
        );
        assert_eq!(run("(function () { return Object.prototype.toString.call(arguments); })()"), JsValue::string("[object Arguments]"));
    }

    #[test]
    fn define_property_and_descriptors() {
        let src = "
            var o = {};
            Object.defineProperty(o, 'x', { value: 1 });
            var d = Object.getOwnPropertyDescriptor(o, 'x');
            [d.value, d.writable, d.enumerable, d.configurable].join()";
        assert_eq!(run(src), JsValue::string("1,false,false,false"));
        assert!(error_of("var o = {}; Object.defineProperty(o, 'x', { value: 1 }); Object.defineProperty(o, 'x', { value: 2 });")
            .starts_with("TypeError"));
        assert!(error_of("Object.defineProperty({}, 'x', { get: function () {}, value: 1 })").starts_with("TypeError"));
    }

    #[test]
    fn accessors_through_define_property() {
        let src = "
            var o = { _v: 1 };
            Object.defineProperty(o, 'v', { get: function () { return this._v * 10; }, set: function (x) { this._v = x; } });
            o.v = 4;
            o.v";
        assert_eq!(run(src), JsValue::Number(40.0));
    }

    #[test]
    fn keys_and_names() {
        assert_eq!(
            run("var o = { b: 1, a: 2, 1: 0, 0: 0 }; Object.defineProperty(o, 'h', { value: 0 }); Object.keys(o).join()"),
            JsValue::string("0,1,b,a")
        );
        assert_eq!(
            run("Object.getOwnPropertyNames(Object.create(null, { h: { value: 0 } })).join()"),
            JsValue::string("h")
        );
        assert_eq!(run("Object.keys(new String('ab')).join()"), JsValue::string("0,1"));
    }

    #[test]
    fn create_sets_prototype() {
        assert_eq!(run("var p = { x: 1 }; var o = Object.create(p); Object.getPrototypeOf(o) === p && o.x === 1"), JsValue::Boolean(true));
        assert_eq!(run("Object.getPrototypeOf(Object.create(null))"), JsValue::Null);
        assert!(error_of("Object.create(1)").starts_with("TypeError"));
    }

    #[test]
    fn freeze_and_seal() {
        assert_eq!(
            run("var o = Object.freeze({ a: 1 }); o.a = 2; o.b = 3; [o.a, o.b, Object.isFrozen(o), Object.isSealed(o)].join()"),
            JsValue::string("1,,true,true")
        );
        assert_eq!(
            run("var o = Object.seal({ a: 1 }); o.a = 2; delete o.a; [o.a, Object.isSealed(o), Object.isFrozen(o)].join()"),
            JsValue::string("2,true,false")
        );
        assert_eq!(
            run("var o = {}; Object.preventExtensions(o); o.x = 1; [Object.isExtensible(o), o.x, Object.isFrozen(o)].join()"),
            JsValue::string("false,,true")
        );
        assert!(error_of("'use strict'; var o = Object.freeze({ a: 1 }); o.a = 2;").starts_with("TypeError"));
    }

    #[test]
    fn statics_reject_primitives() {
        assert_eq!(
            error_of("Object.keys(1)"),
            "TypeError: Object.keys called on non-object 1"
        );
        assert!(error_of("Object.getPrototypeOf('s')").starts_with("TypeError"));
    }

    #[test]
    fn prototype_queries() {
        assert_eq!(run("({ a: 1 }).hasOwnProperty('a') && !({}).hasOwnProperty('toString')"), JsValue::Boolean(true));
        assert_eq!(run("Object.prototype.isPrototypeOf([]) && !Array.prototype.isPrototypeOf({})"), JsValue::Boolean(true));
        assert_eq!(run("[1].propertyIsEnumerable(0) && ![1].propertyIsEnumerable('length')"), JsValue::Boolean(true));
        assert_eq!(run("({ toString: function () { return 'L'; } }).toLocaleString()"), JsValue::string("L"));
    }

    #[test]
    fn nul_prefixed_names_stay_apart_from_symbols() {
        assert_eq!(
            run("var s = Symbol('a'); var o = {}; o[s] = 1; \
                 for (var i = 0; i < 16; i++) o['\\u0000Symbol(a)#' + i] = 2; \
                 o[s] + ',' + Object.getOwnPropertyNames(o).length"),
            JsValue::string("1,16")
        );
        assert_eq!(
            run("var s = Symbol('a'); var o = {}; o[s] = 1; o['\\u0000Symbol(a)#1']"),
            JsValue::Undefined
        );
    }

    #[test]
    fn nul_prefixed_names_round_trip() {
        assert_eq!(
            run("var o = {}; o['\\u0000x'] = 1; Object.keys(o).length + ',' + ('\\u0000x' in o)"),
            JsValue::string("1,true")
        );
        assert_eq!(run("var o = {}; o['\\u0000x'] = 1; Object.keys(o)[0] === '\\u0000x'"), JsValue::Boolean(true));
        assert_eq!(
            run("var o = {}; o['\\u0000x'] = 1; Object.getOwnPropertyNames(o)[0] === '\\u0000x'"),
            JsValue::Boolean(true)
        );
        assert_eq!(
            run("var o = {'\\u0000y': 2}; var seen; for (var k in o) seen = k; seen === '\\u0000y' && o[seen] === 2"),
            JsValue::Boolean(true)
        );
    }
}
