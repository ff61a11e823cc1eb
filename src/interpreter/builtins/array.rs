use super::arg;
use crate::interpreter::Interpreter;
use crate::interpreter::helpers::{relative_index, strict_equality};
use crate::interpreter::object::ObjectKind;
use crate::interpreter::property::PropertyDescriptor;
use crate::types::{JsObject, JsValue};

fn is_array(value: &JsValue) -> bool {
    matches!(value, JsValue::Object(o) if matches!(o.borrow().kind, ObjectKind::Array))
}

fn array_call(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    array_construct(interp, args)
}

// §15.4.2
fn array_construct(interp: &mut Interpreter, args: &[JsValue]) -> Result<JsValue, JsValue> {
    if let [JsValue::Number(n)] = args {
        let len = interp.to_uint32(&JsValue::Number(*n))?;
        if f64::from(len) != *n {
            return Err(interp.create_range_error("Invalid array length"));
        }
        return interp.array_with_length(len).map(JsValue::Object);
    }
    Ok(interp.create_array(args.to_vec()))
}

fn array_is_array(_interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    Ok(JsValue::Boolean(is_array(&arg(args, 0))))
}

/// Defines `obj[index]` as a fresh data property (the result arrays of
/// `map`, `slice` and `concat`).
fn create_data_property(interp: &mut Interpreter, obj: &JsObject, index: u32, value: JsValue) -> Result<(), JsValue> {
    interp.define_own_property(obj, &index.to_string(), PropertyDescriptor::data_default(value), true)?;
    Ok(())
}

fn set_length(interp: &mut Interpreter, obj: &JsObject, len: u32) -> Result<(), JsValue> {
    interp.put(obj, "length", JsValue::Number(f64::from(len)), true)
}

fn push(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let obj = interp.to_object(this)?;
    let mut n = f64::from(interp.length_of(&obj)?);
    for value in args {
        interp.put(&obj, &n.to_string(), value.clone(), true)?;
        n += 1.0;
    }
    interp.put(&obj, "length", JsValue::Number(n), true)?;
    Ok(JsValue::Number(n))
}

fn pop(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Result<JsValue, JsValue> {
    let obj = interp.to_object(this)?;
    let len = interp.length_of(&obj)?;
    if len == 0 {
        set_length(interp, &obj, 0)?;
        return Ok(JsValue::Undefined);
    }
    let key = (len - 1).to_string();
    let element = interp.get(&obj, &key)?;
    interp.delete_property(&obj, &key, true)?;
    set_length(interp, &obj, len - 1)?;
    Ok(element)
}

fn join_elements(interp: &mut Interpreter, obj: &JsObject, sep: &str) -> Result<String, JsValue> {
    let len = interp.length_of(obj)?;
    let mut out = String::new();
    for k in 0..len {
        if k > 0 {
            out.push_str(sep);
        }
        match interp.get(obj, &k.to_string())? {
            JsValue::Undefined | JsValue::Null => {}
            v => out.push_str(&interp.to_string(&v)?),
        }
    }
    Ok(out)
}

// §15.4.4.5
fn join(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let obj = interp.to_object(this)?;
    if interp.join_stack.iter().any(|o| o.ptr_eq(&obj)) {
        return Ok(JsValue::string(""));
    }
    let sep = match arg(args, 0) {
        JsValue::Undefined => ",".to_string(),
        s => interp.to_string(&s)?,
    };
    interp.join_stack.push(obj.clone());
    let joined = join_elements(interp, &obj, &sep);
    interp.join_stack.pop();
    Ok(JsValue::string(&joined?))
}

fn to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Result<JsValue, JsValue> {
    let obj = interp.to_object(this)?;
    let func = interp.get(&obj, "join")?;
    if func.is_callable() {
        return interp.call(&func, &JsValue::Object(obj), &[]);
    }
    Ok(JsValue::string(&format!("[object {}]", obj.class_name())))
}

fn index_of(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let obj = interp.to_object(this)?;
    let len = f64::from(interp.length_of(&obj)?);
    let from = match args.get(1) {
        Some(v) => interp.to_integer(v)?,
        None => 0.0,
    };
    let target = arg(args, 0);
    let mut k = relative_index(from, len);
    while k < len {
        let key = k.to_string();
        if obj.has_property(&key) && strict_equality(&interp.get(&obj, &key)?, &target) {
            return Ok(JsValue::Number(k));
        }
        k += 1.0;
    }
    Ok(JsValue::Number(-1.0))
}

/// What an iteration method does with each callback result.
#[derive(Clone, Copy)]
enum Iteration {
    ForEach,
    Map,
    Filter,
    Some,
    Every,
}

impl Iteration {
    fn method(self) -> &'static str {
        match self {
            Iteration::ForEach => "Array.prototype.forEach",
            Iteration::Map => "Array.prototype.map",
            Iteration::Filter => "Array.prototype.filter",
            Iteration::Some => "Array.prototype.some",
            Iteration::Every => "Array.prototype.every",
        }
    }
}

// §15.4.4.16 - §15.4.4.20
fn iterate(interp: &mut Interpreter, this: &JsValue, args: &[JsValue], kind: Iteration) -> Result<JsValue, JsValue> {
    let obj = interp.to_object(this)?;
    let len = interp.length_of(&obj)?;
    let callback = arg(args, 0);
    interp.require_callable(&callback, kind.method())?;
    let this_arg = arg(args, 1);
    let mapped = match kind {
        Iteration::Map => Some(interp.array_with_length(len)?),
        _ => None,
    };
    let mut kept = Vec::new();
    let receiver = JsValue::Object(obj.clone());
    for k in 0..len {
        let key = k.to_string();
        if !obj.has_property(&key) {
            continue;
        }
        let value = interp.get(&obj, &key)?;
        let result = interp.call(
            &callback,
            &this_arg,
            &[value.clone(), JsValue::Number(f64::from(k)), receiver.clone()],
        )?;
        match kind {
            Iteration::ForEach => {}
            Iteration::Map => {
                if let Some(out) = &mapped {
                    create_data_property(interp, out, k, result)?;
                }
            }
            Iteration::Filter => {
                if interp.to_boolean(&result) {
                    kept.push(value);
                }
            }
            Iteration::Some => {
                if interp.to_boolean(&result) {
                    return Ok(JsValue::Boolean(true));
                }
            }
            Iteration::Every => {
                if !interp.to_boolean(&result) {
                    return Ok(JsValue::Boolean(false));
                }
            }
        }
    }
    Ok(match kind {
        Iteration::ForEach => JsValue::Undefined,
        Iteration::Map => mapped.map_or(JsValue::Undefined, JsValue::Object),
        Iteration::Filter => interp.create_array(kept),
        Iteration::Some => JsValue::Boolean(false),
        Iteration::Every => JsValue::Boolean(true),
    })
}

fn for_each(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    iterate(interp, this, args, Iteration::ForEach)
}

fn map(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    iterate(interp, this, args, Iteration::Map)
}

fn filter(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    iterate(interp, this, args, Iteration::Filter)
}

fn some(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    iterate(interp, this, args, Iteration::Some)
}

fn every(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    iterate(interp, this, args, Iteration::Every)
}

// §15.4.4.21, §15.4.4.22
fn fold(interp: &mut Interpreter, this: &JsValue, args: &[JsValue], from_right: bool) -> Result<JsValue, JsValue> {
    let obj = interp.to_object(this)?;
    let len = interp.length_of(&obj)?;
    let callback = arg(args, 0);
    let method = if from_right { "Array.prototype.reduceRight" } else { "Array.prototype.reduce" };
    interp.require_callable(&callback, method)?;
    let indices: Box<dyn Iterator<Item = u32>> = if from_right {
        Box::new((0..len).rev())
    } else {
        Box::new(0..len)
    };
    let mut accumulator = args.get(1).cloned();
    let receiver = JsValue::Object(obj.clone());
    for k in indices {
        let key = k.to_string();
        if !obj.has_property(&key) {
            continue;
        }
        let value = interp.get(&obj, &key)?;
        accumulator = Some(match accumulator {
            None => value,
            Some(acc) => interp.call(
                &callback,
                &JsValue::Undefined,
                &[acc, value, JsValue::Number(f64::from(k)), receiver.clone()],
            )?,
        });
    }
    match accumulator {
        Some(v) => Ok(v),
        None => Err(interp.create_type_error("Reduce of empty array with no initial value")),
    }
}

fn reduce(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    fold(interp, this, args, false)
}

fn reduce_right(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    fold(interp, this, args, true)
}

fn slice(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let obj = interp.to_object(this)?;
    let len = f64::from(interp.length_of(&obj)?);
    let start = relative_index(interp.to_integer(&arg(args, 0))?, len);
    let end = match arg(args, 1) {
        JsValue::Undefined => len,
        e => relative_index(interp.to_integer(&e)?, len),
    };
    let out = interp.array_with_length(0)?;
    let mut n = 0u32;
    let mut k = start;
    while k < end {
        let key = k.to_string();
        if obj.has_property(&key) {
            let value = interp.get(&obj, &key)?;
            create_data_property(interp, &out, n, value)?;
        }
        n += 1;
        k += 1.0;
    }
    set_length(interp, &out, n)?;
    Ok(JsValue::Object(out))
}

// §15.4.4.4
fn concat(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let obj = interp.to_object(this)?;
    let out = interp.array_with_length(0)?;
    let mut n = 0u32;
    let items = std::iter::once(JsValue::Object(obj)).chain(args.iter().cloned());
    for item in items {
        match &item {
            JsValue::Object(source) if is_array(&item) => {
                let len = interp.length_of(source)?;
                for k in 0..len {
                    let key = k.to_string();
                    if source.has_property(&key) {
                        let value = interp.get(source, &key)?;
                        create_data_property(interp, &out, n, value)?;
                    }
                    n += 1;
                }
            }
            _ => {
                create_data_property(interp, &out, n, item.clone())?;
                n += 1;
            }
        }
    }
    set_length(interp, &out, n)?;
    Ok(JsValue::Object(out))
}

impl Interpreter {
    pub(super) fn setup_array_prototype(&mut self) {
        let proto = self.realm.array_prototype.clone();
        let ctor = self.install_constructor("Array", 1, array_call, array_construct, &proto);
        self.install_methods(&ctor, &[("isArray", 1, array_is_array)]);
        self.install_methods(
            &proto,
            &[
                ("push", 1, push),
                ("pop", 0, pop),
                ("join", 1, join),
                ("toString", 0, to_string),
                ("indexOf", 1, index_of),
                ("forEach", 1, for_each),
                ("map", 1, map),
                ("filter", 1, filter),
                ("some", 1, some),
                ("every", 1, every),
                ("reduce", 1, reduce),
                ("reduceRight", 1, reduce_right),
                ("slice", 2, slice),
                ("concat", 1, concat),
            ],
        );
    }
}
