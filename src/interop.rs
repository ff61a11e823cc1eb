//! Conversion of host values into script values.

use crate::interpreter::Interpreter;
use crate::interpreter::object::{JsObjectData, ObjectKind};
use crate::interpreter::types::{Completion, JsFunction};
use crate::types::{JsObject, JsString, JsValue};
use rustc_hash::FxHashMap;
use std::any::{Any, TypeId};
use std::rc::Rc;

/// One link of the foreign-value conversion chain. Returning `None` passes
/// the value on to the next converter.
pub trait ObjectConverter {
    fn try_convert(&self, interp: &mut Interpreter, value: &dyn Any) -> Option<JsValue>;
}

pub type TypeMapper = Rc<dyn Fn(&mut Interpreter, &dyn Any) -> Option<JsValue>>;

fn mapper<T: 'static>(f: impl Fn(&mut Interpreter, &T) -> JsValue + 'static) -> (TypeId, TypeMapper) {
    let mapper: TypeMapper = Rc::new(move |interp, value| value.downcast_ref::<T>().map(|v| f(interp, v)));
    (TypeId::of::<T>(), mapper)
}

/// Mappers every engine starts with.
pub(crate) fn default_type_mappers() -> FxHashMap<TypeId, TypeMapper> {
    [
        mapper::<bool>(|_, v| JsValue::Boolean(*v)),
        mapper::<f64>(|_, v| JsValue::Number(*v)),
        mapper::<f32>(|_, v| JsValue::Number(f64::from(*v))),
        mapper::<i32>(|_, v| JsValue::Number(f64::from(*v))),
        mapper::<u32>(|_, v| JsValue::Number(f64::from(*v))),
        mapper::<i64>(|_, v| JsValue::Number(*v as f64)),
        mapper::<usize>(|_, v| JsValue::Number(*v as f64)),
        mapper::<String>(|_, v| JsValue::String(JsString::from_str(v))),
        mapper::<&'static str>(|_, v| JsValue::string(v)),
        mapper::<Vec<JsValue>>(|interp, v| interp.create_array(v.clone())),
        mapper::<()>(|_, _| JsValue::Undefined),
    ]
    .into_iter()
    .collect()
}

impl Interpreter {
    /// Maps a host value into the engine: `JsValue`s pass through, then the
    /// configured converters are tried in order, then the type mapper cache,
    /// and anything left is wrapped in an opaque object.
    pub fn from_foreign_value(&mut self, value: Rc<dyn Any>) -> JsValue {
        if let Some(v) = value.downcast_ref::<JsValue>() {
            return v.clone();
        }
        let converters = self.options.object_converters.clone();
        for converter in converters {
            if let Some(v) = converter.try_convert(self, &*value) {
                return v;
            }
        }
        let type_id = Any::type_id(&*value);
        if let Some(mapper) = self.type_mappers.get(&type_id).cloned()
            && let Some(v) = mapper(self, &*value)
        {
            return v;
        }
        let proto = Some(self.realm.object_prototype.clone());
        JsValue::Object(JsObject::new(JsObjectData::new(
            proto,
            "Object",
            ObjectKind::Foreign(value),
        )))
    }

    /// Registers how values of type `T` enter the engine. Replaces any
    /// earlier mapper for `T`.
    pub fn register_type_mapper<T: 'static>(&mut self, f: impl Fn(&mut Interpreter, &T) -> JsValue + 'static) {
        let (id, m) = mapper::<T>(f);
        self.type_mappers.insert(id, m);
    }

    /// The host value wrapped by a foreign object.
    pub fn foreign_value<T: 'static>(&self, value: &JsValue) -> Option<Rc<T>> {
        let JsValue::Object(obj) = value else {
            return None;
        };
        let inner = match &obj.borrow().kind {
            ObjectKind::Foreign(inner) => inner.clone(),
            _ => return None,
        };
        inner.downcast::<T>().ok()
    }

    /// Installs a host function on the global object.
    pub fn set_native_function<F>(&mut self, name: &str, arity: usize, f: F)
    where
        F: Fn(&mut Interpreter, &JsValue, &[JsValue]) -> Result<JsValue, JsValue> + 'static,
    {
        let func = self.create_function(JsFunction::native(name, arity, move |interp, this, args| {
            Completion::from(f(interp, this, args))
        }));
        self.realm
            .global_object
            .borrow_mut()
            .insert_builtin(name.to_string(), func);
    }

    /// Sets a global property as an ordinary assignment would.
    pub fn set_value(&mut self, name: &str, value: JsValue) {
        self.realm
            .global_object
            .borrow_mut()
            .insert_value(name.to_string(), value);
    }

    pub fn get_value(&mut self, name: &str) -> Result<JsValue, JsValue> {
        let global = self.realm.global_object.clone();
        self.get(&global, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Point {
        x: f64,
    }

    struct PointConverter;

    impl ObjectConverter for PointConverter {
        fn try_convert(&self, _interp: &mut Interpreter, value: &dyn Any) -> Option<JsValue> {
            value.downcast_ref::<Point>().map(|p| JsValue::Number(p.x))
        }
    }

    #[test]
    fn primitives_use_default_mappers() {
        let mut interp = Interpreter::new();
        assert_eq!(interp.from_foreign_value(Rc::new(true)), JsValue::Boolean(true));
        assert_eq!(interp.from_foreign_value(Rc::new(3i32)), JsValue::Number(3.0));
        assert_eq!(interp.from_foreign_value(Rc::new(String::from("s"))), JsValue::string("s"));
        assert_eq!(interp.from_foreign_value(Rc::new(())), JsValue::Undefined);
        let v = JsValue::Null;
        assert_eq!(interp.from_foreign_value(Rc::new(v)), JsValue::Null);
    }

    #[test]
    fn vectors_become_arrays() {
        let mut interp = Interpreter::new();
        let arr = interp.from_foreign_value(Rc::new(vec![JsValue::Number(1.0), JsValue::Number(2.0)]));
        let JsValue::Object(o) = &arr else {
            panic!("expected array");
        };
        assert_eq!(o.class_name(), "Array");
        assert_eq!(interp.get(o, "length").unwrap(), JsValue::Number(2.0));
    }

    #[test]
    fn converters_run_before_mappers_and_wrapping() {
        let mut interp = Interpreter::with_options(
            crate::options::Options::new().add_object_converter(Rc::new(PointConverter)),
        );
        assert_eq!(interp.from_foreign_value(Rc::new(Point { x: 4.0 })), JsValue::Number(4.0));
    }

    #[test]
    fn unknown_values_are_wrapped() {
        let mut interp = Interpreter::new();
        let wrapped = interp.from_foreign_value(Rc::new(Point { x: 1.5 }));
        assert!(wrapped.is_object());
        let back = interp.foreign_value::<Point>(&wrapped);
        assert!(back.is_some_and(|p| p.x == 1.5));
    }

    #[test]
    fn registered_mapper_is_per_engine() {
        let mut a = Interpreter::new();
        a.register_type_mapper::<Point>(|_, p| JsValue::Number(p.x * 2.0));
        assert_eq!(a.from_foreign_value(Rc::new(Point { x: 2.0 })), JsValue::Number(4.0));
        let mut b = Interpreter::new();
        assert!(b.from_foreign_value(Rc::new(Point { x: 2.0 })).is_object());
    }

    #[test]
    fn native_function_is_callable_from_script() {
        let mut interp = Interpreter::new();
        interp.set_native_function("twice", 1, |interp, _this, args| {
            let n = interp.to_number(&args.first().cloned().unwrap_or_default())?;
            Ok(JsValue::Number(n * 2.0))
        });
        assert_eq!(interp.execute("twice(21)").unwrap(), JsValue::Number(42.0));
        interp.set_value("answer", JsValue::Number(42.0));
        assert_eq!(interp.get_value("answer").unwrap(), JsValue::Number(42.0));
    }
}
