use super::Interpreter;
use super::environment::EnvRef;
use super::property::{PropertyDescriptor, PropertyFlag};
use super::types::{FunctionData, FunctionSlots, JsFunction};
use crate::ast::FunctionNode;
use crate::types::{JsObject, JsString, JsValue, is_symbol_key, number_ops};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::any::Any;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

pub type PropertyMap = IndexMap<String, PropertyDescriptor, FxBuildHasher>;

pub struct JsObjectData {
    pub(crate) properties: PropertyMap,
    /// `[[Prototype]]`. Held strongly: a chain is only traversed, never
    /// torn down by the engine, and cycles are the host allocator's concern.
    pub prototype: Option<JsObject>,
    pub extensible: bool,
    pub class_name: &'static str,
    pub kind: ObjectKind,
}

pub enum ObjectKind {
    Ordinary,
    Array,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Error,
    Function(Box<FunctionData>),
    Arguments(Box<ArgumentsData>),
    Foreign(Rc<dyn Any>),
}

impl fmt::Debug for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Ordinary => write!(f, "Ordinary"),
            ObjectKind::Array => write!(f, "Array"),
            ObjectKind::Boolean(b) => write!(f, "Boolean({b})"),
            ObjectKind::Number(n) => write!(f, "Number({n})"),
            ObjectKind::String(s) => write!(f, "String({s:?})"),
            ObjectKind::Error => write!(f, "Error"),
            ObjectKind::Function(data) => write!(f, "Function({:?})", data.func),
            ObjectKind::Arguments(_) => write!(f, "Arguments"),
            ObjectKind::Foreign(_) => write!(f, "Foreign"),
        }
    }
}

/// State of a (possibly pooled) arguments object. Own properties are only
/// materialised on first access.
#[derive(Default)]
pub struct ArgumentsData {
    pub(crate) callee: Option<JsObject>,
    pub(crate) node: Option<Rc<FunctionNode>>,
    pub(crate) args: Vec<JsValue>,
    pub(crate) env: Option<EnvRef>,
    pub(crate) strict: bool,
    pub(crate) initialized: bool,
    pub(crate) thrower: Option<JsObject>,
    /// Index to parameter name for indices still aliasing a formal parameter.
    pub(crate) mapped: Vec<Option<String>>,
}

/// Canonical array index form of a key (ES5 §15.4).
pub(crate) fn array_index(key: &str) -> Option<u32> {
    let bytes = key.as_bytes();
    if bytes.is_empty() || bytes.len() > 10 || (bytes.len() > 1 && bytes[0] == b'0') {
        return None;
    }
    if !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let n: u64 = key.parse().ok()?;
    if n < u32::MAX as u64 { Some(n as u32) } else { None }
}

impl JsObjectData {
    pub fn new(prototype: Option<JsObject>, class_name: &'static str, kind: ObjectKind) -> Self {
        JsObjectData {
            properties: PropertyMap::default(),
            prototype,
            extensible: true,
            class_name,
            kind,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.kind, ObjectKind::Function(_))
    }

    pub fn function(&self) -> Option<&FunctionData> {
        match &self.kind {
            ObjectKind::Function(data) => Some(data),
            _ => None,
        }
    }

    /// Adds a writable, configurable, non-enumerable data property, as used
    /// for built-in methods.
    pub fn insert_builtin(&mut self, key: String, value: JsValue) {
        self.store(key, PropertyDescriptor::new(value, PropertyFlag::NON_ENUMERABLE));
    }

    /// Adds an ordinary data property (writable, enumerable, configurable).
    pub fn insert_value(&mut self, key: String, value: JsValue) {
        self.store(key, PropertyDescriptor::data_default(value));
    }

    pub fn insert_property(&mut self, key: String, desc: PropertyDescriptor) {
        self.store(key, desc);
    }

    fn store(&mut self, key: String, desc: PropertyDescriptor) {
        if let ObjectKind::Function(data) = &mut self.kind
            && let Some(slot) = data.slots.slot_mut(&key)
        {
            *slot = Some(desc);
            return;
        }
        self.properties.insert(key, desc);
    }

    /// Materialises the own properties of a lazily created arguments object.
    pub(crate) fn ensure_initialized(&mut self) {
        let JsObjectData {
            properties, kind, ..
        } = self;
        let ObjectKind::Arguments(data) = kind else {
            return;
        };
        if data.initialized {
            return;
        }
        data.initialized = true;
        let len = data.args.len();
        for (i, v) in data.args.iter().enumerate() {
            properties.insert(i.to_string(), PropertyDescriptor::data_default(v.clone()));
        }
        properties.insert(
            "length".to_string(),
            PropertyDescriptor::new(JsValue::Number(len as f64), PropertyFlag::NON_ENUMERABLE),
        );
        if data.strict {
            let thrower = data.thrower.clone().map(JsValue::Object);
            for key in ["caller", "callee"] {
                properties.insert(
                    key.to_string(),
                    PropertyDescriptor::accessor(thrower.clone(), thrower.clone(), false, false),
                );
            }
            return;
        }
        if let Some(callee) = &data.callee {
            properties.insert(
                "callee".to_string(),
                PropertyDescriptor::new(JsValue::Object(callee.clone()), PropertyFlag::NON_ENUMERABLE),
            );
        }
        if data.env.is_some()
            && let Some(node) = &data.node
        {
            let names = &node.params;
            let count = names.len().min(len);
            data.mapped = vec![None; count];
            // later duplicates win, so walk from the last parameter
            let mut seen: Vec<&str> = Vec::new();
            for i in (0..count).rev() {
                let name = names[i].as_str();
                if !seen.contains(&name) {
                    seen.push(name);
                    data.mapped[i] = Some(name.to_string());
                }
            }
        }
    }

    fn mapped_name(&self, key: &str) -> Option<(usize, &str, &EnvRef)> {
        let ObjectKind::Arguments(data) = &self.kind else {
            return None;
        };
        let env = data.env.as_ref()?;
        let index = array_index(key)? as usize;
        let name = data.mapped.get(index)?.as_deref()?;
        Some((index, name, env))
    }

    fn unmap(&mut self, index: usize) {
        if let ObjectKind::Arguments(data) = &mut self.kind
            && let Some(slot) = data.mapped.get_mut(index)
        {
            *slot = None;
        }
    }

    /// `[[GetOwnProperty]]` without the prototype walk.
    pub(crate) fn own_property(&self, key: &str) -> Option<PropertyDescriptor> {
        match &self.kind {
            ObjectKind::Function(data) => {
                if let Some(slot) = data.slots.slot(key) {
                    return slot.clone();
                }
            }
            ObjectKind::String(s) => {
                if key == "length" {
                    return Some(PropertyDescriptor::new(
                        JsValue::Number(s.len() as f64),
                        PropertyFlag::ALL_FORBIDDEN,
                    ));
                }
                if let Some(i) = array_index(key)
                    && let Some(unit) = s.code_units.get(i as usize)
                {
                    let ch = JsString {
                        code_units: vec![*unit],
                    };
                    return Some(PropertyDescriptor::new(
                        JsValue::String(ch),
                        PropertyFlag::ONLY_ENUMERABLE,
                    ));
                }
            }
            _ => {}
        }
        let mut desc = self.properties.get(key)?.clone();
        if let Some((_, name, env)) = self.mapped_name(key)
            && let Some(v) = env.read_declarative(name)
        {
            desc.set_value(v);
        }
        Some(desc)
    }

    /// Own keys in enumeration order: function slots first, then array
    /// indices ascending, then the rest in insertion order.
    pub(crate) fn own_keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.properties.len() + 3);
        match &self.kind {
            ObjectKind::Function(data) => {
                for key in FunctionSlots::KEYS {
                    if data.slots.slot(key).is_some_and(Option::is_some) {
                        keys.push(key.to_string());
                    }
                }
            }
            ObjectKind::String(s) => {
                keys.extend((0..s.len()).map(|i| i.to_string()));
                keys.push("length".to_string());
            }
            _ => {}
        }
        let mut indices: Vec<(u32, &String)> = self
            .properties
            .keys()
            .filter_map(|k| array_index(k).map(|i| (i, k)))
            .collect();
        indices.sort_unstable_by_key(|(i, _)| *i);
        keys.extend(indices.into_iter().map(|(_, k)| k.clone()));
        keys.extend(
            self.properties
                .keys()
                .filter(|k| array_index(k).is_none() && !is_symbol_key(k))
                .cloned(),
        );
        keys.extend(self.properties.keys().filter(|k| is_symbol_key(k)).cloned());
        keys
    }

    /// `[[DefineOwnProperty]]` (ES5 §8.12.9) for every object kind. Array
    /// `length` values must already be converted to a valid uint32 Number.
    pub(crate) fn define_own_property(&mut self, key: &str, desc: PropertyDescriptor) -> bool {
        self.ensure_initialized();
        match self.kind {
            ObjectKind::Array => self.define_array_property(key, desc),
            ObjectKind::Arguments(_) => self.define_arguments_property(key, desc),
            _ => self.define_ordinary(key, desc),
        }
    }

    fn define_ordinary(&mut self, key: &str, desc: PropertyDescriptor) -> bool {
        let Some(mut current) = self.own_property(key) else {
            if !self.extensible {
                trace!(key, "define rejected: object is not extensible");
                return false;
            }
            self.store(key.to_string(), desc.complete());
            return true;
        };
        if desc.is_empty() || same_fields(&current, &desc) {
            return true;
        }
        if !current.configurable() {
            if desc.configurable_set() && desc.configurable() {
                trace!(key, "define rejected: cannot make configurable");
                return false;
            }
            if desc.enumerable_set() && desc.enumerable() != current.enumerable() {
                trace!(key, "define rejected: cannot change enumerability");
                return false;
            }
        }
        if desc.is_generic_descriptor() {
            // attribute-only change
        } else if current.is_data_descriptor() != desc.is_data_descriptor() {
            if !current.configurable() {
                trace!(key, "define rejected: cannot change descriptor kind");
                return false;
            }
            current = if current.is_data_descriptor() {
                current.into_accessor()
            } else {
                current.into_data()
            };
        } else if current.is_data_descriptor() {
            if !current.configurable() && !current.writable() {
                if desc.writable_set() && desc.writable() {
                    trace!(key, "define rejected: cannot make writable");
                    return false;
                }
                if let Some(v) = desc.value()
                    && !same_value(v, &current.value_or_undefined())
                {
                    trace!(key, "define rejected: read-only value");
                    return false;
                }
            }
        } else if !current.configurable() {
            let differs = |a: Option<&JsValue>, b: Option<&JsValue>| match (a, b) {
                (Some(a), Some(b)) => !same_value(a, b),
                _ => false,
            };
            if differs(desc.set(), current.set()) || differs(desc.get(), current.get()) {
                trace!(key, "define rejected: cannot redefine accessor");
                return false;
            }
        }
        current.merge(&desc);
        if self.is_string_virtual_key(key) {
            return true;
        }
        self.store(key.to_string(), current);
        true
    }

    fn is_string_virtual_key(&self, key: &str) -> bool {
        match &self.kind {
            ObjectKind::String(s) => {
                key == "length" || array_index(key).is_some_and(|i| (i as usize) < s.len())
            }
            _ => false,
        }
    }

    fn array_length(&self) -> (u32, bool) {
        match self.properties.get("length") {
            Some(d) => (
                d.value().and_then(JsValue::as_number).map_or(0, number_ops::to_uint32),
                d.writable(),
            ),
            None => (0, true),
        }
    }

    // ES5 §15.4.5.1
    fn define_array_property(&mut self, key: &str, desc: PropertyDescriptor) -> bool {
        let (old_len, len_writable) = self.array_length();
        if key == "length" {
            let Some(new_len) = desc.value().and_then(JsValue::as_number) else {
                return self.define_ordinary(key, desc);
            };
            let new_len = number_ops::to_uint32(new_len);
            if new_len >= old_len {
                return self.define_ordinary(key, desc);
            }
            if !len_writable {
                trace!(key, "define rejected: length is read-only");
                return false;
            }
            let new_writable = !desc.writable_set() || desc.writable();
            let mut interim = desc.clone();
            if !new_writable {
                interim = PropertyDescriptor::partial(
                    desc.value().cloned(),
                    Some(true),
                    None,
                    None,
                    desc.enumerable_set().then(|| desc.enumerable()),
                    desc.configurable_set().then(|| desc.configurable()),
                )
                .unwrap_or(interim);
            }
            if !self.define_ordinary(key, interim) {
                return false;
            }
            let mut current = old_len;
            while current > new_len {
                current -= 1;
                if !self.delete(&current.to_string()) {
                    self.set_array_length(current + 1, new_writable);
                    trace!(index = current, "array truncation stopped at non-configurable element");
                    return false;
                }
            }
            if !new_writable {
                self.set_array_length(new_len, false);
            }
            return true;
        }
        if let Some(index) = array_index(key) {
            if index >= old_len && !len_writable {
                trace!(key, "define rejected: index beyond read-only length");
                return false;
            }
            if !self.define_ordinary(key, desc) {
                return false;
            }
            if index >= old_len {
                self.set_array_length(index + 1, len_writable);
            }
            return true;
        }
        self.define_ordinary(key, desc)
    }

    fn set_array_length(&mut self, len: u32, writable: bool) {
        self.properties.insert(
            "length".to_string(),
            PropertyDescriptor::data(JsValue::Number(len as f64), writable, false, false),
        );
    }

    // ES5 §10.6 [[DefineOwnProperty]] of arguments objects
    fn define_arguments_property(&mut self, key: &str, desc: PropertyDescriptor) -> bool {
        let mapping = self
            .mapped_name(key)
            .map(|(i, name, env)| (i, name.to_string(), env.clone()));
        if !self.define_ordinary(key, desc.clone()) {
            return false;
        }
        if let Some((index, name, env)) = mapping {
            if desc.is_accessor_descriptor() {
                self.unmap(index);
            } else {
                if let Some(v) = desc.value() {
                    env.write_declarative(&name, v.clone());
                }
                if desc.writable_set() && !desc.writable() {
                    self.unmap(index);
                }
            }
        }
        true
    }

    /// `[[Delete]]` without the throw flag: false when the property exists
    /// and is not configurable.
    pub(crate) fn delete(&mut self, key: &str) -> bool {
        self.ensure_initialized();
        let Some(desc) = self.own_property(key) else {
            return true;
        };
        if !desc.configurable() {
            return false;
        }
        if let ObjectKind::Function(data) = &mut self.kind
            && let Some(slot) = data.slots.slot_mut(key)
        {
            *slot = None;
            return true;
        }
        if let Some((index, _, _)) = self.mapped_name(key) {
            self.unmap(index);
        }
        self.properties.shift_remove(key);
        true
    }
}

fn same_value(a: &JsValue, b: &JsValue) -> bool {
    a == b
}

fn same_fields(current: &PropertyDescriptor, desc: &PropertyDescriptor) -> bool {
    let same = |d: Option<&JsValue>, c: Option<&JsValue>| match d {
        None => true,
        Some(v) => c.is_some_and(|c| same_value(v, c)),
    };
    same(desc.value(), current.value())
        && same(desc.get(), current.get())
        && same(desc.set(), current.set())
        && (!desc.writable_set() || (current.writable_set() && desc.writable() == current.writable()))
        && (!desc.enumerable_set() || desc.enumerable() == current.enumerable())
        && (!desc.configurable_set() || desc.configurable() == current.configurable())
}

impl JsObject {
    pub fn get_own_property(&self, key: &str) -> Option<PropertyDescriptor> {
        let mut data = self.borrow_mut();
        data.ensure_initialized();
        data.own_property(key)
    }

    /// `[[GetProperty]]`: own property or the nearest inherited one.
    pub fn get_property(&self, key: &str) -> Option<PropertyDescriptor> {
        let mut current = self.clone();
        loop {
            if let Some(desc) = current.get_own_property(key) {
                return Some(desc);
            }
            let next = current.borrow().prototype.clone()?;
            current = next;
        }
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.get_property(key).is_some()
    }

    pub fn has_own_property(&self, key: &str) -> bool {
        self.get_own_property(key).is_some()
    }

    pub fn own_keys(&self) -> Vec<String> {
        let mut data = self.borrow_mut();
        data.ensure_initialized();
        data.own_keys()
    }

    /// The callable behind a function object.
    pub(crate) fn callable(&self) -> Option<JsFunction> {
        self.borrow().function().map(|d| d.func.clone())
    }

    pub fn prototype(&self) -> Option<JsObject> {
        self.borrow().prototype.clone()
    }
}

impl Interpreter {
    /// `[[Get]]` (ES5 §8.12.3), invoking getters with `obj` as receiver.
    pub fn get(&mut self, obj: &JsObject, key: &str) -> Result<JsValue, JsValue> {
        let receiver = JsValue::Object(obj.clone());
        let value = self.get_with_receiver(obj, key, &receiver)?;
        // ES5 §15.3.5.4: `caller` may not expose a strict function
        if key == "caller"
            && obj.borrow().is_callable()
            && let JsValue::Object(f) = &value
            && f.borrow().function().is_some_and(|d| d.strict)
        {
            return Err(self.create_type_error(
                "'caller' and 'arguments' are restricted function properties and cannot be accessed in this context.",
            ));
        }
        Ok(value)
    }

    pub(crate) fn get_with_receiver(
        &mut self,
        obj: &JsObject,
        key: &str,
        receiver: &JsValue,
    ) -> Result<JsValue, JsValue> {
        match obj.get_property(key) {
            None => Ok(JsValue::Undefined),
            Some(desc) if desc.is_accessor_descriptor() => match desc.get() {
                Some(getter) if getter.is_callable() => {
                    let getter = getter.clone();
                    self.call(&getter, receiver, &[])
                }
                _ => Ok(JsValue::Undefined),
            },
            Some(desc) => Ok(desc.value_or_undefined()),
        }
    }

    /// `[[Put]]` (ES5 §8.12.5).
    pub fn put(&mut self, obj: &JsObject, key: &str, value: JsValue, throw: bool) -> Result<(), JsValue> {
        let receiver = JsValue::Object(obj.clone());
        self.put_with_receiver(obj, key, value, &receiver, throw)
    }

    /// `[[Put]]` where `receiver` may be a primitive whose wrapper is `obj`
    /// (ES5 §8.7.2); writes to the wrapper itself are discarded then.
    pub(crate) fn put_with_receiver(
        &mut self,
        obj: &JsObject,
        key: &str,
        value: JsValue,
        receiver: &JsValue,
        throw: bool,
    ) -> Result<(), JsValue> {
        let own = obj.get_own_property(key);
        let inherited = match &own {
            Some(_) => None,
            None => obj.prototype().and_then(|p| p.get_property(key)),
        };
        let extensible = obj.borrow().extensible;
        let can_put = match own.as_ref().or(inherited.as_ref()) {
            Some(d) if d.is_accessor_descriptor() => d.set().is_some_and(|s| !s.is_undefined()),
            Some(d) if own.is_some() => d.writable(),
            Some(d) => extensible && d.writable(),
            None => extensible,
        };
        if !can_put {
            if throw {
                return Err(self.create_type_error(&format!(
                    "Cannot assign to read only property '{}' of {}",
                    display_key(key),
                    obj.class_name()
                )));
            }
            return Ok(());
        }
        let is_primitive_receiver = !receiver.is_object();
        if let Some(d) = &own
            && d.is_data_descriptor()
        {
            if is_primitive_receiver {
                if throw {
                    return Err(self.create_type_error(&format!(
                        "Cannot create property '{}' on primitive value",
                        display_key(key)
                    )));
                }
                return Ok(());
            }
            let update = PropertyDescriptor::partial(Some(value), None, None, None, None, None)
                .unwrap_or_else(|_| PropertyDescriptor::generic());
            self.define_own_property(obj, key, update, throw)?;
            return Ok(());
        }
        if let Some(d) = own.as_ref().or(inherited.as_ref())
            && d.is_accessor_descriptor()
        {
            let setter = d.set().cloned().unwrap_or_default();
            self.call(&setter, receiver, &[value])?;
            return Ok(());
        }
        if is_primitive_receiver {
            if throw {
                return Err(self.create_type_error(&format!(
                    "Cannot create property '{}' on primitive value",
                    display_key(key)
                )));
            }
            return Ok(());
        }
        self.define_own_property(obj, key, PropertyDescriptor::data_default(value), throw)?;
        Ok(())
    }

    /// `[[DefineOwnProperty]]`; rejections throw a TypeError when `throw`.
    pub fn define_own_property(
        &mut self,
        obj: &JsObject,
        key: &str,
        mut desc: PropertyDescriptor,
        throw: bool,
    ) -> Result<bool, JsValue> {
        let is_array = matches!(obj.borrow().kind, ObjectKind::Array);
        if is_array
            && key == "length"
            && let Some(value) = desc.value().cloned()
        {
            let number = self.to_number(&value)?;
            let len = number_ops::to_uint32(number);
            if f64::from(len) != number {
                return Err(self.create_range_error("Invalid array length"));
            }
            desc.set_value(JsValue::Number(f64::from(len)));
        }
        let ok = obj.borrow_mut().define_own_property(key, desc);
        if !ok && throw {
            return Err(self.create_type_error(&format!(
                "Cannot redefine property: {}",
                display_key(key)
            )));
        }
        Ok(ok)
    }

    /// `[[Delete]]` (ES5 §8.12.7).
    pub(crate) fn delete_property(&mut self, obj: &JsObject, key: &str, throw: bool) -> Result<bool, JsValue> {
        let ok = obj.borrow_mut().delete(key);
        if !ok && throw {
            return Err(self.create_type_error(&format!(
                "Cannot delete property '{}' of {}",
                display_key(key),
                obj.class_name()
            )));
        }
        Ok(ok)
    }

    /// `[[HasInstance]]` of function objects (ES5 §15.3.5.3), following
    /// bound functions to their target.
    pub(crate) fn has_instance(&mut self, func: &JsObject, value: &JsValue) -> Result<bool, JsValue> {
        if let Some(JsFunction::Bound { target, .. }) = func.callable() {
            return self.has_instance(&target, value);
        }
        let JsValue::Object(v) = value else {
            return Ok(false);
        };
        let proto = self.get(func, "prototype")?;
        let JsValue::Object(proto) = proto else {
            let shown = self.to_display_string(&proto);
            return Err(self.create_type_error(&format!(
                "Function has non-object prototype '{shown}' in instanceof check"
            )));
        };
        let mut current = v.prototype();
        while let Some(p) = current {
            if p.ptr_eq(&proto) {
                return Ok(true);
            }
            current = p.prototype();
        }
        Ok(false)
    }

    /// Builds the descriptor object returned by `getOwnPropertyDescriptor`
    /// (ES5 §8.10.4).
    pub(crate) fn from_property_descriptor(&mut self, desc: &PropertyDescriptor) -> JsValue {
        let obj = self.create_object();
        {
            let mut o = obj.borrow_mut();
            if desc.is_accessor_descriptor() {
                o.insert_value("get".to_string(), desc.get().cloned().unwrap_or_default());
                o.insert_value("set".to_string(), desc.set().cloned().unwrap_or_default());
            } else {
                o.insert_value("value".to_string(), desc.value_or_undefined());
                o.insert_value("writable".to_string(), JsValue::Boolean(desc.writable()));
            }
            o.insert_value("enumerable".to_string(), JsValue::Boolean(desc.enumerable()));
            o.insert_value("configurable".to_string(), JsValue::Boolean(desc.configurable()));
        }
        JsValue::Object(obj)
    }

    /// ToPropertyDescriptor (ES5 §8.10.5).
    pub(crate) fn to_property_descriptor(&mut self, value: &JsValue) -> Result<PropertyDescriptor, JsValue> {
        let JsValue::Object(obj) = value else {
            return Err(self.create_type_error("Property description must be an object"));
        };
        let field = |interp: &mut Interpreter, name: &str| -> Result<Option<JsValue>, JsValue> {
            if obj.has_property(name) {
                interp.get(obj, name).map(Some)
            } else {
                Ok(None)
            }
        };
        let enumerable = field(self, "enumerable")?.map(|v| self.to_boolean(&v));
        let configurable = field(self, "configurable")?.map(|v| self.to_boolean(&v));
        let value = field(self, "value")?;
        let writable = field(self, "writable")?.map(|v| self.to_boolean(&v));
        let get = field(self, "get")?;
        let set = field(self, "set")?;
        for accessor in [&get, &set].into_iter().flatten() {
            if !accessor.is_undefined() && !accessor.is_callable() {
                return Err(self.create_type_error("Getter and setter must be functions"));
            }
        }
        PropertyDescriptor::partial(value, writable, get, set, enumerable, configurable)
            .map_err(|msg| self.create_type_error(msg))
    }
}

/// Human-readable form of a property key, with symbol keys shown as `Symbol(desc)`.
pub(crate) fn display_key(key: &str) -> &str {
    if is_symbol_key(key) {
        let trimmed = key.trim_start_matches(crate::types::SYMBOL_KEY_PREFIX);
        trimmed.rsplit_once('#').map_or(trimmed, |(desc, _)| desc)
    } else {
        crate::types::property_key_name(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ordinary() -> JsObjectData {
        JsObjectData::new(None, "Object", ObjectKind::Ordinary)
    }

    fn partial_value(v: f64) -> PropertyDescriptor {
        PropertyDescriptor::partial(Some(JsValue::Number(v)), None, None, None, None, None)
            .unwrap_or_else(|_| PropertyDescriptor::generic())
    }

    #[test]
    fn array_index_is_canonical() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("42"), Some(42));
        assert_eq!(array_index("01"), None);
        assert_eq!(array_index("-1"), None);
        assert_eq!(array_index("1.5"), None);
        assert_eq!(array_index("4294967295"), None);
        assert_eq!(array_index("4294967294"), Some(4294967294));
    }

    #[test]
    fn define_new_property_requires_extensible() {
        let mut o = ordinary();
        assert!(o.define_own_property("a", partial_value(1.0)));
        let stored = o.own_property("a").unwrap();
        // absent attributes default to false
        assert!(!stored.writable() && !stored.enumerable() && !stored.configurable());
        o.extensible = false;
        assert!(!o.define_own_property("b", partial_value(1.0)));
        assert!(o.own_property("b").is_none());
    }

    #[test]
    fn non_configurable_rejections() {
        let mut o = ordinary();
        o.insert_property(
            "x".to_string(),
            PropertyDescriptor::data(JsValue::Number(1.0), false, true, false),
        );
        // value change on read-only
        assert!(!o.define_own_property("x", partial_value(2.0)));
        // same value is accepted
        assert!(o.define_own_property("x", partial_value(1.0)));
        // becoming configurable
        let d = PropertyDescriptor::partial(None, None, None, None, None, Some(true)).unwrap();
        assert!(!o.define_own_property("x", d));
        // enumerability flip
        let d = PropertyDescriptor::partial(None, None, None, None, Some(false), None).unwrap();
        assert!(!o.define_own_property("x", d));
        // writable false -> true
        let d = PropertyDescriptor::partial(None, Some(true), None, None, None, None).unwrap();
        assert!(!o.define_own_property("x", d));
        // data -> accessor
        let d = PropertyDescriptor::accessor(None, None, true, false);
        assert!(!o.define_own_property("x", d));
        assert_eq!(o.own_property("x").unwrap().value(), Some(&JsValue::Number(1.0)));
    }

    #[test]
    fn writable_non_configurable_can_change_value_and_drop_writable() {
        let mut o = ordinary();
        o.insert_property(
            "x".to_string(),
            PropertyDescriptor::data(JsValue::Number(1.0), true, false, false),
        );
        assert!(o.define_own_property("x", partial_value(5.0)));
        let d = PropertyDescriptor::partial(None, Some(false), None, None, None, None).unwrap();
        assert!(o.define_own_property("x", d));
        assert!(!o.own_property("x").unwrap().writable());
    }

    #[test]
    fn configurable_kind_conversion() {
        let mut o = ordinary();
        o.insert_value("x".to_string(), JsValue::Number(1.0));
        let d = PropertyDescriptor::partial(None, None, Some(JsValue::Undefined), None, None, None).unwrap();
        assert!(o.define_own_property("x", d));
        let stored = o.own_property("x").unwrap();
        assert!(stored.is_accessor_descriptor());
        assert!(stored.enumerable() && stored.configurable());
    }

    #[test]
    fn delete_respects_configurable() {
        let mut o = ordinary();
        o.insert_value("a".to_string(), JsValue::Null);
        o.insert_property(
            "b".to_string(),
            PropertyDescriptor::data(JsValue::Null, true, true, false),
        );
        assert!(o.delete("a"));
        assert!(!o.delete("b"));
        assert!(o.delete("missing"));
        assert!(o.own_property("b").is_some());
    }

    #[test]
    fn array_length_tracks_indices_and_truncates() {
        let mut a = JsObjectData::new(None, "Array", ObjectKind::Array);
        a.insert_property(
            "length".to_string(),
            PropertyDescriptor::data(JsValue::Number(0.0), true, false, false),
        );
        assert!(a.define_own_property("4", PropertyDescriptor::data_default(JsValue::Null)));
        assert_eq!(a.array_length().0, 5);
        assert!(a.define_own_property("length", partial_value(2.0)));
        assert!(a.own_property("4").is_none());
        assert_eq!(a.array_length().0, 2);
    }

    #[test]
    fn array_truncation_stops_at_non_configurable() {
        let mut a = JsObjectData::new(None, "Array", ObjectKind::Array);
        a.insert_property(
            "length".to_string(),
            PropertyDescriptor::data(JsValue::Number(3.0), true, false, false),
        );
        a.insert_property(
            "1".to_string(),
            PropertyDescriptor::data(JsValue::Null, true, true, false),
        );
        a.insert_value("2".to_string(), JsValue::Null);
        assert!(!a.define_own_property("length", partial_value(0.0)));
        assert_eq!(a.array_length().0, 2);
    }

    #[test]
    fn function_slots_enumerate_first() {
        let mut data = FunctionSlots::default();
        data.length = Some(PropertyDescriptor::new(JsValue::Number(0.0), PropertyFlag::ALL_FORBIDDEN));
        data.name = Some(PropertyDescriptor::new(JsValue::string("f"), PropertyFlag::ONLY_CONFIGURABLE));
        let func = FunctionData {
            func: JsFunction::native("f", 0, |_, _, _| crate::interpreter::types::Completion::Empty),
            strict: false,
            slots: data,
        };
        let mut f = JsObjectData::new(None, "Function", ObjectKind::Function(Box::new(func)));
        f.insert_value("custom".to_string(), JsValue::Null);
        f.insert_value("prototype".to_string(), JsValue::Null);
        assert_eq!(f.own_keys(), vec!["prototype", "length", "name", "custom"]);
        assert!(f.properties.get("prototype").is_none());
        assert!(f.delete("name"));
        assert_eq!(f.own_keys(), vec!["prototype", "length", "custom"]);
    }

    #[test]
    fn string_wrapper_exposes_indices() {
        let s = JsObjectData::new(None, "String", ObjectKind::String(JsString::from_str("ab")));
        assert_eq!(s.own_property("1").unwrap().value(), Some(&JsValue::string("b")));
        assert!(s.own_property("2").is_none());
        assert_eq!(s.own_keys(), vec!["0", "1", "length"]);
    }

    #[test]
    fn display_key_strips_symbol_marker() {
        assert_eq!(display_key("plain"), "plain");
        assert_eq!(display_key("\0Symbol(a)#3"), "Symbol(a)");
        assert_eq!(display_key("\0\0x"), "\0x");
    }
}
