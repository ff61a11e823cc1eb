use super::Interpreter;
use super::property::PropertyDescriptor;
use crate::types::{JsObject, JsValue, is_symbol_key, property_key_name};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub type EnvRef = Rc<LexicalEnvironment>;

/// An environment record plus the link to its enclosing environment.
pub struct LexicalEnvironment {
    pub record: EnvironmentRecord,
    pub outer: Option<EnvRef>,
}

pub enum EnvironmentRecord {
    Declarative(RefCell<DeclarativeRecord>),
    Object(ObjectRecord),
    /// Global object bindings plus a declarative part holding top-level
    /// `let`/`const` names.
    Global(GlobalRecord),
}

pub struct ObjectRecord {
    pub binding_object: JsObject,
    /// Set for `with` environments, which supply their object as `this`.
    pub provide_this: bool,
}

pub struct GlobalRecord {
    pub object: JsObject,
    pub declarative: RefCell<DeclarativeRecord>,
}

#[derive(Clone, Debug)]
pub struct Binding {
    pub value: JsValue,
    pub mutable: bool,
    pub can_be_deleted: bool,
    pub initialized: bool,
}

impl Binding {
    fn mutable(value: JsValue, can_be_deleted: bool) -> Self {
        Binding {
            value,
            mutable: true,
            can_be_deleted,
            initialized: true,
        }
    }
}

/// Whether the `arguments` binding of a call was observed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ArgumentsAccess {
    #[default]
    NotAccessed,
    Accessed,
    Persisted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BindingError {
    Immutable,
    Uninitialized,
    Missing,
}

/// Declarative bindings. Most scopes bind zero or one name, so the first
/// binding lives inline and the map is only allocated for a second name.
/// `arguments` has its own slot so call exit can find it without hashing.
#[derive(Default)]
pub struct DeclarativeRecord {
    slot: Option<(String, Binding)>,
    map: Option<IndexMap<String, Binding, FxBuildHasher>>,
    arguments: Option<Binding>,
    arguments_access: ArgumentsAccess,
}

impl DeclarativeRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none() && self.arguments.is_none() && self.map.as_ref().is_none_or(|m| m.is_empty())
    }

    fn binding(&self, name: &str) -> Option<&Binding> {
        if name == "arguments" {
            return self.arguments.as_ref();
        }
        match &self.slot {
            Some((n, b)) if n == name => Some(b),
            _ => self.map.as_ref()?.get(name),
        }
    }

    fn binding_mut(&mut self, name: &str) -> Option<&mut Binding> {
        if name == "arguments" {
            return self.arguments.as_mut();
        }
        match &mut self.slot {
            Some((n, b)) if n == name => Some(b),
            _ => self.map.as_mut()?.get_mut(name),
        }
    }

    fn insert(&mut self, name: &str, binding: Binding) {
        if name == "arguments" {
            self.arguments = Some(binding);
            return;
        }
        match &mut self.slot {
            None => self.slot = Some((name.to_string(), binding)),
            Some((n, b)) if n == name => *b = binding,
            Some(_) => {
                self.map
                    .get_or_insert_with(IndexMap::default)
                    .insert(name.to_string(), binding);
            }
        }
    }

    pub fn has_binding(&self, name: &str) -> bool {
        self.binding(name).is_some()
    }

    /// Declares an undefined mutable binding. An existing binding of the same
    /// name is left untouched.
    pub fn create_mutable_binding(&mut self, name: &str, can_be_deleted: bool) {
        if self.has_binding(name) {
            return;
        }
        self.insert(name, Binding::mutable(JsValue::Undefined, can_be_deleted));
    }

    /// Declares an immutable binding holding the uninitialised sentinel.
    pub fn create_immutable_binding(&mut self, name: &str) {
        self.insert(
            name,
            Binding {
                value: JsValue::Undefined,
                mutable: false,
                can_be_deleted: false,
                initialized: false,
            },
        );
    }

    pub fn initialize_binding(&mut self, name: &str, value: JsValue) {
        if let Some(b) = self.binding_mut(name) {
            b.value = value;
            b.initialized = true;
        }
    }

    pub(crate) fn set_mutable_binding(&mut self, name: &str, value: JsValue, strict: bool) -> Result<(), BindingError> {
        let Some(b) = self.binding_mut(name) else {
            return Err(BindingError::Missing);
        };
        if b.mutable {
            b.value = value;
            Ok(())
        } else if strict {
            Err(BindingError::Immutable)
        } else {
            Ok(())
        }
    }

    pub(crate) fn get_binding_value(&mut self, name: &str, strict: bool) -> Result<JsValue, BindingError> {
        if name == "arguments" && self.arguments.is_some() && self.arguments_access == ArgumentsAccess::NotAccessed {
            self.arguments_access = ArgumentsAccess::Accessed;
        }
        let Some(b) = self.binding(name) else {
            return Err(BindingError::Missing);
        };
        if !b.mutable && !b.initialized {
            return if strict {
                Err(BindingError::Uninitialized)
            } else {
                Ok(JsValue::Undefined)
            };
        }
        Ok(b.value.clone())
    }

    /// Reads a binding without touching access tracking.
    pub fn peek(&self, name: &str) -> Option<JsValue> {
        self.binding(name).map(|b| b.value.clone())
    }

    pub fn delete_binding(&mut self, name: &str) -> bool {
        let Some(b) = self.binding(name) else {
            return true;
        };
        if !b.can_be_deleted {
            return false;
        }
        if name == "arguments" {
            self.arguments = None;
        } else if matches!(&self.slot, Some((n, _)) if n == name) {
            self.slot = None;
        } else if let Some(map) = &mut self.map {
            map.shift_remove(name);
        }
        true
    }

    /// Binding names: the inline slot, then `arguments`, then the rest.
    pub fn binding_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if let Some((n, _)) = &self.slot {
            names.push(n.clone());
        }
        if self.arguments.is_some() {
            names.push("arguments".to_string());
        }
        if let Some(map) = &self.map {
            names.extend(map.keys().cloned());
        }
        names
    }

    /// Binds formal parameters to argument values, then reserves the
    /// `arguments` binding unless a parameter already took the name.
    pub(crate) fn add_function_parameters(
        &mut self,
        params: &[String],
        args: &[JsValue],
        arguments_object: Option<JsValue>,
    ) -> Result<(), BindingError> {
        if self.is_empty() && params.len() == 1 && params[0] != "arguments" {
            let value = args.first().cloned().unwrap_or_default();
            self.slot = Some((params[0].clone(), Binding::mutable(value, false)));
        } else {
            for (i, name) in params.iter().enumerate() {
                let value = args.get(i).cloned().unwrap_or_default();
                match self.binding_mut(name) {
                    Some(b) if b.mutable => b.value = value,
                    Some(_) => return Err(BindingError::Immutable),
                    None => self.insert(name, Binding::mutable(value, false)),
                }
            }
        }
        if self.arguments.is_none()
            && let Some(obj) = arguments_object
        {
            self.arguments = Some(Binding::mutable(obj, false));
        }
        Ok(())
    }

    pub fn arguments_access(&self) -> ArgumentsAccess {
        self.arguments_access
    }

    pub(crate) fn set_arguments_access(&mut self, access: ArgumentsAccess) {
        self.arguments_access = access;
    }

    pub(crate) fn arguments_value(&self) -> Option<&JsValue> {
        self.arguments.as_ref().map(|b| &b.value)
    }

    pub(crate) fn clear_arguments(&mut self) {
        self.arguments = None;
    }
}

impl LexicalEnvironment {
    pub fn new_declarative(outer: Option<EnvRef>) -> EnvRef {
        Rc::new(LexicalEnvironment {
            record: EnvironmentRecord::Declarative(RefCell::new(DeclarativeRecord::new())),
            outer,
        })
    }

    pub fn new_object(binding_object: JsObject, provide_this: bool, outer: Option<EnvRef>) -> EnvRef {
        Rc::new(LexicalEnvironment {
            record: EnvironmentRecord::Object(ObjectRecord {
                binding_object,
                provide_this,
            }),
            outer,
        })
    }

    pub fn new_global(object: JsObject) -> EnvRef {
        Rc::new(LexicalEnvironment {
            record: EnvironmentRecord::Global(GlobalRecord {
                object,
                declarative: RefCell::new(DeclarativeRecord::new()),
            }),
            outer: None,
        })
    }

    /// The declarative part of this record, if any.
    pub fn declarative(&self) -> Option<&RefCell<DeclarativeRecord>> {
        match &self.record {
            EnvironmentRecord::Declarative(d) => Some(d),
            EnvironmentRecord::Global(g) => Some(&g.declarative),
            EnvironmentRecord::Object(_) => None,
        }
    }

    pub(crate) fn read_declarative(&self, name: &str) -> Option<JsValue> {
        self.declarative()?.borrow().peek(name)
    }

    pub(crate) fn write_declarative(&self, name: &str, value: JsValue) {
        if let Some(d) = self.declarative() {
            let _ = d.borrow_mut().set_mutable_binding(name, value, false);
        }
    }

    /// `HasBinding`. Never runs script code: in the absence of proxies
    /// `HasProperty` is a pure prototype walk.
    pub fn has_binding(&self, name: &str) -> bool {
        match &self.record {
            EnvironmentRecord::Declarative(d) => d.borrow().has_binding(name),
            EnvironmentRecord::Object(o) => o.binding_object.has_property(name),
            EnvironmentRecord::Global(g) => {
                g.declarative.borrow().has_binding(name) || g.object.has_property(name)
            }
        }
    }

    pub fn implicit_this_value(&self) -> JsValue {
        match &self.record {
            EnvironmentRecord::Object(o) if o.provide_this => JsValue::Object(o.binding_object.clone()),
            _ => JsValue::Undefined,
        }
    }

    pub fn binding_names(&self) -> Vec<String> {
        let object_names = |obj: &JsObject| {
            obj.own_keys()
                .into_iter()
                .filter(|k| !is_symbol_key(k))
                .map(|k| property_key_name(&k).to_string())
                .collect::<Vec<_>>()
        };
        match &self.record {
            EnvironmentRecord::Declarative(d) => d.borrow().binding_names(),
            EnvironmentRecord::Object(o) => object_names(&o.binding_object),
            EnvironmentRecord::Global(g) => {
                let mut names = g.declarative.borrow().binding_names();
                names.extend(object_names(&g.object));
                names
            }
        }
    }
}

impl fmt::Debug for LexicalEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.record {
            EnvironmentRecord::Declarative(_) => "Declarative",
            EnvironmentRecord::Object(_) => "Object",
            EnvironmentRecord::Global(_) => "Global",
        };
        write!(f, "LexicalEnvironment({kind})")
    }
}

impl Interpreter {
    pub(crate) fn binding_error(&mut self, err: BindingError, name: &str) -> JsValue {
        match err {
            BindingError::Immutable => self.create_type_error("Can't update the value of an immutable binding."),
            BindingError::Uninitialized => {
                self.create_reference_error("Can't access an uninitialized immutable binding.")
            }
            BindingError::Missing => self.create_reference_error(&format!("{name} is not defined")),
        }
    }

    /// GetIdentifierReference (ES5 §10.2.2.1): the environment that binds
    /// `name`, or `None` when the reference is unresolvable.
    pub(crate) fn resolve_binding(&self, env: &EnvRef, name: &str) -> Option<EnvRef> {
        let mut current = Some(env.clone());
        while let Some(e) = current {
            if e.has_binding(name) {
                return Some(e);
            }
            current = e.outer.clone();
        }
        None
    }

    /// `CreateMutableBinding`. On object records this defines an own data
    /// property, configurable only when the binding may be deleted.
    pub(crate) fn create_mutable_binding(&mut self, env: &EnvRef, name: &str, can_be_deleted: bool) -> Result<(), JsValue> {
        match &env.record {
            EnvironmentRecord::Declarative(d) => {
                d.borrow_mut().create_mutable_binding(name, can_be_deleted);
                Ok(())
            }
            EnvironmentRecord::Object(ObjectRecord { binding_object: obj, .. })
            | EnvironmentRecord::Global(GlobalRecord { object: obj, .. }) => {
                let desc = PropertyDescriptor::data(JsValue::Undefined, true, true, can_be_deleted);
                self.define_own_property(obj, name, desc, true)?;
                Ok(())
            }
        }
    }

    /// Declares a block-scoped `let` (mutable, undefined) or `const`
    /// (immutable, uninitialised) binding.
    pub(crate) fn create_lexical_binding(&mut self, env: &EnvRef, name: &str, is_const: bool) {
        if let Some(d) = env.declarative() {
            let mut d = d.borrow_mut();
            if is_const {
                d.create_immutable_binding(name);
            } else {
                d.create_mutable_binding(name, false);
            }
        }
    }

    pub(crate) fn initialize_binding(&mut self, env: &EnvRef, name: &str, value: JsValue) -> Result<(), JsValue> {
        match env.declarative() {
            Some(d) if d.borrow().has_binding(name) => {
                d.borrow_mut().initialize_binding(name, value);
                Ok(())
            }
            _ => self.set_mutable_binding(env, name, value, false),
        }
    }

    pub(crate) fn set_mutable_binding(&mut self, env: &EnvRef, name: &str, value: JsValue, strict: bool) -> Result<(), JsValue> {
        let result = match &env.record {
            EnvironmentRecord::Declarative(d) => d.borrow_mut().set_mutable_binding(name, value, strict),
            EnvironmentRecord::Object(o) => {
                let obj = o.binding_object.clone();
                return self.put(&obj, name, value, strict);
            }
            EnvironmentRecord::Global(g) => {
                if g.declarative.borrow().has_binding(name) {
                    g.declarative.borrow_mut().set_mutable_binding(name, value, strict)
                } else {
                    let obj = g.object.clone();
                    return self.put(&obj, name, value, strict);
                }
            }
        };
        result.map_err(|e| self.binding_error(e, name))
    }

    pub(crate) fn get_binding_value(&mut self, env: &EnvRef, name: &str, strict: bool) -> Result<JsValue, JsValue> {
        let object = match &env.record {
            EnvironmentRecord::Declarative(d) => {
                let result = d.borrow_mut().get_binding_value(name, strict);
                return result.map_err(|e| self.binding_error(e, name));
            }
            EnvironmentRecord::Global(g) if g.declarative.borrow().has_binding(name) => {
                let result = g.declarative.borrow_mut().get_binding_value(name, strict);
                return result.map_err(|e| self.binding_error(e, name));
            }
            EnvironmentRecord::Object(o) => o.binding_object.clone(),
            EnvironmentRecord::Global(g) => g.object.clone(),
        };
        if !object.has_property(name) {
            if strict {
                return Err(self.binding_error(BindingError::Missing, name));
            }
            return Ok(JsValue::Undefined);
        }
        self.get(&object, name)
    }

    pub(crate) fn delete_binding(&mut self, env: &EnvRef, name: &str) -> Result<bool, JsValue> {
        match &env.record {
            EnvironmentRecord::Declarative(d) => Ok(d.borrow_mut().delete_binding(name)),
            EnvironmentRecord::Global(g) if g.declarative.borrow().has_binding(name) => {
                Ok(g.declarative.borrow_mut().delete_binding(name))
            }
            EnvironmentRecord::Object(ObjectRecord { binding_object: obj, .. })
            | EnvironmentRecord::Global(GlobalRecord { object: obj, .. }) => {
                let obj = obj.clone();
                self.delete_property(&obj, name, false)
            }
        }
    }

    /// Hoists `var` names as undefined mutable bindings, skipping names that
    /// are already bound so parameters keep their values.
    pub(crate) fn add_variable_declarations(&mut self, env: &EnvRef, names: &[String], can_be_deleted: bool) -> Result<(), JsValue> {
        for name in names {
            if !env.has_binding(name) {
                self.create_mutable_binding(env, name, can_be_deleted)?;
            }
        }
        Ok(())
    }
}
