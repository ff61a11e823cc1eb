use super::Interpreter;
use super::environment::EnvRef;
use super::property::PropertyDescriptor;
use crate::ast::FunctionNode;
use crate::types::{JsObject, JsValue};
use std::fmt;
use std::rc::Rc;

/// Result of evaluating a statement. Abrupt completions unwind to the
/// construct that consumes them; `Throw` crosses function boundaries.
#[derive(Clone, Debug)]
pub enum Completion {
    Normal(JsValue),
    /// Normal completion that produced no value (`;`, declarations).
    Empty,
    Return(JsValue),
    Throw(JsValue),
    Break(Option<String>),
    Continue(Option<String>),
}

impl Completion {
    pub fn is_abrupt(&self) -> bool {
        !matches!(self, Completion::Normal(_) | Completion::Empty)
    }

    /// Value carried by a normal or return completion.
    pub fn value(&self) -> Option<&JsValue> {
        match self {
            Completion::Normal(v) | Completion::Return(v) => Some(v),
            _ => None,
        }
    }

    /// Collapses the completion of a native call into a result.
    pub fn into_result(self) -> Result<JsValue, JsValue> {
        match self {
            Completion::Throw(e) => Err(e),
            Completion::Normal(v) | Completion::Return(v) => Ok(v),
            _ => Ok(JsValue::Undefined),
        }
    }

    /// Replaces an empty value with `value` (ES5 §12.1 UpdateEmpty).
    pub(crate) fn update_empty(self, value: &Option<JsValue>) -> Completion {
        match (self, value) {
            (Completion::Empty, Some(v)) => Completion::Normal(v.clone()),
            (c, _) => c,
        }
    }
}

impl From<Result<JsValue, JsValue>> for Completion {
    fn from(result: Result<JsValue, JsValue>) -> Self {
        match result {
            Ok(v) => Completion::Normal(v),
            Err(e) => Completion::Throw(e),
        }
    }
}

pub type NativeFn = Rc<dyn Fn(&mut Interpreter, &JsValue, &[JsValue]) -> Completion>;
pub type NativeCtor = Rc<dyn Fn(&mut Interpreter, &[JsValue]) -> Completion>;

#[derive(Clone)]
pub enum JsFunction {
    User {
        node: Rc<FunctionNode>,
        scope: EnvRef,
    },
    Native {
        name: String,
        arity: usize,
        call: NativeFn,
        construct: Option<NativeCtor>,
    },
    Bound {
        target: JsObject,
        this: JsValue,
        args: Vec<JsValue>,
    },
    /// The realm's `eval`; direct calls are recognised by the evaluator.
    Eval,
}

impl JsFunction {
    pub fn native<F>(name: &str, arity: usize, f: F) -> Self
    where
        F: Fn(&mut Interpreter, &JsValue, &[JsValue]) -> Completion + 'static,
    {
        JsFunction::Native {
            name: name.to_string(),
            arity,
            call: Rc::new(f),
            construct: None,
        }
    }

    /// Native function with distinct `[[Call]]` and `[[Construct]]` behaviour.
    pub fn constructor<F, C>(name: &str, arity: usize, call: F, construct: C) -> Self
    where
        F: Fn(&mut Interpreter, &JsValue, &[JsValue]) -> Completion + 'static,
        C: Fn(&mut Interpreter, &[JsValue]) -> Completion + 'static,
    {
        JsFunction::Native {
            name: name.to_string(),
            arity,
            call: Rc::new(call),
            construct: Some(Rc::new(construct)),
        }
    }

    pub fn name(&self) -> String {
        match self {
            JsFunction::User { node, .. } => node.name.clone().unwrap_or_default(),
            JsFunction::Native { name, .. } => name.clone(),
            JsFunction::Bound { .. } => "bound".to_string(),
            JsFunction::Eval => "eval".to_string(),
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            JsFunction::User { node, .. } => node.params.len(),
            JsFunction::Native { arity, .. } => *arity,
            JsFunction::Bound { .. } => 0,
            JsFunction::Eval => 1,
        }
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, JsFunction::User { node, .. } if node.strict)
    }
}

impl fmt::Debug for JsFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsFunction::User { node, .. } => write!(f, "User({:?})", node.name),
            JsFunction::Native { name, .. } => write!(f, "Native({name})"),
            JsFunction::Bound { target, .. } => write!(f, "Bound({target:?})"),
            JsFunction::Eval => write!(f, "Eval"),
        }
    }
}

/// Inline storage for the three properties nearly every function carries.
/// `None` means the property is absent (deleted or never defined).
#[derive(Clone, Debug, Default)]
pub struct FunctionSlots {
    pub prototype: Option<PropertyDescriptor>,
    pub length: Option<PropertyDescriptor>,
    pub name: Option<PropertyDescriptor>,
}

impl FunctionSlots {
    pub const KEYS: [&'static str; 3] = ["prototype", "length", "name"];

    pub fn slot(&self, key: &str) -> Option<&Option<PropertyDescriptor>> {
        match key {
            "prototype" => Some(&self.prototype),
            "length" => Some(&self.length),
            "name" => Some(&self.name),
            _ => None,
        }
    }

    pub fn slot_mut(&mut self, key: &str) -> Option<&mut Option<PropertyDescriptor>> {
        match key {
            "prototype" => Some(&mut self.prototype),
            "length" => Some(&mut self.length),
            "name" => Some(&mut self.name),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FunctionData {
    pub func: JsFunction,
    pub strict: bool,
    pub slots: FunctionSlots,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abrupt_kinds() {
        assert!(!Completion::Normal(JsValue::Null).is_abrupt());
        assert!(!Completion::Empty.is_abrupt());
        assert!(Completion::Return(JsValue::Null).is_abrupt());
        assert!(Completion::Throw(JsValue::Null).is_abrupt());
        assert!(Completion::Break(None).is_abrupt());
        assert!(Completion::Continue(Some("l".to_string())).is_abrupt());
    }

    #[test]
    fn update_empty_only_fills_empty() {
        let v = Some(JsValue::Number(1.0));
        assert!(matches!(
            Completion::Empty.update_empty(&v),
            Completion::Normal(JsValue::Number(n)) if n == 1.0
        ));
        assert!(matches!(
            Completion::Break(None).update_empty(&v),
            Completion::Break(None)
        ));
    }

    #[test]
    fn into_result_maps_throw() {
        assert!(Completion::Throw(JsValue::Null).into_result().is_err());
        assert!(matches!(Completion::Empty.into_result(), Ok(JsValue::Undefined)));
    }

    #[test]
    fn slot_lookup() {
        let mut slots = FunctionSlots::default();
        assert!(slots.slot("length").is_some_and(|s| s.is_none()));
        assert!(slots.slot("caller").is_none());
        if let Some(s) = slots.slot_mut("name") {
            *s = Some(PropertyDescriptor::data_default(JsValue::string("f")));
        }
        assert!(slots.name.is_some());
    }
}
