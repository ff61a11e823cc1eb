use crate::ast::Program;
use crate::error::{JsError, StackFrame, ThrownValue};
use crate::interop::{TypeMapper, default_type_mappers};
use crate::options::Options;
use crate::parser;
use crate::types::{JsObject, JsString, JsValue};
use rustc_hash::FxHashMap;
use std::any::TypeId;
use std::time::Instant;

pub mod types;
pub use types::*;

pub(crate) mod context;
pub(crate) mod environment;
pub(crate) mod function;
pub(crate) mod helpers;
pub(crate) mod object;
pub mod property;

mod builtins;
mod eval;
mod exec;
mod global_eval;

use context::{ContextKind, ExecutionContext};
use environment::{EnvRef, LexicalEnvironment};
use function::ArgumentsPool;
pub use helpers::PreferredType;
use object::{JsObjectData, ObjectKind};
use property::{PropertyDescriptor, PropertyFlag};

/// Intrinsic objects of one engine instance.
pub(crate) struct Realm {
    pub global_object: JsObject,
    pub object_prototype: JsObject,
    pub function_prototype: JsObject,
    pub array_prototype: JsObject,
    pub boolean_prototype: JsObject,
    pub number_prototype: JsObject,
    pub string_prototype: JsObject,
    pub symbol_prototype: JsObject,
    pub error_prototype: JsObject,
    /// Prototypes of the native error constructors, by name.
    pub error_prototypes: FxHashMap<&'static str, JsObject>,
    /// `%ThrowTypeError%` (ES5 §13.2.3).
    pub throw_type_error: JsObject,
    pub eval: JsObject,
}

fn function_data(func: JsFunction, length: usize, name: &str) -> ObjectKind {
    ObjectKind::Function(Box::new(FunctionData {
        func,
        strict: false,
        slots: FunctionSlots {
            prototype: None,
            length: Some(PropertyDescriptor::new(
                JsValue::Number(length as f64),
                PropertyFlag::ALL_FORBIDDEN,
            )),
            name: Some(PropertyDescriptor::new(JsValue::string(name), PropertyFlag::ONLY_CONFIGURABLE)),
        },
    }))
}

impl Realm {
    /// Allocates the intrinsics with their prototype links; their
    /// properties are installed by `setup_globals`.
    fn new() -> Self {
        let object_prototype = JsObject::new(JsObjectData::new(None, "Object", ObjectKind::Ordinary));
        let with_proto = |class_name: &'static str, kind: ObjectKind| {
            JsObject::new(JsObjectData::new(Some(object_prototype.clone()), class_name, kind))
        };
        // Function.prototype is callable and returns undefined (ES5 §15.3.4)
        let function_prototype = with_proto(
            "Function",
            function_data(
                JsFunction::native("", 0, |_, _, _| Completion::Normal(JsValue::Undefined)),
                0,
                "",
            ),
        );
        let array_prototype = with_proto("Array", ObjectKind::Array);
        array_prototype.borrow_mut().insert_property(
            "length".to_string(),
            PropertyDescriptor::data(JsValue::Number(0.0), true, false, false),
        );
        let error_prototype = with_proto("Error", ObjectKind::Error);
        let function_object = |func: JsFunction, length: usize, name: &str| {
            JsObject::new(JsObjectData::new(
                Some(function_prototype.clone()),
                "Function",
                function_data(func, length, name),
            ))
        };
        let throw_type_error = function_object(
            JsFunction::native("", 0, |interp, _, _| {
                Completion::Throw(interp.create_type_error(
                    "'caller', 'callee', and 'arguments' properties may not be accessed on strict mode functions or the arguments objects for calls to them",
                ))
            }),
            0,
            "",
        );
        {
            let mut t = throw_type_error.borrow_mut();
            if let ObjectKind::Function(data) = &mut t.kind {
                data.slots.name = None;
            }
            t.extensible = false;
        }
        let eval = function_object(JsFunction::Eval, 1, "eval");
        Realm {
            global_object: with_proto("global", ObjectKind::Ordinary),
            boolean_prototype: with_proto("Boolean", ObjectKind::Boolean(false)),
            number_prototype: with_proto("Number", ObjectKind::Number(0.0)),
            string_prototype: with_proto("String", ObjectKind::String(JsString::from_str(""))),
            symbol_prototype: with_proto("Symbol", ObjectKind::Ordinary),
            error_prototypes: FxHashMap::default(),
            object_prototype,
            function_prototype,
            array_prototype,
            error_prototype,
            throw_type_error,
            eval,
        }
    }
}

/// One engine instance: a realm, its global environment and the execution
/// context stack. Engines are single-threaded and share nothing.
pub struct Interpreter {
    pub(crate) options: Options,
    pub(crate) realm: Realm,
    pub(crate) global_env: EnvRef,
    pub(crate) contexts: Vec<ExecutionContext>,
    pub(crate) arguments_pool: ArgumentsPool,
    pub(crate) type_mappers: FxHashMap<TypeId, TypeMapper>,
    pub(crate) pending_fatal: Option<JsError>,
    pub(crate) statements_count: usize,
    pub(crate) started_at: Option<Instant>,
    pub(crate) next_symbol_id: u64,
    pub(crate) last_throw_stack: Vec<StackFrame>,
    /// Arrays currently being joined; a cyclic element joins as "".
    pub(crate) join_stack: Vec<JsObject>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        let realm = Realm::new();
        let global_env = LexicalEnvironment::new_global(realm.global_object.clone());
        let mut interp = Self {
            options,
            realm,
            global_env,
            contexts: Vec::new(),
            arguments_pool: ArgumentsPool::default(),
            type_mappers: default_type_mappers(),
            pending_fatal: None,
            statements_count: 0,
            started_at: None,
            next_symbol_id: 1,
            last_throw_stack: Vec::new(),
            join_stack: Vec::new(),
        };
        interp.setup_globals();
        interp
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn global_object(&self) -> JsObject {
        self.realm.global_object.clone()
    }

    /// A plain object inheriting from `Object.prototype`.
    pub fn create_object(&self) -> JsObject {
        JsObject::new(JsObjectData::new(
            Some(self.realm.object_prototype.clone()),
            "Object",
            ObjectKind::Ordinary,
        ))
    }

    pub fn create_array(&self, values: Vec<JsValue>) -> JsValue {
        let mut data = JsObjectData::new(Some(self.realm.array_prototype.clone()), "Array", ObjectKind::Array);
        let len = values.len();
        for (i, v) in values.into_iter().enumerate() {
            data.insert_value(i.to_string(), v);
        }
        data.insert_property(
            "length".to_string(),
            PropertyDescriptor::data(JsValue::Number(len as f64), true, false, false),
        );
        JsValue::Object(JsObject::new(data))
    }

    /// Creates an instance of the named native error type.
    pub(crate) fn create_error(&mut self, name: &str, message: &str) -> JsValue {
        let proto = self
            .realm
            .error_prototypes
            .get(name)
            .unwrap_or(&self.realm.error_prototype)
            .clone();
        let mut data = JsObjectData::new(Some(proto), "Error", ObjectKind::Error);
        if !message.is_empty() {
            data.insert_builtin("message".to_string(), JsValue::string(message));
        }
        JsValue::Object(JsObject::new(data))
    }

    pub(crate) fn create_type_error(&mut self, message: &str) -> JsValue {
        self.create_error("TypeError", message)
    }

    pub(crate) fn create_reference_error(&mut self, message: &str) -> JsValue {
        self.create_error("ReferenceError", message)
    }

    pub(crate) fn create_range_error(&mut self, message: &str) -> JsValue {
        self.create_error("RangeError", message)
    }

    /// Parses and evaluates `source` as global code.
    pub fn execute(&mut self, source: &str) -> Result<JsValue, JsError> {
        let program = parser::parse_program(source, self.options.strict)?;
        self.run(&program)
    }

    /// Evaluates an already parsed program as global code (ES5 §10.4.1).
    pub fn run(&mut self, program: &Program) -> Result<JsValue, JsError> {
        self.begin_execution();
        let strict = program.strict || self.options.strict;
        let global = self.global_env.clone();
        let ctx = ExecutionContext {
            lexical_environment: global.clone(),
            variable_environment: global.clone(),
            this_binding: JsValue::Object(self.realm.global_object.clone()),
            strict,
            kind: ContextKind::Global,
            function_name: None,
        };
        let completion = match self.enter_context(ctx) {
            Ok(mut guard) => {
                match guard.instantiate_hoisting(&global, &global, &program.hoisting, false, strict) {
                    Ok(()) => guard.exec_statements(&program.body, &global),
                    Err(e) => Completion::Throw(e),
                }
            }
            Err(e) => Completion::Throw(e),
        };
        self.completion_to_result(completion)
    }

    /// Calls the global function `name`.
    pub fn invoke(&mut self, name: &str, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
        self.begin_execution();
        let completion = match self.get_reference_value(&eval::Reference::Property(
            JsValue::Object(self.realm.global_object.clone()),
            name.to_string(),
        )) {
            Ok(func) if func.is_callable() => self.call_function(&func, &this, args),
            Ok(_) => Completion::Throw(self.create_type_error(&format!("{name} is not a function"))),
            Err(e) => Completion::Throw(e),
        };
        self.completion_to_result(completion)
    }

    fn begin_execution(&mut self) {
        self.reset_limits();
        self.last_throw_stack.clear();
    }

    /// Converts a completion at the host boundary.
    fn completion_to_result(&mut self, completion: Completion) -> Result<JsValue, JsError> {
        if let Some(fatal) = self.pending_fatal.take() {
            return Err(fatal);
        }
        match completion {
            Completion::Normal(v) | Completion::Return(v) => Ok(v),
            Completion::Throw(value) => {
                let stack = std::mem::take(&mut self.last_throw_stack);
                let message = self.to_display_string(&value);
                self.pending_fatal = None;
                Err(JsError::Thrown(Box::new(ThrownValue { value, message, stack })))
            }
            Completion::Empty | Completion::Break(_) | Completion::Continue(_) => Ok(JsValue::Undefined),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_returns_completion_value() {
        let mut interp = Interpreter::new();
        assert_eq!(interp.execute("1 + 2").unwrap(), JsValue::Number(3.0));
        assert_eq!(interp.execute("var x = 1;").unwrap(), JsValue::Undefined);
    }

    #[test]
    fn globals_persist_across_executions() {
        let mut interp = Interpreter::new();
        interp.execute("var counter = 1; function bump() { return ++counter; }").unwrap();
        assert_eq!(interp.execute("bump()").unwrap(), JsValue::Number(2.0));
        assert_eq!(interp.invoke("bump", JsValue::Undefined, &[]).unwrap(), JsValue::Number(3.0));
    }

    #[test]
    fn invoke_non_function_is_type_error() {
        let mut interp = Interpreter::new();
        interp.execute("var notFn = 3;").unwrap();
        let err = interp.invoke("notFn", JsValue::Undefined, &[]).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: notFn is not a function");
    }

    #[test]
    fn invoke_passes_this_and_arguments() {
        let mut interp = Interpreter::new();
        interp
            .execute("function sum(a, b) { 'use strict'; return this === undefined ? a + b : -1; }")
            .unwrap();
        let v = interp
            .invoke("sum", JsValue::Undefined, &[JsValue::Number(2.0), JsValue::Number(5.0)])
            .unwrap();
        assert_eq!(v, JsValue::Number(7.0));
    }

    #[test]
    fn parse_errors_surface_as_parse_variant() {
        let mut interp = Interpreter::new();
        assert!(matches!(interp.execute("var = ;"), Err(JsError::Parse(_))));
    }

    #[test]
    fn uncaught_value_is_reported() {
        let mut interp = Interpreter::new();
        let err = interp.execute("throw 'boom'").unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.value(), Some(&JsValue::string("boom")));
    }

    #[test]
    fn strict_option_applies_to_global_code() {
        let mut interp = Interpreter::with_options(Options::new().strict(true));
        let err = interp.execute("undeclaredTarget = 1").unwrap_err();
        assert!(err.to_string().starts_with("ReferenceError"));
    }

    #[test]
    fn global_declarations_are_not_deletable() {
        let mut interp = Interpreter::new();
        let v = interp
            .execute("var v = 1; function f() {} [delete v, delete f, typeof v, typeof f].join()")
            .unwrap();
        assert_eq!(v, JsValue::string("false,false,number,function"));
    }

    #[test]
    fn engines_are_independent() {
        let mut a = Interpreter::new();
        let mut b = Interpreter::new();
        a.execute("var shared = 1; Object.prototype.polluted = true;").unwrap();
        assert_eq!(b.execute("typeof shared").unwrap(), JsValue::string("undefined"));
        assert_eq!(b.execute("({}).polluted").unwrap(), JsValue::Undefined);
    }

    #[test]
    fn global_function_redefinition() {
        let mut interp = Interpreter::new();
        let v = interp
            .execute("function f() { return 1; } function f() { return 2; } f()")
            .unwrap();
        assert_eq!(v, JsValue::Number(2.0));
        assert!(interp.execute("function NaN() {}").is_err());
    }
}
