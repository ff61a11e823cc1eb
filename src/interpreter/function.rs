use super::Interpreter;
use super::context::{ContextKind, ExecutionContext};
use super::environment::{ArgumentsAccess, EnvRef, LexicalEnvironment};
use super::object::{ArgumentsData, JsObjectData, ObjectKind};
use super::property::{PropertyDescriptor, PropertyFlag};
use super::types::{Completion, FunctionData, FunctionSlots, JsFunction};
use crate::ast::{FunctionNode, HoistingScope};
use crate::types::{JsObject, JsString, JsValue};
use std::rc::Rc;
use tracing::debug;

const POOL_CAPACITY: usize = 16;

/// Recycled arguments objects and argument vectors.
#[derive(Default)]
pub(crate) struct ArgumentsPool {
    objects: Vec<JsObject>,
    vectors: Vec<Vec<JsValue>>,
}

impl ArgumentsPool {
    pub(crate) fn len(&self) -> usize {
        self.objects.len()
    }

    pub(crate) fn rent_vec(&mut self) -> Vec<JsValue> {
        self.vectors.pop().unwrap_or_default()
    }

    pub(crate) fn return_vec(&mut self, mut v: Vec<JsValue>) {
        if self.vectors.len() < POOL_CAPACITY {
            v.clear();
            self.vectors.push(v);
        }
    }
}

impl Interpreter {
    /// Creates a function object for `func` with the realm's
    /// `Function.prototype`, an inline `length` and `name`, and no
    /// `prototype` property.
    pub(crate) fn create_function(&mut self, func: JsFunction) -> JsValue {
        JsValue::Object(self.new_function_object(func))
    }

    pub(crate) fn new_function_object(&mut self, func: JsFunction) -> JsObject {
        let slots = FunctionSlots {
            prototype: None,
            length: Some(PropertyDescriptor::new(
                JsValue::Number(func.arity() as f64),
                PropertyFlag::ALL_FORBIDDEN,
            )),
            name: Some(PropertyDescriptor::new(
                JsValue::String(JsString::from_str(&func.name())),
                PropertyFlag::ONLY_CONFIGURABLE,
            )),
        };
        let strict = func.is_strict();
        JsObject::new(JsObjectData::new(
            Some(self.realm.function_prototype.clone()),
            "Function",
            ObjectKind::Function(Box::new(FunctionData { func, strict, slots })),
        ))
    }

    /// Function object creation for script functions (ES5 §13.2).
    pub(crate) fn create_function_object(&mut self, node: Rc<FunctionNode>, scope: EnvRef) -> JsObject {
        let strict = node.strict;
        let obj = self.new_function_object(JsFunction::User { node, scope });
        let proto = self.create_object();
        proto
            .borrow_mut()
            .insert_builtin("constructor".to_string(), JsValue::Object(obj.clone()));
        let mut o = obj.borrow_mut();
        o.insert_property(
            "prototype".to_string(),
            PropertyDescriptor::new(JsValue::Object(proto), PropertyFlag::ONLY_WRITABLE),
        );
        if strict {
            let thrower = Some(JsValue::Object(self.realm.throw_type_error.clone()));
            for key in ["caller", "arguments"] {
                o.insert_property(
                    key.to_string(),
                    PropertyDescriptor::accessor(thrower.clone(), thrower.clone(), false, false),
                );
            }
        }
        drop(o);
        obj
    }

    /// Function expressions; a named one gets its own scope binding its
    /// name immutably (ES5 §13).
    pub(crate) fn instantiate_function_expression(&mut self, node: &Rc<FunctionNode>, scope: &EnvRef) -> JsObject {
        let Some(name) = &node.name else {
            return self.create_function_object(node.clone(), scope.clone());
        };
        let func_env = LexicalEnvironment::new_declarative(Some(scope.clone()));
        let closure = self.create_function_object(node.clone(), func_env.clone());
        if let Some(d) = func_env.declarative() {
            let mut d = d.borrow_mut();
            d.create_immutable_binding(name);
            d.initialize_binding(name, JsValue::Object(closure.clone()));
        }
        closure
    }

    /// `[[Call]]`: the single dispatch point for every callable kind.
    pub fn call_function(&mut self, func: &JsValue, this: &JsValue, args: &[JsValue]) -> Completion {
        let callable = match func {
            JsValue::Object(o) => o.callable().map(|f| (o.clone(), f)),
            _ => None,
        };
        let Some((obj, callable)) = callable else {
            let shown = self.describe(func);
            return Completion::Throw(self.create_type_error(&format!("{shown} is not a function")));
        };
        match callable {
            JsFunction::User { node, scope } => self.call_user_function(&obj, &node, scope, this, args),
            JsFunction::Native { call, .. } => call(self, this, args),
            JsFunction::Bound {
                target,
                this: bound_this,
                args: bound_args,
            } => {
                let mut all = bound_args;
                all.extend_from_slice(args);
                self.call_function(&JsValue::Object(target), &bound_this, &all)
            }
            // any call reaching here is an indirect eval
            JsFunction::Eval => self.perform_eval(args.first(), None),
        }
    }

    pub fn call(&mut self, func: &JsValue, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
        self.call_function(func, this, args).into_result()
    }

    /// `[[Construct]]` (ES5 §13.2.2).
    pub fn construct(&mut self, func: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
        let callable = match func {
            JsValue::Object(o) => o.callable().map(|f| (o.clone(), f)),
            _ => None,
        };
        match callable {
            Some((obj, JsFunction::User { .. })) => {
                let proto = match self.get(&obj, "prototype")? {
                    JsValue::Object(p) => p,
                    _ => self.realm.object_prototype.clone(),
                };
                let instance = JsValue::Object(JsObject::new(JsObjectData::new(
                    Some(proto),
                    "Object",
                    ObjectKind::Ordinary,
                )));
                let result = self.call(func, &instance, args)?;
                Ok(if result.is_object() { result } else { instance })
            }
            Some((_, JsFunction::Native { construct: Some(ctor), .. })) => ctor(self, args).into_result(),
            Some((_, JsFunction::Bound {
                target, args: bound, ..
            })) => {
                let mut all = bound;
                all.extend_from_slice(args);
                self.construct(&JsValue::Object(target), &all)
            }
            _ => {
                let shown = self.describe(func);
                Err(self.create_type_error(&format!("{shown} is not a constructor")))
            }
        }
    }

    /// Short description of a value for error messages; never runs script.
    pub(crate) fn describe(&mut self, val: &JsValue) -> String {
        match val {
            JsValue::Object(o) => match o.callable() {
                Some(f) => format!("function {}", f.name()),
                None => format!("[object {}]", o.class_name()),
            },
            JsValue::String(s) => format!("\"{s}\""),
            _ => self.to_display_string(val),
        }
    }

    fn call_user_function(
        &mut self,
        callee: &JsObject,
        node: &Rc<FunctionNode>,
        scope: EnvRef,
        this: &JsValue,
        args: &[JsValue],
    ) -> Completion {
        let strict = node.strict;
        // ES5 §10.4.3
        let this_binding = if strict {
            this.clone()
        } else {
            match this {
                JsValue::Undefined | JsValue::Null => JsValue::Object(self.realm.global_object.clone()),
                JsValue::Object(_) => this.clone(),
                prim => match self.to_object(prim) {
                    Ok(o) => JsValue::Object(o),
                    Err(e) => return Completion::Throw(e),
                },
            }
        };
        let local = LexicalEnvironment::new_declarative(Some(scope));
        let ctx = ExecutionContext {
            lexical_environment: local.clone(),
            variable_environment: local.clone(),
            this_binding,
            strict,
            kind: ContextKind::Function,
            function_name: node.name.clone(),
        };
        let mut guard = match self.enter_context(ctx) {
            Ok(g) => g,
            Err(e) => return Completion::Throw(e),
        };
        let rented = match guard.instantiate_function_code(callee, node, &local, args) {
            Ok(r) => r,
            Err(e) => return Completion::Throw(e),
        };
        let completion = guard.exec_statements(&node.body, &local);
        if matches!(completion, Completion::Throw(_)) && guard.last_throw_stack.is_empty() {
            let stack = guard.capture_stack();
            guard.last_throw_stack = stack;
        }
        guard.function_was_called(&local, rented);
        match completion {
            Completion::Return(v) => Completion::Normal(v),
            Completion::Throw(e) => Completion::Throw(e),
            Completion::Normal(_) | Completion::Empty => Completion::Normal(JsValue::Undefined),
            Completion::Break(_) | Completion::Continue(_) => {
                debug_assert!(false, "break/continue escaped a function body");
                Completion::Normal(JsValue::Undefined)
            }
        }
    }

    /// Declaration binding instantiation for function code (ES5 §10.5).
    /// Returns the rented arguments object, if one was reserved.
    fn instantiate_function_code(
        &mut self,
        callee: &JsObject,
        node: &Rc<FunctionNode>,
        env: &EnvRef,
        args: &[JsValue],
    ) -> Result<Option<JsObject>, JsValue> {
        let shadowed = node.params.iter().any(|p| p == "arguments")
            || node
                .hoisting
                .function_declarations
                .iter()
                .any(|f| f.name.as_deref() == Some("arguments"));
        let rented = (!shadowed).then(|| self.rent_arguments(callee, node, env, args));
        if let Some(d) = env.declarative() {
            let result = d
                .borrow_mut()
                .add_function_parameters(&node.params, args, rented.clone().map(JsValue::Object));
            result.map_err(|e| self.binding_error(e, "arguments"))?;
        }
        self.instantiate_hoisting(env, env, &node.hoisting, false, node.strict)?;
        Ok(rented)
    }

    /// Binds hoisted function declarations, `var` names and top-level
    /// lexical names. Function declarations overwrite earlier bindings,
    /// `var`s never do.
    pub(crate) fn instantiate_hoisting(
        &mut self,
        var_env: &EnvRef,
        lex_env: &EnvRef,
        hoisting: &HoistingScope,
        configurable: bool,
        strict: bool,
    ) -> Result<(), JsValue> {
        for f in &hoisting.function_declarations {
            let Some(name) = f.name.as_deref() else {
                continue;
            };
            let closure = self.create_function_object(f.clone(), var_env.clone());
            if !var_env.has_binding(name) {
                self.create_mutable_binding(var_env, name, configurable)?;
            } else if Rc::ptr_eq(var_env, &self.global_env) {
                self.redefine_global_function(name, configurable)?;
            }
            self.set_mutable_binding(var_env, name, JsValue::Object(closure), strict)?;
        }
        self.add_variable_declarations(var_env, &hoisting.var_names, configurable)?;
        for (name, is_const) in &hoisting.lexical_declarations {
            self.create_lexical_binding(lex_env, name, *is_const);
        }
        Ok(())
    }

    // ES5.1 §10.5 step 5.e
    fn redefine_global_function(&mut self, name: &str, configurable: bool) -> Result<(), JsValue> {
        let global = self.realm.global_object.clone();
        let Some(existing) = global.get_property(name) else {
            return Ok(());
        };
        if existing.configurable() {
            let desc = PropertyDescriptor::data(JsValue::Undefined, true, true, configurable);
            self.define_own_property(&global, name, desc, true)?;
        } else if existing.is_accessor_descriptor() || !(existing.writable() && existing.enumerable()) {
            return Err(self.create_type_error(&format!("Cannot redefine global function '{name}'")));
        }
        Ok(())
    }

    fn rent_arguments(&mut self, callee: &JsObject, node: &Rc<FunctionNode>, env: &EnvRef, args: &[JsValue]) -> JsObject {
        let obj = match self.arguments_pool.objects.pop() {
            Some(o) => {
                debug!(pooled = self.arguments_pool.len(), "rent pooled arguments object");
                o
            }
            None => JsObject::new(JsObjectData::new(
                Some(self.realm.object_prototype.clone()),
                "Arguments",
                ObjectKind::Arguments(Box::default()),
            )),
        };
        {
            let mut o = obj.borrow_mut();
            if let ObjectKind::Arguments(data) = &mut o.kind {
                data.callee = Some(callee.clone());
                data.node = Some(node.clone());
                data.args.extend_from_slice(args);
                data.env = Some(env.clone());
                data.strict = node.strict;
                data.thrower = Some(self.realm.throw_type_error.clone());
            }
        }
        obj
    }

    /// Call exit: an arguments object nobody observed goes back to the pool;
    /// one that was observed is made independent of the call.
    pub(crate) fn function_was_called(&mut self, env: &EnvRef, rented: Option<JsObject>) {
        let (Some(obj), Some(decl)) = (rented, env.declarative()) else {
            return;
        };
        let access = decl.borrow().arguments_access();
        let (initialized, has_args) = match &obj.borrow().kind {
            ObjectKind::Arguments(d) => (d.initialized, !d.args.is_empty()),
            _ => (true, false),
        };
        if !initialized && access == ArgumentsAccess::NotAccessed {
            let still_bound = decl
                .borrow()
                .arguments_value()
                .is_some_and(|v| matches!(v, JsValue::Object(o) if o.ptr_eq(&obj)));
            if still_bound {
                decl.borrow_mut().clear_arguments();
            }
            self.give_back_arguments(obj);
        } else if access != ArgumentsAccess::Persisted && has_args {
            obj.borrow_mut().ensure_initialized();
            decl.borrow_mut().set_arguments_access(ArgumentsAccess::Persisted);
            debug!("persist arguments object");
        }
    }

    fn give_back_arguments(&mut self, obj: JsObject) {
        if self.arguments_pool.objects.len() >= POOL_CAPACITY {
            return;
        }
        {
            let mut o = obj.borrow_mut();
            o.properties.clear();
            o.extensible = true;
            o.prototype = Some(self.realm.object_prototype.clone());
            if let ObjectKind::Arguments(data) = &mut o.kind {
                let mut args = std::mem::take(&mut data.args);
                args.clear();
                let mapped = std::mem::take(&mut data.mapped);
                **data = ArgumentsData {
                    args,
                    mapped: Vec::with_capacity(mapped.capacity()),
                    ..ArgumentsData::default()
                };
            }
        }
        self.arguments_pool.objects.push(obj);
        debug!(pooled = self.arguments_pool.len(), "return arguments object to pool");
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
    fn unobserved_arguments_return_to_pool() {
        let mut interp = Interpreter::new();
        interp.execute("function f(a, b) { return a + b; }").unwrap();
        assert_eq!(interp.arguments_pool.len(), 0);
        interp.execute("f(1, 2)").unwrap();
        assert_eq!(interp.arguments_pool.len(), 1);
        assert_eq!(interp.execute("f(3, 4)").unwrap(), JsValue::Number(7.0));
        assert_eq!(interp.arguments_pool.len(), 1);
    }

    #[test]
    fn pooled_object_does_not_leak_state() {
        let v = run(
            "function quiet(a) { return a; } \
             function loud() { return arguments.length + ':' + arguments[0]; } \
             quiet(1); quiet(2, 3, 4); loud('x')",
        );
        assert_eq!(v, JsValue::string("1:x"));
    }

    #[test]
    fn escaped_arguments_survive_the_call() {
        let v = run(
            "function outer(a, b) { var args = arguments; return function () { return args[0] + args[1]; }; } \
             var g = outer(1, 2); outer(5, 6); g()",
        );
        assert_eq!(v, JsValue::Number(3.0));
    }

    #[test]
    fn observed_arguments_are_not_pooled() {
        let mut interp = Interpreter::new();
        interp
            .execute("var keep; function f() { keep = arguments; } f(1, 2);")
            .unwrap();
        assert_eq!(interp.arguments_pool.len(), 0);
        assert_eq!(interp.execute("keep[1]").unwrap(), JsValue::Number(2.0));
    }

    #[test]
    fn sloppy_arguments_alias_parameters() {
        assert_eq!(run("function f(a) { arguments[0] = 9; return a; } f(1)"), JsValue::Number(9.0));
        assert_eq!(run("function f(a) { a = 5; return arguments[0]; } f(1)"), JsValue::Number(5.0));
        assert_eq!(
            run("function f(a) { delete arguments[0]; arguments[0] = 2; return a; } f(1)"),
            JsValue::Number(1.0)
        );
    }

    #[test]
    fn strict_arguments_do_not_alias() {
        assert_eq!(
            run("function f(a) { 'use strict'; arguments[0] = 9; return a; } f(1)"),
            JsValue::Number(1.0)
        );
        assert_eq!(
            run("function f() { 'use strict'; try { return arguments.callee; } catch (e) { return e instanceof TypeError; } } f()"),
            JsValue::Boolean(true)
        );
    }

    #[test]
    fn arguments_object_shape() {
        assert_eq!(
            run("function f() { return Object.prototype.toString.call(arguments) + arguments.length; } f(1, 2, 3)"),
            JsValue::string("[object Arguments]3")
        );
        assert_eq!(run("function f() { return arguments.callee === f; } f()"), JsValue::Boolean(true));
    }

    #[test]
    fn parameter_named_arguments_shadows_object() {
        assert_eq!(run("function f(arguments) { return arguments; } f(4)"), JsValue::Number(4.0));
        assert_eq!(
            run("function f() { function arguments() { return 1; } return typeof arguments; } f()"),
            JsValue::string("function")
        );
    }

    #[test]
    fn var_does_not_clobber_parameter() {
        assert_eq!(run("function f(a) { var a; return a; } f(3)"), JsValue::Number(3.0));
        assert_eq!(run("function f(a) { function a() {} return typeof a; } f(3)"), JsValue::string("function"));
    }

    #[test]
    fn this_binding_rules() {
        assert_eq!(run("function f() { return this; } f() === this"), JsValue::Boolean(true));
        assert_eq!(
            run("function f() { 'use strict'; return this; } f() === undefined"),
            JsValue::Boolean(true)
        );
        assert_eq!(
            run("function f() { return typeof this; } f.call(5)"),
            JsValue::string("object")
        );
        assert_eq!(
            run("function f() { 'use strict'; return typeof this; } f.call(5)"),
            JsValue::string("number")
        );
    }

    #[test]
    fn construct_uses_prototype_property() {
        assert_eq!(
            run("function P(x) { this.x = x; } P.prototype.get = function () { return this.x; }; new P(4).get()"),
            JsValue::Number(4.0)
        );
        assert_eq!(
            run("function P() { return { y: 1 }; } new P().y"),
            JsValue::Number(1.0)
        );
        assert_eq!(
            run("try { new Math_not_here(); } catch (e) { e instanceof ReferenceError }"),
            JsValue::Boolean(true)
        );
        assert_eq!(
            run("try { new isNaN(); } catch (e) { e instanceof TypeError }"),
            JsValue::Boolean(true)
        );
    }

    #[test]
    fn function_slots() {
        assert_eq!(run("function f(a, b) {} f.length"), JsValue::Number(2.0));
        assert_eq!(run("function f() {} f.name"), JsValue::string("f"));
        assert_eq!(
            run("function f() {} Object.getOwnPropertyNames(f).join()"),
            JsValue::string("prototype,length,name")
        );
        assert_eq!(
            run("function f() {} f.prototype.constructor === f"),
            JsValue::Boolean(true)
        );
        assert_eq!(
            run("function f() {} f.length = 5; f.length"),
            JsValue::Number(0.0)
        );
    }

    #[test]
    fn strict_function_caller_is_poisoned() {
        assert_eq!(
            run("function f() { 'use strict'; } try { f.caller; 'no' } catch (e) { e instanceof TypeError }"),
            JsValue::Boolean(true)
        );
    }

    #[test]
    fn named_function_expression_binds_own_name() {
        assert_eq!(
            run("var f = function fact(n) { return n <= 1 ? 1 : n * fact(n - 1); }; f(5)"),
            JsValue::Number(120.0)
        );
        assert_eq!(run("var g = function h() {}; typeof h"), JsValue::string("undefined"));
    }

    #[test]
    fn throw_escapes_function_and_skips_siblings() {
        assert_eq!(
            run("var after = false; function f() { { throw 1; } after = true; } \
                 try { f(); } catch (e) { e + ':' + after }"),
            JsValue::string("1:false")
        );
    }

    #[test]
    fn calling_non_callable_is_type_error() {
        assert_eq!(
            run("try { (1)(); } catch (e) { e instanceof TypeError }"),
            JsValue::Boolean(true)
        );
    }
}
