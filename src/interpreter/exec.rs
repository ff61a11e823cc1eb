use super::Interpreter;
use super::environment::{EnvRef, LexicalEnvironment};
use super::helpers::{strict_equality, to_boolean};
use super::types::Completion;
use crate::ast::*;
use crate::types::{JsValue, is_symbol_key, property_key_name};
use rustc_hash::FxHashSet;
use std::rc::Rc;
use tracing::info;

/// Unwraps a `Result`, turning an error into a throw completion.
macro_rules! complete {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => return Completion::Throw(e),
        }
    };
}

// ES5 §12.6 LoopContinues
fn loop_continues(completion: &Completion, labels: &[String]) -> bool {
    match completion {
        Completion::Normal(_) | Completion::Empty | Completion::Continue(None) => true,
        Completion::Continue(Some(l)) => labels.contains(l),
        _ => false,
    }
}

/// Folds a body completion into the running loop value.
fn track(value: &mut Option<JsValue>, completion: &Completion) {
    if let Completion::Normal(v) = completion {
        *value = Some(v.clone());
    }
}

fn loop_exit(completion: Completion, value: Option<JsValue>) -> Completion {
    match completion {
        Completion::Break(None) => value.map_or(Completion::Empty, Completion::Normal),
        other => other.update_empty(&value),
    }
}

fn finish(value: Option<JsValue>) -> Completion {
    value.map_or(Completion::Empty, Completion::Normal)
}

impl Interpreter {
    /// Runs a statement list, producing the value of the last statement that
    /// produced one.
    pub(crate) fn exec_statements(&mut self, stmts: &[Statement], env: &EnvRef) -> Completion {
        let mut last = None;
        for stmt in stmts {
            match self.exec_statement(stmt, env) {
                Completion::Normal(v) => last = Some(v),
                Completion::Empty => {}
                abrupt => return abrupt.update_empty(&last),
            }
        }
        finish(last)
    }

    pub(crate) fn exec_statement(&mut self, stmt: &Statement, env: &EnvRef) -> Completion {
        complete!(self.check_statement_limits());
        match stmt {
            Statement::Empty => Completion::Empty,
            Statement::Expression(expr) => self.eval_expr(expr, env).into(),
            Statement::Block(block) => self.exec_block(block, env),
            Statement::Variable(decl) => self.exec_variable_declaration(decl, env),
            Statement::If(if_stmt) => {
                let test = complete!(self.eval_expr(&if_stmt.test, env));
                let completion = if to_boolean(&test) {
                    self.exec_statement(&if_stmt.consequent, env)
                } else if let Some(alt) = &if_stmt.alternate {
                    self.exec_statement(alt, env)
                } else {
                    Completion::Empty
                };
                completion.update_empty(&Some(JsValue::Undefined))
            }
            Statement::While(_) | Statement::DoWhile(_) | Statement::For(_) | Statement::ForIn(_) => {
                self.exec_iteration(stmt, &[], env)
            }
            Statement::Return(expr) => {
                let val = match expr {
                    Some(e) => complete!(self.eval_expr(e, env)),
                    None => JsValue::Undefined,
                };
                Completion::Return(val)
            }
            Statement::Break(label) => Completion::Break(label.clone()),
            Statement::Continue(label) => Completion::Continue(label.clone()),
            Statement::Throw(expr) => {
                let val = complete!(self.eval_expr(expr, env));
                self.last_throw_stack = self.capture_stack();
                Completion::Throw(val)
            }
            Statement::Try(t) => self.exec_try(t, env),
            Statement::Switch(s) => self.exec_switch(s, env),
            Statement::Labeled(..) => {
                let mut labels = Vec::new();
                let mut inner = stmt;
                while let Statement::Labeled(label, body) = inner {
                    labels.push(label.clone());
                    inner = body;
                }
                let completion = match inner {
                    Statement::While(_) | Statement::DoWhile(_) | Statement::For(_) | Statement::ForIn(_) => {
                        self.exec_iteration(inner, &labels, env)
                    }
                    _ => self.exec_statement(inner, env),
                };
                match completion {
                    Completion::Break(Some(l)) if labels.contains(&l) => Completion::Empty,
                    other => other,
                }
            }
            Statement::With(expr, body) => {
                let val = complete!(self.eval_expr(expr, env));
                let obj = complete!(self.to_object(&val));
                let with_env = LexicalEnvironment::new_object(obj, true, Some(env.clone()));
                self.exec_statement(body, &with_env)
            }
            Statement::Debugger => {
                if self.options.allow_debugger_statement {
                    info!(depth = self.contexts.len(), "debugger statement");
                }
                Completion::Empty
            }
            Statement::FunctionDeclaration(node) => self.exec_function_declaration(node, env),
        }
    }

    /// Function declarations are bound during instantiation; reaching one
    /// inside a block of sloppy code also publishes it to the variable
    /// environment.
    fn exec_function_declaration(&mut self, node: &Rc<FunctionNode>, env: &EnvRef) -> Completion {
        let Some(name) = node.name.as_deref() else {
            return Completion::Empty;
        };
        let var_env = self.variable_environment();
        if self.is_strict() || Rc::ptr_eq(env, &var_env) {
            return Completion::Empty;
        }
        let Some(found) = self.resolve_binding(env, name) else {
            return Completion::Empty;
        };
        if Rc::ptr_eq(&found, &var_env) {
            return Completion::Empty;
        }
        let value = complete!(self.get_binding_value(&found, name, false));
        complete!(self.set_mutable_binding(&var_env, name, value, false));
        Completion::Empty
    }

    fn exec_block(&mut self, block: &Block, env: &EnvRef) -> Completion {
        if block.is_scope_free() {
            return self.exec_statements(&block.body, env);
        }
        let block_env = LexicalEnvironment::new_declarative(Some(env.clone()));
        for (name, is_const) in &block.lexical_declarations {
            self.create_lexical_binding(&block_env, name, *is_const);
        }
        for f in &block.function_declarations {
            let Some(name) = f.name.as_deref() else {
                continue;
            };
            let closure = self.create_function_object(f.clone(), block_env.clone());
            if let Some(d) = block_env.declarative() {
                let mut d = d.borrow_mut();
                d.create_mutable_binding(name, false);
                d.initialize_binding(name, JsValue::Object(closure));
            }
        }
        self.exec_statements(&block.body, &block_env)
    }

    fn exec_variable_declaration(&mut self, decl: &VariableDeclaration, env: &EnvRef) -> Completion {
        for d in &decl.declarations {
            match decl.kind {
                VarKind::Var => {
                    // ES5 §12.2: only declarators with an initialiser do anything
                    let Some(init) = &d.init else {
                        continue;
                    };
                    let reference = complete!(self.eval_reference(&Expression::Identifier(d.name.clone()), env));
                    let value = complete!(self.eval_expr(init, env));
                    complete!(self.put_value(&reference, value));
                }
                VarKind::Let | VarKind::Const => {
                    let value = match &d.init {
                        Some(init) => complete!(self.eval_expr(init, env)),
                        None => JsValue::Undefined,
                    };
                    complete!(self.initialize_binding(env, &d.name, value));
                }
            }
        }
        Completion::Empty
    }

    fn exec_iteration(&mut self, stmt: &Statement, labels: &[String], env: &EnvRef) -> Completion {
        match stmt {
            Statement::While(w) => self.exec_while(w, labels, env),
            Statement::DoWhile(dw) => self.exec_do_while(dw, labels, env),
            Statement::For(f) => self.exec_for(f, labels, env),
            Statement::ForIn(fi) => self.exec_for_in(fi, labels, env),
            _ => self.exec_statement(stmt, env),
        }
    }

    fn exec_while(&mut self, w: &WhileStatement, labels: &[String], env: &EnvRef) -> Completion {
        let mut value = None;
        loop {
            let test = complete!(self.eval_expr(&w.test, env));
            if !to_boolean(&test) {
                return finish(value);
            }
            let completion = self.exec_statement(&w.body, env);
            track(&mut value, &completion);
            if !loop_continues(&completion, labels) {
                return loop_exit(completion, value);
            }
        }
    }

    fn exec_do_while(&mut self, dw: &DoWhileStatement, labels: &[String], env: &EnvRef) -> Completion {
        let mut value = None;
        loop {
            let completion = self.exec_statement(&dw.body, env);
            track(&mut value, &completion);
            if !loop_continues(&completion, labels) {
                return loop_exit(completion, value);
            }
            let test = complete!(self.eval_expr(&dw.test, env));
            if !to_boolean(&test) {
                return finish(value);
            }
        }
    }

    fn exec_for(&mut self, f: &ForStatement, labels: &[String], env: &EnvRef) -> Completion {
        let mut loop_env = env.clone();
        match &f.init {
            Some(ForInit::Variable(decl)) => {
                if decl.kind != VarKind::Var {
                    loop_env = LexicalEnvironment::new_declarative(Some(env.clone()));
                    for d in &decl.declarations {
                        self.create_lexical_binding(&loop_env, &d.name, decl.kind == VarKind::Const);
                    }
                }
                let completion = self.exec_variable_declaration(decl, &loop_env);
                if completion.is_abrupt() {
                    return completion;
                }
            }
            Some(ForInit::Expression(e)) => {
                complete!(self.eval_expr(e, env));
            }
            None => {}
        }
        let mut value = None;
        loop {
            if let Some(test) = &f.test {
                let t = complete!(self.eval_expr(test, &loop_env));
                if !to_boolean(&t) {
                    return finish(value);
                }
            }
            let completion = self.exec_statement(&f.body, &loop_env);
            track(&mut value, &completion);
            if !loop_continues(&completion, labels) {
                return loop_exit(completion, value);
            }
            if let Some(update) = &f.update {
                complete!(self.eval_expr(update, &loop_env));
            }
        }
    }

    // ES5 §12.6.4
    fn exec_for_in(&mut self, fi: &ForInStatement, labels: &[String], env: &EnvRef) -> Completion {
        if let ForInLeft::Variable(decl) = &fi.left
            && decl.kind == VarKind::Var
        {
            let completion = self.exec_variable_declaration(decl, env);
            if completion.is_abrupt() {
                return completion;
            }
        }
        let subject = complete!(self.eval_expr(&fi.right, env));
        if subject.is_nullish() {
            return Completion::Empty;
        }
        let obj = complete!(self.to_object(&subject));

        let mut value = None;
        let mut visited = FxHashSet::default();
        let mut current = Some(obj);
        while let Some(o) = current {
            for key in o.own_keys() {
                if is_symbol_key(&key) || !visited.insert(key.clone()) {
                    continue;
                }
                // deleted or made non-enumerable by an earlier iteration
                if !o.get_own_property(&key).is_some_and(|d| d.enumerable()) {
                    continue;
                }
                let iter_env = complete!(self.bind_for_in_target(&fi.left, JsValue::string(property_key_name(&key)), env));
                let completion = self.exec_statement(&fi.body, &iter_env);
                track(&mut value, &completion);
                if !loop_continues(&completion, labels) {
                    return loop_exit(completion, value);
                }
            }
            current = o.prototype();
        }
        finish(value)
    }

    /// Assigns the next for-in key, returning the environment the body runs in.
    fn bind_for_in_target(&mut self, left: &ForInLeft, key: JsValue, env: &EnvRef) -> Result<EnvRef, JsValue> {
        match left {
            ForInLeft::Variable(decl) => {
                let Some(d) = decl.declarations.first() else {
                    return Ok(env.clone());
                };
                if decl.kind == VarKind::Var {
                    let reference = self.eval_reference(&Expression::Identifier(d.name.clone()), env)?;
                    self.put_value(&reference, key)?;
                    return Ok(env.clone());
                }
                let iter_env = LexicalEnvironment::new_declarative(Some(env.clone()));
                self.create_lexical_binding(&iter_env, &d.name, decl.kind == VarKind::Const);
                self.initialize_binding(&iter_env, &d.name, key)?;
                Ok(iter_env)
            }
            ForInLeft::Expression(target) => {
                let reference = self.eval_reference(target, env)?;
                self.put_value(&reference, key)?;
                Ok(env.clone())
            }
        }
    }

    // ES5 §12.14
    fn exec_try(&mut self, t: &TryStatement, env: &EnvRef) -> Completion {
        let mut completion = self.exec_block(&t.block, env);
        if let (Completion::Throw(thrown), Some(handler)) = (&completion, &t.handler)
            && self.pending_fatal.is_none()
        {
            let thrown = thrown.clone();
            self.last_throw_stack.clear();
            let catch_env = LexicalEnvironment::new_declarative(Some(env.clone()));
            if let Some(d) = catch_env.declarative() {
                let mut d = d.borrow_mut();
                d.create_mutable_binding(&handler.param, false);
                d.initialize_binding(&handler.param, thrown);
            }
            completion = self.exec_block(&handler.body, &catch_env);
        }
        if let Some(finalizer) = &t.finalizer {
            let fin = self.exec_block(finalizer, env);
            if fin.is_abrupt() {
                return fin;
            }
        }
        completion
    }

    // ES5 §12.11
    fn exec_switch(&mut self, s: &SwitchStatement, env: &EnvRef) -> Completion {
        let discriminant = complete!(self.eval_expr(&s.discriminant, env));
        let case_env = if s.lexical_declarations.is_empty() {
            env.clone()
        } else {
            let block_env = LexicalEnvironment::new_declarative(Some(env.clone()));
            for (name, is_const) in &s.lexical_declarations {
                self.create_lexical_binding(&block_env, name, *is_const);
            }
            block_env
        };
        let mut start = None;
        for (i, case) in s.cases.iter().enumerate() {
            if let Some(test) = &case.test {
                let v = complete!(self.eval_expr(test, &case_env));
                if strict_equality(&discriminant, &v) {
                    start = Some(i);
                    break;
                }
            }
        }
        let Some(start) = start.or_else(|| s.cases.iter().position(|c| c.test.is_none())) else {
            return Completion::Empty;
        };
        let mut value = None;
        for case in &s.cases[start..] {
            let completion = self.exec_statements(&case.consequent, &case_env);
            track(&mut value, &completion);
            match completion {
                Completion::Normal(_) | Completion::Empty => {}
                Completion::Break(None) => return finish(value),
                abrupt => return abrupt.update_empty(&value),
            }
        }
        finish(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JsError;
    use crate::options::Options;
    use std::time::Duration;

    fn run(src: &str) -> JsValue {
        let mut interp = Interpreter::new();
        match interp.execute(src) {
            Ok(v) => v,
            Err(e) => panic!("script failed: {e}"),
        }
    }

    #[test]
    fn completion_values() {
        assert_eq!(run("1; var x = 2;"), JsValue::Number(1.0));
        assert_eq!(run("3; ;"), JsValue::Number(3.0));
        assert_eq!(run("if (false) 1;"), JsValue::Undefined);
        assert_eq!(run("var i = 0; while (i < 3) { i++; }"), JsValue::Number(2.0));
        assert_eq!(run("2; do { 5; } while (false)"), JsValue::Number(5.0));
    }

    #[test]
    fn labeled_continue_and_break() {
        assert_eq!(
            run("var n = 0; outer: for (var i = 0; i < 3; i++) { for (var j = 0; j < 3; j++) { if (j == 1) continue outer; n++; } } n"),
            JsValue::Number(3.0)
        );
        assert_eq!(
            run("var n = 0; outer: while (true) { while (true) { n++; break outer; } } n"),
            JsValue::Number(1.0)
        );
        assert_eq!(
            run("var r = 'a'; block: { r += 'b'; break block; r += 'c'; } r"),
            JsValue::string("ab")
        );
    }

    #[test]
    fn for_in_enumeration() {
        assert_eq!(
            run("var o = { a: 1, b: 2 }; var s = ''; for (var k in o) s += k; s"),
            JsValue::string("ab")
        );
        assert_eq!(
            run("var p = { inherited: 1, shadow: 1 }; var o = Object.create(p); \
                 Object.defineProperty(o, 'shadow', { value: 2, enumerable: false }); o.own = 1; \
                 var s = []; for (var k in o) s.push(k); s.join()"),
            JsValue::string("own,inherited")
        );
        assert_eq!(
            run("var o = { a: 1, b: 2, c: 3 }; var s = ''; for (var k in o) { delete o.c; s += k; } s"),
            JsValue::string("ab")
        );
        assert_eq!(run("var n = 0; for (var k in null) n++; n"), JsValue::Number(0.0));
        assert_eq!(
            run("var s = ''; for (var k in 'ab') s += k; s"),
            JsValue::string("01")
        );
        assert_eq!(
            run("var s = []; for (var k in [7, 8]) s.push(typeof k); s.join()"),
            JsValue::string("string,string")
        );
    }

    #[test]
    fn switch_fallthrough_and_default() {
        assert_eq!(
            run("var s = ''; switch (2) { case 1: s += '1'; case 2: s += '2'; case 3: s += '3'; break; default: s += 'd'; } s"),
            JsValue::string("23")
        );
        assert_eq!(
            run("var s = ''; switch (9) { case 1: s += '1'; default: s += 'd'; case 2: s += '2'; } s"),
            JsValue::string("d2")
        );
        assert_eq!(run("switch ('1') { case 1: 'loose'; break; default: 'strict'; }"), JsValue::string("strict"));
    }

    #[test]
    fn try_catch_finally() {
        assert_eq!(
            run("var log = ''; try { throw 'x'; } catch (e) { log += e; } finally { log += 'f'; } log"),
            JsValue::string("xf")
        );
        assert_eq!(
            run("function f() { try { return 1; } finally { return 2; } } f()"),
            JsValue::Number(2.0)
        );
        assert_eq!(
            run("var e = 'outer'; try { throw 'inner'; } catch (e) { } e"),
            JsValue::string("outer")
        );
        assert_eq!(
            run("function f() { for (;;) { try { break; } finally { return 'fin'; } } } f()"),
            JsValue::string("fin")
        );
    }

    #[test]
    fn with_statement_scopes_lookups() {
        assert_eq!(run("var o = { x: 1 }; var x = 2; with (o) { x }"), JsValue::Number(1.0));
        assert_eq!(run("var o = { x: 1 }; with (o) { x = 5; } o.x"), JsValue::Number(5.0));
        assert_eq!(run("var o = {}; with (o) { var y = 3; } y"), JsValue::Number(3.0));
    }

    #[test]
    fn let_and_const_are_block_scoped() {
        assert_eq!(run("var r; { let x = 1; r = x; } typeof x + r"), JsValue::string("undefined1"));
        assert_eq!(run("const c = 4; c"), JsValue::Number(4.0));
        assert_eq!(run("const c = 4; c = 5; c"), JsValue::Number(4.0));
        assert_eq!(
            run("'use strict'; const c = 4; try { c = 5; } catch (e) { e instanceof TypeError }"),
            JsValue::Boolean(true)
        );
        assert_eq!(
            run("var s = 0; for (let i = 0; i < 3; i++) { s += i; } typeof i + s"),
            JsValue::string("undefined3")
        );
    }

    #[test]
    fn block_functions_hoist_in_sloppy_code() {
        assert_eq!(run("{ function inner() { return 1; } } inner()"), JsValue::Number(1.0));
        assert_eq!(
            run("'use strict'; { function inner2() {} } typeof inner2"),
            JsValue::string("undefined")
        );
    }

    #[test]
    fn statement_budget_is_not_catchable() {
        let mut interp = Interpreter::with_options(Options::new().max_statements(50));
        let err = interp
            .execute("try { while (true) {} } catch (e) { 'caught' }")
            .unwrap_err();
        assert!(matches!(err, JsError::StatementsCountOverflow { limit: 50 }));
        assert_eq!(interp.execute("1 + 1").unwrap(), JsValue::Number(2.0));
    }

    #[test]
    fn timeout_aborts_loop() {
        let mut interp = Interpreter::with_options(Options::new().timeout_interval(Duration::from_millis(20)));
        let err = interp.execute("for (;;) {}").unwrap_err();
        assert!(matches!(err, JsError::Timeout(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn recursion_limit_is_not_catchable() {
        let mut interp = Interpreter::with_options(Options::new().limit_recursion(20));
        let err = interp
            .execute("function r() { try { return r(); } catch (e) { return 'caught'; } } r()")
            .unwrap_err();
        assert!(matches!(err, JsError::RecursionDepthOverflow { depth: 20, .. }));
        assert!(interp.contexts.is_empty());
    }

    #[test]
    fn unbounded_recursion_stops_at_default_depth() {
        let mut interp = Interpreter::new();
        let err = interp.execute("function down(n) { return down(n + 1); } down(0)").unwrap_err();
        assert!(matches!(
            err,
            JsError::RecursionDepthOverflow { depth, ref callee }
                if depth == crate::options::DEFAULT_RECURSION_DEPTH && callee == "down"
        ));
        assert_eq!(interp.execute("function up(n) { return n ? up(n - 1) + 1 : 0; } up(100)").unwrap(), JsValue::Number(100.0));
    }

    #[test]
    fn debugger_statement_is_a_no_op() {
        assert_eq!(run("1; debugger;"), JsValue::Number(1.0));
        let mut interp = Interpreter::with_options(Options::new().allow_debugger_statement(true));
        assert_eq!(interp.execute("debugger; 2").unwrap(), JsValue::Number(2.0));
    }

    #[test]
    fn uncaught_throw_reports_value_and_stack() {
        let mut interp = Interpreter::new();
        let err = interp
            .execute("function inner() { throw new TypeError('bad'); } function outer() { inner(); } outer()")
            .unwrap_err();
        assert_eq!(err.to_string(), "TypeError: bad");
        let JsError::Thrown(thrown) = &err else {
            panic!("expected a thrown value");
        };
        let names: Vec<_> = thrown.stack.iter().map(|f| f.function_name.as_str()).collect();
        assert_eq!(names, ["inner", "outer"]);
    }
}
