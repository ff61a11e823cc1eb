use super::Interpreter;
use super::context::{ContextKind, ExecutionContext};
use super::environment::{EnvRef, LexicalEnvironment};
use super::types::Completion;
use crate::parser::{self, ParseError, ParseErrorKind};
use crate::types::JsValue;
use tracing::debug;

impl Interpreter {
    /// Early errors raised at run time by `eval` and `Function`.
    pub(crate) fn parse_error_value(&mut self, e: &ParseError) -> JsValue {
        match e.kind {
            ParseErrorKind::InvalidLeftHandSide => self.create_reference_error(&e.message),
            ParseErrorKind::Syntax => self.create_error("SyntaxError", &e.message),
        }
    }

    /// The `eval` function (ES5 §15.1.2.1). `direct_env` carries the
    /// caller's lexical environment for a direct call.
    pub(crate) fn perform_eval(&mut self, arg: Option<&JsValue>, direct_env: Option<&EnvRef>) -> Completion {
        let Some(JsValue::String(source)) = arg else {
            return Completion::Normal(arg.cloned().unwrap_or(JsValue::Undefined));
        };
        let direct = direct_env.is_some();
        let caller_strict = direct && self.is_strict();
        let program = match parser::parse_program(&source.to_rust_string(), caller_strict) {
            Ok(p) => p,
            Err(e) => return Completion::Throw(self.parse_error_value(&e)),
        };
        let strict = program.strict || caller_strict || (!direct && self.options.strict);
        debug!(direct, strict, "enter eval code");

        // §10.4.2
        let (mut lex_env, mut var_env, this_binding) = match direct_env {
            Some(env) => (env.clone(), self.variable_environment(), self.this_binding()),
            None => (
                self.global_env.clone(),
                self.global_env.clone(),
                JsValue::Object(self.realm.global_object.clone()),
            ),
        };
        if strict {
            let local = LexicalEnvironment::new_declarative(Some(lex_env));
            lex_env = local.clone();
            var_env = local;
        } else if !program.hoisting.lexical_declarations.is_empty() {
            lex_env = LexicalEnvironment::new_declarative(Some(lex_env));
        }

        let ctx = ExecutionContext {
            lexical_environment: lex_env.clone(),
            variable_environment: var_env.clone(),
            this_binding,
            strict,
            kind: ContextKind::Eval,
            function_name: None,
        };
        let mut guard = match self.enter_context(ctx) {
            Ok(g) => g,
            Err(e) => return Completion::Throw(e),
        };
        if let Err(e) = guard.instantiate_hoisting(&var_env, &lex_env, &program.hoisting, true, strict) {
            return Completion::Throw(e);
        }
        match guard.exec_statements(&program.body, &lex_env) {
            Completion::Empty => Completion::Normal(JsValue::Undefined),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;

    fn run(src: &str) -> JsValue {
        let mut interp = Interpreter::new();
        match interp.execute(src) {
            Ok(v) => v,
            Err(e) => panic!("script failed: {e}"),
        }
    }

    #[test]
    fn non_string_argument_is_returned() {
        assert_eq!(run("eval(42)"), JsValue::Number(42.0));
        assert_eq!(run("var o = {}; eval(o) === o"), JsValue::Boolean(true));
        assert_eq!(run("eval()"), JsValue::Undefined);
    }

    #[test]
    fn completion_value_of_eval_code() {
        assert_eq!(run("eval('1; 2; if (true) { 3; }')"), JsValue::Number(3.0));
        assert_eq!(run("eval('var x = 1;')"), JsValue::Undefined);
    }

    #[test]
    fn direct_eval_sees_caller_scope() {
        assert_eq!(
            run("function f() { var local = 5; return eval('local + 1'); } f()"),
            JsValue::Number(6.0)
        );
        assert_eq!(
            run("function f() { eval('var added = 2'); return added; } f()"),
            JsValue::Number(2.0)
        );
    }

    #[test]
    fn indirect_eval_uses_global_scope() {
        assert_eq!(
            run("var x = 'global'; function f() { var x = 'local'; var e = eval; return e('x'); } f()"),
            JsValue::string("global")
        );
        assert_eq!(
            run("var x = 'global'; function f() { var x = 'local'; return (0, eval)('x'); } f()"),
            JsValue::string("global")
        );
    }

    #[test]
    fn eval_vars_are_deletable() {
        assert_eq!(
            run("eval('var gone = 1'); delete gone"),
            JsValue::Boolean(true)
        );
        assert_eq!(run("var kept = 1; delete kept"), JsValue::Boolean(false));
    }

    #[test]
    fn strict_eval_keeps_vars_local() {
        assert_eq!(
            run("eval('\"use strict\"; var inner = 1'); typeof inner"),
            JsValue::string("undefined")
        );
        assert_eq!(
            run("function f() { 'use strict'; eval('var y = 1'); return typeof y; } f()"),
            JsValue::string("undefined")
        );
    }

    #[test]
    fn strict_indirect_eval_from_options() {
        let mut interp = Interpreter::with_options(Options::new().strict(true));
        let v = interp
            .execute("(0, eval)('var fromEval = 3'); typeof fromEval")
            .unwrap();
        assert_eq!(v, JsValue::string("undefined"));
    }

    #[test]
    fn parse_errors_map_to_error_kinds() {
        assert_eq!(
            run("try { eval('var +'); } catch (e) { e instanceof SyntaxError }"),
            JsValue::Boolean(true)
        );
        assert_eq!(
            run("try { eval('1 = 2'); } catch (e) { e instanceof ReferenceError }"),
            JsValue::Boolean(true)
        );
    }

    #[test]
    fn direct_eval_this_is_callers_this() {
        assert_eq!(
            run("var o = { m: function () { return eval('this'); } }; o.m() === o"),
            JsValue::Boolean(true)
        );
    }

    #[test]
    fn eval_function_shape() {
        assert_eq!(run("eval.length"), JsValue::Number(1.0));
        assert_eq!(run("typeof eval"), JsValue::string("function"));
        assert_eq!(
            run("try { new eval('1'); } catch (e) { e instanceof TypeError }"),
            JsValue::Boolean(true)
        );
    }
}
