use super::Interpreter;
use super::environment::EnvRef;
use crate::error::{JsError, StackFrame};
use crate::types::JsValue;
use std::ops::{Deref, DerefMut};
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ContextKind {
    Global,
    Function,
    Eval,
}

/// State of one active invocation (ES5 §10.3).
#[derive(Clone, Debug)]
pub(crate) struct ExecutionContext {
    pub lexical_environment: EnvRef,
    pub variable_environment: EnvRef,
    pub this_binding: JsValue,
    pub strict: bool,
    pub kind: ContextKind,
    pub function_name: Option<String>,
}

/// Pops the context it pushed when dropped, whatever way the body exits.
pub(crate) struct ContextGuard<'a> {
    interp: &'a mut Interpreter,
}

impl Deref for ContextGuard<'_> {
    type Target = Interpreter;

    fn deref(&self) -> &Interpreter {
        self.interp
    }
}

impl DerefMut for ContextGuard<'_> {
    fn deref_mut(&mut self) -> &mut Interpreter {
        self.interp
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        let popped = self.interp.contexts.pop();
        debug!(
            depth = self.interp.contexts.len(),
            kind = ?popped.map(|c| c.kind),
            "leave execution context"
        );
    }
}

impl Interpreter {
    /// Pushes `ctx`, enforcing the recursion limit for function contexts.
    pub(crate) fn enter_context(&mut self, ctx: ExecutionContext) -> Result<ContextGuard<'_>, JsValue> {
        if ctx.kind == ContextKind::Function {
            let depth = self.call_depth();
            if depth >= self.options.recursion_limit() {
                let callee = ctx.function_name.clone().unwrap_or_else(|| "anonymous".to_string());
                return Err(self.fatal(JsError::RecursionDepthOverflow { depth, callee }));
            }
        }
        debug!(depth = self.contexts.len() + 1, kind = ?ctx.kind, strict = ctx.strict, "enter execution context");
        self.contexts.push(ctx);
        Ok(ContextGuard { interp: self })
    }

    fn call_depth(&self) -> usize {
        self.contexts
            .iter()
            .filter(|c| c.kind == ContextKind::Function)
            .count()
    }

    fn current_context(&self) -> Option<&ExecutionContext> {
        self.contexts.last()
    }

    pub(crate) fn lexical_environment(&self) -> EnvRef {
        self.current_context()
            .map_or_else(|| self.global_env.clone(), |c| c.lexical_environment.clone())
    }

    pub(crate) fn variable_environment(&self) -> EnvRef {
        self.current_context()
            .map_or_else(|| self.global_env.clone(), |c| c.variable_environment.clone())
    }

    pub(crate) fn this_binding(&self) -> JsValue {
        self.current_context().map_or_else(
            || JsValue::Object(self.realm.global_object.clone()),
            |c| c.this_binding.clone(),
        )
    }

    pub(crate) fn is_strict(&self) -> bool {
        self.contexts.last().map_or(self.options.strict, |c| c.strict)
    }

    /// Records a fatal limit error. The returned value travels as an
    /// ordinary throw, but `catch` clauses ignore it while a fatal error is
    /// pending and the host boundary reports the fatal error instead.
    pub(crate) fn fatal(&mut self, err: JsError) -> JsValue {
        warn!(error = %err, "execution aborted");
        if self.pending_fatal.is_none() {
            self.pending_fatal = Some(err);
        }
        JsValue::Undefined
    }

    /// Cooperative checks run before every statement.
    pub(crate) fn check_statement_limits(&mut self) -> Result<(), JsValue> {
        if self.pending_fatal.is_some() {
            return Err(JsValue::Undefined);
        }
        self.statements_count += 1;
        let limit = self.options.max_statements;
        if limit > 0 && self.statements_count > limit {
            return Err(self.fatal(JsError::StatementsCountOverflow { limit }));
        }
        if let (Some(timeout), Some(started)) = (self.options.timeout_interval, self.started_at)
            && started.elapsed() > timeout
        {
            return Err(self.fatal(JsError::Timeout(timeout)));
        }
        Ok(())
    }

    /// Resets the per-execution counters.
    pub(crate) fn reset_limits(&mut self) {
        self.statements_count = 0;
        self.started_at = Some(Instant::now());
        self.pending_fatal = None;
    }

    /// Call stack, innermost first.
    pub(crate) fn capture_stack(&self) -> Vec<StackFrame> {
        self.contexts
            .iter()
            .rev()
            .filter(|c| c.kind == ContextKind::Function)
            .map(|c| StackFrame {
                function_name: c.function_name.clone().unwrap_or_default(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;

    fn function_context(interp: &Interpreter, name: &str) -> ExecutionContext {
        ExecutionContext {
            lexical_environment: interp.global_env.clone(),
            variable_environment: interp.global_env.clone(),
            this_binding: JsValue::Undefined,
            strict: true,
            kind: ContextKind::Function,
            function_name: Some(name.to_string()),
        }
    }

    #[test]
    fn guard_pops_on_drop() {
        let mut interp = Interpreter::new();
        let ctx = function_context(&interp, "f");
        {
            let guard = interp.enter_context(ctx).unwrap();
            assert_eq!(guard.contexts.len(), 1);
            assert!(guard.is_strict());
            assert_eq!(guard.capture_stack()[0].function_name, "f");
        }
        assert!(interp.contexts.is_empty());
        assert!(!interp.is_strict());
    }

    #[test]
    fn recursion_limit_is_fatal() {
        let mut interp = Interpreter::with_options(Options::new().limit_recursion(1));
        let outer = function_context(&interp, "outer");
        let inner = function_context(&interp, "inner");
        let mut guard = interp.enter_context(outer).unwrap();
        assert!(guard.enter_context(inner).is_err());
        assert!(matches!(
            guard.pending_fatal,
            Some(JsError::RecursionDepthOverflow { depth: 1, ref callee }) if callee == "inner"
        ));
    }

    #[test]
    fn statement_budget() {
        let mut interp = Interpreter::with_options(Options::new().max_statements(2));
        interp.reset_limits();
        assert!(interp.check_statement_limits().is_ok());
        assert!(interp.check_statement_limits().is_ok());
        assert!(interp.check_statement_limits().is_err());
        assert!(matches!(
            interp.pending_fatal,
            Some(JsError::StatementsCountOverflow { limit: 2 })
        ));
    }

    #[test]
    fn this_defaults_to_global_object() {
        let interp = Interpreter::new();
        assert!(matches!(
            interp.this_binding(),
            JsValue::Object(o) if o.ptr_eq(&interp.realm.global_object)
        ));
    }
}
