use crate::interop::ObjectConverter;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Call depth enforced when no explicit limit is configured. Deeper nesting
/// would exhaust the native stack of a default-sized thread.
pub const DEFAULT_RECURSION_DEPTH: usize = 128;

/// Engine configuration, read-only once the engine is built.
#[derive(Clone, Default)]
pub struct Options {
    pub strict: bool,
    /// Statements allowed per `execute`/`invoke`; 0 means unlimited.
    pub max_statements: usize,
    /// `None` falls back to [`DEFAULT_RECURSION_DEPTH`].
    pub max_recursion_depth: Option<usize>,
    pub timeout_interval: Option<Duration>,
    pub allow_debugger_statement: bool,
    pub object_converters: Vec<Rc<dyn ObjectConverter>>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run global code and indirect eval in strict mode.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn max_statements(mut self, max: usize) -> Self {
        self.max_statements = max;
        self
    }

    /// Limit the depth of nested function calls. Limits above
    /// [`DEFAULT_RECURSION_DEPTH`] need a correspondingly larger thread stack.
    pub fn limit_recursion(mut self, depth: usize) -> Self {
        self.max_recursion_depth = Some(depth);
        self
    }

    pub fn recursion_limit(&self) -> usize {
        self.max_recursion_depth.unwrap_or(DEFAULT_RECURSION_DEPTH)
    }

    pub fn timeout_interval(mut self, timeout: Duration) -> Self {
        self.timeout_interval = Some(timeout);
        self
    }

    pub fn allow_debugger_statement(mut self, allow: bool) -> Self {
        self.allow_debugger_statement = allow;
        self
    }

    /// Append a converter to the foreign-value conversion chain.
    pub fn add_object_converter(mut self, converter: Rc<dyn ObjectConverter>) -> Self {
        self.object_converters.push(converter);
        self
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("strict", &self.strict)
            .field("max_statements", &self.max_statements)
            .field("max_recursion_depth", &self.max_recursion_depth)
            .field("timeout_interval", &self.timeout_interval)
            .field("allow_debugger_statement", &self.allow_debugger_statement)
            .field("object_converters", &self.object_converters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unlimited() {
        let o = Options::new();
        assert!(!o.strict);
        assert_eq!(o.max_statements, 0);
        assert!(o.max_recursion_depth.is_none());
        assert_eq!(o.recursion_limit(), DEFAULT_RECURSION_DEPTH);
        assert!(o.timeout_interval.is_none());
        assert!(o.object_converters.is_empty());
    }

    #[test]
    fn builder_chains() {
        let o = Options::new()
            .strict(true)
            .max_statements(10)
            .limit_recursion(5)
            .timeout_interval(Duration::from_secs(1))
            .allow_debugger_statement(true);
        assert!(o.strict && o.allow_debugger_statement);
        assert_eq!(o.max_statements, 10);
        assert_eq!(o.max_recursion_depth, Some(5));
        assert_eq!(o.recursion_limit(), 5);
        assert_eq!(o.timeout_interval, Some(Duration::from_secs(1)));
    }
}
