//! Host-facing error types.

use crate::parser::ParseError;
use crate::types::JsValue;
use std::time::Duration;
use thiserror::Error;

/// Failure of an `execute`/`invoke` call as seen by the host.
#[derive(Debug, Error)]
pub enum JsError {
    /// Script exception that no `catch` handled.
    #[error("{0}")]
    Thrown(Box<ThrownValue>),

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Call depth exceeded `Options::limit_recursion`.
    #[error("RangeError: Maximum call stack size exceeded (depth {depth}, calling {callee})")]
    RecursionDepthOverflow { depth: usize, callee: String },

    #[error("The maximum number of statements executed have been reached ({limit})")]
    StatementsCountOverflow { limit: usize },

    #[error("The script timed out after {0:?}")]
    Timeout(Duration),
}

impl JsError {
    /// The thrown script value, for script exceptions.
    pub fn value(&self) -> Option<&JsValue> {
        match self {
            JsError::Thrown(t) => Some(&t.value),
            _ => None,
        }
    }

    /// Limit violations end the whole execution and cannot be caught.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            JsError::RecursionDepthOverflow { .. } | JsError::StatementsCountOverflow { .. } | JsError::Timeout(_)
        )
    }
}

/// A thrown value with its `ToString` and the call stack at the throw.
#[derive(Debug)]
pub struct ThrownValue {
    pub value: JsValue,
    pub message: String,
    pub stack: Vec<StackFrame>,
}

impl std::fmt::Display for ThrownValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub function_name: String,
}

impl std::fmt::Display for StackFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.function_name.is_empty() {
            write!(f, "at <anonymous>")
        } else {
            write!(f, "at {}", self.function_name)
        }
    }
}
