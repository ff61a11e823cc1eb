//! `jsrt`: an ECMAScript 5 runtime. Source text is parsed into an AST and
//! evaluated by a tree-walking [`Interpreter`] that models ES5 values,
//! property attributes, environments, execution contexts and completions.

pub mod ast;
pub mod error;
pub mod interop;
pub mod interpreter;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod types;

pub use error::JsError;
pub use interop::ObjectConverter;
pub use interpreter::{Completion, Interpreter};
pub use options::Options;
pub use types::{JsObject, JsString, JsValue};
