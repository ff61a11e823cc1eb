//! Recursive-descent parser for ES5 source text (plus block-scoped
//! `let`/`const`). Each function body and program records its hoisted
//! declarations while it is parsed.

mod declarations;
mod expressions;
mod statements;

use crate::ast::*;
use crate::lexer::{Keyword, LexError, Lexer, Token};
use rustc_hash::FxHashSet;
use std::rc::Rc;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseErrorKind {
    Syntax,
    /// Early error for assignment to something that is not a reference.
    InvalidLeftHandSide,
}

impl ParseErrorKind {
    pub fn error_name(self) -> &'static str {
        match self {
            ParseErrorKind::Syntax => "SyntaxError",
            ParseErrorKind::InvalidLeftHandSide => "ReferenceError",
        }
    }
}

#[derive(Clone, Debug, Error)]
#[error("{}: {message}", kind.error_name())]
pub struct ParseError {
    pub message: String,
    pub kind: ParseErrorKind,
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError {
            message: e.message,
            kind: ParseErrorKind::Syntax,
        }
    }
}

/// Parses `source` as a program; `strict` forces strict mode code even
/// without a directive.
pub fn parse_program(source: &str, strict: bool) -> Result<Program, ParseError> {
    let mut parser = Parser::new(source)?;
    parser.strict = strict;
    parser.parse_program()
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    source: &'a str,
    current: Token,
    current_token_start: usize,
    current_token_end: usize,
    prev_token_end: usize,
    prev_line_terminator: bool,
    strict: bool,
    labels: Vec<(String, bool)>,
    /// Labels directly in front of the statement being parsed.
    pending_labels: usize,
    in_iteration: bool,
    in_switch: bool,
    in_function: bool,
    no_in: bool,
    block_depth: usize,
    /// `var` names of the function or program being parsed.
    var_names: Vec<String>,
}

/// Saved per-function parser state, restored when a nested function ends.
struct FunctionState {
    labels: Vec<(String, bool)>,
    in_iteration: bool,
    in_switch: bool,
    in_function: bool,
    no_in: bool,
    block_depth: usize,
    strict: bool,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Result<Self, ParseError> {
        let mut parser = Parser {
            lexer: Lexer::new(source),
            source,
            current: Token::Eof,
            current_token_start: 0,
            current_token_end: 0,
            prev_token_end: 0,
            prev_line_terminator: false,
            strict: false,
            labels: Vec::new(),
            pending_labels: 0,
            in_iteration: false,
            in_switch: false,
            in_function: false,
            no_in: false,
            block_depth: 0,
            var_names: Vec::new(),
        };
        parser.advance()?;
        Ok(parser)
    }

    /// Moves to the next significant token and returns the one it replaced.
    fn advance(&mut self) -> Result<Token, ParseError> {
        self.prev_token_end = self.current_token_end;
        self.prev_line_terminator = false;
        loop {
            let token = self.lexer.next_token()?;
            if token == Token::LineTerminator {
                self.prev_line_terminator = true;
                continue;
            }
            self.current_token_start = self.lexer.token_start();
            self.current_token_end = self.lexer.offset();
            return Ok(std::mem::replace(&mut self.current, token));
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            kind: ParseErrorKind::Syntax,
        }
    }

    fn unexpected(&self) -> ParseError {
        let message = match &self.current {
            Token::Eof => "Unexpected end of input".to_string(),
            Token::Identifier(name) => format!("Unexpected identifier '{name}'"),
            Token::NumericLiteral(_) | Token::LegacyOctalLiteral(_) => "Unexpected number".to_string(),
            Token::StringLiteral { .. } => "Unexpected string".to_string(),
            Token::Keyword(kw) if Self::is_future_reserved(*kw) => "Unexpected reserved word".to_string(),
            other => format!("Unexpected token '{other}'"),
        };
        self.error(message)
    }

    fn eat(&mut self, expected: &Token) -> Result<(), ParseError> {
        if &self.current == expected {
            self.advance()?;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    /// Consumes a `;`, applying automatic semicolon insertion (§7.9).
    fn eat_semicolon(&mut self) -> Result<(), ParseError> {
        match self.current {
            Token::Semicolon => {
                self.advance()?;
                Ok(())
            }
            Token::RightBrace | Token::Eof => Ok(()),
            _ if self.prev_line_terminator => Ok(()),
            _ => Err(self.unexpected()),
        }
    }

    fn source_since(&self, start: usize) -> String {
        self.source[start..self.prev_token_end].to_string()
    }

    fn is_future_reserved(kw: Keyword) -> bool {
        matches!(
            kw,
            Keyword::Class
                | Keyword::Enum
                | Keyword::Export
                | Keyword::Extends
                | Keyword::Import
                | Keyword::Super
        )
    }

    fn is_strict_reserved_word(name: &str) -> bool {
        matches!(
            name,
            "implements"
                | "interface"
                | "package"
                | "private"
                | "protected"
                | "public"
                | "static"
                | "yield"
        )
    }

    fn check_strict_identifier(&self, name: &str) -> Result<(), ParseError> {
        if self.strict && Self::is_strict_reserved_word(name) {
            return Err(self.error("Unexpected strict mode reserved word"));
        }
        Ok(())
    }

    fn check_strict_binding_identifier(&self, name: &str) -> Result<(), ParseError> {
        match strict_binding_violation(name) {
            Some(message) if self.strict => Err(self.error(message)),
            _ => Ok(()),
        }
    }

    /// Reads an identifier in binding position: variable, parameter,
    /// function name or catch parameter.
    fn parse_binding_identifier(&mut self) -> Result<String, ParseError> {
        let Token::Identifier(name) = &self.current else {
            return Err(self.unexpected());
        };
        let name = name.clone();
        self.check_strict_binding_identifier(&name)?;
        self.advance()?;
        Ok(name)
    }

    fn enter_function(&mut self) -> FunctionState {
        let state = FunctionState {
            labels: std::mem::take(&mut self.labels),
            in_iteration: self.in_iteration,
            in_switch: self.in_switch,
            in_function: self.in_function,
            no_in: self.no_in,
            block_depth: self.block_depth,
            strict: self.strict,
        };
        self.in_iteration = false;
        self.in_switch = false;
        self.in_function = true;
        self.no_in = false;
        self.block_depth = 0;
        state
    }

    fn leave_function(&mut self, state: FunctionState) {
        self.labels = state.labels;
        self.in_iteration = state.in_iteration;
        self.in_switch = state.in_switch;
        self.in_function = state.in_function;
        self.no_in = state.no_in;
        self.block_depth = state.block_depth;
        self.strict = state.strict;
    }

    /// Parses a program body or function body up to `end`, honouring a
    /// leading `"use strict"` directive, and collects its hoisted
    /// declarations.
    fn parse_source_elements(&mut self, end: &Token) -> Result<(Vec<Statement>, HoistingScope), ParseError> {
        let outer_vars = std::mem::take(&mut self.var_names);
        let mut body = Vec::new();
        let mut in_prologue = true;
        while &self.current != end {
            let start = self.current_token_start;
            let stmt = self.parse_statement_or_declaration()?;
            if in_prologue {
                match directive(&stmt, &self.source[start..self.prev_token_end]) {
                    Some(true) => self.strict = true,
                    Some(false) => {}
                    None => in_prologue = false,
                }
            }
            body.push(stmt);
        }
        let mut var_names = std::mem::replace(&mut self.var_names, outer_vars);
        let mut seen = FxHashSet::default();
        var_names.retain(|n| seen.insert(n.clone()));
        let (lexical_declarations, function_declarations) = self.scope_declarations(&body)?;
        let hoisting = HoistingScope {
            function_declarations,
            var_names,
            lexical_declarations,
        };
        Ok((body, hoisting))
    }

    /// Lexical and function declarations made directly in a statement list.
    fn scope_declarations(
        &self,
        stmts: &[Statement],
    ) -> Result<(Vec<(String, bool)>, Vec<Rc<FunctionNode>>), ParseError> {
        let mut lexical: Vec<(String, bool)> = Vec::new();
        let mut functions = Vec::new();
        for stmt in stmts {
            if let Statement::Variable(decl) = stmt
                && decl.kind != VarKind::Var
            {
                for d in &decl.declarations {
                    if lexical.iter().any(|(n, _)| n == &d.name) {
                        return Err(self.redeclared(&d.name));
                    }
                    lexical.push((d.name.clone(), decl.kind == VarKind::Const));
                }
            }
            collect_functions(stmt, &mut functions);
        }
        for f in &functions {
            if let Some(name) = &f.name
                && lexical.iter().any(|(n, _)| n == name)
            {
                return Err(self.redeclared(name));
            }
        }
        Ok((lexical, functions))
    }

    fn redeclared(&self, name: &str) -> ParseError {
        self.error(format!("Identifier '{name}' has already been declared"))
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let (body, hoisting) = self.parse_source_elements(&Token::Eof)?;
        Ok(Program {
            body,
            strict: self.strict,
            hoisting,
        })
    }
}

/// Why `name` cannot be bound in strict mode code, if it cannot.
fn strict_binding_violation(name: &str) -> Option<&'static str> {
    if Parser::is_strict_reserved_word(name) {
        Some("Unexpected strict mode reserved word")
    } else if name == "eval" || name == "arguments" {
        Some("Unexpected eval or arguments in strict mode")
    } else {
        None
    }
}

/// Function declarations owned by the enclosing scope of `stmt`: the
/// declaration itself, a labelled one, or those inside `switch` cases.
fn collect_functions(stmt: &Statement, out: &mut Vec<Rc<FunctionNode>>) {
    match stmt {
        Statement::FunctionDeclaration(f) => out.push(f.clone()),
        Statement::Labeled(_, body) => collect_functions(body, out),
        Statement::Switch(s) => {
            for case in &s.cases {
                for stmt in &case.consequent {
                    collect_functions(stmt, out);
                }
            }
        }
        _ => {}
    }
}

/// Classifies a statement in a directive prologue: `Some(true)` for a
/// `"use strict"` directive, `Some(false)` for any other directive.
fn directive(stmt: &Statement, raw: &str) -> Option<bool> {
    let Statement::Expression(Expression::Literal(Literal::String(_))) = stmt else {
        return None;
    };
    let raw = raw.trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    Some(raw == "\"use strict\"" || raw == "'use strict'")
}
