use super::*;

impl<'a> Parser<'a> {
    pub(super) fn parse_variable_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let declarations = self.parse_variable_declaration_list(VarKind::Var)?;
        self.eat_semicolon()?;
        Ok(Statement::Variable(VariableDeclaration {
            kind: VarKind::Var,
            declarations,
        }))
    }

    pub(super) fn parse_lexical_declaration(&mut self) -> Result<Statement, ParseError> {
        let kind = if self.advance()? == Token::Keyword(Keyword::Const) {
            VarKind::Const
        } else {
            VarKind::Let
        };
        let decl = VariableDeclaration {
            kind,
            declarations: self.parse_variable_declaration_list(kind)?,
        };
        self.check_const_initializers(&decl)?;
        self.eat_semicolon()?;
        Ok(Statement::Variable(decl))
    }

    /// `var` names are also recorded for hoisting into the enclosing
    /// function or program.
    pub(super) fn parse_variable_declaration_list(
        &mut self,
        kind: VarKind,
    ) -> Result<Vec<VariableDeclarator>, ParseError> {
        let mut declarations = Vec::new();
        loop {
            let name = self.parse_binding_identifier()?;
            if kind == VarKind::Var {
                self.var_names.push(name.clone());
            } else if name == "let" {
                return Err(self.error("let is disallowed as a lexically bound name"));
            }
            let init = if self.current == Token::Assign {
                self.advance()?;
                Some(self.parse_assignment_expression()?)
            } else {
                None
            };
            declarations.push(VariableDeclarator { name, init });
            if self.current != Token::Comma {
                break;
            }
            self.advance()?;
        }
        Ok(declarations)
    }

    pub(super) fn check_const_initializers(&self, decl: &VariableDeclaration) -> Result<(), ParseError> {
        if decl.kind == VarKind::Const && decl.declarations.iter().any(|d| d.init.is_none()) {
            return Err(self.error("Missing initializer in const declaration"));
        }
        Ok(())
    }

    pub(super) fn parse_function_declaration(&mut self) -> Result<Statement, ParseError> {
        let node = self.parse_function(true)?;
        // sloppy block-level functions are also visible function-wide
        if self.block_depth > 0
            && !self.strict
            && let Some(name) = &node.name
        {
            self.var_names.push(name.clone());
        }
        Ok(Statement::FunctionDeclaration(node))
    }

    /// Parses `function name?(params) { body }` starting at the `function`
    /// keyword. Declarations must be named.
    pub(super) fn parse_function(&mut self, is_declaration: bool) -> Result<Rc<FunctionNode>, ParseError> {
        let start = self.current_token_start;
        self.eat(&Token::Keyword(Keyword::Function))?;
        let name = match &self.current {
            Token::Identifier(name) => {
                let name = name.clone();
                self.check_strict_identifier(&name)?;
                self.advance()?;
                Some(name)
            }
            _ if is_declaration => return Err(self.unexpected()),
            _ => None,
        };
        self.parse_function_rest(start, name)
    }

    /// Parameters and body of a function whose source starts at `start`.
    pub(super) fn parse_function_rest(
        &mut self,
        start: usize,
        name: Option<String>,
    ) -> Result<Rc<FunctionNode>, ParseError> {
        let params = self.parse_formal_parameters()?;
        self.eat(&Token::LeftBrace)?;
        let state = self.enter_function();
        let parsed = self.parse_source_elements(&Token::RightBrace);
        let strict = self.strict;
        self.leave_function(state);
        let (body, hoisting) = parsed?;
        self.eat(&Token::RightBrace)?;

        if strict {
            self.check_strict_function(name.as_deref(), &params)?;
        }
        Ok(Rc::new(FunctionNode {
            name,
            params,
            body,
            strict,
            hoisting,
            source_text: Some(self.source_since(start)),
        }))
    }

    pub(super) fn parse_formal_parameters(&mut self) -> Result<Vec<String>, ParseError> {
        self.eat(&Token::LeftParen)?;
        let mut params = Vec::new();
        if self.current != Token::RightParen {
            loop {
                let Token::Identifier(name) = &self.current else {
                    return Err(self.unexpected());
                };
                params.push(name.clone());
                self.advance()?;
                if self.current != Token::Comma {
                    break;
                }
                self.advance()?;
            }
        }
        self.eat(&Token::RightParen)?;
        Ok(params)
    }

    /// Name and parameter rules for strict functions (§13.1). Checked
    /// after the body since a directive can make the function strict.
    fn check_strict_function(&self, name: Option<&str>, params: &[String]) -> Result<(), ParseError> {
        for binding in name.into_iter().chain(params.iter().map(String::as_str)) {
            if let Some(message) = strict_binding_violation(binding) {
                return Err(self.error(message));
            }
        }
        let mut seen = FxHashSet::default();
        if params.iter().any(|p| !seen.insert(p.as_str())) {
            return Err(self.error("Duplicate parameter name not allowed in this context"));
        }
        Ok(())
    }
}
