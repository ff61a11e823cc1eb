use super::*;

impl<'a> Parser<'a> {
    pub(super) fn parse_statement_or_declaration(&mut self) -> Result<Statement, ParseError> {
        match &self.current {
            Token::Keyword(Keyword::Function) => self.parse_function_declaration(),
            Token::Keyword(Keyword::Let) | Token::Keyword(Keyword::Const) => {
                self.parse_lexical_declaration()
            }
            _ => self.parse_statement(),
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let pending = std::mem::take(&mut self.pending_labels);
        match &self.current {
            Token::Keyword(Keyword::Let) | Token::Keyword(Keyword::Const) => Err(
                self.error("Lexical declaration cannot appear in a single-statement context"),
            ),
            Token::Keyword(Keyword::Function) => self.parse_function_substatement(),
            Token::LeftBrace => self.parse_block().map(Statement::Block),
            Token::Semicolon => {
                self.advance()?;
                Ok(Statement::Empty)
            }
            Token::Keyword(Keyword::Var) => self.parse_variable_statement(),
            Token::Keyword(Keyword::If) => self.parse_if_statement(),
            Token::Keyword(Keyword::While | Keyword::Do | Keyword::For) => {
                // labels directly in front of a loop may be continued
                let len = self.labels.len();
                for label in &mut self.labels[len.saturating_sub(pending)..] {
                    label.1 = true;
                }
                match self.current {
                    Token::Keyword(Keyword::While) => self.parse_while_statement(),
                    Token::Keyword(Keyword::Do) => self.parse_do_while_statement(),
                    _ => self.parse_for_statement(),
                }
            }
            Token::Keyword(Keyword::Return) => self.parse_return_statement(),
            Token::Keyword(Keyword::Break) => self.parse_break_statement(),
            Token::Keyword(Keyword::Continue) => self.parse_continue_statement(),
            Token::Keyword(Keyword::Throw) => self.parse_throw_statement(),
            Token::Keyword(Keyword::Try) => self.parse_try_statement(),
            Token::Keyword(Keyword::Switch) => self.parse_switch_statement(),
            Token::Keyword(Keyword::With) => self.parse_with_statement(),
            Token::Keyword(Keyword::Debugger) => {
                self.advance()?;
                self.eat_semicolon()?;
                Ok(Statement::Debugger)
            }
            _ => self.parse_expression_statement_or_labeled(pending),
        }
    }

    /// A function declaration where only a statement may appear. Sloppy
    /// code gets it wrapped in its own block.
    fn parse_function_substatement(&mut self) -> Result<Statement, ParseError> {
        if self.strict {
            return Err(self.error(
                "In strict mode code, functions can only be declared at top level or inside a block.",
            ));
        }
        self.block_depth += 1;
        let decl = self.parse_function_declaration();
        self.block_depth -= 1;
        let decl = decl?;
        let mut function_declarations = Vec::new();
        collect_functions(&decl, &mut function_declarations);
        Ok(Statement::Block(Block {
            body: vec![decl],
            lexical_declarations: Vec::new(),
            function_declarations,
        }))
    }

    fn parse_expression_statement_or_labeled(&mut self, pending: usize) -> Result<Statement, ParseError> {
        let start = self.current_token_start;
        let expr = self.parse_expression()?;
        if let Expression::Identifier(name) = &expr
            && self.current == Token::Colon
            && self.source[start..self.prev_token_end] == **name
        {
            let name = name.clone();
            if self.labels.iter().any(|(l, _)| l == &name) {
                return Err(self.error(format!("Label '{name}' has already been declared")));
            }
            self.advance()?;
            self.labels.push((name.clone(), false));
            self.pending_labels = pending + 1;
            let body = self.parse_statement();
            self.pending_labels = 0;
            self.labels.pop();
            return Ok(Statement::Labeled(name, Box::new(body?)));
        }
        self.eat_semicolon()?;
        Ok(Statement::Expression(expr))
    }

    pub(super) fn parse_block(&mut self) -> Result<Block, ParseError> {
        self.eat(&Token::LeftBrace)?;
        self.block_depth += 1;
        let mut body = Vec::new();
        let result = loop {
            if self.current == Token::RightBrace {
                break Ok(());
            }
            match self.parse_statement_or_declaration() {
                Ok(stmt) => body.push(stmt),
                Err(e) => break Err(e),
            }
        };
        self.block_depth -= 1;
        result?;
        self.eat(&Token::RightBrace)?;
        let (lexical_declarations, function_declarations) = self.scope_declarations(&body)?;
        Ok(Block {
            body,
            lexical_declarations,
            function_declarations,
        })
    }

    fn parse_if_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let test = self.parse_parenthesized()?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.current == Token::Keyword(Keyword::Else) {
            self.advance()?;
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::If(IfStatement {
            test,
            consequent,
            alternate,
        }))
    }

    fn parse_parenthesized(&mut self) -> Result<Expression, ParseError> {
        self.eat(&Token::LeftParen)?;
        let expr = self.parse_expression()?;
        self.eat(&Token::RightParen)?;
        Ok(expr)
    }

    fn parse_loop_body(&mut self) -> Result<Box<Statement>, ParseError> {
        let prev = std::mem::replace(&mut self.in_iteration, true);
        let body = self.parse_statement();
        self.in_iteration = prev;
        body.map(Box::new)
    }

    fn parse_while_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let test = self.parse_parenthesized()?;
        let body = self.parse_loop_body()?;
        Ok(Statement::While(WhileStatement { test, body }))
    }

    fn parse_do_while_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let body = self.parse_loop_body()?;
        self.eat(&Token::Keyword(Keyword::While))?;
        let test = self.parse_parenthesized()?;
        // the `;` after do-while is always optional
        if self.current == Token::Semicolon {
            self.advance()?;
        }
        Ok(Statement::DoWhile(DoWhileStatement { test, body }))
    }

    fn parse_for_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        self.eat(&Token::LeftParen)?;
        let init = match &self.current {
            Token::Semicolon => None,
            Token::Keyword(kw @ (Keyword::Var | Keyword::Let | Keyword::Const)) => {
                let kind = match kw {
                    Keyword::Var => VarKind::Var,
                    Keyword::Let => VarKind::Let,
                    _ => VarKind::Const,
                };
                self.advance()?;
                self.no_in = true;
                let declarations = self.parse_variable_declaration_list(kind);
                self.no_in = false;
                let decl = VariableDeclaration {
                    kind,
                    declarations: declarations?,
                };
                if self.current == Token::Keyword(Keyword::In) {
                    if decl.declarations.len() != 1
                        || kind != VarKind::Var && decl.declarations[0].init.is_some()
                    {
                        return Err(self.error("Invalid left-hand side in for-in loop: Must have a single binding."));
                    }
                    return self.parse_for_in_rest(ForInLeft::Variable(decl));
                }
                self.check_const_initializers(&decl)?;
                Some(ForInit::Variable(decl))
            }
            _ => {
                self.no_in = true;
                let expr = self.parse_expression();
                self.no_in = false;
                let expr = expr?;
                if self.current == Token::Keyword(Keyword::In) {
                    self.check_assignment_target(&expr, "Invalid left-hand side in for-in loop")?;
                    return self.parse_for_in_rest(ForInLeft::Expression(expr));
                }
                Some(ForInit::Expression(expr))
            }
        };
        self.eat(&Token::Semicolon)?;
        let test = if self.current == Token::Semicolon {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.eat(&Token::Semicolon)?;
        let update = if self.current == Token::RightParen {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.eat(&Token::RightParen)?;
        let body = self.parse_loop_body()?;
        Ok(Statement::For(ForStatement {
            init,
            test,
            update,
            body,
        }))
    }

    fn parse_for_in_rest(&mut self, left: ForInLeft) -> Result<Statement, ParseError> {
        self.eat(&Token::Keyword(Keyword::In))?;
        let right = self.parse_expression()?;
        self.eat(&Token::RightParen)?;
        let body = self.parse_loop_body()?;
        Ok(Statement::ForIn(ForInStatement { left, right, body }))
    }

    /// True when the statement ends here: `;`, `}`, end of input or a
    /// line break (restricted productions, §7.9.1).
    fn at_statement_end(&self) -> bool {
        self.prev_line_terminator
            || matches!(self.current, Token::Semicolon | Token::RightBrace | Token::Eof)
    }

    fn parse_return_statement(&mut self) -> Result<Statement, ParseError> {
        if !self.in_function {
            return Err(self.error("Illegal return statement"));
        }
        self.advance()?;
        let argument = if self.at_statement_end() {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.eat_semicolon()?;
        Ok(Statement::Return(argument))
    }

    fn parse_jump_label(&mut self) -> Result<Option<String>, ParseError> {
        if self.prev_line_terminator {
            return Ok(None);
        }
        match &self.current {
            Token::Identifier(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(Some(name))
            }
            _ => Ok(None),
        }
    }

    fn parse_break_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let label = self.parse_jump_label()?;
        match &label {
            Some(name) if !self.labels.iter().any(|(l, _)| l == name) => {
                return Err(self.error(format!("Undefined label '{name}'")));
            }
            None if !self.in_iteration && !self.in_switch => {
                return Err(self.error("Illegal break statement"));
            }
            _ => {}
        }
        self.eat_semicolon()?;
        Ok(Statement::Break(label))
    }

    fn parse_continue_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        if !self.in_iteration {
            return Err(self.error("Illegal continue statement: no surrounding iteration statement"));
        }
        let label = self.parse_jump_label()?;
        if let Some(name) = &label {
            match self.labels.iter().find(|(l, _)| l == name) {
                None => return Err(self.error(format!("Undefined label '{name}'"))),
                Some((_, false)) => {
                    return Err(self.error(format!(
                        "Illegal continue statement: '{name}' does not denote an iteration statement"
                    )));
                }
                Some(_) => {}
            }
        }
        self.eat_semicolon()?;
        Ok(Statement::Continue(label))
    }

    fn parse_throw_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        if self.prev_line_terminator {
            return Err(self.error("Illegal newline after throw"));
        }
        let argument = self.parse_expression()?;
        self.eat_semicolon()?;
        Ok(Statement::Throw(argument))
    }

    fn parse_try_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let block = self.parse_block()?;
        let handler = if self.current == Token::Keyword(Keyword::Catch) {
            self.advance()?;
            self.eat(&Token::LeftParen)?;
            let param = self.parse_binding_identifier()?;
            self.eat(&Token::RightParen)?;
            let body = self.parse_block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };
        let finalizer = if self.current == Token::Keyword(Keyword::Finally) {
            self.advance()?;
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("Missing catch or finally after try"));
        }
        Ok(Statement::Try(TryStatement {
            block,
            handler,
            finalizer,
        }))
    }

    fn parse_switch_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let discriminant = self.parse_parenthesized()?;
        self.eat(&Token::LeftBrace)?;
        let prev_switch = std::mem::replace(&mut self.in_switch, true);
        self.block_depth += 1;
        let cases = self.parse_switch_cases();
        self.block_depth -= 1;
        self.in_switch = prev_switch;
        let cases = cases?;
        self.eat(&Token::RightBrace)?;

        let mut lexical_declarations: Vec<(String, bool)> = Vec::new();
        for stmt in cases.iter().flat_map(|c| &c.consequent) {
            if let Statement::Variable(decl) = stmt
                && decl.kind != VarKind::Var
            {
                for d in &decl.declarations {
                    if lexical_declarations.iter().any(|(n, _)| n == &d.name) {
                        return Err(self.redeclared(&d.name));
                    }
                    lexical_declarations.push((d.name.clone(), decl.kind == VarKind::Const));
                }
            }
        }
        Ok(Statement::Switch(SwitchStatement {
            discriminant,
            cases,
            lexical_declarations,
        }))
    }

    fn parse_switch_cases(&mut self) -> Result<Vec<SwitchCase>, ParseError> {
        let mut cases = Vec::new();
        let mut seen_default = false;
        while self.current != Token::RightBrace {
            let test = match self.current {
                Token::Keyword(Keyword::Case) => {
                    self.advance()?;
                    Some(self.parse_expression()?)
                }
                Token::Keyword(Keyword::Default) => {
                    if seen_default {
                        return Err(self.error("More than one default clause in switch statement"));
                    }
                    seen_default = true;
                    self.advance()?;
                    None
                }
                _ => return Err(self.unexpected()),
            };
            self.eat(&Token::Colon)?;
            let mut consequent = Vec::new();
            while !matches!(
                self.current,
                Token::Keyword(Keyword::Case) | Token::Keyword(Keyword::Default) | Token::RightBrace
            ) {
                consequent.push(self.parse_statement_or_declaration()?);
            }
            cases.push(SwitchCase { test, consequent });
        }
        Ok(cases)
    }

    fn parse_with_statement(&mut self) -> Result<Statement, ParseError> {
        if self.strict {
            return Err(self.error("Strict mode code may not include a with statement"));
        }
        self.advance()?;
        let object = self.parse_parenthesized()?;
        let body = self.parse_statement()?;
        Ok(Statement::With(object, Box::new(body)))
    }
}
