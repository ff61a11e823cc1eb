use super::*;

impl<'a> Parser<'a> {
    pub fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_assignment_expression()?;
        if self.current == Token::Comma {
            let mut exprs = vec![expr];
            while self.current == Token::Comma {
                self.advance()?;
                exprs.push(self.parse_assignment_expression()?);
            }
            Ok(Expression::Sequence(exprs))
        } else {
            Ok(expr)
        }
    }

    /// Only identifiers and property accesses can be assigned to. Anything
    /// else is an early ReferenceError (§16).
    pub(super) fn check_assignment_target(&self, expr: &Expression, message: &str) -> Result<(), ParseError> {
        match expr {
            Expression::Identifier(name) if self.strict && (name == "eval" || name == "arguments") => {
                Err(self.error("Unexpected eval or arguments in strict mode"))
            }
            Expression::Identifier(_) | Expression::Member(_, _) => Ok(()),
            _ => Err(ParseError {
                message: message.to_string(),
                kind: ParseErrorKind::InvalidLeftHandSide,
            }),
        }
    }

    pub(super) fn parse_assignment_expression(&mut self) -> Result<Expression, ParseError> {
        let left = self.parse_conditional_expression()?;

        let op = match &self.current {
            Token::Assign => AssignOp::Assign,
            Token::PlusAssign => AssignOp::AddAssign,
            Token::MinusAssign => AssignOp::SubAssign,
            Token::StarAssign => AssignOp::MulAssign,
            Token::SlashAssign => AssignOp::DivAssign,
            Token::PercentAssign => AssignOp::ModAssign,
            Token::LeftShiftAssign => AssignOp::LShiftAssign,
            Token::RightShiftAssign => AssignOp::RShiftAssign,
            Token::UnsignedRightShiftAssign => AssignOp::URShiftAssign,
            Token::AmpersandAssign => AssignOp::BitAndAssign,
            Token::PipeAssign => AssignOp::BitOrAssign,
            Token::CaretAssign => AssignOp::BitXorAssign,
            _ => return Ok(left),
        };
        self.check_assignment_target(&left, "Invalid left-hand side in assignment")?;
        self.advance()?;
        let right = self.parse_assignment_expression()?;
        Ok(Expression::Assign(op, Box::new(left), Box::new(right)))
    }

    fn parse_conditional_expression(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_logical_or()?;
        if self.current != Token::Question {
            return Ok(expr);
        }
        self.advance()?;
        // the consequent always allows `in`
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let consequent = self.parse_assignment_expression();
        self.no_in = saved_no_in;
        let consequent = consequent?;
        self.eat(&Token::Colon)?;
        let alternate = self.parse_assignment_expression()?;
        Ok(Expression::Conditional(
            Box::new(expr),
            Box::new(consequent),
            Box::new(alternate),
        ))
    }

    fn parse_logical_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_logical_and()?;
        while self.current == Token::LogicalOr {
            self.advance()?;
            let right = self.parse_logical_and()?;
            left = Expression::Logical(LogicalOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_bitwise_or()?;
        while self.current == Token::LogicalAnd {
            self.advance()?;
            let right = self.parse_bitwise_or()?;
            left = Expression::Logical(LogicalOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_bitwise_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_bitwise_xor()?;
        while self.current == Token::Pipe {
            self.advance()?;
            let right = self.parse_bitwise_xor()?;
            left = Expression::Binary(BinaryOp::BitOr, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_bitwise_xor(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_bitwise_and()?;
        while self.current == Token::Caret {
            self.advance()?;
            let right = self.parse_bitwise_and()?;
            left = Expression::Binary(BinaryOp::BitXor, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_bitwise_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_equality()?;
        while self.current == Token::Ampersand {
            self.advance()?;
            let right = self.parse_equality()?;
            left = Expression::Binary(BinaryOp::BitAnd, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.current {
                Token::Equal => BinaryOp::Eq,
                Token::NotEqual => BinaryOp::NotEq,
                Token::StrictEqual => BinaryOp::StrictEq,
                Token::StrictNotEqual => BinaryOp::StrictNotEq,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_relational()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_shift()?;
        loop {
            let op = match self.current {
                Token::LessThan => BinaryOp::Lt,
                Token::GreaterThan => BinaryOp::Gt,
                Token::LessThanEqual => BinaryOp::LtEq,
                Token::GreaterThanEqual => BinaryOp::GtEq,
                Token::Keyword(Keyword::Instanceof) => BinaryOp::Instanceof,
                Token::Keyword(Keyword::In) if !self.no_in => BinaryOp::In,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_shift()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current {
                Token::LeftShift => BinaryOp::LShift,
                Token::RightShift => BinaryOp::RShift,
                Token::UnsignedRightShift => BinaryOp::URShift,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_additive()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_unary()?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let wrap: fn(Box<Expression>) -> Expression = match self.current {
            Token::Keyword(Keyword::Delete) => {
                self.advance()?;
                let operand = self.parse_unary()?;
                if self.strict && matches!(operand, Expression::Identifier(_)) {
                    return Err(self.error("Delete of an unqualified identifier in strict mode."));
                }
                return Ok(Expression::Delete(Box::new(operand)));
            }
            Token::Keyword(Keyword::Typeof) => Expression::Typeof,
            Token::Keyword(Keyword::Void) => Expression::Void,
            Token::Minus => |e| Expression::Unary(UnaryOp::Minus, e),
            Token::Plus => |e| Expression::Unary(UnaryOp::Plus, e),
            Token::Bang => |e| Expression::Unary(UnaryOp::Not, e),
            Token::Tilde => |e| Expression::Unary(UnaryOp::BitNot, e),
            Token::Increment | Token::Decrement => {
                let op = if self.advance()? == Token::Increment {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                let operand = self.parse_unary()?;
                self.check_assignment_target(&operand, "Invalid left-hand side expression in prefix operation")?;
                return Ok(Expression::Update(op, true, Box::new(operand)));
            }
            _ => return self.parse_postfix(),
        };
        self.advance()?;
        let operand = self.parse_unary()?;
        Ok(wrap(Box::new(operand)))
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_left_hand_side_expression()?;
        if self.prev_line_terminator {
            return Ok(expr);
        }
        let op = match self.current {
            Token::Increment => UpdateOp::Increment,
            Token::Decrement => UpdateOp::Decrement,
            _ => return Ok(expr),
        };
        self.check_assignment_target(&expr, "Invalid left-hand side expression in postfix operation")?;
        self.advance()?;
        Ok(Expression::Update(op, false, Box::new(expr)))
    }

    /// Name after `.` or in an object literal key: any IdentifierName,
    /// reserved words included.
    fn identifier_name(&self) -> Option<String> {
        match &self.current {
            Token::Identifier(name) => Some(name.clone()),
            Token::Keyword(kw) => Some(kw.to_string()),
            Token::BooleanLiteral(b) => Some(b.to_string()),
            Token::NullLiteral => Some("null".to_string()),
            _ => None,
        }
    }

    fn parse_dot_member_property(&mut self) -> Result<MemberProperty, ParseError> {
        let name = self.identifier_name().ok_or_else(|| self.unexpected())?;
        self.advance()?;
        Ok(MemberProperty::Dot(name))
    }

    fn parse_computed_member_property(&mut self) -> Result<MemberProperty, ParseError> {
        self.eat(&Token::LeftBracket)?;
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let property = self.parse_expression();
        self.no_in = saved_no_in;
        let property = property?;
        self.eat(&Token::RightBracket)?;
        Ok(MemberProperty::Computed(Box::new(property)))
    }

    pub(super) fn parse_left_hand_side_expression(&mut self) -> Result<Expression, ParseError> {
        let mut expr = if self.current == Token::Keyword(Keyword::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary_expression()?
        };
        loop {
            expr = match self.current {
                Token::Dot => {
                    self.advance()?;
                    Expression::Member(Box::new(expr), self.parse_dot_member_property()?)
                }
                Token::LeftBracket => Expression::Member(Box::new(expr), self.parse_computed_member_property()?),
                Token::LeftParen => Expression::Call(Box::new(expr), self.parse_arguments()?),
                _ => break,
            };
        }
        Ok(expr)
    }

    /// `new callee(args)` where the callee is a member expression; the
    /// argument list is optional.
    fn parse_new_expression(&mut self) -> Result<Expression, ParseError> {
        self.eat(&Token::Keyword(Keyword::New))?;
        let mut callee = if self.current == Token::Keyword(Keyword::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary_expression()?
        };
        loop {
            callee = match self.current {
                Token::Dot => {
                    self.advance()?;
                    Expression::Member(Box::new(callee), self.parse_dot_member_property()?)
                }
                Token::LeftBracket => Expression::Member(Box::new(callee), self.parse_computed_member_property()?),
                _ => break,
            };
        }
        let arguments = if self.current == Token::LeftParen {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Expression::New(Box::new(callee), arguments))
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.eat(&Token::LeftParen)?;
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let mut args = Vec::new();
        let result = loop {
            if self.current == Token::RightParen {
                break Ok(());
            }
            match self.parse_assignment_expression() {
                Ok(arg) => args.push(arg),
                Err(e) => break Err(e),
            }
            if self.current != Token::RightParen
                && let Err(e) = self.eat(&Token::Comma)
            {
                break Err(e);
            }
        };
        self.no_in = saved_no_in;
        result?;
        self.eat(&Token::RightParen)?;
        Ok(args)
    }

    fn parse_primary_expression(&mut self) -> Result<Expression, ParseError> {
        let expr = match &self.current {
            Token::Keyword(Keyword::This) => Expression::This,
            Token::Identifier(name) => {
                let name = name.clone();
                self.check_strict_identifier(&name)?;
                Expression::Identifier(name)
            }
            Token::NumericLiteral(n) => Expression::Literal(Literal::Number(*n)),
            Token::LegacyOctalLiteral(n) => {
                if self.strict {
                    return Err(self.error("Octal literals are not allowed in strict mode."));
                }
                Expression::Literal(Literal::Number(*n))
            }
            Token::StringLiteral { value, legacy_octal } => {
                if self.strict && *legacy_octal {
                    return Err(self.error("Octal escape sequences are not allowed in strict mode."));
                }
                Expression::Literal(Literal::String(value.clone()))
            }
            Token::BooleanLiteral(b) => Expression::Literal(Literal::Boolean(*b)),
            Token::NullLiteral => Expression::Literal(Literal::Null),
            Token::LeftBracket => return self.parse_array_literal(),
            Token::LeftBrace => return self.parse_object_literal(),
            Token::Keyword(Keyword::Function) => return self.parse_function(false).map(Expression::Function),
            Token::LeftParen => {
                self.advance()?;
                let saved_no_in = std::mem::replace(&mut self.no_in, false);
                let expr = self.parse_expression();
                self.no_in = saved_no_in;
                let expr = expr?;
                self.eat(&Token::RightParen)?;
                return Ok(expr);
            }
            _ => return Err(self.unexpected()),
        };
        self.advance()?;
        Ok(expr)
    }

    fn parse_array_literal(&mut self) -> Result<Expression, ParseError> {
        self.eat(&Token::LeftBracket)?;
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let mut elements = Vec::new();
        let result = loop {
            match self.current {
                Token::RightBracket => break Ok(()),
                Token::Comma => {
                    elements.push(None);
                    if let Err(e) = self.advance() {
                        break Err(e);
                    }
                }
                _ => {
                    match self.parse_assignment_expression() {
                        Ok(e) => elements.push(Some(e)),
                        Err(e) => break Err(e),
                    }
                    if self.current != Token::RightBracket
                        && let Err(e) = self.eat(&Token::Comma)
                    {
                        break Err(e);
                    }
                }
            }
        };
        self.no_in = saved_no_in;
        result?;
        self.eat(&Token::RightBracket)?;
        Ok(Expression::Array(elements))
    }

    fn parse_object_literal(&mut self) -> Result<Expression, ParseError> {
        self.eat(&Token::LeftBrace)?;
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let mut properties = Vec::new();
        let result = loop {
            if self.current == Token::RightBrace {
                break Ok(());
            }
            match self.parse_object_property() {
                Ok(p) => properties.push(p),
                Err(e) => break Err(e),
            }
            if self.current != Token::RightBrace
                && let Err(e) = self.eat(&Token::Comma)
            {
                break Err(e);
            }
        };
        self.no_in = saved_no_in;
        result?;
        self.eat(&Token::RightBrace)?;
        Ok(Expression::Object(properties))
    }

    fn parse_property_key(&mut self) -> Result<PropertyKey, ParseError> {
        let key = match &self.current {
            Token::StringLiteral { value, legacy_octal } => {
                if self.strict && *legacy_octal {
                    return Err(self.error("Octal escape sequences are not allowed in strict mode."));
                }
                PropertyKey::String(value.clone())
            }
            Token::NumericLiteral(n) => PropertyKey::Number(*n),
            Token::LegacyOctalLiteral(n) => {
                if self.strict {
                    return Err(self.error("Octal literals are not allowed in strict mode."));
                }
                PropertyKey::Number(*n)
            }
            _ => PropertyKey::Identifier(self.identifier_name().ok_or_else(|| self.unexpected())?),
        };
        self.advance()?;
        Ok(key)
    }

    /// `key: value`, or an accessor `get key() {}` / `set key(v) {}`.
    fn parse_object_property(&mut self) -> Result<Property, ParseError> {
        let start = self.current_token_start;
        let key = self.parse_property_key()?;
        let accessor = match &key {
            PropertyKey::Identifier(word) if self.current != Token::Colon => match word.as_str() {
                "get" => Some(PropertyKind::Get),
                "set" => Some(PropertyKind::Set),
                _ => None,
            },
            _ => None,
        };
        let Some(kind) = accessor else {
            self.eat(&Token::Colon)?;
            let value = self.parse_assignment_expression()?;
            return Ok(Property {
                key,
                value,
                kind: PropertyKind::Init,
            });
        };
        let key = self.parse_property_key()?;
        let node = self.parse_function_rest(start, None)?;
        let arity_ok = match kind {
            PropertyKind::Get => node.params.is_empty(),
            _ => node.params.len() == 1,
        };
        if !arity_ok {
            return Err(self.error(match kind {
                PropertyKind::Get => "Getter must not have any formal parameters.",
                _ => "Setter must have exactly one formal parameter.",
            }));
        }
        Ok(Property {
            key,
            value: Expression::Function(node),
            kind,
        })
    }
}
