use crate::types::number_ops;
use std::fmt;
use std::str::Chars;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    // Identifiers and keywords
    Identifier(String),
    Keyword(Keyword),

    // Literals
    NumericLiteral(f64),
    LegacyOctalLiteral(f64),
    /// `legacy_octal` records an octal escape, which strict code rejects.
    StringLiteral { value: String, legacy_octal: bool },
    BooleanLiteral(bool),
    NullLiteral,

    // Punctuators
    LeftBrace,                // {
    RightBrace,               // }
    LeftParen,                // (
    RightParen,               // )
    LeftBracket,              // [
    RightBracket,             // ]
    Dot,                      // .
    Semicolon,                // ;
    Comma,                    // ,
    LessThan,                 // <
    GreaterThan,              // >
    LessThanEqual,            // <=
    GreaterThanEqual,         // >=
    Equal,                    // ==
    NotEqual,                 // !=
    StrictEqual,              // ===
    StrictNotEqual,           // !==
    Plus,                     // +
    Minus,                    // -
    Star,                     // *
    Percent,                  // %
    Increment,                // ++
    Decrement,                // --
    LeftShift,                // <<
    RightShift,               // >>
    UnsignedRightShift,       // >>>
    Ampersand,                // &
    Pipe,                     // |
    Caret,                    // ^
    Bang,                     // !
    Tilde,                    // ~
    LogicalAnd,               // &&
    LogicalOr,                // ||
    Question,                 // ?
    Colon,                    // :
    Assign,                   // =
    PlusAssign,               // +=
    MinusAssign,              // -=
    StarAssign,               // *=
    PercentAssign,            // %=
    LeftShiftAssign,          // <<=
    RightShiftAssign,         // >>=
    UnsignedRightShiftAssign, // >>>=
    AmpersandAssign,          // &=
    PipeAssign,               // |=
    CaretAssign,              // ^=
    Slash,                    // /
    SlashAssign,              // /=

    // Special
    LineTerminator,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Token::Identifier(name) => return write!(f, "{name}"),
            Token::Keyword(kw) => return write!(f, "{kw}"),
            Token::NumericLiteral(n) | Token::LegacyOctalLiteral(n) => return write!(f, "{n}"),
            Token::StringLiteral { .. } => "string",
            Token::BooleanLiteral(true) => "true",
            Token::BooleanLiteral(false) => "false",
            Token::NullLiteral => "null",
            Token::LeftBrace => "{",
            Token::RightBrace => "}",
            Token::LeftParen => "(",
            Token::RightParen => ")",
            Token::LeftBracket => "[",
            Token::RightBracket => "]",
            Token::Dot => ".",
            Token::Semicolon => ";",
            Token::Comma => ",",
            Token::LessThan => "<",
            Token::GreaterThan => ">",
            Token::LessThanEqual => "<=",
            Token::GreaterThanEqual => ">=",
            Token::Equal => "==",
            Token::NotEqual => "!=",
            Token::StrictEqual => "===",
            Token::StrictNotEqual => "!==",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Percent => "%",
            Token::Increment => "++",
            Token::Decrement => "--",
            Token::LeftShift => "<<",
            Token::RightShift => ">>",
            Token::UnsignedRightShift => ">>>",
            Token::Ampersand => "&",
            Token::Pipe => "|",
            Token::Caret => "^",
            Token::Bang => "!",
            Token::Tilde => "~",
            Token::LogicalAnd => "&&",
            Token::LogicalOr => "||",
            Token::Question => "?",
            Token::Colon => ":",
            Token::Assign => "=",
            Token::PlusAssign => "+=",
            Token::MinusAssign => "-=",
            Token::StarAssign => "*=",
            Token::PercentAssign => "%=",
            Token::LeftShiftAssign => "<<=",
            Token::RightShiftAssign => ">>=",
            Token::UnsignedRightShiftAssign => ">>>=",
            Token::AmpersandAssign => "&=",
            Token::PipeAssign => "|=",
            Token::CaretAssign => "^=",
            Token::Slash => "/",
            Token::SlashAssign => "/=",
            Token::LineTerminator => "line terminator",
            Token::Eof => "end of input",
        };
        write!(f, "{s}")
    }
}

/// ES5 keywords plus the future reserved words that are reserved in
/// sloppy code too. `let` is always a keyword here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    Break,
    Case,
    Catch,
    Class,
    Const,
    Continue,
    Debugger,
    Default,
    Delete,
    Do,
    Else,
    Enum,
    Export,
    Extends,
    Finally,
    For,
    Function,
    If,
    Import,
    In,
    Instanceof,
    Let,
    New,
    Return,
    Super,
    Switch,
    This,
    Throw,
    Try,
    Typeof,
    Var,
    Void,
    While,
    With,
}

impl Keyword {
    pub fn from_str(s: &str) -> Option<Keyword> {
        match s {
            "break" => Some(Keyword::Break),
            "case" => Some(Keyword::Case),
            "catch" => Some(Keyword::Catch),
            "class" => Some(Keyword::Class),
            "const" => Some(Keyword::Const),
            "continue" => Some(Keyword::Continue),
            "debugger" => Some(Keyword::Debugger),
            "default" => Some(Keyword::Default),
            "delete" => Some(Keyword::Delete),
            "do" => Some(Keyword::Do),
            "else" => Some(Keyword::Else),
            "enum" => Some(Keyword::Enum),
            "export" => Some(Keyword::Export),
            "extends" => Some(Keyword::Extends),
            "finally" => Some(Keyword::Finally),
            "for" => Some(Keyword::For),
            "function" => Some(Keyword::Function),
            "if" => Some(Keyword::If),
            "import" => Some(Keyword::Import),
            "in" => Some(Keyword::In),
            "instanceof" => Some(Keyword::Instanceof),
            "let" => Some(Keyword::Let),
            "new" => Some(Keyword::New),
            "return" => Some(Keyword::Return),
            "super" => Some(Keyword::Super),
            "switch" => Some(Keyword::Switch),
            "this" => Some(Keyword::This),
            "throw" => Some(Keyword::Throw),
            "try" => Some(Keyword::Try),
            "typeof" => Some(Keyword::Typeof),
            "var" => Some(Keyword::Var),
            "void" => Some(Keyword::Void),
            "while" => Some(Keyword::While),
            "with" => Some(Keyword::With),
            _ => None,
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Keyword::Break => "break",
            Keyword::Case => "case",
            Keyword::Catch => "catch",
            Keyword::Class => "class",
            Keyword::Const => "const",
            Keyword::Continue => "continue",
            Keyword::Debugger => "debugger",
            Keyword::Default => "default",
            Keyword::Delete => "delete",
            Keyword::Do => "do",
            Keyword::Else => "else",
            Keyword::Enum => "enum",
            Keyword::Export => "export",
            Keyword::Extends => "extends",
            Keyword::Finally => "finally",
            Keyword::For => "for",
            Keyword::Function => "function",
            Keyword::If => "if",
            Keyword::Import => "import",
            Keyword::In => "in",
            Keyword::Instanceof => "instanceof",
            Keyword::Let => "let",
            Keyword::New => "new",
            Keyword::Return => "return",
            Keyword::Super => "super",
            Keyword::Switch => "switch",
            Keyword::This => "this",
            Keyword::Throw => "throw",
            Keyword::Try => "try",
            Keyword::Typeof => "typeof",
            Keyword::Var => "var",
            Keyword::Void => "void",
            Keyword::While => "while",
            Keyword::With => "with",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Debug)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

#[derive(Clone, Debug)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

pub struct Lexer<'a> {
    chars: Chars<'a>,
    current: Option<char>,
    offset: usize,
    token_start: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.chars();
        let current = chars.next();
        Self {
            chars,
            current,
            offset: 0,
            token_start: 0,
            line: 1,
            column: 0,
        }
    }

    /// Byte offset where the most recently lexed token starts.
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    /// Byte offset just past the most recently lexed token.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }

    fn peek(&self) -> Option<char> {
        self.current
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current;
        if let Some(c) = ch {
            self.offset += c.len_utf8();
            self.column += 1;
            self.current = self.chars.next();
        }
        ch
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            location: self.location(),
        }
    }

    fn is_line_terminator(ch: char) -> bool {
        matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
    }

    fn is_whitespace(ch: char) -> bool {
        matches!(
            ch,
            '\t' | '\u{000B}' | '\u{000C}' | ' ' | '\u{00A0}' | '\u{FEFF}'
        ) || ch.is_whitespace() && !Self::is_line_terminator(ch)
    }

    fn is_identifier_start(ch: char) -> bool {
        ch == '_' || ch == '$' || ch.is_ascii_alphabetic() || unicode_id_start(ch)
    }

    fn is_identifier_continue(ch: char) -> bool {
        ch == '_'
            || ch == '$'
            || ch.is_ascii_alphanumeric()
            || ch == '\u{200C}'
            || ch == '\u{200D}'
            || unicode_id_continue(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if Self::is_whitespace(ch) {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if Self::is_line_terminator(ch) {
                break;
            }
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) -> Result<bool, LexError> {
        let mut has_line_terminator = false;
        loop {
            match self.advance() {
                Some('*') => {
                    if self.peek() == Some('/') {
                        self.advance();
                        return Ok(has_line_terminator);
                    }
                }
                Some(ch) if Self::is_line_terminator(ch) => {
                    has_line_terminator = true;
                    self.handle_newline(ch);
                }
                Some(_) => {}
                None => return Err(self.error("Unterminated block comment")),
            }
        }
    }

    fn handle_newline(&mut self, ch: char) {
        if ch == '\r' && self.peek() == Some('\n') {
            self.advance();
        }
        self.line += 1;
        self.column = 0;
    }

    /// Reads a quoted string. Escapes are decoded as UTF-16 code units so
    /// that `\ud83d\ude00` pairs combine; a lone surrogate becomes U+FFFD.
    fn read_string(&mut self, quote: char) -> Result<Token, LexError> {
        let mut units: Vec<u16> = Vec::new();
        let mut legacy_octal = false;
        loop {
            match self.advance() {
                None => return Err(self.error("Unterminated string literal")),
                Some(ch) if ch == quote => break,
                Some(ch) if Self::is_line_terminator(ch) => {
                    return Err(self.error("Unterminated string literal"));
                }
                Some('\\') => {
                    legacy_octal |= self.read_escape_sequence(&mut units)?;
                }
                Some(ch) => {
                    let mut buf = [0u16; 2];
                    units.extend_from_slice(ch.encode_utf16(&mut buf));
                }
            }
        }
        Ok(Token::StringLiteral {
            value: String::from_utf16_lossy(&units),
            legacy_octal,
        })
    }

    /// Decodes one escape into `out`; returns true for a legacy octal escape.
    fn read_escape_sequence(&mut self, out: &mut Vec<u16>) -> Result<bool, LexError> {
        let unit = match self.advance() {
            None => return Err(self.error("Unterminated string literal")),
            Some('n') => 0x0A,
            Some('r') => 0x0D,
            Some('t') => 0x09,
            Some('b') => 0x08,
            Some('f') => 0x0C,
            Some('v') => 0x0B,
            Some('0') if !self.peek().is_some_and(|c| c.is_ascii_digit()) => 0,
            Some(ch @ '0'..='7') => {
                let mut val = digit_value(ch);
                if let Some(d) = self.peek().filter(|c| ('0'..='7').contains(c)) {
                    self.advance();
                    val = val * 8 + digit_value(d);
                    if ch <= '3'
                        && let Some(d) = self.peek().filter(|c| ('0'..='7').contains(c))
                    {
                        self.advance();
                        val = val * 8 + digit_value(d);
                    }
                }
                out.push(val as u16);
                return Ok(true);
            }
            Some(ch @ ('8' | '9')) => {
                out.push(ch as u16);
                return Ok(true);
            }
            Some('x') => self.read_hex_digits(2, "Invalid hexadecimal escape sequence")?,
            Some('u') => self.read_hex_digits(4, "Invalid Unicode escape sequence")?,
            Some(ch) if Self::is_line_terminator(ch) => {
                // line continuation
                self.handle_newline(ch);
                return Ok(false);
            }
            Some(ch) => {
                let mut buf = [0u16; 2];
                out.extend_from_slice(ch.encode_utf16(&mut buf));
                return Ok(false);
            }
        };
        out.push(unit);
        Ok(false)
    }

    fn read_hex_digits(&mut self, count: usize, message: &str) -> Result<u16, LexError> {
        let mut val: u32 = 0;
        for _ in 0..count {
            let d = self
                .peek()
                .and_then(hex_val)
                .ok_or_else(|| self.error(message))?;
            self.advance();
            val = val * 16 + d;
        }
        Ok(val as u16)
    }

    fn read_numeric_literal(&mut self, first: char) -> Result<Token, LexError> {
        let start = self.token_start;
        let mut s = String::new();
        s.push(first);

        if first == '0' {
            match self.peek() {
                Some('x' | 'X') => return self.read_hex_literal(),
                Some(c) if c.is_ascii_digit() => return self.read_legacy_octal_or_decimal(s),
                _ => {}
            }
        }

        if first != '.' {
            self.read_decimal_digits(&mut s);
            if self.peek() == Some('.') {
                s.push('.');
                self.advance();
            }
        }
        self.read_decimal_digits(&mut s);
        self.read_exponent(&mut s)?;
        self.check_literal_end()?;

        let val: f64 = s
            .parse()
            .map_err(|_| self.error(format!("Invalid numeric literal at offset {start}")))?;
        Ok(Token::NumericLiteral(val))
    }

    fn read_decimal_digits(&mut self, s: &mut String) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                s.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_exponent(&mut self, s: &mut String) -> Result<(), LexError> {
        let Some(e) = self.peek().filter(|c| *c == 'e' || *c == 'E') else {
            return Ok(());
        };
        s.push(e);
        self.advance();
        if let Some(sign) = self.peek().filter(|c| *c == '+' || *c == '-') {
            s.push(sign);
            self.advance();
        }
        if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
            return Err(self.error("Invalid or unexpected token"));
        }
        self.read_decimal_digits(s);
        Ok(())
    }

    // §7.8.3: the source character after a numeric literal must not be an
    // identifier start or a digit
    fn check_literal_end(&self) -> Result<(), LexError> {
        match self.peek() {
            Some(c) if Self::is_identifier_start(c) || c == '\\' => {
                Err(self.error("Invalid or unexpected token"))
            }
            _ => Ok(()),
        }
    }

    fn read_hex_literal(&mut self) -> Result<Token, LexError> {
        self.advance(); // x/X
        let mut digits = Vec::new();
        while let Some(d) = self.peek().and_then(hex_val) {
            digits.push(d as u8);
            self.advance();
        }
        if digits.is_empty() {
            return Err(self.error("Invalid or unexpected token"));
        }
        self.check_literal_end()?;
        Ok(Token::NumericLiteral(number_ops::from_hex_digits(&digits)))
    }

    fn read_legacy_octal_or_decimal(&mut self, mut s: String) -> Result<Token, LexError> {
        let mut is_octal = true;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                if ch >= '8' {
                    is_octal = false;
                }
                s.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        if is_octal {
            self.check_literal_end()?;
            let val = s[1..]
                .chars()
                .fold(0.0f64, |acc, c| acc * 8.0 + f64::from(digit_value(c)));
            return Ok(Token::LegacyOctalLiteral(val));
        }
        // 08 and 09 read as decimal
        if self.peek() == Some('.') {
            s.push('.');
            self.advance();
            self.read_decimal_digits(&mut s);
        }
        self.read_exponent(&mut s)?;
        self.check_literal_end()?;
        let val: f64 = s.parse().map_err(|_| self.error("Invalid numeric literal"))?;
        Ok(Token::LegacyOctalLiteral(val))
    }

    fn read_identifier_part(&mut self, name: &mut String) -> Result<bool, LexError> {
        match self.peek() {
            Some(ch) if Self::is_identifier_continue(ch) => {
                name.push(ch);
                self.advance();
                Ok(false)
            }
            Some('\\') => {
                self.advance();
                let ch = self.read_identifier_escape()?;
                if !Self::is_identifier_continue(ch) {
                    return Err(self.error("Invalid Unicode escape sequence"));
                }
                name.push(ch);
                Ok(true)
            }
            _ => Err(self.error("Invalid or unexpected token")),
        }
    }

    fn read_identifier_escape(&mut self) -> Result<char, LexError> {
        if self.advance() != Some('u') {
            return Err(self.error("Invalid Unicode escape sequence"));
        }
        let unit = self.read_hex_digits(4, "Invalid Unicode escape sequence")?;
        char::from_u32(u32::from(unit)).ok_or_else(|| self.error("Invalid Unicode escape sequence"))
    }

    fn read_identifier(&mut self, first: char) -> Result<Token, LexError> {
        let mut name = String::new();
        let mut escaped = false;
        if first == '\\' {
            let ch = self.read_identifier_escape()?;
            if !Self::is_identifier_start(ch) {
                return Err(self.error("Invalid Unicode escape sequence"));
            }
            name.push(ch);
            escaped = true;
        } else {
            name.push(first);
        }
        while self
            .peek()
            .is_some_and(|c| c == '\\' || Self::is_identifier_continue(c))
        {
            escaped |= self.read_identifier_part(&mut name)?;
        }

        let token = match name.as_str() {
            "true" => Token::BooleanLiteral(true),
            "false" => Token::BooleanLiteral(false),
            "null" => Token::NullLiteral,
            _ => match Keyword::from_str(&name) {
                Some(kw) => Token::Keyword(kw),
                None => return Ok(Token::Identifier(name)),
            },
        };
        if escaped {
            return Err(self.error("Keyword must not contain escaped characters"));
        }
        Ok(token)
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        loop {
            self.skip_whitespace();
            self.token_start = self.offset;

            let ch = match self.peek() {
                None => return Ok(Token::Eof),
                Some(ch) => ch,
            };

            if Self::is_line_terminator(ch) {
                self.advance();
                self.handle_newline(ch);
                return Ok(Token::LineTerminator);
            }

            if ch == '/' {
                if self.peek_next() == Some('/') {
                    self.advance();
                    self.advance();
                    self.skip_line_comment();
                    continue;
                }
                if self.peek_next() == Some('*') {
                    self.advance();
                    self.advance();
                    if self.skip_block_comment()? {
                        return Ok(Token::LineTerminator);
                    }
                    continue;
                }
            }

            // Hashbang
            if ch == '#' && self.offset == 0 && self.peek_next() == Some('!') {
                self.skip_line_comment();
                continue;
            }

            self.advance();

            if ch == '\'' || ch == '"' {
                return self.read_string(ch);
            }

            if ch.is_ascii_digit() {
                return self.read_numeric_literal(ch);
            }
            if ch == '.' && self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return self.read_numeric_literal(ch);
            }

            if ch == '\\' || Self::is_identifier_start(ch) {
                return self.read_identifier(ch);
            }

            return self.read_punctuator(ch);
        }
    }

    /// Consumes `next` when it is the upcoming character.
    fn follow(&mut self, next: char) -> bool {
        if self.peek() == Some(next) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn read_punctuator(&mut self, ch: char) -> Result<Token, LexError> {
        let token = match ch {
            '{' => Token::LeftBrace,
            '}' => Token::RightBrace,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '[' => Token::LeftBracket,
            ']' => Token::RightBracket,
            ';' => Token::Semicolon,
            ',' => Token::Comma,
            '~' => Token::Tilde,
            ':' => Token::Colon,
            '?' => Token::Question,
            '.' => Token::Dot,
            '<' => {
                if self.follow('<') {
                    if self.follow('=') {
                        Token::LeftShiftAssign
                    } else {
                        Token::LeftShift
                    }
                } else if self.follow('=') {
                    Token::LessThanEqual
                } else {
                    Token::LessThan
                }
            }
            '>' => {
                if self.follow('>') {
                    if self.follow('>') {
                        if self.follow('=') {
                            Token::UnsignedRightShiftAssign
                        } else {
                            Token::UnsignedRightShift
                        }
                    } else if self.follow('=') {
                        Token::RightShiftAssign
                    } else {
                        Token::RightShift
                    }
                } else if self.follow('=') {
                    Token::GreaterThanEqual
                } else {
                    Token::GreaterThan
                }
            }
            '=' => {
                if self.follow('=') {
                    if self.follow('=') {
                        Token::StrictEqual
                    } else {
                        Token::Equal
                    }
                } else {
                    Token::Assign
                }
            }
            '!' => {
                if self.follow('=') {
                    if self.follow('=') {
                        Token::StrictNotEqual
                    } else {
                        Token::NotEqual
                    }
                } else {
                    Token::Bang
                }
            }
            '+' => {
                if self.follow('+') {
                    Token::Increment
                } else if self.follow('=') {
                    Token::PlusAssign
                } else {
                    Token::Plus
                }
            }
            '-' => {
                if self.follow('-') {
                    Token::Decrement
                } else if self.follow('=') {
                    Token::MinusAssign
                } else {
                    Token::Minus
                }
            }
            '*' => {
                if self.follow('=') {
                    Token::StarAssign
                } else {
                    Token::Star
                }
            }
            '/' => {
                if self.follow('=') {
                    Token::SlashAssign
                } else {
                    Token::Slash
                }
            }
            '%' => {
                if self.follow('=') {
                    Token::PercentAssign
                } else {
                    Token::Percent
                }
            }
            '&' => {
                if self.follow('&') {
                    Token::LogicalAnd
                } else if self.follow('=') {
                    Token::AmpersandAssign
                } else {
                    Token::Ampersand
                }
            }
            '|' => {
                if self.follow('|') {
                    Token::LogicalOr
                } else if self.follow('=') {
                    Token::PipeAssign
                } else {
                    Token::Pipe
                }
            }
            '^' => {
                if self.follow('=') {
                    Token::CaretAssign
                } else {
                    Token::Caret
                }
            }
            _ => return Err(self.error(format!("Invalid or unexpected token '{ch}'"))),
        };
        Ok(token)
    }

    pub fn tokenize_all(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if token == Token::Eof {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }
}

fn digit_value(ch: char) -> u32 {
    ch as u32 - '0' as u32
}

fn hex_val(ch: char) -> Option<u32> {
    ch.to_digit(16)
}

fn unicode_id_start(ch: char) -> bool {
    !ch.is_ascii() && unicode_ident::is_xid_start(ch)
}

fn unicode_id_continue(ch: char) -> bool {
    !ch.is_ascii() && unicode_ident::is_xid_continue(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(src);
        lexer.tokenize_all().unwrap()
    }

    fn lex_no_lt(src: &str) -> Vec<Token> {
        lex(src)
            .into_iter()
            .filter(|t| !matches!(t, Token::LineTerminator))
            .collect()
    }

    fn string(value: &str) -> Token {
        Token::StringLiteral {
            value: value.into(),
            legacy_octal: false,
        }
    }

    #[test]
    fn empty_source() {
        assert_eq!(lex(""), vec![Token::Eof]);
    }

    #[test]
    fn identifiers_and_keywords() {
        assert_eq!(
            lex_no_lt("var x = 42;"),
            vec![
                Token::Keyword(Keyword::Var),
                Token::Identifier("x".into()),
                Token::Assign,
                Token::NumericLiteral(42.0),
                Token::Semicolon,
                Token::Eof,
            ]
        );
        assert_eq!(
            lex_no_lt("yield async"),
            vec![
                Token::Identifier("yield".into()),
                Token::Identifier("async".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn string_literals() {
        assert_eq!(lex_no_lt(r#""hello""#), vec![string("hello"), Token::Eof]);
        assert_eq!(lex_no_lt(r"'he\nllo'"), vec![string("he\nllo"), Token::Eof]);
        assert_eq!(lex_no_lt("'a\\\nb'"), vec![string("ab"), Token::Eof]);
        assert!(Lexer::new("'open").tokenize_all().is_err());
        assert!(Lexer::new("'line\nbreak'").tokenize_all().is_err());
    }

    #[test]
    fn octal_escapes_are_flagged() {
        assert_eq!(
            lex_no_lt(r"'\101\0'"),
            vec![
                Token::StringLiteral {
                    value: "A\0".into(),
                    legacy_octal: true,
                },
                Token::Eof
            ]
        );
        assert_eq!(lex_no_lt(r"'\0'"), vec![string("\0"), Token::Eof]);
    }

    #[test]
    fn numeric_literals() {
        assert_eq!(lex_no_lt("0xff"), vec![Token::NumericLiteral(255.0), Token::Eof]);
        assert_eq!(
            lex_no_lt("0x1000000000000081"),
            vec![Token::NumericLiteral(2f64.powi(60) + 256.0), Token::Eof]
        );
        assert_eq!(lex_no_lt("1e3"), vec![Token::NumericLiteral(1000.0), Token::Eof]);
        assert_eq!(lex_no_lt(".5"), vec![Token::NumericLiteral(0.5), Token::Eof]);
        assert_eq!(lex_no_lt("5."), vec![Token::NumericLiteral(5.0), Token::Eof]);
        assert_eq!(lex_no_lt("2.5e-1"), vec![Token::NumericLiteral(0.25), Token::Eof]);
        assert_eq!(lex_no_lt("017"), vec![Token::LegacyOctalLiteral(15.0), Token::Eof]);
        assert_eq!(lex_no_lt("019"), vec![Token::LegacyOctalLiteral(19.0), Token::Eof]);
        assert!(Lexer::new("3in x").tokenize_all().is_err());
        assert!(Lexer::new("0x").tokenize_all().is_err());
        assert!(Lexer::new("1e+").tokenize_all().is_err());
    }

    #[test]
    fn boolean_null() {
        assert_eq!(
            lex_no_lt("true false null"),
            vec![
                Token::BooleanLiteral(true),
                Token::BooleanLiteral(false),
                Token::NullLiteral,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn punctuators() {
        assert_eq!(lex_no_lt("==="), vec![Token::StrictEqual, Token::Eof]);
        assert_eq!(lex_no_lt("!=="), vec![Token::StrictNotEqual, Token::Eof]);
        assert_eq!(
            lex_no_lt(">>>="),
            vec![Token::UnsignedRightShiftAssign, Token::Eof]
        );
        assert_eq!(
            lex_no_lt("a.b"),
            vec![
                Token::Identifier("a".into()),
                Token::Dot,
                Token::Identifier("b".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn comments() {
        assert_eq!(
            lex_no_lt("// comment\n42"),
            vec![Token::NumericLiteral(42.0), Token::Eof]
        );
        assert_eq!(
            lex("/* a\nb */ 42"),
            vec![Token::LineTerminator, Token::NumericLiteral(42.0), Token::Eof]
        );
        assert!(Lexer::new("/* open").tokenize_all().is_err());
    }

    #[test]
    fn unicode_escapes() {
        assert_eq!(lex_no_lt(r#""\u0041""#), vec![string("A"), Token::Eof]);
        assert_eq!(
            lex_no_lt(r#""\ud83d\ude00""#),
            vec![string("\u{1F600}"), Token::Eof]
        );
        assert_eq!(lex_no_lt(r#""\ud800""#), vec![string("\u{FFFD}"), Token::Eof]);
        assert_eq!(
            lex_no_lt(r"a\u0062"),
            vec![Token::Identifier("ab".into()), Token::Eof]
        );
        assert!(Lexer::new(r"v\u0061r").tokenize_all().is_err());
    }

    #[test]
    fn token_offsets() {
        let mut lexer = Lexer::new("  foo  bar");
        assert_eq!(lexer.next_token().unwrap(), Token::Identifier("foo".into()));
        assert_eq!((lexer.token_start(), lexer.offset()), (2, 5));
        lexer.next_token().unwrap();
        assert_eq!((lexer.token_start(), lexer.offset()), (7, 10));
    }
}
