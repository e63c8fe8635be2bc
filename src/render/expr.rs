//! Expressions used by template and on-render bindings.
//!
//! Two small languages live here:
//! - template conditions (`a && !b || c`): flags combined with AND, OR and
//!   negation, each flag tested by a caller-supplied predicate
//! - on-render arguments: literals and `page.*` paths combined with `!`,
//!   `==`, `!=`, `&&`, `||` and parentheses, evaluated against the page
//!   document as JSON

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("unexpected character '{ch}' at offset {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("expected {expected}, found {found}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
    },

    #[error("unexpected end of input, expected {0}")]
    UnexpectedEnd(&'static str),

    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Evaluate a template condition. `&&` binds tighter than `||`; a leading
/// `!` negates a single flag.
pub fn eval_flags(expr: &str, is_set: impl Fn(&str) -> bool) -> bool {
    expr.split("||").any(|term| {
        term.split("&&").all(|factor| {
            let factor = factor.trim();
            match factor.strip_prefix('!') {
                Some(flag) => !is_set(flag.trim()),
                None => is_set(factor),
            }
        })
    })
}

// ----- tokens -----

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    Dot,
    Comma,
    Semi,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Not,
    Eq,
    Ne,
    And,
    Or,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(s) => format!("identifier '{s}'"),
            Token::Str(s) => format!("string '{s}'"),
            Token::Num(n) => format!("number {n}"),
            other => format!("{other:?}"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    let at = |i: usize| chars.get(i).copied();

    while let Some(ch) = at(pos) {
        match ch {
            c if c.is_whitespace() => pos += 1,
            '.' => {
                tokens.push(Token::Dot);
                pos += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                pos += 1;
            }
            ';' => {
                tokens.push(Token::Semi);
                pos += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                pos += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                pos += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                pos += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                pos += 1;
            }
            '!' | '=' => {
                let negated = ch == '!';
                if at(pos + 1) == Some('=') {
                    // `==`/`===` and `!=`/`!==` compare the same way
                    pos += if at(pos + 2) == Some('=') { 3 } else { 2 };
                    tokens.push(if negated { Token::Ne } else { Token::Eq });
                } else if negated {
                    tokens.push(Token::Not);
                    pos += 1;
                } else {
                    return Err(ExprError::UnexpectedChar { ch, pos });
                }
            }
            '&' | '|' => {
                if at(pos + 1) != Some(ch) {
                    return Err(ExprError::UnexpectedChar { ch, pos });
                }
                tokens.push(if ch == '&' { Token::And } else { Token::Or });
                pos += 2;
            }
            '\'' | '"' => {
                let mut value = String::new();
                pos += 1;
                loop {
                    match at(pos) {
                        None => return Err(ExprError::UnterminatedString),
                        Some(c) if c == ch => break,
                        Some('\\') => {
                            let escaped = at(pos + 1).ok_or(ExprError::UnterminatedString)?;
                            value.push(match escaped {
                                'n' => '\n',
                                't' => '\t',
                                other => other,
                            });
                            pos += 2;
                        }
                        Some(c) => {
                            value.push(c);
                            pos += 1;
                        }
                    }
                }
                pos += 1;
                tokens.push(Token::Str(value));
            }
            c if c.is_ascii_digit() || (c == '-' && at(pos + 1).is_some_and(|d| d.is_ascii_digit())) => {
                let start = pos;
                pos += 1;
                while at(pos).is_some_and(|d| d.is_ascii_digit() || d == '.') {
                    pos += 1;
                }
                let text: String = chars[start..pos].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| ExprError::InvalidNumber(text.clone()))?;
                tokens.push(Token::Num(value));
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = pos;
                while at(pos).is_some_and(|d| d.is_alphanumeric() || d == '_' || d == '$') {
                    pos += 1;
                }
                tokens.push(Token::Ident(chars[start..pos].iter().collect()));
            }
            _ => return Err(ExprError::UnexpectedChar { ch, pos }),
        }
    }
    Ok(tokens)
}

// ----- syntax tree -----

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Path below the page document (`page.properties.x` → `["properties", "x"]`).
    Path(Vec<String>),
    Not(Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Evaluate against the page document. `&&` and `||` yield one of their
    /// operands, missing paths yield `null`.
    pub fn eval(&self, page: &Value) -> Value {
        match self {
            Expr::Literal(v) => v.clone(),
            Expr::Path(segments) => lookup(page, segments),
            Expr::Not(inner) => Value::Bool(!truthy(&inner.eval(page))),
            Expr::Eq(a, b) => Value::Bool(loose_eq(&a.eval(page), &b.eval(page))),
            Expr::Ne(a, b) => Value::Bool(!loose_eq(&a.eval(page), &b.eval(page))),
            Expr::And(a, b) => {
                let left = a.eval(page);
                if truthy(&left) {
                    b.eval(page)
                } else {
                    left
                }
            }
            Expr::Or(a, b) => {
                let left = a.eval(page);
                if truthy(&left) {
                    left
                } else {
                    b.eval(page)
                }
            }
        }
    }
}

fn lookup(root: &Value, segments: &[String]) -> Value {
    let mut current = root;
    for segment in segments {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(v) => current = v,
            None => return Value::Null,
        }
    }
    current.clone()
}

/// Truthiness of a JSON value: `null`, `false`, `0` and `""` are false.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            s.trim().parse::<f64>().ok() == n.as_f64()
        }
        _ => a == b,
    }
}

/// String form of a value as passed to helpers; `null` is empty.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(to_text).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

// ----- parser -----

/// Nesting limit for parentheses, negations and operator chains.
const MAX_DEPTH: usize = 64;

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub(crate) fn new(input: &str) -> Result<Self, ExprError> {
        Ok(Self {
            tokens: tokenize(input)?,
            pos: 0,
            depth: 0,
        })
    }

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(crate) fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &'static str) -> ExprError {
        match self.peek() {
            Some(token) => ExprError::UnexpectedToken {
                expected,
                found: token.describe(),
            },
            None => ExprError::UnexpectedEnd(expected),
        }
    }

    pub(crate) fn expect(&mut self, token: &Token, expected: &'static str) -> Result<(), ExprError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    pub(crate) fn ident(&mut self) -> Result<String, ExprError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn descend(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    pub(crate) fn expression(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        let mut left = self.and()?;
        while self.eat(&Token::Or) {
            self.descend()?;
            left = Expr::Or(Box::new(left), Box::new(self.and()?));
        }
        self.depth = base;
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        let mut left = self.equality()?;
        while self.eat(&Token::And) {
            self.descend()?;
            left = Expr::And(Box::new(left), Box::new(self.equality()?));
        }
        self.depth = base;
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        let mut left = self.unary()?;
        loop {
            if self.eat(&Token::Eq) {
                self.descend()?;
                left = Expr::Eq(Box::new(left), Box::new(self.unary()?));
            } else if self.eat(&Token::Ne) {
                self.descend()?;
                left = Expr::Ne(Box::new(left), Box::new(self.unary()?));
            } else {
                self.depth = base;
                return Ok(left);
            }
        }
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&Token::Not) {
            self.descend()?;
            let operand = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let token = self.peek().cloned().ok_or(ExprError::UnexpectedEnd("expression"))?;
        self.pos += 1;
        match token {
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::Num(n) => Ok(Expr::Literal(
                serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null),
            )),
            Token::LParen => {
                self.descend()?;
                let inner = self.expression()?;
                self.expect(&Token::RParen, "')'")?;
                self.depth -= 1;
                Ok(inner)
            }
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" | "undefined" => Ok(Expr::Literal(Value::Null)),
                "page" => self.path(),
                _ => Err(ExprError::UnknownIdentifier(name)),
            },
            other => {
                self.pos -= 1;
                Err(ExprError::UnexpectedToken {
                    expected: "expression",
                    found: other.describe(),
                })
            }
        }
    }

    fn path(&mut self) -> Result<Expr, ExprError> {
        let mut segments = Vec::new();
        loop {
            if self.eat(&Token::Dot) {
                segments.push(self.ident()?);
            } else if self.eat(&Token::LBracket) {
                let segment = match self.peek().cloned() {
                    Some(Token::Str(s)) => s,
                    Some(Token::Num(n)) if n >= 0.0 && n.fract() == 0.0 => (n as u64).to_string(),
                    _ => return Err(self.unexpected("string or index")),
                };
                self.pos += 1;
                self.expect(&Token::RBracket, "']'")?;
                segments.push(segment);
            } else {
                return Ok(Expr::Path(segments));
            }
        }
    }
}

/// Parse a complete expression.
pub fn parse_expr(input: &str) -> Result<Expr, ExprError> {
    let mut parser = Parser::new(input)?;
    let expr = parser.expression()?;
    if !parser.at_end() {
        return Err(parser.unexpected("end of expression"));
    }
    Ok(expr)
}
