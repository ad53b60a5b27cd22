//! `calculate`: a restricted arithmetic evaluator.
//!
//! Grammar (Python-style precedence, `**` binds tighter than unary minus and
//! is right-associative):
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := primary ('**' unary)?
//! primary := number | '(' expr ')'
//! ```
//!
//! Anything else (names, calls, `^`, `%`) is rejected. Nothing is executed.

use serde_json::{json, Value};

use crate::tools::arguments::CalculateArgs;
use crate::tools::error::ToolError;

const MAX_EXPRESSION_LEN: usize = 256;
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Pow,
    LParen,
    RParen,
}

#[derive(Debug, PartialEq)]
enum CalcError {
    Syntax,
    DivisionByZero,
    TooDeep,
}

pub fn calculate(args: &CalculateArgs) -> Result<Value, ToolError> {
    let expression = args.expression.trim();
    if expression.is_empty() {
        return Err(ToolError::invalid_arguments("Expression cannot be empty"));
    }
    if expression.len() > MAX_EXPRESSION_LEN {
        return Err(ToolError::invalid_arguments(format!(
            "Expression is longer than {MAX_EXPRESSION_LEN} characters"
        )));
    }

    let result = evaluate(expression).map_err(|err| match err {
        CalcError::DivisionByZero => ToolError::invalid_arguments("Division by zero"),
        CalcError::TooDeep => ToolError::invalid_arguments("Expression is nested too deeply"),
        CalcError::Syntax => ToolError::invalid_arguments(format!(
            "Invalid mathematical expression: '{expression}'. Only basic arithmetic is supported: +, -, *, /, **"
        )),
    })?;
    if !result.is_finite() {
        return Err(ToolError::invalid_arguments(format!(
            "Result of '{expression}' is not a finite number"
        )));
    }

    Ok(json!({
        "expression": args.expression,
        "result": result,
        "formatted": format!("{expression} = {result}"),
    }))
}

fn evaluate(src: &str) -> Result<f64, CalcError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expr(0)?;
    if parser.pos != parser.tokens.len() {
        return Err(CalcError::Syntax);
    }
    Ok(value)
}

fn tokenize(src: &str) -> Result<Vec<Token>, CalcError> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        let token = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
                continue;
            }
            b'0'..=b'9' | b'.' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.' || bytes[i] == b'_') {
                    i += 1;
                }
                if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                    i += 1;
                    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
                        i += 1;
                    }
                    let digits = i;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                    if i == digits {
                        return Err(CalcError::Syntax);
                    }
                }
                let literal: String = src[start..i].chars().filter(|c| *c != '_').collect();
                tokens.push(Token::Num(literal.parse().map_err(|_| CalcError::Syntax)?));
                continue;
            }
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' if bytes.get(i + 1) == Some(&b'*') => {
                i += 1;
                Token::Pow
            }
            b'*' => Token::Star,
            b'/' => Token::Slash,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            _ => return Err(CalcError::Syntax),
        };
        tokens.push(token);
        i += 1;
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expr(&mut self, depth: usize) -> Result<f64, CalcError> {
        if depth > MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }
        let mut value = self.term(depth)?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term(depth)?;
            value = if op == Token::Plus { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self, depth: usize) -> Result<f64, CalcError> {
        let mut value = self.unary(depth)?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            self.pos += 1;
            let rhs = self.unary(depth)?;
            value = if op == Token::Star {
                value * rhs
            } else if rhs == 0.0 {
                return Err(CalcError::DivisionByZero);
            } else {
                value / rhs
            };
        }
        Ok(value)
    }

    fn unary(&mut self, depth: usize) -> Result<f64, CalcError> {
        if depth > MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }
        match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary(depth + 1)
            }
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(-self.unary(depth + 1)?)
            }
            _ => self.power(depth),
        }
    }

    fn power(&mut self, depth: usize) -> Result<f64, CalcError> {
        let base = self.primary(depth)?;
        if self.peek() == Some(Token::Pow) {
            self.pos += 1;
            let exponent = self.unary(depth + 1)?;
            if base == 0.0 && exponent < 0.0 {
                return Err(CalcError::DivisionByZero);
            }
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self, depth: usize) -> Result<f64, CalcError> {
        match self.bump() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr(depth + 1)?;
                match self.bump() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(CalcError::Syntax),
                }
            }
            _ => Err(CalcError::Syntax),
        }
    }
}
