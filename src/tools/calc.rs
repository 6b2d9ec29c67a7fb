/// Calculator Tool
///
/// Evaluates arithmetic expressions with a small recursive-descent parser.
/// Supports `+ - * / // % ** ^`, unary signs, parentheses, the constants `pi`
/// and `e`, and a fixed set of math functions. `^` is treated as power.

use serde_json::{Value, json};

use crate::core::error::{RegistryError, ToolError};
use crate::core::registry::{ContentItem, ToolOutput, ToolRegistry, ToolSpec};
use crate::tools::required_str;

pub fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    let tool = ToolSpec::new(
        "calculate",
        "Perform mathematical calculations. Supports +, -, *, /, **, sqrt, sin, cos, tan, log, abs, round, floor, ceil.",
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Mathematical expression to evaluate (e.g., '2 + 2', 'sqrt(16)', '10 ** 2')"
                }
            },
            "required": ["expression"]
        }),
    );
    registry.register(tool, handle)
}

fn handle(args: &Value) -> ToolOutput {
    let expression = required_str(args, "expression")?;
    let value = evaluate(expression)?;
    Ok(vec![ContentItem::text(format!(
        "{} = {}",
        expression,
        format_number(value)
    ))])
}

/// Evaluate an expression to a finite number.
pub fn evaluate(expression: &str) -> Result<f64, ToolError> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expression()?;
    if let Some(token) = parser.peek() {
        return Err(ToolError::Expression(format!("unexpected {token}")));
    }
    if value.is_nan() {
        return Err(ToolError::Expression("math domain error".into()));
    }
    if value.is_infinite() {
        return Err(ToolError::Expression("result out of range".into()));
    }
    Ok(value)
}

/// Integral values print without a fractional part.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    Power,
    LParen,
    RParen,
    Comma,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {n}"),
            Token::Ident(name) => write!(f, "name '{name}'"),
            Token::Plus => f.write_str("'+'"),
            Token::Minus => f.write_str("'-'"),
            Token::Star => f.write_str("'*'"),
            Token::Slash => f.write_str("'/'"),
            Token::DoubleSlash => f.write_str("'//'"),
            Token::Percent => f.write_str("'%'"),
            Token::Power => f.write_str("'**'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::Comma => f.write_str("','"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ToolError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Exponent suffix: 1e3, 2.5E-4
                if i < chars.len() && matches!(chars[i], 'e' | 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && matches!(chars[j], '+' | '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let number = literal
                    .parse::<f64>()
                    .map_err(|_| ToolError::Expression(format!("invalid number '{literal}'")))?;
                tokens.push(Token::Number(number));
                continue;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
                continue;
            }
            '+' => tokens.push(Token::Plus),
            '-' => tokens.push(Token::Minus),
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Power);
                i += 1;
            }
            '*' => tokens.push(Token::Star),
            '/' if chars.get(i + 1) == Some(&'/') => {
                tokens.push(Token::DoubleSlash);
                i += 1;
            }
            '/' => tokens.push(Token::Slash),
            '%' => tokens.push(Token::Percent),
            '^' => tokens.push(Token::Power),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            ',' => tokens.push(Token::Comma),
            other => {
                return Err(ToolError::Expression(format!("unexpected character '{other}'")));
            }
        }
        i += 1;
    }

    Ok(tokens)
}

/// Maximum nesting of signs, parentheses, powers and call arguments.
const MAX_DEPTH: usize = 256;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ToolError> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(ToolError::Expression(format!("expected {expected}, found {token}"))),
            None => Err(ToolError::Expression(format!("expected {expected}, found end of input"))),
        }
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<f64, ToolError> {
        let mut value = self.term()?;
        loop {
            if self.eat(&Token::Plus) {
                value += self.term()?;
            } else if self.eat(&Token::Minus) {
                value -= self.term()?;
            } else {
                return Ok(value);
            }
        }
    }

    // term := unary (('*' | '/' | '//' | '%') unary)*
    fn term(&mut self) -> Result<f64, ToolError> {
        let mut value = self.unary()?;
        loop {
            if self.eat(&Token::Star) {
                value *= self.unary()?;
            } else if self.eat(&Token::Slash) {
                value /= nonzero(self.unary()?)?;
            } else if self.eat(&Token::DoubleSlash) {
                value = (value / nonzero(self.unary()?)?).floor();
            } else if self.eat(&Token::Percent) {
                let divisor = nonzero(self.unary()?)?;
                // Result takes the sign of the divisor.
                value = value - divisor * (value / divisor).floor();
            } else {
                return Ok(value);
            }
        }
    }

    // unary := ('+' | '-') unary | power
    //
    // Every recursive path (signs, parentheses, call arguments, exponents)
    // passes through here, so this is where nesting is bounded.
    fn unary(&mut self) -> Result<f64, ToolError> {
        if self.depth >= MAX_DEPTH {
            return Err(ToolError::Expression("expression nested too deeply".into()));
        }
        self.depth += 1;
        let value = if self.eat(&Token::Minus) {
            self.unary().map(|v| -v)
        } else if self.eat(&Token::Plus) {
            self.unary()
        } else {
            self.power()
        };
        self.depth -= 1;
        value
    }

    // power := primary ('**' unary)?   (right associative)
    fn power(&mut self) -> Result<f64, ToolError> {
        let base = self.primary()?;
        if self.eat(&Token::Power) {
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, ToolError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(value)
            }
            Some(Token::Ident(name)) => {
                if self.eat(&Token::LParen) {
                    let args = self.arguments()?;
                    call_function(&name, &args)
                } else {
                    constant(&name)
                }
            }
            Some(token) => Err(ToolError::Expression(format!("unexpected {token}"))),
            None => Err(ToolError::Expression("unexpected end of input".into())),
        }
    }

    fn arguments(&mut self) -> Result<Vec<f64>, ToolError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(Token::RParen)?;
            return Ok(args);
        }
    }
}

fn nonzero(divisor: f64) -> Result<f64, ToolError> {
    if divisor == 0.0 {
        Err(ToolError::Expression("division by zero".into()))
    } else {
        Ok(divisor)
    }
}

fn constant(name: &str) -> Result<f64, ToolError> {
    match name {
        "pi" => Ok(std::f64::consts::PI),
        "e" => Ok(std::f64::consts::E),
        _ => Err(ToolError::Expression(format!("name '{name}' is not defined"))),
    }
}

fn call_function(name: &str, args: &[f64]) -> Result<f64, ToolError> {
    let arity = |expected: usize| -> Result<(), ToolError> {
        if args.len() == expected {
            Ok(())
        } else {
            Err(ToolError::Expression(format!(
                "{name}() takes {expected} argument(s), got {}",
                args.len()
            )))
        }
    };
    let non_empty = || -> Result<(), ToolError> {
        if args.is_empty() {
            Err(ToolError::Expression(format!("{name}() needs at least one argument")))
        } else {
            Ok(())
        }
    };
    let domain = |value: f64| -> Result<f64, ToolError> {
        if value.is_nan() || value.is_infinite() {
            Err(ToolError::Expression("math domain error".into()))
        } else {
            Ok(value)
        }
    };

    match name {
        "abs" => arity(1).map(|_| args[0].abs()),
        "sqrt" => arity(1).and_then(|_| domain(args[0].sqrt())),
        "sin" => arity(1).map(|_| args[0].sin()),
        "cos" => arity(1).map(|_| args[0].cos()),
        "tan" => arity(1).map(|_| args[0].tan()),
        "exp" => arity(1).map(|_| args[0].exp()),
        "log10" => arity(1).and_then(|_| domain(args[0].log10())),
        "log2" => arity(1).and_then(|_| domain(args[0].log2())),
        "floor" => arity(1).map(|_| args[0].floor()),
        "ceil" => arity(1).map(|_| args[0].ceil()),
        "pow" => arity(2).map(|_| args[0].powf(args[1])),
        "log" => match args {
            [x] => domain(x.ln()),
            [x, base] => domain(x.ln() / base.ln()),
            _ => Err(ToolError::Expression("log() takes 1 or 2 arguments".into())),
        },
        "round" => match args {
            [x] => Ok(round_half_even(*x)),
            [x, digits] => {
                let scale = 10f64.powi(*digits as i32);
                Ok(round_half_even(x * scale) / scale)
            }
            _ => Err(ToolError::Expression("round() takes 1 or 2 arguments".into())),
        },
        "min" => non_empty().map(|_| args.iter().copied().fold(f64::INFINITY, f64::min)),
        "max" => non_empty().map(|_| args.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        "sum" => Ok(args.iter().sum()),
        _ => Err(ToolError::Expression(format!("name '{name}' is not defined"))),
    }
}

/// Banker's rounding, so `round(2.5)` is 2 and `round(3.5)` is 4.
fn round_half_even(x: f64) -> f64 {
    let rounded = x.round();
    if (x - x.trunc()).abs() == 0.5 && rounded % 2.0 != 0.0 {
        rounded - x.signum()
    } else {
        rounded
    }
}
