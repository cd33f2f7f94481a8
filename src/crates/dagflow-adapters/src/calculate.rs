//! `calculate(expression) -> Number` — a restricted arithmetic expression
//! evaluator.
//!
//! The engine this crate is modeled on parses the expression with Python's
//! `ast` module and walks a whitelist of node types (`Add`, `Sub`, `Mult`,
//! `Div`, `Pow`, `Mod`, unary +/-). There is no equivalent AST in Rust
//! without a parser dependency, so this is a small recursive-descent parser
//! over the same operator set — numbers, parentheses, `+ - * / % ^`, and
//! unary +/-, nothing else (no identifiers, no function calls).

use async_trait::async_trait;
use dagflow_core::{Adapter, AdapterContext, AdapterError, AdapterResult, ParamSpec};
use serde_json::Value;
use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

/// `calculate(expression) -> Number`.
#[derive(Default)]
pub struct Calculate;

#[async_trait]
impl Adapter for Calculate {
    fn params(&self) -> ParamSpec {
        ParamSpec::Named(vec!["expression".into()])
    }

    async fn call(
        &self,
        _ctx: &AdapterContext<'_>,
        positional: &[Value],
        named: &HashMap<String, Value>,
    ) -> AdapterResult<Value> {
        let expr = positional
            .first()
            .and_then(Value::as_str)
            .or_else(|| named.get("expression").and_then(Value::as_str))
            .ok_or_else(|| AdapterError::MissingParam("expression".to_string()))?;
        let result = eval(expr).map_err(|reason| AdapterError::InvalidParam {
            name: "expression".to_string(),
            reason,
        })?;
        serde_json::Number::from_f64(result)
            .map(Value::Number)
            .ok_or_else(|| AdapterError::InvalidParam {
                name: "expression".to_string(),
                reason: "result is not a finite number".to_string(),
            })
    }
}

fn eval(expression: &str) -> Result<f64, String> {
    let mut parser = Parser {
        chars: expression.chars().peekable(),
    };
    let value = parser.parse_expr()?;
    parser.skip_whitespace();
    if parser.chars.peek().is_some() {
        return Err(format!("unexpected trailing input in '{expression}'"));
    }
    Ok(value)
}

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Parser<'a> {
    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    // expr := term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<f64, String> {
        let mut value = self.parse_term()?;
        loop {
            self.skip_whitespace();
            match self.chars.peek() {
                Some('+') => {
                    self.chars.next();
                    value += self.parse_term()?;
                }
                Some('-') => {
                    self.chars.next();
                    value -= self.parse_term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // term := power (('*' | '/' | '%') power)*
    fn parse_term(&mut self) -> Result<f64, String> {
        let mut value = self.parse_power()?;
        loop {
            self.skip_whitespace();
            match self.chars.peek() {
                Some('*') => {
                    self.chars.next();
                    value *= self.parse_power()?;
                }
                Some('/') => {
                    self.chars.next();
                    let rhs = self.parse_power()?;
                    if rhs == 0.0 {
                        return Err("division by zero".to_string());
                    }
                    value /= rhs;
                }
                Some('%') => {
                    self.chars.next();
                    value %= self.parse_power()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // power := unary ('^' power)?   (right-associative)
    fn parse_power(&mut self) -> Result<f64, String> {
        let base = self.parse_unary()?;
        self.skip_whitespace();
        if matches!(self.chars.peek(), Some('^')) {
            self.chars.next();
            let exponent = self.parse_power()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    // unary := ('+' | '-')* atom
    fn parse_unary(&mut self) -> Result<f64, String> {
        self.skip_whitespace();
        match self.chars.peek() {
            Some('-') => {
                self.chars.next();
                Ok(-self.parse_unary()?)
            }
            Some('+') => {
                self.chars.next();
                self.parse_unary()
            }
            _ => self.parse_atom(),
        }
    }

    // atom := number | '(' expr ')'
    fn parse_atom(&mut self) -> Result<f64, String> {
        self.skip_whitespace();
        if matches!(self.chars.peek(), Some('(')) {
            self.chars.next();
            let value = self.parse_expr()?;
            self.skip_whitespace();
            if self.chars.next() != Some(')') {
                return Err("unbalanced parentheses".to_string());
            }
            return Ok(value);
        }

        let mut digits = String::new();
        while matches!(self.chars.peek(), Some(c) if c.is_ascii_digit() || *c == '.') {
            digits.push(self.chars.next().unwrap());
        }
        if digits.is_empty() {
            return Err("expected a number".to_string());
        }
        digits.parse::<f64>().map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_basic_arithmetic() {
        assert_eq!(eval("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(eval("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(eval("2 ^ 10").unwrap(), 1024.0);
        assert_eq!(eval("-5 + 2").unwrap(), -3.0);
        assert_eq!(eval("7 % 3").unwrap(), 1.0);
    }

    #[test]
    fn rejects_division_by_zero() {
        assert!(eval("1 / 0").is_err());
    }

    #[test]
    fn rejects_garbage_input() {
        assert!(eval("2 + ").is_err());
        assert!(eval("2 + foo").is_err());
    }
}
