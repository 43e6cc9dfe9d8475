//! Recursive-descent parser for the formula language (spec §4.4 "Grammar").
//!
//! ```text
//! expression := term (('+' | '-') term)*
//! term       := factor (('*' | '/') factor)*
//! factor     := NUMBER | IDENT | IDENT '(' args ')'
//!             | '-' factor | '(' expression ')'
//! args       := (arg (',' arg)*)?
//! arg        := IDENT ':' IDENT    // range literal
//!             | expression
//! ```

use crate::ast::{Arg, Expr};
use crate::error::EvalError;
use crate::lexer::{tokenize, Token};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// Parse `source` as a top-level expression. Trailing tokens (e.g. the tail
/// of a range literal in non-argument position) are silently ignored per
/// spec §4.4.
pub fn parse(source: &str) -> Result<Expr, EvalError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    if parser.is_at_end() {
        return Err(EvalError::parse("empty expression"));
    }
    parser.expression()
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, expected: &Token) -> Result<(), EvalError> {
        match self.advance() {
            Some(ref t) if t == expected => Ok(()),
            Some(t) => Err(EvalError::parse(format!("expected {:?}, found {:?}", expected, t))),
            None => Err(EvalError::parse(format!("expected {:?}, found end of input", expected))),
        }
    }

    pub fn expression(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    let right = self.term()?;
                    left = Expr::Add(Box::new(left), Box::new(right));
                }
                Some(Token::Minus) => {
                    self.advance();
                    let right = self.term()?;
                    left = Expr::Sub(Box::new(left), Box::new(right));
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.factor()?;
        loop {
            match self.peek() {
                Some(Token::Mul) => {
                    self.advance();
                    let right = self.factor()?;
                    left = Expr::Mul(Box::new(left), Box::new(right));
                }
                Some(Token::Div) => {
                    self.advance();
                    let right = self.factor()?;
                    left = Expr::Div(Box::new(left), Box::new(right));
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<Expr, EvalError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Ident(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.advance();
                    let args = self.args()?;
                    self.expect(&Token::RParen)?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Ref(name))
                }
            }
            Some(Token::Minus) => {
                let inner = self.factor()?;
                Ok(Expr::Neg(Box::new(inner)))
            }
            Some(Token::LParen) => {
                let inner = self.expression()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(other) => Err(EvalError::parse(format!("unexpected token {:?}", other))),
            None => Err(EvalError::parse("unexpected end of input")),
        }
    }

    fn args(&mut self) -> Result<Vec<Arg>, EvalError> {
        let mut args = Vec::new();
        if matches!(self.peek(), Some(Token::RParen)) {
            return Ok(args);
        }
        args.push(self.arg()?);
        while matches!(self.peek(), Some(Token::Comma)) {
            self.advance();
            args.push(self.arg()?);
        }
        Ok(args)
    }

    fn arg(&mut self) -> Result<Arg, EvalError> {
        // A range literal is only recognized here: IDENT ':' IDENT.
        if let Some(Token::Ident(a)) = self.peek().cloned() {
            if matches!(self.tokens.get(self.pos + 1), Some(Token::Colon)) {
                if let Some(Token::Ident(b)) = self.tokens.get(self.pos + 2).cloned() {
                    self.pos += 3;
                    return Ok(Arg::Range(a, b));
                }
            }
        }
        Ok(Arg::Value(self.expression()?))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_precedence() {
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(expr.to_string(), "(1+(2*3))");
    }

    #[test]
    fn parses_unary_minus() {
        let expr = parse("-A1 + 2").unwrap();
        assert_eq!(expr.to_string(), "(-A1+2)");
    }

    #[test]
    fn parses_parenthesized_expression() {
        let expr = parse("(1 + 2) * 3").unwrap();
        assert_eq!(expr.to_string(), "((1+2)*3)");
    }

    #[test]
    fn parses_function_call_with_range_arg() {
        let expr = parse("DISCRETE(A1:B2)").unwrap();
        match expr {
            Expr::Call(name, args) => {
                assert_eq!(name, "DISCRETE");
                assert_eq!(args, vec![Arg::Range("A1".into(), "B2".into())]);
            }
            _ => panic!("expected call"),
        }
    }

    #[test]
    fn range_outside_argument_position_parses_as_ref_with_trailing_tokens() {
        // Top-level `parse` only returns the expression; trailing tokens are
        // the top-level evaluator's concern to ignore, not the parser's to
        // reject.
        let mut parser = Parser {
            tokens: tokenize("A1:B3").unwrap(),
            pos: 0,
        };
        let expr = parser.expression().unwrap();
        assert_eq!(expr, Expr::Ref("A1".into()));
        assert!(!parser.is_at_end());
    }

    #[test]
    fn unknown_character_is_lex_error() {
        assert!(parse("A1 $ B2").is_err());
    }

    #[test]
    fn unexpected_token_is_parse_error() {
        assert!(parse("1 +").is_err());
        assert!(parse("(1 + 2").is_err());
    }
}
