// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pratt parser turning formula tokens into an [`Expr`] tree.

use std::ops::Range;

use super::lexer::Token;
use super::{BinaryOp, Expr, ExpressionError, UnaryOp};

/// Operator associativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assoc {
    Left,
    Right,
}

/// Binding power of unary minus: tighter than `*`, looser than `^`, so `-2^2 == -4`.
const UNARY_PRECEDENCE: u8 = 30;

/// Returns (precedence, associativity, op); higher precedence binds tighter.
fn binary_op_info(token: &Token) -> Option<(u8, Assoc, BinaryOp)> {
    match token {
        Token::Plus => Some((10, Assoc::Left, BinaryOp::Add)),
        Token::Minus => Some((10, Assoc::Left, BinaryOp::Sub)),
        Token::Star => Some((20, Assoc::Left, BinaryOp::Mul)),
        Token::Slash => Some((20, Assoc::Left, BinaryOp::Div)),
        Token::Percent => Some((20, Assoc::Left, BinaryOp::Rem)),
        Token::Caret | Token::StarStar => Some((40, Assoc::Right, BinaryOp::Pow)),
        _ => None,
    }
}

struct TokenStream {
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
}

impl TokenStream {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(token, _)| token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn position(&self) -> usize {
        match self.tokens.get(self.pos) {
            Some((_, span)) => span.start,
            None => self.tokens.last().map(|(_, span)| span.end).unwrap_or(0),
        }
    }

    fn unexpected(&self, expected: &'static str) -> ExpressionError {
        match self.peek() {
            Some(token) => ExpressionError::UnexpectedToken {
                position: self.position(),
                found: token.to_string(),
                expected,
            },
            None => ExpressionError::UnexpectedEnd { expected },
        }
    }

    fn expect(&mut self, wanted: Token, expected: &'static str) -> Result<(), ExpressionError> {
        if self.peek() == Some(&wanted) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }
}

/// Parse a complete token list; trailing tokens are an error.
pub fn parse(tokens: Vec<(Token, Range<usize>)>) -> Result<Expr, ExpressionError> {
    if tokens.is_empty() {
        return Err(ExpressionError::Empty);
    }

    let mut stream = TokenStream { tokens, pos: 0 };
    let expr = parse_pratt(&mut stream, 0)?;

    if stream.peek().is_some() {
        return Err(stream.unexpected("operator or end of expression"));
    }
    Ok(expr)
}

fn parse_pratt(stream: &mut TokenStream, min_prec: u8) -> Result<Expr, ExpressionError> {
    let mut left = parse_prefix(stream)?;

    while let Some((prec, assoc, op)) = stream.peek().and_then(binary_op_info) {
        if prec < min_prec {
            break;
        }
        stream.advance();

        let next_prec = if assoc == Assoc::Left { prec + 1 } else { prec };
        let right = parse_pratt(stream, next_prec)?;
        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
    }

    Ok(left)
}

fn parse_prefix(stream: &mut TokenStream) -> Result<Expr, ExpressionError> {
    match stream.peek() {
        Some(Token::Minus) => {
            stream.advance();
            let operand = parse_pratt(stream, UNARY_PRECEDENCE)?;
            Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            })
        }
        Some(Token::Plus) => {
            stream.advance();
            parse_pratt(stream, UNARY_PRECEDENCE)
        }
        _ => parse_atom(stream),
    }
}

fn parse_atom(stream: &mut TokenStream) -> Result<Expr, ExpressionError> {
    match stream.peek() {
        Some(Token::Number(_)) => match stream.advance() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            _ => Err(stream.unexpected("number")),
        },
        Some(Token::Ident(_)) => {
            let name = match stream.advance() {
                Some(Token::Ident(name)) => name,
                _ => return Err(stream.unexpected("identifier")),
            };
            if stream.peek() == Some(&Token::LParen) {
                let args = parse_call_args(stream)?;
                Ok(Expr::Call {
                    function: name,
                    args,
                })
            } else {
                Ok(Expr::Variable(name))
            }
        }
        Some(Token::LParen) => {
            stream.advance();
            let inner = parse_pratt(stream, 0)?;
            stream.expect(Token::RParen, "')'")?;
            Ok(inner)
        }
        _ => Err(stream.unexpected("number, name or '('")),
    }
}

fn parse_call_args(stream: &mut TokenStream) -> Result<Vec<Expr>, ExpressionError> {
    stream.expect(Token::LParen, "'('")?;
    let mut args = Vec::new();

    if stream.peek() == Some(&Token::RParen) {
        stream.advance();
        return Ok(args);
    }

    loop {
        args.push(parse_pratt(stream, 0)?);
        match stream.peek() {
            Some(Token::Comma) => {
                stream.advance();
            }
            Some(Token::RParen) => {
                stream.advance();
                return Ok(args);
            }
            _ => return Err(stream.unexpected("',' or ')'")),
        }
    }
}
