//! Expression parsing by precedence climbing.
//!
//! Binding powers come from [`BinaryOp::precedence`] and
//! [`UnaryOp::precedence`]. Postfix member, index, and method-call
//! chains bind tighter than any operator.

use std::net::IpAddr;

use crate::ast::{
    Argument, BinaryOp, DurationLiteral, DurationUnit, Expr, ExprKind, FormatExpr,
    FormatReplacement, FormatSegment, FormatText, Identifier, IpLiteral, ListItem, Literal,
    MetaSelector, NumberLiteral, OptionalMarker, RecordField, RecordItem, RecordKey, Spread,
    StringLiteral, StringValue, SubnetLiteral, TimeLiteral, UnaryOp,
};
use crate::lexer::{self, FormatPiece};
use crate::token::{Span, Token, TokenKind};

use super::{Expected, ParseError, ParseErrorKind, Parser};

/// Minimum binding power of a lambda body; binds looser than `or`.
const LAMBDA_BODY: u8 = 2;

impl<'src> Parser<'src> {
    pub(super) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_expr_bp(0)
    }

    /// Parse a match arm pattern. An identifier directly before `=>`
    /// is the pattern itself, not a lambda parameter.
    pub(super) fn parse_pattern(&mut self) -> Result<Expr, ParseError> {
        if self.at(TokenKind::Identifier) && self.peek_nth(1) == TokenKind::FatArrow {
            return self.parse_primary();
        }
        self.parse_expression()
    }

    fn parse_expr_bp(&mut self, min: u8) -> Result<Expr, ParseError> {
        self.nested(|p| {
            let mut left = p.parse_prefix()?;
            while let Some((op, width)) = p.peek_binary_op() {
                let precedence = op.precedence();
                if precedence < min {
                    break;
                }
                for _ in 0..width {
                    p.bump();
                }
                p.skip_newlines();
                let right = p.parse_expr_bp(precedence + 1)?;
                left = Expr {
                    span: left.span.to(right.span),
                    kind: ExprKind::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                };
            }
            Ok(left)
        })
    }

    /// The binary operator at the cursor and how many tokens it spans.
    fn peek_binary_op(&self) -> Option<(BinaryOp, usize)> {
        let op = match self.peek_kind() {
            TokenKind::Else => BinaryOp::Else,
            TokenKind::If => BinaryOp::If,
            TokenKind::Or => BinaryOp::Or,
            TokenKind::And => BinaryOp::And,
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::NotEq => BinaryOp::NotEq,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::GtEq => BinaryOp::GtEq,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::LtEq => BinaryOp::LtEq,
            TokenKind::In => BinaryOp::In,
            TokenKind::Not if self.peek_nth(1) == TokenKind::In => {
                return Some((BinaryOp::NotIn, 2));
            }
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            _ => return None,
        };
        Some((op, 1))
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek_kind() {
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Move => UnaryOp::Move,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Identifier if self.peek_nth(1) == TokenKind::FatArrow => {
                return self.parse_lambda();
            }
            _ => {
                let primary = self.parse_primary()?;
                return self.parse_postfix(primary);
            }
        };
        let token = self.bump();
        let operand = self.parse_expr_bp(op.precedence())?;
        Ok(Expr {
            span: token.span.to(operand.span),
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
        })
    }

    fn parse_lambda(&mut self) -> Result<Expr, ParseError> {
        let param = Self::identifier(self.bump());
        self.bump();
        self.skip_newlines();
        let body = self.parse_expr_bp(LAMBDA_BODY)?;
        Ok(Expr {
            span: param.span.to(body.span),
            kind: ExprKind::Lambda {
                param,
                body: Box::new(body),
            },
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = *self.peek();
        let kind = match token.kind {
            TokenKind::FormatString => return self.parse_format_string(),
            kind if kind.is_literal() => return self.parse_literal(),
            TokenKind::Identifier => {
                if matches!(
                    self.peek_nth(1),
                    TokenKind::ModuleSep | TokenKind::LParen
                ) {
                    return self.parse_call(None);
                }
                self.bump();
                if token.text == "_" {
                    ExprKind::Placeholder
                } else {
                    ExprKind::Identifier(token.text.to_string())
                }
            }
            TokenKind::DollarVar => {
                self.bump();
                ExprKind::DollarVar(token.text[1..].to_string())
            }
            TokenKind::This => {
                self.bump();
                ExprKind::This
            }
            TokenKind::At => {
                self.bump();
                let name = Self::identifier(self.expect(TokenKind::Identifier)?);
                ExprKind::Meta(MetaSelector {
                    span: token.span.to(name.span),
                    name,
                })
            }
            TokenKind::LBracket => return self.parse_list(),
            TokenKind::LBrace => return self.parse_record(),
            TokenKind::LParen => {
                let open = self.bump();
                self.skip_newlines();
                let inner = self.parse_expression()?;
                self.skip_newlines();
                let close = self.expect_closing(TokenKind::RParen, open)?;
                return Ok(Expr {
                    kind: ExprKind::Paren(Box::new(inner)),
                    span: open.span.to(close.span),
                });
            }
            _ => return Err(self.unexpected(vec![Expected::Expression])),
        };
        Ok(Expr {
            kind,
            span: token.span,
        })
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr, ParseError> {
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.bump();
                    if self.at(TokenKind::Identifier)
                        && matches!(
                            self.peek_nth(1),
                            TokenKind::ModuleSep | TokenKind::LParen
                        )
                    {
                        expr = self.parse_call(Some(expr))?;
                        continue;
                    }
                    let name = Self::identifier(self.expect(TokenKind::Identifier)?);
                    let optional = self
                        .eat(TokenKind::Question)
                        .map(|_| OptionalMarker::Suffix);
                    expr = Self::member(expr, name, optional, self.last_span());
                }
                TokenKind::DotQuestion => {
                    self.bump();
                    let name = Self::identifier(self.expect(TokenKind::Identifier)?);
                    let span = name.span;
                    expr = Self::member(expr, name, Some(OptionalMarker::Prefix), span);
                }
                TokenKind::LBracket => {
                    let open = self.bump();
                    self.skip_newlines();
                    let index = self.parse_expression()?;
                    self.skip_newlines();
                    self.expect_closing(TokenKind::RBracket, open)?;
                    let optional = self.eat(TokenKind::Question).is_some();
                    expr = Expr {
                        span: expr.span.to(self.last_span()),
                        kind: ExprKind::Index {
                            receiver: Box::new(expr),
                            index: Box::new(index),
                            optional,
                        },
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn member(
        receiver: Expr,
        name: Identifier,
        optional: Option<OptionalMarker>,
        end: Span,
    ) -> Expr {
        Expr {
            span: receiver.span.to(end),
            kind: ExprKind::Member {
                receiver: Box::new(receiver),
                name,
                optional,
            },
        }
    }

    /// `entity(args)`, optionally as a method on `receiver`.
    fn parse_call(&mut self, receiver: Option<Expr>) -> Result<Expr, ParseError> {
        let function = self.parse_entity()?;
        if !self.at(TokenKind::LParen) {
            return Err(self.unexpected(vec![Expected::Token(TokenKind::LParen)]));
        }
        let arguments = self.parse_call_arguments()?;
        let start = receiver.as_ref().map_or(function.span, |r| r.span);
        Ok(Expr {
            span: start.to(self.last_span()),
            kind: ExprKind::Call {
                receiver: receiver.map(Box::new),
                function,
                arguments,
            },
        })
    }

    /// `( arg, ... )` with newlines and a trailing comma allowed.
    pub(super) fn parse_call_arguments(&mut self) -> Result<Vec<Argument>, ParseError> {
        let open = self.expect(TokenKind::LParen)?;
        self.nested(|p| {
            let mut arguments = Vec::new();
            p.skip_newlines();
            while !p.at(TokenKind::RParen) && !p.at(TokenKind::Eof) {
                arguments.push(p.parse_argument()?);
                p.skip_newlines();
                if p.eat(TokenKind::Comma).is_none() {
                    break;
                }
                p.skip_newlines();
            }
            p.expect_closing(TokenKind::RParen, open)?;
            Ok(arguments)
        })
    }

    fn parse_list(&mut self) -> Result<Expr, ParseError> {
        let open = self.bump();
        let items = self.nested(|p| {
            let mut items = Vec::new();
            p.skip_newlines();
            while !p.at(TokenKind::RBracket) && !p.at(TokenKind::Eof) {
                let item = if p.at(TokenKind::Ellipsis) {
                    ListItem::Spread(p.parse_spread()?)
                } else {
                    ListItem::Expr(p.parse_expression()?)
                };
                items.push(item);
                p.skip_newlines();
                if p.eat(TokenKind::Comma).is_none() {
                    break;
                }
                p.skip_newlines();
            }
            Ok(items)
        })?;
        let close = self.expect_closing(TokenKind::RBracket, open)?;
        Ok(Expr {
            kind: ExprKind::List(items),
            span: open.span.to(close.span),
        })
    }

    fn parse_record(&mut self) -> Result<Expr, ParseError> {
        let open = self.bump();
        let items = self.nested(|p| {
            let mut items = Vec::new();
            p.skip_newlines();
            while !p.at(TokenKind::RBrace) && !p.at(TokenKind::Eof) {
                let item = if p.at(TokenKind::Ellipsis) {
                    RecordItem::Spread(p.parse_spread()?)
                } else {
                    RecordItem::Field(p.parse_record_field()?)
                };
                items.push(item);
                p.skip_newlines();
                if p.eat(TokenKind::Comma).is_none() {
                    break;
                }
                p.skip_newlines();
            }
            Ok(items)
        })?;
        let close = self.expect_closing(TokenKind::RBrace, open)?;
        Ok(Expr {
            kind: ExprKind::Record(items),
            span: open.span.to(close.span),
        })
    }

    fn parse_record_field(&mut self) -> Result<RecordField, ParseError> {
        let token = *self.peek();
        let key = match token.kind {
            TokenKind::Identifier => RecordKey::Identifier(Self::identifier(self.bump())),
            TokenKind::String => {
                let Some(literal) = string_literal(token.text) else {
                    return Err(Self::invalid_literal(&token));
                };
                self.bump();
                RecordKey::String(literal)
            }
            _ => {
                return Err(self.unexpected(vec![
                    Expected::Token(TokenKind::Identifier),
                    Expected::Token(TokenKind::String),
                    Expected::Token(TokenKind::Ellipsis),
                    Expected::Token(TokenKind::RBrace),
                ]));
            }
        };
        self.expect(TokenKind::Colon)?;
        self.skip_newlines();
        let value = self.parse_expression()?;
        Ok(RecordField {
            key,
            span: token.span.to(value.span),
            value,
        })
    }

    fn parse_spread(&mut self) -> Result<Spread, ParseError> {
        let token = self.bump();
        let expr = self.parse_expression()?;
        Ok(Spread {
            span: token.span.to(expr.span),
            expr,
        })
    }

    fn parse_literal(&mut self) -> Result<Expr, ParseError> {
        let token = *self.peek();
        let text = token.text.to_string();
        let literal = match token.kind {
            TokenKind::Null => Some(Literal::Null),
            TokenKind::True => Some(Literal::Bool(true)),
            TokenKind::False => Some(Literal::Bool(false)),
            TokenKind::Number => Some(Literal::Number(number_literal(token.text))),
            TokenKind::String => string_literal(token.text).map(Literal::String),
            TokenKind::Ip => Some(Literal::Ip(IpLiteral {
                addr: text.parse::<IpAddr>().ok(),
                text,
            })),
            TokenKind::Subnet => subnet_literal(token.text).map(Literal::Subnet),
            TokenKind::Time => Some(Literal::Time(TimeLiteral { text })),
            TokenKind::Duration => duration_literal(token.text).map(Literal::Duration),
            _ => return Err(self.unexpected(vec![Expected::Expression])),
        };
        let Some(literal) = literal else {
            return Err(Self::invalid_literal(&token));
        };
        self.bump();
        Ok(Expr {
            kind: ExprKind::Literal(literal),
            span: token.span,
        })
    }

    fn parse_format_string(&mut self) -> Result<Expr, ParseError> {
        let token = *self.peek();
        let pieces = lexer::format_pieces(&token)
            .map_err(|_| self.error(ParseErrorKind::MalformedFormatString))?;

        let mut segments = Vec::with_capacity(pieces.len());
        for piece in pieces {
            match piece {
                FormatPiece::Text(span) => {
                    let from = span.start - token.span.start;
                    let raw = &token.text[from..from + span.len()];
                    let value = String::from_utf8_lossy(&decode_format_text(raw)).into_owned();
                    segments.push(FormatSegment::Text(FormatText {
                        raw: raw.to_string(),
                        value,
                        span,
                    }));
                }
                FormatPiece::Replacement { span, inner } => {
                    let tokens = lexer::tokenize_within(&token, inner)
                        .map_err(|_| self.error(ParseErrorKind::MalformedFormatString))?;
                    let expr = self.parse_replacement(tokens)?;
                    segments.push(FormatSegment::Replacement(FormatReplacement {
                        expr: Box::new(expr),
                        span,
                    }));
                }
            }
        }

        self.bump();
        Ok(Expr {
            kind: ExprKind::Format(FormatExpr { segments }),
            span: token.span,
        })
    }

    /// Parse the tokens of one `{ ... }` replacement as a single expression.
    fn parse_replacement(&self, tokens: Vec<Token<'src>>) -> Result<Expr, ParseError> {
        let mut inner = Self::new(tokens, self.options, self.depth);
        inner.skip_newlines();
        let expr = inner.parse_expression()?;
        inner.skip_newlines();
        if !inner.at(TokenKind::Eof) {
            return Err(inner.unexpected(vec![Expected::Token(TokenKind::RBrace)]));
        }
        Ok(expr)
    }

    fn invalid_literal(token: &Token<'_>) -> ParseError {
        ParseError {
            kind: ParseErrorKind::InvalidLiteral {
                text: token.text.to_string(),
            },
            span: token.span,
            partial: None,
        }
    }
}

fn number_literal(text: &str) -> NumberLiteral {
    let digits = text.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    NumberLiteral {
        text: text.to_string(),
        unit: (digits.len() < text.len()).then(|| text[digits.len()..].to_string()),
    }
}

/// Decode a plain, byte, or raw string token.
fn string_literal(text: &str) -> Option<StringLiteral> {
    let (bytes, rest) = text
        .strip_prefix('b')
        .map_or((false, text), |rest| (true, rest));

    if let Some(rest) = rest.strip_prefix('r') {
        let fences = rest.bytes().take_while(|&b| b == b'#').count();
        let body = rest.get(fences + 1..rest.len().checked_sub(fences + 1)?)?;
        let value = if bytes {
            StringValue::Bytes(body.as_bytes().to_vec())
        } else {
            StringValue::Text(body.to_string())
        };
        return Some(StringLiteral {
            text: text.to_string(),
            value,
            raw: true,
        });
    }

    let body = rest.get(1..rest.len().checked_sub(1)?)?;
    let decoded = lexer::unescape(body);
    let value = if bytes {
        StringValue::Bytes(decoded)
    } else {
        StringValue::Text(String::from_utf8_lossy(&decoded).into_owned())
    };
    Some(StringLiteral {
        text: text.to_string(),
        value,
        raw: false,
    })
}

fn subnet_literal(text: &str) -> Option<SubnetLiteral> {
    let (addr, prefix) = text.split_once('/')?;
    Some(SubnetLiteral {
        text: text.to_string(),
        addr: addr.parse::<IpAddr>().ok(),
        prefix: prefix.parse().ok()?,
    })
}

fn duration_literal(text: &str) -> Option<DurationLiteral> {
    let split = text.find(|c: char| !c.is_ascii_digit())?;
    Some(DurationLiteral {
        text: text.to_string(),
        magnitude: text[..split].parse().ok(),
        unit: DurationUnit::from_suffix(&text[split..])?,
    })
}

/// Decode `{{`, `}}`, and backslash escapes in format string text.
fn decode_format_text(raw: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(ch) = rest.chars().next() {
        let len = if rest.starts_with("{{") {
            out.push(b'{');
            2
        } else if rest.starts_with("}}") {
            out.push(b'}');
            2
        } else if ch == '\\' {
            let len = escape_len(rest);
            out.extend(lexer::unescape(rest.get(..len).unwrap_or(rest)));
            len
        } else {
            out.extend_from_slice(&rest.as_bytes()[..ch.len_utf8()]);
            ch.len_utf8()
        };
        rest = rest.get(len..).unwrap_or_default();
    }
    out
}

/// Byte length of the escape sequence at the start of `rest`.
fn escape_len(rest: &str) -> usize {
    match rest.as_bytes().get(1) {
        Some(b'x') => rest.len().min(4),
        Some(b'u') => rest.find('}').map_or(rest.len(), |i| i + 1),
        Some(_) => 1 + rest[1..].chars().next().map_or(0, char::len_utf8),
        None => 1,
    }
}
