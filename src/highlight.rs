//! Highlight captures for editor integrations.
//!
//! Maps tokens to tree-sitter style capture names. The parser never
//! consults this table.

use crate::token::{Token, TokenKind};

/// Names that highlight as builtin variables.
pub const BUILTIN_VARIABLES: &[&str] = &["_"];

/// Capture for a token kind, independent of its text.
#[must_use]
pub const fn capture_kind(kind: TokenKind) -> Option<&'static str> {
    use TokenKind as K;
    Some(match kind {
        K::Let
        | K::If
        | K::Else
        | K::Match
        | K::And
        | K::Or
        | K::Not
        | K::In
        | K::Move
        | K::This
        | K::Question
        | K::Dot
        | K::DotQuestion
        | K::Ellipsis
        | K::LBracket
        | K::RBracket
        | K::LBrace
        | K::RBrace
        | K::Colon
        | K::At => "@keyword",
        K::DollarVar => "@variable.builtin",
        K::True | K::False => "@boolean",
        K::Null => "@constant.builtin",
        K::Number | K::Time | K::Duration => "@number",
        K::String | K::FormatString => "@string",
        K::Ip | K::Subnet => "@constant",
        K::Comment | K::FrontmatterOpen | K::FrontmatterBody | K::FrontmatterClose => {
            "@comment"
        }
        K::Assign
        | K::FatArrow
        | K::Pipe
        | K::ModuleSep
        | K::EqEq
        | K::NotEq
        | K::Gt
        | K::GtEq
        | K::Lt
        | K::LtEq
        | K::Plus
        | K::Minus
        | K::Star
        | K::Slash => "@operator",
        K::LParen | K::RParen => "@punctuation.bracket",
        K::Comma => "@punctuation.delimiter",
        K::Identifier | K::Newline | K::Eof => return None,
    })
}

/// Capture for a token, taking builtin names into account.
#[must_use]
pub fn capture(token: &Token<'_>) -> Option<&'static str> {
    if token.kind == TokenKind::Identifier && BUILTIN_VARIABLES.contains(&token.text) {
        return Some("@variable.builtin");
    }
    capture_kind(token.kind)
}
