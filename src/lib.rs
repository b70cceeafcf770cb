//! TQL lexer, parser, and formatter.
//!
//! A hand-written front end for the Tenzir Query Language. Source text
//! is tokenized with [`tokenize`], turned into a typed syntax tree with
//! [`parse`], and printed back in canonical form with [`format`].
//!
//! # Quick start
//!
//! ## Parse and re-format a pipeline
//!
//! ```
//! use tql_syntax::{format, parse, tokenize};
//!
//! let input = "read_file \"events.json\"\nwhere src_ip in 10.0.0.0/8\nhead 10\n";
//! let tokens = tokenize(input).unwrap();
//! let program = parse(&tokens).unwrap();
//! assert_eq!(program.pipeline.as_ref().unwrap().statements.len(), 3);
//! assert_eq!(format(&program), input);
//! ```
//!
//! ## Inspect errors
//!
//! ```
//! use tql_syntax::{Expected, ParseErrorKind, parse_str, Error};
//!
//! let Err(Error::Parse(err)) = parse_str("let $x =") else {
//!     panic!("expected a parse error");
//! };
//! assert_eq!(err.expected(), &[Expected::Expression]);
//! assert!(matches!(err.kind, ParseErrorKind::Unexpected { .. }));
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod ast;
pub mod formatter;
pub mod highlight;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{Argument, Expr, ExprKind, Literal, Pipeline, Program, Statement};
pub use formatter::format;
pub use lexer::{LexError, LexErrorKind, Lexer, tokenize};
pub use parser::{
    Expected, ParseError, ParseErrorKind, ParseOptions, parse, parse_with_options,
};
pub use token::{Span, Token, TokenKind};

/// Unified error type covering both lexing and parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A lexer error.
    #[error("{0}")]
    Lex(#[from] LexError),
    /// A parser error.
    #[error("{0}")]
    Parse(#[from] ParseError),
}

impl Error {
    /// Location of the error in the source.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Lex(err) => err.span,
            Self::Parse(err) => err.span,
        }
    }
}

/// Tokenize and parse a TQL source string in one step.
pub fn parse_str(input: &str) -> Result<Program, Error> {
    parse_str_with_options(input, ParseOptions::default())
}

/// Tokenize and parse with explicit parser settings.
pub fn parse_str_with_options(input: &str, options: ParseOptions) -> Result<Program, Error> {
    let tokens = tokenize(input)?;
    Ok(parse_with_options(&tokens, options)?)
}
