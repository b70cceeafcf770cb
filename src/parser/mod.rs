//! Recursive-descent parser for TQL pipelines and statements.
//!
//! Expressions are handled in [`expr`] by precedence climbing. The
//! parser works on a copy of the significant tokens (comments removed)
//! and backtracks by restoring its cursor; abandoned subtrees are
//! dropped and never attached to the result.

mod expr;

use std::fmt;

use crate::ast::{
    Argument, Assignment, Block, ElseBranch, Entity, FieldSegment, FieldSelector, Frontmatter,
    Identifier, IfStatement, Invocation, LetStatement, MatchArm, MatchStatement, MetaSelector,
    Pipeline, Program, Selector, Statement,
};
use crate::token::{Span, Token, TokenKind};

/// Default limit for nested blocks and expressions.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Parser settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Maximum nesting of blocks, brackets, and sub-expressions.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Something the parser would have accepted at an error position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Token(TokenKind),
    /// Any token that can start an expression.
    Expression,
    /// Any token that can start a statement.
    Statement,
    /// `@name` or a field path.
    Selector,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(kind) => write!(f, "{kind}"),
            Self::Expression => write!(f, "expression"),
            Self::Statement => write!(f, "statement"),
            Self::Selector => write!(f, "selector"),
        }
    }
}

/// Classifies a parser error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Found a token outside the expected set.
    Unexpected {
        expected: Vec<Expected>,
        found: TokenKind,
    },
    /// Input ended before a bracket or block was closed.
    UnclosedDelimiter { open: TokenKind, opened_at: Span },
    /// Nesting exceeded `ParseOptions::max_depth`.
    NestingTooDeep { limit: usize },
    /// Literal token whose value cannot be represented.
    InvalidLiteral { text: String },
    /// Format string that could not be split into segments.
    MalformedFormatString,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unexpected { expected, found } => {
                match expected.as_slice() {
                    [] => write!(f, "unexpected {found}"),
                    [one] => write!(f, "expected {one}, found {found}"),
                    many => {
                        write!(f, "expected one of ")?;
                        for (i, item) in many.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "{item}")?;
                        }
                        write!(f, ", found {found}")
                    }
                }
            }
            Self::UnclosedDelimiter { open, opened_at } => {
                write!(
                    f,
                    "unclosed {open} opened at line {}, column {}",
                    opened_at.line, opened_at.column
                )
            }
            Self::NestingTooDeep { limit } => {
                write!(f, "nesting too deep, limit is {limit}")
            }
            Self::InvalidLiteral { text } => write!(f, "invalid literal: {text}"),
            Self::MalformedFormatString => write!(f, "malformed format string"),
        }
    }
}

/// Error produced during parsing.
///
/// `partial` holds the frontmatter and the top-level statements that
/// were completely parsed before the error. It is meant for
/// diagnostics and is not a valid program.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", span.line, span.column)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub partial: Option<Box<Program>>,
}

impl ParseError {
    /// The expected set, for `Unexpected` errors.
    #[must_use]
    pub fn expected(&self) -> &[Expected] {
        match &self.kind {
            ParseErrorKind::Unexpected { expected, .. } => expected,
            _ => &[],
        }
    }
}

/// Parse a token stream into a `Program`.
///
/// # Errors
///
/// Returns `ParseError` at the first token that does not fit the
/// grammar, an unclosed delimiter, or when nesting is too deep.
pub fn parse(tokens: &[Token<'_>]) -> Result<Program, ParseError> {
    parse_with_options(tokens, ParseOptions::default())
}

/// Parse a token stream with explicit settings.
///
/// # Errors
///
/// See [`parse`].
pub fn parse_with_options(
    tokens: &[Token<'_>],
    options: ParseOptions,
) -> Result<Program, ParseError> {
    Parser::new(tokens.iter().copied(), options, 0).parse_program()
}

/// Tokens that end an invocation written with parenthesized arguments.
const INVOCATION_END: &[TokenKind] = &[
    TokenKind::Newline,
    TokenKind::Pipe,
    TokenKind::RBrace,
    TokenKind::LBrace,
    TokenKind::Eof,
];

struct Parser<'src> {
    tokens: Vec<Token<'src>>,
    pos: usize,
    depth: usize,
    options: ParseOptions,
}

impl<'src> Parser<'src> {
    fn new(
        tokens: impl IntoIterator<Item = Token<'src>>,
        options: ParseOptions,
        depth: usize,
    ) -> Self {
        let mut tokens: Vec<_> = tokens
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .collect();
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let span = tokens.last().map_or_else(Span::default, |t| t.span.end_point());
            tokens.push(Token {
                kind: TokenKind::Eof,
                text: "",
                span,
            });
        }
        Self {
            tokens,
            pos: 0,
            depth,
            options,
        }
    }

    fn parse_program(mut self) -> Result<Program, ParseError> {
        let start = self.peek().span;
        self.skip_newlines();

        let frontmatter = if self.at(TokenKind::FrontmatterOpen) {
            let frontmatter = self.parse_frontmatter();
            self.skip_newlines();
            Some(frontmatter)
        } else {
            None
        };

        let mut statements = Vec::new();
        let result = if self.at(TokenKind::Eof) {
            Ok(())
        } else {
            self.parse_statements(&mut statements, TokenKind::Eof)
        };

        let end = self.tokens[self.tokens.len() - 1].span;
        let pipeline = Self::pipeline_from(statements);
        let program = Program {
            frontmatter,
            pipeline,
            span: start.to(end),
        };
        match result {
            Ok(()) => Ok(program),
            Err(mut err) => {
                err.partial = Some(Box::new(program));
                Err(err)
            }
        }
    }

    fn parse_frontmatter(&mut self) -> Frontmatter {
        let open = self.bump();
        let mut last = open.span;
        let mut body = String::new();
        if self.at(TokenKind::FrontmatterBody) {
            let token = self.bump();
            body = token.text.to_string();
            last = token.span;
        }
        let closed = self.at(TokenKind::FrontmatterClose);
        if closed {
            last = self.bump().span;
        }
        Frontmatter {
            body,
            closed,
            span: open.span.to(last),
        }
    }

    fn pipeline_from(statements: Vec<Statement>) -> Option<Pipeline> {
        let first = statements.first()?.span();
        let last = statements.last()?.span();
        Some(Pipeline {
            statements,
            span: first.to(last),
        })
    }

    /// Parse statements separated by newlines or `|` until `end`.
    fn parse_statements(
        &mut self,
        statements: &mut Vec<Statement>,
        end: TokenKind,
    ) -> Result<(), ParseError> {
        loop {
            statements.push(self.parse_statement()?);

            let mut separated = false;
            while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Pipe) {
                self.bump();
                separated = true;
            }
            if self.at(end) {
                return Ok(());
            }
            if !separated {
                return Err(self.unexpected(vec![
                    Expected::Token(TokenKind::Newline),
                    Expected::Token(TokenKind::Pipe),
                    Expected::Token(end),
                ]));
            }
        }
    }

    /// Parse a non-empty pipeline ending at (not consuming) `}`.
    fn parse_pipeline(&mut self) -> Result<Pipeline, ParseError> {
        let mut statements = Vec::new();
        self.parse_statements(&mut statements, TokenKind::RBrace)?;
        Self::pipeline_from(statements).ok_or_else(|| self.unexpected(vec![Expected::Statement]))
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match self.peek_kind() {
            TokenKind::Let => Ok(Statement::Let(self.parse_let()?)),
            TokenKind::If => Ok(Statement::If(self.parse_if()?)),
            TokenKind::Match => Ok(Statement::Match(self.parse_match()?)),
            TokenKind::Identifier | TokenKind::This | TokenKind::At => {
                if let Some(assignment) = self.try_parse_assignment()? {
                    return Ok(Statement::Assignment(assignment));
                }
                if self.at(TokenKind::Identifier) {
                    return Ok(Statement::Invocation(self.parse_invocation()?));
                }
                // `this` or `@name` heads can only start an assignment.
                self.parse_selector()
                    .ok_or_else(|| self.unexpected(vec![Expected::Selector]))?;
                Err(self.unexpected(vec![Expected::Token(TokenKind::Assign)]))
            }
            _ => Err(self.unexpected(vec![Expected::Statement])),
        }
    }

    fn parse_let(&mut self) -> Result<LetStatement, ParseError> {
        let keyword = self.bump();
        let var = self.expect(TokenKind::DollarVar)?;
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expression()?;
        Ok(LetStatement {
            name: Identifier {
                name: var.text[1..].to_string(),
                span: var.span,
            },
            span: keyword.span.to(value.span),
            value,
        })
    }

    fn parse_if(&mut self) -> Result<IfStatement, ParseError> {
        let keyword = self.bump();
        let condition = self.parse_expression()?;
        let consequence = self.parse_block()?;
        let mut end = consequence.span;

        let alternative = if self.eat(TokenKind::Else).is_some() {
            if self.at(TokenKind::If) {
                let nested = self.nested(Self::parse_if)?;
                end = nested.span;
                Some(ElseBranch::If(Box::new(nested)))
            } else {
                let block = self.parse_block()?;
                end = block.span;
                Some(ElseBranch::Block(block))
            }
        } else {
            None
        };

        Ok(IfStatement {
            condition,
            consequence,
            alternative,
            span: keyword.span.to(end),
        })
    }

    /// `{ pipeline? }`
    fn parse_block(&mut self) -> Result<Block, ParseError> {
        self.nested(|p| {
            let open = p.expect(TokenKind::LBrace)?;
            p.skip_newlines();
            let body = if p.at(TokenKind::RBrace) {
                None
            } else {
                Some(p.parse_pipeline_until_close(open)?)
            };
            let close = p.expect_closing(TokenKind::RBrace, open)?;
            Ok(Block {
                body,
                span: open.span.to(close.span),
            })
        })
    }

    /// Parse a pipeline that must be followed by `}` closing `open`.
    fn parse_pipeline_until_close(&mut self, open: Token<'src>) -> Result<Pipeline, ParseError> {
        if self.at(TokenKind::Eof) {
            return Err(self.unclosed(open));
        }
        self.parse_pipeline().map_err(|err| {
            if matches!(
                err.kind,
                ParseErrorKind::Unexpected {
                    found: TokenKind::Eof,
                    ..
                }
            ) {
                self.unclosed(open)
            } else {
                err
            }
        })
    }

    fn parse_match(&mut self) -> Result<MatchStatement, ParseError> {
        let keyword = self.bump();
        let subject = self.parse_expression()?;
        let open = self.expect(TokenKind::LBrace)?;
        self.skip_newlines();

        let arms = self.nested(|p| {
            let mut arms = Vec::new();
            loop {
                match p.peek_kind() {
                    TokenKind::RBrace => break,
                    TokenKind::Eof => return Err(p.unclosed(open)),
                    _ => arms.push(p.parse_match_arm()?),
                }
                while matches!(p.peek_kind(), TokenKind::Newline | TokenKind::Comma) {
                    p.bump();
                }
            }
            Ok(arms)
        })?;

        let close = self.expect_closing(TokenKind::RBrace, open)?;
        Ok(MatchStatement {
            subject,
            arms,
            span: keyword.span.to(close.span),
        })
    }

    fn parse_match_arm(&mut self) -> Result<MatchArm, ParseError> {
        let mut patterns = vec![self.parse_pattern()?];
        while self.eat(TokenKind::Comma).is_some() {
            self.skip_newlines();
            patterns.push(self.parse_pattern()?);
        }
        self.expect(TokenKind::FatArrow)?;

        let open = self.expect(TokenKind::LBrace)?;
        self.skip_newlines();
        let body = self.nested(|p| p.parse_pipeline_until_close(open))?;
        let close = self.expect_closing(TokenKind::RBrace, open)?;

        Ok(MatchArm {
            span: patterns[0].span.to(close.span),
            patterns,
            body,
        })
    }

    fn try_parse_assignment(&mut self) -> Result<Option<Assignment>, ParseError> {
        let checkpoint = self.pos;
        let Some(left) = self.parse_selector() else {
            return Ok(None);
        };
        if self.eat(TokenKind::Assign).is_none() {
            self.pos = checkpoint;
            return Ok(None);
        }
        let right = self.parse_expression()?;
        Ok(Some(Assignment {
            span: left.span().to(right.span),
            left,
            right,
        }))
    }

    /// Parse `@name` or a field path; restores the cursor on failure.
    fn parse_selector(&mut self) -> Option<Selector> {
        let checkpoint = self.pos;
        let first = *self.peek();
        match first.kind {
            TokenKind::At => {
                self.bump();
                let Some(name) = self.eat(TokenKind::Identifier) else {
                    self.pos = checkpoint;
                    return None;
                };
                Some(Selector::Meta(MetaSelector {
                    name: Self::identifier(name),
                    span: first.span.to(name.span),
                }))
            }
            TokenKind::This => {
                self.bump();
                let this_only = FieldSelector {
                    this: true,
                    segments: Vec::new(),
                    span: first.span,
                };
                if !(self.at(TokenKind::Dot) && self.peek_nth(1) == TokenKind::Identifier) {
                    return Some(Selector::Field(this_only));
                }
                self.bump();
                Some(Selector::Field(self.parse_field_path(first.span, true)))
            }
            TokenKind::Identifier => Some(Selector::Field(self.parse_field_path(first.span, false))),
            _ => None,
        }
    }

    /// `ident ?` (`.` `ident` `?`)*, with the cursor on the first identifier.
    fn parse_field_path(&mut self, start: Span, this: bool) -> FieldSelector {
        let mut segments = Vec::new();
        loop {
            let name = self.bump();
            let optional = self.eat(TokenKind::Question).is_some();
            segments.push(FieldSegment {
                name: Self::identifier(name),
                optional,
            });
            if self.at(TokenKind::Dot) && self.peek_nth(1) == TokenKind::Identifier {
                self.bump();
            } else {
                break;
            }
        }
        FieldSelector {
            this,
            segments,
            span: start.to(self.last_span()),
        }
    }

    fn parse_entity(&mut self) -> Result<Entity, ParseError> {
        let first = self.expect(TokenKind::Identifier)?;
        let mut segments = vec![Self::identifier(first)];
        while self.eat(TokenKind::ModuleSep).is_some() {
            segments.push(Self::identifier(self.expect(TokenKind::Identifier)?));
        }
        Ok(Entity {
            segments,
            span: first.span.to(self.last_span()),
        })
    }

    fn parse_invocation(&mut self) -> Result<Invocation, ParseError> {
        let operator = self.parse_entity()?;
        let mut arguments = Vec::new();
        let mut parenthesized = false;

        if self.at(TokenKind::LParen) {
            if let Some(args) = self.try_parse_parenthesized_arguments(INVOCATION_END) {
                arguments = args;
                parenthesized = true;
            }
        }
        if !parenthesized && self.at_argument_start() {
            let checkpoint = self.pos;
            match self.parse_bare_arguments() {
                Ok(args) => arguments = args,
                // A `{` that does not read as a record opens the block.
                Err(_) if self.tokens[checkpoint].kind == TokenKind::LBrace => {
                    self.pos = checkpoint;
                }
                Err(err) => return Err(err),
            }
        }

        let mut block = None;
        let mut trailing_arguments = Vec::new();
        if self.at(TokenKind::LBrace) {
            let open = self.bump();
            self.skip_newlines();
            block = Some(self.nested(|p| p.parse_pipeline_until_close(open))?);
            self.expect_closing(TokenKind::RBrace, open)?;

            if self.eat(TokenKind::Comma).is_some() {
                self.skip_newlines();
                trailing_arguments = match self.try_parse_parenthesized_arguments(INVOCATION_END)
                {
                    Some(args) => args,
                    None => self.parse_bare_arguments()?,
                };
            }
        }

        Ok(Invocation {
            span: operator.span.to(self.last_span()),
            operator,
            arguments,
            parenthesized,
            block,
            trailing_arguments,
        })
    }

    /// `( args )` followed by one of `end`; restores the cursor otherwise.
    fn try_parse_parenthesized_arguments(&mut self, end: &[TokenKind]) -> Option<Vec<Argument>> {
        if !self.at(TokenKind::LParen) {
            return None;
        }
        let checkpoint = self.pos;
        match self.parse_call_arguments() {
            Ok(args) if end.contains(&self.peek_kind()) => Some(args),
            _ => {
                self.pos = checkpoint;
                None
            }
        }
    }

    fn parse_bare_arguments(&mut self) -> Result<Vec<Argument>, ParseError> {
        let mut arguments = vec![self.parse_argument()?];
        while self.eat(TokenKind::Comma).is_some() {
            self.skip_newlines();
            arguments.push(self.parse_argument()?);
        }
        Ok(arguments)
    }

    /// `selector = expr` or a plain expression.
    fn parse_argument(&mut self) -> Result<Argument, ParseError> {
        if let Some(assignment) = self.try_parse_assignment()? {
            return Ok(Argument::Named(assignment));
        }
        Ok(Argument::Positional(self.parse_expression()?))
    }

    fn at_argument_start(&self) -> bool {
        let kind = self.peek_kind();
        kind.is_literal()
            || matches!(
                kind,
                TokenKind::Identifier
                    | TokenKind::DollarVar
                    | TokenKind::At
                    | TokenKind::This
                    | TokenKind::LBracket
                    | TokenKind::LBrace
                    | TokenKind::LParen
                    | TokenKind::Plus
                    | TokenKind::Minus
                    | TokenKind::Not
                    | TokenKind::Move
            )
    }

    // -- Cursor helpers --

    fn peek(&self) -> &Token<'src> {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn peek_nth(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// Consume the current token; `Eof` is never consumed.
    fn bump(&mut self) -> Token<'src> {
        let token = *self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token<'src>> {
        self.at(kind).then(|| self.bump())
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token<'src>, ParseError> {
        self.eat(kind)
            .ok_or_else(|| self.unexpected(vec![Expected::Token(kind)]))
    }

    /// Expect the delimiter closing `open`; end of input reports the
    /// unclosed opener instead of the missing token.
    fn expect_closing(
        &mut self,
        kind: TokenKind,
        open: Token<'src>,
    ) -> Result<Token<'src>, ParseError> {
        if self.at(TokenKind::Eof) {
            return Err(self.unclosed(open));
        }
        self.expect(kind)
    }

    fn skip_newlines(&mut self) {
        while self.at(TokenKind::Newline) {
            self.bump();
        }
    }

    fn last_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or_else(|| self.peek().span, |t| t.span)
    }

    /// Run `f` one nesting level deeper.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= self.options.max_depth {
            return Err(self.error(ParseErrorKind::NestingTooDeep {
                limit: self.options.max_depth,
            }));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn identifier(token: Token<'_>) -> Identifier {
        Identifier {
            name: token.text.to_string(),
            span: token.span,
        }
    }

    // -- Errors --

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            kind,
            span: self.peek().span,
            partial: None,
        }
    }

    fn unexpected(&self, expected: Vec<Expected>) -> ParseError {
        self.error(ParseErrorKind::Unexpected {
            expected,
            found: self.peek_kind(),
        })
    }

    fn unclosed(&self, open: Token<'_>) -> ParseError {
        self.error(ParseErrorKind::UnclosedDelimiter {
            open: open.kind,
            opened_at: open.span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprKind, Literal};
    use crate::lexer::tokenize;

    fn parse_input(input: &str) -> Result<Program, ParseError> {
        let tokens = tokenize(input).expect("tokenize failed");
        parse(&tokens)
    }

    fn statements(input: &str) -> Vec<Statement> {
        parse_input(input)
            .expect("parse failed")
            .pipeline
            .expect("empty program")
            .statements
    }

    #[test]
    fn empty_program() {
        let program = parse_input("\n\n").expect("parse failed");
        assert!(program.pipeline.is_none());
        assert!(program.frontmatter.is_none());
    }

    #[test]
    fn three_stage_pipeline() {
        let stmts = statements(r#"read_file "a.json" | where x > 1 | write_file "b.json""#);
        assert_eq!(stmts.len(), 3);
        let names: Vec<_> = stmts
            .iter()
            .map(|s| match s {
                Statement::Invocation(inv) => inv.operator.to_string(),
                other => panic!("expected invocation, got {other:?}"),
            })
            .collect();
        assert_eq!(names, ["read_file", "where", "write_file"]);
    }

    #[test]
    fn let_statement() {
        let stmts = statements("let $limit = 10");
        let Statement::Let(stmt) = &stmts[0] else {
            panic!("expected let");
        };
        assert_eq!(stmt.name.name, "limit");
        assert!(matches!(
            stmt.value.kind,
            ExprKind::Literal(Literal::Number(_))
        ));
    }

    #[test]
    fn assignment_vs_invocation() {
        let stmts = statements("x = 1\nwhere x == 1\nthis.y? = 2\n@name = \"a\"\nthis = {}");
        assert!(matches!(stmts[0], Statement::Assignment(_)));
        assert!(matches!(stmts[1], Statement::Invocation(_)));
        let Statement::Assignment(nested) = &stmts[2] else {
            panic!("expected assignment");
        };
        assert_eq!(nested.left.to_string(), "this.y?");
        assert!(matches!(
            &stmts[3],
            Statement::Assignment(Assignment {
                left: Selector::Meta(_),
                ..
            })
        ));
        assert!(matches!(stmts[4], Statement::Assignment(_)));
    }

    #[test]
    fn invocation_with_block_and_trailing_arguments() {
        let stmts = statements("every 1h {\n  head 1\n}, jitter=5s");
        let Statement::Invocation(inv) = &stmts[0] else {
            panic!("expected invocation");
        };
        assert_eq!(inv.arguments.len(), 1);
        assert!(inv.block.is_some());
        assert_eq!(inv.trailing_arguments.len(), 1);
        assert!(matches!(inv.trailing_arguments[0], Argument::Named(_)));
    }

    #[test]
    fn record_argument_vs_block() {
        let stmts = statements("foo {a: 1}\nbar { baz }");
        let Statement::Invocation(foo) = &stmts[0] else {
            panic!("expected invocation");
        };
        assert_eq!(foo.arguments.len(), 1);
        assert!(foo.block.is_none());
        let Statement::Invocation(bar) = &stmts[1] else {
            panic!("expected invocation");
        };
        assert!(bar.arguments.is_empty());
        assert!(bar.block.is_some());
    }

    #[test]
    fn missing_separator() {
        let err = parse_input("head 1 2").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::Unexpected { .. }));
    }

    #[test]
    fn unclosed_block() {
        let err = parse_input("if x {\n  head 1\n").unwrap_err();
        assert!(matches!(
            err.kind,
            ParseErrorKind::UnclosedDelimiter {
                open: TokenKind::LBrace,
                ..
            }
        ));
    }

    #[test]
    fn partial_program_on_error() {
        let err = parse_input("head 1\nwhere x >").unwrap_err();
        let partial = err.partial.expect("partial program");
        assert_eq!(partial.pipeline.expect("pipeline").statements.len(), 1);
    }

    #[test]
    fn nesting_limit() {
        let tokens = tokenize("x = ((((1))))").expect("tokenize failed");
        let err = parse_with_options(&tokens, ParseOptions { max_depth: 3 }).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::NestingTooDeep { limit: 3 });
    }
}
