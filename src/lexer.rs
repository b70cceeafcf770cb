use std::fmt;
use std::iter::FusedIterator;

use crate::parser::DEFAULT_MAX_DEPTH;
use crate::token::{Span, Token, TokenKind};

/// Maximum number of `#` fences around a raw string.
pub const MAX_RAW_STRING_FENCES: usize = 8;

const BOM: &[u8] = "\u{FEFF}".as_bytes();

/// Binary and decimal unit suffixes a number may carry.
const NUMBER_UNITS: &[&str] = &[
    "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "k", "M", "G", "T", "P", "E",
];

/// Unit suffixes that turn a digit run into a duration.
pub const DURATION_UNITS: &[&str] = &[
    "ns", "us", "ms", "s", "sec", "second", "seconds", "m", "min", "minute", "minutes", "h", "hr",
    "hour", "hours", "d", "day", "days", "w", "week", "weeks", "y", "year", "years",
];

/// Classifies a lexer error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// Unterminated single- or double-quoted string.
    UnterminatedString,
    /// Raw string whose closing quote and fence never appear.
    UnterminatedRawString { fences: usize },
    /// Format string missing its closing quote.
    UnterminatedFormatString,
    /// `{` inside a format string without a matching `}`.
    UnterminatedFormatReplacement,
    /// Block comment missing its closing `*/`.
    UnterminatedComment,
    /// Backslash escape that is not recognized.
    InvalidEscape(char),
    /// Raw string with more fences than supported.
    TooManyRawStringFences(usize),
    /// Character that cannot start any token.
    UnexpectedCharacter(char),
    /// Format strings nested inside replacements beyond `limit` levels.
    NestingTooDeep { limit: usize },
}

impl LexErrorKind {
    /// The token kind the lexer was attempting when it failed.
    #[must_use]
    pub const fn attempted(&self) -> Option<TokenKind> {
        match self {
            Self::UnterminatedString
            | Self::UnterminatedRawString { .. }
            | Self::InvalidEscape(_)
            | Self::TooManyRawStringFences(_) => Some(TokenKind::String),
            Self::UnterminatedFormatString
            | Self::UnterminatedFormatReplacement
            | Self::NestingTooDeep { .. } => {
                Some(TokenKind::FormatString)
            }
            Self::UnterminatedComment => Some(TokenKind::Comment),
            Self::UnexpectedCharacter(_) => None,
        }
    }
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedString => write!(f, "unterminated string"),
            Self::UnterminatedRawString { fences } => {
                write!(
                    f,
                    "unterminated raw string, \
                     expected closing quote followed by {fences} '#'"
                )
            }
            Self::UnterminatedFormatString => write!(f, "unterminated format string"),
            Self::UnterminatedFormatReplacement => {
                write!(f, "unterminated format replacement, expected '}}'")
            }
            Self::UnterminatedComment => write!(f, "unterminated block comment"),
            Self::InvalidEscape(ch) => write!(f, "invalid escape sequence: \\{ch}"),
            Self::TooManyRawStringFences(n) => {
                write!(
                    f,
                    "raw string has {n} '#' fences, at most {MAX_RAW_STRING_FENCES} are allowed"
                )
            }
            Self::UnexpectedCharacter(ch) => write!(f, "unexpected character: {ch}"),
            Self::NestingTooDeep { limit } => {
                write!(f, "format strings nested more than {limit} levels deep")
            }
        }
    }
}

/// Error produced during lexing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", span.line, span.column)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

/// Tokenize a TQL source string into a sequence of tokens.
///
/// The result always ends with a single `Eof` token. Comments are
/// kept as `Comment` tokens; whitespace and line continuations are
/// not represented.
///
/// # Errors
///
/// Returns `LexError` on unterminated strings or comments, invalid
/// escapes, or characters that cannot start a token.
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, LexError> {
    Lexer::new(input).collect()
}

/// One piece of a format string body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FormatPiece {
    /// Literal text, including `{{`, `}}` and backslash escapes.
    Text(Span),
    /// A `{ ... }` replacement; `inner` excludes the braces.
    Replacement { span: Span, inner: Span },
}

/// Split a `FormatString` token into its text and replacement pieces.
pub(crate) fn format_pieces(token: &Token<'_>) -> Result<Vec<FormatPiece>, LexError> {
    let mut lexer = Lexer::resume(token.text, token.span);
    lexer.scan_format_string(lexer.mark())
}

/// Tokenize the source text covered by `span`, a sub-range of `token`.
pub(crate) fn tokenize_within<'src>(
    token: &Token<'src>,
    span: Span,
) -> Result<Vec<Token<'src>>, LexError> {
    let from = span.start - token.span.start;
    let to = span.end - token.span.start;
    Lexer::resume(&token.text[from..to], span).collect()
}

/// Decode backslash escapes in the body of a quoted string.
///
/// The body must already have been validated by the lexer.
pub(crate) fn unescape(body: &str) -> Vec<u8> {
    let bytes = body.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 1 >= bytes.len() {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let esc = bytes[i + 1];
        i += 2;
        match esc {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'0' => out.push(0),
            b'x' => {
                let value = bytes
                    .get(i..i + 2)
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                    .unwrap_or(b'?');
                out.push(value);
                i += 2;
            }
            b'u' => {
                let close = bytes[i..]
                    .iter()
                    .position(|&b| b == b'}')
                    .map_or(bytes.len(), |p| i + p);
                let ch = bytes
                    .get(i + 1..close)
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .and_then(char::from_u32)
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                let mut buf = [0; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                i = close + 1;
            }
            other => out.push(other),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Nothing significant seen yet; frontmatter may still open.
    Start,
    /// Inside a frontmatter block.
    Frontmatter,
    Normal,
}

#[derive(Debug, Clone, Copy)]
struct Mark {
    pos: usize,
    line: usize,
    col: usize,
}

/// Lazy, restartable TQL tokenizer.
///
/// Iterating yields tokens in source order, ending with exactly one
/// `Eof` token. After an error the iterator is exhausted.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    src: &'a str,
    input: &'a [u8],
    pos: usize,
    base: usize,
    line: usize,
    col: usize,
    mode: Mode,
    prev: Option<TokenKind>,
    depth: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Create a lexer at the start of `input`, skipping a UTF-8 BOM.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        let start = if input.as_bytes().starts_with(BOM) {
            BOM.len()
        } else {
            0
        };
        Self {
            src: input,
            input: input.as_bytes(),
            pos: start,
            base: 0,
            line: 1,
            col: 1,
            mode: Mode::Start,
            prev: None,
            depth: 0,
            finished: false,
        }
    }

    /// Create a lexer that resumes scanning `input` at byte `offset`.
    ///
    /// Line and column are recomputed for the offset. Frontmatter is
    /// only recognized when starting at offset zero. An offset inside a
    /// multi-byte character is moved back to the character start.
    #[must_use]
    pub fn starting_at(input: &'a str, offset: usize) -> Self {
        let mut offset = offset.min(input.len());
        while !input.is_char_boundary(offset) {
            offset -= 1;
        }
        if offset == 0 {
            return Self::new(input);
        }
        let mut lexer = Self::new(input);
        while lexer.pos < offset {
            lexer.advance();
        }
        lexer.mode = Mode::Normal;
        lexer
    }

    /// Lex `text` as if it were located at `origin` in a larger source.
    ///
    /// The text is an expression, never the head of a statement.
    const fn resume(text: &'a str, origin: Span) -> Self {
        Self {
            src: text,
            input: text.as_bytes(),
            pos: 0,
            base: origin.start,
            line: origin.line,
            col: origin.column,
            mode: Mode::Normal,
            prev: Some(TokenKind::LParen),
            depth: 0,
            finished: false,
        }
    }

    /// Produce the next token, or `Eof` at the end of input.
    ///
    /// # Errors
    ///
    /// Returns `LexError` when the upcoming input cannot be tokenized.
    pub fn next_token(&mut self) -> Result<Token<'a>, LexError> {
        if self.mode == Mode::Frontmatter {
            return Ok(self.read_frontmatter_part());
        }

        self.skip_extras();
        let start = self.mark();

        let Some(ch) = self.peek() else {
            return Ok(self.make_token(TokenKind::Eof, start));
        };

        if self.mode == Mode::Start && self.at_line_start() {
            if let Some(len) = self.frontmatter_delimiter(false) {
                self.advance_by(len);
                self.mode = Mode::Frontmatter;
                return Ok(self.make_token(TokenKind::FrontmatterOpen, start));
            }
        }

        let kind = match ch {
            b'\n' => {
                self.advance();
                TokenKind::Newline
            }
            b'/' if self.peek_at(1) == Some(b'/') => self.read_line_comment(),
            b'/' if self.peek_at(1) == Some(b'*') => self.read_block_comment(start)?,
            b'"' | b'\'' => self.read_quoted_string(start, 0)?,
            b'b' if matches!(self.peek_at(1), Some(b'"' | b'\'')) => {
                self.read_quoted_string(start, 1)?
            }
            b'b' if self.peek_at(1) == Some(b'r') && self.raw_string_ahead(2) => {
                self.read_raw_string(start, 2)?
            }
            b'r' if self.raw_string_ahead(1) => self.read_raw_string(start, 1)?,
            b'f' if self.peek_at(1) == Some(b'"') => {
                self.mode = Mode::Normal;
                let prev = self.prev;
                self.scan_format_string(start)?;
                self.prev = prev;
                TokenKind::FormatString
            }
            b'$' => self.read_dollar_var(start)?,
            b'@' => {
                self.advance();
                TokenKind::At
            }
            b'0'..=b'9' => self.read_literal(),
            b':' => self.read_colon(),
            c if c.is_ascii_alphabetic() || c == b'_' => self.read_word(),
            _ => self.read_punctuation(start)?,
        };

        if !matches!(kind, TokenKind::Newline | TokenKind::Comment) {
            self.mode = Mode::Normal;
        }
        if kind != TokenKind::Comment {
            self.prev = Some(kind);
        }
        Ok(self.make_token(kind, start))
    }

    const fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            line: self.line,
            col: self.col,
        }
    }

    const fn span_from(&self, start: Mark) -> Span {
        Span {
            start: self.base + start.pos,
            end: self.base + self.pos,
            line: start.line,
            column: start.col,
        }
    }

    fn make_token(&self, kind: TokenKind, start: Mark) -> Token<'a> {
        Token {
            kind,
            text: &self.src[start.pos..self.pos],
            span: self.span_from(start),
        }
    }

    fn error(&self, kind: LexErrorKind, start: Mark) -> LexError {
        LexError {
            kind,
            span: self.span_from(start),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(&byte) = self.input.get(self.pos) {
            if byte == b'\n' {
                self.line += 1;
                self.col = 1;
            } else if byte & 0xC0 != 0x80 {
                // UTF-8 continuation bytes share the column of their lead byte.
                self.col += 1;
            }
            self.pos += 1;
        }
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn at_line_start(&self) -> bool {
        self.pos == 0 || self.input[self.pos - 1] == b'\n' || self.input[..self.pos] == *BOM
    }

    fn skip_extras(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                b' ' | b'\t' | b'\r' => self.advance(),
                b'\\' => {
                    let mut i = self.pos + 1;
                    while matches!(self.input.get(i), Some(b' ' | b'\t' | b'\r')) {
                        i += 1;
                    }
                    if self.input.get(i) != Some(&b'\n') {
                        break;
                    }
                    self.advance_by(i + 1 - self.pos);
                }
                _ => break,
            }
        }
    }

    /// Length of a `---` delimiter line at the cursor, if there is one.
    fn frontmatter_delimiter(&self, allow_eof: bool) -> Option<usize> {
        let rest = &self.input[self.pos..];
        if !rest.starts_with(b"---") {
            return None;
        }
        let mut i = 3;
        while matches!(rest.get(i), Some(b' ' | b'\t')) {
            i += 1;
        }
        match rest.get(i) {
            Some(b'\n') => Some(i + 1),
            Some(b'\r') if rest.get(i + 1) == Some(&b'\n') => Some(i + 2),
            None if allow_eof => Some(i),
            _ => None,
        }
    }

    fn read_frontmatter_part(&mut self) -> Token<'a> {
        let start = self.mark();
        if self.peek().is_none() {
            self.mode = Mode::Normal;
            return self.make_token(TokenKind::Eof, start);
        }
        if let Some(len) = self.frontmatter_delimiter(true) {
            self.advance_by(len);
            self.mode = Mode::Normal;
            self.prev = Some(TokenKind::FrontmatterClose);
            return self.make_token(TokenKind::FrontmatterClose, start);
        }
        while self.peek().is_some() {
            if self.at_line_start() && self.frontmatter_delimiter(true).is_some() {
                break;
            }
            while let Some(ch) = self.peek() {
                self.advance();
                if ch == b'\n' {
                    break;
                }
            }
        }
        self.prev = Some(TokenKind::FrontmatterBody);
        self.make_token(TokenKind::FrontmatterBody, start)
    }

    fn read_line_comment(&mut self) -> TokenKind {
        while let Some(ch) = self.peek() {
            if ch == b'\n' || ch == b'\r' {
                break;
            }
            self.advance();
        }
        TokenKind::Comment
    }

    fn read_block_comment(&mut self, start: Mark) -> Result<TokenKind, LexError> {
        self.advance_by(2);
        loop {
            match self.peek() {
                None => return Err(self.error(LexErrorKind::UnterminatedComment, start)),
                Some(b'*') if self.peek_at(1) == Some(b'/') => {
                    self.advance_by(2);
                    return Ok(TokenKind::Comment);
                }
                Some(_) => self.advance(),
            }
        }
    }

    /// Validate the escape at the cursor (which sits on a backslash).
    fn read_escape(&mut self, in_format: bool) -> Result<(), LexError> {
        let start = self.mark();
        self.advance();
        let Some(ch) = self.peek() else {
            return Ok(());
        };
        match ch {
            b'n' | b'r' | b't' | b'0' | b'\\' | b'"' | b'\'' => self.advance(),
            b'{' | b'}' if in_format => self.advance(),
            b'x' if self.peek_at(1).is_some_and(|c| c.is_ascii_hexdigit())
                && self.peek_at(2).is_some_and(|c| c.is_ascii_hexdigit()) =>
            {
                self.advance_by(3);
            }
            b'u' if self.peek_at(1) == Some(b'{') => {
                let digits = self.input[self.pos + 2..]
                    .iter()
                    .take_while(|c| c.is_ascii_hexdigit())
                    .count();
                if !(1..=6).contains(&digits) || self.peek_at(2 + digits) != Some(b'}') {
                    self.advance();
                    return Err(self.error(LexErrorKind::InvalidEscape('u'), start));
                }
                self.advance_by(3 + digits);
            }
            _ => {
                let ch = self.src[self.pos..].chars().next().unwrap_or('\\');
                self.advance_by(ch.len_utf8());
                return Err(self.error(LexErrorKind::InvalidEscape(ch), start));
            }
        }
        Ok(())
    }

    fn read_quoted_string(&mut self, start: Mark, prefix: usize) -> Result<TokenKind, LexError> {
        self.advance_by(prefix);
        let Some(quote) = self.peek() else {
            return Err(self.error(LexErrorKind::UnterminatedString, start));
        };
        self.advance();

        loop {
            match self.peek() {
                None => return Err(self.error(LexErrorKind::UnterminatedString, start)),
                Some(b'\\') => {
                    if self.peek_at(1).is_none() {
                        self.advance();
                        return Err(self.error(LexErrorKind::UnterminatedString, start));
                    }
                    self.read_escape(false)?;
                }
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(TokenKind::String);
                }
                Some(_) => self.advance(),
            }
        }
    }

    /// Whether a raw string opens `offset` bytes ahead (fences then `"`).
    fn raw_string_ahead(&self, offset: usize) -> bool {
        let mut i = self.pos + offset;
        while self.input.get(i) == Some(&b'#') {
            i += 1;
        }
        self.input.get(i) == Some(&b'"')
    }

    fn read_raw_string(&mut self, start: Mark, prefix: usize) -> Result<TokenKind, LexError> {
        self.advance_by(prefix);
        let mut fences = 0;
        while self.peek() == Some(b'#') {
            fences += 1;
            self.advance();
        }
        if fences > MAX_RAW_STRING_FENCES {
            return Err(self.error(LexErrorKind::TooManyRawStringFences(fences), start));
        }
        self.advance(); // opening quote

        loop {
            match self.peek() {
                None => {
                    return Err(self.error(LexErrorKind::UnterminatedRawString { fences }, start));
                }
                Some(b'"') if (1..=fences).all(|i| self.peek_at(i) == Some(b'#')) => {
                    self.advance_by(1 + fences);
                    return Ok(TokenKind::String);
                }
                Some(_) => self.advance(),
            }
        }
    }

    /// Scan a format string starting at `f"`, returning its body pieces.
    fn scan_format_string(&mut self, start: Mark) -> Result<Vec<FormatPiece>, LexError> {
        self.advance_by(2);
        let mut pieces = Vec::new();
        let mut text: Option<Mark> = None;

        loop {
            match self.peek() {
                None => return Err(self.error(LexErrorKind::UnterminatedFormatString, start)),
                Some(b'"') => {
                    if let Some(mark) = text.take() {
                        pieces.push(FormatPiece::Text(self.span_from(mark)));
                    }
                    self.advance();
                    return Ok(pieces);
                }
                Some(b'{') if self.peek_at(1) != Some(b'{') => {
                    if let Some(mark) = text.take() {
                        pieces.push(FormatPiece::Text(self.span_from(mark)));
                    }
                    pieces.push(self.scan_format_replacement()?);
                }
                Some(ch) => {
                    if text.is_none() {
                        text = Some(self.mark());
                    }
                    match ch {
                        b'\\' => {
                            if self.peek_at(1).is_none() {
                                self.advance();
                                return Err(
                                    self.error(LexErrorKind::UnterminatedFormatString, start)
                                );
                            }
                            self.read_escape(true)?;
                        }
                        b'{' => self.advance_by(2),
                        b'}' if self.peek_at(1) == Some(b'}') => self.advance_by(2),
                        _ => self.advance(),
                    }
                }
            }
        }
    }

    fn scan_format_replacement(&mut self) -> Result<FormatPiece, LexError> {
        let open = self.mark();
        if self.depth >= DEFAULT_MAX_DEPTH {
            self.advance();
            return Err(self.error(
                LexErrorKind::NestingTooDeep {
                    limit: DEFAULT_MAX_DEPTH,
                },
                open,
            ));
        }
        self.depth += 1;
        let piece = self.scan_replacement_body(open);
        self.depth -= 1;
        piece
    }

    fn scan_replacement_body(&mut self, open: Mark) -> Result<FormatPiece, LexError> {
        self.advance();
        self.prev = Some(TokenKind::LParen);
        let inner_start = self.mark();
        let mut braces = 0usize;

        loop {
            let token = self.next_token()?;
            match token.kind {
                TokenKind::Eof => {
                    return Err(self.error(LexErrorKind::UnterminatedFormatReplacement, open));
                }
                TokenKind::LBrace => braces += 1,
                TokenKind::RBrace if braces == 0 => {
                    let inner = Span {
                        start: self.base + inner_start.pos,
                        end: token.span.start,
                        line: inner_start.line,
                        column: inner_start.col,
                    };
                    return Ok(FormatPiece::Replacement {
                        span: self.span_from(open),
                        inner,
                    });
                }
                TokenKind::RBrace => braces -= 1,
                _ => {}
            }
        }
    }

    fn read_dollar_var(&mut self, start: Mark) -> Result<TokenKind, LexError> {
        if !self
            .peek_at(1)
            .is_some_and(|c| c.is_ascii_alphabetic() || c == b'_')
        {
            self.advance();
            return Err(self.error(LexErrorKind::UnexpectedCharacter('$'), start));
        }
        self.advance();
        self.advance_by(ident_len(self.input, self.pos));
        Ok(TokenKind::DollarVar)
    }

    fn read_literal(&mut self) -> TokenKind {
        let (kind, len) = classify_literal(self.input, self.pos).unwrap_or((TokenKind::Number, 1));
        self.advance_by(len);
        kind
    }

    fn read_colon(&mut self) -> TokenKind {
        if self.peek_at(1) != Some(b':') {
            self.advance();
            return TokenKind::Colon;
        }
        let subnet = match_subnet(self.input, self.pos).unwrap_or(0);
        let ip = match_ipv6(self.input, self.pos).unwrap_or(2);
        if self.prev == Some(TokenKind::Identifier) {
            let adjacent = self.pos > 0 && is_ident_byte(self.input[self.pos - 1]);
            let word = if self.peek_at(2).is_some_and(is_ident_start) {
                ident_len(self.input, self.pos + 2)
            } else {
                0
            };
            // A spaced `::` continues a path unless an address covers the next word.
            if adjacent || (word > 0 && 2 + word > ip.max(subnet)) {
                self.advance_by(2);
                return TokenKind::ModuleSep;
            }
        }
        if subnet > ip {
            self.advance_by(subnet);
            TokenKind::Subnet
        } else {
            self.advance_by(ip);
            TokenKind::Ip
        }
    }

    fn read_word(&mut self) -> TokenKind {
        if let Some((kind, len)) = self.hex_address_ahead() {
            self.advance_by(len);
            return kind;
        }
        let len = ident_len(self.input, self.pos);
        let word = &self.src[self.pos..self.pos + len];
        self.advance_by(len);
        TokenKind::keyword(word).unwrap_or(TokenKind::Identifier)
    }

    /// An IPv6 address or subnet that starts with a hex letter.
    ///
    /// Only accepted when it cannot be an entity path: the first group
    /// holds a decimal digit or a single `:` separator appears.
    fn hex_address_ahead(&self) -> Option<(TokenKind, usize)> {
        let ip = match_ipv6(self.input, self.pos)?;
        let text = &self.input[self.pos..self.pos + ip];
        let first_group = text.split(|&c| c == b':').next().unwrap_or_default();
        let single_colon = text.windows(3).any(|w| w[1] == b':' && w[0] != b':' && w[2] != b':');
        if !first_group.iter().any(u8::is_ascii_digit) && !single_colon {
            return None;
        }
        let (kind, len) = match match_subnet(self.input, self.pos) {
            Some(subnet) if subnet > ip => (TokenKind::Subnet, subnet),
            _ => (TokenKind::Ip, ip),
        };
        if self.input.get(self.pos + len).is_some_and(|&c| is_ident_byte(c)) {
            return None;
        }
        if kind == TokenKind::Ip && entity_shaped(text) && self.entity_position(len) {
            return None;
        }
        Some((kind, len))
    }

    /// Whether a path-shaped word of `len` bytes must be an entity: it
    /// is called directly, or it heads a statement and is not a match
    /// pattern.
    fn entity_position(&self, len: usize) -> bool {
        let rest = &self.input[self.pos + len..];
        if rest.first() == Some(&b'(') {
            return true;
        }
        let statement_start = matches!(
            self.prev,
            None | Some(
                TokenKind::Newline
                    | TokenKind::Pipe
                    | TokenKind::LBrace
                    | TokenKind::FrontmatterClose
            )
        );
        if !statement_start {
            return false;
        }
        let skip = rest
            .iter()
            .take_while(|c| matches!(c, b' ' | b'\t'))
            .count();
        let next = &rest[skip..];
        !(next.starts_with(b"=>") || next.starts_with(b","))
    }

    fn read_punctuation(&mut self, start: Mark) -> Result<TokenKind, LexError> {
        let Some(ch) = self.peek() else {
            return Ok(TokenKind::Eof);
        };
        let next = self.peek_at(1);
        let (kind, len) = match ch {
            b'=' if next == Some(b'>') => (TokenKind::FatArrow, 2),
            b'=' if next == Some(b'=') => (TokenKind::EqEq, 2),
            b'=' => (TokenKind::Assign, 1),
            b'!' if next == Some(b'=') => (TokenKind::NotEq, 2),
            b'>' if next == Some(b'=') => (TokenKind::GtEq, 2),
            b'>' => (TokenKind::Gt, 1),
            b'<' if next == Some(b'=') => (TokenKind::LtEq, 2),
            b'<' => (TokenKind::Lt, 1),
            b'|' => (TokenKind::Pipe, 1),
            b'+' => (TokenKind::Plus, 1),
            b'-' => (TokenKind::Minus, 1),
            b'*' => (TokenKind::Star, 1),
            b'/' => (TokenKind::Slash, 1),
            b'.' if next == Some(b'.') && self.peek_at(2) == Some(b'.') => {
                (TokenKind::Ellipsis, 3)
            }
            b'.' if next == Some(b'?') => (TokenKind::DotQuestion, 2),
            b'.' => (TokenKind::Dot, 1),
            b'?' => (TokenKind::Question, 1),
            b'(' => (TokenKind::LParen, 1),
            b')' => (TokenKind::RParen, 1),
            b'[' => (TokenKind::LBracket, 1),
            b']' => (TokenKind::RBracket, 1),
            b'{' => (TokenKind::LBrace, 1),
            b'}' => (TokenKind::RBrace, 1),
            b',' => (TokenKind::Comma, 1),
            _ => {
                let ch = self.src[self.pos..].chars().next().unwrap_or('\u{FFFD}');
                self.advance_by(ch.len_utf8());
                return Err(self.error(LexErrorKind::UnexpectedCharacter(ch), start));
            }
        };
        self.advance_by(len);
        Ok(kind)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.next_token();
        match &result {
            Ok(token) if token.kind == TokenKind::Eof => self.finished = true,
            Err(_) => self.finished = true,
            Ok(_) => {}
        }
        Some(result)
    }
}

impl FusedIterator for Lexer<'_> {}

const fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

const fn is_ident_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

fn ident_len(input: &[u8], at: usize) -> usize {
    input[at..].iter().take_while(|&&c| is_ident_byte(c)).count()
}

/// `ident(::ident)+` with no single `:` in between.
fn entity_shaped(text: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(text) else {
        return false;
    };
    text.contains("::")
        && text.split("::").all(|part| {
            !part.contains(':') && part.as_bytes().first().is_some_and(|&c| is_ident_start(c))
        })
}

/// Classify the literal starting at `at`: longest match wins, ties go
/// to time, subnet, ip, number, duration in that order.
fn classify_literal(input: &[u8], at: usize) -> Option<(TokenKind, usize)> {
    let candidates = [
        (TokenKind::Time, match_time(input, at)),
        (TokenKind::Subnet, match_subnet(input, at)),
        (TokenKind::Ip, match_ip(input, at)),
        (TokenKind::Number, match_number(input, at)),
        (TokenKind::Duration, match_duration(input, at)),
    ];
    let mut best: Option<(TokenKind, usize)> = None;
    for (kind, len) in candidates {
        if let Some(len) = len {
            if best.is_none_or(|(_, best_len)| len > best_len) {
                best = Some((kind, len));
            }
        }
    }
    best
}

fn digits(input: &[u8], at: usize, max: usize) -> usize {
    input
        .get(at..)
        .unwrap_or_default()
        .iter()
        .take(max)
        .take_while(|c| c.is_ascii_digit())
        .count()
}

fn exact_digits(input: &[u8], at: usize, n: usize) -> Option<usize> {
    (digits(input, at, n) == n).then_some(at + n)
}

fn byte_is(input: &[u8], at: usize, expected: u8) -> Option<usize> {
    (input.get(at) == Some(&expected)).then_some(at + 1)
}

/// `YYYY-MM-DD`, optionally followed by `Thh:mm:ss[.fraction][offset]`.
fn match_time(input: &[u8], at: usize) -> Option<usize> {
    let mut end = exact_digits(input, at, 4)?;
    end = byte_is(input, end, b'-')?;
    end = exact_digits(input, end, 2)?;
    end = byte_is(input, end, b'-')?;
    end = exact_digits(input, end, 2)?;

    let clock = byte_is(input, end, b'T')
        .and_then(|i| exact_digits(input, i, 2))
        .and_then(|i| byte_is(input, i, b':'))
        .and_then(|i| exact_digits(input, i, 2))
        .and_then(|i| byte_is(input, i, b':'))
        .and_then(|i| exact_digits(input, i, 2));
    if let Some(mut i) = clock {
        if input.get(i) == Some(&b'.') {
            let n = digits(input, i + 1, 9);
            if n > 0 {
                i += 1 + n;
            }
        }
        if input.get(i) == Some(&b'Z') {
            i += 1;
        } else if let Some(offset) = input
            .get(i)
            .filter(|c| matches!(c, b'+' | b'-'))
            .and_then(|_| exact_digits(input, i + 1, 2))
            .and_then(|j| byte_is(input, j, b':'))
            .and_then(|j| exact_digits(input, j, 2))
        {
            i = offset;
        }
        end = i;
    }
    Some(end - at)
}

fn match_ipv4(input: &[u8], at: usize) -> Option<usize> {
    let mut end = at;
    for octet in 0..4 {
        if octet > 0 {
            end = byte_is(input, end, b'.')?;
        }
        let n = digits(input, end, 3);
        if n == 0 {
            return None;
        }
        end += n;
    }
    Some(end - at)
}

fn hex_run(input: &[u8], at: usize) -> usize {
    input
        .get(at..)
        .unwrap_or_default()
        .iter()
        .take_while(|c| c.is_ascii_hexdigit())
        .count()
}

/// Longest well-formed IPv6 address starting at `at`.
fn match_ipv6(input: &[u8], at: usize) -> Option<usize> {
    let mut end = at;
    let mut groups = 0;
    let mut compressed = false;
    let mut best = None;

    if input[at..].starts_with(b"::") {
        compressed = true;
        end += 2;
        best = Some(end);
    }

    loop {
        if end > at && input[end - 1] == b':' {
            if let Some(len) = match_ipv4(input, end) {
                if (compressed && groups <= 5) || (!compressed && groups == 6) {
                    best = Some(end + len);
                }
                break;
            }
        }
        let n = hex_run(input, end);
        if n == 0 || n > 4 {
            break;
        }
        end += n;
        groups += 1;
        if compressed {
            if groups > 7 {
                break;
            }
            best = Some(end);
        } else if groups == 8 {
            best = Some(end);
            break;
        }
        if input[end..].starts_with(b"::") {
            if compressed {
                break;
            }
            compressed = true;
            end += 2;
            best = Some(end);
            continue;
        }
        if input.get(end) == Some(&b':') && input.get(end + 1).is_some_and(u8::is_ascii_hexdigit)
        {
            end += 1;
            continue;
        }
        break;
    }

    best.map(|end| end - at)
}

fn match_ip(input: &[u8], at: usize) -> Option<usize> {
    match (match_ipv4(input, at), match_ipv6(input, at)) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn match_subnet(input: &[u8], at: usize) -> Option<usize> {
    let prefix = |len: usize, max: usize| {
        let slash = byte_is(input, at + len, b'/')?;
        let n = digits(input, slash, max);
        (n > 0).then_some(slash + n - at)
    };
    let v4 = match_ipv4(input, at).and_then(|len| prefix(len, 2));
    let v6 = match_ipv6(input, at).and_then(|len| prefix(len, 3));
    match (v4, v6) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

/// `\d+(_\d+)*`
fn digit_groups(input: &[u8], at: usize) -> Option<usize> {
    let n = digits(input, at, usize::MAX);
    if n == 0 {
        return None;
    }
    let mut end = at + n;
    while input.get(end) == Some(&b'_') {
        let more = digits(input, end + 1, usize::MAX);
        if more == 0 {
            break;
        }
        end += 1 + more;
    }
    Some(end)
}

fn match_number(input: &[u8], at: usize) -> Option<usize> {
    let mut end = digit_groups(input, at)?;
    if input.get(end) == Some(&b'.') {
        if let Some(fraction) = digit_groups(input, end + 1) {
            end = fraction;
        }
    }
    if matches!(input.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(input.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        if let Some(exponent) = digit_groups(input, exp) {
            end = exponent;
        }
    }
    if let Some(unit) = NUMBER_UNITS
        .iter()
        .find(|unit| input[end..].starts_with(unit.as_bytes()))
    {
        end += unit.len();
    }
    Some(end - at)
}

fn match_duration(input: &[u8], at: usize) -> Option<usize> {
    let n = digits(input, at, usize::MAX);
    if n == 0 {
        return None;
    }
    let unit = DURATION_UNITS
        .iter()
        .filter(|unit| input[at + n..].starts_with(unit.as_bytes()))
        .map(|unit| unit.len())
        .max()?;
    Some(n + unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .expect("should tokenize")
            .iter()
            .map(|t| t.kind)
            .collect()
    }

    fn single(input: &str) -> (TokenKind, String) {
        let tokens = tokenize(input).expect("should tokenize");
        assert_eq!(tokens.len(), 2, "expected one token in {input:?}: {tokens:?}");
        (tokens[0].kind, tokens[0].text.to_string())
    }

    #[test]
    fn simple_words() {
        let tokens = tokenize("where x").expect("should tokenize");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].text, "where");
        assert_eq!(tokens[1].text, "x");
        assert_eq!(tokens[2].kind, TokenKind::Eof);
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("let if else match and or not in move this _ foo"),
            vec![
                TokenKind::Let,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::Match,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::In,
                TokenKind::Move,
                TokenKind::This,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn literal_priority() {
        assert_eq!(single("42").0, TokenKind::Number);
        assert_eq!(single("1_000.5e-3k").0, TokenKind::Number);
        assert_eq!(single("10Gi").0, TokenKind::Number);
        assert_eq!(single("5min").0, TokenKind::Duration);
        assert_eq!(single("100ms").0, TokenKind::Duration);
        assert_eq!(single("3years").0, TokenKind::Duration);
        assert_eq!(single("2024-01-15").0, TokenKind::Time);
        assert_eq!(single("2024-01-15T10:30:00.123Z").0, TokenKind::Time);
        assert_eq!(single("2024-01-15T10:30:00+02:00").0, TokenKind::Time);
        assert_eq!(single("192.168.0.1").0, TokenKind::Ip);
        assert_eq!(single("10.0.0.0/8").0, TokenKind::Subnet);
        assert_eq!(single("2001:db8::1").0, TokenKind::Ip);
        assert_eq!(single("2001:db8::/32").0, TokenKind::Subnet);
    }

    #[test]
    fn subnet_beats_division() {
        let tokens = tokenize("10.0.0.0/8").expect("should tokenize");
        assert_eq!(tokens[0].kind, TokenKind::Subnet);
        assert_eq!(tokens[0].text, "10.0.0.0/8");

        assert_eq!(
            kinds("x / 8"),
            vec![
                TokenKind::Identifier,
                TokenKind::Slash,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn module_separator_vs_ipv6() {
        assert_eq!(
            kinds("foo::bar"),
            vec![
                TokenKind::Identifier,
                TokenKind::ModuleSep,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
        assert_eq!(single("::").0, TokenKind::Ip);
        assert_eq!(single("::1").0, TokenKind::Ip);
        assert_eq!(single("::ffff:10.0.0.1").0, TokenKind::Ip);
        assert_eq!(single("::/0").0, TokenKind::Subnet);
        assert_eq!(single("fe80::1").0, TokenKind::Ip);
        assert_eq!(kinds("ab::cd")[1], TokenKind::ModuleSep);
    }

    #[test]
    fn strings() {
        assert_eq!(single(r#""hello \"world\"""#).0, TokenKind::String);
        assert_eq!(single("'single'").0, TokenKind::String);
        assert_eq!(single(r#"b"\xff""#).0, TokenKind::String);
        assert_eq!(single(r#"r"C:\path""#).0, TokenKind::String);
        assert_eq!(single(r###"r##"a "# b"##"###).0, TokenKind::String);
        assert_eq!(single(r##"br#"raw"#"##).0, TokenKind::String);
    }

    #[test]
    fn unterminated_quote() {
        let err = tokenize("\"unclosed").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
        assert_eq!(err.span.start, 0);
    }

    #[test]
    fn raw_string_fence_mismatch() {
        let err = tokenize(r##"r#"abc""##).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedRawString { fences: 1 });
        assert_eq!(err.kind.attempted(), Some(TokenKind::String));
    }

    #[test]
    fn invalid_escape() {
        let err = tokenize(r#""\q""#).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::InvalidEscape('q'));
    }

    #[test]
    fn format_string_pieces() {
        let tokens = tokenize(r#"f"a{{b}} {x + "}"} c""#).expect("should tokenize");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::FormatString);
        let pieces = format_pieces(&tokens[0]).expect("should split");
        assert_eq!(pieces.len(), 3);
        let FormatPiece::Replacement { inner, .. } = pieces[1] else {
            panic!("expected replacement, got {:?}", pieces[1]);
        };
        let source = r#"f"a{{b}} {x + "}"} c""#;
        assert_eq!(&source[inner.start..inner.end], r#"x + "}""#);
    }

    #[test]
    fn unterminated_format_replacement() {
        let err = tokenize(r#"f"{x"#).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedFormatReplacement);
    }

    #[test]
    fn format_string_nesting_limit() {
        let nested = |n: usize| format!("{}x{}", "f\"{".repeat(n), "}\"".repeat(n));
        assert!(tokenize(&nested(DEFAULT_MAX_DEPTH)).is_ok());

        let err = tokenize(&nested(DEFAULT_MAX_DEPTH + 1)).unwrap_err();
        assert_eq!(
            err.kind,
            LexErrorKind::NestingTooDeep {
                limit: DEFAULT_MAX_DEPTH
            }
        );
        assert_eq!(err.kind.attempted(), Some(TokenKind::FormatString));
    }

    #[test]
    fn path_shaped_replacement_is_an_address() {
        let tokens = tokenize(r#"f"{a1::b}""#).expect("should tokenize");
        let pieces = format_pieces(&tokens[0]).expect("should split");
        let FormatPiece::Replacement { inner, .. } = pieces[0] else {
            panic!("expected replacement, got {:?}", pieces[0]);
        };
        let inner = tokenize_within(&tokens[0], inner).expect("should tokenize");
        assert_eq!(inner[0].kind, TokenKind::Ip);
    }

    #[test]
    fn comments_are_tokens() {
        let tokens = tokenize("a // note\nb /* block */ c").expect("should tokenize");
        assert_eq!(tokens[1].kind, TokenKind::Comment);
        assert_eq!(tokens[1].text, "// note");
        assert_eq!(tokens[4].kind, TokenKind::Comment);
        assert_eq!(tokens[4].text, "/* block */");
    }

    #[test]
    fn unterminated_block_comment() {
        let err = tokenize("a /* open").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedComment);
    }

    #[test]
    fn line_continuation() {
        let tokens = tokenize("head \\\n  5").expect("should tokenize");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].text, "5");
        assert_eq!(tokens[1].span.line, 2);
    }

    #[test]
    fn frontmatter_block() {
        let input = "---\ntitle: x\n---\nhead\n";
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::FrontmatterOpen,
                TokenKind::FrontmatterBody,
                TokenKind::FrontmatterClose,
                TokenKind::Identifier,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn frontmatter_only_at_start() {
        let tokens = kinds("head\n---\n");
        assert!(!tokens.contains(&TokenKind::FrontmatterOpen));
    }

    #[test]
    fn restart_at_offset() {
        let input = "head 1\nwhere x";
        let tokens: Vec<_> = Lexer::starting_at(input, 7)
            .collect::<Result<_, _>>()
            .expect("should tokenize");
        assert_eq!(tokens[0].text, "where");
        assert_eq!(tokens[0].span.line, 2);
        assert_eq!(tokens[0].span.column, 1);
        assert_eq!(tokens[0].span.start, 7);
    }

    #[test]
    fn bom_stripping() {
        let tokens = tokenize("\u{FEFF}head").expect("should tokenize");
        assert_eq!(tokens[0].text, "head");
        assert_eq!(tokens[0].span.start, 3);
    }

    #[test]
    fn span_tracking() {
        let tokens = tokenize("a\nb c").expect("should tokenize");
        assert_eq!(tokens[0].span.line, 1);
        assert_eq!(tokens[0].span.column, 1);
        assert_eq!(tokens[2].span.line, 2);
        assert_eq!(tokens[2].span.column, 1);
        assert_eq!(tokens[3].span.line, 2);
        assert_eq!(tokens[3].span.column, 3);
    }

    #[test]
    fn unescape_sequences() {
        assert_eq!(unescape(r"a\nb"), b"a\nb");
        assert_eq!(unescape(r"\x41\u{1F600}"), "A\u{1F600}".as_bytes());
        assert_eq!(unescape(r#"\"\\"#), b"\"\\");
    }
}
