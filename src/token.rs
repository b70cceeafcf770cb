use std::fmt;

use serde::Serialize;

/// Source location of a token or syntax node.
///
/// `start` and `end` are byte offsets into the source; `line` and
/// `column` point at `start` and are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    /// Span covering `self` through the end of `other`.
    #[must_use]
    pub const fn to(self, other: Self) -> Self {
        Self {
            start: self.start,
            end: other.end,
            line: self.line,
            column: self.column,
        }
    }

    /// Zero-width span at the end of `self`.
    #[must_use]
    pub const fn end_point(self) -> Self {
        Self {
            start: self.end,
            end: self.end,
            line: self.line,
            column: self.column,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[must_use]
    pub const fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // Keywords.
    Let,
    If,
    Else,
    Match,
    And,
    Or,
    Not,
    In,
    Move,
    This,

    /// Identifier (`[A-Za-z_][A-Za-z0-9_]*`), including `_`.
    Identifier,
    /// Dollar variable (`$name`).
    DollarVar,
    /// Module separator `::`.
    ModuleSep,
    /// Metadata sigil `@`.
    At,

    // Literals.
    Null,
    True,
    False,
    Number,
    /// Plain, byte, or raw string.
    String,
    /// Format string (`f"..."`).
    FormatString,
    Ip,
    Subnet,
    Time,
    Duration,

    // Operators.
    Assign,
    FatArrow,
    Pipe,
    EqEq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Dot,
    DotQuestion,
    Question,
    Ellipsis,

    // Delimiters.
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,

    Newline,
    /// Comment (`// ...` or `/* ... */`).
    Comment,
    /// Opening `---` line of a frontmatter block.
    FrontmatterOpen,
    /// Opaque frontmatter content between the delimiter lines.
    FrontmatterBody,
    /// Closing `---` line of a frontmatter block.
    FrontmatterClose,
    Eof,
}

/// Reserved words and the kinds they lex to.
pub const KEYWORDS: &[(&str, TokenKind)] = &[
    ("let", TokenKind::Let),
    ("if", TokenKind::If),
    ("else", TokenKind::Else),
    ("match", TokenKind::Match),
    ("and", TokenKind::And),
    ("or", TokenKind::Or),
    ("not", TokenKind::Not),
    ("in", TokenKind::In),
    ("move", TokenKind::Move),
    ("this", TokenKind::This),
    ("null", TokenKind::Null),
    ("true", TokenKind::True),
    ("false", TokenKind::False),
];

impl TokenKind {
    /// Look up the keyword kind for an identifier-shaped word.
    #[must_use]
    pub fn keyword(word: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|(text, _)| *text == word)
            .map(|(_, kind)| *kind)
    }

    /// Whether this token is trivia the parser skips.
    #[must_use]
    pub const fn is_trivia(self) -> bool {
        matches!(self, Self::Comment)
    }

    /// Whether this token is a literal.
    #[must_use]
    pub const fn is_literal(self) -> bool {
        matches!(
            self,
            Self::Null
                | Self::True
                | Self::False
                | Self::Number
                | Self::String
                | Self::FormatString
                | Self::Ip
                | Self::Subnet
                | Self::Time
                | Self::Duration
        )
    }

    /// Human-readable description used in diagnostics.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Let => "'let'",
            Self::If => "'if'",
            Self::Else => "'else'",
            Self::Match => "'match'",
            Self::And => "'and'",
            Self::Or => "'or'",
            Self::Not => "'not'",
            Self::In => "'in'",
            Self::Move => "'move'",
            Self::This => "'this'",
            Self::Identifier => "identifier",
            Self::DollarVar => "dollar variable",
            Self::ModuleSep => "'::'",
            Self::At => "'@'",
            Self::Null => "'null'",
            Self::True => "'true'",
            Self::False => "'false'",
            Self::Number => "number",
            Self::String => "string",
            Self::FormatString => "format string",
            Self::Ip => "ip address",
            Self::Subnet => "subnet",
            Self::Time => "time",
            Self::Duration => "duration",
            Self::Assign => "'='",
            Self::FatArrow => "'=>'",
            Self::Pipe => "'|'",
            Self::EqEq => "'=='",
            Self::NotEq => "'!='",
            Self::Gt => "'>'",
            Self::GtEq => "'>='",
            Self::Lt => "'<'",
            Self::LtEq => "'<='",
            Self::Plus => "'+'",
            Self::Minus => "'-'",
            Self::Star => "'*'",
            Self::Slash => "'/'",
            Self::Dot => "'.'",
            Self::DotQuestion => "'.?'",
            Self::Question => "'?'",
            Self::Ellipsis => "'...'",
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::LBracket => "'['",
            Self::RBracket => "']'",
            Self::LBrace => "'{'",
            Self::RBrace => "'}'",
            Self::Comma => "','",
            Self::Colon => "':'",
            Self::Newline => "newline",
            Self::Comment => "comment",
            Self::FrontmatterOpen => "frontmatter start",
            Self::FrontmatterBody => "frontmatter",
            Self::FrontmatterClose => "frontmatter end",
            Self::Eof => "end of input",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A single token with its kind, source text, and location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
    pub span: Span,
}
