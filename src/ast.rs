//! Concrete syntax tree for TQL programs.
//!
//! Every node carries the `Span` of the tokens it was built from and
//! owns its children. Literal nodes keep their source text so the
//! formatter can reproduce them exactly.

use std::fmt;
use std::net::IpAddr;

use serde::Serialize;

use crate::token::Span;

/// Complete TQL program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Program {
    pub frontmatter: Option<Frontmatter>,
    pub pipeline: Option<Pipeline>,
    pub span: Span,
}

/// Opaque `---` delimited preamble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frontmatter {
    /// Raw text between the delimiter lines.
    pub body: String,
    /// Whether a closing `---` line was present.
    pub closed: bool,
    pub span: Span,
}

/// Non-empty sequence of statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pipeline {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Statement {
    Let(LetStatement),
    If(IfStatement),
    Match(MatchStatement),
    Assignment(Assignment),
    Invocation(Invocation),
}

impl Statement {
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Let(s) => s.span,
            Self::If(s) => s.span,
            Self::Match(s) => s.span,
            Self::Assignment(s) => s.span,
            Self::Invocation(s) => s.span,
        }
    }
}

/// `let $name = value`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LetStatement {
    /// Variable name without the `$` sigil.
    pub name: Identifier,
    pub value: Expr,
    pub span: Span,
}

/// `if condition { ... } else ...`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IfStatement {
    pub condition: Expr,
    pub consequence: Block,
    pub alternative: Option<ElseBranch>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ElseBranch {
    /// `else if ...`
    If(Box<IfStatement>),
    /// `else { ... }`
    Block(Block),
}

/// `{ ... }` with an optional pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub body: Option<Pipeline>,
    pub span: Span,
}

/// `match subject { pattern => { ... } ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchStatement {
    pub subject: Expr,
    pub arms: Vec<MatchArm>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchArm {
    pub patterns: Vec<Expr>,
    pub body: Pipeline,
    pub span: Span,
}

/// `selector = expression`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub left: Selector,
    pub right: Expr,
    pub span: Span,
}

/// Operator invocation, e.g. `where x > 1` or `every 1h { ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub operator: Entity,
    pub arguments: Vec<Argument>,
    /// Whether `arguments` were written inside parentheses.
    pub parenthesized: bool,
    /// Nested sub-pipeline.
    pub block: Option<Pipeline>,
    /// Arguments following the block after a comma.
    pub trailing_arguments: Vec<Argument>,
    pub span: Span,
}

/// Operator or call argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Argument {
    /// `name=value`
    Named(Assignment),
    Positional(Expr),
}

impl Argument {
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Named(a) => a.span,
            Self::Positional(e) => e.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

/// `::`-qualified name of an operator or function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub segments: Vec<Identifier>,
    pub span: Span,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("::")?;
            }
            f.write_str(&segment.name)?;
        }
        Ok(())
    }
}

/// Target of an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Selector {
    Meta(MetaSelector),
    Field(FieldSelector),
}

impl Selector {
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Meta(m) => m.span,
            Self::Field(f) => f.span,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Meta(m) => write!(f, "{m}"),
            Self::Field(field) => write!(f, "{field}"),
        }
    }
}

/// `@name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetaSelector {
    pub name: Identifier,
    pub span: Span,
}

impl fmt::Display for MetaSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name.name)
    }
}

/// `this`, `a.b?.c`, or `this.a`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSelector {
    /// Rooted at `this`.
    pub this: bool,
    pub segments: Vec<FieldSegment>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSegment {
    pub name: Identifier,
    /// Followed by `?`.
    pub optional: bool,
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.this {
            f.write_str("this")?;
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 || self.this {
                f.write_str(".")?;
            }
            f.write_str(&segment.name.name)?;
            if segment.optional {
                f.write_str("?")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ExprKind {
    Literal(Literal),
    Format(FormatExpr),
    Identifier(String),
    /// `$name`, stored without the sigil.
    DollarVar(String),
    Meta(MetaSelector),
    This,
    /// `_`
    Placeholder,
    List(Vec<ListItem>),
    Record(Vec<RecordItem>),
    Paren(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Member {
        receiver: Box<Expr>,
        name: Identifier,
        optional: Option<OptionalMarker>,
    },
    Index {
        receiver: Box<Expr>,
        index: Box<Expr>,
        /// Followed by `?`.
        optional: bool,
    },
    /// `f(args)` or, with a receiver, `receiver.f(args)`.
    Call {
        receiver: Option<Box<Expr>>,
        function: Entity,
        arguments: Vec<Argument>,
    },
    Lambda {
        param: Identifier,
        body: Box<Expr>,
    },
}

/// How an optional member access was spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OptionalMarker {
    /// `a.b?`
    Suffix,
    /// `a.?b`
    Prefix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Else,
    If,
    Or,
    And,
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
    In,
    NotIn,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    /// Binding power; higher binds tighter.
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Else => 1,
            Self::If => 2,
            Self::Or => 3,
            Self::And => 4,
            Self::Eq
            | Self::NotEq
            | Self::Gt
            | Self::GtEq
            | Self::Lt
            | Self::LtEq
            | Self::In
            | Self::NotIn => 6,
            Self::Add | Self::Sub => 7,
            Self::Mul | Self::Div => 8,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Else => "else",
            Self::If => "if",
            Self::Or => "or",
            Self::And => "and",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Not,
    Move,
    Plus,
    Neg,
}

impl UnaryOp {
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Not | Self::Move => 5,
            Self::Plus | Self::Neg => 9,
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Not => "not ",
            Self::Move => "move ",
            Self::Plus => "+",
            Self::Neg => "-",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ListItem {
    Expr(Expr),
    Spread(Spread),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RecordItem {
    Field(RecordField),
    Spread(Spread),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordField {
    pub key: RecordKey,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RecordKey {
    Identifier(Identifier),
    String(StringLiteral),
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(id) => f.write_str(&id.name),
            Self::String(s) => f.write_str(&s.text),
        }
    }
}

/// `...expr`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Spread {
    pub expr: Expr,
    pub span: Span,
}

/// `f"..."` with interleaved text and replacements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatExpr {
    pub segments: Vec<FormatSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FormatSegment {
    Text(FormatText),
    Replacement(FormatReplacement),
}

impl FormatSegment {
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Text(t) => t.span,
            Self::Replacement(r) => r.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatText {
    /// Source text, escapes included.
    pub raw: String,
    /// Text with `{{`, `}}` and escapes decoded.
    pub value: String,
    pub span: Span,
}

/// `{ expr }` inside a format string; the span includes the braces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatReplacement {
    pub expr: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(NumberLiteral),
    String(StringLiteral),
    Ip(IpLiteral),
    Subnet(SubnetLiteral),
    Time(TimeLiteral),
    Duration(DurationLiteral),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => f.write_str(&n.text),
            Self::String(s) => f.write_str(&s.text),
            Self::Ip(ip) => f.write_str(&ip.text),
            Self::Subnet(subnet) => f.write_str(&subnet.text),
            Self::Time(t) => f.write_str(&t.text),
            Self::Duration(d) => f.write_str(&d.text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumberLiteral {
    pub text: String,
    /// Unit suffix such as `k` or `Mi`.
    pub unit: Option<String>,
}

impl NumberLiteral {
    /// Numeric value with the unit multiplier applied.
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        let unit = self.unit.as_deref().unwrap_or("");
        let digits: String = self.text[..self.text.len() - unit.len()]
            .chars()
            .filter(|&c| c != '_')
            .collect();
        let multiplier = match unit {
            "" => 1.0,
            "k" => 1e3,
            "M" => 1e6,
            "G" => 1e9,
            "T" => 1e12,
            "P" => 1e15,
            "E" => 1e18,
            "Ki" => 1024.0,
            "Mi" => 1024.0_f64.powi(2),
            "Gi" => 1024.0_f64.powi(3),
            "Ti" => 1024.0_f64.powi(4),
            "Pi" => 1024.0_f64.powi(5),
            "Ei" => 1024.0_f64.powi(6),
            _ => return None,
        };
        digits.parse::<f64>().ok().map(|v| v * multiplier)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StringLiteral {
    /// Source text including prefix and quotes.
    pub text: String,
    pub value: StringValue,
    /// Written with an `r` or `br` prefix.
    pub raw: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StringValue {
    Text(String),
    Bytes(Vec<u8>),
}

impl StringValue {
    /// The decoded text, if this is not a byte string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Bytes(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpLiteral {
    pub text: String,
    /// `None` when the text is not a real address, e.g. an octet above 255.
    pub addr: Option<IpAddr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubnetLiteral {
    pub text: String,
    pub addr: Option<IpAddr>,
    pub prefix: u16,
}

impl SubnetLiteral {
    /// Whether the address parses and the prefix fits its family.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.addr.is_some_and(|addr| {
            let max = if addr.is_ipv4() { 32 } else { 128 };
            self.prefix <= max
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeLiteral {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DurationLiteral {
    pub text: String,
    /// `None` when the digits overflow `u64`.
    pub magnitude: Option<u64>,
    pub unit: DurationUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DurationUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Years,
}

impl DurationUnit {
    /// Map a unit suffix (`ms`, `min`, `hours`, ...) to its unit.
    #[must_use]
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Some(match suffix {
            "ns" => Self::Nanoseconds,
            "us" => Self::Microseconds,
            "ms" => Self::Milliseconds,
            "s" | "sec" | "second" | "seconds" => Self::Seconds,
            "m" | "min" | "minute" | "minutes" => Self::Minutes,
            "h" | "hr" | "hour" | "hours" => Self::Hours,
            "d" | "day" | "days" => Self::Days,
            "w" | "week" | "weeks" => Self::Weeks,
            "y" | "year" | "years" => Self::Years,
            _ => return None,
        })
    }

    /// Length of one unit in nanoseconds. A year counts 365 days.
    #[must_use]
    pub const fn nanos(self) -> u128 {
        const SECOND: u128 = 1_000_000_000;
        match self {
            Self::Nanoseconds => 1,
            Self::Microseconds => 1_000,
            Self::Milliseconds => 1_000_000,
            Self::Seconds => SECOND,
            Self::Minutes => 60 * SECOND,
            Self::Hours => 3_600 * SECOND,
            Self::Days => 86_400 * SECOND,
            Self::Weeks => 7 * 86_400 * SECOND,
            Self::Years => 365 * 86_400 * SECOND,
        }
    }
}

impl DurationLiteral {
    /// Total length in nanoseconds, if the magnitude fits.
    #[must_use]
    pub fn as_nanos(&self) -> Option<u128> {
        self.magnitude
            .map(|magnitude| u128::from(magnitude) * self.unit.nanos())
    }
}
