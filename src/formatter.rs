//! Pretty-printer that serializes a TQL syntax tree back into canonical text.
//!
//! One statement per line, two-space indentation inside blocks, single
//! spaces around binary operators. Comments are not part of the tree
//! and are not reproduced.

use std::fmt::Write as _;

use crate::ast::{
    Argument, Block, ElseBranch, Expr, ExprKind, FormatExpr, FormatSegment, Frontmatter,
    IfStatement, Invocation, ListItem, MatchStatement, OptionalMarker, Pipeline, Program,
    RecordItem, Statement,
};

const INDENT: &str = "  ";

/// Format a `Program` into canonical TQL source.
///
/// The output always ends with a newline and parses back into an
/// equivalent program.
#[must_use]
pub fn format(program: &Program) -> String {
    let mut out = String::new();
    if let Some(frontmatter) = &program.frontmatter {
        format_frontmatter(&mut out, frontmatter);
    }
    if let Some(pipeline) = &program.pipeline {
        format_pipeline(&mut out, pipeline, 0);
    }

    // Trailing newline
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Format a single expression on one line.
#[must_use]
pub fn format_expr(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr);
    out
}

fn format_frontmatter(out: &mut String, frontmatter: &Frontmatter) {
    out.push_str("---\n");
    out.push_str(&frontmatter.body);
    if !frontmatter.body.is_empty() && !frontmatter.body.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("---\n");
}

fn format_pipeline(out: &mut String, pipeline: &Pipeline, indent: usize) {
    for statement in &pipeline.statements {
        push_indent(out, indent);
        format_statement(out, statement, indent);
        out.push('\n');
    }
}

fn format_statement(out: &mut String, statement: &Statement, indent: usize) {
    match statement {
        Statement::Let(stmt) => {
            let _ = write!(out, "let ${} = ", stmt.name.name);
            write_expr(out, &stmt.value);
        }
        Statement::If(stmt) => format_if(out, stmt, indent),
        Statement::Match(stmt) => format_match(out, stmt, indent),
        Statement::Assignment(assignment) => {
            let _ = write!(out, "{} = ", assignment.left);
            write_expr(out, &assignment.right);
        }
        Statement::Invocation(invocation) => format_invocation(out, invocation, indent),
    }
}

fn format_if(out: &mut String, stmt: &IfStatement, indent: usize) {
    out.push_str("if ");
    write_expr(out, &stmt.condition);
    format_block(out, &stmt.consequence, indent);
    match &stmt.alternative {
        Some(ElseBranch::If(nested)) => {
            out.push_str(" else ");
            format_if(out, nested, indent);
        }
        Some(ElseBranch::Block(block)) => {
            out.push_str(" else");
            format_block(out, block, indent);
        }
        None => {}
    }
}

fn format_block(out: &mut String, block: &Block, indent: usize) {
    match &block.body {
        Some(pipeline) => format_pipeline_block(out, pipeline, indent),
        None => out.push_str(" {}"),
    }
}

/// ` {`, the nested pipeline, and the closing `}` at `indent`.
fn format_pipeline_block(out: &mut String, pipeline: &Pipeline, indent: usize) {
    out.push_str(" {\n");
    format_pipeline(out, pipeline, indent + 1);
    push_indent(out, indent);
    out.push('}');
}

fn format_match(out: &mut String, stmt: &MatchStatement, indent: usize) {
    out.push_str("match ");
    write_expr(out, &stmt.subject);
    if stmt.arms.is_empty() {
        out.push_str(" {}");
        return;
    }
    out.push_str(" {\n");
    for arm in &stmt.arms {
        push_indent(out, indent + 1);
        for (i, pattern) in arm.patterns.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write_expr(out, pattern);
        }
        out.push_str(" =>");
        format_pipeline_block(out, &arm.body, indent + 1);
        out.push('\n');
    }
    push_indent(out, indent);
    out.push('}');
}

fn format_invocation(out: &mut String, invocation: &Invocation, indent: usize) {
    let _ = write!(out, "{}", invocation.operator);
    if invocation.parenthesized {
        out.push('(');
        write_arguments(out, &invocation.arguments);
        out.push(')');
    } else if !invocation.arguments.is_empty() {
        out.push(' ');
        write_arguments(out, &invocation.arguments);
    }
    if let Some(block) = &invocation.block {
        format_pipeline_block(out, block, indent);
        if !invocation.trailing_arguments.is_empty() {
            out.push_str(", ");
            write_arguments(out, &invocation.trailing_arguments);
        }
    }
}

fn write_arguments(out: &mut String, arguments: &[Argument]) {
    for (i, argument) in arguments.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        match argument {
            Argument::Named(assignment) => {
                let _ = write!(out, "{}=", assignment.left);
                write_expr(out, &assignment.right);
            }
            Argument::Positional(expr) => write_expr(out, expr),
        }
    }
}

fn write_expr(out: &mut String, expr: &Expr) {
    match &expr.kind {
        ExprKind::Literal(literal) => {
            let _ = write!(out, "{literal}");
        }
        ExprKind::Format(format) => write_format(out, format),
        ExprKind::Identifier(name) => out.push_str(name),
        ExprKind::DollarVar(name) => {
            out.push('$');
            out.push_str(name);
        }
        ExprKind::Meta(meta) => {
            let _ = write!(out, "{meta}");
        }
        ExprKind::This => out.push_str("this"),
        ExprKind::Placeholder => out.push('_'),
        ExprKind::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                match item {
                    ListItem::Expr(expr) => write_expr(out, expr),
                    ListItem::Spread(spread) => {
                        out.push_str("...");
                        write_expr(out, &spread.expr);
                    }
                }
            }
            out.push(']');
        }
        ExprKind::Record(items) => {
            out.push('{');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                match item {
                    RecordItem::Field(field) => {
                        let _ = write!(out, "{}: ", field.key);
                        write_expr(out, &field.value);
                    }
                    RecordItem::Spread(spread) => {
                        out.push_str("...");
                        write_expr(out, &spread.expr);
                    }
                }
            }
            out.push('}');
        }
        ExprKind::Paren(inner) => {
            out.push('(');
            write_expr(out, inner);
            out.push(')');
        }
        ExprKind::Binary { op, left, right } => {
            write_expr(out, left);
            let _ = write!(out, " {op} ");
            write_expr(out, right);
        }
        ExprKind::Unary { op, operand } => {
            let _ = write!(out, "{op}");
            write_expr(out, operand);
        }
        ExprKind::Member {
            receiver,
            name,
            optional,
        } => {
            write_expr(out, receiver);
            match optional {
                Some(OptionalMarker::Prefix) => {
                    let _ = write!(out, ".?{}", name.name);
                }
                Some(OptionalMarker::Suffix) => {
                    let _ = write!(out, ".{}?", name.name);
                }
                None => {
                    let _ = write!(out, ".{}", name.name);
                }
            }
        }
        ExprKind::Index {
            receiver,
            index,
            optional,
        } => {
            write_expr(out, receiver);
            out.push('[');
            write_expr(out, index);
            out.push(']');
            if *optional {
                out.push('?');
            }
        }
        ExprKind::Call {
            receiver,
            function,
            arguments,
        } => {
            if let Some(receiver) = receiver {
                write_expr(out, receiver);
                out.push('.');
            }
            let _ = write!(out, "{function}(");
            write_arguments(out, arguments);
            out.push(')');
        }
        ExprKind::Lambda { param, body } => {
            let _ = write!(out, "{} => ", param.name);
            write_expr(out, body);
        }
    }
}

fn write_format(out: &mut String, format: &FormatExpr) {
    out.push_str("f\"");
    for segment in &format.segments {
        match segment {
            FormatSegment::Text(text) => out.push_str(&text.raw),
            FormatSegment::Replacement(replacement) => {
                let inner = format_expr(&replacement.expr);
                // `{{` would read as an escaped brace.
                if inner.starts_with('{') {
                    let _ = write!(out, "{{ {inner} }}");
                } else {
                    let _ = write!(out, "{{{inner}}}");
                }
            }
        }
    }
    out.push('"');
}

fn push_indent(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push_str(INDENT);
    }
}
