#![allow(dead_code)]

use tql_syntax::{Expr, Program, Statement, format, parse, parse_str, tokenize};

pub fn roundtrip(input: &str) {
    let tokens = tokenize(input).expect("tokenize failed");
    let program = parse(&tokens).expect("parse failed");
    let output = format(&program);
    assert_eq!(
        output, input,
        "round-trip mismatch:\n--- expected ---\n{input}\n--- got ---\n{output}"
    );
}

/// Helper: format `input`, parse the result, assert the output is stable.
pub fn assert_format_stable(input: &str) -> String {
    let first = format(&parse_str(input).unwrap_or_else(|e| panic!("parse failed: {e}")));
    let reparsed = parse_str(&first).unwrap_or_else(|e| {
        panic!(
            "failed to re-parse formatted output: {e}\n\
             --- formatted ---\n{first}"
        )
    });
    let second = format(&reparsed);
    assert_eq!(first, second, "formatting is not idempotent");
    first
}

/// Parse `input` and return its top-level statements.
pub fn statements(input: &str) -> Vec<Statement> {
    let program: Program = parse_str(input).unwrap_or_else(|e| panic!("parse failed: {e}"));
    program.pipeline.map(|p| p.statements).unwrap_or_default()
}

/// Parse `x = <input>` and return the right-hand side.
pub fn expr(input: &str) -> Expr {
    let mut stmts = statements(&format!("x = {input}"));
    match stmts.remove(0) {
        Statement::Assignment(assignment) => assignment.right,
        other => panic!("expected assignment, got {other:?}"),
    }
}
