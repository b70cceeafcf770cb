//! End-to-end tests on realistic TQL pipelines.

mod common;

use common::{assert_format_stable, roundtrip, statements};
use tql_syntax::ast::ElseBranch;
use tql_syntax::{Argument, ExprKind, Statement, format, highlight, parse, parse_str, tokenize};

const SURICATA_ALERTS: &str = r#"---
title: Suricata alerts
---
// Pull alerts from the last day.
load_file "eve.json"
read_suricata
where event_type == "alert" and timestamp > now() - 1d
where src_ip not in [10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16]
severity = alert.severity.int() else 3
@name = "suricata.alert"
summarize count=count(), by=[src_ip, alert.signature]
sort -count
head 20
"#;

#[test]
fn e2e_suricata_pipeline() {
    let program = parse_str(SURICATA_ALERTS).expect("parse");
    assert_eq!(
        program.frontmatter.expect("frontmatter").body,
        "title: Suricata alerts\n"
    );
    let stmts = program.pipeline.expect("pipeline").statements;
    assert_eq!(stmts.len(), 9);
    assert!(matches!(stmts[4], Statement::Assignment(_)));
    assert!(matches!(stmts[5], Statement::Assignment(_)));

    let Statement::Invocation(summarize) = &stmts[6] else {
        panic!("expected invocation");
    };
    assert_eq!(summarize.operator.to_string(), "summarize");
    assert!(
        summarize
            .arguments
            .iter()
            .all(|a| matches!(a, Argument::Named(_)))
    );
}

#[test]
fn e2e_suricata_formatting_is_stable() {
    let output = assert_format_stable(SURICATA_ALERTS);
    assert!(output.contains("where src_ip not in [10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16]\n"));
    assert!(!output.contains("//"));
}

#[test]
fn e2e_control_flow() {
    let input = "\
let $limit = 100
if $limit > 10 {
  head $limit
} else if $limit > 0 {
  tail $limit
} else {
  discard
}
match @name {
  \"zeek.conn\" => {
    proto = proto.to_upper()
  }
  _ => {
    drop proto
  }
}
";
    roundtrip(input);
    let stmts = statements(input);
    let Statement::If(stmt) = &stmts[1] else {
        panic!("expected if");
    };
    assert!(matches!(stmt.alternative, Some(ElseBranch::If(_))));
    let Statement::Match(stmt) = &stmts[2] else {
        panic!("expected match");
    };
    assert!(matches!(stmt.subject.kind, ExprKind::Meta(_)));
    assert_eq!(stmt.arms.len(), 2);
}

#[test]
fn e2e_nested_subpipelines() {
    let input = "\
every 1h {
  from_http \"https://example.org/feed.json\"
  where score >= 0.5
}, align=true
fork {
  to_file \"backup.json\"
}
publish \"alerts\"
";
    roundtrip(input);
    let stmts = statements(input);
    assert_eq!(stmts.len(), 3);
    let Statement::Invocation(every) = &stmts[0] else {
        panic!("expected invocation");
    };
    assert_eq!(every.block.as_ref().expect("block").statements.len(), 2);
    assert_eq!(every.trailing_arguments.len(), 1);
}

#[test]
fn e2e_record_transformations() {
    let input = "\
this = {
  id: uuid(),
  src: {ip: src_ip, port: src_port},
  tags: [...tags, \"seen\"],
  ...this,
}
message = f\"{src.ip}:{src.port} -> {dst_ip}\"
hashes = files.map(f => f.sha256).where(h => h != null)
";
    let output = assert_format_stable(input);
    assert!(output.starts_with(
        "this = {id: uuid(), src: {ip: src_ip, port: src_port}, tags: [...tags, \"seen\"], ...this}\n"
    ));
}

#[test]
fn e2e_spans_cover_tokens() {
    let input = "where x.y > 1 and z";
    let tokens = tokenize(input).expect("tokenize");
    let program = parse(&tokens).expect("parse");
    let Statement::Invocation(inv) = &program.pipeline.expect("pipeline").statements[0] else {
        panic!("expected invocation");
    };
    assert_eq!(inv.span.start, 0);
    assert_eq!(inv.span.end, input.len());
    let Argument::Positional(expr) = &inv.arguments[0] else {
        panic!("expected positional");
    };
    assert_eq!(&input[expr.span.start..expr.span.end], "x.y > 1 and z");
}

#[test]
fn e2e_highlight_tokens() {
    let tokens = tokenize("let $x = 10.0.0.1 // note").expect("tokenize");
    let captures: Vec<_> = tokens.iter().map(highlight::capture).collect();
    assert_eq!(
        captures,
        vec![
            Some("@keyword"),
            Some("@variable.builtin"),
            Some("@operator"),
            Some("@constant"),
            Some("@comment"),
            None,
        ]
    );
}

#[test]
fn e2e_tree_serializes_to_json() {
    let program = parse_str("head 1").expect("parse");
    let json = serde_json::to_value(&program).expect("serialize");
    assert_eq!(
        json["pipeline"]["statements"][0]["Invocation"]["operator"]["segments"][0]["name"],
        "head"
    );
    assert_eq!(format(&program), "head 1\n");
}
