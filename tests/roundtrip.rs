//! Round-trip tests: parse then format should produce the same output.

mod common;

use common::roundtrip;

// -----------------------------------------------------------
// Pipelines and invocations.
// -----------------------------------------------------------

#[test]
fn roundtrip_empty_program() {
    roundtrip("\n");
}

#[test]
fn roundtrip_single_operator() {
    roundtrip("head\n");
}

#[test]
fn roundtrip_pipeline_lines() {
    roundtrip("read_file \"a.json\"\nwhere x > 1\nwrite_file \"b.json\"\n");
}

#[test]
fn roundtrip_qualified_operator() {
    roundtrip("package::add \"suricata\"\n");
}

#[test]
fn roundtrip_named_arguments() {
    roundtrip("summarize count=count(), by=[src_ip, dst_ip]\n");
}

#[test]
fn roundtrip_parenthesized_invocation() {
    roundtrip("head(10)\n");
}

#[test]
fn roundtrip_grouped_first_argument() {
    roundtrip("head (1 + 2) * 3\n");
}

#[test]
fn roundtrip_operator_block() {
    roundtrip("fork {\n  write_file \"copy.json\"\n}\n");
}

#[test]
fn roundtrip_block_with_trailing_arguments() {
    roundtrip("every 10s {\n  from_http \"example.org\"\n}, align=true\n");
}

#[test]
fn roundtrip_nested_blocks() {
    roundtrip("every 1h {\n  fork {\n    head 1\n  }\n}\n");
}

#[test]
fn roundtrip_record_argument() {
    roundtrip("publish {topic: \"alerts\"}\n");
}

// -----------------------------------------------------------
// Statements.
// -----------------------------------------------------------

#[test]
fn roundtrip_let() {
    roundtrip("let $threshold = 5min\nwhere duration > $threshold\n");
}

#[test]
fn roundtrip_assignments() {
    roundtrip("x = 1\nthis.y? = \"a\"\n@name = \"zeek.conn\"\nthis = {...this, tag: null}\n");
}

#[test]
fn roundtrip_if_else_chain() {
    roundtrip("if x > 1 {\n  a\n} else if x > 0 {\n  b\n} else {\n  c\n}\n");
}

#[test]
fn roundtrip_empty_if_block() {
    roundtrip("if true {}\n");
}

#[test]
fn roundtrip_match() {
    roundtrip("match proto {\n  \"tcp\", \"udp\" => {\n    a\n  }\n  _ => {\n    drop x\n  }\n}\n");
}

#[test]
fn roundtrip_frontmatter() {
    roundtrip("---\ntitle: demo\n---\nhead 1\n");
}

// -----------------------------------------------------------
// Expressions.
// -----------------------------------------------------------

#[test]
fn roundtrip_operators() {
    roundtrip("x = a + b * c - d / e\n");
    roundtrip("x = a == 1 and b != 2 or not c\n");
    roundtrip("x = a not in [1, 2] and b in c\n");
    roundtrip("x = a if b else c\n");
}

#[test]
fn roundtrip_postfix_chains() {
    roundtrip("x = a.b?.c[0]?.?d\n");
    roundtrip("x = ip.str::to_upper().length()\n");
}

#[test]
fn roundtrip_lambda() {
    roundtrip("x = xs.map(x => x * 2)\n");
}

#[test]
fn roundtrip_literals() {
    roundtrip("x = [null, true, false, 1_000, 2.5e3, 10Ki, \"s\", 's', b\"\\x00\", r#\"raw\"#]\n");
    roundtrip("x = [10.0.0.1, ::1, 192.168.0.0/16, 2001:db8::/32, 2024-01-15T10:30:00Z, 100ms]\n");
}

#[test]
fn roundtrip_format_string() {
    roundtrip("x = f\"{{literal}} {a + 1} and { {k: v} }\"\n");
}

#[test]
fn roundtrip_unary() {
    roundtrip("x = -a.b + +c\n");
    roundtrip("drop move y\n");
}
