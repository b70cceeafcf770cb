//! Expression precedence, associativity, and postfix chains.

mod common;

use common::expr;
use tql_syntax::ast::{
    BinaryOp, ListItem, OptionalMarker, RecordItem, RecordKey, StringValue, UnaryOp,
};
use tql_syntax::formatter::format_expr;
use tql_syntax::{Argument, Expr, ExprKind, Literal};

fn binary(e: &Expr) -> (BinaryOp, &Expr, &Expr) {
    match &e.kind {
        ExprKind::Binary { op, left, right } => (*op, left, right),
        other => panic!("expected binary, got {other:?}"),
    }
}

fn number(e: &Expr) -> &str {
    match &e.kind {
        ExprKind::Literal(Literal::Number(n)) => &n.text,
        other => panic!("expected number, got {other:?}"),
    }
}

fn ident(e: &Expr) -> &str {
    match &e.kind {
        ExprKind::Identifier(name) => name,
        other => panic!("expected identifier, got {other:?}"),
    }
}

// -----------------------------------------------------------
// Precedence and associativity.
// -----------------------------------------------------------

#[test]
fn product_binds_tighter_than_sum() {
    let e = expr("1 + 2 * 3");
    let (op, left, right) = binary(&e);
    assert_eq!(op, BinaryOp::Add);
    assert_eq!(number(left), "1");
    let (op, left, right) = binary(right);
    assert_eq!(op, BinaryOp::Mul);
    assert_eq!(number(left), "2");
    assert_eq!(number(right), "3");
}

#[test]
fn subtraction_associates_left() {
    let e = expr("1 - 2 - 3");
    let (op, left, right) = binary(&e);
    assert_eq!(op, BinaryOp::Sub);
    assert_eq!(number(right), "3");
    let (op, left, right) = binary(left);
    assert_eq!(op, BinaryOp::Sub);
    assert_eq!(number(left), "1");
    assert_eq!(number(right), "2");
}

#[test]
fn and_binds_tighter_than_or() {
    let e = expr("a or b and c");
    let (op, _, right) = binary(&e);
    assert_eq!(op, BinaryOp::Or);
    assert_eq!(binary(right).0, BinaryOp::And);
}

#[test]
fn comparison_binds_tighter_than_and() {
    let e = expr("a == 1 and b != 2");
    let (op, left, right) = binary(&e);
    assert_eq!(op, BinaryOp::And);
    assert_eq!(binary(left).0, BinaryOp::Eq);
    assert_eq!(binary(right).0, BinaryOp::NotEq);
}

#[test]
fn in_and_not_in_are_single_nodes() {
    let e = expr("x in y");
    let (op, left, right) = binary(&e);
    assert_eq!(op, BinaryOp::In);
    assert_eq!(ident(left), "x");
    assert_eq!(ident(right), "y");

    let e = expr("x not in y");
    let (op, left, right) = binary(&e);
    assert_eq!(op, BinaryOp::NotIn);
    assert_eq!(ident(left), "x");
    assert_eq!(ident(right), "y");
}

#[test]
fn leading_not_applies_to_membership() {
    // `not x in y` negates the whole membership test.
    let e = expr("not x in y");
    let ExprKind::Unary { op, operand } = &e.kind else {
        panic!("expected unary");
    };
    assert_eq!(*op, UnaryOp::Not);
    assert_eq!(binary(operand).0, BinaryOp::In);
}

#[test]
fn else_is_loosest() {
    let e = expr("a or b else c");
    let (op, left, _) = binary(&e);
    assert_eq!(op, BinaryOp::Else);
    assert_eq!(binary(left).0, BinaryOp::Or);
}

#[test]
fn newline_after_operator_continues_expression() {
    let e = expr("1 +\n  2");
    assert_eq!(binary(&e).0, BinaryOp::Add);
}

#[test]
fn parentheses_override_precedence() {
    let e = expr("(1 + 2) * 3");
    let (op, left, _) = binary(&e);
    assert_eq!(op, BinaryOp::Mul);
    assert!(matches!(left.kind, ExprKind::Paren(_)));
}

#[test]
fn move_is_unary() {
    let e = expr("move src");
    assert!(matches!(
        e.kind,
        ExprKind::Unary {
            op: UnaryOp::Move,
            ..
        }
    ));
}

// -----------------------------------------------------------
// Postfix chains.
// -----------------------------------------------------------

#[test]
fn member_chain_is_receiver_first() {
    let e = expr("a.b.c");
    let ExprKind::Member { receiver, name, .. } = &e.kind else {
        panic!("expected member");
    };
    assert_eq!(name.name, "c");
    let ExprKind::Member { receiver, name, .. } = &receiver.kind else {
        panic!("expected inner member");
    };
    assert_eq!(name.name, "b");
    assert_eq!(ident(receiver), "a");
}

#[test]
fn optional_member_forms() {
    let e = expr("a.b?");
    assert!(matches!(
        e.kind,
        ExprKind::Member {
            optional: Some(OptionalMarker::Suffix),
            ..
        }
    ));
    let e = expr("a.?b");
    assert!(matches!(
        e.kind,
        ExprKind::Member {
            optional: Some(OptionalMarker::Prefix),
            ..
        }
    ));
}

#[test]
fn index_after_member() {
    let e = expr("a.b[\"key\"]");
    let ExprKind::Index {
        receiver, optional, ..
    } = &e.kind
    else {
        panic!("expected index");
    };
    assert!(!optional);
    assert!(matches!(receiver.kind, ExprKind::Member { .. }));
}

#[test]
fn method_call_keeps_receiver_and_qualified_name() {
    let e = expr("name.str::trim()");
    let ExprKind::Call {
        receiver: Some(receiver),
        function,
        arguments,
    } = &e.kind
    else {
        panic!("expected method call");
    };
    assert_eq!(ident(receiver), "name");
    assert_eq!(function.to_string(), "str::trim");
    assert!(arguments.is_empty());
}

#[test]
fn call_arguments_allow_newlines_and_trailing_comma() {
    let e = expr("round(\n  x,\n  digits=2,\n)");
    let ExprKind::Call { arguments, .. } = &e.kind else {
        panic!("expected call");
    };
    assert_eq!(arguments.len(), 2);
    assert!(matches!(arguments[1], Argument::Named(_)));
}

#[test]
fn member_binds_tighter_than_negation() {
    let e = expr("-a.b");
    let ExprKind::Unary { op, operand } = &e.kind else {
        panic!("expected unary");
    };
    assert_eq!(*op, UnaryOp::Neg);
    assert!(matches!(operand.kind, ExprKind::Member { .. }));
}

// -----------------------------------------------------------
// Lambdas, lists, records.
// -----------------------------------------------------------

#[test]
fn lambda_body_extends_right() {
    let e = expr("xs.where(x => x > 1 and x < 5)");
    let ExprKind::Call { arguments, .. } = &e.kind else {
        panic!("expected call");
    };
    let Argument::Positional(lambda) = &arguments[0] else {
        panic!("expected positional");
    };
    let ExprKind::Lambda { param, body } = &lambda.kind else {
        panic!("expected lambda");
    };
    assert_eq!(param.name, "x");
    assert_eq!(binary(body).0, BinaryOp::And);
}

#[test]
fn list_without_trailing_artifact() {
    let e = expr("[1,2,3,]");
    let ExprKind::List(items) = &e.kind else {
        panic!("expected list");
    };
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|item| matches!(
        item,
        ListItem::Expr(Expr {
            kind: ExprKind::Literal(Literal::Number(_)),
            ..
        })
    )));
}

#[test]
fn empty_list_and_record() {
    assert_eq!(expr("[]").kind, ExprKind::List(Vec::new()));
    assert_eq!(expr("{}").kind, ExprKind::Record(Vec::new()));
}

#[test]
fn record_keys() {
    let e = expr("{\n  name: \"a\",\n  'with space': 1\n}");
    let ExprKind::Record(items) = &e.kind else {
        panic!("expected record");
    };
    assert_eq!(items.len(), 2);
    let RecordItem::Field(field) = &items[1] else {
        panic!("expected field");
    };
    let RecordKey::String(key) = &field.key else {
        panic!("expected string key");
    };
    assert_eq!(key.value, StringValue::Text("with space".into()));
}

#[test]
fn dollar_variable_and_meta() {
    assert_eq!(expr("$limit").kind, ExprKind::DollarVar("limit".into()));
    assert!(matches!(expr("@name").kind, ExprKind::Meta(_)));
}

// -----------------------------------------------------------
// Literals.
// -----------------------------------------------------------

#[test]
fn literal_decoding() {
    let ExprKind::Literal(Literal::Ip(ip)) = expr("::1").kind else {
        panic!("expected ip");
    };
    assert!(ip.addr.is_some_and(|addr| addr.is_ipv6()));

    let ExprKind::Literal(Literal::String(s)) = expr(r#"b"\x00\xff""#).kind else {
        panic!("expected string");
    };
    assert_eq!(s.value, StringValue::Bytes(vec![0x00, 0xff]));

    let ExprKind::Literal(Literal::String(s)) = expr(r##"r#"C:\dir\"#"##).kind else {
        panic!("expected string");
    };
    assert!(s.raw);
    assert_eq!(s.value.as_str(), Some(r"C:\dir\"));

    let ExprKind::Literal(Literal::Time(t)) = expr("2024-01-15T10:30:00Z").kind else {
        panic!("expected time");
    };
    assert_eq!(t.text, "2024-01-15T10:30:00Z");
}

#[test]
fn format_expr_prints_canonical_spacing() {
    assert_eq!(format_expr(&expr("a+b*  c")), "a + b * c");
    assert_eq!(format_expr(&expr("{a:1,...b}")), "{a: 1, ...b}");
    assert_eq!(format_expr(&expr("not  x")), "not x");
}
