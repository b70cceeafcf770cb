//! Demonstrate error handling for invalid TQL input.

use tql_syntax::{ParseOptions, tokenize};

fn main() {
    // Unterminated string literal
    match tql_syntax::parse_str("from_file \"events.json\nhead 10\n") {
        Ok(_) => println!("Parsed OK (unexpected)"),
        Err(tql_syntax::Error::Lex(e)) => {
            println!("Lex error: {e}");
            println!("  Kind: {:?}", e.kind);
            println!("  Location: line {}, column {}", e.span.line, e.span.column);
        }
        Err(tql_syntax::Error::Parse(e)) => {
            println!("Parse error: {e}");
        }
    }

    println!();

    // Unclosed operator block
    match tql_syntax::parse_str("head 1\nfork {\n  write_file \"x.json\"\n") {
        Ok(_) => println!("Parsed OK (unexpected)"),
        Err(tql_syntax::Error::Lex(e)) => {
            println!("Lex error: {e}");
        }
        Err(tql_syntax::Error::Parse(e)) => {
            println!("Parse error: {e}");
            println!("  Kind: {:?}", e.kind);
            println!("  Location: line {}, column {}", e.span.line, e.span.column);
            if let Some(partial) = &e.partial {
                let parsed = partial.pipeline.as_ref().map_or(0, |p| p.statements.len());
                println!("  Statements before the error: {parsed}");
            }
        }
    }

    println!();

    // Missing expression, with the alternatives the parser would accept
    match tql_syntax::parse_str("where x ==") {
        Ok(_) => println!("Parsed OK (unexpected)"),
        Err(e) => {
            println!("Error: {e}");
            if let tql_syntax::Error::Parse(e) = e {
                for expected in e.expected() {
                    println!("  Expected: {expected}");
                }
            }
        }
    }

    println!();

    // Nesting limit
    let tokens = tokenize("x = [[[[1]]]]").expect("tokenize failed");
    match tql_syntax::parse_with_options(&tokens, ParseOptions { max_depth: 2 }) {
        Ok(_) => println!("Parsed OK (unexpected)"),
        Err(e) => println!("Parse error: {e}"),
    }
}
