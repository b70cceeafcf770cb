//! CLI tool to validate, format, and inspect TQL pipelines.

use std::fs;
use std::process::ExitCode;

use tql_syntax::{Program, Statement, highlight, tokenize};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        eprintln!("Usage: tql <command> [files...]");
        eprintln!();
        eprintln!("Commands:");
        eprintln!("  validate  Check if TQL file(s) parse");
        eprintln!("  fmt       Format TQL file(s) and print to stdout");
        eprintln!("  check     Check if TQL file(s) are formatted");
        eprintln!("  tokens    Print the tokens of TQL file(s)");
        eprintln!("  tree      Print the syntax tree of TQL file(s) as JSON");
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  tql validate pipeline.tql");
        eprintln!("  tql fmt pipeline.tql");
        eprintln!("  tql tokens pipeline.tql");
        return ExitCode::from(2);
    }

    let command = args[1].as_str();
    if !matches!(command, "validate" | "fmt" | "check" | "tokens" | "tree") {
        eprintln!("Unknown command: {command}");
        return ExitCode::from(2);
    }

    let files = &args[2..];
    if files.is_empty() {
        eprintln!("Error: no files specified");
        return ExitCode::from(2);
    }

    let mut had_error = false;

    for path in files {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{path}: {e}");
                had_error = true;
                continue;
            }
        };

        let result = match command {
            "tokens" => print_tokens(&content),
            _ => tql_syntax::parse_str(&content)
                .map_err(|e| e.to_string())
                .and_then(|program| run(command, path, &content, &program)),
        };
        if let Err(message) = result {
            eprintln!("{path}: {message}");
            had_error = true;
        }
    }

    if had_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(command: &str, path: &str, content: &str, program: &Program) -> Result<(), String> {
    match command {
        "validate" => {
            let statements = program
                .pipeline
                .as_ref()
                .map_or(0, |p| count_statements(&p.statements));
            let frontmatter = if program.frontmatter.is_some() {
                ", frontmatter"
            } else {
                ""
            };
            eprintln!("{path}: valid ({statements} statement(s){frontmatter})");
            Ok(())
        }
        "fmt" => {
            print!("{}", tql_syntax::format(program));
            Ok(())
        }
        "check" => {
            if tql_syntax::format(program) == content {
                eprintln!("{path}: formatted");
                Ok(())
            } else {
                Err("not formatted".to_string())
            }
        }
        "tree" => {
            let json = serde_json::to_string_pretty(program).map_err(|e| e.to_string())?;
            println!("{json}");
            Ok(())
        }
        _ => Err(format!("unknown command: {command}")),
    }
}

fn print_tokens(content: &str) -> Result<(), String> {
    let tokens = tokenize(content).map_err(|e| e.to_string())?;
    for token in &tokens {
        let capture = highlight::capture(token).unwrap_or("-");
        println!(
            "{}:{}\t{:?}\t{:?}\t{capture}",
            token.span.line, token.span.column, token.kind, token.text
        );
    }
    Ok(())
}

/// Count statements, including those in nested blocks.
fn count_statements(statements: &[Statement]) -> usize {
    use tql_syntax::ast::ElseBranch;

    fn nested(block: Option<&tql_syntax::Pipeline>) -> usize {
        block.map_or(0, |p| count_statements(&p.statements))
    }

    statements
        .iter()
        .map(|statement| {
            1 + match statement {
                Statement::If(stmt) => {
                    let mut n = nested(stmt.consequence.body.as_ref());
                    let mut alternative = stmt.alternative.as_ref();
                    while let Some(branch) = alternative {
                        match branch {
                            ElseBranch::If(inner) => {
                                n += nested(inner.consequence.body.as_ref());
                                alternative = inner.alternative.as_ref();
                            }
                            ElseBranch::Block(block) => {
                                n += nested(block.body.as_ref());
                                alternative = None;
                            }
                        }
                    }
                    n
                }
                Statement::Match(stmt) => stmt
                    .arms
                    .iter()
                    .map(|arm| count_statements(&arm.body.statements))
                    .sum(),
                Statement::Invocation(inv) => nested(inv.block.as_ref()),
                Statement::Let(_) | Statement::Assignment(_) => 0,
            }
        })
        .sum()
}
