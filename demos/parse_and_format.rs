//! Parse a TQL pipeline and re-format it.

use tql_syntax::Statement;

fn main() {
    let input = r#"---
name: failed logins
---
from_file "auth.json"
where  outcome=="failure"|summarize attempts=count(), by=user
if $strict {
  where attempts > 10
}
sort -attempts
"#;

    let program = tql_syntax::parse_str(input).expect("parse failed");

    if let Some(frontmatter) = &program.frontmatter {
        println!("Frontmatter: {:?}", frontmatter.body);
    }
    let statements = program.pipeline.as_ref().map_or(&[][..], |p| &p.statements[..]);
    println!("Statements: {}", statements.len());
    for statement in statements {
        match statement {
            Statement::Invocation(inv) => {
                println!("  Operator: {} ({} argument(s))", inv.operator, inv.arguments.len());
            }
            Statement::Let(stmt) => println!("  Let: ${}", stmt.name.name),
            Statement::If(_) => println!("  If"),
            Statement::Match(stmt) => println!("  Match: {} arm(s)", stmt.arms.len()),
            Statement::Assignment(stmt) => println!("  Assignment: {}", stmt.left),
        }
    }

    let output = tql_syntax::format(&program);
    println!("\nFormatted output:\n{output}");
}
