use std::{
    env,
    error::Error,
    fs,
    io::{self, Write},
    process::ExitCode,
};

use ave::{
    diagnostic::Diagnostic,
    util::fmt::{tree, Context as FmtContext},
    Context,
};

fn main() -> ExitCode {
    match run() {
        Ok(clean) => {
            if clean {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool, Box<dyn Error>> {
    let mut args = env::args().skip(1);

    // File mode
    if let Some(path) = args.next() {
        let input = fs::read_to_string(&path)?;
        return Ok(pipeline(&path, &input));
    }

    // Interactive REPL mode
    println!("Welcome to interactive ave.");
    println!("Enter code, finish with an empty line, or send Ctrl+D to exit.");

    let mut accumulated = String::new();
    let mut clean = true;

    loop {
        if accumulated.is_empty() {
            print!("> ");
        } else {
            print!("| ");
        }
        io::stdout().flush()?;

        let mut line = String::new();
        let n = io::stdin().read_line(&mut line)?;

        if n == 0 {
            println!();
            if !accumulated.trim().is_empty() {
                clean &= pipeline("<repl>", &accumulated);
            }
            return Ok(clean);
        }

        // An empty line is another termination signal.
        if line.trim().is_empty() {
            if !accumulated.trim().is_empty() {
                clean &= pipeline("<repl>", &accumulated);
                accumulated.clear();
            }
        } else {
            accumulated.push_str(&line);
        }
    }
}

/// Runs lex/parse/check over `src`, printing the typed AST and any
/// diagnostics. Returns whether the source was error-free.
fn pipeline(file_name: &str, src: &str) -> bool {
    let mut ctx = Context::new();
    let scanned = ave::lex(file_name, src);
    let parsed = ave::parse(&mut ctx, scanned);
    let checked = ave::check(&mut ctx, parsed);

    let fmt = FmtContext {
        idents: &ctx.interner,
        registry: &ctx.registry,
    };
    if checked.has_error {
        eprintln!("Got {} errors", checked.errors.len());
        eprintln!();
        eprintln!("Partial AST:");
        tree::print_program(&mut io::stdout(), &fmt, &checked.program).unwrap();
        eprintln!();
        for error in &checked.errors {
            report_error(src, error);
        }
        return false;
    }

    println!("=== Typed AST ===");
    tree::print_program(&mut io::stdout(), &fmt, &checked.program).unwrap();
    true
}

fn report_error(src: &str, error: &Diagnostic) {
    let (line, column) = (error.line as usize, error.column as usize);
    eprintln!(
        "Error (line {line}, col {column}): {:?}: {}",
        error.kind, error.message
    );

    if let Some(line_content) = src.lines().nth(line - 1) {
        eprintln!("{line:>4} | {line_content}");
        // Caret-underline the offending span, clipped to the line.
        let padding = column.saturating_sub(1);
        let available = line_content.len().saturating_sub(padding).max(1);
        let len = error.span.len().clamp(1, available);
        eprintln!("{:>4} | {}{}", "", " ".repeat(padding), "^".repeat(len));
    }
}
