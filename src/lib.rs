/// The lexer takes the source input, mapping it into a sequence of tokens
/// carrying synthetic `INDENT`/`DEDENT`/`NEWLINE` layout tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, mapping it into an AST.
pub mod parser;

/// The type checker resolves names and annotations, checks the soundness of
/// every expression, and writes the resulting types back into the AST.
pub mod type_checker;

pub mod ast;
pub mod diagnostic;
pub mod scope;
pub mod token;
pub mod types;

pub mod util;

use ast::Program;
use diagnostic::Diagnostic;
use token::Token;
use types::TypeRegistry;
use util::intern::Interner;

/// Per-compilation state: the identifier interner and the type registry
/// (with its id counter and singletons). Threading this through the
/// pipeline keeps multiple compilations independent.
pub struct Context {
    pub interner: Interner,
    pub registry: TypeRegistry,
}

impl Context {
    pub fn new() -> Context {
        let mut interner = Interner::with_capacity(256);
        let registry = TypeRegistry::new(&mut interner);
        Context { interner, registry }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

pub struct ScannedData<'s> {
    pub file_name: &'s str,
    pub source: &'s str,
    pub tokens: Vec<Token>,
    pub errors: Vec<Diagnostic>,
    pub has_error: bool,
}

pub struct ParsedData<'s> {
    pub file_name: &'s str,
    pub source: &'s str,
    pub program: Program,
    pub errors: Vec<Diagnostic>,
    pub has_error: bool,
}

pub struct CheckedData<'s> {
    pub file_name: &'s str,
    pub source: &'s str,
    pub program: Program,
    pub errors: Vec<Diagnostic>,
    pub has_error: bool,
}

/// Stage 1: source text to tokens. Never fails hard; problems are recorded
/// and lexing continues.
pub fn lex<'s>(file_name: &'s str, source: &'s str) -> ScannedData<'s> {
    let outcome = lexer::lex(source);
    let mut errors = outcome.errors;
    stamp_file_name(&mut errors, file_name);
    let has_error = !errors.is_empty();
    ScannedData {
        file_name,
        source,
        tokens: outcome.tokens,
        errors,
        has_error,
    }
}

fn stamp_file_name(errors: &mut [Diagnostic], file_name: &str) {
    for error in errors {
        if error.file_name.is_empty() {
            error.file_name = file_name.to_owned();
        }
    }
}

/// Stage 2: tokens to AST. Diagnostics from the lexer carry over.
pub fn parse<'s>(ctx: &mut Context, scanned: ScannedData<'s>) -> ParsedData<'s> {
    let (program, parse_errors) = parser::parse_program(
        scanned.source,
        &scanned.tokens,
        &mut ctx.interner,
        &mut ctx.registry,
    );
    let mut errors = scanned.errors;
    errors.extend(parse_errors);
    stamp_file_name(&mut errors, scanned.file_name);
    let has_error = !errors.is_empty();
    ParsedData {
        file_name: scanned.file_name,
        source: scanned.source,
        program,
        errors,
        has_error,
    }
}

/// Stage 3: resolve and check the AST, assigning a type to every
/// expression node in place.
pub fn check<'s>(ctx: &mut Context, parsed: ParsedData<'s>) -> CheckedData<'s> {
    let mut program = parsed.program;
    let check_errors = type_checker::check_program(
        parsed.source,
        &mut program,
        &mut ctx.interner,
        &mut ctx.registry,
    );
    let mut errors = parsed.errors;
    errors.extend(check_errors);
    stamp_file_name(&mut errors, parsed.file_name);
    let has_error = !errors.is_empty();
    CheckedData {
        file_name: parsed.file_name,
        source: parsed.source,
        program,
        errors,
        has_error,
    }
}
