//! Plain-text AST dump, used by the CLI and the tree-shaped tests. One node
//! per line; children indented below their parent. Expressions carry their
//! span and, once checked, ` %: type`.

use std::io::Write;

use crate::{
    ast::{Body, DeclKind, Expr, ExprKind, FuncExpr, Param, Program, Stmt, StmtKind},
    types::builtins,
    util::fmt::Context,
};

const INDENT_WIDTH: usize = 2;

pub fn print_program_string(ctx: &Context<'_>, program: &Program) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_program(&mut buf, ctx, program).unwrap();
    String::from_utf8(buf).unwrap()
}

pub fn print_program(
    w: &mut impl Write,
    ctx: &Context<'_>,
    program: &Program,
) -> std::io::Result<()> {
    for stmt in &program.body.stmts {
        print_stmt(w, ctx, 0, stmt)?;
    }
    Ok(())
}

fn print_stmt(w: &mut impl Write, ctx: &Context<'_>, i: usize, stmt: &Stmt) -> std::io::Result<()> {
    let span = stmt.span;
    match &stmt.kind {
        StmtKind::Expr(expr) => print_expr(w, ctx, i, expr)?,
        StmtKind::VarDecl { kind, declarators } => {
            let kind = match kind {
                DeclKind::Block => "let",
                DeclKind::Function => "var",
                DeclKind::Constant => "const",
                DeclKind::Sugar => "sugar",
            };
            sp(w, i)?;
            writeln!(w, "decl {kind} ({span})")?;
            for declarator in declarators {
                sp(w, i + 1)?;
                write!(w, "declarator {}", ctx.idents.resolve(declarator.name.name))?;
                if declarator.ty.ty != builtins::INFER {
                    write!(w, ": {}", ctx.registry.display(declarator.ty.ty, ctx.idents))?;
                }
                if declarator.init.is_some() {
                    write!(w, " (initialized)")?;
                }
                writeln!(w)?;
                if let Some(init) = &declarator.init {
                    print_expr(w, ctx, i + 2, init)?;
                }
            }
        }
        StmtKind::If {
            condition,
            then_body,
            else_body,
        } => {
            sp(w, i)?;
            writeln!(w, "if ({span})")?;
            print_expr(w, ctx, i + 1, condition)?;
            print_body(w, ctx, i + 1, "then", then_body)?;
            if let Some(else_body) = else_body {
                print_body(w, ctx, i + 1, "else", else_body)?;
            }
        }
        StmtKind::While { condition, body } => {
            sp(w, i)?;
            writeln!(w, "while ({span})")?;
            print_expr(w, ctx, i + 1, condition)?;
            print_body(w, ctx, i + 1, "body", body)?;
        }
        StmtKind::For {
            counter,
            start,
            stop,
            step,
            body,
        } => {
            sp(w, i)?;
            writeln!(w, "for {} ({span})", ctx.idents.resolve(counter.name))?;
            print_expr(w, ctx, i + 1, start)?;
            print_expr(w, ctx, i + 1, stop)?;
            if let Some(step) = step {
                print_expr(w, ctx, i + 1, step)?;
            }
            print_body(w, ctx, i + 1, "body", body)?;
        }
        StmtKind::Return { value } => {
            sp(w, i)?;
            writeln!(w, "return ({span})")?;
            if let Some(value) = value {
                print_expr(w, ctx, i + 1, value)?;
            }
        }
        StmtKind::Func(decl) => {
            sp(w, i)?;
            write!(w, "func {}", ctx.idents.resolve(decl.name.name))?;
            print_signature(w, ctx, &decl.func)?;
            writeln!(w, " ({span})")?;
            for stmt in &decl.func.body.stmts {
                print_stmt(w, ctx, i + 1, stmt)?;
            }
        }
        StmtKind::Record(decl) => {
            sp(w, i)?;
            write!(w, "record {}", ctx.idents.resolve(decl.name.name))?;
            if !decl.type_params.is_empty() {
                let params: Vec<_> = decl
                    .type_params
                    .iter()
                    .map(|p| ctx.idents.resolve(p.name))
                    .collect();
                write!(w, "<{}>", params.join(", "))?;
            }
            writeln!(w, " ({span})")?;
            for (name, ty) in &decl.properties {
                sp(w, i + 1)?;
                writeln!(
                    w,
                    "field {}: {}",
                    ctx.idents.resolve(name.name),
                    ctx.registry.display(ty.ty, ctx.idents)
                )?;
            }
        }
    }
    Ok(())
}

fn print_body(
    w: &mut impl Write,
    ctx: &Context<'_>,
    i: usize,
    label: &str,
    body: &Body,
) -> std::io::Result<()> {
    sp(w, i)?;
    writeln!(w, "{label}")?;
    for stmt in &body.stmts {
        print_stmt(w, ctx, i + 1, stmt)?;
    }
    Ok(())
}

fn print_signature(w: &mut impl Write, ctx: &Context<'_>, func: &FuncExpr) -> std::io::Result<()> {
    write!(w, "(")?;
    for (index, Param { name, ty, .. }) in func.params.iter().enumerate() {
        if index > 0 {
            write!(w, ", ")?;
        }
        write!(w, "{}", ctx.idents.resolve(name.name))?;
        if ty.ty != builtins::INFER {
            write!(w, ": {}", ctx.registry.display(ty.ty, ctx.idents))?;
        }
    }
    write!(w, ")")?;
    if func.return_ty.ty != builtins::INFER {
        write!(
            w,
            " : {}",
            ctx.registry.display(func.return_ty.ty, ctx.idents)
        )?;
    }
    Ok(())
}

pub fn print_expr(
    w: &mut impl Write,
    ctx: &Context<'_>,
    i: usize,
    expr: &Expr,
) -> std::io::Result<()> {
    sp(w, i)?;
    let span = expr.span;
    let info = if expr.ty == builtins::INFER {
        String::new()
    } else {
        format!(" %: {}", ctx.registry.display(expr.ty, ctx.idents))
    };
    match &expr.kind {
        ExprKind::Num(value) => writeln!(w, "num {value} ({span}{info})")?,
        ExprKind::Str(value) => writeln!(w, "str {value:?} ({span}{info})")?,
        ExprKind::Hex(text) => writeln!(w, "hex {text} ({span}{info})")?,
        ExprKind::Bin(text) => writeln!(w, "bin {text} ({span}{info})")?,
        ExprKind::Bool(value) => writeln!(w, "bool {value} ({span}{info})")?,
        ExprKind::Ident(ident) => {
            writeln!(w, "ident {} ({span}{info})", ctx.idents.resolve(ident.name))?;
        }
        ExprKind::Binary { op, lhs, rhs } => {
            writeln!(w, "binary {op:?} ({span}{info})")?;
            print_expr(w, ctx, i + 1, lhs)?;
            print_expr(w, ctx, i + 1, rhs)?;
        }
        ExprKind::PrefixUnary { op, operand } => {
            writeln!(w, "prefix {op:?} ({span}{info})")?;
            print_expr(w, ctx, i + 1, operand)?;
        }
        ExprKind::PostfixUnary { op, operand } => {
            writeln!(w, "postfix {op:?} ({span}{info})")?;
            print_expr(w, ctx, i + 1, operand)?;
        }
        ExprKind::Assign { op, target, value } => {
            writeln!(w, "assign {} ({span}{info})", op.symbol())?;
            print_expr(w, ctx, i + 1, target)?;
            print_expr(w, ctx, i + 1, value)?;
        }
        ExprKind::Group(inner) => {
            writeln!(w, "group ({span}{info})")?;
            print_expr(w, ctx, i + 1, inner)?;
        }
        ExprKind::Call { callee, args } => {
            writeln!(w, "call ({span}{info})")?;
            print_expr(w, ctx, i + 1, callee)?;
            if !args.is_empty() {
                sp(w, i + 1)?;
                writeln!(w, "arguments")?;
                for arg in args {
                    print_expr(w, ctx, i + 2, arg)?;
                }
            }
        }
        ExprKind::Member {
            object,
            property,
            is_indexed: false,
        } => {
            let ExprKind::Ident(name) = &property.kind else {
                unreachable!("non-indexed member access always has a name")
            };
            writeln!(w, "member {} ({span}{info})", ctx.idents.resolve(name.name))?;
            print_expr(w, ctx, i + 1, object)?;
        }
        ExprKind::Member {
            object,
            property,
            is_indexed: true,
        } => {
            writeln!(w, "index ({span}{info})")?;
            print_expr(w, ctx, i + 1, object)?;
            print_expr(w, ctx, i + 1, property)?;
        }
        ExprKind::Array(elements) => {
            writeln!(w, "array ({span}{info})")?;
            for element in elements {
                print_expr(w, ctx, i + 1, element)?;
            }
        }
        ExprKind::Object(pairs) => {
            writeln!(w, "object ({span}{info})")?;
            for (key, value) in pairs {
                sp(w, i + 1)?;
                writeln!(w, "pair {}", ctx.idents.resolve(key.name))?;
                print_expr(w, ctx, i + 2, value)?;
            }
        }
        ExprKind::Func(func) => {
            write!(w, "{}", if func.is_arrow { "arrow" } else { "func" })?;
            print_signature(w, ctx, func)?;
            writeln!(w, " ({span})")?;
            for stmt in &func.body.stmts {
                print_stmt(w, ctx, i + 1, stmt)?;
            }
        }
        ExprKind::Error => writeln!(w, "error ({span})")?,
    }
    Ok(())
}

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}
