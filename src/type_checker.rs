use std::collections::HashMap;

use crate::{
    ast::{
        AssignOp, Body, DeclKind, Declarator, Expr, ExprKind, FuncExpr, HoistedDecl, Ident,
        Program, RecordDecl, Stmt, StmtKind, TypeInfo, UnaryOp,
    },
    diagnostic::{Diagnostic, DiagnosticKind},
    scope::{Symbol, SymbolKind, SymbolTable},
    token::Span,
    types::{
        binary_result, builtins, compound_result, unary_result, FunctionType, GenericType,
        ParamType, TypeData, TypeId, TypeRegistry,
    },
    util::{
        intern::{Interner, Name},
        suggest,
    },
};

/// Walks the AST, resolves every annotation, assigns a type to every
/// expression node, and accumulates diagnostics. The walk never bails out:
/// a failed node becomes `t_error` and downstream checks stay silent about
/// it, so one root cause produces one message.
pub fn check_program(
    src: &str,
    program: &mut Program,
    interner: &mut Interner,
    registry: &mut TypeRegistry,
) -> Vec<Diagnostic> {
    let mut checker = Checker {
        src,
        interner,
        registry,
        scopes: Vec::with_capacity(8),
        type_scopes: Vec::with_capacity(8),
        functions: Vec::with_capacity(4),
        errors: Vec::new(),
    };
    checker.check_body(&mut program.body, true);
    debug_assert!(checker.scopes.is_empty());
    checker.errors
}

struct Checker<'s, 'ctx> {
    src: &'s str,
    interner: &'ctx mut Interner,
    registry: &'ctx mut TypeRegistry,
    scopes: Vec<ScopeFrame>,
    /// Record/generic names visible per scope, parallel to `scopes`.
    type_scopes: Vec<HashMap<Name, TypeId>>,
    functions: Vec<FunctionCtx>,
    errors: Vec<Diagnostic>,
}

struct ScopeFrame {
    table: SymbolTable,
    /// `var` declarations hoist into the nearest frame with this set.
    is_function_root: bool,
}

struct FunctionCtx {
    declared_ret: TypeId,
    observed: Vec<TypeId>,
}

/// Whether every control path through `body` reaches a `return`. Anything
/// after a returning statement is unreachable, so one returning statement
/// anywhere in the sequence is enough.
fn always_returns(body: &Body) -> bool {
    body.stmts.iter().any(stmt_always_returns)
}

fn stmt_always_returns(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Return { .. } => true,
        StmtKind::If {
            then_body,
            else_body,
            ..
        } => else_body
            .as_ref()
            .is_some_and(|else_body| always_returns(then_body) && always_returns(else_body)),
        // Loop bodies may run zero times.
        _ => false,
    }
}

impl Checker<'_, '_> {
    fn check_body(&mut self, body: &mut Body, is_function_root: bool) {
        self.scopes.push(ScopeFrame {
            table: SymbolTable::new(),
            is_function_root,
        });
        self.type_scopes.push(HashMap::new());

        // Records first, so forward references in annotations resolve, then
        // their properties in a second pass so records can reference each
        // other.
        for stmt in &body.stmts {
            if let StmtKind::Record(decl) = &stmt.kind {
                self.register_record(decl);
            }
        }
        for stmt in &mut body.stmts {
            if let StmtKind::Record(decl) = &mut stmt.kind {
                self.populate_record(decl);
            }
        }

        // Seed the hoisted declarations the parser collected.
        let Body {
            stmts,
            declarations,
        } = body;
        for declaration in declarations.iter() {
            match declaration {
                HoistedDecl::Func { name, stmt_index } => {
                    let StmtKind::Func(decl) = &mut stmts[*stmt_index].kind else {
                        unreachable!("hoisted index points at a function declaration")
                    };
                    let ty = self.function_signature(&mut decl.func);
                    self.declare(Symbol {
                        name: *name,
                        kind: SymbolKind::Func,
                        ty,
                        mutable: false,
                        initialized: true,
                        span: decl.name.span,
                    });
                }
                HoistedDecl::Var { name, span, ty } => {
                    // Resolve silently; the declarator statement re-resolves
                    // its own annotation and owns any diagnostics for it.
                    let recorded = self.errors.len();
                    let mut info = *ty;
                    self.resolve_type_info(&mut info);
                    self.errors.truncate(recorded);
                    self.declare_var(Symbol {
                        name: *name,
                        kind: SymbolKind::Var,
                        ty: info.ty,
                        mutable: true,
                        initialized: false,
                        span: *span,
                    });
                }
            }
        }

        for stmt in stmts.iter_mut() {
            self.check_stmt(stmt);
        }

        self.scopes.pop();
        self.type_scopes.pop();
    }

    fn check_stmt(&mut self, stmt: &mut Stmt) {
        match &mut stmt.kind {
            StmtKind::Expr(expr) => {
                self.check_expr(expr);
            }
            StmtKind::VarDecl { kind, declarators } => {
                let kind = *kind;
                for declarator in declarators {
                    self.check_declarator(kind, declarator);
                }
            }
            StmtKind::If {
                condition,
                then_body,
                else_body,
            } => {
                self.check_expr(condition);
                self.check_body(then_body, false);
                if let Some(else_body) = else_body {
                    self.check_body(else_body, false);
                }
            }
            StmtKind::While { condition, body } => {
                self.check_expr(condition);
                self.check_body(body, false);
            }
            StmtKind::For {
                counter,
                start,
                stop,
                step,
                body,
            } => {
                let counter = *counter;
                for bound in [Some(start), Some(stop), step.as_mut()].into_iter().flatten() {
                    let ty = self.check_expr(bound);
                    if !matches!(ty, builtins::NUM | builtins::ANY | builtins::ERROR) {
                        let shown = self.display(ty);
                        self.error(
                            DiagnosticKind::TypeError,
                            format!("'for' bounds must be 'num', found '{shown}'"),
                            bound.span,
                        );
                    }
                }
                self.scopes.push(ScopeFrame {
                    table: SymbolTable::new(),
                    is_function_root: false,
                });
                self.type_scopes.push(HashMap::new());
                self.declare(Symbol {
                    name: counter.name,
                    kind: SymbolKind::Counter,
                    ty: builtins::NUM,
                    mutable: false,
                    initialized: true,
                    span: counter.span,
                });
                self.check_body(body, false);
                self.scopes.pop();
                self.type_scopes.pop();
            }
            StmtKind::Return { value } => {
                let ty = match value {
                    Some(expr) => self.check_expr(expr),
                    None => builtins::VOID,
                };
                let span = value.as_ref().map_or(stmt.span, |v| v.span);
                match self.functions.last().map(|ctx| ctx.declared_ret) {
                    None => {
                        self.error(
                            DiagnosticKind::SyntaxError,
                            "'return' outside of a function".to_owned(),
                            stmt.span,
                        );
                    }
                    Some(declared) if declared != builtins::INFER => {
                        if !self.registry.can_assign(declared, ty) {
                            self.assign_error(ty, declared, span);
                        }
                    }
                    Some(_) => {
                        self.functions
                            .last_mut()
                            .expect("checked above")
                            .observed
                            .push(ty);
                    }
                }
            }
            StmtKind::Func(decl) => {
                let ty = self.check_function(&mut decl.func);
                if let Some(symbol) = self.lookup_mut(decl.name.name) {
                    symbol.ty = ty;
                }
            }
            // Registered and populated in check_body's pre-passes.
            StmtKind::Record(_) => {}
        }
    }

    fn check_declarator(&mut self, kind: DeclKind, declarator: &mut Declarator) {
        self.resolve_type_info(&mut declarator.ty);
        let declared = declarator.ty.ty;
        let init_ty = declarator.init.as_mut().map(|init| self.check_expr(init));

        let ty = if declared == builtins::INFER {
            // Unify declared with inferred: the annotation site takes the
            // initializer's type.
            let inferred = init_ty.unwrap_or(builtins::ANY);
            declarator.ty.ty = inferred;
            inferred
        } else {
            if let (Some(init_ty), Some(init)) = (init_ty, declarator.init.as_ref()) {
                if !self.registry.can_assign(declared, init_ty) {
                    self.assign_error(init_ty, declared, init.span);
                }
            }
            declared
        };

        let initialized = declarator.init.is_some();
        match kind {
            DeclKind::Function => {
                // Seeded during hoisting; now it has a definite type.
                if let Some(symbol) = self.lookup_mut(declarator.name.name) {
                    symbol.ty = ty;
                    symbol.initialized = initialized;
                }
            }
            DeclKind::Block | DeclKind::Sugar | DeclKind::Constant => {
                self.declare(Symbol {
                    name: declarator.name.name,
                    kind: match kind {
                        DeclKind::Constant => SymbolKind::Const,
                        _ => SymbolKind::Let,
                    },
                    ty,
                    mutable: kind != DeclKind::Constant,
                    initialized,
                    span: declarator.name.span,
                });
            }
        }
    }

    fn register_record(&mut self, decl: &RecordDecl) {
        let name = decl.name.name;
        if self
            .type_scopes
            .last()
            .expect("record outside any scope")
            .contains_key(&name)
        {
            let shown = self.interner.resolve(name).to_owned();
            self.error(
                DiagnosticKind::ReferenceError,
                format!("'{shown}' has already been declared"),
                decl.name.span,
            );
            return;
        }
        let id = if decl.type_params.is_empty() {
            self.registry.record(name)
        } else {
            let params = decl
                .type_params
                .iter()
                .map(|param| self.registry.param(param.name))
                .collect();
            self.registry.generic(GenericType {
                tag: name,
                params,
                properties: Vec::new(),
            })
        };
        self.type_scopes
            .last_mut()
            .expect("record outside any scope")
            .insert(name, id);
    }

    fn populate_record(&mut self, decl: &mut RecordDecl) {
        let Some(&id) = self
            .type_scopes
            .last()
            .and_then(|scope| scope.get(&decl.name.name))
        else {
            return; // redeclaration, reported in register_record
        };

        // Formals are visible inside the record's own annotations.
        let formals: HashMap<Name, TypeId> = match self.registry.data(id) {
            TypeData::Generic(generic) => decl
                .type_params
                .iter()
                .map(|p| p.name)
                .zip(generic.params.iter().copied())
                .collect(),
            _ => HashMap::new(),
        };
        self.type_scopes.push(formals);
        let properties = decl
            .properties
            .iter_mut()
            .map(|(name, info)| {
                self.resolve_type_info(info);
                (name.name, info.ty)
            })
            .collect();
        self.type_scopes.pop();

        self.registry.set_properties(id, properties);
    }

    /// Resolves parameter and return annotations and registers the
    /// function's type. Unannotated parameters are `any`; an unannotated
    /// return stays `t_infer` until the body has been checked.
    fn function_signature(&mut self, func: &mut FuncExpr) -> TypeId {
        for param in &mut func.params {
            self.resolve_type_info(&mut param.ty);
            if param.ty.ty == builtins::INFER {
                param.ty.ty = builtins::ANY;
            }
        }
        self.resolve_type_info(&mut func.return_ty);
        let params = func
            .params
            .iter()
            .map(|param| ParamType {
                name: param.name.name,
                ty: param.ty.ty,
                required: param.default.is_none(),
                rest: false,
                has_default: param.default.is_some(),
            })
            .collect();
        self.registry.function(FunctionType {
            params,
            return_ty: func.return_ty.ty,
        })
    }

    fn check_function(&mut self, func: &mut FuncExpr) -> TypeId {
        self.function_signature(func);

        for param in &mut func.params {
            if let Some(default) = &mut param.default {
                let default_ty = self.check_expr(default);
                if !self.registry.can_assign(param.ty.ty, default_ty) {
                    self.assign_error(default_ty, param.ty.ty, default.span);
                }
            }
        }

        self.functions.push(FunctionCtx {
            declared_ret: func.return_ty.ty,
            observed: Vec::new(),
        });
        self.scopes.push(ScopeFrame {
            table: SymbolTable::new(),
            is_function_root: true,
        });
        self.type_scopes.push(HashMap::new());
        for param in &func.params {
            self.declare(Symbol {
                name: param.name.name,
                kind: SymbolKind::Param,
                ty: param.ty.ty,
                mutable: true,
                initialized: true,
                span: param.name.span,
            });
        }
        self.check_body(&mut func.body, false);
        self.scopes.pop();
        self.type_scopes.pop();
        let ctx = self.functions.pop().expect("pushed above");

        let return_ty = if ctx.declared_ret == builtins::INFER {
            let mut observed = ctx.observed;
            if observed.is_empty() || !always_returns(&func.body) {
                observed.push(builtins::VOID);
            }
            let inferred = self.registry.union(observed);
            func.return_ty.ty = inferred;
            inferred
        } else {
            ctx.declared_ret
        };

        let params = func
            .params
            .iter()
            .map(|param| ParamType {
                name: param.name.name,
                ty: param.ty.ty,
                required: param.default.is_none(),
                rest: false,
                has_default: param.default.is_some(),
            })
            .collect();
        self.registry.function(FunctionType { params, return_ty })
    }

    fn check_expr(&mut self, expr: &mut Expr) -> TypeId {
        let span = expr.span;
        let ty = match &mut expr.kind {
            ExprKind::Num(_) | ExprKind::Hex(_) | ExprKind::Bin(_) => builtins::NUM,
            ExprKind::Str(_) => builtins::STR,
            ExprKind::Bool(_) => builtins::BOOL,
            ExprKind::Ident(ident) => {
                let ident = *ident;
                self.check_ident(ident)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let op = *op;
                let lhs_ty = self.check_expr(lhs);
                let rhs_ty = self.check_expr(rhs);
                let result = binary_result(op, lhs_ty, rhs_ty);
                if result == builtins::ERROR
                    && lhs_ty != builtins::ERROR
                    && rhs_ty != builtins::ERROR
                {
                    let lhs_shown = self.display(lhs_ty);
                    let rhs_shown = self.display(rhs_ty);
                    self.error(
                        DiagnosticKind::TypeError,
                        format!(
                            "cannot use operator '{}' on types '{lhs_shown}' and '{rhs_shown}'",
                            op.symbol()
                        ),
                        span,
                    );
                }
                result
            }
            ExprKind::PrefixUnary { op, operand } | ExprKind::PostfixUnary { op, operand } => {
                let op = *op;
                let operand_ty = self.check_expr(operand);
                self.check_unary(op, operand_ty, span)
            }
            ExprKind::Assign { op, target, value } => {
                let op = *op;
                self.check_assign(op, target, value, span)
            }
            ExprKind::Group(inner) => self.check_expr(inner),
            ExprKind::Call { callee, args } => self.check_call(callee, args, span),
            ExprKind::Member {
                object,
                property,
                is_indexed,
            } => {
                let is_indexed = *is_indexed;
                self.check_member(object, property, is_indexed, span)
            }
            ExprKind::Array(elements) => {
                let tys: Vec<TypeId> = elements
                    .iter_mut()
                    .map(|element| self.check_expr(element))
                    .collect();
                let element = if tys.is_empty() {
                    builtins::ANY
                } else {
                    self.registry.union(tys)
                };
                if element == builtins::ERROR {
                    builtins::ERROR
                } else {
                    self.registry.array_of(element)
                }
            }
            ExprKind::Object(pairs) => {
                let properties = pairs
                    .iter_mut()
                    .map(|(key, value)| (key.name, self.check_expr(value)))
                    .collect();
                self.registry.object(properties)
            }
            ExprKind::Func(func) => self.check_function(func),
            ExprKind::Error => builtins::ERROR,
        };
        expr.ty = ty;
        ty
    }

    fn check_ident(&mut self, ident: Ident) -> TypeId {
        if let Some(symbol) = self.lookup(ident.name) {
            return if symbol.ty == builtins::INFER {
                builtins::ANY
            } else {
                symbol.ty
            };
        }
        let name = self.interner.resolve(ident.name).to_owned();
        let candidates = self.visible_names();
        let hint = suggest::hint(suggest::closest(
            &name,
            candidates.iter().map(|&n| self.interner.resolve(n)),
        ));
        self.error(
            DiagnosticKind::ReferenceError,
            format!("'{name}' is not defined.{hint}"),
            ident.span,
        );
        builtins::ERROR
    }

    fn check_unary(&mut self, op: UnaryOp, operand_ty: TypeId, span: Span) -> TypeId {
        let result = unary_result(op, operand_ty);
        if result == builtins::ERROR && operand_ty != builtins::ERROR {
            let shown = self.display(operand_ty);
            self.error(
                DiagnosticKind::TypeError,
                format!("cannot use operator '{}' on type '{shown}'", op.symbol()),
                span,
            );
        }
        result
    }

    fn check_assign(
        &mut self,
        op: AssignOp,
        target: &mut Expr,
        value: &mut Expr,
        span: Span,
    ) -> TypeId {
        let value_ty = self.check_expr(value);

        let target_ident = match &target.kind {
            ExprKind::Ident(ident) => Some(*ident),
            _ => None,
        };
        let target_ty = if let Some(ident) = target_ident {
            let Some(symbol) = self.lookup(ident.name) else {
                let ty = self.check_ident(ident); // reports the reference error
                target.ty = ty;
                return builtins::ERROR;
            };
            let (symbol_ty, mutable) = (symbol.ty, symbol.mutable);
            if !mutable {
                let name = self.interner.resolve(ident.name).to_owned();
                self.error(
                    DiagnosticKind::TypeError,
                    format!("cannot reassign constant '{name}'"),
                    ident.span,
                );
            }
            // A `var` without annotation or initializer takes the type of
            // its first assignment.
            if symbol_ty == builtins::INFER && op == AssignOp::Assign {
                if let Some(symbol) = self.lookup_mut(ident.name) {
                    symbol.ty = value_ty;
                    symbol.initialized = true;
                }
                target.ty = value_ty;
                return value_ty;
            }
            if let Some(symbol) = self.lookup_mut(ident.name) {
                symbol.initialized = true;
            }
            target.ty = symbol_ty;
            symbol_ty
        } else if matches!(target.kind, ExprKind::Member { .. }) {
            self.check_expr(target)
        } else {
            // The parser already reported "Invalid assignment target".
            target.ty = builtins::ERROR;
            return builtins::ERROR;
        };

        if op == AssignOp::Assign {
            if !self.registry.can_assign(target_ty, value_ty) {
                self.assign_error(value_ty, target_ty, value.span);
            }
            value_ty
        } else {
            let result = compound_result(op, target_ty, value_ty);
            if result == builtins::ERROR
                && target_ty != builtins::ERROR
                && value_ty != builtins::ERROR
            {
                let lhs_shown = self.display(target_ty);
                let rhs_shown = self.display(value_ty);
                self.error(
                    DiagnosticKind::TypeError,
                    format!(
                        "cannot use operator '{}' on types '{lhs_shown}' and '{rhs_shown}'",
                        op.symbol()
                    ),
                    span,
                );
            }
            result
        }
    }

    fn check_call(&mut self, callee: &mut Expr, args: &mut [Expr], span: Span) -> TypeId {
        let callee_ty = self.check_expr(callee);
        let arg_tys: Vec<(TypeId, Span)> = args
            .iter_mut()
            .map(|arg| (self.check_expr(arg), arg.span))
            .collect();

        if callee_ty == builtins::ANY {
            return builtins::ANY;
        }
        if callee_ty == builtins::ERROR {
            return builtins::ERROR;
        }
        let TypeData::Function(function) = self.registry.data(callee_ty).clone() else {
            let shown = self.display(callee_ty);
            self.error(
                DiagnosticKind::TypeError,
                format!("type '{shown}' is not callable"),
                callee.span,
            );
            return builtins::ERROR;
        };

        let has_rest = function.params.last().is_some_and(|param| param.rest);
        let required = function
            .params
            .iter()
            .filter(|param| param.required && !param.rest)
            .count();
        if arg_tys.len() < required || (!has_rest && arg_tys.len() > function.params.len()) {
            let expected = if arg_tys.len() < required {
                required
            } else {
                function.params.len()
            };
            self.error(
                DiagnosticKind::TypeError,
                format!(
                    "incorrect number of arguments. expected {expected}, but got {}",
                    arg_tys.len()
                ),
                span,
            );
        }
        for (index, &(arg_ty, arg_span)) in arg_tys.iter().enumerate() {
            let param = match function.params.get(index) {
                Some(param) => param,
                // The rest parameter absorbs the tail.
                None if has_rest => function.params.last().expect("has_rest"),
                None => break,
            };
            if !self.registry.can_assign(param.ty, arg_ty) {
                self.assign_error(arg_ty, param.ty, arg_span);
            }
        }

        if function.return_ty == builtins::INFER {
            // Recursive call before the body finished inference.
            builtins::ANY
        } else {
            function.return_ty
        }
    }

    fn check_member(
        &mut self,
        object: &mut Expr,
        property: &mut Expr,
        is_indexed: bool,
        span: Span,
    ) -> TypeId {
        let object_ty = self.check_expr(object);

        if is_indexed {
            let index_ty = self.check_expr(property);
            if object_ty == builtins::ANY {
                return builtins::ANY;
            }
            if object_ty == builtins::ERROR || index_ty == builtins::ERROR {
                return builtins::ERROR;
            }
            if let Some(element) = self.registry.array_element(object_ty) {
                if matches!(index_ty, builtins::NUM | builtins::ANY) {
                    return element;
                }
                let object_shown = self.display(object_ty);
                let index_shown = self.display(index_ty);
                self.error(
                    DiagnosticKind::TypeError,
                    format!("cannot index type '{object_shown}' with '{index_shown}'"),
                    property.span,
                );
                return builtins::ERROR;
            }
            let shown = self.display(object_ty);
            self.error(
                DiagnosticKind::TypeError,
                format!("cannot index type '{shown}'"),
                span,
            );
            return builtins::ERROR;
        }

        // `a.b`: the property is a name, not a variable reference.
        let ExprKind::Ident(ident) = &property.kind else {
            unreachable!("parser builds non-indexed member access with a name")
        };
        let ident = *ident;
        let ty = if object_ty == builtins::ANY {
            builtins::ANY
        } else if object_ty == builtins::ERROR {
            builtins::ERROR
        } else {
            let found = self.registry.properties_of(object_ty).and_then(|props| {
                props
                    .iter()
                    .find(|&&(name, _)| name == ident.name)
                    .map(|&(_, ty)| ty)
            });
            match found {
                Some(ty) => ty,
                None => {
                    let name = self.interner.resolve(ident.name).to_owned();
                    let candidates: Vec<Name> = self
                        .registry
                        .properties_of(object_ty)
                        .map(|props| props.iter().map(|&(n, _)| n).collect())
                        .unwrap_or_default();
                    let hint = suggest::hint(suggest::closest(
                        &name,
                        candidates.iter().map(|&n| self.interner.resolve(n)),
                    ));
                    let shown = self.display(object_ty);
                    self.error(
                        DiagnosticKind::TypeError,
                        format!("field '{name}' does not exist on type {shown}.{hint}"),
                        ident.span,
                    );
                    builtins::ERROR
                }
            }
        };
        property.ty = ty;
        ty
    }

    // Type resolution.

    fn resolve_type_info(&mut self, info: &mut TypeInfo) {
        info.ty = self.resolve_type(info.ty, info.span);
    }

    /// Replaces forward references by the records/generics they name,
    /// recursing through composite types. Resolution is idempotent.
    fn resolve_type(&mut self, id: TypeId, span: Span) -> TypeId {
        match self.registry.data(id).clone() {
            TypeData::Unresolved { tag, args } => {
                let args: Vec<TypeId> = args
                    .iter()
                    .map(|&arg| self.resolve_type(arg, span))
                    .collect();
                let Some(target) = self.lookup_type(tag) else {
                    let name = self.interner.resolve(tag).to_owned();
                    let candidates = self.visible_type_names();
                    let hint = suggest::hint(suggest::closest(
                        &name,
                        candidates.iter().map(|&n| self.interner.resolve(n)),
                    ));
                    self.error(
                        DiagnosticKind::ReferenceError,
                        format!("'{name}' is not defined.{hint}"),
                        span,
                    );
                    return builtins::ERROR;
                };
                match self.registry.data(target) {
                    TypeData::Generic(generic) => {
                        let expected = generic.params.len();
                        if args.len() != expected {
                            let name = self.interner.resolve(tag).to_owned();
                            self.error(
                                DiagnosticKind::TypeError,
                                format!(
                                    "wrong number of type arguments for '{name}': \
                                    expected {expected}, but got {}",
                                    args.len()
                                ),
                                span,
                            );
                            return builtins::ERROR;
                        }
                        self.registry.instantiate(target, args)
                    }
                    _ if !args.is_empty() => {
                        let name = self.interner.resolve(tag).to_owned();
                        self.error(
                            DiagnosticKind::TypeError,
                            format!("'{name}' is not generic"),
                            span,
                        );
                        builtins::ERROR
                    }
                    _ => target,
                }
            }
            TypeData::Function(function) => {
                let params: Vec<ParamType> = function
                    .params
                    .iter()
                    .map(|param| ParamType {
                        ty: self.resolve_type(param.ty, span),
                        ..param.clone()
                    })
                    .collect();
                let return_ty = self.resolve_type(function.return_ty, span);
                if params == function.params && return_ty == function.return_ty {
                    id
                } else {
                    self.registry.function(FunctionType { params, return_ty })
                }
            }
            TypeData::Object { properties } => {
                let resolved: Vec<_> = properties
                    .iter()
                    .map(|&(name, ty)| (name, self.resolve_type(ty, span)))
                    .collect();
                if resolved == properties {
                    id
                } else {
                    self.registry.object(resolved)
                }
            }
            TypeData::Union { members } => {
                let resolved: Vec<_> = members
                    .iter()
                    .map(|&member| self.resolve_type(member, span))
                    .collect();
                if resolved == members {
                    id
                } else {
                    self.registry.union(resolved)
                }
            }
            TypeData::Instance(instance) => {
                let args: Vec<_> = instance
                    .args
                    .iter()
                    .map(|&arg| self.resolve_type(arg, span))
                    .collect();
                if args == instance.args {
                    id
                } else {
                    self.registry.instantiate(instance.generic, args)
                }
            }
            _ => id,
        }
    }

    fn lookup_type(&mut self, tag: Name) -> Option<TypeId> {
        for scope in self.type_scopes.iter().rev() {
            if let Some(&id) = scope.get(&tag) {
                return Some(id);
            }
        }
        (tag == self.interner.intern("Array")).then(|| self.registry.array_generic())
    }

    fn visible_type_names(&mut self) -> Vec<Name> {
        let mut names: Vec<Name> = self
            .type_scopes
            .iter()
            .flat_map(|scope| scope.keys().copied())
            .collect();
        names.push(self.interner.intern("Array"));
        names
    }

    // Scope plumbing.

    fn declare(&mut self, symbol: Symbol) {
        let index = self.scopes.len() - 1;
        self.declare_in(index, symbol);
    }

    /// `var` declarations land in the nearest function root. Redeclaring a
    /// `var` as a `var` is fine (the first one wins); colliding with any
    /// other kind is not.
    fn declare_var(&mut self, symbol: Symbol) {
        let index = self
            .scopes
            .iter()
            .rposition(|frame| frame.is_function_root)
            .unwrap_or(0);
        if let Some(existing) = self.scopes[index].table.get(symbol.name) {
            if existing.kind == SymbolKind::Var {
                return;
            }
        }
        self.declare_in(index, symbol);
    }

    fn declare_in(&mut self, index: usize, symbol: Symbol) {
        let (name, span) = (symbol.name, symbol.span);
        if self.scopes[index].table.declare(symbol).is_err() {
            let shown = self.interner.resolve(name).to_owned();
            self.error(
                DiagnosticKind::ReferenceError,
                format!("'{shown}' has already been declared"),
                span,
            );
        }
    }

    fn lookup(&self, name: Name) -> Option<&Symbol> {
        self.scopes
            .iter()
            .rev()
            .find_map(|frame| frame.table.get(name))
    }

    fn lookup_mut(&mut self, name: Name) -> Option<&mut Symbol> {
        let index = self
            .scopes
            .iter()
            .rposition(|frame| frame.table.get(name).is_some())?;
        self.scopes[index].table.get_mut(name)
    }

    fn visible_names(&self) -> Vec<Name> {
        self.scopes
            .iter()
            .flat_map(|frame| frame.table.names())
            .collect()
    }

    // Diagnostics.

    fn display(&self, ty: TypeId) -> String {
        self.registry.display(ty, self.interner)
    }

    fn assign_error(&mut self, src_ty: TypeId, dst_ty: TypeId, span: Span) {
        let src_shown = self.display(src_ty);
        let dst_shown = self.display(dst_ty);
        self.error(
            DiagnosticKind::TypeError,
            format!("cannot assign '{src_shown}' to '{dst_shown}'"),
            span,
        );
    }

    fn error(&mut self, kind: DiagnosticKind, message: String, span: Span) {
        self.errors
            .push(Diagnostic::at_span(kind, message, span, self.src));
    }
}
