use crate::{
    ast::{
        AssignOp, BinaryOp, Body, DeclKind, Declarator, Expr, ExprKind, FuncDecl, FuncExpr,
        HoistedDecl, Ident, Param, Program, RecordDecl, Stmt, StmtKind, TypeInfo, UnaryOp,
    },
    diagnostic::{Diagnostic, DiagnosticKind},
    token::{Literal, Span, Token, TokenKind},
    types::{builtins, FunctionType, ParamType, TypeRegistry},
    util::intern::{Interner, Name},
};

type Parse<T> = Result<T, ()>;

/// Parses a full token stream (as produced by the lexer, ending in `Eof`)
/// into a [`Program`]. Parse errors accumulate; the parser synchronizes at
/// statement boundaries and keeps going until the end of input.
pub fn parse_program(
    src: &str,
    tokens: &[Token],
    interner: &mut Interner,
    registry: &mut TypeRegistry,
) -> (Program, Vec<Diagnostic>) {
    let mut parser = Parser {
        src,
        tokens,
        cursor: 0,
        interner,
        registry,
        errors: Vec::new(),
    };
    let body = parser.statements_until(|kind| kind == TokenKind::Eof);
    (Program { body }, parser.errors)
}

pub struct Parser<'s, 'ctx> {
    src: &'s str,
    tokens: &'s [Token],
    cursor: usize,
    interner: &'ctx mut Interner,
    registry: &'ctx mut TypeRegistry,
    errors: Vec<Diagnostic>,
}

/// Binding strength of expression operators, weakest first. Assignment and
/// `**` are right-associative; everything else binds to the left.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Precedence {
    None,
    Assign,
    LogicOr,
    LogicAnd,
    BitOr,
    BitXor,
    BitAnd,
    Equality,
    Comparison,
    Add,
    Mult,
    Pow,
    PreUnary,
    PostUnary,
    Call,
    CompMemAccess,
    MemAccess,
    Grouping,
    Max,
}

#[derive(Copy, Clone, Debug)]
enum PrefixRule {
    Literal,
    Ident,
    Group,
    Array,
    IndentObject,
    BraceObject,
    Func,
    Unary,
}

#[derive(Copy, Clone, Debug)]
enum InfixRule {
    Binary(BinaryOp),
    Assign(AssignOp),
    Call,
    Member,
    Index,
    /// The infix colon: `name: value` as a one-property object literal.
    Pair,
}

fn prefix_rule(kind: TokenKind) -> Option<PrefixRule> {
    use TokenKind::*;
    Some(match kind {
        Number | Str | Hex | Binary | True | False => PrefixRule::Literal,
        Name => PrefixRule::Ident,
        LParen => PrefixRule::Group,
        LBracket => PrefixRule::Array,
        Indent => PrefixRule::IndentObject,
        LBrace => PrefixRule::BraceObject,
        Func => PrefixRule::Func,
        Minus | Plus | Bang | PlusPlus | MinusMinus => PrefixRule::Unary,
        _ => return None,
    })
}

fn infix_rule(kind: TokenKind) -> Option<(Precedence, InfixRule)> {
    use Precedence as P;
    use TokenKind::*;
    Some(match kind {
        Eq => (P::Assign, InfixRule::Assign(AssignOp::Assign)),
        PlusEq => (P::Assign, InfixRule::Assign(AssignOp::Add)),
        MinusEq => (P::Assign, InfixRule::Assign(AssignOp::Sub)),
        StarEq => (P::Assign, InfixRule::Assign(AssignOp::Mul)),
        SlashEq => (P::Assign, InfixRule::Assign(AssignOp::Div)),
        SlashSlashEq => (P::Assign, InfixRule::Assign(AssignOp::FloorDiv)),
        PercentEq => (P::Assign, InfixRule::Assign(AssignOp::Mod)),
        StarStarEq => (P::Assign, InfixRule::Assign(AssignOp::Pow)),
        Or => (P::LogicOr, InfixRule::Binary(BinaryOp::Or)),
        And => (P::LogicAnd, InfixRule::Binary(BinaryOp::And)),
        Pipe => (P::BitOr, InfixRule::Binary(BinaryOp::BitOr)),
        Caret => (P::BitXor, InfixRule::Binary(BinaryOp::BitXor)),
        Amp => (P::BitAnd, InfixRule::Binary(BinaryOp::BitAnd)),
        EqEq => (P::Equality, InfixRule::Binary(BinaryOp::EqEq)),
        BangEq => (P::Equality, InfixRule::Binary(BinaryOp::NotEq)),
        Is => (P::Equality, InfixRule::Binary(BinaryOp::Is)),
        Less => (P::Comparison, InfixRule::Binary(BinaryOp::Less)),
        LessEq => (P::Comparison, InfixRule::Binary(BinaryOp::LessEq)),
        Greater => (P::Comparison, InfixRule::Binary(BinaryOp::Greater)),
        GreaterEq => (P::Comparison, InfixRule::Binary(BinaryOp::GreaterEq)),
        Plus => (P::Add, InfixRule::Binary(BinaryOp::Add)),
        Minus => (P::Add, InfixRule::Binary(BinaryOp::Sub)),
        Star => (P::Mult, InfixRule::Binary(BinaryOp::Mul)),
        Slash => (P::Mult, InfixRule::Binary(BinaryOp::Div)),
        SlashSlash => (P::Mult, InfixRule::Binary(BinaryOp::FloorDiv)),
        Percent => (P::Mult, InfixRule::Binary(BinaryOp::Mod)),
        StarStar => (P::Pow, InfixRule::Binary(BinaryOp::Pow)),
        LParen => (P::Call, InfixRule::Call),
        Dot => (P::MemAccess, InfixRule::Member),
        LBracket => (P::CompMemAccess, InfixRule::Index),
        Colon => (P::Max, InfixRule::Pair),
        _ => return None,
    })
}

fn is_right_associative(kind: TokenKind) -> bool {
    use TokenKind::*;
    matches!(
        kind,
        Eq | PlusEq | MinusEq | StarEq | SlashEq | SlashSlashEq | PercentEq | StarStarEq | StarStar
    )
}

fn postfix_precedence(kind: TokenKind) -> Option<Precedence> {
    matches!(kind, TokenKind::PlusPlus | TokenKind::MinusMinus)
        .then_some(Precedence::PostUnary)
}

// Statement grammar.
impl Parser<'_, '_> {
    fn statements_until(&mut self, end: fn(TokenKind) -> bool) -> Body {
        let mut body = Body::new();
        loop {
            while matches!(
                self.peek().kind,
                TokenKind::Newline | TokenKind::Semicolon
            ) {
                self.advance();
            }
            let kind = self.peek().kind;
            if end(kind) || kind == TokenKind::Eof {
                break;
            }
            match self.statement() {
                Ok(stmt) => {
                    self.hoist(&mut body, &stmt);
                    body.stmts.push(stmt);
                }
                Err(()) => self.synchronize(),
            }
        }
        body
    }

    /// Function declarations and `var` declarators are visible throughout
    /// their enclosing scope; record them on the body as they are parsed.
    fn hoist(&mut self, body: &mut Body, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Func(decl) => body.declarations.push(HoistedDecl::Func {
                name: decl.name.name,
                stmt_index: body.stmts.len(),
            }),
            StmtKind::VarDecl {
                kind: DeclKind::Function,
                declarators,
            } => {
                for declarator in declarators {
                    body.declarations.push(HoistedDecl::Var {
                        name: declarator.name.name,
                        span: declarator.name.span,
                        ty: declarator.ty,
                    });
                }
            }
            _ => {}
        }
    }

    /// Skips to the next statement boundary after a parse error.
    fn synchronize(&mut self) {
        loop {
            match self.peek().kind {
                TokenKind::Newline | TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::Dedent | TokenKind::Eof => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn statement(&mut self) -> Parse<Stmt> {
        use TokenKind::*;
        match self.peek().kind {
            If => self.if_stmt(),
            While => self.while_stmt(),
            For => self.for_stmt(),
            Return => self.return_stmt(),
            Record => self.record_stmt(),
            Func if self.peek2_kind() == Name => self.func_stmt(),
            Var | Let | Const => self.decl_stmt(),
            Name if self.peek2_kind() == Colon => self.sugar_stmt(),
            _ => self.expr_stmt(),
        }
    }

    fn expr_stmt(&mut self) -> Parse<Stmt> {
        let expr = self.expression(Precedence::None)?;
        self.eat(TokenKind::Semicolon);
        let span = expr.span;
        Ok(Stmt {
            kind: StmtKind::Expr(expr),
            span,
        })
    }

    fn if_stmt(&mut self) -> Parse<Stmt> {
        let start = self.advance().span;
        let condition = self.expression(Precedence::None)?;
        let then_body = self.block()?;
        let else_body = match self.peek().kind {
            TokenKind::Elif => {
                let elif = self.if_stmt()?;
                let mut body = Body::new();
                body.stmts.push(elif);
                Some(body)
            }
            TokenKind::Else => {
                self.advance();
                Some(self.block()?)
            }
            _ => None,
        };
        Ok(Stmt {
            span: start.to(self.prev_span()),
            kind: StmtKind::If {
                condition,
                then_body,
                else_body,
            },
        })
    }

    fn while_stmt(&mut self) -> Parse<Stmt> {
        let start = self.advance().span;
        let condition = self.expression(Precedence::None)?;
        let body = self.block()?;
        Ok(Stmt {
            span: start.to(self.prev_span()),
            kind: StmtKind::While { condition, body },
        })
    }

    fn for_stmt(&mut self) -> Parse<Stmt> {
        let start = self.advance().span;
        let counter = self.ident()?;
        self.expect(TokenKind::Eq)?;
        let for_start = self.expression(Precedence::None)?;
        self.expect(TokenKind::Comma)?;
        let stop = self.expression(Precedence::None)?;
        let step = match self.eat(TokenKind::Comma) {
            Some(_) => Some(self.expression(Precedence::None)?),
            None => None,
        };
        let body = self.block()?;
        Ok(Stmt {
            span: start.to(self.prev_span()),
            kind: StmtKind::For {
                counter,
                start: for_start,
                stop,
                step,
                body,
            },
        })
    }

    fn return_stmt(&mut self) -> Parse<Stmt> {
        let start = self.advance().span;
        let value = if self.peek().kind.is_terminator() {
            None
        } else {
            Some(self.expression(Precedence::None)?)
        };
        Ok(Stmt {
            span: start.to(self.prev_span()),
            kind: StmtKind::Return { value },
        })
    }

    fn func_stmt(&mut self) -> Parse<Stmt> {
        let start = self.advance().span;
        let name = self.ident()?;
        self.expect(TokenKind::LParen)?;
        let func = self.function_rest(false)?;
        Ok(Stmt {
            span: start.to(self.prev_span()),
            kind: StmtKind::Func(FuncDecl { name, func }),
        })
    }

    /// Parameters, optional return annotation, and block body; the cursor
    /// sits just past the opening `(`.
    fn function_rest(&mut self, is_arrow: bool) -> Parse<FuncExpr> {
        let params = self.parameters()?;
        // A `:` here is the return annotation unless it introduces the block.
        let return_ty = if self.at(TokenKind::Colon) && self.peek2_kind() != TokenKind::Indent {
            self.advance();
            self.parse_type()?
        } else {
            TypeInfo::inferred(self.prev_span())
        };
        let body = self.block()?;
        Ok(FuncExpr {
            params,
            return_ty,
            body,
            is_arrow,
        })
    }

    fn parameters(&mut self) -> Parse<Vec<Param>> {
        let mut params = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                let name = self.ident()?;
                let ty = match self.eat(TokenKind::Colon) {
                    Some(_) => self.parse_type()?,
                    None => TypeInfo::inferred(name.span),
                };
                let default = match self.eat(TokenKind::Eq) {
                    Some(_) => Some(self.expression(Precedence::None)?),
                    None => None,
                };
                params.push(Param { name, ty, default });
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    fn record_stmt(&mut self) -> Parse<Stmt> {
        let start = self.advance().span;
        let name = self.ident()?;

        let mut type_params = Vec::new();
        if self.eat(TokenKind::Less).is_some() {
            loop {
                type_params.push(self.ident()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
            self.expect(TokenKind::Greater)?;
        }

        self.eat(TokenKind::Colon);
        self.expect(TokenKind::Indent)?;
        let mut properties = Vec::new();
        loop {
            while matches!(
                self.peek().kind,
                TokenKind::Newline | TokenKind::Semicolon
            ) {
                self.advance();
            }
            if matches!(self.peek().kind, TokenKind::Dedent | TokenKind::Eof) {
                break;
            }
            let property = self.ident()?;
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            properties.push((property, ty));
        }
        self.expect(TokenKind::Dedent)?;

        Ok(Stmt {
            span: start.to(self.prev_span()),
            kind: StmtKind::Record(RecordDecl {
                name,
                type_params,
                properties,
            }),
        })
    }

    fn decl_stmt(&mut self) -> Parse<Stmt> {
        let keyword = self.advance();
        let kind = match keyword.kind {
            TokenKind::Var => DeclKind::Function,
            TokenKind::Let => DeclKind::Block,
            TokenKind::Const => DeclKind::Constant,
            _ => unreachable!("caller matched a declaration keyword"),
        };
        let mut declarators = Vec::new();
        loop {
            declarators.push(self.declarator()?);
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        Ok(Stmt {
            span: keyword.span.to(self.prev_span()),
            kind: StmtKind::VarDecl { kind, declarators },
        })
    }

    /// The keywordless form: `name: type? ('=' expr)?`.
    fn sugar_stmt(&mut self) -> Parse<Stmt> {
        let name = self.ident()?;
        let colon = self.expect(TokenKind::Colon)?;
        let ty = if self.at(TokenKind::Eq) {
            TypeInfo::inferred(colon.span)
        } else {
            self.parse_type()?
        };
        let init = match self.eat(TokenKind::Eq) {
            Some(_) => Some(self.expression(Precedence::None)?),
            None => None,
        };
        Ok(Stmt {
            span: name.span.to(self.prev_span()),
            kind: StmtKind::VarDecl {
                kind: DeclKind::Sugar,
                declarators: vec![Declarator { name, init, ty }],
            },
        })
    }

    fn declarator(&mut self) -> Parse<Declarator> {
        let name = self.ident()?;
        let ty = match self.eat(TokenKind::Colon) {
            Some(_) => self.parse_type()?,
            None => TypeInfo::inferred(name.span),
        };
        let init = match self.eat(TokenKind::Eq) {
            Some(_) => Some(self.expression(Precedence::None)?),
            None => None,
        };
        Ok(Declarator { name, init, ty })
    }

    /// `':'? INDENT statements DEDENT`.
    fn block(&mut self) -> Parse<Body> {
        self.eat(TokenKind::Colon);
        self.expect(TokenKind::Indent)?;
        let body = self.statements_until(|kind| kind == TokenKind::Dedent);
        self.expect(TokenKind::Dedent)?;
        Ok(body)
    }
}

// Type-annotation grammar.
impl Parser<'_, '_> {
    fn parse_type(&mut self) -> Parse<TypeInfo> {
        let start = self.peek().span;
        let first = self.type_atom()?;
        let ty = if self.at(TokenKind::Pipe) {
            let mut members = vec![first];
            while self.eat(TokenKind::Pipe).is_some() {
                members.push(self.type_atom()?);
            }
            self.registry.union(members)
        } else {
            first
        };
        Ok(TypeInfo {
            span: start.to(self.prev_span()),
            ty,
        })
    }

    fn type_atom(&mut self) -> Parse<crate::types::TypeId> {
        let token = self.advance();
        let mut ty = match token.kind {
            TokenKind::TyNum => builtins::NUM,
            TokenKind::TyStr => builtins::STR,
            TokenKind::TyBool => builtins::BOOL,
            TokenKind::TyAny => builtins::ANY,
            TokenKind::TyObject => builtins::OBJECT,
            TokenKind::TyVoid => builtins::VOID,
            // A bare name is a forward reference resolved by the checker,
            // optionally applied to type arguments.
            TokenKind::Name => {
                let tag = self.intern_token(&token);
                let mut args = Vec::new();
                if self.eat(TokenKind::Less).is_some() {
                    loop {
                        args.push(self.parse_type()?.ty);
                        if self.eat(TokenKind::Comma).is_none() {
                            break;
                        }
                    }
                    self.expect(TokenKind::Greater)?;
                }
                self.registry.unresolved(tag, args)
            }
            TokenKind::LParen => {
                let mut params = Vec::new();
                if !self.at(TokenKind::RParen) {
                    loop {
                        let name = self.expect(TokenKind::Name)?;
                        let name = self.intern_token(&name);
                        self.expect(TokenKind::Colon)?;
                        let param_ty = self.parse_type()?;
                        params.push(ParamType::required(name, param_ty.ty));
                        if self.eat(TokenKind::Comma).is_none() {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen)?;
                let return_ty = match self.eat(TokenKind::Arrow) {
                    Some(_) => self.parse_type()?.ty,
                    None => builtins::VOID,
                };
                self.registry.function(FunctionType { params, return_ty })
            }
            TokenKind::LBrace => {
                let mut properties = Vec::new();
                loop {
                    if self.at(TokenKind::RBrace) {
                        break;
                    }
                    let name = self.expect(TokenKind::Name)?;
                    let name = self.intern_token(&name);
                    self.expect(TokenKind::Colon)?;
                    let prop_ty = self.parse_type()?;
                    properties.push((name, prop_ty.ty));
                    if self.eat(TokenKind::Comma).is_none()
                        && self.eat(TokenKind::Semicolon).is_none()
                    {
                        break;
                    }
                }
                self.expect(TokenKind::RBrace)?;
                self.registry.object(properties)
            }
            kind => {
                let message = format!("Unexpected {} in type annotation", Self::describe(kind, token.raw(self.src)));
                self.errors.push(Diagnostic::at_token(
                    DiagnosticKind::SyntaxError,
                    message,
                    &token,
                ));
                return Err(());
            }
        };
        // `T[]` is sugar for `Array<T>`; the suffix may repeat.
        while self.at(TokenKind::LBracket) && self.peek2_kind() == TokenKind::RBracket {
            self.advance();
            self.advance();
            ty = self.registry.array_of(ty);
        }
        Ok(ty)
    }
}

// Expression grammar (Pratt).
impl Parser<'_, '_> {
    fn expression(&mut self, min: Precedence) -> Parse<Expr> {
        let token = self.advance();
        let Some(rule) = prefix_rule(token.kind) else {
            let message =
                format!("Unexpected {}", Self::describe(token.kind, token.raw(self.src)));
            self.errors.push(Diagnostic::at_token(
                DiagnosticKind::SyntaxError,
                message,
                &token,
            ));
            return Ok(Expr::error(token.span));
        };
        let mut left = self.parse_prefix(rule, token)?;

        loop {
            let kind = self.peek().kind;
            if let Some(prec) = postfix_precedence(kind) {
                if prec > min {
                    let op_token = self.advance();
                    let op = match op_token.kind {
                        TokenKind::PlusPlus => UnaryOp::Incr,
                        _ => UnaryOp::Decr,
                    };
                    let span = left.span.to(op_token.span);
                    left = Expr::new(
                        ExprKind::PostfixUnary {
                            op,
                            operand: Box::new(left),
                        },
                        span,
                    );
                    continue;
                }
            }
            let Some((prec, rule)) = infix_rule(kind) else {
                break;
            };
            let binds = if is_right_associative(kind) {
                prec >= min
            } else {
                prec > min
            };
            if !binds {
                break;
            }
            if matches!(rule, InfixRule::Pair) && !self.colon_pair_applies(&left) {
                break;
            }
            let op_token = self.advance();
            left = self.parse_infix(rule, prec, left, op_token)?;
        }
        Ok(left)
    }

    /// The infix colon only forms a one-property object when the left side
    /// is a bare name and the value can actually start an expression on the
    /// same line; otherwise the colon belongs to the surrounding statement
    /// (block introducer, annotation).
    fn colon_pair_applies(&self, left: &Expr) -> bool {
        let next = self.peek2_kind();
        matches!(left.kind, ExprKind::Ident(_))
            && next != TokenKind::Indent
            && prefix_rule(next).is_some()
    }

    fn parse_prefix(&mut self, rule: PrefixRule, token: Token) -> Parse<Expr> {
        let span = token.span;
        match rule {
            PrefixRule::Literal => Ok(Expr::new(self.literal(&token), span)),
            PrefixRule::Ident => {
                let ident = Ident {
                    name: self.intern_token(&token),
                    span,
                };
                Ok(Expr::new(ExprKind::Ident(ident), span))
            }
            PrefixRule::Group => self.group_or_arrow(token),
            PrefixRule::Array => {
                let mut elements = Vec::new();
                if !self.at(TokenKind::RBracket) {
                    loop {
                        elements.push(self.expression(Precedence::None)?);
                        if self.eat(TokenKind::Comma).is_none() {
                            break;
                        }
                    }
                }
                let end = self.expect(TokenKind::RBracket)?;
                Ok(Expr::new(
                    ExprKind::Array(elements),
                    span.to(end.span),
                ))
            }
            PrefixRule::IndentObject => {
                let mut pairs = Vec::new();
                loop {
                    while matches!(
                        self.peek().kind,
                        TokenKind::Newline | TokenKind::Comma
                    ) {
                        self.advance();
                    }
                    if matches!(self.peek().kind, TokenKind::Dedent | TokenKind::Eof) {
                        break;
                    }
                    let key = self.ident()?;
                    self.expect(TokenKind::Colon)?;
                    let value = self.expression(Precedence::None)?;
                    pairs.push((key, value));
                }
                let end = self.expect(TokenKind::Dedent)?;
                Ok(Expr::new(
                    ExprKind::Object(pairs),
                    span.to(end.span),
                ))
            }
            PrefixRule::BraceObject => {
                let mut pairs = Vec::new();
                if !self.at(TokenKind::RBrace) {
                    loop {
                        if self.at(TokenKind::RBrace) {
                            break;
                        }
                        let key = self.ident()?;
                        self.expect(TokenKind::Colon)?;
                        let value = self.expression(Precedence::None)?;
                        pairs.push((key, value));
                        if self.eat(TokenKind::Comma).is_none() {
                            break;
                        }
                    }
                }
                let end = self.expect(TokenKind::RBrace)?;
                Ok(Expr::new(
                    ExprKind::Object(pairs),
                    span.to(end.span),
                ))
            }
            PrefixRule::Func => {
                self.expect(TokenKind::LParen)?;
                let func = self.function_rest(false)?;
                Ok(Expr::new(
                    ExprKind::Func(Box::new(func)),
                    span.to(self.prev_span()),
                ))
            }
            PrefixRule::Unary => {
                let op = match token.kind {
                    TokenKind::Minus => UnaryOp::Neg,
                    TokenKind::Plus => UnaryOp::Pos,
                    TokenKind::Bang => UnaryOp::Not,
                    TokenKind::PlusPlus => UnaryOp::Incr,
                    TokenKind::MinusMinus => UnaryOp::Decr,
                    _ => unreachable!("registered prefix operators only"),
                };
                let operand = self.expression(Precedence::PreUnary)?;
                let span = span.to(operand.span);
                Ok(Expr::new(
                    ExprKind::PrefixUnary {
                        op,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            }
        }
    }

    fn literal(&self, token: &Token) -> ExprKind {
        match (token.kind, &token.literal) {
            (TokenKind::True, _) => ExprKind::Bool(true),
            (TokenKind::False, _) => ExprKind::Bool(false),
            (_, Some(Literal::Number(value))) => ExprKind::Num(*value),
            (_, Some(Literal::Str(text))) => ExprKind::Str(text.clone()),
            (_, Some(Literal::Hex(text))) => ExprKind::Hex(text.clone()),
            (_, Some(Literal::Binary(text))) => ExprKind::Bin(text.clone()),
            _ => unreachable!("literal token without payload"),
        }
    }

    /// A `(` in prefix position is either a grouped expression or an arrow
    /// function. Attempt the parameter list; if its closing `)` is followed
    /// by `->`, commit to the arrow, otherwise rewind and group.
    fn group_or_arrow(&mut self, lparen: Token) -> Parse<Expr> {
        let snapshot = self.cursor;
        let recorded = self.errors.len();
        if let Ok(params) = self.parameters() {
            if self.at(TokenKind::Arrow) {
                self.advance();
                return self.arrow_body(lparen.span, params);
            }
        }
        self.cursor = snapshot;
        self.errors.truncate(recorded);

        let inner = self.expression(Precedence::None)?;
        let end = self.expect(TokenKind::RParen)?;
        Ok(Expr::new(
            ExprKind::Group(Box::new(inner)),
            lparen.span.to(end.span),
        ))
    }

    fn arrow_body(&mut self, start: Span, params: Vec<Param>) -> Parse<Expr> {
        let return_ty = TypeInfo::inferred(self.prev_span());
        let body = if self.at(TokenKind::Indent)
            || (self.at(TokenKind::Colon) && self.peek2_kind() == TokenKind::Indent)
        {
            self.block()?
        } else {
            // A single expression body is an implicit return.
            let value = self.expression(Precedence::None)?;
            let span = value.span;
            let mut body = Body::new();
            body.stmts.push(Stmt {
                kind: StmtKind::Return { value: Some(value) },
                span,
            });
            body
        };
        Ok(Expr::new(
            ExprKind::Func(Box::new(FuncExpr {
                params,
                return_ty,
                body,
                is_arrow: true,
            })),
            start.to(self.prev_span()),
        ))
    }

    fn parse_infix(
        &mut self,
        rule: InfixRule,
        prec: Precedence,
        left: Expr,
        op_token: Token,
    ) -> Parse<Expr> {
        match rule {
            InfixRule::Binary(op) => {
                let rhs = self.expression(prec)?;
                let span = left.span.to(rhs.span);
                Ok(Expr::new(
                    ExprKind::Binary {
                        op,
                        lhs: Box::new(left),
                        rhs: Box::new(rhs),
                    },
                    span,
                ))
            }
            InfixRule::Assign(op) => {
                if !matches!(left.kind, ExprKind::Ident(_) | ExprKind::Member { .. }) {
                    self.errors.push(Diagnostic::at_token(
                        DiagnosticKind::SyntaxError,
                        "Invalid assignment target",
                        &op_token,
                    ));
                }
                let value = self.expression(prec)?;
                let span = left.span.to(value.span);
                Ok(Expr::new(
                    ExprKind::Assign {
                        op,
                        target: Box::new(left),
                        value: Box::new(value),
                    },
                    span,
                ))
            }
            InfixRule::Call => {
                let mut args = Vec::new();
                if !self.at(TokenKind::RParen) {
                    loop {
                        args.push(self.expression(Precedence::None)?);
                        if self.eat(TokenKind::Comma).is_none() {
                            break;
                        }
                    }
                }
                let end = self.expect(TokenKind::RParen)?;
                let span = left.span.to(end.span);
                Ok(Expr::new(
                    ExprKind::Call {
                        callee: Box::new(left),
                        args,
                    },
                    span,
                ))
            }
            InfixRule::Member => {
                let name = self.ident()?;
                let property = Expr::new(ExprKind::Ident(name), name.span);
                let span = left.span.to(name.span);
                Ok(Expr::new(
                    ExprKind::Member {
                        object: Box::new(left),
                        property: Box::new(property),
                        is_indexed: false,
                    },
                    span,
                ))
            }
            InfixRule::Index => {
                let property = self.expression(Precedence::None)?;
                let end = self.expect(TokenKind::RBracket)?;
                let span = left.span.to(end.span);
                Ok(Expr::new(
                    ExprKind::Member {
                        object: Box::new(left),
                        property: Box::new(property),
                        is_indexed: true,
                    },
                    span,
                ))
            }
            InfixRule::Pair => {
                let ExprKind::Ident(key) = left.kind else {
                    unreachable!("colon_pair_applies checked the left side")
                };
                let value = self.expression(Precedence::None)?;
                let span = left.span.to(value.span);
                Ok(Expr::new(ExprKind::Object(vec![(key, value)]), span))
            }
        }
    }
}

// Cursor plumbing.
impl Parser<'_, '_> {
    fn peek(&self) -> &Token {
        self.tokens
            .get(self.cursor)
            .unwrap_or_else(|| self.tokens.last().expect("lexer always emits Eof"))
    }

    fn peek2_kind(&self) -> TokenKind {
        self.tokens
            .get(self.cursor + 1)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.cursor < self.tokens.len() {
            self.cursor += 1;
        }
        token
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        self.at(kind).then(|| self.advance())
    }

    fn expect(&mut self, kind: TokenKind) -> Parse<Token> {
        if self.at(kind) {
            return Ok(self.advance());
        }
        let found = self.peek().clone();
        let message = format!(
            "Expected {}, but got {}",
            kind.show(),
            Self::describe(found.kind, found.raw(self.src))
        );
        self.errors.push(Diagnostic::at_token(
            DiagnosticKind::SyntaxError,
            message,
            &found,
        ));
        Err(())
    }

    fn ident(&mut self) -> Parse<Ident> {
        let token = self.expect(TokenKind::Name)?;
        Ok(Ident {
            name: self.intern_token(&token),
            span: token.span,
        })
    }

    fn intern_token(&mut self, token: &Token) -> Name {
        self.interner.intern(token.raw(self.src))
    }

    fn prev_span(&self) -> Span {
        let index = self.cursor.saturating_sub(1);
        self.tokens[index.min(self.tokens.len() - 1)].span
    }

    /// Raw lexeme in quotes, or the kind description for layout tokens
    /// whose lexeme is whitespace.
    fn describe(kind: TokenKind, raw: &str) -> String {
        use TokenKind::*;
        match kind {
            Indent | Dedent | Newline | Eof => kind.show().to_owned(),
            _ => format!("'{raw}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::util::test_utils::tree_tests;

    tree_tests!(
        use parser;

        fn test_let_declaration() {
            let source = "let a = 1";
            let tree_ok = "
                decl let (0..9)
                  declarator a (initialized)
                    num 1 (8..9)
            ";
        }

        fn test_chained_assignment_is_right_associative() {
            let source = "a = b = 1";
            let tree_ok = "
                assign = (0..9)
                  ident a (0..1)
                  assign = (4..9)
                    ident b (4..5)
                    num 1 (8..9)
            ";
        }

        fn test_precedence_and_unary() {
            let source = "1 + 2 * -3";
            let tree_ok = "
                binary Add (0..10)
                  num 1 (0..1)
                  binary Mul (4..10)
                    num 2 (4..5)
                    prefix Neg (8..10)
                      num 3 (9..10)
            ";
        }

        fn test_pow_is_right_associative() {
            let source = "a ** b ** c";
            let tree_ok = "
                binary Pow (0..11)
                  ident a (0..1)
                  binary Pow (5..11)
                    ident b (5..6)
                    ident c (10..11)
            ";
        }

        fn test_logical_comparison_mix() {
            let source = "a + 1 < b * 2 and c == d or !e";
            let tree_ok = "
                binary Or (0..30)
                  binary And (0..24)
                    binary Less (0..13)
                      binary Add (0..5)
                        ident a (0..1)
                        num 1 (4..5)
                      binary Mul (8..13)
                        ident b (8..9)
                        num 2 (12..13)
                    binary EqEq (18..24)
                      ident c (18..19)
                      ident d (23..24)
                  prefix Not (28..30)
                    ident e (29..30)
            ";
        }

        fn test_while_with_layout() {
            let source = "var k = 4\nwhile k\n  k -= 1";
            let tree_ok = "
                decl var (0..9)
                  declarator k (initialized)
                    num 4 (8..9)
                while (10..26)
                  ident k (16..17)
                  body
                    assign -= (20..26)
                      ident k (20..21)
                      num 1 (25..26)
            ";
        }

        fn test_indexed_member_access() {
            let source = "array[index]";
            let tree_ok = "
                index (0..12)
                  ident array (0..5)
                  ident index (6..11)
            ";
        }

        fn test_call_and_member_chain() {
            let source = "foo.bar(1, 2).baz[0]";
            let tree_ok = "
                index (0..20)
                  member baz (0..17)
                    call (0..13)
                      member bar (0..7)
                        ident foo (0..3)
                      arguments
                        num 1 (8..9)
                        num 2 (11..12)
                  num 0 (18..19)
            ";
        }

        fn test_postfix_increment() {
            let source = "i++";
            let tree_ok = "
                postfix Incr (0..3)
                  ident i (0..1)
            ";
        }

        fn test_grouping() {
            let source = "(a + b) * 2";
            let tree_ok = "
                binary Mul (0..11)
                  group (0..7)
                    binary Add (1..6)
                      ident a (1..2)
                      ident b (5..6)
                  num 2 (10..11)
            ";
        }

        fn test_array_literal() {
            let source = r#"[1, "two", 3]"#;
            let tree_ok = r#"
                array (0..13)
                  num 1 (1..2)
                  str "two" (4..9)
                  num 3 (11..12)
            "#;
        }

        fn test_indented_object_literal() {
            let source = "point =\n  x: 1\n  y: 2";
            let tree_ok = "
                assign = (0..21)
                  ident point (0..5)
                  object (8..21)
                    pair x
                      num 1 (13..14)
                    pair y
                      num 2 (20..21)
            ";
        }

        fn test_brace_object_literal() {
            let source = "d = { age: 3 }";
            let tree_ok = "
                assign = (0..14)
                  ident d (0..1)
                  object (4..14)
                    pair age
                      num 3 (11..12)
            ";
        }

        fn test_colon_pair_inside_call() {
            let source = "f(name: 1)";
            let tree_ok = "
                call (0..10)
                  ident f (0..1)
                  arguments
                    object (2..9)
                      pair name
                        num 1 (8..9)
            ";
        }

        fn test_if_elif_else() {
            let source = "if a\n  b\nelif c\n  d\nelse\n  e";
            let tree_ok = "
                if (0..28)
                  ident a (3..4)
                  then
                    ident b (7..8)
                  else
                    if (9..28)
                      ident c (14..15)
                      then
                        ident d (18..19)
                      else
                        ident e (27..28)
            ";
        }

        fn test_for_loop() {
            let source = "for i = 0, 10, 2\n  i";
            let tree_ok = "
                for i (0..20)
                  num 0 (8..9)
                  num 10 (11..13)
                  num 2 (15..16)
                  body
                    ident i (19..20)
            ";
        }

        fn test_function_declaration() {
            let source = "func add(a: num, b: num): num\n  return a + b";
            let tree_ok = "
                func add(a: num, b: num) : num (0..44)
                  return (32..44)
                    binary Add (39..44)
                      ident a (39..40)
                      ident b (43..44)
            ";
        }

        fn test_arrow_function_expression_body() {
            let source = "double = (x: num) -> x * 2";
            let tree_ok = "
                assign = (0..26)
                  ident double (0..6)
                  arrow(x: num) (9..26)
                    return (21..26)
                      binary Mul (21..26)
                        ident x (21..22)
                        num 2 (25..26)
            ";
        }

        fn test_arrow_function_block_body() {
            let source = "run = (x) ->\n  return x";
            let tree_ok = "
                assign = (0..23)
                  ident run (0..3)
                  arrow(x) (6..23)
                    return (15..23)
                      ident x (22..23)
            ";
        }

        fn test_record_declaration() {
            let source = "record Doggy:\n  age: num\n  name: str";
            let tree_ok = "
                record Doggy (0..36)
                  field age: num
                  field name: str
            ";
        }

        fn test_sugar_declaration() {
            let source = "mynum: num = 10";
            let tree_ok = "
                decl sugar (0..15)
                  declarator mynum: num (initialized)
                    num 10 (13..15)
            ";
        }

        fn test_union_annotation() {
            let source = "u: num | str = 1";
            let tree_ok = "
                decl sugar (0..16)
                  declarator u: str | num (initialized)
                    num 1 (15..16)
            ";
        }

        fn test_generic_annotation() {
            let source = "xs: Array<num> = [1]";
            let tree_ok = "
                decl sugar (0..20)
                  declarator xs: Array<num> (initialized)
                    array (17..20)
                      num 1 (18..19)
            ";
        }

        fn test_function_type_annotation() {
            let source = "cb: (x: num) -> str";
            let tree_ok = "
                decl sugar (0..19)
                  declarator cb: (x: num) -> str
            ";
        }

        fn test_invalid_assignment_target() {
            let source = "1 = 2";
            let expected_errors = &["2..3: SyntaxError: Invalid assignment target"];
        }

        fn test_unexpected_token_produces_error_node() {
            let source = "let a = *";
            let tree_error = "
                decl let (0..9)
                  declarator a (initialized)
                    error (8..9)
            ";
            let expected_errors = &["8..9: SyntaxError: Unexpected '*'"];
        }

        fn test_recovers_at_statement_boundary() {
            let source = "let a = *\nlet b = 2";
            let tree_error = "
                decl let (0..9)
                  declarator a (initialized)
                    error (8..9)
                decl let (10..19)
                  declarator b (initialized)
                    num 2 (18..19)
            ";
            let expected_errors = &["8..9: SyntaxError: Unexpected '*'"];
        }

        fn test_mixed_program_smoke() {
            let source = "func f(a, b: str)\n  if a\n    return b\n  return b + b";
            let expected_errors = &[];
        }
    );

    #[test]
    fn deterministic_parsing() {
        let input = "var k = 4\nwhile k\n  k -= 1\nrec: Array<num> = [1, 2]";
        let run = || {
            let (tree, errors) =
                crate::util::test_utils::run_pipeline(crate::util::test_utils::Test::Parser(input));
            (tree, errors)
        };
        pretty_assertions::assert_eq!(run(), run());
    }
}
