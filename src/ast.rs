// statement ::= 'if' expr ':'? INDENT body DEDENT ('elif' stmt | 'else' ':'? INDENT body DEDENT)?
//             | 'while' expr ':'? INDENT body DEDENT
//             | 'for' NAME '=' expr ',' expr (',' expr)? ':'? INDENT body DEDENT
//             | 'return' expr?
//             | 'func' NAME '(' params ')' (':' type)? ':'? INDENT body DEDENT
//             | 'record' NAME ('<' NAME (',' NAME)* '>')? ':'? INDENT (NAME ':' type)+ DEDENT
//             | ('var' | 'let' | 'const') declarator (',' declarator)*
//             | NAME ':' type? ('=' expr)?                      -- "sugar" declaration
//             | expr ';'?
//
// declarator ::= NAME (':' type)? ('=' expr)?
//
// type ::= atom ('|' atom)*
// atom ::= primitive-name
//        | NAME ('<' type (',' type)* '>')?
//        | '(' (NAME ':' type (',' NAME ':' type)*)? ')' ('->' type)?
//        | '{' (NAME ':' type (','|';'))* '}'
//        | atom '[' ']'
//
// expr ::= Pratt-parsed; see the precedence ladder in parser.rs.

use crate::{
    token::Span,
    types::{builtins, TypeId},
    util::intern::Name,
};

#[derive(Debug)]
pub struct Program {
    pub body: Body,
}

/// A sequence of statements owning one lexical scope. `declarations` holds
/// the names hoisted to the top of that scope (function declarations and
/// `var` declarators); it is populated by the parser, before the checker
/// ever sees the body.
#[derive(Debug, Default)]
pub struct Body {
    pub stmts: Vec<Stmt>,
    pub declarations: Vec<HoistedDecl>,
}

impl Body {
    pub fn new() -> Body {
        Body::default()
    }
}

#[derive(Debug)]
pub enum HoistedDecl {
    /// Points at the `StmtKind::Func` statement inside the same body.
    Func {
        name: Name,
        stmt_index: usize,
    },
    Var {
        name: Name,
        span: Span,
        ty: TypeInfo,
    },
}

#[derive(Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug)]
pub enum StmtKind {
    Expr(Expr),
    VarDecl {
        kind: DeclKind,
        declarators: Vec<Declarator>,
    },
    If {
        condition: Expr,
        then_body: Body,
        else_body: Option<Body>,
    },
    While {
        condition: Expr,
        body: Body,
    },
    /// Numeric counter loop: `for i = start, stop, step`.
    For {
        counter: Ident,
        start: Expr,
        stop: Expr,
        step: Option<Expr>,
        body: Body,
    },
    Return {
        value: Option<Expr>,
    },
    Func(FuncDecl),
    Record(RecordDecl),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeclKind {
    /// `let`: block-scoped, mutable.
    Block,
    /// `var`: function-scoped, hoisted.
    Function,
    /// `const`: block-scoped, immutable.
    Constant,
    /// `name: type = value` without a keyword.
    Sugar,
}

#[derive(Debug)]
pub struct Declarator {
    pub name: Ident,
    pub init: Option<Expr>,
    pub ty: TypeInfo,
}

/// An annotation site: the span of the written annotation (or of the name,
/// when the annotation was omitted) and the type it resolved to. Starts out
/// as `t_infer` and is rewritten in place by the checker.
#[derive(Copy, Clone, Debug)]
pub struct TypeInfo {
    pub span: Span,
    pub ty: TypeId,
}

impl TypeInfo {
    pub fn inferred(span: Span) -> TypeInfo {
        TypeInfo {
            span,
            ty: builtins::INFER,
        }
    }
}

#[derive(Debug)]
pub struct FuncDecl {
    pub name: Ident,
    pub func: FuncExpr,
}

#[derive(Debug)]
pub struct FuncExpr {
    pub params: Vec<Param>,
    pub return_ty: TypeInfo,
    pub body: Body,
    pub is_arrow: bool,
}

#[derive(Debug)]
pub struct Param {
    pub name: Ident,
    pub ty: TypeInfo,
    pub default: Option<Expr>,
}

#[derive(Debug)]
pub struct RecordDecl {
    pub name: Ident,
    pub type_params: Vec<Ident>,
    /// Insertion-ordered property table.
    pub properties: Vec<(Ident, TypeInfo)>,
}

#[derive(Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    /// `t_infer` until the checker assigns the real type (exactly once).
    pub ty: TypeId,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Expr {
        Expr {
            kind,
            span,
            ty: builtins::INFER,
        }
    }

    /// Sentinel produced when a parselet failed; downstream stages treat it
    /// as already-reported.
    pub fn error(span: Span) -> Expr {
        Expr {
            kind: ExprKind::Error,
            span,
            ty: builtins::ERROR,
        }
    }
}

#[derive(Debug)]
pub enum ExprKind {
    Num(f64),
    Str(Box<str>),
    Hex(Box<str>),
    Bin(Box<str>),
    Bool(bool),
    Ident(Ident),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    PrefixUnary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    PostfixUnary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Group(Box<Expr>),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `object.name` or `object[property]`.
    Member {
        object: Box<Expr>,
        property: Box<Expr>,
        is_indexed: bool,
    },
    Array(Vec<Expr>),
    /// Key/value pairs, insertion-ordered.
    Object(Vec<(Ident, Expr)>),
    Func(Box<FuncExpr>),
    Error,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ident {
    pub name: Name,
    pub span: Span,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    EqEq,
    NotEq,
    Is,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        use BinaryOp::*;
        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            FloorDiv => "//",
            Mod => "%",
            Pow => "**",
            BitAnd => "&",
            BitOr => "|",
            BitXor => "^",
            Less => "<",
            LessEq => "<=",
            Greater => ">",
            GreaterEq => ">=",
            EqEq => "==",
            NotEq => "!=",
            Is => "is",
            And => "and",
            Or => "or",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
    Incr,
    Decr,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        use UnaryOp::*;
        match self {
            Neg => "-",
            Pos => "+",
            Not => "!",
            Incr => "++",
            Decr => "--",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl AssignOp {
    pub fn symbol(self) -> &'static str {
        use AssignOp::*;
        match self {
            Assign => "=",
            Add => "+=",
            Sub => "-=",
            Mul => "*=",
            Div => "/=",
            FloorDiv => "//=",
            Mod => "%=",
            Pow => "**=",
        }
    }
}
