//! Programmatic construction of syntax trees.
//!
//! The parser is an external collaborator; tools, tests and benchmarks build
//! trees through [`SyntaxBuilder`] instead. Every node is allocated in the
//! builder's arena and receives a fresh span (one per node, on increasing
//! lines) so diagnostics stay distinguishable.

use std::cell::Cell;

use bumpalo::Bump;
use quill_core::Span;

use crate::ast::*;

/// Arena-backed syntax tree builder.
pub struct SyntaxBuilder<'ast> {
    arena: &'ast Bump,
    line: Cell<u32>,
}

impl<'ast> SyntaxBuilder<'ast> {
    /// Create a builder allocating into `arena`.
    pub fn new(arena: &'ast Bump) -> Self {
        Self {
            arena,
            line: Cell::new(1),
        }
    }

    /// The next synthetic span.
    pub fn span(&self) -> Span {
        let line = self.line.get();
        self.line.set(line + 1);
        Span::new(line, 1, 1)
    }

    fn slice<T>(&self, items: Vec<T>) -> &'ast [T] {
        self.arena.alloc_slice_fill_iter(items)
    }

    fn path(&self, dotted: &str) -> &'ast [&'ast str] {
        let segments: Vec<&'ast str> = dotted
            .split('.')
            .map(|s| &*self.arena.alloc_str(s))
            .collect();
        self.slice(segments)
    }

    /// An identifier.
    pub fn name(&self, name: &str) -> Ident<'ast> {
        Ident {
            name: self.arena.alloc_str(name),
            span: self.span(),
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// An identifier reference.
    pub fn ident(&self, name: &str) -> Expr<'ast> {
        Expr::Ident(self.name(name))
    }

    /// An integer literal.
    pub fn int(&self, value: i64) -> Expr<'ast> {
        Expr::Int(IntLit {
            value,
            span: self.span(),
        })
    }

    /// A boolean literal.
    pub fn bool(&self, value: bool) -> Expr<'ast> {
        Expr::Bool(BoolLit {
            value,
            span: self.span(),
        })
    }

    /// A binary operation.
    pub fn binary(&self, lhs: Expr<'ast>, op: BinaryOp, rhs: Expr<'ast>) -> Expr<'ast> {
        Expr::Binary(self.arena.alloc(BinaryExpr {
            lhs,
            op,
            rhs,
            span: self.span(),
        }))
    }

    pub fn add(&self, lhs: Expr<'ast>, rhs: Expr<'ast>) -> Expr<'ast> {
        self.binary(lhs, BinaryOp::Add, rhs)
    }

    pub fn sub(&self, lhs: Expr<'ast>, rhs: Expr<'ast>) -> Expr<'ast> {
        self.binary(lhs, BinaryOp::Sub, rhs)
    }

    pub fn mul(&self, lhs: Expr<'ast>, rhs: Expr<'ast>) -> Expr<'ast> {
        self.binary(lhs, BinaryOp::Mul, rhs)
    }

    pub fn div(&self, lhs: Expr<'ast>, rhs: Expr<'ast>) -> Expr<'ast> {
        self.binary(lhs, BinaryOp::Div, rhs)
    }

    pub fn rem(&self, lhs: Expr<'ast>, rhs: Expr<'ast>) -> Expr<'ast> {
        self.binary(lhs, BinaryOp::Rem, rhs)
    }

    pub fn eq(&self, lhs: Expr<'ast>, rhs: Expr<'ast>) -> Expr<'ast> {
        self.binary(lhs, BinaryOp::Equal, rhs)
    }

    pub fn ne(&self, lhs: Expr<'ast>, rhs: Expr<'ast>) -> Expr<'ast> {
        self.binary(lhs, BinaryOp::NotEqual, rhs)
    }

    pub fn lt(&self, lhs: Expr<'ast>, rhs: Expr<'ast>) -> Expr<'ast> {
        self.binary(lhs, BinaryOp::Less, rhs)
    }

    pub fn le(&self, lhs: Expr<'ast>, rhs: Expr<'ast>) -> Expr<'ast> {
        self.binary(lhs, BinaryOp::LessEqual, rhs)
    }

    pub fn gt(&self, lhs: Expr<'ast>, rhs: Expr<'ast>) -> Expr<'ast> {
        self.binary(lhs, BinaryOp::Greater, rhs)
    }

    pub fn ge(&self, lhs: Expr<'ast>, rhs: Expr<'ast>) -> Expr<'ast> {
        self.binary(lhs, BinaryOp::GreaterEqual, rhs)
    }

    /// A parenthesized call `callee(args...)`.
    pub fn call(&self, callee: Expr<'ast>, args: Vec<Expr<'ast>>) -> Expr<'ast> {
        self.call_bracket(callee, Bracket::Paren, args)
    }

    /// A postfix application with an explicit bracket kind.
    pub fn call_bracket(
        &self,
        callee: Expr<'ast>,
        bracket: Bracket,
        args: Vec<Expr<'ast>>,
    ) -> Expr<'ast> {
        Expr::Call(self.arena.alloc(CallExpr {
            callee,
            bracket,
            args: self.slice(args),
            span: self.span(),
        }))
    }

    /// A member access `base.member`.
    pub fn member(&self, base: Expr<'ast>, member: &str) -> Expr<'ast> {
        Expr::Member(self.arena.alloc(MemberExpr {
            base,
            member: self.name(member),
            span: self.span(),
        }))
    }

    /// A closure.
    pub fn closure(
        &self,
        params: Vec<Param<'ast>>,
        ret: Option<Expr<'ast>>,
        body: Vec<Stmt<'ast>>,
    ) -> Expr<'ast> {
        Expr::Closure(self.arena.alloc(ClosureExpr {
            params: self.slice(params),
            ret,
            body: self.block_of(body),
            span: self.span(),
        }))
    }

    /// A module used as a value.
    pub fn import_expr(&self, path: &str) -> Expr<'ast> {
        Expr::Import(self.arena.alloc(ImportExpr {
            path: self.module_path(path),
            span: self.span(),
        }))
    }

    /// A structural type.
    pub fn struct_expr(&self, body: Vec<Stmt<'ast>>) -> Expr<'ast> {
        Expr::Struct(self.arena.alloc(StructExpr {
            body: self.slice(body),
            span: self.span(),
        }))
    }

    /// A typeclass definition.
    pub fn typeclass(&self, params: Vec<Param<'ast>>, members: Vec<FnDecl<'ast>>) -> Expr<'ast> {
        Expr::Typeclass(self.arena.alloc(TypeclassExpr {
            params: self.slice(params),
            members: self.slice(members),
            span: self.span(),
        }))
    }

    /// A parameter `name: ty`.
    pub fn param(&self, name: &str, ty: Expr<'ast>) -> Param<'ast> {
        Param {
            name: self.name(name),
            ty,
            span: self.span(),
        }
    }

    /// A dotted module path.
    pub fn module_path(&self, dotted: &str) -> ModulePath<'ast> {
        ModulePath {
            segments: self.path(dotted),
            span: self.span(),
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// `let name = init;`
    pub fn let_(&self, name: &str, init: Expr<'ast>) -> Stmt<'ast> {
        self.let_full(name, None, init, false)
    }

    /// `let name: ty = init;`
    pub fn let_typed(&self, name: &str, ty: Expr<'ast>, init: Expr<'ast>) -> Stmt<'ast> {
        self.let_full(name, Some(ty), init, false)
    }

    /// `export let name = init;`
    pub fn export_let(&self, name: &str, init: Expr<'ast>) -> Stmt<'ast> {
        self.let_full(name, None, init, true)
    }

    fn let_full(
        &self,
        name: &str,
        ty: Option<Expr<'ast>>,
        init: Expr<'ast>,
        exported: bool,
    ) -> Stmt<'ast> {
        Stmt::Let(self.arena.alloc(LetStmt {
            name: self.name(name),
            ty,
            init,
            exported,
            span: self.span(),
        }))
    }

    /// A function declaration item, usable as a typeclass member.
    pub fn fn_item(
        &self,
        name: &str,
        params: Vec<Param<'ast>>,
        ret: Option<Expr<'ast>>,
        body: Vec<Stmt<'ast>>,
    ) -> FnDecl<'ast> {
        FnDecl {
            name: self.name(name),
            params: self.slice(params),
            ret,
            body: Some(self.block_of(body)),
            exported: false,
            span: self.span(),
        }
    }

    /// A bodiless typeclass member.
    pub fn abstract_fn(
        &self,
        name: &str,
        params: Vec<Param<'ast>>,
        ret: Option<Expr<'ast>>,
    ) -> FnDecl<'ast> {
        FnDecl {
            name: self.name(name),
            params: self.slice(params),
            ret,
            body: None,
            exported: false,
            span: self.span(),
        }
    }

    /// `fn name(params) -> ret { body }`
    pub fn fn_decl(
        &self,
        name: &str,
        params: Vec<Param<'ast>>,
        ret: Option<Expr<'ast>>,
        body: Vec<Stmt<'ast>>,
    ) -> Stmt<'ast> {
        Stmt::Fn(self.arena.alloc(self.fn_item(name, params, ret, body)))
    }

    /// `export fn name(params) -> ret { body }`
    pub fn export_fn(
        &self,
        name: &str,
        params: Vec<Param<'ast>>,
        ret: Option<Expr<'ast>>,
        body: Vec<Stmt<'ast>>,
    ) -> Stmt<'ast> {
        let mut decl = self.fn_item(name, params, ret, body);
        decl.exported = true;
        Stmt::Fn(self.arena.alloc(decl))
    }

    /// `return value;`
    pub fn ret(&self, value: Expr<'ast>) -> Stmt<'ast> {
        Stmt::Return(self.arena.alloc(ReturnStmt {
            value: Some(value),
            span: self.span(),
        }))
    }

    /// `return;`
    pub fn ret_void(&self) -> Stmt<'ast> {
        Stmt::Return(self.arena.alloc(ReturnStmt {
            value: None,
            span: self.span(),
        }))
    }

    /// `if (cond) { then } else { otherwise }`
    pub fn if_(
        &self,
        cond: Expr<'ast>,
        then_branch: Vec<Stmt<'ast>>,
        else_branch: Option<Vec<Stmt<'ast>>>,
    ) -> Stmt<'ast> {
        Stmt::If(self.arena.alloc(IfStmt {
            cond,
            then_branch: self.block_of(then_branch),
            else_branch: else_branch.map(|stmts| self.block_of(stmts)),
            span: self.span(),
        }))
    }

    /// A nested block statement.
    pub fn block(&self, stmts: Vec<Stmt<'ast>>) -> Stmt<'ast> {
        Stmt::Block(self.arena.alloc(self.block_of(stmts)))
    }

    /// A block value.
    pub fn block_of(&self, stmts: Vec<Stmt<'ast>>) -> Block<'ast> {
        Block {
            stmts: self.slice(stmts),
            span: self.span(),
        }
    }

    /// `expr;`
    pub fn expr_stmt(&self, expr: Expr<'ast>) -> Stmt<'ast> {
        Stmt::Expr(self.arena.alloc(ExprStmt {
            expr,
            span: self.span(),
        }))
    }

    /// `import a.b;`
    pub fn import(&self, path: &str) -> Stmt<'ast> {
        Stmt::Import(self.arena.alloc(ImportStmt {
            path: self.module_path(path),
            span: self.span(),
        }))
    }

    /// A module named by a dotted path.
    pub fn module(&self, path: &str, items: Vec<Stmt<'ast>>) -> SyntaxModule<'ast> {
        SyntaxModule {
            path: self.path(path),
            items: self.slice(items),
            span: self.span(),
        }
    }
}
