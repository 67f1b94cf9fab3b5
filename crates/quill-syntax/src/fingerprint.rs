//! Structural fingerprints of syntax modules.
//!
//! Spans are ignored: two modules that differ only in source positions have
//! the same fingerprint.

use quill_core::{Fingerprint, FingerprintBuilder};

use crate::ast::*;

impl<'ast> SyntaxModule<'ast> {
    /// Compute the structural fingerprint of this module.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut h = FingerprintBuilder::new();
        h.write_len(self.path.len());
        for segment in self.path {
            h.write_str(segment);
        }
        stmts(&mut h, self.items);
        h.finish()
    }
}

fn stmts(h: &mut FingerprintBuilder, items: &[Stmt<'_>]) {
    h.write_len(items.len());
    for item in items {
        stmt(h, item);
    }
}

fn block(h: &mut FingerprintBuilder, b: &Block<'_>) {
    stmts(h, b.stmts);
}

fn opt_expr(h: &mut FingerprintBuilder, e: Option<&Expr<'_>>) {
    match e {
        Some(e) => {
            h.write_tag(1);
            expr(h, e);
        }
        None => {
            h.write_tag(0);
        }
    }
}

fn params(h: &mut FingerprintBuilder, params: &[Param<'_>]) {
    h.write_len(params.len());
    for p in params {
        h.write_str(p.name.name);
        expr(h, &p.ty);
    }
}

fn fn_decl(h: &mut FingerprintBuilder, f: &FnDecl<'_>) {
    h.write_str(f.name.name).write_tag(f.exported as u8);
    params(h, f.params);
    opt_expr(h, f.ret.as_ref());
    match &f.body {
        Some(b) => {
            h.write_tag(1);
            block(h, b);
        }
        None => {
            h.write_tag(0);
        }
    }
}

fn stmt(h: &mut FingerprintBuilder, s: &Stmt<'_>) {
    match s {
        Stmt::Let(l) => {
            h.write_tag(0x10).write_str(l.name.name).write_tag(l.exported as u8);
            opt_expr(h, l.ty.as_ref());
            expr(h, &l.init);
        }
        Stmt::Fn(f) => {
            h.write_tag(0x11);
            fn_decl(h, f);
        }
        Stmt::Return(r) => {
            h.write_tag(0x12);
            opt_expr(h, r.value.as_ref());
        }
        Stmt::If(i) => {
            h.write_tag(0x13);
            expr(h, &i.cond);
            block(h, &i.then_branch);
            match &i.else_branch {
                Some(b) => {
                    h.write_tag(1);
                    block(h, b);
                }
                None => {
                    h.write_tag(0);
                }
            }
        }
        Stmt::Block(b) => {
            h.write_tag(0x14);
            block(h, b);
        }
        Stmt::Expr(e) => {
            h.write_tag(0x15);
            expr(h, &e.expr);
        }
        Stmt::Import(i) => {
            h.write_tag(0x16).write_str(&i.path.dotted());
        }
    }
}

fn expr(h: &mut FingerprintBuilder, e: &Expr<'_>) {
    match e {
        Expr::Ident(id) => {
            h.write_tag(0x20).write_str(id.name);
        }
        Expr::Int(lit) => {
            h.write_tag(0x21).write_i64(lit.value);
        }
        Expr::Bool(lit) => {
            h.write_tag(0x22).write_tag(lit.value as u8);
        }
        Expr::Binary(b) => {
            h.write_tag(0x23).write_str(b.op.as_str());
            expr(h, &b.lhs);
            expr(h, &b.rhs);
        }
        Expr::Call(c) => {
            h.write_tag(0x24).write_tag(c.bracket.delimiters().0 as u8);
            expr(h, &c.callee);
            h.write_len(c.args.len());
            for arg in c.args {
                expr(h, arg);
            }
        }
        Expr::Member(m) => {
            h.write_tag(0x25).write_str(m.member.name);
            expr(h, &m.base);
        }
        Expr::Closure(c) => {
            h.write_tag(0x26);
            params(h, c.params);
            opt_expr(h, c.ret.as_ref());
            block(h, &c.body);
        }
        Expr::Import(i) => {
            h.write_tag(0x27).write_str(&i.path.dotted());
        }
        Expr::Struct(s) => {
            h.write_tag(0x28);
            stmts(h, s.body);
        }
        Expr::Typeclass(t) => {
            h.write_tag(0x29);
            params(h, t.params);
            h.write_len(t.members.len());
            for member in t.members {
                fn_decl(h, member);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::SyntaxBuilder;
    use bumpalo::Bump;

    #[test]
    fn spans_do_not_affect_fingerprint() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let first = b.module("m", vec![b.let_("x", b.int(1))]);
        // Different spans from the advancing line counter.
        let second = b.module("m", vec![b.let_("x", b.int(1))]);
        assert_ne!(first.span, second.span);
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn structure_changes_fingerprint() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let one = b.module("m", vec![b.let_("x", b.int(1))]);
        let two = b.module("m", vec![b.let_("x", b.int(2))]);
        let renamed = b.module("n", vec![b.let_("x", b.int(1))]);
        assert_ne!(one.fingerprint(), two.fingerprint());
        assert_ne!(one.fingerprint(), renamed.fingerprint());
    }
}
