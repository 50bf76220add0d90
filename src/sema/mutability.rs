// src/sema/mutability.rs
//! Mutability oracle: classifies l-value expressions as mutable or
//! immutable, naming the culprit binding when there is one.

use crate::frontend::{Expr, ExprKind, PrefixOp, Symbol};
use crate::sema::analyzer::Analyzer;
use crate::sema::expression_data::DeclRef;

/// Result of the mutability classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutability {
    Mutable,
    Immutable { culprit: Option<Symbol> },
}

impl Mutability {
    pub fn is_mutable(&self) -> bool {
        matches!(self, Mutability::Mutable)
    }

    pub fn culprit(&self) -> Option<Symbol> {
        match self {
            Mutability::Mutable => None,
            Mutability::Immutable { culprit } => *culprit,
        }
    }
}

impl Analyzer<'_> {
    /// Classify an already-analyzed l-value expression.
    ///
    /// Fields inherit the mutability of their access path root; holding
    /// an indirect aggregate in a `let` does not make its fields
    /// mutable. Dereference follows the pointer binding. Everything that
    /// is not an l-value is immutable with no culprit.
    pub(crate) fn mutability(&self, expr: &Expr) -> Mutability {
        match &expr.kind {
            ExprKind::Identifier(sym) => match self.data.decl(expr.id) {
                Some(DeclRef::Global(gid)) => {
                    if self.ctx.global(*gid).mutable {
                        Mutability::Mutable
                    } else {
                        Mutability::Immutable {
                            culprit: Some(*sym),
                        }
                    }
                }
                Some(
                    DeclRef::Local(_)
                    | DeclRef::Param { .. }
                    | DeclRef::ClosureParam { .. },
                ) => match self.scope.get(*sym) {
                    Some(binding) => binding.mutability(*sym),
                    None => Mutability::Immutable {
                        culprit: Some(*sym),
                    },
                },
                _ => Mutability::Immutable {
                    culprit: Some(*sym),
                },
            },
            ExprKind::SelfRef => match self.self_stack.last() {
                Some(info) if info.mutable => Mutability::Mutable,
                _ => Mutability::Immutable { culprit: None },
            },
            ExprKind::Paren(inner) => self.mutability(inner),
            ExprKind::Field(fe) => self.mutability(&fe.object),
            ExprKind::TupleField(tf) => self.mutability(&tf.object),
            ExprKind::Subscript(se) => self.mutability(&se.object),
            ExprKind::Prefix(pe) if pe.op == PrefixOp::Deref => self.mutability(&pe.operand),
            _ => Mutability::Immutable { culprit: None },
        }
    }
}
