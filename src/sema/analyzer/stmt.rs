// src/sema/analyzer/stmt.rs

use super::*;
use crate::frontend::{
    Block, ElseBranch, Expr, ExprKind, IfStmt, InfixOp, ReturnStmt, Stmt, SwitchStmt, VarDecl,
    WhileStmt,
};
use crate::sema::expression_data::{DeclRef, ResolvedCallee};
use crate::sema::scope::Binding;

/// Reachability of the current position in a block. Statements in any
/// terminated state are warned about and still analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowState {
    Reachable,
    TerminatedByReturn,
    TerminatedByBreak,
    TerminatedByContinue,
    TerminatedByNoreturn,
}

impl FlowState {
    fn terminator_name(self) -> &'static str {
        match self {
            FlowState::Reachable => "",
            FlowState::TerminatedByReturn => "return",
            FlowState::TerminatedByBreak => "break",
            FlowState::TerminatedByContinue => "continue",
            FlowState::TerminatedByNoreturn => "a call that never returns",
        }
    }
}

impl Analyzer<'_> {
    /// Check a block in its own scope, tracking reachability. The
    /// block's `has_return` annotation is set from the final state, and
    /// the scope is restored on exit.
    pub(crate) fn check_block(&mut self, block: &Block) {
        let depth = self.scope.depth();
        self.scope.push();

        let mut state = FlowState::Reachable;
        for stmt in &block.stmts {
            if state != FlowState::Reachable {
                let span = stmt.span();
                self.emit(
                    SemanticError::UnreachableCode {
                        after: state.terminator_name().to_string(),
                        span: span.into(),
                    },
                    span,
                );
            }
            let transition = self.check_stmt(stmt);
            if state == FlowState::Reachable
                && let Some(next) = transition
            {
                state = next;
            }
        }

        self.data.set_block_return(
            block.id,
            matches!(
                state,
                FlowState::TerminatedByReturn | FlowState::TerminatedByNoreturn
            ),
        );

        self.scope.pop();
        debug_assert_eq!(self.scope.depth(), depth);
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> Option<FlowState> {
        match stmt {
            Stmt::Expr(expr) => {
                self.check_expr(expr);
                self.is_noreturn_call(expr)
                    .then_some(FlowState::TerminatedByNoreturn)
            }
            Stmt::Var(var) => {
                self.check_local_var(var);
                None
            }
            Stmt::Return(ret) => {
                self.check_return(ret);
                Some(FlowState::TerminatedByReturn)
            }
            Stmt::If(if_stmt) => {
                let all_return = self.check_if(if_stmt);
                all_return.then_some(FlowState::TerminatedByReturn)
            }
            Stmt::While(while_stmt) => {
                self.check_while(while_stmt);
                None
            }
            Stmt::Switch(switch_stmt) => {
                self.check_switch(switch_stmt);
                None
            }
            Stmt::Break(span) => {
                if self.break_targets.is_empty() {
                    self.emit(
                        SemanticError::BreakNotAllowed {
                            span: (*span).into(),
                        },
                        *span,
                    );
                }
                Some(FlowState::TerminatedByBreak)
            }
            Stmt::Continue(span) => {
                if self.break_targets.is_empty() {
                    self.emit(
                        SemanticError::ContinueNotAllowed {
                            span: (*span).into(),
                        },
                        *span,
                    );
                }
                Some(FlowState::TerminatedByContinue)
            }
            Stmt::Block(block) => {
                self.check_block(block);
                self.data
                    .block_has_return(block.id)
                    .then_some(FlowState::TerminatedByReturn)
            }
        }
    }

    fn is_noreturn_call(&self, expr: &Expr) -> bool {
        let inner = expr.unparenthesized();
        if matches!(inner.kind, ExprKind::Call(_))
            && let Some(ResolvedCallee::Decl(fid)) = self.data.callee(inner.id)
        {
            return self.ctx.func(*fid).noreturn;
        }
        false
    }

    fn check_local_var(&mut self, var: &VarDecl) {
        if var.foreign && var.init.is_some() {
            let name = self.resolve_str(var.name).to_string();
            self.emit(
                SemanticError::ForeignVarWithRHS {
                    name,
                    span: var.span.into(),
                },
                var.span,
            );
        }
        let ty = self.var_decl_type(var);
        self.scope.define(
            var.name,
            Binding {
                ty,
                mutable: var.mutable,
                decl: DeclRef::Local(var.id),
            },
        );
        if let Some(frame) = self.closures.last_mut() {
            frame.locals.insert(var.name);
        }
    }

    /// Returned expressions are literal-coerced against the enclosing
    /// function or closure return type.
    fn check_return(&mut self, ret: &ReturnStmt) {
        let expected = self.return_types.last().cloned();
        match (&ret.value, expected) {
            (Some(value), Some(expected)) => {
                let value_ty = self.check_expr(value);
                self.coerce_to_slot(value, &value_ty, &expected);
            }
            (Some(value), None) => {
                self.check_expr(value);
            }
            (None, Some(expected)) => {
                if expected != Type::Void && !expected.is_error() {
                    self.emit(
                        SemanticError::CannotCoerce {
                            from: "Void".to_string(),
                            to: self.display_type(&expected),
                            span: ret.span.into(),
                        },
                        ret.span,
                    );
                }
            }
            (None, None) => {}
        }
    }

    /// Conditions must be Bool
    fn check_condition(&mut self, cond: &Expr) {
        let ty = self.check_expr(cond);
        if !ty.is_error() && self.ctx.canonical_type(&ty) != Type::Bool {
            self.emit(
                SemanticError::CannotCoerce {
                    from: self.display_type(&ty),
                    to: "Bool".to_string(),
                    span: cond.span.into(),
                },
                cond.span,
            );
        }
    }

    /// Returns whether every branch returns (else-if chains included)
    fn check_if(&mut self, if_stmt: &IfStmt) -> bool {
        self.check_condition(&if_stmt.condition);
        self.check_block(&if_stmt.then_block);
        let then_returns = self.data.block_has_return(if_stmt.then_block.id);
        match &if_stmt.else_branch {
            Some(ElseBranch::Block(block)) => {
                self.check_block(block);
                then_returns && self.data.block_has_return(block.id)
            }
            Some(ElseBranch::If(nested)) => {
                let else_returns = self.check_if(nested);
                then_returns && else_returns
            }
            None => false,
        }
    }

    fn check_while(&mut self, while_stmt: &WhileStmt) {
        self.check_condition(&while_stmt.condition);
        self.break_targets.push(BreakTarget::Loop);
        self.check_block(&while_stmt.body);
        self.break_targets.pop();
    }

    /// Each case value must compare equal to the subject with the
    /// builtin `==`; pointer equality switches are disallowed.
    fn check_switch(&mut self, switch_stmt: &SwitchStmt) {
        let subject_ty = self.check_expr(&switch_stmt.subject);
        let canon = self.ctx.canonical_type(&subject_ty);
        let subject_ok = if subject_ty.is_error() {
            false
        } else if canon.is_pointer() || self.ctx.operator_type(InfixOp::Eq, &canon).is_none() {
            self.emit(
                SemanticError::CannotSwitch {
                    ty: self.display_type(&subject_ty),
                    span: switch_stmt.subject.span.into(),
                },
                switch_stmt.subject.span,
            );
            false
        } else {
            true
        };

        self.break_targets.push(BreakTarget::Switch);
        for case in &switch_stmt.cases {
            let case_ty = self.check_expr(&case.value);
            if subject_ok && !case_ty.is_error() {
                if case.value.is_int_literal() && canon.is_integer() {
                    self.data.set_type(case.value.id, canon.clone());
                } else if !self.ctx.canonical_type(&case_ty).matches(&canon) {
                    self.emit(
                        SemanticError::CannotSwitch {
                            ty: self.display_type(&case_ty),
                            span: case.value.span.into(),
                        },
                        case.value.span,
                    );
                }
            }
            self.check_block(&case.body);
        }
        if let Some(default) = &switch_stmt.default {
            self.check_block(default);
        }
        self.break_targets.pop();
    }
}
