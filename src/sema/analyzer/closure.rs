// src/sema/analyzer/closure.rs

use super::*;
use crate::frontend::{ClosureExpr, Expr};
use crate::sema::expression_data::DeclRef;
use crate::sema::scope::Binding;
use crate::sema::types::FunctionType;

impl Analyzer<'_> {
    /// Analyze a closure: its own function scope, capture discovery on
    /// the frame stack, and the usual all-paths-return requirement for
    /// non-void bodies. Captures are by reference; they are recorded in
    /// first-reference order on the closure's node.
    pub(crate) fn check_closure(&mut self, expr: &Expr, ce: &ClosureExpr) -> Type {
        let mut arg_tys = Vec::new();
        for param in &ce.params {
            let ty = self.ctx.resolve_type_ref(&param.ty);
            if !self.ctx.is_valid_type(&ty) {
                self.emit(
                    SemanticError::UnknownType {
                        name: self.display_type(&ty),
                        span: param.span.into(),
                    },
                    param.span,
                );
                arg_tys.push(Type::Error);
            } else {
                arg_tys.push(ty);
            }
        }
        let return_type = ce
            .return_type
            .as_ref()
            .map(|t| self.ctx.resolve_type_ref(t))
            .unwrap_or(Type::Void);
        if !self.ctx.is_valid_type(&return_type) {
            let span = ce.return_type.as_ref().map(|t| t.span).unwrap_or(expr.span);
            self.emit(
                SemanticError::UnknownType {
                    name: self.display_type(&return_type),
                    span: span.into(),
                },
                span,
            );
        }

        self.closures.push(ClosureFrame::default());
        self.kind_stack.push(FuncKind::Closure);
        self.return_types.push(return_type.clone());
        // break/continue cannot cross the closure boundary into an
        // enclosing loop or switch
        let outer_break_targets = std::mem::take(&mut self.break_targets);

        self.scope.push();
        for (index, (param, ty)) in ce.params.iter().zip(arg_tys.iter()).enumerate() {
            let mutable = self.is_indirect_aggregate(ty);
            self.scope.define(
                param.name,
                Binding {
                    ty: ty.clone(),
                    mutable,
                    decl: DeclRef::ClosureParam {
                        closure: expr.id,
                        index,
                    },
                },
            );
            if let Some(frame) = self.closures.last_mut() {
                frame.locals.insert(param.name);
            }
        }

        self.check_block(&ce.body);

        self.scope.pop();
        self.break_targets = outer_break_targets;
        self.return_types.pop();
        self.kind_stack.pop();
        let frame = self.closures.pop().unwrap_or_default();
        tracing::debug!(captures = frame.captures.len(), "closure analyzed");
        self.data.set_captures(expr.id, frame.captures);

        if return_type != Type::Void
            && !return_type.is_error()
            && !self.data.block_has_return(ce.body.id)
        {
            self.emit(
                SemanticError::NotAllPathsReturn {
                    name: "closure".to_string(),
                    ty: self.display_type(&return_type),
                    span: expr.span.into(),
                },
                expr.span,
            );
        }

        Type::Function(FunctionType {
            args: arg_tys,
            return_type: Box::new(return_type),
            has_varargs: false,
        })
    }
}
