// src/sema/analyzer/expr.rs

use super::*;
use crate::frontend::{
    CastExpr, Expr, ExprKind, FieldExpr, InfixExpr, InfixOp, PrefixExpr, PrefixOp, SubscriptExpr,
    TupleFieldExpr,
};
use crate::sema::expression_data::{Capture, DeclRef};
use crate::sema::scope::Binding;

impl Analyzer<'_> {
    /// Type an expression, recording the result in the side table. The
    /// `Error` sentinel suppresses cascade diagnostics downstream.
    pub(crate) fn check_expr(&mut self, expr: &Expr) -> Type {
        let ty = self.check_expr_inner(expr);
        self.record_type(expr.id, &ty);
        ty
    }

    fn check_expr_inner(&mut self, expr: &Expr) -> Type {
        match &expr.kind {
            ExprKind::IntLiteral(_) => Type::I64,
            ExprKind::FloatLiteral(_) => Type::F64,
            ExprKind::BoolLiteral(_) => Type::Bool,
            ExprKind::StringLiteral(_) => Type::Str,
            // A bare nil is a pointer with no particular pointee until a
            // slot retypes it
            ExprKind::NilLiteral => Type::pointer(Type::Any),

            ExprKind::Identifier(sym) => self.check_identifier(expr, *sym),
            ExprKind::SelfRef => self.check_self(expr),
            ExprKind::Paren(inner) => self.check_expr(inner),
            ExprKind::TupleLiteral(elements) => {
                let tys = elements.iter().map(|e| self.check_expr(e)).collect();
                Type::Tuple(tys)
            }

            ExprKind::Infix(ie) => self.check_infix(expr, ie),
            ExprKind::Cast(ce) => self.check_cast(ce),
            ExprKind::Prefix(pe) => self.check_prefix(expr, pe),

            ExprKind::Call(call) => self.check_call(expr, call),
            ExprKind::Field(fe) => self.check_field(expr, fe),
            ExprKind::TupleField(tf) => self.check_tuple_field(tf),
            ExprKind::Subscript(se) => self.check_subscript(se),

            ExprKind::Closure(ce) => self.check_closure(expr, ce),

            ExprKind::Sizeof(operand) => self.check_sizeof(expr, operand),
            ExprKind::PoundFunction => self.check_pound_function(expr),
        }
    }

    /// Resolution order: lexical bindings, then globals, then functions
    /// by name. Inside a closure, a binding from an enclosing scope is
    /// registered as a capture on the nearest enclosing closure.
    fn check_identifier(&mut self, expr: &Expr, sym: Symbol) -> Type {
        if let Some(binding) = self.scope.get(sym).cloned() {
            self.data.set_decl(expr.id, binding.decl.clone());
            self.register_capture(sym, &binding);
            return binding.ty;
        }

        if let Some(gid) = self.ctx.global_named(sym) {
            self.data.set_decl(expr.id, DeclRef::Global(gid));
            return self.ctx.global(gid).ty.clone();
        }

        let funcs = self.ctx.functions_named(sym).to_vec();
        match funcs.as_slice() {
            [] => {
                self.emit(
                    SemanticError::UnknownVariableName {
                        name: self.resolve_str(sym).to_string(),
                        span: expr.span.into(),
                    },
                    expr.span,
                );
                Type::Error
            }
            [fid] => {
                let fid = *fid;
                self.data.set_decl(expr.id, DeclRef::Function(fid));
                Type::Function(self.ctx.func(fid).function_type())
            }
            _ => {
                // Several overloads and no call context to pick one
                self.emit(
                    SemanticError::AmbiguousReference {
                        name: self.resolve_str(sym).to_string(),
                        span: expr.span.into(),
                    },
                    expr.span,
                );
                Type::Error
            }
        }
    }

    fn check_self(&mut self, expr: &Expr) -> Type {
        match self.self_stack.last() {
            Some(info) => {
                self.data.set_decl(expr.id, DeclRef::SelfParam);
                info.ty.clone()
            }
            None => {
                self.emit(
                    SemanticError::UnknownVariableName {
                        name: "self".to_string(),
                        span: expr.span.into(),
                    },
                    expr.span,
                );
                Type::Error
            }
        }
    }

    pub(crate) fn register_capture(&mut self, sym: Symbol, binding: &Binding) {
        if !matches!(
            binding.decl,
            DeclRef::Local(_) | DeclRef::Param { .. } | DeclRef::ClosureParam { .. }
        ) {
            return;
        }
        if let Some(frame) = self.closures.last_mut()
            && !frame.locals.contains(&sym)
        {
            frame.record(Capture {
                name: sym,
                decl: binding.decl.clone(),
                is_mutable: binding.mutable,
            });
        }
    }

    /// Field lookup without call arguments; calls go through check_call
    /// so overload resolution sees the argument list.
    pub(crate) fn check_field(&mut self, expr: &Expr, fe: &FieldExpr) -> Type {
        let obj_ty = self.check_expr(&fe.object);
        self.resolve_field(expr, fe, &obj_ty)
    }

    fn resolve_field(&mut self, expr: &Expr, fe: &FieldExpr, obj_ty: &Type) -> Type {
        if obj_ty.is_error() {
            return Type::Error;
        }
        let canon = self.ctx.canonical_type(obj_ty);
        if matches!(canon, Type::Function(_)) {
            self.emit(
                SemanticError::FieldOfFunctionType {
                    field: self.resolve_str(fe.field).to_string(),
                    span: fe.field_span.into(),
                },
                fe.field_span,
            );
            return Type::Error;
        }
        let Some(type_id) = self.ctx.decl_for(&canon, false) else {
            self.emit(
                SemanticError::UnknownType {
                    name: self.display_type(obj_ty),
                    span: fe.object.span.into(),
                },
                fe.object.span,
            );
            return Type::Error;
        };

        let info = self.ctx.type_decl(type_id);
        if let Some(field) = info.field_named(fe.field) {
            let ty = field.ty.clone();
            let slot = field.slot;
            self.data.set_decl(
                expr.id,
                DeclRef::Field {
                    owner: type_id,
                    slot,
                },
            );
            return ty;
        }

        let methods: Vec<FuncId> = info
            .methods
            .iter()
            .copied()
            .filter(|&fid| self.ctx.func(fid).name == Some(fe.field))
            .collect();
        match methods.as_slice() {
            [] => {
                let ty_name = self.resolve_str(info.name).to_string();
                self.emit(
                    SemanticError::UnknownField {
                        ty: ty_name,
                        field: self.resolve_str(fe.field).to_string(),
                        span: fe.field_span.into(),
                    },
                    fe.field_span,
                );
                Type::Error
            }
            [fid] => {
                let fid = *fid;
                self.data.set_decl(expr.id, DeclRef::Function(fid));
                Type::Function(self.ctx.func(fid).function_type())
            }
            _ => {
                // Overloaded method referenced without a call
                self.emit(
                    SemanticError::AmbiguousReference {
                        name: self.resolve_str(fe.field).to_string(),
                        span: fe.field_span.into(),
                    },
                    fe.field_span,
                );
                Type::Error
            }
        }
    }

    fn check_tuple_field(&mut self, tf: &TupleFieldExpr) -> Type {
        let obj_ty = self.check_expr(&tf.object);
        if obj_ty.is_error() {
            return Type::Error;
        }
        match self.ctx.canonical_type(&obj_ty) {
            Type::Tuple(elements) => {
                if tf.index < elements.len() {
                    elements[tf.index].clone()
                } else {
                    self.emit(
                        SemanticError::OutOfBoundsTupleField {
                            field: tf.index,
                            max: elements.len(),
                            span: tf.index_span.into(),
                        },
                        tf.index_span,
                    );
                    Type::Error
                }
            }
            _ => {
                self.emit(
                    SemanticError::IndexIntoNonTuple {
                        ty: self.display_type(&obj_ty),
                        span: tf.index_span.into(),
                    },
                    tf.index_span,
                );
                Type::Error
            }
        }
    }

    fn check_subscript(&mut self, se: &SubscriptExpr) -> Type {
        let obj_ty = self.check_expr(&se.object);
        let index_ty = self.check_expr(&se.index);
        if obj_ty.is_error() {
            return Type::Error;
        }
        match self.ctx.canonical_type(&obj_ty) {
            Type::Pointer(pointee) => {
                if se.index.is_int_literal() {
                    self.data.set_type(se.index.id, Type::I64);
                } else if !index_ty.is_error()
                    && !self.ctx.canonical_type(&index_ty).is_integer()
                {
                    self.emit(
                        SemanticError::InvalidOperands {
                            op: "[]".to_string(),
                            operands: self.display_type(&index_ty),
                            span: se.index.span.into(),
                        },
                        se.index.span,
                    );
                }
                *pointee
            }
            _ => {
                self.emit(
                    SemanticError::CannotSubscript {
                        ty: self.display_type(&obj_ty),
                        span: se.object.span.into(),
                    },
                    se.object.span,
                );
                Type::Error
            }
        }
    }

    fn check_infix(&mut self, expr: &Expr, ie: &InfixExpr) -> Type {
        if ie.op.is_assignment() {
            return self.check_assign(ie);
        }

        let lhs_ty = self.check_expr(&ie.lhs);
        let rhs_ty = self.check_expr(&ie.rhs);
        if lhs_ty.is_error() || rhs_ty.is_error() {
            return Type::Error;
        }

        let mut lhs = self.ctx.canonical_type(&lhs_ty);
        let mut rhs = self.ctx.canonical_type(&rhs_ty);

        // Literal coercions apply symmetrically: an integer literal takes
        // the other side's integer type, nil takes the other side's
        // pointer type.
        if ie.lhs.is_int_literal() && rhs.is_integer() && lhs != rhs {
            self.data.set_type(ie.lhs.id, rhs.clone());
            lhs = rhs.clone();
        } else if ie.rhs.is_int_literal() && lhs.is_integer() && lhs != rhs {
            self.data.set_type(ie.rhs.id, lhs.clone());
            rhs = lhs.clone();
        }
        if ie.lhs.is_nil_literal() && rhs.is_pointer() {
            self.data.set_type(ie.lhs.id, rhs.clone());
            lhs = rhs.clone();
        } else if ie.rhs.is_nil_literal() && lhs.is_pointer() {
            self.data.set_type(ie.rhs.id, lhs.clone());
            rhs = lhs.clone();
        }

        // Pointer arithmetic: pointer plus or minus an integer offset
        if matches!(ie.op, InfixOp::Add | InfixOp::Sub) && lhs.is_pointer() && rhs.is_integer() {
            return lhs;
        }

        if !lhs.matches(&rhs) {
            self.invalid_operands(ie.op, &lhs_ty, &rhs_ty, expr.span);
            return Type::Error;
        }

        match self.ctx.operator_type(ie.op, &lhs) {
            Some(ty) => ty,
            None => {
                self.invalid_operands(ie.op, &lhs_ty, &rhs_ty, expr.span);
                // Operand invalidity has been diagnosed; the operator
                // itself defaults to Void
                Type::Void
            }
        }
    }

    fn invalid_operands(&mut self, op: InfixOp, lhs: &Type, rhs: &Type, span: Span) {
        self.emit(
            SemanticError::InvalidOperands {
                op: op.symbol().to_string(),
                operands: format!(
                    "{} and {}",
                    self.display_type(lhs),
                    self.display_type(rhs)
                ),
                span: span.into(),
            },
            span,
        );
    }

    /// Assignment types as Void. Constant l-values are rejected outside
    /// initializers; nil on the right requires a nullable left side.
    fn check_assign(&mut self, ie: &InfixExpr) -> Type {
        let lhs_ty = self.check_expr(&ie.lhs);
        let rhs_ty = self.check_expr(&ie.rhs);
        if lhs_ty.is_error() {
            return Type::Void;
        }

        if !self.in_initializer() {
            let mutability = self.mutability(&ie.lhs);
            if !mutability.is_mutable() {
                let culprit = mutability.culprit().map(|s| self.resolve_str(s).to_string());
                self.emit(
                    SemanticError::AssignToConstant {
                        name: culprit,
                        span: ie.lhs.span.into(),
                    },
                    ie.lhs.span,
                );
            }
        }

        if ie.rhs.is_nil_literal() {
            if self.ctx.can_be_nil(&lhs_ty) {
                self.data.set_type(ie.rhs.id, lhs_ty.clone());
            } else {
                self.emit(
                    SemanticError::NonPointerNil {
                        ty: self.display_type(&lhs_ty),
                        span: ie.rhs.span.into(),
                    },
                    ie.rhs.span,
                );
            }
            return Type::Void;
        }

        if !rhs_ty.is_error() {
            if ie.rhs.is_int_literal() && self.ctx.canonical_type(&lhs_ty).is_integer() {
                self.data.set_type(ie.rhs.id, lhs_ty.clone());
            } else if self.ctx.can_coerce(&rhs_ty, &lhs_ty) {
                self.data.set_type(ie.rhs.id, lhs_ty.clone());
            } else {
                self.emit(
                    SemanticError::CannotCoerce {
                        from: self.display_type(&rhs_ty),
                        to: self.display_type(&lhs_ty),
                        span: ie.rhs.span.into(),
                    },
                    ie.rhs.span,
                );
            }
        }

        Type::Void
    }

    fn check_cast(&mut self, ce: &CastExpr) -> Type {
        let value_ty = self.check_expr(&ce.value);
        let target = self.ctx.resolve_type_ref(&ce.target);
        if !self.ctx.is_valid_type(&target) {
            self.emit(
                SemanticError::UnknownType {
                    name: self.display_type(&target),
                    span: ce.target.span.into(),
                },
                ce.target.span,
            );
            return Type::Error;
        }
        if value_ty.is_error() {
            return Type::Error;
        }
        if !self.ctx.can_coerce_cast(&value_ty, &target) {
            self.emit(
                SemanticError::CannotCoerce {
                    from: self.display_type(&value_ty),
                    to: self.display_type(&target),
                    span: ce.value.span.into(),
                },
                ce.value.span,
            );
            return Type::Error;
        }
        target
    }

    fn check_prefix(&mut self, expr: &Expr, pe: &PrefixExpr) -> Type {
        match pe.op {
            PrefixOp::Deref => {
                let operand_ty = self.check_expr(&pe.operand);
                if operand_ty.is_error() {
                    return Type::Error;
                }
                match self.ctx.canonical_type(&operand_ty) {
                    Type::Pointer(pointee) => *pointee,
                    _ => {
                        self.emit(
                            SemanticError::DereferenceNonPointer {
                                ty: self.display_type(&operand_ty),
                                span: pe.operand.span.into(),
                            },
                            pe.operand.span,
                        );
                        Type::Error
                    }
                }
            }
            PrefixOp::AddressOf => {
                let operand_ty = self.check_expr(&pe.operand);
                let addressable = matches!(
                    pe.operand.unparenthesized().kind,
                    ExprKind::Identifier(_) | ExprKind::Field(_) | ExprKind::Subscript(_)
                );
                if !addressable {
                    self.emit(
                        SemanticError::AddressOfRValue {
                            span: pe.operand.span.into(),
                        },
                        pe.operand.span,
                    );
                    return Type::Error;
                }
                if operand_ty.is_error() {
                    return Type::Error;
                }
                Type::pointer(operand_ty)
            }
            PrefixOp::Neg => {
                let operand_ty = self.check_expr(&pe.operand);
                self.unary_numeric(expr, pe, operand_ty, |t| t.is_numeric())
            }
            PrefixOp::Not => {
                let operand_ty = self.check_expr(&pe.operand);
                if operand_ty.is_error() {
                    return Type::Error;
                }
                if self.ctx.canonical_type(&operand_ty) == Type::Bool {
                    Type::Bool
                } else {
                    self.prefix_invalid(pe, &operand_ty, expr.span);
                    Type::Error
                }
            }
            PrefixOp::BitNot => {
                let operand_ty = self.check_expr(&pe.operand);
                self.unary_numeric(expr, pe, operand_ty, |t| t.is_integer())
            }
        }
    }

    fn unary_numeric(
        &mut self,
        expr: &Expr,
        pe: &PrefixExpr,
        operand_ty: Type,
        accepts: fn(&Type) -> bool,
    ) -> Type {
        if operand_ty.is_error() {
            return Type::Error;
        }
        let canon = self.ctx.canonical_type(&operand_ty);
        if accepts(&canon) {
            canon
        } else {
            self.prefix_invalid(pe, &operand_ty, expr.span);
            Type::Error
        }
    }

    fn prefix_invalid(&mut self, pe: &PrefixExpr, operand_ty: &Type, span: Span) {
        self.emit(
            SemanticError::InvalidOperands {
                op: pe.op.symbol().to_string(),
                operands: self.display_type(operand_ty),
                span: span.into(),
            },
            span,
        );
    }

    /// `sizeof` takes a type operand when the (optionally parenthesized)
    /// bare name resolves to a valid type; otherwise the operand is an
    /// ordinary expression.
    fn check_sizeof(&mut self, expr: &Expr, operand: &Expr) -> Type {
        let inner = operand.unparenthesized();
        if let ExprKind::Identifier(sym) = inner.kind {
            let as_type = Type::Custom(sym);
            if self.ctx.is_valid_type(&as_type) {
                let canon = self.ctx.canonical_type(&as_type);
                self.data.set_sizeof_type(expr.id, canon);
                return Type::I64;
            }
        }
        let value_ty = self.check_expr(operand);
        self.data.set_sizeof_type(expr.id, value_ty);
        Type::I64
    }

    fn check_pound_function(&mut self, expr: &Expr) -> Type {
        match self.current_function.last() {
            Some(&fid) => {
                let pretty = self.ctx.pretty_name(fid, self.interner());
                self.data.set_pretty_name(expr.id, pretty);
                Type::Str
            }
            None => {
                self.emit(
                    SemanticError::PoundFunctionOutsideFunction {
                        span: expr.span.into(),
                    },
                    expr.span,
                );
                Type::Error
            }
        }
    }
}
