// src/sema/analyzer/call.rs
//! Call expressions and overload resolution.
//!
//! Candidates are scored in declaration order and the first match wins.
//! Integer and nil literal arguments are retyped toward a candidate's
//! parameter types only after that candidate is accepted.

use super::*;
use crate::frontend::{Argument, CallExpr, Expr, ExprKind};
use crate::sema::context::{FuncSig, ParamSig};
use crate::sema::expression_data::{DeclRef, ResolvedCallee};
use crate::sema::types::FunctionType;

/// A scored callee: either a declaration in the context or a synthetic
/// foreign wrapper around an anonymous callable.
struct Candidate {
    decl: Option<FuncId>,
    sig: FuncSig,
}

impl Analyzer<'_> {
    pub(crate) fn check_call(&mut self, expr: &Expr, call: &CallExpr) -> Type {
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut receiver: Option<&Expr> = None;
        // Bound field when the callee is a field holding a function value
        let mut field_functor: Option<(DeclRef, Type)> = None;
        let callee = &call.callee;
        let callee_name: String;

        match &callee.kind {
            ExprKind::Identifier(sym) => {
                let sym = *sym;
                callee_name = self.resolve_str(sym).to_string();

                if let Some(binding) = self.scope.get(sym).cloned() {
                    self.data.set_decl(callee.id, binding.decl.clone());
                    self.register_capture(sym, &binding);
                    self.record_type(callee.id, &binding.ty);
                    match self.ctx.canonical_type(&binding.ty) {
                        Type::Function(ft) => candidates.push(Candidate {
                            decl: None,
                            sig: self.synthetic_wrapper(&ft),
                        }),
                        Type::Error => return self.bail_args(call),
                        other => {
                            self.emit(
                                SemanticError::CallNonFunction {
                                    ty: self.display_type(&other),
                                    span: callee.span.into(),
                                },
                                callee.span,
                            );
                            return self.bail_args(call);
                        }
                    }
                } else if let Some(gid) = self.ctx.global_named(sym) {
                    let ty = self.ctx.global(gid).ty.clone();
                    self.data.set_decl(callee.id, DeclRef::Global(gid));
                    self.record_type(callee.id, &ty);
                    match self.ctx.canonical_type(&ty) {
                        Type::Function(ft) => candidates.push(Candidate {
                            decl: None,
                            sig: self.synthetic_wrapper(&ft),
                        }),
                        Type::Error => return self.bail_args(call),
                        other => {
                            self.emit(
                                SemanticError::CallNonFunction {
                                    ty: self.display_type(&other),
                                    span: callee.span.into(),
                                },
                                callee.span,
                            );
                            return self.bail_args(call);
                        }
                    }
                } else if let Some(tid) = self.ctx.type_named(sym) {
                    // A bare type name calls that type's initializers
                    self.record_type(callee.id, &Type::Custom(sym));
                    let inits = self.ctx.type_decl(tid).initializers.clone();
                    for fid in inits {
                        candidates.push(Candidate {
                            decl: Some(fid),
                            sig: self.ctx.func(fid).clone(),
                        });
                    }
                } else {
                    for &fid in self.ctx.functions_named(sym) {
                        candidates.push(Candidate {
                            decl: Some(fid),
                            sig: self.ctx.func(fid).clone(),
                        });
                    }
                }

                if candidates.is_empty() {
                    for arg in &call.args {
                        self.check_expr(&arg.value);
                    }
                    self.emit(
                        SemanticError::UnknownFunction {
                            name: callee_name,
                            span: callee.span.into(),
                        },
                        callee.span,
                    );
                    return Type::Error;
                }
            }

            ExprKind::Field(fe) => {
                callee_name = self.resolve_str(fe.field).to_string();
                receiver = Some(&fe.object);

                let obj_ty = self.check_expr(&fe.object);
                if obj_ty.is_error() {
                    return self.bail_args(call);
                }
                let canon = self.ctx.canonical_type(&obj_ty);
                if matches!(canon, Type::Function(_)) {
                    self.emit(
                        SemanticError::FieldOfFunctionType {
                            field: callee_name,
                            span: fe.field_span.into(),
                        },
                        fe.field_span,
                    );
                    return self.bail_args(call);
                }
                let Some(tid) = self.ctx.decl_for(&canon, false) else {
                    self.emit(
                        SemanticError::UnknownType {
                            name: self.display_type(&obj_ty),
                            span: fe.object.span.into(),
                        },
                        fe.object.span,
                    );
                    return self.bail_args(call);
                };

                let field = self
                    .ctx
                    .type_decl(tid)
                    .field_named(fe.field)
                    .map(|f| (f.slot, f.ty.clone()));
                if let Some((slot, field_ty)) = field {
                    match self.ctx.canonical_type(&field_ty) {
                        Type::Function(ft) => {
                            // Field-as-functor: wrapped signature scores
                            // ahead of same-named methods
                            field_functor =
                                Some((DeclRef::Field { owner: tid, slot }, field_ty));
                            candidates.push(Candidate {
                                decl: None,
                                sig: self.synthetic_wrapper(&ft),
                            });
                        }
                        Type::Error => return self.bail_args(call),
                        other => {
                            self.data
                                .set_decl(callee.id, DeclRef::Field { owner: tid, slot });
                            self.record_type(callee.id, &field_ty);
                            self.emit(
                                SemanticError::CallNonFunction {
                                    ty: self.display_type(&other),
                                    span: fe.field_span.into(),
                                },
                                fe.field_span,
                            );
                            return self.bail_args(call);
                        }
                    }
                }

                let methods: Vec<FuncId> = self
                    .ctx
                    .type_decl(tid)
                    .methods
                    .iter()
                    .copied()
                    .filter(|&fid| self.ctx.func(fid).name == Some(fe.field))
                    .collect();
                for fid in methods {
                    candidates.push(Candidate {
                        decl: Some(fid),
                        sig: self.ctx.func(fid).clone(),
                    });
                }

                if candidates.is_empty() {
                    let ty_name = self
                        .resolve_str(self.ctx.type_decl(tid).name)
                        .to_string();
                    self.emit(
                        SemanticError::UnknownField {
                            ty: ty_name,
                            field: callee_name,
                            span: fe.field_span.into(),
                        },
                        fe.field_span,
                    );
                    return self.bail_args(call);
                }
            }

            _ => {
                let ty = self.check_expr(callee);
                callee_name = self.display_type(&ty);
                match self.ctx.canonical_type(&ty) {
                    Type::Function(ft) => candidates.push(Candidate {
                        decl: None,
                        sig: self.synthetic_wrapper(&ft),
                    }),
                    Type::Error => return self.bail_args(call),
                    other => {
                        self.emit(
                            SemanticError::CallNonFunction {
                                ty: self.display_type(&other),
                                span: callee.span.into(),
                            },
                            callee.span,
                        );
                        return self.bail_args(call);
                    }
                }
            }
        }

        for arg in &call.args {
            self.check_expr(&arg.value);
        }

        let chosen = candidates
            .iter()
            .position(|c| self.candidate_matches(&c.sig, &call.args));
        let Some(index) = chosen else {
            let args: Vec<String> = call
                .args
                .iter()
                .map(|a| {
                    let ty = self.data.ty(a.value.id).cloned().unwrap_or(Type::Error);
                    self.display_type(&ty)
                })
                .collect();
            tracing::debug!(name = %callee_name, args = ?args, "no viable overload");
            self.emit(
                SemanticError::NoViableOverload {
                    name: callee_name,
                    args: args.join(", "),
                    span: expr.span.into(),
                },
                expr.span,
            );
            let list: Vec<String> = candidates
                .iter()
                .map(|c| self.ctx.display_sig(&c.sig, self.interner()))
                .collect();
            self.sink.attach_note(SemanticError::Candidates {
                list: list.join("\n"),
                span: expr.span.into(),
            });
            return Type::Error;
        };

        let Candidate { decl, sig } = candidates.swap_remove(index);
        self.retype_literal_args(&sig, &call.args);

        match decl {
            Some(fid) => {
                self.data.set_callee(expr.id, ResolvedCallee::Decl(fid));
                self.data.set_decl(callee.id, DeclRef::Function(fid));
                self.record_type(callee.id, &Type::Function(sig.function_type()));
            }
            None => {
                if let Some((field_decl, field_ty)) = field_functor {
                    self.data.set_decl(callee.id, field_decl);
                    self.record_type(callee.id, &field_ty);
                }
                self.data
                    .set_callee(expr.id, ResolvedCallee::Synthetic(sig.clone()));
            }
        }

        if sig.mutating
            && let Some(recv) = receiver
        {
            let mutability = self.mutability(recv);
            if !mutability.is_mutable() {
                let culprit = mutability.culprit().map(|s| self.resolve_str(s).to_string());
                self.emit(
                    SemanticError::AssignToConstant {
                        name: culprit,
                        span: recv.span.into(),
                    },
                    recv.span,
                );
            }
        }

        sig.return_type
    }

    /// Analyze arguments for further errors, then give up on the call
    fn bail_args(&mut self, call: &CallExpr) -> Type {
        for arg in &call.args {
            self.check_expr(&arg.value);
        }
        Type::Error
    }

    /// Score one candidate: arity (varargs permitting), external labels,
    /// then each argument under literal coercions with `Any` as a
    /// wildcard. Arguments that already failed match anything.
    fn candidate_matches(&self, sig: &FuncSig, args: &[Argument]) -> bool {
        if !sig.has_varargs && sig.params.len() != args.len() {
            return false;
        }
        if sig.has_varargs && args.len() < sig.params.len() {
            return false;
        }
        for (param, arg) in sig.params.iter().zip(args.iter()) {
            if let Some(label) = param.label
                && arg.label != Some(label)
            {
                return false;
            }
            let param_ty = self.ctx.canonical_type(&param.ty);
            if param_ty == Type::Any {
                continue;
            }
            if arg.value.is_int_literal() && param_ty.is_integer() {
                continue;
            }
            if arg.value.is_nil_literal() && param_ty.is_pointer() {
                continue;
            }
            let arg_ty = self.data.ty(arg.value.id).cloned().unwrap_or(Type::Error);
            if arg_ty.is_error() {
                continue;
            }
            if !self.ctx.canonical_type(&arg_ty).matches(&param_ty) {
                return false;
            }
        }
        true
    }

    /// Commit literal retyping against the accepted candidate
    fn retype_literal_args(&mut self, sig: &FuncSig, args: &[Argument]) {
        for (param, arg) in sig.params.iter().zip(args.iter()) {
            let param_ty = self.ctx.canonical_type(&param.ty);
            if arg.value.is_int_literal() && param_ty.is_integer() {
                self.data.set_type(arg.value.id, param_ty);
            } else if arg.value.is_nil_literal() && param_ty.is_pointer() {
                self.data.set_type(arg.value.id, param_ty);
            }
        }
    }

    /// Manufacture a foreign implicit wrapper so anonymous callables go
    /// through the same resolution path as declared functions. Wrappers
    /// never participate in name-based lookup.
    pub(crate) fn synthetic_wrapper(&self, ft: &FunctionType) -> FuncSig {
        FuncSig {
            name: None,
            kind: FuncKind::Free,
            parent: None,
            params: ft
                .args
                .iter()
                .map(|t| ParamSig {
                    label: None,
                    ty: t.clone(),
                })
                .collect(),
            return_type: (*ft.return_type).clone(),
            foreign: true,
            implicit: true,
            mutating: false,
            noreturn: false,
            has_varargs: ft.has_varargs,
            span: Span::default(),
        }
    }
}
