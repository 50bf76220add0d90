// src/sema/analyzer/decls.rs

use super::*;
use crate::frontend::{ExtensionDecl, FuncDecl, TypeAliasDecl, TypeDecl, VarDecl};
use crate::sema::scope::Binding;
use crate::sema::expression_data::DeclRef;

impl Analyzer<'_> {
    pub(crate) fn check_type_decl(&mut self, td: &TypeDecl) {
        let Some(id) = self.ctx.type_named(td.name) else {
            return;
        };

        for (slot, field) in td.fields.iter().enumerate() {
            let field_ty = self.ctx.type_decl(id).fields[slot].ty.clone();
            if !self.ctx.is_valid_type(&field_ty) {
                self.emit(
                    SemanticError::UnknownType {
                        name: self.display_type(&field_ty),
                        span: field.span.into(),
                    },
                    field.span,
                );
                continue;
            }
            if let Some(init) = &field.init {
                let init_ty = self.check_expr(init);
                self.coerce_to_slot(init, &init_ty, &field_ty);
            }
        }

        for method in &td.methods {
            self.check_function(method);
        }
        for init in &td.initializers {
            self.check_function(init);
        }
        if let Some(deinit) = &td.deinitializer {
            self.check_function(deinit);
        }
    }

    pub(crate) fn check_extension(&mut self, ext: &ExtensionDecl) {
        // An unknown target was already diagnosed during registration and
        // its methods never got signatures; check_function skips them.
        for method in &ext.methods {
            self.check_function(method);
        }
    }

    pub(crate) fn check_alias(&mut self, alias: &TypeAliasDecl) {
        let Some(target) = self.ctx.alias_target(alias.name).cloned() else {
            return;
        };
        // A cyclic alias was already diagnosed during registration
        if target.is_error() {
            return;
        }
        if !self.ctx.is_valid_type(&target) {
            self.emit(
                SemanticError::UnknownType {
                    name: self.display_type(&target),
                    span: alias.span.into(),
                },
                alias.span,
            );
        }
    }

    /// Declaration checks of §function-decl order, each short-circuiting
    /// the declaration, then the body walk and the all-paths-return check.
    pub(crate) fn check_function(&mut self, func: &FuncDecl) {
        let Some(fid) = self.ctx.func_for_node(func.id) else {
            return;
        };
        let sig = self.ctx.func(fid).clone();
        let name = self.resolve_str(func.name).to_string();

        if sig.foreign && sig.kind != FuncKind::Initializer && func.body.is_some() {
            self.emit(
                SemanticError::ForeignFunctionWithBody {
                    name,
                    span: func.span.into(),
                },
                func.span,
            );
            return;
        }
        if !sig.foreign && !sig.implicit && func.body.is_none() {
            self.emit(
                SemanticError::NonForeignFunctionWithoutBody {
                    name,
                    span: func.span.into(),
                },
                func.span,
            );
            return;
        }
        if sig.has_varargs && !sig.foreign {
            self.emit(
                SemanticError::VarArgsInNonForeignDecl {
                    span: func.span.into(),
                },
                func.span,
            );
            return;
        }
        if !self.ctx.is_valid_type(&sig.return_type) {
            let span = func
                .return_type
                .as_ref()
                .map(|t| t.span)
                .unwrap_or(func.span);
            self.emit(
                SemanticError::UnknownType {
                    name: self.display_type(&sig.return_type),
                    span: span.into(),
                },
                span,
            );
            return;
        }
        for (param, param_sig) in func.params.iter().zip(sig.params.iter()) {
            if !self.ctx.is_valid_type(&param_sig.ty) {
                self.emit(
                    SemanticError::UnknownType {
                        name: self.display_type(&param_sig.ty),
                        span: param.span.into(),
                    },
                    param.span,
                );
                return;
            }
        }
        if sig.kind == FuncKind::Deinitializer
            && let Some(parent) = sig.parent
            && !self.ctx.type_decl(parent).indirect
        {
            let ty = self.resolve_str(self.ctx.type_decl(parent).name).to_string();
            self.emit(
                SemanticError::DeinitOnStruct {
                    ty,
                    span: func.span.into(),
                },
                func.span,
            );
            return;
        }

        let Some(body) = &func.body else {
            return;
        };

        self.current_function.push(fid);
        self.kind_stack.push(sig.kind);
        // An initializer's signature carries the constructed type for
        // call sites; its body returns nothing.
        let body_return = if sig.kind == FuncKind::Initializer {
            Type::Void
        } else {
            sig.return_type.clone()
        };
        self.return_types.push(body_return);
        if let Some(parent) = sig.parent {
            let parent_info = self.ctx.type_decl(parent);
            let self_mutable = sig.mutating
                || parent_info.indirect
                || sig.kind == FuncKind::Deinitializer;
            self.current_type.push(parent);
            self.self_stack.push(SelfInfo {
                ty: Type::Custom(parent_info.name),
                mutable: self_mutable,
            });
        }

        self.scope.push();
        for (index, (param, param_sig)) in
            func.params.iter().zip(sig.params.iter()).enumerate()
        {
            // Bindings of indirect aggregate type are auto-marked mutable
            let mutable = self.is_indirect_aggregate(&param_sig.ty);
            self.scope.define(
                param.name,
                Binding {
                    ty: param_sig.ty.clone(),
                    mutable,
                    decl: DeclRef::Param { func: fid, index },
                },
            );
        }

        self.check_block(body);

        self.scope.pop();
        if sig.parent.is_some() {
            self.current_type.pop();
            self.self_stack.pop();
        }
        self.return_types.pop();
        self.kind_stack.pop();
        self.current_function.pop();

        if sig.return_type != Type::Void
            && sig.kind != FuncKind::Initializer
            && !self.data.block_has_return(body.id)
        {
            let name = self.resolve_str(func.name).to_string();
            tracing::debug!(function = %name, "missing return on some path");
            self.emit(
                SemanticError::NotAllPathsReturn {
                    name,
                    ty: self.display_type(&sig.return_type),
                    span: func.span.into(),
                },
                func.span,
            );
        }
    }

    pub(crate) fn check_global(&mut self, var: &VarDecl) {
        let Some(gid) = self.ctx.global_named(var.name) else {
            return;
        };
        if var.foreign {
            if var.init.is_some() {
                let name = self.resolve_str(var.name).to_string();
                self.emit(
                    SemanticError::ForeignVarWithRHS {
                        name,
                        span: var.span.into(),
                    },
                    var.span,
                );
            }
            let declared = self.ctx.global(gid).ty.clone();
            if !declared.is_error() && !self.ctx.is_valid_type(&declared) {
                self.emit(
                    SemanticError::UnknownType {
                        name: self.display_type(&declared),
                        span: var.span.into(),
                    },
                    var.span,
                );
            }
            return;
        }

        let ty = self.var_decl_type(var);
        self.ctx.set_global_type(gid, ty);
    }

    /// Resolve the type of a variable declaration: declared annotation
    /// wins, with the initializer rewritten toward it (literal-bias
    /// coercion); otherwise the initializer's type is inferred.
    pub(crate) fn var_decl_type(&mut self, var: &VarDecl) -> Type {
        let declared = var.ty.as_ref().map(|t| self.ctx.resolve_type_ref(t));
        if let Some(d) = &declared
            && !self.ctx.is_valid_type(d)
        {
            let span = var.ty.as_ref().map(|t| t.span).unwrap_or(var.span);
            self.emit(
                SemanticError::UnknownType {
                    name: self.display_type(d),
                    span: span.into(),
                },
                span,
            );
            if let Some(init) = &var.init {
                self.check_expr(init);
            }
            return Type::Error;
        }

        if let Some(init) = &var.init {
            let init_ty = self.check_expr(init);
            match declared {
                Some(declared) => {
                    self.coerce_to_slot(init, &init_ty, &declared);
                    declared
                }
                None => init_ty,
            }
        } else {
            declared.unwrap_or(Type::Error)
        }
    }

    /// Literal-bias a value toward a slot type, or diagnose
    pub(crate) fn coerce_to_slot(
        &mut self,
        init: &crate::frontend::Expr,
        init_ty: &Type,
        declared: &Type,
    ) {
        if init_ty.is_error() || declared.is_error() {
            return;
        }
        if init.is_nil_literal() {
            if self.ctx.can_be_nil(declared) {
                self.data.set_type(init.id, declared.clone());
            } else {
                self.emit(
                    SemanticError::NonPointerNil {
                        ty: self.display_type(declared),
                        span: init.span.into(),
                    },
                    init.span,
                );
            }
            return;
        }
        if init.is_int_literal() && self.ctx.canonical_type(declared).is_integer() {
            self.data.set_type(init.id, declared.clone());
            return;
        }
        if self.ctx.can_coerce(init_ty, declared) {
            self.data.set_type(init.id, declared.clone());
        } else {
            self.emit(
                SemanticError::CannotCoerce {
                    from: self.display_type(init_ty),
                    to: self.display_type(declared),
                    span: init.span.into(),
                },
                init.span,
            );
        }
    }

    /// Is the (canonicalized) type a nominal aggregate with reference
    /// semantics?
    pub(crate) fn is_indirect_aggregate(&self, ty: &Type) -> bool {
        self.ctx
            .decl_for(ty, true)
            .map(|id| self.ctx.type_decl(id).indirect)
            .unwrap_or(false)
    }
}
