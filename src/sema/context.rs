// src/sema/context.rs
//! Global symbol table for a translation unit.
//!
//! The context arena-allocates type declarations, function signatures and
//! globals, keyed by interned name. Use-sites refer to declarations by
//! stable IDs into these arenas; the AST keeps ownership of bodies.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::errors::{DiagnosticSink, SemanticError};
use crate::frontend::{
    Decl, FuncDecl, FuncKind, InfixOp, Interner, NodeId, Program, Span, Symbol, TypeRefKind,
    TypeRefNode,
};
use crate::sema::types::{FunctionType, Type};

/// Index of a type declaration in the context arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDeclId(pub u32);

/// Index of a function signature in the context arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(pub u32);

/// Index of a global variable in the context arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalId(pub u32);

/// A field of a nominal type
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub name: Symbol,
    pub ty: Type,
    pub slot: usize,
    pub mutable: bool,
    pub span: Span,
}

/// A registered nominal type: fields, methods (including
/// extension-attached ones), initializers, optional deinitializer.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeInfo {
    pub name: Symbol,
    pub indirect: bool,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<FuncId>,
    pub initializers: Vec<FuncId>,
    pub deinitializer: Option<FuncId>,
    pub conforms: Vec<Symbol>,
    pub span: Span,
}

impl TypeInfo {
    pub fn field_named(&self, name: Symbol) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A function parameter signature. The label is the external argument
/// label a call site must spell out; `None` means positional.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSig {
    pub label: Option<Symbol>,
    pub ty: Type,
}

/// Signature of a function, method, initializer or deinitializer.
/// Methods carry their parent type; the implicit `self` parameter is not
/// part of `params`. Synthetic foreign wrappers have no name and never
/// participate in name-based lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncSig {
    pub name: Option<Symbol>,
    pub kind: FuncKind,
    pub parent: Option<TypeDeclId>,
    pub params: SmallVec<[ParamSig; 4]>,
    pub return_type: Type,
    pub foreign: bool,
    pub implicit: bool,
    pub mutating: bool,
    pub noreturn: bool,
    pub has_varargs: bool,
    pub span: Span,
}

impl FuncSig {
    pub fn function_type(&self) -> FunctionType {
        FunctionType {
            args: self.params.iter().map(|p| p.ty.clone()).collect(),
            return_type: Box::new(self.return_type.clone()),
            has_varargs: self.has_varargs,
        }
    }
}

/// A registered global variable. The type starts from the declared
/// annotation and is refined by the analyzer when inferred.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalInfo {
    pub name: Symbol,
    pub ty: Type,
    pub mutable: bool,
    pub foreign: bool,
    pub node: NodeId,
    pub span: Span,
}

#[derive(Debug, Default, PartialEq)]
pub struct SemanticContext {
    types: Vec<TypeInfo>,
    funcs: Vec<FuncSig>,
    globals: Vec<GlobalInfo>,
    type_by_name: FxHashMap<Symbol, TypeDeclId>,
    functions_by_name: FxHashMap<Symbol, Vec<FuncId>>,
    global_by_name: FxHashMap<Symbol, GlobalId>,
    aliases: FxHashMap<Symbol, Type>,
    /// AST declaration node -> registered signature
    func_by_node: FxHashMap<NodeId, FuncId>,
}

impl SemanticContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from the translation unit's top-level declarations.
    ///
    /// Registration order: type names and aliases first, then type
    /// members, then extensions attach their methods, then the per-type
    /// checks (duplicate fields, duplicate mangled methods, circularity),
    /// then free functions and globals.
    pub fn from_program(
        program: &Program,
        interner: &Interner,
        sink: &mut DiagnosticSink,
    ) -> Self {
        let mut ctx = Self::new();
        ctx.register_top_level(program, interner, sink);
        ctx
    }

    fn register_top_level(
        &mut self,
        program: &Program,
        interner: &Interner,
        sink: &mut DiagnosticSink,
    ) {
        // Type names first, so aliases and member types can refer to any
        // declaration regardless of source order.
        for decl in &program.declarations {
            if let Decl::Type(td) = decl {
                let id = TypeDeclId(self.types.len() as u32);
                self.types.push(TypeInfo {
                    name: td.name,
                    indirect: td.indirect,
                    fields: Vec::new(),
                    methods: Vec::new(),
                    initializers: Vec::new(),
                    deinitializer: None,
                    conforms: td.conforms.clone(),
                    span: td.span,
                });
                self.type_by_name.insert(td.name, id);
            }
        }

        for decl in &program.declarations {
            if let Decl::Alias(alias) = decl {
                let target = self.resolve_type_ref(&alias.target);
                self.aliases.insert(alias.name, target);
            }
        }

        // Cyclic alias chains would make canonicalization loop; break
        // them here so every later pass can canonicalize freely.
        let mut cyclic = Vec::new();
        for decl in &program.declarations {
            if let Decl::Alias(alias) = decl {
                let mut visiting = FxHashSet::default();
                if self.alias_cycles(alias.name, &mut visiting) {
                    cyclic.push((alias.name, alias.span));
                }
            }
        }
        for (name, span) in cyclic {
            self.aliases.insert(name, Type::Error);
            sink.emit(
                SemanticError::UnknownType {
                    name: interner.resolve(name).to_string(),
                    span: span.into(),
                },
                span,
            );
        }

        // Fill in members now that every nominal name resolves
        for decl in &program.declarations {
            if let Decl::Type(td) = decl {
                let id = self.type_by_name[&td.name];
                for (slot, field) in td.fields.iter().enumerate() {
                    let ty = field
                        .ty
                        .as_ref()
                        .map(|t| self.resolve_type_ref(t))
                        .unwrap_or(Type::Error);
                    self.types[id.0 as usize].fields.push(FieldInfo {
                        name: field.name,
                        ty,
                        slot,
                        mutable: field.mutable,
                        span: field.span,
                    });
                }
                for method in &td.methods {
                    let fid = self.register_func(method, Some(id));
                    self.types[id.0 as usize].methods.push(fid);
                }
                for init in &td.initializers {
                    let fid = self.register_func(init, Some(id));
                    self.types[id.0 as usize].initializers.push(fid);
                }
                if let Some(deinit) = &td.deinitializer {
                    let fid = self.register_func(deinit, Some(id));
                    self.types[id.0 as usize].deinitializer = Some(fid);
                }
            }
        }

        // Extensions attach before the per-type checks so their methods
        // participate in duplicate detection.
        for decl in &program.declarations {
            if let Decl::Extension(ext) = decl {
                let Some(&id) = self.type_by_name.get(&ext.target) else {
                    sink.emit(
                        SemanticError::UnknownType {
                            name: interner.resolve(ext.target).to_string(),
                            span: ext.span.into(),
                        },
                        ext.span,
                    );
                    continue;
                };
                for method in &ext.methods {
                    let fid = self.register_func(method, Some(id));
                    self.types[id.0 as usize].methods.push(fid);
                }
            }
        }

        for decl in &program.declarations {
            if let Decl::Type(td) = decl {
                let id = self.type_by_name[&td.name];
                self.check_duplicate_fields(id, interner, sink);
                self.check_duplicate_methods(id, interner, sink);
                if self.is_circular_type(id) {
                    let info = self.type_decl(id);
                    sink.emit(
                        SemanticError::ReferenceSelfInProp {
                            ty: interner.resolve(info.name).to_string(),
                            span: info.span.into(),
                        },
                        info.span,
                    );
                }
            }
        }

        for decl in &program.declarations {
            match decl {
                Decl::Function(func) => {
                    let fid = self.register_func(func, None);
                    self.functions_by_name.entry(func.name).or_default().push(fid);
                }
                Decl::Var(var) => {
                    let ty = var
                        .ty
                        .as_ref()
                        .map(|t| self.resolve_type_ref(t))
                        .unwrap_or(Type::Error);
                    let gid = GlobalId(self.globals.len() as u32);
                    self.globals.push(GlobalInfo {
                        name: var.name,
                        ty,
                        mutable: var.mutable,
                        foreign: var.foreign,
                        node: var.id,
                        span: var.span,
                    });
                    self.global_by_name.insert(var.name, gid);
                }
                _ => {}
            }
        }
    }

    fn register_func(&mut self, decl: &FuncDecl, parent: Option<TypeDeclId>) -> FuncId {
        let params = decl
            .params
            .iter()
            .map(|p| ParamSig {
                label: p.label,
                ty: self.resolve_type_ref(&p.ty),
            })
            .collect();
        let return_type = match decl.kind {
            // Initializers produce the constructed type
            FuncKind::Initializer => parent
                .map(|id| Type::Custom(self.types[id.0 as usize].name))
                .unwrap_or(Type::Error),
            _ => decl
                .return_type
                .as_ref()
                .map(|t| self.resolve_type_ref(t))
                .unwrap_or(Type::Void),
        };

        let id = FuncId(self.funcs.len() as u32);
        self.funcs.push(FuncSig {
            name: Some(decl.name),
            kind: decl.kind,
            parent,
            params,
            return_type,
            foreign: decl.modifiers.foreign,
            implicit: decl.modifiers.implicit,
            mutating: decl.modifiers.mutating,
            noreturn: decl.modifiers.noreturn,
            has_varargs: decl.has_varargs,
            span: decl.span,
        });
        self.func_by_node.insert(decl.id, id);
        id
    }

    fn check_duplicate_fields(
        &self,
        id: TypeDeclId,
        interner: &Interner,
        sink: &mut DiagnosticSink,
    ) {
        let info = self.type_decl(id);
        let mut seen = FxHashSet::default();
        for field in &info.fields {
            if !seen.insert(field.name) {
                sink.emit(
                    SemanticError::DuplicateField {
                        field: interner.resolve(field.name).to_string(),
                        ty: interner.resolve(info.name).to_string(),
                        span: field.span.into(),
                    },
                    field.span,
                );
            }
        }
    }

    fn check_duplicate_methods(
        &self,
        id: TypeDeclId,
        interner: &Interner,
        sink: &mut DiagnosticSink,
    ) {
        let info = self.type_decl(id);
        let mut seen = FxHashSet::default();
        for &fid in info.methods.iter().chain(info.initializers.iter()) {
            let sig = self.func(fid);
            let mangled = self.mangled_signature(sig, interner);
            if !seen.insert(mangled) {
                let name = sig.name.map(|n| interner.resolve(n)).unwrap_or("");
                sink.emit(
                    SemanticError::DuplicateMethod {
                        name: name.to_string(),
                        ty: interner.resolve(info.name).to_string(),
                        span: sig.span.into(),
                    },
                    sig.span,
                );
            }
        }
    }

    pub fn type_decl(&self, id: TypeDeclId) -> &TypeInfo {
        &self.types[id.0 as usize]
    }

    pub fn func(&self, id: FuncId) -> &FuncSig {
        &self.funcs[id.0 as usize]
    }

    pub fn global(&self, id: GlobalId) -> &GlobalInfo {
        &self.globals[id.0 as usize]
    }

    /// Refine a global's type after inference from its initializer
    pub fn set_global_type(&mut self, id: GlobalId, ty: Type) {
        self.globals[id.0 as usize].ty = ty;
    }

    pub fn type_named(&self, name: Symbol) -> Option<TypeDeclId> {
        self.type_by_name.get(&name).copied()
    }

    /// Nominal lookup for a type, optionally through aliases
    pub fn decl_for(&self, ty: &Type, canonicalized: bool) -> Option<TypeDeclId> {
        let resolved;
        let ty = if canonicalized {
            resolved = self.canonical_type(ty);
            &resolved
        } else {
            ty
        };
        match ty {
            Type::Custom(name) => self.type_named(*name),
            _ => None,
        }
    }

    /// All free functions with the given name, in declaration order
    pub fn functions_named(&self, name: Symbol) -> &[FuncId] {
        self.functions_by_name
            .get(&name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn global_named(&self, name: Symbol) -> Option<GlobalId> {
        self.global_by_name.get(&name).copied()
    }

    pub fn func_for_node(&self, node: NodeId) -> Option<FuncId> {
        self.func_by_node.get(&node).copied()
    }

    pub fn alias_target(&self, name: Symbol) -> Option<&Type> {
        self.aliases.get(&name)
    }

    fn alias_cycles(&self, name: Symbol, visiting: &mut FxHashSet<Symbol>) -> bool {
        if !visiting.insert(name) {
            return true;
        }
        let cyclic = match self.aliases.get(&name) {
            Some(target) => self.mentions_alias_cycle(target, visiting),
            None => false,
        };
        visiting.remove(&name);
        cyclic
    }

    fn mentions_alias_cycle(&self, ty: &Type, visiting: &mut FxHashSet<Symbol>) -> bool {
        match ty {
            Type::Custom(sym) => {
                !self.type_by_name.contains_key(sym) && self.alias_cycles(*sym, visiting)
            }
            Type::Pointer(inner) => self.mentions_alias_cycle(inner, visiting),
            Type::Tuple(elements) => elements
                .iter()
                .any(|t| self.mentions_alias_cycle(t, visiting)),
            Type::Function(ft) => {
                ft.args.iter().any(|t| self.mentions_alias_cycle(t, visiting))
                    || self.mentions_alias_cycle(&ft.return_type, visiting)
            }
            _ => false,
        }
    }

    /// Lower a syntactic type reference. Named references stay nominal;
    /// canonicalization chases aliases later.
    pub fn resolve_type_ref(&self, node: &TypeRefNode) -> Type {
        match &node.kind {
            TypeRefKind::Primitive(p) => Type::from_primitive(*p),
            TypeRefKind::Pointer(inner) => Type::pointer(self.resolve_type_ref(inner)),
            TypeRefKind::Tuple(elements) => {
                Type::Tuple(elements.iter().map(|t| self.resolve_type_ref(t)).collect())
            }
            TypeRefKind::Function { params, ret } => Type::Function(FunctionType {
                args: params.iter().map(|t| self.resolve_type_ref(t)).collect(),
                return_type: Box::new(self.resolve_type_ref(ret)),
                has_varargs: false,
            }),
            TypeRefKind::Named(sym) => Type::Custom(*sym),
        }
    }

    /// Every nominal component of the type resolves to a declaration or
    /// an alias, recursively.
    pub fn is_valid_type(&self, ty: &Type) -> bool {
        match &self.canonical_type(ty) {
            Type::Custom(name) => self.type_by_name.contains_key(name),
            Type::Pointer(inner) => self.is_valid_type(inner),
            Type::Tuple(elements) => elements.iter().all(|t| self.is_valid_type(t)),
            Type::Function(ft) => {
                ft.args.iter().all(|t| self.is_valid_type(t)) && self.is_valid_type(&ft.return_type)
            }
            Type::Error => false,
            _ => true,
        }
    }

    /// Collapse alias chains and recurse into composites. The result
    /// contains no aliases; canonicalization is idempotent.
    pub fn canonical_type(&self, ty: &Type) -> Type {
        match ty {
            Type::Custom(name) => {
                let mut seen = FxHashSet::default();
                let mut current = *name;
                loop {
                    if self.type_by_name.contains_key(&current) || !seen.insert(current) {
                        return Type::Custom(current);
                    }
                    match self.aliases.get(&current) {
                        Some(Type::Custom(next)) => current = *next,
                        Some(other) => return self.canonical_type(other),
                        None => return Type::Custom(current),
                    }
                }
            }
            Type::Pointer(inner) => Type::pointer(self.canonical_type(inner)),
            Type::Tuple(elements) => {
                Type::Tuple(elements.iter().map(|t| self.canonical_type(t)).collect())
            }
            Type::Function(ft) => Type::Function(FunctionType {
                args: ft.args.iter().map(|t| self.canonical_type(t)).collect(),
                return_type: Box::new(self.canonical_type(&ft.return_type)),
                has_varargs: ft.has_varargs,
            }),
            other => other.clone(),
        }
    }

    /// Implicit coercion: identity, integer widening of the same
    /// signedness, integer to float of sufficient width, anything to
    /// `Any` at foreign boundaries. No implicit narrowing, no implicit
    /// pointer conversion.
    pub fn can_coerce(&self, from: &Type, to: &Type) -> bool {
        let from = self.canonical_type(from);
        let to = self.canonical_type(to);
        if from == to || from.is_error() || to.is_error() {
            return true;
        }
        if to == Type::Any {
            return true;
        }
        from.can_widen_to(&to)
    }

    /// Explicit `as` coercion: everything implicit, plus pointer to
    /// pointer (any pointees), numeric conversions in both directions,
    /// and integer/pointer reinterpretation.
    pub fn can_coerce_cast(&self, from: &Type, to: &Type) -> bool {
        if self.can_coerce(from, to) {
            return true;
        }
        let from = self.canonical_type(from);
        let to = self.canonical_type(to);
        if from.is_pointer() && to.is_pointer() {
            return true;
        }
        if from.is_numeric() && to.is_numeric() {
            return true;
        }
        (from.is_pointer() && to.is_integer()) || (from.is_integer() && to.is_pointer())
    }

    /// Only pointers accept nil
    pub fn can_be_nil(&self, ty: &Type) -> bool {
        self.canonical_type(ty).is_pointer()
    }

    /// Builtin operator result type by operator category. `None` means
    /// the operands are invalid for the operator.
    pub fn operator_type(&self, op: InfixOp, operand: &Type) -> Option<Type> {
        let operand = self.canonical_type(operand);
        if operand.is_error() {
            return Some(Type::Error);
        }
        if op.is_arithmetic() {
            return operand.is_numeric().then(|| operand.clone());
        }
        if op.is_comparison() {
            let comparable = operand.is_numeric()
                || operand == Type::Bool
                || operand == Type::Str
                || operand.is_pointer();
            return comparable.then_some(Type::Bool);
        }
        if op.is_logical() {
            return (operand == Type::Bool).then_some(Type::Bool);
        }
        if op.is_bitwise() {
            return operand.is_integer().then(|| operand.clone());
        }
        // Assignment always types as Void; its checks live in the analyzer
        op.is_assignment().then_some(Type::Void)
    }

    /// A non-indirect type that embeds itself through value fields
    /// (directly or through other value types and tuples) is circular.
    /// Indirect hops and pointers break the cycle.
    pub fn is_circular_type(&self, id: TypeDeclId) -> bool {
        if self.type_decl(id).indirect {
            return false;
        }
        let mut visiting = FxHashSet::default();
        self.reaches_by_value(id, id, &mut visiting)
    }

    fn reaches_by_value(
        &self,
        current: TypeDeclId,
        target: TypeDeclId,
        visiting: &mut FxHashSet<TypeDeclId>,
    ) -> bool {
        if !visiting.insert(current) {
            return false;
        }
        for field in &self.type_decl(current).fields {
            let field_ty = self.canonical_type(&field.ty);
            if self.embeds_target(&field_ty, target, visiting) {
                return true;
            }
        }
        false
    }

    fn embeds_target(
        &self,
        ty: &Type,
        target: TypeDeclId,
        visiting: &mut FxHashSet<TypeDeclId>,
    ) -> bool {
        match ty {
            Type::Custom(name) => {
                let Some(id) = self.type_named(*name) else {
                    return false;
                };
                if self.type_decl(id).indirect {
                    return false;
                }
                id == target || self.reaches_by_value(id, target, visiting)
            }
            Type::Tuple(elements) => elements
                .iter()
                .any(|t| self.embeds_target(t, target, visiting)),
            _ => false,
        }
    }

    /// Mangled method signature: name plus parameter types, separated by
    /// `__`. Overloads with different parameter lists mangle differently;
    /// exact duplicates collide.
    pub fn mangled_signature(&self, sig: &FuncSig, interner: &Interner) -> String {
        let mut mangled = sig
            .name
            .map(|n| interner.resolve(n).to_string())
            .unwrap_or_default();
        for param in &sig.params {
            mangled.push_str("__");
            mangled.push_str(&self.mangle_type(&param.ty, interner));
        }
        mangled
    }

    fn mangle_type(&self, ty: &Type, interner: &Interner) -> String {
        match self.canonical_type(ty) {
            Type::Void => "void".to_string(),
            Type::Bool => "bool".to_string(),
            Type::Int { width, signed } => {
                format!("{}{}", if signed { "i" } else { "u" }, width.bits())
            }
            Type::Float { width } => format!("f{}", width.bits()),
            Type::Str => "str".to_string(),
            Type::Any => "any".to_string(),
            Type::Pointer(inner) => format!("p_{}", self.mangle_type(&inner, interner)),
            Type::Tuple(elements) => {
                let parts: Vec<String> = elements
                    .iter()
                    .map(|t| self.mangle_type(t, interner))
                    .collect();
                format!("t{}_{}", elements.len(), parts.join("_"))
            }
            Type::Function(ft) => {
                let parts: Vec<String> =
                    ft.args.iter().map(|t| self.mangle_type(t, interner)).collect();
                format!(
                    "fn_{}__ret_{}",
                    parts.join("_"),
                    self.mangle_type(&ft.return_type, interner)
                )
            }
            Type::Custom(name) => interner.resolve(name).to_string(),
            Type::Error => "err".to_string(),
        }
    }

    /// Human-readable signature for overload candidate notes
    pub fn display_sig(&self, sig: &FuncSig, interner: &Interner) -> String {
        let params: Vec<String> = sig
            .params
            .iter()
            .map(|p| match p.label {
                Some(label) => format!(
                    "{}: {}",
                    interner.resolve(label),
                    p.ty.display(interner)
                ),
                None => p.ty.display(interner),
            })
            .collect();
        format!(
            "{}({}) -> {}",
            sig.name.map(|n| interner.resolve(n)).unwrap_or(""),
            params.join(", "),
            sig.return_type.display(interner)
        )
    }

    /// Pretty name of a function for `#function`
    pub fn pretty_name(&self, id: FuncId, interner: &Interner) -> String {
        let sig = self.func(id);
        let name = sig.name.map(|n| interner.resolve(n)).unwrap_or("");
        match sig.parent {
            Some(parent) => format!(
                "{}.{}",
                interner.resolve(self.type_decl(parent).name),
                name
            ),
            None => name.to_string(),
        }
    }
}
