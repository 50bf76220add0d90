// src/sema/expression_data.rs
//! Node-level metadata produced by semantic analysis.
//!
//! The analyzer is the sole writer of these tables; code generation
//! reads them. Everything is keyed by `NodeId`, so the AST itself stays
//! immutable after parsing.

use rustc_hash::FxHashMap;

use crate::frontend::{NodeId, Symbol};
use crate::sema::context::{FuncId, FuncSig, GlobalId, TypeDeclId};
use crate::sema::types::Type;

/// Stable reference from a use-site into the semantic context (or to a
/// local declaration node). Weak by construction: the context arenas and
/// the AST own the declarations.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclRef {
    Function(FuncId),
    Global(GlobalId),
    /// A local `VarDecl`, by its AST node id
    Local(NodeId),
    Param { func: FuncId, index: usize },
    ClosureParam { closure: NodeId, index: usize },
    SelfParam,
    Field { owner: TypeDeclId, slot: usize },
}

/// How a call expression was resolved
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedCallee {
    /// A declaration registered in the semantic context
    Decl(FuncId),
    /// A synthetic foreign wrapper around an anonymous callable
    /// (function-typed variable or field)
    Synthetic(FuncSig),
}

/// A variable captured by a closure
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub name: Symbol,
    pub decl: DeclRef,
    pub is_mutable: bool,
}

/// All NodeId-keyed results of the analysis pass
#[derive(Debug, Default)]
pub struct ExpressionData {
    /// Type of each expression node (`Error` suppresses cascades)
    types: FxHashMap<NodeId, Type>,
    /// Resolved declaration for each use-site
    decls: FxHashMap<NodeId, DeclRef>,
    /// Resolution for each call expression
    callees: FxHashMap<NodeId, ResolvedCallee>,
    /// Whether a block returns on every path
    block_returns: FxHashMap<NodeId, bool>,
    /// Captures of each closure expression
    captures: FxHashMap<NodeId, Vec<Capture>>,
    /// Operand type of each `sizeof` expression
    sizeof_types: FxHashMap<NodeId, Type>,
    /// Value of each `#function` expression
    pretty_names: FxHashMap<NodeId, String>,
}

impl ExpressionData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ty(&self, node: NodeId) -> Option<&Type> {
        self.types.get(&node)
    }

    pub fn set_type(&mut self, node: NodeId, ty: Type) {
        self.types.insert(node, ty);
    }

    pub fn decl(&self, node: NodeId) -> Option<&DeclRef> {
        self.decls.get(&node)
    }

    pub fn set_decl(&mut self, node: NodeId, decl: DeclRef) {
        self.decls.insert(node, decl);
    }

    pub fn callee(&self, node: NodeId) -> Option<&ResolvedCallee> {
        self.callees.get(&node)
    }

    pub fn set_callee(&mut self, node: NodeId, callee: ResolvedCallee) {
        self.callees.insert(node, callee);
    }

    pub fn block_has_return(&self, node: NodeId) -> bool {
        self.block_returns.get(&node).copied().unwrap_or(false)
    }

    pub fn set_block_return(&mut self, node: NodeId, has_return: bool) {
        self.block_returns.insert(node, has_return);
    }

    pub fn captures_of(&self, node: NodeId) -> &[Capture] {
        self.captures.get(&node).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn set_captures(&mut self, node: NodeId, captures: Vec<Capture>) {
        self.captures.insert(node, captures);
    }

    pub fn sizeof_type(&self, node: NodeId) -> Option<&Type> {
        self.sizeof_types.get(&node)
    }

    pub fn set_sizeof_type(&mut self, node: NodeId, ty: Type) {
        self.sizeof_types.insert(node, ty);
    }

    pub fn pretty_name(&self, node: NodeId) -> Option<&str> {
        self.pretty_names.get(&node).map(|s| s.as_str())
    }

    pub fn set_pretty_name(&mut self, node: NodeId, name: String) {
        self.pretty_names.insert(node, name);
    }

    pub fn types(&self) -> &FxHashMap<NodeId, Type> {
        &self.types
    }

    pub fn decls(&self) -> &FxHashMap<NodeId, DeclRef> {
        &self.decls
    }
}
