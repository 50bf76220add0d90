// src/sema/analyzer/mod.rs

mod call;
mod closure;
mod decls;
mod expr;
mod stmt;

use rustc_hash::FxHashSet;

use crate::errors::{Diagnostic, DiagnosticSink, SemanticError};
use crate::frontend::{Decl, FuncKind, Interner, NodeId, Program, Span, Symbol};
use crate::sema::context::{FuncId, SemanticContext, TypeDeclId};
use crate::sema::expression_data::{Capture, ExpressionData};
use crate::sema::scope::Scope;
use crate::sema::types::Type;

/// What `break`/`continue` would leave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BreakTarget {
    Loop,
    Switch,
}

/// The `self` value in scope inside a method, initializer or deinitializer
#[derive(Debug, Clone)]
pub(crate) struct SelfInfo {
    pub ty: Type,
    pub mutable: bool,
}

/// Capture-discovery state for one closure under analysis
#[derive(Debug, Default)]
pub(crate) struct ClosureFrame {
    /// Names bound inside the closure itself (parameters and locals)
    pub locals: FxHashSet<Symbol>,
    /// Captured bindings in first-reference order
    pub captures: Vec<Capture>,
    seen: FxHashSet<Symbol>,
}

impl ClosureFrame {
    pub fn record(&mut self, capture: Capture) {
        if self.seen.insert(capture.name) {
            self.captures.push(capture);
        }
    }
}

/// The semantic analysis pass: resolves names, infers and checks types,
/// fills the node-level side tables, and accumulates diagnostics.
///
/// Single-threaded synchronous tree walk. Scope stacks are pushed on
/// entry to their syntactic construct and popped on every exit path.
pub struct Analyzer<'a> {
    interner: &'a Interner,
    pub(crate) ctx: SemanticContext,
    pub(crate) scope: Scope,
    pub(crate) sink: DiagnosticSink,
    pub(crate) data: ExpressionData,
    /// Innermost named function (closures do not push here)
    pub(crate) current_function: Vec<FuncId>,
    /// Declaration kinds of every entered function scope, closures included
    pub(crate) kind_stack: Vec<FuncKind>,
    /// Expected return type of every entered function scope
    pub(crate) return_types: Vec<Type>,
    pub(crate) break_targets: Vec<BreakTarget>,
    pub(crate) current_type: Vec<TypeDeclId>,
    pub(crate) self_stack: Vec<SelfInfo>,
    pub(crate) closures: Vec<ClosureFrame>,
}

impl<'a> Analyzer<'a> {
    pub fn new(interner: &'a Interner) -> Self {
        Self {
            interner,
            ctx: SemanticContext::new(),
            scope: Scope::new(),
            sink: DiagnosticSink::new(),
            data: ExpressionData::new(),
            current_function: Vec::new(),
            kind_stack: Vec::new(),
            return_types: Vec::new(),
            break_targets: Vec::new(),
            current_type: Vec::new(),
            self_stack: Vec::new(),
            closures: Vec::new(),
        }
    }

    /// Analyze a parsed translation unit. Top-level declarations are
    /// registered first, then every declaration body is walked in source
    /// order. Returns the accumulated diagnostics if any error was
    /// emitted; warnings alone do not fail the pass.
    pub fn analyze(&mut self, program: &Program) -> Result<(), Vec<Diagnostic>> {
        self.ctx = SemanticContext::from_program(program, self.interner, &mut self.sink);

        for decl in &program.declarations {
            match decl {
                Decl::Type(td) => self.check_type_decl(td),
                Decl::Extension(ext) => self.check_extension(ext),
                Decl::Alias(alias) => self.check_alias(alias),
                Decl::Function(func) => self.check_function(func),
                Decl::Var(var) => self.check_global(var),
            }
        }

        if self.sink.has_errors() {
            Err(std::mem::take(&mut self.sink).into_diagnostics())
        } else {
            Ok(())
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.sink.diagnostics()
    }

    pub fn context(&self) -> &SemanticContext {
        &self.ctx
    }

    pub fn data(&self) -> &ExpressionData {
        &self.data
    }

    /// Consume the analyzer, yielding the context, the node-level side
    /// tables, and the diagnostic log.
    pub fn into_results(self) -> (SemanticContext, ExpressionData, Vec<Diagnostic>) {
        (self.ctx, self.data, self.sink.into_diagnostics())
    }

    pub(crate) fn emit(&mut self, error: SemanticError, span: Span) {
        self.sink.emit(error, span);
    }

    pub(crate) fn resolve_str(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    pub(crate) fn display_type(&self, ty: &Type) -> String {
        ty.display(self.interner)
    }

    pub(crate) fn interner(&self) -> &'a Interner {
        self.interner
    }

    /// True inside an initializer body, looking through closures
    pub(crate) fn in_initializer(&self) -> bool {
        self.kind_stack
            .iter()
            .rev()
            .find(|k| **k != FuncKind::Closure)
            == Some(&FuncKind::Initializer)
    }

    /// Record the resolved type for an expression node
    pub(crate) fn record_type(&mut self, node: NodeId, ty: &Type) {
        self.data.set_type(node, ty.clone());
    }
}
