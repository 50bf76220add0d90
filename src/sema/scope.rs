// src/sema/scope.rs
//! Lexical scope as a plain stack of binding frames.

use crate::frontend::Symbol;
use crate::sema::expression_data::DeclRef;
use crate::sema::mutability::Mutability;
use crate::sema::types::Type;
use rustc_hash::FxHashMap;

/// A name bound in some lexical frame
#[derive(Debug, Clone)]
pub struct Binding {
    pub ty: Type,
    pub mutable: bool,
    pub decl: DeclRef,
}

impl Binding {
    /// Classify an access through this binding. Constant bindings name
    /// themselves as the culprit for the diagnostic.
    pub fn mutability(&self, name: Symbol) -> Mutability {
        if self.mutable {
            Mutability::Mutable
        } else {
            Mutability::Immutable {
                culprit: Some(name),
            }
        }
    }
}

/// Entering a block pushes a frame, exiting pops it on every path;
/// lookups walk the live frames innermost-first. The root frame never
/// pops.
#[derive(Debug)]
pub struct Scope {
    frames: Vec<FxHashMap<Symbol, Binding>>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    pub fn new() -> Self {
        Self {
            frames: vec![FxHashMap::default()],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    pub fn pop(&mut self) {
        debug_assert!(self.frames.len() > 1, "cannot pop the root frame");
        self.frames.pop();
    }

    /// Number of live frames; block checks assert balance on exit
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Bind a name in the innermost frame, shadowing any outer binding
    pub fn define(&mut self, name: Symbol, binding: Binding) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name, binding);
        }
    }

    pub fn get(&self, name: Symbol) -> Option<&Binding> {
        self.frames.iter().rev().find_map(|frame| frame.get(&name))
    }
}
