// src/sema/mod.rs
pub mod analyzer;
pub mod context;
pub mod expression_data;
pub mod mutability;
pub mod scope;
pub mod types;

pub use analyzer::Analyzer;
pub use context::{
    FieldInfo, FuncId, FuncSig, GlobalId, GlobalInfo, ParamSig, SemanticContext, TypeDeclId,
    TypeInfo,
};
pub use expression_data::{Capture, DeclRef, ExpressionData, ResolvedCallee};
pub use mutability::Mutability;
pub use types::{FloatWidth, FunctionType, IntWidth, Type};
