// src/errors/sema.rs
//! Semantic analysis errors (E2xxx).

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum SemanticError {
    #[error("use of unknown function '{name}'")]
    #[diagnostic(code(E2001))]
    UnknownFunction {
        name: String,
        #[label("not found")]
        span: SourceSpan,
    },

    #[error("use of unknown type '{name}'")]
    #[diagnostic(code(E2002))]
    UnknownType {
        name: String,
        #[label("unknown type")]
        span: SourceSpan,
    },

    #[error("cannot call non-function type '{ty}'")]
    #[diagnostic(code(E2003))]
    CallNonFunction {
        ty: String,
        #[label("not a function")]
        span: SourceSpan,
    },

    #[error("unknown field '{field}' in type '{ty}'")]
    #[diagnostic(code(E2004))]
    UnknownField {
        ty: String,
        field: String,
        #[label("no such field")]
        span: SourceSpan,
    },

    #[error("unknown variable '{name}'")]
    #[diagnostic(code(E2005))]
    UnknownVariableName {
        name: String,
        #[label("not found in scope")]
        span: SourceSpan,
    },

    #[error("invalid operands to '{op}': {operands}")]
    #[diagnostic(code(E2006))]
    InvalidOperands {
        op: String,
        operands: String,
        #[label("invalid operands")]
        span: SourceSpan,
    },

    #[error("cannot subscript value of type '{ty}'")]
    #[diagnostic(code(E2007))]
    CannotSubscript {
        ty: String,
        #[label("not subscriptable")]
        span: SourceSpan,
    },

    #[error("cannot coerce '{from}' to '{to}'")]
    #[diagnostic(code(E2008))]
    CannotCoerce {
        from: String,
        to: String,
        #[label("invalid coercion")]
        span: SourceSpan,
    },

    #[error("varargs are only allowed in foreign declarations")]
    #[diagnostic(code(E2009))]
    VarArgsInNonForeignDecl {
        #[label("varargs here")]
        span: SourceSpan,
    },

    #[error("foreign function '{name}' may not have a body")]
    #[diagnostic(code(E2010))]
    ForeignFunctionWithBody {
        name: String,
        #[label("body not allowed")]
        span: SourceSpan,
    },

    #[error("function '{name}' must have a body")]
    #[diagnostic(code(E2011))]
    NonForeignFunctionWithoutBody {
        name: String,
        #[label("missing body")]
        span: SourceSpan,
    },

    #[error("foreign variable '{name}' may not have a value")]
    #[diagnostic(code(E2012))]
    ForeignVarWithRHS {
        name: String,
        #[label("initializer not allowed")]
        span: SourceSpan,
    },

    #[error("cannot dereference value of non-pointer type '{ty}'")]
    #[diagnostic(code(E2013))]
    DereferenceNonPointer {
        ty: String,
        #[label("not a pointer")]
        span: SourceSpan,
    },

    #[error("cannot switch over value of type '{ty}'")]
    #[diagnostic(code(E2014))]
    CannotSwitch {
        ty: String,
        #[label("not switchable")]
        span: SourceSpan,
    },

    #[error("cannot set value of non-pointer type '{ty}' to nil")]
    #[diagnostic(code(E2015))]
    NonPointerNil {
        ty: String,
        #[label("nil requires a pointer type")]
        span: SourceSpan,
    },

    #[error("not all paths in function '{name}' return a value of type '{ty}'")]
    #[diagnostic(code(E2016))]
    NotAllPathsReturn {
        name: String,
        ty: String,
        #[label("missing return")]
        span: SourceSpan,
    },

    #[error("no viable overload of '{name}' for arguments ({args})")]
    #[diagnostic(code(E2017))]
    NoViableOverload {
        name: String,
        args: String,
        #[label("no matching overload")]
        span: SourceSpan,
    },

    #[error("candidates are:\n{list}")]
    #[diagnostic(code(E2018), severity(Advice))]
    Candidates {
        list: String,
        #[label("call site")]
        span: SourceSpan,
    },

    #[error("ambiguous reference to '{name}'")]
    #[diagnostic(code(E2019))]
    AmbiguousReference {
        name: String,
        #[label("multiple candidates")]
        span: SourceSpan,
    },

    #[error("cannot take the address of a temporary value")]
    #[diagnostic(code(E2020))]
    AddressOfRValue {
        #[label("not an l-value")]
        span: SourceSpan,
    },

    #[error("break is not allowed outside of a loop or switch")]
    #[diagnostic(code(E2021))]
    BreakNotAllowed {
        #[label("no enclosing target")]
        span: SourceSpan,
    },

    #[error("continue is not allowed outside of a loop or switch")]
    #[diagnostic(code(E2022))]
    ContinueNotAllowed {
        #[label("no enclosing target")]
        span: SourceSpan,
    },

    #[error("cannot find field '{field}' on function type")]
    #[diagnostic(code(E2023))]
    FieldOfFunctionType {
        field: String,
        #[label("function types have no fields")]
        span: SourceSpan,
    },

    #[error("invalid redeclaration of method '{name}' in type '{ty}'")]
    #[diagnostic(code(E2024))]
    DuplicateMethod {
        name: String,
        ty: String,
        #[label("duplicate method")]
        span: SourceSpan,
    },

    #[error("invalid redeclaration of field '{field}' in type '{ty}'")]
    #[diagnostic(code(E2025))]
    DuplicateField {
        field: String,
        ty: String,
        #[label("duplicate field")]
        span: SourceSpan,
    },

    #[error("type '{ty}' cannot contain itself in a stored property")]
    #[diagnostic(
        code(E2026),
        help("declare the type 'indirect' to give it reference semantics")
    )]
    ReferenceSelfInProp {
        ty: String,
        #[label("recursive value type")]
        span: SourceSpan,
    },

    #[error("#function is only valid inside a function")]
    #[diagnostic(code(E2027))]
    PoundFunctionOutsideFunction {
        #[label("no enclosing function")]
        span: SourceSpan,
    },

    #[error("cannot mutate {}; it is a constant", .name.as_deref().map(|n| format!("'{n}'")).unwrap_or_else(|| "this expression".to_string()))]
    #[diagnostic(code(E2028))]
    AssignToConstant {
        /// The binding responsible for the immutability, when known
        name: Option<String>,
        #[label("cannot mutate")]
        span: SourceSpan,
    },

    #[error("cannot declare a deinitializer on value type '{ty}'")]
    #[diagnostic(
        code(E2029),
        help("only indirect types may declare a deinitializer")
    )]
    DeinitOnStruct {
        ty: String,
        #[label("deinit not allowed")]
        span: SourceSpan,
    },

    #[error("cannot index into value of non-tuple type '{ty}'")]
    #[diagnostic(code(E2030))]
    IndexIntoNonTuple {
        ty: String,
        #[label("not a tuple")]
        span: SourceSpan,
    },

    #[error("cannot access field {field} of tuple with {max} fields")]
    #[diagnostic(code(E2031))]
    OutOfBoundsTupleField {
        field: usize,
        max: usize,
        #[label("out of bounds")]
        span: SourceSpan,
    },

    #[error("code after {after} will not be executed")]
    #[diagnostic(code(W2001), severity(Warning))]
    UnreachableCode {
        after: String,
        #[label("unreachable")]
        span: SourceSpan,
    },
}
