use thiserror::Error;

/// Faults raised while the machine runs. Each carries the offending name or
/// type so the embedding application can report it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("cannot find symbol: {0}")]
    UndeclaredName(String),
    #[error("cannot find variable: {0}")]
    UndeclaredVariable(String),
    #[error("cannot find class: {0}")]
    UndeclaredClass(String),
    #[error("cannot find method: {0}")]
    UndeclaredMethod(String),
    #[error("{0} is already defined")]
    Redeclaration(String),
    #[error("cyclic inheritance involving {0}")]
    CyclicInheritance(String),
    #[error("variable {0} might not have been initialized")]
    UnassignedVariable(String),
    #[error("no suitable method found for {0}")]
    OverloadResolution(String),
    #[error("reference to {0} is ambiguous")]
    AmbiguousOverload(String),
    #[error("no suitable constructor found for {0}")]
    ConstructorOverloadResolution(String),
    #[error("null pointer: {0}")]
    NullPointer(String),
    #[error("no class declares public static void main(String[] args)")]
    NoMainMethod,
    #[error("/ by zero")]
    DivisionByZero,
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("no native implementation registered for {0}")]
    NativeNotFound(String),
    #[error("{0} outside of an enclosing construct")]
    MissingMarker(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("internal error: {0}")]
    Internal(String),
}
