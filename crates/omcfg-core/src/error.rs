//! Error types for object-model operations.

use std::fmt;

/// The external service that failed while a build was in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collaborator {
    PackageLoader,
    CapsuleLoader,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collaborator::PackageLoader => write!(f, "package loader"),
            Collaborator::CapsuleLoader => write!(f, "capsule loader"),
        }
    }
}

/// Errors raised while binding, typing or instantiating the object model.
///
/// Every variant names the dotted path it concerns. None of them are
/// recoverable: the first one aborts the build.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The path is already bound; the registry never rebinds.
    #[error("duplicate binding: '{path}' is already bound")]
    DuplicateBinding { path: String },

    /// A strict lookup found nothing.
    #[error("unresolved reference: '{path}' (looked up from '{context}')")]
    UnresolvedReference { path: String, context: String },

    /// A struct declared the same field twice.
    #[error("duplicate field '{field}' in '{owner}'")]
    DuplicateField { owner: String, field: String },

    /// Mutation of a blessed record or a sealed attribute map.
    #[error("sealed record: cannot write '{field}' on '{owner}'")]
    SealedRecord { owner: String, field: String },

    /// A package or capsule could not be loaded.
    #[error("{collaborator} failed to load '{target}' for '{context}': {detail}")]
    CollaboratorFailure {
        collaborator: Collaborator,
        context: String,
        target: String,
        detail: String,
    },

    /// A value does not conform to its declared prototype.
    #[error("type mismatch for '{owner}.{field}': expected {expected}, found {found}")]
    TypeMismatch {
        owner: String,
        field: String,
        expected: String,
        found: String,
    },

    /// A struct was used before its schema was finalized.
    #[error("prototype '{name}' is not initialized")]
    UninitializedPrototype { name: String },

    /// The binding exists but is not of the expected kind.
    #[error("'{path}' is bound to a {found}, expected a {expected}")]
    WrongKind {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A function was called with an argument count outside its bounds.
    #[error("'{function}' accepts {expected} arguments, got {given}")]
    ArityMismatch {
        function: String,
        expected: String,
        given: usize,
    },

    /// No function of that name in the prototype's function table.
    #[error("'{owner}' has no function '{function}'")]
    UnknownFunction { owner: String, function: String },

    /// A module lifecycle transition that is not strictly forward.
    #[error("module '{module}' cannot move from {from} to {to}")]
    LifecycleViolation {
        module: String,
        from: String,
        to: String,
    },

    /// A descriptor-builder step ran before the step it depends on.
    #[error("module '{module}': '{step}' called out of order")]
    OutOfOrder { module: String, step: &'static str },

    /// An initialization or query hook reported a failure.
    #[error("hook '{hook}' of '{module}' failed: {detail}")]
    Hook {
        module: String,
        hook: String,
        detail: String,
    },
}

/// Result type for object-model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
