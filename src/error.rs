//! Error types for the Piglet compiler core.
//!
//! Errors come in two families: hard errors that abort compilation
//! (`PlanError`, `SchemaError`, `BackendError`) and soft errors that only
//! degrade the profile-driven parts (`ProfilingError`, `CacheError`). The
//! compile driver reports hard errors as a single diagnostic and emits no
//! artifact; soft errors are logged and compilation proceeds as if the
//! profiling data were absent.

use serde::{Deserialize, Serialize};

/// Structural errors raised while assembling or editing a dataflow plan.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum PlanError {
    /// Two operators declared the same output pipe name
    #[error("invalid plan: duplicate output pipe '{name}'")]
    DuplicatePipe { name: String },

    /// An operator references an input pipe no other operator produces
    #[error("invalid plan: invalid pipe '{name}'")]
    InvalidPipe { name: String },

    /// The operator graph is not weakly connected
    #[error("invalid plan: the dataflow graph is disconnected")]
    Disconnected,

    /// A nested FOREACH body does not end in GENERATE
    #[error("invalid plan: nested FOREACH must end with a GENERATE statement")]
    MissingGenerate,

    /// FOREACH with an empty generator expression list
    #[error("invalid plan: FOREACH with an empty generator list")]
    EmptyGenerator,

    /// A structural edit was asked to operate on an operator that is not in the plan
    #[error("invalid plan: operator '{what}' is not part of this plan")]
    UnknownOperator { what: String },

    /// A structural edit violated its precondition (e.g. swap of a non-unary operator)
    #[error("invalid plan edit: {message}")]
    InvalidEdit { message: String },

    /// Nested sub-plans beyond the supported depth
    #[error("invalid plan: FOREACH nesting deeper than {max} levels")]
    NestingTooDeep { max: usize },
}

/// Schema construction and conformance errors.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum SchemaError {
    /// A named field reference did not resolve against a known schema
    #[error("unresolved field '{field}' in schema {schema}")]
    UnresolvedField { field: String, schema: String },

    /// A positional reference is out of range
    #[error("positional field ${position} out of range for schema {schema}")]
    PositionOutOfRange { position: usize, schema: String },

    /// Two types that must be compatible are not
    #[error("type mismatch: {left} is not compatible with {right}")]
    TypeMismatch { left: String, right: String },

    /// UNION over inputs whose schemas cannot be reconciled
    #[error("incompatible input schemas for UNION: {left} vs {right}")]
    IncompatibleUnion { left: String, right: String },

    /// JOIN key lists of differing arity
    #[error("JOIN key arity mismatch: {left} keys vs {right} keys")]
    JoinKeyArity { left: usize, right: usize },

    /// Named field used while no input schema is known
    #[error("named field '{field}' used, but the input schema is unknown")]
    NamedFieldWithoutSchema { field: String },

    /// Aggregate of conformance failures over a whole plan
    #[error("schema conformance failed for operator(s): {operators:?}")]
    Conformance { operators: Vec<String> },
}

/// Errors in the materialization cache layer. Never abort compilation.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum CacheError {
    /// Catalogue lists an entry whose backing artifact is gone or unreadable
    #[error("cache entry for lineage {lineage} is unreadable at {uri}")]
    Corrupt { lineage: String, uri: String },

    /// Catalogue file itself could not be read or written
    #[error("cache catalogue I/O failure: {message}")]
    Catalogue { message: String },
}

/// Errors in the profiling subsystem. Never abort compilation.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum ProfilingError {
    /// A collector message did not match the wire grammar
    #[error("malformed profiling message: {payload}")]
    MalformedMessage { payload: String },

    /// collect() found an operator time without its parent's time
    #[error("missing parent timing for lineage {lineage}, partition {partition}")]
    MissingParentTime { lineage: String, partition: i64 },

    /// Reading or writing the persisted Markov model failed
    #[error("profiling store failure: {message}")]
    Store { message: String },
}

/// Backend selection, template lookup and runner failures.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum BackendError {
    /// The requested backend name is not registered
    #[error("unknown backend '{name}'")]
    UnknownBackend { name: String },

    /// No surface-syntax frontend is linked into this build
    #[error("no script frontend linked, cannot parse '{script}'")]
    FrontendMissing { script: String },

    /// No emission template exists for an operator variant on this backend
    #[error("backend '{backend}' has no template for operator {operator}")]
    MissingTemplate { backend: String, operator: String },

    /// The external job runner reported failure
    #[error("backend job failed with status {status}")]
    JobFailed { status: i32 },
}

/// Top-level compiler error.
#[derive(Debug, thiserror::Error)]
pub enum PigletError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Profiling(#[from] ProfilingError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = PigletError> = std::result::Result<T, E>;
