//! Validation backend API contract
//!
//! Request/response types for the three backend endpoints the portal
//! consumes. The exact schema is an external contract; these types mirror
//! the fields the portal actually reads.

pub mod types;

pub use types::{
    FileMetrics, InstanceMap, ModelInstance, ModelSummary, OutcomeRecord, OutcomesResponse,
    ProgressResponse, Token, TOKEN_LEN,
};
