#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod engine;
pub mod error;
mod generator;
pub mod router;
mod snapshot;
mod view;

pub use engine::AccessMatrix;
pub use error::MatrixError;
pub use generator::{ConfigGenerator, ConnectionConfig, ServerDescriptor};
pub use router::{MatrixErrorResponse, matrix_router};
pub use snapshot::MatrixSnapshot;

/// Shared state of the matrix routes
pub struct MatrixState {
    pub matrix: AccessMatrix,
    pub generator: ConfigGenerator,
}

impl MatrixState {
    pub const fn new(matrix: AccessMatrix, generator: ConfigGenerator) -> Self {
        Self { matrix, generator }
    }
}
