//! Octopus-API: Octopus Deploy REST integration
//!
//! This crate owns everything that talks to the deployment server:
//!
//! - `DeploymentService`: the async seam the release tooling is written against
//! - `OctopusClient`: reqwest-backed implementation over the REST API
//! - `fakes`: an in-memory `DeploymentService` for tests
//!
//! "Not found" is a normal answer (`Ok(None)`), never an error. Errors are
//! reserved for transport failures and non-success HTTP statuses.

pub mod client;
mod error;
pub mod fakes;
pub mod model;
pub mod service;

pub use client::{OctopusClient, ServerConfig};
pub use error::ApiError;
pub use model::{
    CreateReleaseRequest, Deployment, DeploymentRequest, Environment, Project, Release,
    SelectedPackage, Task, TaskState,
};
pub use service::DeploymentService;

/// Result type for deployment server operations
pub type Result<T> = std::result::Result<T, ApiError>;
