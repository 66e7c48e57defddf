//! Core domain model and contracts for the membench harness.

pub mod domain;
pub mod error;
pub mod hash;
pub mod keys;
pub mod registry;
pub mod relevance;
pub mod sealed;
pub mod telemetry;
pub mod text;
pub mod traits;

pub use domain::*;
pub use error::{CoreError, Result};
pub use registry::{Registry, RegistryError};
pub use sealed::{validate_sealed_semantics, SealedSemanticsError};
pub use telemetry::{Telemetry, Timer};
pub use traits::*;
