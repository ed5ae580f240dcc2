//! `calcert-recon`: certificate-vs-registry reconciliation.
//!
//! Pure engine crate: receives parsed certificate data and a registry
//! gateway, returns issues with optional remediation commands. Applying a
//! remediation is the caller's decision ([`resolve`]).

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod issue;
pub mod resolve;
pub mod rules;

pub use config::{InstallationRule, ReconConfig};
pub use context::ValidationContext;
pub use engine::run;
pub use error::{GatewayError, ReconError};
pub use gateway::{MemoryRegistry, RegistryGateway};
pub use issue::{IssueKey, Remediation, ValidationIssue};
pub use resolve::{compare, resolve, AcceptAll, ComparisonLine, IssueHandler, Resolution};
