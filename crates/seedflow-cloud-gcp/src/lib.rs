//! Google Cloud control plane for SeedFlow
//!
//! This crate implements the ControlPlane trait for Google Cloud,
//! enabling SeedFlow to bootstrap an organization through the gcloud CLI.
//!
//! # Features
//!
//! - Project creation, billing and API enablement
//! - State bucket, service accounts and IAM bindings
//! - Workload Identity Federation for GitHub Actions
//! - Artifact Registry and organization policy
//! - Dry-run mode that records every mutating command
//!
//! # Requirements
//!
//! - `gcloud` CLI must be installed and logged in
//! - The active account needs organization-level admin rights
//!
//! # Example
//!
//! ```ignore
//! use seedflow_cloud::{ControlPlane, NoopObserver, Sequencer};
//! use seedflow_cloud_gcp::GcpControlPlane;
//!
//! let plane = GcpControlPlane::new();
//!
//! // Check authentication
//! let auth = plane.check_auth().await?;
//! if !auth.authenticated {
//!     panic!("Not authenticated: {:?}", auth.error);
//! }
//!
//! let outcome = Sequencer::new(&config, &plane)
//!     .run(&mut NoopObserver)
//!     .await
//!     .into_result()?;
//! println!("{}", outcome.report);
//! ```

pub mod error;
pub mod gcloud;
pub mod provider;

pub use error::{GcpError, Result};
pub use gcloud::{Gcloud, render_command};
pub use provider::GcpControlPlane;
