//! SeedFlow Cloud Provisioning
//!
//! This crate drives the organization bootstrap against a control plane:
//! projects, billing, the shared state bucket, deployer service accounts,
//! workload identity federation, the container registry and the
//! per-environment grants.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   SeedFlow CLI                   │
//! │               (seed plan / seed up)              │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                 seedflow-cloud                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  Sequencer (phases, waits, idempotency)  │   │
//! │  │  trait ControlPlane { ... }              │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │  Wait/Probe  │  │  Run State   │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼───────┐
//! │  gcloud CLI   │
//! │ control plane │
//! └───────────────┘
//! ```

pub mod action;
pub mod error;
pub mod provider;
pub mod sequencer;
pub mod state;
pub mod wait;

// Re-exports
pub use action::{Action, ActionOutcome, ActionResult, ActionType, ApplyResult, ApplySummary};
pub use error::{CloudError, Result};
pub use provider::{
    AuthStatus, BucketSpec, ControlPlane, OidcProviderSpec, Probe, RegistrySpec, RetryConfig,
};
pub use sequencer::{
    BootstrapOutcome, NoopObserver, Phase, SequenceOptions, Sequencer, StepObserver,
};
pub use state::{RunState, StateLock, StateManager};
pub use wait::{WaitOutcome, WaitStrategy};
