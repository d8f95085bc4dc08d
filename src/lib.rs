//! Quantum PWA project scaffolding and editor assistance
//!
//! A thin editor-plugin core for building Quantum PWA web apps. Two pieces
//! do the work:
//!
//! - **Pipeline**: a step orchestrator that scaffolds a project — manifest,
//!   service worker, starter files, `.qpwa` file-type configuration — with
//!   ordered steps, a concurrent fan-out group for the base files, and
//!   abort-on-first-failure semantics.
//! - **Registry**: a capability provider registry that resolves and
//!   dispatches scoped assistance requests (completion, code actions, hover,
//!   code lenses, semantic tokens, commands) against a versioned session
//!   context.
//!
//! Assistance content comes from an external assistant oracle behind the
//! [`assist::AssistanceFacade`]; when no backend is configured the
//! [`assist::OfflineOracle`] keeps every surface silently empty.
//!
//! # Usage
//!
//! ```no_run
//! use qpwa_studio::assist::{AssistanceFacade, OfflineOracle};
//! use qpwa_studio::config::GenerationConfig;
//! use qpwa_studio::registry::CapabilityRegistry;
//! use qpwa_studio::steps::default_pipeline;
//! use qpwa_studio::writer::FsWriter;
//! use std::sync::Arc;
//!
//! # async fn scaffold() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(GenerationConfig::new("Quantum Notes", "Notes", "./notes"));
//! let writer = Arc::new(FsWriter::new(&config.project_root));
//! let registry = Arc::new(CapabilityRegistry::new());
//! let facade = Arc::new(AssistanceFacade::new(
//!     Arc::new(OfflineOracle),
//!     config.oracle.clone(),
//! ));
//!
//! let pipeline = default_pipeline(Arc::clone(&config), writer, registry, facade);
//! let report = pipeline.run(&config).await?;
//! println!("executed: {:?}", report.executed);
//! # Ok(())
//! # }
//! ```

pub mod assist;
pub mod commands;
pub mod config;
pub mod context;
pub mod pipeline;
pub mod registry;
pub mod steps;
pub mod templates;
pub mod writer;

pub use assist::{AssistanceFacade, AssistantOracle, OfflineOracle};
pub use config::{AssistanceOptions, GenerationConfig, Mode, OracleProfile, Theme};
pub use context::{ContextSnapshot, ContextValue, SessionContext};
pub use pipeline::{Pipeline, PipelineError, PipelineReport, Step, StepUnit};
pub use registry::{
    CapabilityKind, CapabilityRegistry, CapabilityRequest, CapabilityResponse,
    ProviderRegistration, ScopeSelector,
};
pub use steps::default_pipeline;
pub use writer::{FsWriter, MemWriter, ProjectWriter};
