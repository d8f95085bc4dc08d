//! Editor commands backed by the assistance facade.
//!
//! The three commands the plugin contributes: generate a component from a
//! description, optimize a source snippet, and generate a quantum workflow.
//! Each runs as a Command capability request; the artifact comes back from
//! the oracle, or `None` when the oracle has nothing to offer.

use crate::assist::{AssistError, AssistanceFacade};
use crate::context::ContextSnapshot;
use crate::registry::{
    CapabilityHandler, CapabilityRequest, CapabilityResponse, CapabilityKind, DispatchError,
    DocumentRef, GeneratedArtifact,
};
use async_trait::async_trait;
use std::sync::Arc;

pub const CMD_GENERATE_COMPONENT: &str = "quantum-pwa.generateComponent";
pub const CMD_OPTIMIZE_CODE: &str = "quantum-pwa.optimizeCode";
pub const CMD_GENERATE_WORKFLOW: &str = "quantum-pwa.generateWorkflow";

/// All contributed command identifiers, in contribution order.
pub fn all_commands() -> &'static [&'static str] {
    &[
        CMD_GENERATE_COMPONENT,
        CMD_OPTIMIZE_CODE,
        CMD_GENERATE_WORKFLOW,
    ]
}

/// Command entry points, one method per contributed command.
pub struct Commands {
    facade: Arc<AssistanceFacade>,
}

impl Commands {
    pub fn new(facade: Arc<AssistanceFacade>) -> Self {
        Self { facade }
    }

    /// Generate a component from a natural-language description.
    pub async fn generate_component(
        &self,
        description: &str,
        context: ContextSnapshot,
    ) -> Result<Option<GeneratedArtifact>, AssistError> {
        self.run(CMD_GENERATE_COMPONENT, description, context).await
    }

    /// Ask the oracle for an optimized version of a source snippet.
    pub async fn optimize_code(
        &self,
        source: &str,
        context: ContextSnapshot,
    ) -> Result<Option<GeneratedArtifact>, AssistError> {
        self.run(CMD_OPTIMIZE_CODE, source, context).await
    }

    /// Generate a quantum workflow definition from a description.
    pub async fn generate_workflow(
        &self,
        description: &str,
        context: ContextSnapshot,
    ) -> Result<Option<GeneratedArtifact>, AssistError> {
        self.run(CMD_GENERATE_WORKFLOW, description, context).await
    }

    async fn run(
        &self,
        command: &str,
        payload: &str,
        context: ContextSnapshot,
    ) -> Result<Option<GeneratedArtifact>, AssistError> {
        tracing::info!(%command, "running command");
        let document = DocumentRef::new(command, payload);
        let response = self
            .facade
            .query(CapabilityKind::Command, document, None, context)
            .await?;
        match response {
            CapabilityResponse::Command(artifact) => Ok(artifact),
            // The facade normalizes per kind, so this arm is unreachable in
            // practice; treat it as an empty result rather than panicking.
            _ => Ok(None),
        }
    }
}

/// Command capability provider.
///
/// Routes a Command request by its document id, which carries the command
/// identifier. Unknown commands answer with an empty result.
pub struct CommandProvider {
    commands: Commands,
}

impl CommandProvider {
    pub fn new(facade: Arc<AssistanceFacade>) -> Self {
        Self {
            commands: Commands::new(facade),
        }
    }
}

#[async_trait]
impl CapabilityHandler for CommandProvider {
    async fn handle(
        &self,
        request: &CapabilityRequest,
    ) -> Result<CapabilityResponse, DispatchError> {
        let payload = request.document.excerpt.as_str();
        // The request's context snapshot travels with the command into the
        // oracle query.
        let snapshot = request.context.clone();
        let result = match request.document.id.as_str() {
            CMD_GENERATE_COMPONENT => {
                self.commands.generate_component(payload, snapshot).await
            }
            CMD_OPTIMIZE_CODE => self.commands.optimize_code(payload, snapshot).await,
            CMD_GENERATE_WORKFLOW => self.commands.generate_workflow(payload, snapshot).await,
            unknown => {
                tracing::debug!(command = %unknown, "unknown command, returning empty result");
                return Ok(CapabilityResponse::Command(None));
            }
        };
        match result {
            Ok(artifact) => Ok(CapabilityResponse::Command(artifact)),
            Err(AssistError::Unavailable(reason)) => Err(DispatchError::Unavailable(reason)),
        }
    }
}
