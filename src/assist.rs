//! Assistance facade over the external assistant oracle.
//!
//! The oracle is an opaque, possibly slow, possibly failing backend. The
//! facade translates a capability request into an [`OracleQuery`], and
//! normalizes the reply into the registry's per-kind response shape. An
//! empty reply normalizes to an empty response; an oracle failure surfaces
//! as [`AssistError::Unavailable`] — the facade never conflates the two.

use crate::config::OracleProfile;
use crate::context::ContextSnapshot;
use crate::registry::{
    CapabilityHandler, CapabilityKind, CapabilityRequest, CapabilityResponse, CodeAction,
    CodeLens, CompletionItem, DispatchError, DocumentRef, GeneratedArtifact, HoverContent,
    Position, SemanticTokenSet, SEMANTIC_TOKEN_LEGEND,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors from the oracle transport itself.
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("oracle timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed oracle response: {0}")]
    Malformed(String),
    #[error("oracle transport failed: {0}")]
    Transport(String),
}

/// Facade-level error: the oracle call failed.
///
/// Distinct from an empty reply, which is a successful response with no
/// content. A handler may downgrade this to an empty result; that policy
/// belongs to the handler, not the facade.
#[derive(Error, Debug)]
pub enum AssistError {
    #[error("assistant oracle unavailable: {0}")]
    Unavailable(String),
}

impl From<OracleError> for AssistError {
    fn from(err: OracleError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Query sent to the oracle.
#[derive(Debug, Clone)]
pub struct OracleQuery {
    pub kind: CapabilityKind,
    pub document: DocumentRef,
    pub position: Option<Position>,
    pub context: ContextSnapshot,
    pub profile: OracleProfile,
}

/// A raw suggestion from the oracle, before per-kind normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Suggestion {
    pub label: String,
    pub body: String,
    pub detail: Option<String>,
}

/// Raw oracle reply. An empty suggestion list means "the oracle said
/// nothing", which is a normal outcome.
#[derive(Debug, Clone, Default)]
pub struct OracleReply {
    pub suggestions: Vec<Suggestion>,
}

/// The external assistant backend.
#[async_trait]
pub trait AssistantOracle: Send + Sync {
    async fn suggest(&self, query: &OracleQuery) -> Result<OracleReply, OracleError>;
}

/// Oracle that always answers with nothing. Used when no backend is
/// configured (offline CLI runs) and by tests.
pub struct OfflineOracle;

#[async_trait]
impl AssistantOracle for OfflineOracle {
    async fn suggest(&self, _query: &OracleQuery) -> Result<OracleReply, OracleError> {
        Ok(OracleReply::default())
    }
}

/// Thin layer between capability handlers and the oracle.
pub struct AssistanceFacade {
    oracle: Arc<dyn AssistantOracle>,
    profile: OracleProfile,
}

impl AssistanceFacade {
    pub fn new(oracle: Arc<dyn AssistantOracle>, profile: OracleProfile) -> Self {
        Self { oracle, profile }
    }

    /// Query the oracle and normalize its reply for the requested kind.
    pub async fn query(
        &self,
        kind: CapabilityKind,
        document: DocumentRef,
        position: Option<Position>,
        context: ContextSnapshot,
    ) -> Result<CapabilityResponse, AssistError> {
        let query = OracleQuery {
            kind,
            document,
            position,
            context,
            profile: self.profile.clone(),
        };
        let reply = self.oracle.suggest(&query).await.map_err(|err| {
            tracing::warn!(kind = ?kind, error = %err, "oracle call failed");
            AssistError::from(err)
        })?;
        normalize(kind, reply).map_err(|err| {
            tracing::warn!(kind = ?kind, error = %err, "oracle reply failed normalization");
            AssistError::from(err)
        })
    }
}

/// Shape the raw suggestions into the registry's per-kind response contract.
///
/// A reply that cannot be normalized is an oracle failure, not an empty
/// response.
fn normalize(kind: CapabilityKind, reply: OracleReply) -> Result<CapabilityResponse, OracleError> {
    Ok(match kind {
        CapabilityKind::Completion => CapabilityResponse::Completions(
            reply
                .suggestions
                .into_iter()
                .enumerate()
                .map(|(idx, s)| CompletionItem {
                    label: s.label,
                    insert_text: s.body,
                    detail: s.detail,
                    sort_priority: idx as u32,
                })
                .collect(),
        ),
        CapabilityKind::Hover => CapabilityResponse::Hover(
            reply.suggestions.into_iter().next().map(|s| HoverContent {
                contents: s.body,
                range: None,
            }),
        ),
        CapabilityKind::CodeAction => CapabilityResponse::CodeActions(
            reply
                .suggestions
                .into_iter()
                .map(|s| CodeAction {
                    title: s.label,
                    edit: s.body,
                })
                .collect(),
        ),
        CapabilityKind::CodeLens => CapabilityResponse::CodeLenses(
            reply
                .suggestions
                .into_iter()
                .map(|s| CodeLens {
                    title: s.label,
                    command: s.body,
                    range: None,
                })
                .collect(),
        ),
        CapabilityKind::SemanticTokens => {
            // Token data arrives as whitespace-separated integers in the
            // suggestion bodies.
            let data = reply
                .suggestions
                .iter()
                .flat_map(|s| s.body.split_whitespace())
                .map(|word| {
                    word.parse().map_err(|_| {
                        OracleError::Malformed(format!(
                            "semantic token data contains non-integer '{}'",
                            word
                        ))
                    })
                })
                .collect::<Result<Vec<u32>, OracleError>>()?;
            CapabilityResponse::SemanticTokens(SemanticTokenSet {
                legend: SEMANTIC_TOKEN_LEGEND.iter().map(|s| s.to_string()).collect(),
                data,
            })
        }
        CapabilityKind::Command => CapabilityResponse::Command(
            reply.suggestions.into_iter().next().map(|s| GeneratedArtifact {
                name: s.label,
                contents: s.body,
                explanation: s.detail.unwrap_or_default(),
            }),
        ),
    })
}

/// Capability handler backed by the facade.
///
/// With `downgrade_unavailable` set, an oracle failure becomes the empty
/// response for the request's kind — the policy used for the silent
/// assistance surfaces (hover, completion, lenses), where a dead oracle
/// should not surface errors to the editor.
pub struct OracleBackedProvider {
    facade: Arc<AssistanceFacade>,
    downgrade_unavailable: bool,
}

impl OracleBackedProvider {
    pub fn new(facade: Arc<AssistanceFacade>) -> Self {
        Self {
            facade,
            downgrade_unavailable: false,
        }
    }

    /// Turn oracle failures into empty responses instead of errors.
    pub fn with_downgrade(mut self) -> Self {
        self.downgrade_unavailable = true;
        self
    }
}

#[async_trait]
impl CapabilityHandler for OracleBackedProvider {
    async fn handle(
        &self,
        request: &CapabilityRequest,
    ) -> Result<CapabilityResponse, DispatchError> {
        let result = self
            .facade
            .query(
                request.kind,
                request.document.clone(),
                request.position,
                request.context.clone(),
            )
            .await;
        match result {
            Ok(response) => Ok(response),
            Err(AssistError::Unavailable(reason)) if self.downgrade_unavailable => {
                tracing::debug!(kind = ?request.kind, %reason, "downgrading oracle failure to empty response");
                Ok(CapabilityResponse::empty(request.kind))
            }
            Err(AssistError::Unavailable(reason)) => Err(DispatchError::Unavailable(reason)),
        }
    }
}
