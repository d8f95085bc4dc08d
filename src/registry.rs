//! Capability provider registry.
//!
//! Stores provider registrations keyed by (capability kind, scope selector)
//! and routes inbound assistance requests to the first matching handler.
//! The registration list is copy-on-write: `register`/`unregister` build a
//! new list and publish it atomically, so in-flight `dispatch` calls never
//! observe a torn read.

use crate::context::ContextSnapshot;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Semantic token legend used for the custom document type.
pub const SEMANTIC_TOKEN_LEGEND: [&str; 3] = ["quantum", "pwa", "component"];

/// The category of assistance a provider can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityKind {
    Completion,
    CodeAction,
    Hover,
    CodeLens,
    SemanticTokens,
    Command,
}

impl CapabilityKind {
    pub fn all() -> &'static [CapabilityKind] {
        &[
            Self::Completion,
            Self::CodeAction,
            Self::Hover,
            Self::CodeLens,
            Self::SemanticTokens,
            Self::Command,
        ]
    }
}

/// A document's declared scheme and optional language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentScope {
    pub scheme: String,
    pub language: Option<String>,
}

impl DocumentScope {
    pub fn scheme(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            language: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Match rule selecting which documents a provider applies to.
///
/// `None` components match anything.
#[derive(Debug, Clone, Default)]
pub struct ScopeSelector {
    scheme: Option<String>,
    language: Option<String>,
}

impl ScopeSelector {
    /// Match documents with the given scheme, any language.
    pub fn scheme(scheme: impl Into<String>) -> Self {
        Self {
            scheme: Some(scheme.into()),
            language: None,
        }
    }

    /// Match any document.
    pub fn any() -> Self {
        Self::default()
    }

    /// Additionally require a language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn matches(&self, scope: &DocumentScope) -> bool {
        if let Some(scheme) = &self.scheme {
            if scheme != &scope.scheme {
                return false;
            }
        }
        if let Some(language) = &self.language {
            if scope.language.as_deref() != Some(language.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Identity plus excerpt of the document a request refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub id: String,
    pub excerpt: String,
}

impl DocumentRef {
    pub fn new(id: impl Into<String>, excerpt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            excerpt: excerpt.into(),
        }
    }
}

/// 1-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// Source range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// An inbound assistance request raised by the host.
#[derive(Debug, Clone)]
pub struct CapabilityRequest {
    pub kind: CapabilityKind,
    pub scope: DocumentScope,
    pub document: DocumentRef,
    /// Cursor position; `None` for Command requests.
    pub position: Option<Position>,
    /// Selection range, when the host supplies one.
    pub range: Option<Range>,
    /// Snapshot of the session context at request time.
    pub context: ContextSnapshot,
}

/// Candidate insertion returned for Completion requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionItem {
    pub label: String,
    pub insert_text: String,
    pub detail: Option<String>,
    pub sort_priority: u32,
}

/// Rendered content block returned for Hover requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoverContent {
    /// Markdown-formatted content
    pub contents: String,
    pub range: Option<Range>,
}

/// Actionable edit returned for CodeAction requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeAction {
    pub title: String,
    pub edit: String,
}

/// Actionable annotation returned for CodeLens requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeLens {
    pub title: String,
    pub command: String,
    pub range: Option<Range>,
}

/// Encoded semantic tokens plus their legend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SemanticTokenSet {
    pub legend: Vec<String>,
    pub data: Vec<u32>,
}

impl SemanticTokenSet {
    pub fn empty() -> Self {
        Self {
            legend: SEMANTIC_TOKEN_LEGEND.iter().map(|s| s.to_string()).collect(),
            data: Vec::new(),
        }
    }
}

/// Artifact produced by a Command request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedArtifact {
    pub name: String,
    pub contents: String,
    pub explanation: String,
}

/// Per-kind response shape, so a host can treat all kinds uniformly.
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityResponse {
    Completions(Vec<CompletionItem>),
    Hover(Option<HoverContent>),
    CodeActions(Vec<CodeAction>),
    CodeLenses(Vec<CodeLens>),
    SemanticTokens(SemanticTokenSet),
    Command(Option<GeneratedArtifact>),
}

impl CapabilityResponse {
    /// The kind-appropriate empty response ("no provider" is not an error).
    pub fn empty(kind: CapabilityKind) -> Self {
        match kind {
            CapabilityKind::Completion => Self::Completions(Vec::new()),
            CapabilityKind::CodeAction => Self::CodeActions(Vec::new()),
            CapabilityKind::Hover => Self::Hover(None),
            CapabilityKind::CodeLens => Self::CodeLenses(Vec::new()),
            CapabilityKind::SemanticTokens => Self::SemanticTokens(SemanticTokenSet::empty()),
            CapabilityKind::Command => Self::Command(None),
        }
    }

    pub fn kind(&self) -> CapabilityKind {
        match self {
            Self::Completions(_) => CapabilityKind::Completion,
            Self::CodeActions(_) => CapabilityKind::CodeAction,
            Self::Hover(_) => CapabilityKind::Hover,
            Self::CodeLenses(_) => CapabilityKind::CodeLens,
            Self::SemanticTokens(_) => CapabilityKind::SemanticTokens,
            Self::Command(_) => CapabilityKind::Command,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Completions(items) => items.is_empty(),
            Self::CodeActions(actions) => actions.is_empty(),
            Self::Hover(content) => content.is_none(),
            Self::CodeLenses(lenses) => lenses.is_empty(),
            Self::SemanticTokens(tokens) => tokens.data.is_empty(),
            Self::Command(artifact) => artifact.is_none(),
        }
    }
}

/// Errors from dispatching a request to a provider.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The assistant oracle behind the provider failed; the host may treat
    /// this as an empty result.
    #[error("assistance unavailable: {0}")]
    Unavailable(String),

    /// A provider answered with the wrong response shape for the request.
    #[error("provider for {expected:?} returned a {got:?} response")]
    ShapeMismatch {
        expected: CapabilityKind,
        got: CapabilityKind,
    },
}

/// Handles one capability kind for matching documents.
///
/// Handlers are expected to be pure functions of (request, context snapshot)
/// plus calls to the assistant oracle; they must not mutate generation state.
#[async_trait]
pub trait CapabilityHandler: Send + Sync {
    async fn handle(&self, request: &CapabilityRequest) -> Result<CapabilityResponse, DispatchError>;
}

/// A provider registration: kind, scope selector, handler.
#[derive(Clone)]
pub struct ProviderRegistration {
    pub kind: CapabilityKind,
    pub selector: ScopeSelector,
    pub handler: Arc<dyn CapabilityHandler>,
}

impl ProviderRegistration {
    pub fn new(
        kind: CapabilityKind,
        selector: ScopeSelector,
        handler: Arc<dyn CapabilityHandler>,
    ) -> Self {
        Self {
            kind,
            selector,
            handler,
        }
    }
}

/// Handle returned by `register`, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationHandle(u64);

#[derive(Clone)]
struct Entry {
    id: u64,
    registration: ProviderRegistration,
}

/// Registry of capability providers.
#[derive(Default)]
pub struct CapabilityRegistry {
    entries: RwLock<Arc<Vec<Entry>>>,
    next_id: AtomicU64,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider. Registrations are resolved in registration order.
    pub fn register(&self, registration: ProviderRegistration) -> RegistrationHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.entries.write().unwrap();
        let mut next: Vec<Entry> = guard.as_ref().clone();
        next.push(Entry { id, registration });
        *guard = Arc::new(next);
        RegistrationHandle(id)
    }

    /// Remove a registration. Returns false if the handle is unknown.
    pub fn unregister(&self, handle: RegistrationHandle) -> bool {
        let mut guard = self.entries.write().unwrap();
        if !guard.iter().any(|e| e.id == handle.0) {
            return false;
        }
        let next: Vec<Entry> = guard
            .iter()
            .filter(|e| e.id != handle.0)
            .cloned()
            .collect();
        *guard = Arc::new(next);
        true
    }

    /// Resolve the first registration matching (kind, scope), if any.
    ///
    /// Later registrations for the same (kind, scope) are ignored;
    /// registrations are never merged.
    pub fn resolve(
        &self,
        kind: CapabilityKind,
        scope: &DocumentScope,
    ) -> Option<ProviderRegistration> {
        let entries = self.published();
        entries
            .iter()
            .find(|e| e.registration.kind == kind && e.registration.selector.matches(scope))
            .map(|e| e.registration.clone())
    }

    /// Resolve and invoke the matching handler.
    ///
    /// No matching provider yields the kind-appropriate empty response, not
    /// an error; a host must treat it as a normal, silent no-op. Dispatch
    /// never mutates session state and each call is isolated per request.
    pub async fn dispatch(
        &self,
        request: &CapabilityRequest,
    ) -> Result<CapabilityResponse, DispatchError> {
        let registration = match self.resolve(request.kind, &request.scope) {
            Some(registration) => registration,
            None => {
                tracing::debug!(
                    kind = ?request.kind,
                    scheme = %request.scope.scheme,
                    "no provider matched, returning empty response"
                );
                return Ok(CapabilityResponse::empty(request.kind));
            }
        };

        let response = registration.handler.handle(request).await?;
        if response.kind() != request.kind {
            return Err(DispatchError::ShapeMismatch {
                expected: request.kind,
                got: response.kind(),
            });
        }
        Ok(response)
    }

    /// Number of registrations for a kind.
    pub fn count(&self, kind: CapabilityKind) -> usize {
        self.published()
            .iter()
            .filter(|e| e.registration.kind == kind)
            .count()
    }

    /// Total number of registrations.
    pub fn len(&self) -> usize {
        self.published().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Dispatch holds this Arc, not the lock, while invoking handlers.
    fn published(&self) -> Arc<Vec<Entry>> {
        self.entries.read().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SessionContext;

    struct StaticHandler {
        response: CapabilityResponse,
    }

    #[async_trait]
    impl CapabilityHandler for StaticHandler {
        async fn handle(
            &self,
            _request: &CapabilityRequest,
        ) -> Result<CapabilityResponse, DispatchError> {
            Ok(self.response.clone())
        }
    }

    fn hover_registration(selector: ScopeSelector, contents: &str) -> ProviderRegistration {
        ProviderRegistration::new(
            CapabilityKind::Hover,
            selector,
            Arc::new(StaticHandler {
                response: CapabilityResponse::Hover(Some(HoverContent {
                    contents: contents.to_string(),
                    range: None,
                })),
            }),
        )
    }

    fn hover_request(scheme: &str) -> CapabilityRequest {
        CapabilityRequest {
            kind: CapabilityKind::Hover,
            scope: DocumentScope::scheme(scheme),
            document: DocumentRef::new("doc.qpwa", "state counter = 0"),
            position: Some(Position { line: 1, column: 1 }),
            range: None,
            context: SessionContext::new().snapshot(),
        }
    }

    #[test]
    fn test_resolve_first_registered_wins() {
        let registry = CapabilityRegistry::new();
        registry.register(hover_registration(ScopeSelector::scheme("quantum-pwa"), "first"));
        registry.register(hover_registration(ScopeSelector::scheme("quantum-pwa"), "second"));

        let request = hover_request("quantum-pwa");
        let response =
            tokio_test::block_on(registry.dispatch(&request)).unwrap();
        assert_eq!(
            response,
            CapabilityResponse::Hover(Some(HoverContent {
                contents: "first".to_string(),
                range: None,
            }))
        );
    }

    #[test]
    fn test_resolve_unregistered_returns_none() {
        let registry = CapabilityRegistry::new();
        registry.register(hover_registration(ScopeSelector::scheme("quantum-pwa"), "x"));
        assert!(registry
            .resolve(CapabilityKind::Hover, &DocumentScope::scheme("file"))
            .is_none());
        assert!(registry
            .resolve(CapabilityKind::Completion, &DocumentScope::scheme("quantum-pwa"))
            .is_none());
    }

    #[test]
    fn test_dispatch_without_provider_is_empty_not_error() {
        let registry = CapabilityRegistry::new();
        let response =
            tokio_test::block_on(registry.dispatch(&hover_request("quantum-pwa"))).unwrap();
        assert_eq!(response, CapabilityResponse::Hover(None));
        assert!(response.is_empty());
    }

    #[test]
    fn test_dispatch_rejects_wrong_shape() {
        let registry = CapabilityRegistry::new();
        registry.register(ProviderRegistration::new(
            CapabilityKind::Hover,
            ScopeSelector::scheme("quantum-pwa"),
            Arc::new(StaticHandler {
                response: CapabilityResponse::Completions(Vec::new()),
            }),
        ));

        let err = tokio_test::block_on(registry.dispatch(&hover_request("quantum-pwa")))
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::ShapeMismatch {
                expected: CapabilityKind::Hover,
                got: CapabilityKind::Completion,
            }
        ));
    }

    #[test]
    fn test_unregister_removes_entry() {
        let registry = CapabilityRegistry::new();
        let handle =
            registry.register(hover_registration(ScopeSelector::scheme("quantum-pwa"), "x"));
        assert_eq!(registry.count(CapabilityKind::Hover), 1);
        assert!(registry.unregister(handle));
        assert_eq!(registry.count(CapabilityKind::Hover), 0);
        assert!(!registry.unregister(handle));
    }

    #[test]
    fn test_selector_language_match() {
        let selector = ScopeSelector::scheme("quantum-pwa").with_language("qpwa");
        assert!(selector.matches(&DocumentScope::scheme("quantum-pwa").with_language("qpwa")));
        assert!(!selector.matches(&DocumentScope::scheme("quantum-pwa")));
        assert!(ScopeSelector::any().matches(&DocumentScope::scheme("file")));
    }

    #[test]
    fn test_empty_responses_per_kind() {
        for kind in CapabilityKind::all() {
            let response = CapabilityResponse::empty(*kind);
            assert_eq!(response.kind(), *kind);
            assert!(response.is_empty());
        }
    }
}
