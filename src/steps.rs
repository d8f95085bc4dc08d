//! The concrete scaffolding steps and the standard pipeline layout.
//!
//! The standard run is: seed the session context, fan out the five base
//! project files, write the `.qpwa` file-type configuration, record the
//! assistance settings, then register the capability providers. The five
//! base-file steps only read the config and write disjoint paths, so they
//! run as one concurrent group.

use crate::assist::AssistanceFacade;
use crate::commands::CommandProvider;
use crate::config::GenerationConfig;
use crate::context::SessionContext;
use crate::pipeline::{Pipeline, Step, StepError, StepUnit};
use crate::registry::{
    CapabilityKind, CapabilityRegistry, ProviderRegistration, ScopeSelector,
};
use crate::templates::{
    self, FileTypeConfig, Manifest, DOCUMENT_SCHEME,
};
use crate::writer::ProjectWriter;
use async_trait::async_trait;
use std::sync::Arc;

const BASE_FILE_DEPS: [&str; 1] = ["init_context"];

/// Seeds the session context with the run's identity and settings.
pub struct InitContextStep {
    config: Arc<GenerationConfig>,
}

impl InitContextStep {
    pub fn new(config: Arc<GenerationConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Step for InitContextStep {
    fn name(&self) -> &str {
        "init_context"
    }

    async fn run(&self, ctx: &mut SessionContext) -> Result<(), StepError> {
        ctx.set("project_name", self.config.name.as_str())?;
        ctx.set("features", self.config.features.clone())?;
        ctx.set_mode(self.config.assistance.mode)?;
        ctx.set_tracking(true)?;
        Ok(())
    }
}

/// Writes `manifest.json`.
pub struct WriteManifestStep {
    config: Arc<GenerationConfig>,
    writer: Arc<dyn ProjectWriter>,
}

impl WriteManifestStep {
    pub fn new(config: Arc<GenerationConfig>, writer: Arc<dyn ProjectWriter>) -> Self {
        Self { config, writer }
    }
}

#[async_trait]
impl Step for WriteManifestStep {
    fn name(&self) -> &str {
        "manifest"
    }

    fn depends_on(&self) -> &[&str] {
        &BASE_FILE_DEPS
    }

    async fn run(&self, ctx: &mut SessionContext) -> Result<(), StepError> {
        let manifest = Manifest::from_config(&self.config);
        let json = manifest.to_json()?;
        self.writer.write("manifest.json", json.as_bytes())?;
        ctx.set("manifest", "manifest.json")?;
        Ok(())
    }
}

/// Writes the service-worker bootstrap script.
pub struct WriteServiceWorkerStep {
    config: Arc<GenerationConfig>,
    writer: Arc<dyn ProjectWriter>,
}

impl WriteServiceWorkerStep {
    pub fn new(config: Arc<GenerationConfig>, writer: Arc<dyn ProjectWriter>) -> Self {
        Self { config, writer }
    }
}

#[async_trait]
impl Step for WriteServiceWorkerStep {
    fn name(&self) -> &str {
        "service_worker"
    }

    fn depends_on(&self) -> &[&str] {
        &BASE_FILE_DEPS
    }

    async fn run(&self, ctx: &mut SessionContext) -> Result<(), StepError> {
        let script = templates::service_worker_script(&self.config);
        self.writer.write("service-worker.js", script.as_bytes())?;
        ctx.set("service_worker", "service-worker.js")?;
        Ok(())
    }
}

/// Writes the starter index page.
pub struct WriteIndexStep {
    config: Arc<GenerationConfig>,
    writer: Arc<dyn ProjectWriter>,
}

impl WriteIndexStep {
    pub fn new(config: Arc<GenerationConfig>, writer: Arc<dyn ProjectWriter>) -> Self {
        Self { config, writer }
    }
}

#[async_trait]
impl Step for WriteIndexStep {
    fn name(&self) -> &str {
        "index"
    }

    fn depends_on(&self) -> &[&str] {
        &BASE_FILE_DEPS
    }

    async fn run(&self, _ctx: &mut SessionContext) -> Result<(), StepError> {
        let html = templates::index_html(&self.config);
        self.writer.write("index.html", html.as_bytes())?;
        Ok(())
    }
}

/// Writes the starter stylesheet.
pub struct WriteStylesStep {
    config: Arc<GenerationConfig>,
    writer: Arc<dyn ProjectWriter>,
}

impl WriteStylesStep {
    pub fn new(config: Arc<GenerationConfig>, writer: Arc<dyn ProjectWriter>) -> Self {
        Self { config, writer }
    }
}

#[async_trait]
impl Step for WriteStylesStep {
    fn name(&self) -> &str {
        "styles"
    }

    fn depends_on(&self) -> &[&str] {
        &BASE_FILE_DEPS
    }

    async fn run(&self, _ctx: &mut SessionContext) -> Result<(), StepError> {
        let css = templates::styles_css(&self.config);
        self.writer.write("styles.css", css.as_bytes())?;
        Ok(())
    }
}

/// Writes the starter application script.
pub struct WriteScriptsStep {
    config: Arc<GenerationConfig>,
    writer: Arc<dyn ProjectWriter>,
}

impl WriteScriptsStep {
    pub fn new(config: Arc<GenerationConfig>, writer: Arc<dyn ProjectWriter>) -> Self {
        Self { config, writer }
    }
}

#[async_trait]
impl Step for WriteScriptsStep {
    fn name(&self) -> &str {
        "scripts"
    }

    fn depends_on(&self) -> &[&str] {
        &BASE_FILE_DEPS
    }

    async fn run(&self, _ctx: &mut SessionContext) -> Result<(), StepError> {
        let js = templates::app_js(&self.config);
        self.writer.write("app.js", js.as_bytes())?;
        Ok(())
    }
}

/// Writes the `.qpwa` file-type configuration.
pub struct WriteFileTypeStep {
    writer: Arc<dyn ProjectWriter>,
}

impl WriteFileTypeStep {
    pub fn new(writer: Arc<dyn ProjectWriter>) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl Step for WriteFileTypeStep {
    fn name(&self) -> &str {
        "file_type"
    }

    fn depends_on(&self) -> &[&str] {
        &BASE_FILE_DEPS
    }

    async fn run(&self, ctx: &mut SessionContext) -> Result<(), StepError> {
        let config = FileTypeConfig::standard();
        let json = config.to_json()?;
        self.writer
            .write("quantum-pwa.configuration.json", json.as_bytes())?;
        ctx.set("file_type", config.extension)?;
        Ok(())
    }
}

/// Records the assistance settings in the session context.
pub struct IntegrateAssistanceStep {
    config: Arc<GenerationConfig>,
}

impl IntegrateAssistanceStep {
    pub fn new(config: Arc<GenerationConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Step for IntegrateAssistanceStep {
    fn name(&self) -> &str {
        "assistance"
    }

    fn depends_on(&self) -> &[&str] {
        &BASE_FILE_DEPS
    }

    async fn run(&self, ctx: &mut SessionContext) -> Result<(), StepError> {
        let assistance = &self.config.assistance;
        ctx.set("assistance_enabled", assistance.any_enabled())?;
        ctx.set("oracle_model", self.config.oracle.model.as_str())?;
        ctx.set(
            "oracle_features",
            self.config.oracle.features.clone(),
        )?;
        Ok(())
    }
}

/// Registers the capability providers selected by the assistance options.
///
/// Inline suggestions enable completion, code suggestions enable code
/// actions, documentation enables hover, test generation enables code
/// lenses. Semantic tokens and commands are always registered. All
/// providers are scoped to the custom document scheme.
pub struct RegisterProvidersStep {
    config: Arc<GenerationConfig>,
    registry: Arc<CapabilityRegistry>,
    facade: Arc<AssistanceFacade>,
}

impl RegisterProvidersStep {
    pub fn new(
        config: Arc<GenerationConfig>,
        registry: Arc<CapabilityRegistry>,
        facade: Arc<AssistanceFacade>,
    ) -> Self {
        Self {
            config,
            registry,
            facade,
        }
    }

    fn selected_kinds(&self) -> Vec<CapabilityKind> {
        let assistance = &self.config.assistance;
        let mut kinds = Vec::new();
        if assistance.inline {
            kinds.push(CapabilityKind::Completion);
        }
        if assistance.suggestions {
            kinds.push(CapabilityKind::CodeAction);
        }
        if assistance.documentation {
            kinds.push(CapabilityKind::Hover);
        }
        if assistance.testing {
            kinds.push(CapabilityKind::CodeLens);
        }
        kinds.push(CapabilityKind::SemanticTokens);
        kinds
    }
}

#[async_trait]
impl Step for RegisterProvidersStep {
    fn name(&self) -> &str {
        "providers"
    }

    fn depends_on(&self) -> &[&str] {
        &["assistance"]
    }

    async fn run(&self, ctx: &mut SessionContext) -> Result<(), StepError> {
        let selector = ScopeSelector::scheme(DOCUMENT_SCHEME);
        for kind in self.selected_kinds() {
            // Silent surfaces swallow oracle outages instead of erroring.
            let provider =
                crate::assist::OracleBackedProvider::new(Arc::clone(&self.facade))
                    .with_downgrade();
            self.registry.register(ProviderRegistration::new(
                kind,
                selector.clone(),
                Arc::new(provider),
            ));
            tracing::debug!(kind = ?kind, "provider registered");
        }
        self.registry.register(ProviderRegistration::new(
            CapabilityKind::Command,
            selector,
            Arc::new(CommandProvider::new(Arc::clone(&self.facade))),
        ));
        ctx.set("providers", self.registry.len() as i64)?;
        Ok(())
    }
}

/// The standard scaffolding pipeline.
pub fn default_pipeline(
    config: Arc<GenerationConfig>,
    writer: Arc<dyn ProjectWriter>,
    registry: Arc<CapabilityRegistry>,
    facade: Arc<AssistanceFacade>,
) -> Pipeline {
    Pipeline::new(vec![
        StepUnit::single(InitContextStep::new(Arc::clone(&config))),
        StepUnit::concurrent(vec![
            Arc::new(WriteManifestStep::new(
                Arc::clone(&config),
                Arc::clone(&writer),
            )),
            Arc::new(WriteServiceWorkerStep::new(
                Arc::clone(&config),
                Arc::clone(&writer),
            )),
            Arc::new(WriteIndexStep::new(
                Arc::clone(&config),
                Arc::clone(&writer),
            )),
            Arc::new(WriteStylesStep::new(
                Arc::clone(&config),
                Arc::clone(&writer),
            )),
            Arc::new(WriteScriptsStep::new(
                Arc::clone(&config),
                Arc::clone(&writer),
            )),
        ]),
        StepUnit::single(WriteFileTypeStep::new(Arc::clone(&writer))),
        StepUnit::single(IntegrateAssistanceStep::new(Arc::clone(&config))),
        StepUnit::single(RegisterProvidersStep::new(config, registry, facade)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assist::OfflineOracle;
    use crate::config::{AssistanceOptions, OracleProfile};
    use crate::context::ContextValue;
    use crate::registry::{
        CapabilityRequest, CapabilityResponse, DocumentRef, DocumentScope,
    };
    use crate::writer::MemWriter;

    fn run_default(
        config: GenerationConfig,
    ) -> (Arc<MemWriter>, Arc<CapabilityRegistry>, crate::pipeline::PipelineReport) {
        let writer = Arc::new(MemWriter::new());
        let registry = Arc::new(CapabilityRegistry::new());
        let facade = Arc::new(AssistanceFacade::new(
            Arc::new(OfflineOracle),
            OracleProfile::default(),
        ));
        let config = Arc::new(config);
        let writer_dyn: Arc<dyn ProjectWriter> = writer.clone();
        let pipeline = default_pipeline(
            Arc::clone(&config),
            writer_dyn,
            registry.clone(),
            facade,
        );
        let report = tokio_test::block_on(pipeline.run(&config)).unwrap();
        (writer, registry, report)
    }

    #[test]
    fn test_default_pipeline_writes_all_artifacts() {
        let (writer, _, report) = run_default(GenerationConfig::new("Quantum Notes", "Notes", "/p"));
        assert_eq!(
            writer.paths(),
            vec![
                "app.js".to_string(),
                "index.html".to_string(),
                "manifest.json".to_string(),
                "quantum-pwa.configuration.json".to_string(),
                "service-worker.js".to_string(),
                "styles.css".to_string(),
            ]
        );
        assert!(report.executed.contains(&"init_context".to_string()));
        assert!(report.executed.contains(&"providers".to_string()));
    }

    #[test]
    fn test_manifest_contents_reflect_config() {
        let (writer, _, _) = run_default(GenerationConfig::new("Quantum Notes", "Notes", "/p"));
        let manifest: serde_json::Value =
            serde_json::from_str(&writer.get("manifest.json").unwrap()).unwrap();
        assert_eq!(manifest["name"], "Quantum Notes");
        assert_eq!(manifest["short_name"], "Notes");
        assert_eq!(manifest["quantum_features"]["offlineFirst"], true);
    }

    #[test]
    fn test_all_assistance_on_registers_six_providers() {
        let (_, registry, report) = run_default(GenerationConfig::new("App", "App", "/p"));
        assert_eq!(registry.len(), 6);
        assert_eq!(registry.count(CapabilityKind::Command), 1);
        assert_eq!(
            report.context.get("providers"),
            Some(&ContextValue::Int(6))
        );
    }

    #[test]
    fn test_disabled_surfaces_skip_their_providers() {
        let config = GenerationConfig::new("App", "App", "/p").with_assistance(AssistanceOptions {
            inline: false,
            suggestions: true,
            documentation: false,
            testing: false,
            ..AssistanceOptions::default()
        });
        let (_, registry, _) = run_default(config);
        assert_eq!(registry.count(CapabilityKind::Completion), 0);
        assert_eq!(registry.count(CapabilityKind::Hover), 0);
        assert_eq!(registry.count(CapabilityKind::CodeLens), 0);
        assert_eq!(registry.count(CapabilityKind::CodeAction), 1);
        // Always-on providers.
        assert_eq!(registry.count(CapabilityKind::SemanticTokens), 1);
        assert_eq!(registry.count(CapabilityKind::Command), 1);
    }

    #[test]
    fn test_context_records_run_settings() {
        let config = GenerationConfig::new("App", "App", "/p")
            .with_features(vec!["offline-first".to_string()]);
        let (_, _, report) = run_default(config);
        assert_eq!(
            report.context.get("project_name").and_then(|v| v.as_text()),
            Some("App")
        );
        assert_eq!(
            report.context.get("mode").and_then(|v| v.as_text()),
            Some("advanced")
        );
        assert_eq!(
            report.context.get("assistance_enabled").and_then(|v| v.as_bool()),
            Some(true)
        );
        assert_eq!(
            report.context.get("features"),
            Some(&ContextValue::List(vec!["offline-first".to_string()]))
        );
    }

    #[test]
    fn test_registered_providers_answer_requests() {
        let (_, registry, report) = run_default(GenerationConfig::new("App", "App", "/p"));
        let request = CapabilityRequest {
            kind: CapabilityKind::Hover,
            scope: DocumentScope::scheme(DOCUMENT_SCHEME),
            document: DocumentRef::new("doc.qpwa", "state counter = 0"),
            position: None,
            range: None,
            context: report.context.clone(),
        };
        // Offline oracle: silent empty answer, never an error.
        let response = tokio_test::block_on(registry.dispatch(&request)).unwrap();
        assert_eq!(response, CapabilityResponse::Hover(None));
    }
}
