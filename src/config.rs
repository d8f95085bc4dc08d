//! Generation configuration.
//!
//! [`GenerationConfig`] is the immutable input to a pipeline run: project
//! identity, feature tags, target root, theming and icon data, plus the
//! assistance options that decide which capability providers get wired up.
//! It is validated once at pipeline start; steps never see an invalid config.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by [`GenerationConfig::validate`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("project name must not be empty")]
    EmptyName,
    #[error("project root must not be empty")]
    EmptyRoot,
    #[error("duplicate feature tag: {0}")]
    DuplicateFeature(String),
}

/// Theme colors used by the manifest and the generated stylesheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    /// Background color (e.g. "#ffffff")
    pub background: String,
    /// Primary/theme color (e.g. "#000000")
    pub primary: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: "#ffffff".to_string(),
            primary: "#000000".to_string(),
        }
    }
}

/// An icon entry carried verbatim into the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconDef {
    pub src: String,
    pub sizes: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// Assistance mode recorded in the session context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Basic,
    #[default]
    Advanced,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(Mode::Basic),
            "advanced" => Ok(Mode::Advanced),
            _ => Err(format!("Unknown mode: {}", s)),
        }
    }
}

/// Which assistance surfaces the register-providers step enables.
///
/// Mirrors the host-side assistance switches: inline suggestions map to
/// completion, code suggestions to code actions, documentation to hover,
/// and test generation to code lenses. Semantic tokens and commands are
/// always registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistanceOptions {
    pub inline: bool,
    pub suggestions: bool,
    pub documentation: bool,
    pub testing: bool,
    /// Assistance mode recorded in the session context.
    #[serde(default)]
    pub mode: Mode,
}

impl Default for AssistanceOptions {
    fn default() -> Self {
        Self {
            inline: true,
            suggestions: true,
            documentation: true,
            testing: true,
            mode: Mode::default(),
        }
    }
}

impl AssistanceOptions {
    /// True if any assistance surface is enabled.
    pub fn any_enabled(&self) -> bool {
        self.inline || self.suggestions || self.documentation || self.testing
    }
}

/// Identity of the external assistant oracle backing the facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleProfile {
    /// Model identifier passed through to the oracle.
    pub model: String,
    /// Assistance features requested from the oracle.
    pub features: Vec<String>,
    /// Domain context tag for oracle queries.
    pub context: String,
}

impl Default for OracleProfile {
    fn default() -> Self {
        Self {
            model: "copilot-quantum".to_string(),
            features: vec![
                "completion".to_string(),
                "chat".to_string(),
                "explanation".to_string(),
            ],
            context: "pwa-development".to_string(),
        }
    }
}

/// Immutable input to a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Full project name (manifest `name`).
    pub name: String,
    /// Short name (manifest `short_name`).
    pub short_name: String,
    /// Target root location for generated files.
    pub project_root: PathBuf,
    /// Ordered feature tags; must be unique.
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub icons: Vec<IconDef>,
    #[serde(default)]
    pub assistance: AssistanceOptions,
    #[serde(default)]
    pub oracle: OracleProfile,
}

impl GenerationConfig {
    /// Create a config with defaults for everything but identity and root.
    pub fn new(
        name: impl Into<String>,
        short_name: impl Into<String>,
        project_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            short_name: short_name.into(),
            project_root: project_root.into(),
            features: Vec::new(),
            theme: Theme::default(),
            icons: Vec::new(),
            assistance: AssistanceOptions::default(),
            oracle: OracleProfile::default(),
        }
    }

    /// Set feature tags.
    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.features = features;
        self
    }

    /// Set theme colors.
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Set manifest icons.
    pub fn with_icons(mut self, icons: Vec<IconDef>) -> Self {
        self.icons = icons;
        self
    }

    /// Set assistance options.
    pub fn with_assistance(mut self, assistance: AssistanceOptions) -> Self {
        self.assistance = assistance;
        self
    }

    /// Set the oracle profile.
    pub fn with_oracle(mut self, oracle: OracleProfile) -> Self {
        self.oracle = oracle;
        self
    }

    /// Validate invariants: non-empty identity and root, unique feature tags.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.project_root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyRoot);
        }
        let mut seen = HashSet::new();
        for tag in &self.features {
            if !seen.insert(tag.as_str()) {
                return Err(ConfigError::DuplicateFeature(tag.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GenerationConfig {
        GenerationConfig::new("App", "App", "/p")
    }

    #[test]
    fn test_validate_ok() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_name() {
        let config = GenerationConfig::new("  ", "App", "/p");
        assert_eq!(config.validate(), Err(ConfigError::EmptyName));
    }

    #[test]
    fn test_validate_empty_root() {
        let config = GenerationConfig::new("App", "App", "");
        assert_eq!(config.validate(), Err(ConfigError::EmptyRoot));
    }

    #[test]
    fn test_validate_duplicate_feature() {
        let config = sample().with_features(vec![
            "offline-first".to_string(),
            "ai-assisted".to_string(),
            "offline-first".to_string(),
        ]);
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateFeature("offline-first".to_string()))
        );
    }

    #[test]
    fn test_builder_setters() {
        let config = sample()
            .with_theme(Theme {
                background: "#fff".to_string(),
                primary: "#000".to_string(),
            })
            .with_features(vec!["offline-first".to_string()]);
        assert_eq!(config.theme.primary, "#000");
        assert_eq!(config.features.len(), 1);
    }

    #[test]
    fn test_mode_round_trip() {
        assert_eq!("advanced".parse::<Mode>(), Ok(Mode::Advanced));
        assert_eq!(Mode::Basic.as_str(), "basic");
        assert!("quantum".parse::<Mode>().is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let config = sample().with_features(vec!["quantum-state".to_string()]);
        let json = serde_json::to_string(&config).unwrap();
        let back: GenerationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_oracle_profile_defaults() {
        let profile = OracleProfile::default();
        assert_eq!(profile.model, "copilot-quantum");
        assert_eq!(profile.context, "pwa-development");
    }
}
