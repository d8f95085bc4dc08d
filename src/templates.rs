//! Generated artifact templates.
//!
//! The concrete file contents the scaffolding steps write: the web-app
//! manifest, the service-worker bootstrap script, the `.qpwa` file-type
//! configuration, and the starter index/styles/scripts files.

use crate::config::{GenerationConfig, IconDef};
use serde::Serialize;

/// Custom document scheme the plugin scopes its providers to.
pub const DOCUMENT_SCHEME: &str = "quantum-pwa";

/// File extension for the custom document type.
pub const FILE_EXTENSION: &str = ".qpwa";

/// Web-app manifest artifact.
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub name: String,
    pub short_name: String,
    pub start_url: String,
    pub display: String,
    pub background_color: String,
    pub theme_color: String,
    pub icons: Vec<IconDef>,
    pub quantum_features: QuantumFeatures,
}

/// Feature flags block inside the manifest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantumFeatures {
    pub state_management: bool,
    pub offline_first: bool,
    pub ai_assistance: bool,
}

impl Manifest {
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            name: config.name.clone(),
            short_name: config.short_name.clone(),
            start_url: "/".to_string(),
            display: "standalone".to_string(),
            background_color: config.theme.background.clone(),
            theme_color: config.theme.primary.clone(),
            icons: config.icons.clone(),
            quantum_features: QuantumFeatures {
                state_management: true,
                offline_first: true,
                ai_assistance: true,
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Service-worker bootstrap script.
pub fn service_worker_script(config: &GenerationConfig) -> String {
    format!(
        r#"import {{ QuantumServiceWorker }} from './quantum-sw';
import {{ CopilotIntegration }} from './copilot-sw';

const sw = new QuantumServiceWorker({{
    caching: true,
    quantum: true,
    aiAssistance: {ai}
}});

sw.initialize();
"#,
        ai = config.assistance.any_enabled()
    )
}

/// File-type configuration for the custom document type.
#[derive(Debug, Clone, Serialize)]
pub struct FileTypeConfig {
    pub extension: String,
    pub syntax: SyntaxDef,
    pub configuration: LanguageConfiguration,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyntaxDef {
    #[serde(rename = "scopeName")]
    pub scope_name: String,
    pub patterns: Vec<SyntaxPattern>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyntaxPattern {
    pub name: String,
    #[serde(rename = "match")]
    pub regex: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageConfiguration {
    pub comments: CommentRules,
    pub brackets: Vec<[String; 2]>,
    #[serde(rename = "autoClosingPairs")]
    pub auto_closing_pairs: Vec<AutoClosingPair>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentRules {
    #[serde(rename = "lineComment")]
    pub line_comment: String,
    #[serde(rename = "blockComment")]
    pub block_comment: [String; 2],
}

#[derive(Debug, Clone, Serialize)]
pub struct AutoClosingPair {
    pub open: String,
    pub close: String,
}

impl FileTypeConfig {
    pub fn standard() -> Self {
        let pair = |open: &str, close: &str| AutoClosingPair {
            open: open.to_string(),
            close: close.to_string(),
        };
        let bracket = |open: &str, close: &str| [open.to_string(), close.to_string()];

        Self {
            extension: FILE_EXTENSION.to_string(),
            syntax: SyntaxDef {
                scope_name: format!("source.{}", DOCUMENT_SCHEME),
                patterns: vec![
                    SyntaxPattern {
                        name: "keyword.control.quantum-pwa".to_string(),
                        regex: r"\b(state|worker|component|route)\b".to_string(),
                    },
                    SyntaxPattern {
                        name: "string.quoted.double.quantum-pwa".to_string(),
                        regex: r#""[^"]*""#.to_string(),
                    },
                ],
            },
            configuration: LanguageConfiguration {
                comments: CommentRules {
                    line_comment: "//".to_string(),
                    block_comment: ["/*".to_string(), "*/".to_string()],
                },
                brackets: vec![bracket("{", "}"), bracket("[", "]"), bracket("(", ")")],
                auto_closing_pairs: vec![
                    pair("{", "}"),
                    pair("[", "]"),
                    pair("(", ")"),
                    pair("\"", "\""),
                    pair("'", "'"),
                ],
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Starter index page.
pub fn index_html(config: &GenerationConfig) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <meta name="theme-color" content="{theme}" />
  <link rel="manifest" href="/manifest.json" />
  <link rel="stylesheet" href="/styles.css" />
  <title>{name}</title>
</head>
<body>
  <main id="app"></main>
  <script src="/app.js"></script>
  <script>
    if ('serviceWorker' in navigator) {{
      navigator.serviceWorker.register('/service-worker.js');
    }}
  </script>
</body>
</html>
"#,
        theme = config.theme.primary,
        name = config.name
    )
}

/// Starter stylesheet derived from the theme.
pub fn styles_css(config: &GenerationConfig) -> String {
    format!(
        r#":root {{
  --background: {background};
  --primary: {primary};
}}

body {{
  margin: 0;
  background: var(--background);
  color: var(--primary);
  font-family: system-ui, sans-serif;
}}
"#,
        background = config.theme.background,
        primary = config.theme.primary
    )
}

/// Starter application script.
pub fn app_js(config: &GenerationConfig) -> String {
    format!(
        r#"const app = document.getElementById('app');
app.textContent = '{name}';
"#,
        name = config.name.replace('\'', "\\'")
    )
}
