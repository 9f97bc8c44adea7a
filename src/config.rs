//! Engine configuration

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading or parsing a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Configuration options for a [`TemplateEngine`](crate::TemplateEngine)
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Directory that relative template paths are resolved against
    ///
    /// `None` resolves against the process working directory.
    pub template_root: Option<PathBuf>,

    /// File extensions (without the dot) rendered in XML mode
    pub xml_extensions: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            template_root: None,
            xml_extensions: vec!["xml".to_string()],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    #[serde(default)]
    templates: TomlTemplates,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlTemplates {
    root: Option<PathBuf>,
    xml_extensions: Option<Vec<String>>,
}

impl EngineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the template root directory
    pub fn with_template_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.template_root = Some(root.into());
        self
    }

    /// Replace the set of XML extensions
    pub fn with_xml_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.xml_extensions = extensions
            .into_iter()
            .map(|ext| ext.into().trim_start_matches('.').to_string())
            .collect();
        self
    }

    /// Load configuration from a TOML file
    ///
    /// A relative `root` is taken relative to the directory holding the file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;
        if let (Some(root), Some(dir)) = (&config.template_root, path.parent()) {
            if root.is_relative() {
                config.template_root = Some(dir.join(root));
            }
        }
        Ok(config)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;
        let mut config = Self::default();
        if let Some(root) = parsed.templates.root {
            config = config.with_template_root(root);
        }
        if let Some(extensions) = parsed.templates.xml_extensions {
            config = config.with_xml_extensions(extensions);
        }
        Ok(config)
    }

    /// Whether a template at `path` is rendered in XML mode
    pub fn is_xml(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.xml_extensions
                    .iter()
                    .any(|xml| xml.eq_ignore_ascii_case(ext))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.template_root, None);
        assert_eq!(config.xml_extensions, vec!["xml".to_string()]);
    }

    #[test]
    fn test_builder_pattern() {
        let config = EngineConfig::new()
            .with_template_root("themes/default")
            .with_xml_extensions([".rss", "atom"]);

        assert_eq!(config.template_root, Some(PathBuf::from("themes/default")));
        assert_eq!(config.xml_extensions, vec!["rss", "atom"]);
    }

    #[test]
    fn test_is_xml() {
        let config = EngineConfig::default();
        assert!(config.is_xml(Path::new("feeds/products.xml")));
        assert!(config.is_xml(Path::new("FEED.XML")));
        assert!(!config.is_xml(Path::new("index.html")));
        assert!(!config.is_xml(Path::new("xml")));
    }

    #[test]
    fn test_from_str() {
        let config = EngineConfig::from_str(
            r#"
            [templates]
            root = "templates"
            xml_extensions = ["xml", "rss"]
            "#,
        )
        .unwrap();
        assert_eq!(config.template_root, Some(PathBuf::from("templates")));
        assert!(config.is_xml(Path::new("a.rss")));
    }

    #[test]
    fn test_from_str_empty_uses_defaults() {
        assert_eq!(EngineConfig::from_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_from_str_rejects_unknown_keys() {
        assert!(matches!(
            EngineConfig::from_str("[templates]\nrot = \"x\""),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_from_file_resolves_root_next_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "[templates]\nroot = \"pages\"\n").unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.template_root, Some(dir.path().join("pages")));
    }
}
