use serde::{Deserialize, Serialize};
use standoff_engine::{IoError, Standoff, View, io};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Replacement text for <{tag}> must be a single character, got {text:?}")]
    InvalidTagText { tag: String, text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShrinkWhitespace {
    #[serde(default = "ShrinkWhitespace::default_shrink_to")]
    pub shrink_to: char,
    #[serde(default = "ShrinkWhitespace::default_whitespace")]
    pub whitespace: Vec<char>,
}

impl ShrinkWhitespace {
    fn default_shrink_to() -> char {
        ' '
    }

    fn default_whitespace() -> Vec<char> {
        standoff_engine::view::DEFAULT_WHITESPACE.to_vec()
    }
}

impl Default for ShrinkWhitespace {
    fn default() -> Self {
        Self {
            shrink_to: Self::default_shrink_to(),
            whitespace: Self::default_whitespace(),
        }
    }
}

/// How to load a document and project it to plain text.
///
/// Filters run in a fixed order: comments, `exclude_inside`,
/// `exclude_outside`, `include_inside`, whitespace, then `tag_text`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Element whose text is tracked, e.g. `text` for TEI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_root: Option<String>,
    pub remove_comments: bool,
    pub exclude_inside: Vec<String>,
    pub exclude_outside: Vec<String>,
    pub include_inside: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shrink_whitespace: Option<ShrinkWhitespace>,
    pub tag_text: BTreeMap<String, String>,
}

impl ViewConfig {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            log::debug!("no view config at {}", config_path.display());
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let config: ViewConfig =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;
        // Reject bad replacements at load time rather than on first use
        config.tag_chars()?;

        Ok(Some(config))
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    fn tag_chars(&self) -> Result<Vec<(&str, char)>, ConfigError> {
        self.tag_text
            .iter()
            .map(|(tag, text)| {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Ok((tag.as_str(), ch)),
                    _ => Err(ConfigError::InvalidTagText {
                        tag: tag.clone(),
                        text: text.clone(),
                    }),
                }
            })
            .collect()
    }

    /// Run the configured filters over `view`.
    pub fn apply<'a>(&self, view: View<'a>) -> Result<View<'a>, ConfigError> {
        let tag_chars = self.tag_chars()?;

        let mut view = view;
        if self.remove_comments {
            view = view.remove_comments();
        }
        for tag in &self.exclude_inside {
            view = view.exclude_inside(tag);
        }
        for tag in &self.exclude_outside {
            view = view.exclude_outside(tag);
        }
        for tag in &self.include_inside {
            view = view.include_inside(tag);
        }
        if let Some(shrink) = &self.shrink_whitespace {
            view = view.shrink_whitespace_with(shrink.shrink_to, &shrink.whitespace);
        }
        for (tag, ch) in tag_chars {
            view = view.insert_tag_text(tag, ch);
        }
        Ok(view)
    }

    /// Load an XML document, honouring `text_root`.
    pub fn load_document<P: AsRef<Path>>(&self, path: P) -> Result<Standoff, IoError> {
        match &self.text_root {
            Some(root) => io::load_with_text_root(path.as_ref(), root),
            None => io::load(path.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn plain(config: &ViewConfig, source: &str) -> String {
        let doc = io::parse_str(source).unwrap();
        config.apply(doc.view()).unwrap().get_plain().0
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = ViewConfig::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested/view.toml");
        let config = ViewConfig {
            text_root: Some("text".to_string()),
            remove_comments: true,
            exclude_inside: vec!["note".to_string()],
            shrink_whitespace: Some(ShrinkWhitespace::default()),
            tag_text: BTreeMap::from([("lb".to_string(), "\n".to_string())]),
            ..Default::default()
        };

        config.save_to_path(&config_file).unwrap();
        let loaded = ViewConfig::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_defaults_from_partial_toml() {
        let config: ViewConfig = toml::from_str(
            r#"
exclude_inside = ["note"]

[shrink_whitespace]
"#,
        )
        .unwrap();

        assert!(!config.remove_comments);
        assert_eq!(config.exclude_inside, vec!["note"]);
        assert_eq!(config.shrink_whitespace, Some(ShrinkWhitespace::default()));
    }

    #[test]
    fn test_invalid_tag_text_rejected_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("view.toml");
        std::fs::write(&config_file, "[tag_text]\nlb = \"ab\"\n").unwrap();

        let err = ViewConfig::load_from_path(&config_file).unwrap_err();

        assert!(matches!(err, ConfigError::InvalidTagText { tag, .. } if tag == "lb"));
    }

    #[test]
    fn test_parse_error_names_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("view.toml");
        std::fs::write(&config_file, "remove_comments = \"yes\"").unwrap();

        let err = ViewConfig::load_from_path(&config_file).unwrap_err();

        assert!(matches!(err, ConfigError::ConfigParseError { config_path, .. } if config_path == config_file));
    }

    #[test]
    fn test_apply_runs_filters_in_order() {
        let config = ViewConfig {
            remove_comments: true,
            exclude_inside: vec!["note".to_string()],
            shrink_whitespace: Some(ShrinkWhitespace::default()),
            tag_text: BTreeMap::from([("lb".to_string(), "\n".to_string())]),
            ..Default::default()
        };

        let text = plain(
            &config,
            "<p>one  <!--x-->two <note>skip</note> three<lb/>four</p>",
        );

        assert_eq!(text, "one two three\nfour");
    }

    #[test]
    fn test_exclude_outside_then_include() {
        let config = ViewConfig {
            exclude_outside: vec!["body".to_string()],
            ..Default::default()
        };

        let text = plain(&config, "<text><front>f</front><body>b</body></text>");

        assert_eq!(text, "b");
    }

    #[test]
    fn test_load_document_with_text_root() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.xml");
        std::fs::write(&path, "<TEI><teiHeader>h</teiHeader><text>body</text></TEI>").unwrap();
        let config = ViewConfig {
            text_root: Some("text".to_string()),
            ..Default::default()
        };

        let doc = config.load_document(&path).unwrap();

        assert_eq!(doc.plain(), "body");
    }
}
