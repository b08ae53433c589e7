use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Everything that shapes how a report looks, passed explicitly to the renderers.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// [document]
/// title = "Quarterly Sales Model"
/// babel_language = "ukrainian"
/// font_encoding = "T2A"
///
/// [compiler]
/// timeout_secs = 60
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub plot: PlotConfig,
    pub document: DocumentConfig,
    pub compiler: CompilerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    /// Raster size of the scatter, Q-Q and histogram figures, in pixels.
    pub width: u32,
    pub height: u32,
    /// Side length of the square correlation heatmaps, in pixels.
    pub heatmap_size: u32,
    pub point_radius: u32,
    /// Print the coefficient inside each heatmap cell.
    pub annotate_heatmaps: bool,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            heatmap_size: 800,
            point_radius: 4,
            annotate_heatmaps: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub title: String,
    pub author: Option<String>,
    pub paper: String,
    pub margin: String,
    pub font_encoding: String,
    /// Passed to `babel` when set; the document language otherwise stays the
    /// LaTeX default.
    pub babel_language: Option<String>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            title: "Multifactor Linear Regression Report".to_string(),
            author: None,
            paper: "a4paper".to_string(),
            margin: "2.5cm".to_string(),
            font_encoding: "T1".to_string(),
            babel_language: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Upper bound on a single compilation pass.
    pub timeout_secs: u64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            program: "pdflatex".to_string(),
            args: vec![
                "-interaction=nonstopmode".to_string(),
                "-halt-on-error".to_string(),
            ],
            timeout_secs: 120,
        }
    }
}

/// Smallest and largest accepted side of a figure, in pixels.
pub const MIN_FIGURE_PIXELS: u32 = 200;
pub const MAX_FIGURE_PIXELS: u32 = 8000;

/// LaTeX length units accepted in `document.margin`.
const LENGTH_UNITS: [&str; 8] = ["pt", "bp", "pc", "mm", "cm", "in", "em", "ex"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read render configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse render configuration TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid render configuration value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl RenderConfig {
    /// Loads a configuration from a TOML file. Missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.plot.validate()?;
        self.document.validate()
    }
}

impl PlotConfig {
    /// Every figure side must lie within `MIN_FIGURE_PIXELS..=MAX_FIGURE_PIXELS`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, side) in [
            ("plot.width", self.width),
            ("plot.height", self.height),
            ("plot.heatmap_size", self.heatmap_size),
        ] {
            if !(MIN_FIGURE_PIXELS..=MAX_FIGURE_PIXELS).contains(&side) {
                return Err(ConfigError::Invalid {
                    key,
                    reason: format!(
                        "{side} px is outside {MIN_FIGURE_PIXELS}..={MAX_FIGURE_PIXELS} px"
                    ),
                });
            }
        }
        Ok(())
    }
}

impl DocumentConfig {
    /// Package options are written into the preamble verbatim, so they are
    /// restricted to the characters such options actually use. Title and author
    /// are free text and are escaped when the document is composed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let option_list = |key: &'static str, value: &str| {
            let valid = !value.is_empty()
                && value.split(',').all(|part| {
                    let part = part.trim();
                    !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
                });
            if valid {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    key,
                    reason: format!("'{value}' is not a comma-separated list of LaTeX option names"),
                })
            }
        };

        option_list("document.font_encoding", &self.font_encoding)?;
        option_list("document.paper", &self.paper)?;
        if let Some(language) = &self.babel_language {
            option_list("document.babel_language", language)?;
        }
        if !is_latex_length(&self.margin) {
            return Err(ConfigError::Invalid {
                key: "document.margin",
                reason: format!(
                    "'{}' is not a length such as 2.5cm (units: {})",
                    self.margin,
                    LENGTH_UNITS.join(", ")
                ),
            });
        }
        Ok(())
    }
}

/// A non-negative decimal followed by one of `LENGTH_UNITS`.
fn is_latex_length(text: &str) -> bool {
    let text = text.trim();
    LENGTH_UNITS.iter().any(|unit| {
        text.strip_suffix(unit).is_some_and(|number| {
            let number = number.trim_end();
            !number.is_empty()
                && number.chars().all(|c| c.is_ascii_digit() || c == '.')
                && number.chars().filter(|&c| c == '.').count() <= 1
                && number.chars().any(|c| c.is_ascii_digit())
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: RenderConfig = toml::from_str(
            r#"
            [document]
            title = "Sales"
            babel_language = "ukrainian"

            [compiler]
            timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.document.title, "Sales");
        assert_eq!(config.document.babel_language.as_deref(), Some("ukrainian"));
        assert_eq!(config.document.paper, "a4paper");
        assert_eq!(config.compiler.timeout_secs, 5);
        assert_eq!(config.compiler.program, "pdflatex");
        assert_eq!(config.plot, PlotConfig::default());
    }

    #[test]
    fn load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[plot]\nwidth = 640\nannotate_heatmaps = false").unwrap();
        let config = RenderConfig::load(file.path()).unwrap();
        assert_eq!(config.plot.width, 640);
        assert!(!config.plot.annotate_heatmaps);
        assert_eq!(config.plot.height, 600);
    }

    #[test]
    fn undersized_figures_are_rejected_on_load() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[plot]\nheatmap_size = 32").unwrap();
        match RenderConfig::load(file.path()) {
            Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, "plot.heatmap_size"),
            other => panic!("unexpected result: {other:?}"),
        }

        let mut config = RenderConfig::default();
        config.plot.width = MAX_FIGURE_PIXELS + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "plot.width", .. })
        ));
    }

    #[test]
    fn preamble_options_are_checked() {
        let defaults = DocumentConfig::default();
        assert!(defaults.validate().is_ok());

        let valid = DocumentConfig {
            font_encoding: "T2A, T1".into(),
            paper: "letterpaper".into(),
            margin: "1in".into(),
            babel_language: Some("ukrainian".into()),
            ..DocumentConfig::default()
        };
        assert!(valid.validate().is_ok());

        let cases = [
            ("document.font_encoding", DocumentConfig {
                font_encoding: "T1]{fontenc}\\input{/etc/passwd".into(),
                ..DocumentConfig::default()
            }),
            ("document.paper", DocumentConfig {
                paper: "a4paper}".into(),
                ..DocumentConfig::default()
            }),
            ("document.margin", DocumentConfig {
                margin: "2.5cm]{x}".into(),
                ..DocumentConfig::default()
            }),
            ("document.margin", DocumentConfig {
                margin: "wide".into(),
                ..DocumentConfig::default()
            }),
            ("document.babel_language", DocumentConfig {
                babel_language: Some("english}".into()),
                ..DocumentConfig::default()
            }),
        ];
        for (expected, config) in cases {
            match config.validate() {
                Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, expected),
                other => panic!("{expected}: unexpected result {other:?}"),
            }
        }
    }

    #[test]
    fn margins_accept_latex_lengths() {
        assert!(is_latex_length("2.5cm"));
        assert!(is_latex_length("10 mm"));
        assert!(is_latex_length("1in"));
        assert!(!is_latex_length("cm"));
        assert!(!is_latex_length("1.2.3cm"));
        assert!(!is_latex_length("-1cm"));
    }

    #[test]
    fn malformed_toml_is_reported() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[plot\nwidth = ").unwrap();
        assert!(matches!(
            RenderConfig::load(file.path()),
            Err(ConfigError::TomlParse(_))
        ));
    }
}
