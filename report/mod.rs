//! Rendering of a fitted model into a document, its LaTeX source, or a workbook.

pub mod compile;
pub mod config;
pub mod latex;
pub mod spreadsheet;
pub mod visualize;

use crate::data::ValidationError;
use crate::model::RegressionResult;
use compile::{DocumentCompiler, LatexCompiler};
use config::RenderConfig;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use visualize::VisualizationGenerator;

const SOURCE_FILE: &str = "report.tex";
const DOCUMENT_FILE: &str = "report.pdf";
const COMPILE_PASSES: usize = 2;
/// Trailing bytes of compiler output kept in an error.
const DIAGNOSTIC_TAIL: usize = 4000;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("Failed to render figure '{figure}': {message}")]
    Plot {
        figure: &'static str,
        message: String,
    },
    #[error("Failed to write the spreadsheet: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),
    #[error("I/O error while rendering the report: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not start the document compiler '{program}': {source}")]
    CompilerLaunch {
        program: String,
        source: std::io::Error,
    },
    #[error(
        "The document compiler produced no output after {passes} passes. Compiler output:\n{diagnostics}"
    )]
    CompilerOutputMissing { passes: usize, diagnostics: String },
}

/// The three report outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportFormat {
    /// Compiled PDF.
    Document,
    /// The LaTeX source the document is compiled from.
    TypesettingSource,
    /// An `.xlsx` workbook.
    Spreadsheet,
}

impl ReportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportFormat::Document => "document",
            ReportFormat::TypesettingSource => "typesetting-source",
            ReportFormat::Spreadsheet => "spreadsheet",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ReportFormat::Document => "application/pdf",
            ReportFormat::TypesettingSource => "application/x-tex",
            ReportFormat::Spreadsheet => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn file_extension(self) -> &'static str {
        match self {
            ReportFormat::Document => "pdf",
            ReportFormat::TypesettingSource => "tex",
            ReportFormat::Spreadsheet => "xlsx",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "document" | "pdf" => Ok(ReportFormat::Document),
            "typesetting-source" | "latex" | "tex" => Ok(ReportFormat::TypesettingSource),
            "spreadsheet" | "xlsx" => Ok(ReportFormat::Spreadsheet),
            _ => Err(ValidationError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rendered report, owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    format: ReportFormat,
    bytes: Vec<u8>,
}

impl ReportArtifact {
    pub fn format(&self) -> ReportFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn file_extension(&self) -> &'static str {
        self.format.file_extension()
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), std::io::Error> {
        fs::write(path, &self.bytes)
    }
}

/// Turns fitted models into report artifacts.
///
/// All scratch files of a render live in a fresh temporary directory that is
/// removed when the call returns, whichever way it returns. Renders share no
/// mutable state, so one renderer can serve concurrent callers.
pub struct ReportRenderer {
    config: RenderConfig,
    compiler: Box<dyn DocumentCompiler>,
}

impl ReportRenderer {
    /// A renderer that compiles documents with the configured LaTeX engine.
    pub fn new(config: RenderConfig) -> Self {
        let compiler = Box::new(LatexCompiler::from_config(&config.compiler));
        Self { config, compiler }
    }

    pub fn with_compiler(config: RenderConfig, compiler: Box<dyn DocumentCompiler>) -> Self {
        Self { config, compiler }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn render(
        &self,
        result: &RegressionResult,
        format: ReportFormat,
        target_name: &str,
        feature_names: &[String],
    ) -> Result<ReportArtifact, RenderError> {
        self.config.validate()?;
        let bytes = match format {
            ReportFormat::Spreadsheet => {
                let sheets = spreadsheet::plan(result, target_name, feature_names);
                spreadsheet::write_workbook(&sheets)?
            }
            ReportFormat::TypesettingSource => self
                .typesetting_source(result, target_name, feature_names)?
                .into_bytes(),
            ReportFormat::Document => self.document(result, target_name, feature_names)?,
        };
        log::info!("Rendered {} report ({} bytes)", format, bytes.len());
        Ok(ReportArtifact { format, bytes })
    }

    /// Like [`render`](Self::render) with the format given by name.
    pub fn render_named(
        &self,
        result: &RegressionResult,
        format: &str,
        target_name: &str,
        feature_names: &[String],
    ) -> Result<ReportArtifact, RenderError> {
        let format = format.parse::<ReportFormat>()?;
        self.render(result, format, target_name, feature_names)
    }

    fn typesetting_source(
        &self,
        result: &RegressionResult,
        target_name: &str,
        feature_names: &[String],
    ) -> Result<String, RenderError> {
        let figures = VisualizationGenerator::new(&self.config.plot).render(result, target_name)?;
        Ok(latex::compose(
            result,
            target_name,
            feature_names,
            &figures,
            &self.config.document,
        ))
    }

    fn document(
        &self,
        result: &RegressionResult,
        target_name: &str,
        feature_names: &[String],
    ) -> Result<Vec<u8>, RenderError> {
        let figures = VisualizationGenerator::new(&self.config.plot).render(result, target_name)?;
        let source = latex::compose(
            result,
            target_name,
            feature_names,
            &figures,
            &self.config.document,
        );

        let workdir = tempfile::Builder::new().prefix("olsreport-").tempdir()?;
        for figure in &figures {
            fs::write(workdir.path().join(figure.kind.file_name()), &figure.png)?;
        }
        let source_path = workdir.path().join(SOURCE_FILE);
        fs::write(&source_path, source)?;

        let mut diagnostics = String::new();
        for pass in 1..=COMPILE_PASSES {
            let outcome = self.compiler.compile(&source_path, workdir.path())?;
            if !outcome.success {
                log::warn!("Document compiler pass {pass} of {COMPILE_PASSES} reported failure");
            }
            diagnostics = outcome.log;
        }

        let output = workdir.path().join(DOCUMENT_FILE);
        if !output.is_file() {
            return Err(RenderError::CompilerOutputMissing {
                passes: COMPILE_PASSES,
                diagnostics: tail(&diagnostics, DIAGNOSTIC_TAIL).to_string(),
            });
        }
        Ok(fs::read(output)?)
    }
}

/// The last `max_bytes` of `text`, cut on a character boundary.
fn tail(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

#[cfg(test)]
mod tests {
    use super::compile::CompileOutcome;
    use super::*;
    use crate::data::{FeatureMatrix, TargetVector};
    use crate::estimate::OlsEngine;
    use ndarray::{Array1, Array2};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Records every pass and writes the PDF only on the pass given.
    struct FakeCompiler {
        write_on_pass: Option<usize>,
        calls: Mutex<Vec<PathBuf>>,
    }

    impl FakeCompiler {
        fn new(write_on_pass: Option<usize>) -> Self {
            Self {
                write_on_pass,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl DocumentCompiler for Arc<FakeCompiler> {
        fn compile(&self, source: &Path, workdir: &Path) -> Result<CompileOutcome, RenderError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(workdir.to_path_buf());
            let pass = calls.len();
            for kind in visualize::PlotKind::ALL {
                assert!(workdir.join(kind.file_name()).is_file());
            }
            assert!(source.is_file());
            if self.write_on_pass == Some(pass) {
                fs::write(workdir.join(DOCUMENT_FILE), b"%PDF-1.5 fake").unwrap();
            }
            Ok(CompileOutcome {
                success: pass == 2,
                log: format!("pass {pass}"),
            })
        }
    }

    fn small_config() -> RenderConfig {
        let mut config = RenderConfig::default();
        config.plot.width = 320;
        config.plot.height = 240;
        config.plot.heatmap_size = 240;
        config
    }

    fn fitted() -> (RegressionResult, Vec<String>) {
        let n = 12;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            if j == 0 { i as f64 } else { ((3 * i) % 5) as f64 }
        });
        let y: Array1<f64> = (0..n)
            .map(|i| 4.0 - x[[i, 0]] + 2.0 * x[[i, 1]] + ((i * 13) % 7) as f64 * 0.1)
            .collect();
        let names = vec!["price".to_string(), "promo".to_string()];
        let features = FeatureMatrix::new(names.clone(), x).unwrap();
        let result = OlsEngine::new()
            .fit(&features, &TargetVector::new("sales", y))
            .unwrap();
        (result, names)
    }

    #[test]
    fn formats_parse_with_aliases() {
        assert_eq!("PDF".parse::<ReportFormat>().unwrap(), ReportFormat::Document);
        assert_eq!("latex".parse::<ReportFormat>().unwrap(), ReportFormat::TypesettingSource);
        assert_eq!(
            "typesetting-source".parse::<ReportFormat>().unwrap(),
            ReportFormat::TypesettingSource
        );
        assert_eq!("xlsx".parse::<ReportFormat>().unwrap(), ReportFormat::Spreadsheet);
        assert!(matches!(
            "docx".parse::<ReportFormat>(),
            Err(ValidationError::UnsupportedFormat(f)) if f == "docx"
        ));
    }

    #[test]
    fn unsupported_format_name_is_a_validation_error() {
        let (result, names) = fitted();
        let renderer = ReportRenderer::new(small_config());
        let err = renderer
            .render_named(&result, "html", "sales", &names)
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::Validation(ValidationError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn typesetting_source_references_all_figures() {
        let (result, names) = fitted();
        let artifact = ReportRenderer::new(small_config())
            .render(&result, ReportFormat::TypesettingSource, "sales", &names)
            .unwrap();
        assert_eq!(artifact.file_extension(), "tex");
        let text = String::from_utf8(artifact.into_bytes()).unwrap();

        let mut last = 0;
        for kind in visualize::PlotKind::ALL {
            let at = text.find(kind.file_name()).unwrap();
            assert!(at > last, "{} out of order", kind.file_name());
            last = at;
        }
    }

    #[test]
    fn document_is_compiled_twice_in_one_scratch_dir() {
        let (result, names) = fitted();
        let fake = Arc::new(FakeCompiler::new(Some(2)));
        let renderer = ReportRenderer::with_compiler(small_config(), Box::new(Arc::clone(&fake)));

        let artifact = renderer
            .render(&result, ReportFormat::Document, "sales", &names)
            .unwrap();
        assert_eq!(artifact.bytes(), b"%PDF-1.5 fake");
        assert_eq!(artifact.mime_type(), "application/pdf");

        let calls = fake.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], calls[1]);
        assert!(!calls[0].exists(), "scratch directory was not removed");
    }

    #[test]
    fn missing_output_fails_and_cleans_up() {
        let (result, names) = fitted();
        let fake = Arc::new(FakeCompiler::new(None));
        let renderer = ReportRenderer::with_compiler(small_config(), Box::new(Arc::clone(&fake)));

        let err = renderer
            .render(&result, ReportFormat::Document, "sales", &names)
            .unwrap_err();
        match err {
            RenderError::CompilerOutputMissing { passes, diagnostics } => {
                assert_eq!(passes, 2);
                assert_eq!(diagnostics, "pass 2");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!fake.calls.lock().unwrap()[0].exists());
    }

    #[test]
    fn undersized_heatmap_is_an_error_not_a_panic() {
        let (result, names) = fitted();
        let mut config = small_config();
        config.plot.heatmap_size = 32;
        let renderer = ReportRenderer::new(config.clone());
        let err = renderer
            .render(&result, ReportFormat::TypesettingSource, "sales", &names)
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::Config(config::ConfigError::Invalid {
                key: "plot.heatmap_size",
                ..
            })
        ));

        let err = VisualizationGenerator::new(&config.plot)
            .render(&result, "sales")
            .unwrap_err();
        assert!(matches!(err, RenderError::Config(_)));
    }

    #[test]
    fn unsafe_preamble_option_is_rejected() {
        let (result, names) = fitted();
        let mut config = small_config();
        config.document.paper = "a4paper]{geometry}\\usepackage{shellesc".to_string();
        let err = ReportRenderer::new(config)
            .render(&result, ReportFormat::TypesettingSource, "sales", &names)
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::Config(config::ConfigError::Invalid {
                key: "document.paper",
                ..
            })
        ));
    }

    #[test]
    fn artifact_writes_to_disk() {
        let (result, names) = fitted();
        let artifact = ReportRenderer::new(small_config())
            .render(&result, ReportFormat::Spreadsheet, "sales", &names)
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("report.{}", artifact.file_extension()));
        artifact.write_to(&path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), artifact.bytes());
    }

    #[test]
    fn tail_respects_char_boundaries() {
        assert_eq!(tail("short", 10), "short");
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("aé", 1), "");
    }
}
