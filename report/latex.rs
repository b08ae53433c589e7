//! Composition of the LaTeX source of a report.

use super::config::DocumentConfig;
use super::visualize::Figure;
use crate::estimate::CONFIDENCE_LEVEL;
use crate::model::{ConfidenceInterval, CorrelationMatrix, RegressionResult, SIGNIFICANCE_LEVEL};
use itertools::Itertools;
use std::fmt::Write;

/// Correlations stronger than this are highlighted in the correlation table.
const STRONG_CORRELATION: f64 = 0.7;
/// Number of significant factors named in the interpretation.
const TOP_FACTORS: usize = 3;

/// Explanatory power of a fit, derived from its R².
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplanatoryPower {
    High,
    Moderate,
    Low,
}

impl ExplanatoryPower {
    pub fn from_r_squared(r_squared: f64) -> Self {
        if r_squared > 0.7 {
            ExplanatoryPower::High
        } else if r_squared > 0.5 {
            ExplanatoryPower::Moderate
        } else {
            ExplanatoryPower::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExplanatoryPower::High => "high",
            ExplanatoryPower::Moderate => "moderate",
            ExplanatoryPower::Low => "low",
        }
    }
}

/// Significant coefficients ordered by descending magnitude, at most `TOP_FACTORS`.
pub fn leading_factors(result: &RegressionResult) -> Vec<(&str, f64)> {
    let mut significant: Vec<(&str, f64)> = result
        .coefficients
        .iter()
        .filter(|(name, _)| result.is_significant(name))
        .map(|(name, &coef)| (name.as_str(), coef))
        .collect();
    significant.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
    significant.truncate(TOP_FACTORS);
    significant
}

/// Escapes the characters LaTeX treats specially in running text.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str(r"\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str(r"\textasciitilde{}"),
            '^' => out.push_str(r"\textasciicircum{}"),
            '<' => out.push_str(r"\textless{}"),
            '>' => out.push_str(r"\textgreater{}"),
            _ => out.push(c),
        }
    }
    out
}

/// Builds the complete document. Figures are referenced by their file names and
/// must be placed next to the source before compiling.
///
/// Package options from `config` go into the preamble as given, so `config`
/// should have passed [`DocumentConfig::validate`].
pub fn compose(
    result: &RegressionResult,
    target_name: &str,
    feature_names: &[String],
    figures: &[Figure],
    config: &DocumentConfig,
) -> String {
    let mut doc = String::new();
    preamble(&mut doc, config);
    model_description(&mut doc, result, target_name, feature_names);
    coefficient_table(&mut doc, result);
    figure_blocks(&mut doc, figures);
    correlation_table(&mut doc, &result.pearson_correlation);
    interpretation(&mut doc, result, target_name, feature_names);
    doc.push_str("\\end{document}\n");
    doc
}

fn preamble(doc: &mut String, config: &DocumentConfig) {
    let title = escape(&config.title);
    doc.push_str("\\documentclass{article}\n");
    let _ = writeln!(doc, "\\usepackage[{}]{{fontenc}}", config.font_encoding);
    doc.push_str("\\usepackage[utf8]{inputenc}\n");
    if let Some(language) = &config.babel_language {
        let _ = writeln!(doc, "\\usepackage[{language}]{{babel}}");
    }
    let _ = writeln!(
        doc,
        "\\usepackage[{}, margin={}]{{geometry}}",
        config.paper, config.margin
    );
    for package in [
        "amsmath", "amssymb", "xcolor", "graphicx", "float", "booktabs", "fancyhdr",
    ] {
        let _ = writeln!(doc, "\\usepackage{{{package}}}");
    }
    doc.push_str("\n\\pagestyle{fancy}\n\\fancyhf{}\n");
    let _ = writeln!(doc, "\\fancyhead[C]{{\\textbf{{{title}}}}}");
    doc.push_str("\\fancyfoot[C]{\\thepage}\n\\renewcommand{\\headrulewidth}{0.4pt}\n\n");
    doc.push_str("\\begin{document}\n\n");
    let _ = writeln!(doc, "\\begin{{center}}\n\\Large\\textbf{{{title}}}\n\\end{{center}}\n");
    if let Some(author) = &config.author {
        let _ = writeln!(doc, "\\textbf{{Author:}} {}\n", escape(author));
    }
    doc.push_str("\\textbf{Date:} \\today\n\n");
}

fn model_description(
    doc: &mut String,
    result: &RegressionResult,
    target_name: &str,
    feature_names: &[String],
) {
    let features = feature_names.iter().map(|name| escape(name)).join(", ");
    doc.push_str("\\section{Model Description}\n\n\\begin{itemize}\n");
    let _ = writeln!(doc, "  \\item Dependent variable: \\textbf{{{}}}", escape(target_name));
    let _ = writeln!(doc, "  \\item Independent variables: \\textbf{{{features}}}");
    let _ = writeln!(
        doc,
        "  \\item Coefficient of determination $R^2$: \\textbf{{{:.4}}}",
        result.r_squared
    );
    let _ = writeln!(
        doc,
        "  \\item Adjusted $R^2$: \\textbf{{{:.4}}}",
        result.adjusted_r_squared
    );
    let _ = writeln!(doc, "  \\item Mean squared error: \\textbf{{{:.4}}}", result.mse);
    let _ = writeln!(
        doc,
        "  \\item $F$-statistic: \\textbf{{{:.4}}} ($p = {}$)",
        result.f_statistic,
        format_p(result.f_p_value)
    );
    let _ = writeln!(doc, "  \\item Observations: \\textbf{{{}}}", result.n_observations);
    doc.push_str("\\end{itemize}\n\n");
}

fn coefficient_table(doc: &mut String, result: &RegressionResult) {
    let level = (CONFIDENCE_LEVEL * 100.0).round();
    doc.push_str("\\section{Regression Coefficients}\n\n\\begin{center}\n");
    doc.push_str("\\begin{tabular}{lcccc}\n\\toprule\n");
    let _ = writeln!(
        doc,
        "\\textbf{{Variable}} & \\textbf{{Coefficient}} & \\textbf{{P-value}} & \\textbf{{Significant ($p < {SIGNIFICANCE_LEVEL}$)}} & \\textbf{{{level}\\% CI}} \\\\"
    );
    doc.push_str("\\midrule\n");
    let _ = writeln!(doc, "Intercept & {:.4} & N/A & N/A & N/A \\\\", result.intercept);
    for (name, &coef) in result.coefficients.iter() {
        let p = result.p_values.get(name).copied().unwrap_or(f64::NAN);
        let flag = if result.is_significant(name) { "Yes" } else { "No" };
        let ci = result
            .confidence_intervals
            .get(name)
            .map_or_else(|| "N/A".to_string(), format_interval);
        let _ = writeln!(
            doc,
            "{} & {coef:.4} & {} & {flag} & {ci} \\\\",
            escape(name),
            format_p(p)
        );
    }
    doc.push_str("\\bottomrule\n\\end{tabular}\n\\end{center}\n\n");
}

fn figure_blocks(doc: &mut String, figures: &[Figure]) {
    doc.push_str("\\section{Diagnostic Plots}\n\n");
    for figure in figures {
        let label = figure
            .kind
            .file_name()
            .trim_end_matches(".png")
            .replace('_', "-");
        let _ = writeln!(
            doc,
            "\\begin{{figure}}[H]\n  \\centering\n  \\includegraphics[width=0.8\\textwidth]{{{}}}\n  \\caption{{{}}}\n  \\label{{fig:{label}}}\n\\end{{figure}}\n",
            figure.kind.file_name(),
            escape(&figure.caption)
        );
    }
}

fn correlation_table(doc: &mut String, matrix: &CorrelationMatrix) {
    let names: Vec<String> = matrix.names().iter().map(|n| escape(n)).collect();
    doc.push_str("\\section{Correlation Matrix}\n\n\\begin{center}\n");
    let _ = writeln!(doc, "\\begin{{tabular}}{{l{}}}", "c".repeat(names.len()));
    doc.push_str("\\toprule\n");
    let _ = writeln!(doc, " & {} \\\\", names.join(" & "));
    doc.push_str("\\midrule\n");
    let values = matrix.values();
    for (i, row_name) in names.iter().enumerate() {
        doc.push_str(row_name);
        for j in 0..names.len() {
            doc.push_str(" & ");
            doc.push_str(&format_correlation(values[[i, j]]));
        }
        doc.push_str(" \\\\\n");
    }
    doc.push_str("\\bottomrule\n\\end{tabular}\n\\end{center}\n\n");
}

fn interpretation(
    doc: &mut String,
    result: &RegressionResult,
    target_name: &str,
    feature_names: &[String],
) {
    let target = escape(target_name);
    let features = feature_names
        .iter()
        .map(|name| format!("\\textbf{{{}}}", escape(name)))
        .join(", ");
    let power = ExplanatoryPower::from_r_squared(result.r_squared);

    doc.push_str("\\section{Interpretation}\n\n");
    let _ = writeln!(
        doc,
        "The model describes the dependence of \\textbf{{{target}}} on {features}.\n"
    );
    let _ = writeln!(
        doc,
        "The coefficient of determination $R^2$ equals {:.4}, so {:.1}\\% of the variation of the dependent variable is explained by the independent variables in the model.\n",
        result.r_squared,
        result.r_squared * 100.0
    );
    let _ = writeln!(
        doc,
        "The mean squared error (MSE) is {:.4}, the average squared deviation of the observed values from the predicted ones.\n",
        result.mse
    );
    let _ = writeln!(
        doc,
        "\\subsection{{Conclusions}}\n\nThe model has {} explanatory power.\n",
        power.label()
    );

    let leading = leading_factors(result);
    if leading.is_empty() {
        let _ = writeln!(
            doc,
            "The analysis found no statistically significant factors ($p < {SIGNIFICANCE_LEVEL}$) affecting the dependent variable.\n"
        );
        return;
    }
    doc.push_str("The factors with the largest influence on the dependent variable are:\n\\begin{itemize}\n");
    for (name, coef) in leading {
        let _ = if coef == 0.0 {
            writeln!(
                doc,
                "  \\item \\textbf{{{}}}: leaves the dependent variable unchanged per unit change",
                escape(name)
            )
        } else {
            let direction = if coef > 0.0 { "increases" } else { "decreases" };
            writeln!(
                doc,
                "  \\item \\textbf{{{}}}: {direction} the dependent variable by {:.4} units per unit change",
                escape(name),
                coef.abs()
            )
        };
    }
    doc.push_str("\\end{itemize}\n\n");
}

fn format_p(p: f64) -> String {
    if p.is_nan() {
        "N/A".to_string()
    } else if p < 1e-4 {
        "$<$0.0001".to_string()
    } else {
        format!("{p:.4}")
    }
}

fn format_interval(ci: &ConfidenceInterval) -> String {
    format!("[{:.4}, {:.4}]", ci.lower, ci.upper)
}

fn format_correlation(r: f64) -> String {
    if r.is_nan() {
        "--".to_string()
    } else if r.abs() > STRONG_CORRELATION {
        let color = if r > 0.0 { "blue" } else { "red" };
        format!("\\textcolor{{{color}}}{{{r:.2}}}")
    } else {
        format!("{r:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FeatureMatrix, TargetVector};
    use crate::estimate::OlsEngine;
    use ndarray::Array2;

    fn fitted(noise: &[f64]) -> RegressionResult {
        let n = noise.len();
        let values = Array2::from_shape_fn((n, 2), |(i, j)| {
            if j == 0 { i as f64 } else { ((i * 7) % 5) as f64 }
        });
        let y = (0..n)
            .map(|i| 3.0 * values[[i, 0]] - 0.5 * values[[i, 1]] + noise[i])
            .collect();
        let x = FeatureMatrix::new(vec!["x_1".into(), "x2".into()], values).unwrap();
        let y = TargetVector::new("y", y);
        OlsEngine::new().fit(&x, &y).unwrap()
    }

    #[test]
    fn power_labels_follow_thresholds() {
        assert_eq!(ExplanatoryPower::from_r_squared(0.71).label(), "high");
        assert_eq!(ExplanatoryPower::from_r_squared(0.7).label(), "moderate");
        assert_eq!(ExplanatoryPower::from_r_squared(0.51).label(), "moderate");
        assert_eq!(ExplanatoryPower::from_r_squared(0.5).label(), "low");
    }

    #[test]
    fn escapes_special_characters() {
        assert_eq!(escape("a_b & 50%"), r"a\_b \& 50\%");
        assert_eq!(escape(r"x\y"), r"x\textbackslash{}y");
    }

    #[test]
    fn correlation_cells_are_highlighted() {
        assert_eq!(format_correlation(0.95), r"\textcolor{blue}{0.95}");
        assert_eq!(format_correlation(-0.8), r"\textcolor{red}{-0.80}");
        assert_eq!(format_correlation(0.3), "0.30");
        assert_eq!(format_correlation(f64::NAN), "--");
    }

    #[test]
    fn document_contains_every_section() {
        let noise = [0.1, -0.2, 0.05, 0.3, -0.1, 0.0, 0.2, -0.3, 0.1, -0.05, 0.15, -0.1];
        let result = fitted(&noise);
        let names = vec!["x_1".to_string(), "x2".to_string()];
        let tex = compose(&result, "y", &names, &[], &DocumentConfig::default());

        assert!(tex.starts_with("\\documentclass{article}"));
        assert!(tex.contains("\\usepackage[T1]{fontenc}"));
        assert!(!tex.contains("babel"));
        assert!(tex.contains("Dependent variable: \\textbf{y}"));
        assert!(tex.contains("Intercept & "));
        assert!(tex.contains("\nx\\_1 & "));
        assert!(tex.contains("\\section{Correlation Matrix}"));
        assert!(tex.contains("The model has high explanatory power."));
        assert!(tex.contains("\\textbf{x\\_1}: increases the dependent variable by "));
        assert!(tex.trim_end().ends_with("\\end{document}"));
    }

    #[test]
    fn no_significant_factors_is_stated() {
        let mut result = fitted(&[0.3, -0.1, 0.2, -0.4, 0.1, 0.0, -0.2, 0.3]);
        result.p_values = result
            .p_values
            .keys()
            .map(|name| (name.to_string(), 0.5))
            .collect();
        assert!(leading_factors(&result).is_empty());
        let tex = compose(&result, "y", &[], &[], &DocumentConfig::default());
        assert!(tex.contains("no statistically significant factors"));
    }

    #[test]
    fn zero_coefficient_has_no_direction() {
        let mut result = fitted(&[0.1, -0.2, 0.05, 0.3, -0.1, 0.0, 0.2, -0.3, 0.1, -0.05]);
        result.coefficients.insert("x2".to_string(), 0.0);
        result.p_values.insert("x2".to_string(), 0.001);
        let tex = compose(&result, "y", &[], &[], &DocumentConfig::default());
        assert!(tex.contains("\\textbf{x2}: leaves the dependent variable unchanged"));
        assert!(!tex.contains("\\textbf{x2}: decreases"));
        assert!(tex.contains("\\textbf{x\\_1}: increases"));
    }

    #[test]
    fn babel_language_is_configurable() {
        let result = fitted(&[0.3, -0.1, 0.2, -0.4, 0.1, 0.0, -0.2, 0.3]);
        let config = DocumentConfig {
            babel_language: Some("ukrainian".into()),
            font_encoding: "T2A".into(),
            ..DocumentConfig::default()
        };
        let tex = compose(&result, "y", &[], &[], &config);
        assert!(tex.contains("\\usepackage[ukrainian]{babel}"));
        assert!(tex.contains("\\usepackage[T2A]{fontenc}"));
    }
}
