//! Console summary of a completed run.

use crate::metrics::CorrelationMatrix;
use crate::pipeline::AnalysisOutcome;
use std::fmt::Write as _;

/// Print the report to stdout.
pub fn print_report(outcome: &AnalysisOutcome) {
    print!("{}", format_report(outcome));
}

/// Sharpe ratios, the correlation matrix and a pointer to the output files.
pub fn format_report(outcome: &AnalysisOutcome) -> String {
    let mut out = String::new();

    out.push_str("\nSharpe Ratios:\n");
    for entry in &outcome.metrics.sharpe {
        let _ = writeln!(out, "{}: {}", entry.ticker, format_value(entry.sharpe));
    }

    out.push_str("\nCorrelation Matrix:\n");
    out.push_str(&format_matrix(&outcome.metrics.correlation));

    let dir_of = |p: &std::path::Path| {
        p.parent()
            .map(|d| d.display().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| ".".to_string())
    };
    let _ = writeln!(
        out,
        "\nAnalysis complete. Check '{}/' for cleaned data and '{}/' for visualizations.",
        dir_of(&outcome.cleaned_csv),
        dir_of(&outcome.cumulative_returns_plot)
    );
    out
}

/// Right-aligned table with ticker headers on both axes.
pub fn format_matrix(matrix: &CorrelationMatrix) -> String {
    let label_w = matrix.tickers.iter().map(String::len).max().unwrap_or(0);
    let cell_w = label_w.max(7);

    let mut out = String::new();
    let _ = write!(out, "{:label_w$}", "");
    for t in &matrix.tickers {
        let _ = write!(out, "  {t:>cell_w$}");
    }
    out.push('\n');

    for (t, row) in matrix.tickers.iter().zip(&matrix.values) {
        let _ = write!(out, "{t:<label_w$}");
        for v in row {
            let _ = write!(out, "  {:>cell_w$}", format_value(*v));
        }
        out.push('\n');
    }
    out
}

fn format_value(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.4}")
    } else {
        "NaN".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> CorrelationMatrix {
        CorrelationMatrix {
            tickers: vec!["AMZN".into(), "META".into(), "^GSPC".into()],
            values: vec![
                vec![1.0, 0.5512, 0.7123],
                vec![0.5512, 1.0, 0.6801],
                vec![0.7123, 0.6801, 1.0],
            ],
        }
    }

    #[test]
    fn matrix_rows_are_aligned() {
        let table = format_matrix(&matrix());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "          AMZN     META    ^GSPC");
        assert_eq!(lines[1], "AMZN    1.0000   0.5512   0.7123");
        assert_eq!(lines[3], "^GSPC   0.7123   0.6801   1.0000");
        assert!(lines.iter().all(|l| l.len() == lines[0].len()));
    }

    #[test]
    fn undefined_values_print_as_nan() {
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(0.123456), "0.1235");
        assert_eq!(format_value(-1.0), "-1.0000");
    }
}
