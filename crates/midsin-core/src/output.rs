//! Rendering of results for stdout.

use midsin_common::{ErrorReport, SCHEMA_VERSION};
use serde::Serialize;
use serde_json::Value;

use crate::curves::{dose_response, posterior_plot, DoseResponseCurve, PosteriorPlot, DEFAULT_CURVE_POINTS};
use crate::evaluate::{ResultRecord, ResultSummary};
use crate::records::RowFailure;

/// Top-level JSON document for a command.
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize> {
    pub schema_version: &'static str,
    pub run_id: &'a str,
    pub command: &'a str,
    pub results: &'a [T],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorReport>,
}

impl<'a, T: Serialize> Envelope<'a, T> {
    pub fn new(run_id: &'a str, command: &'a str, results: &'a [T]) -> Self {
        Envelope {
            schema_version: SCHEMA_VERSION,
            run_id,
            command,
            results,
            errors: Vec::new(),
        }
    }

    pub fn with_failures(mut self, failures: &[RowFailure]) -> Self {
        self.errors = failures.iter().map(failure_report).collect();
        self
    }
}

pub fn failure_report(failure: &RowFailure) -> ErrorReport {
    let mut report = ErrorReport::from(&failure.error).with_context("line", failure.line);
    if let Some(label) = failure.label.as_deref().filter(|l| !l.is_empty()) {
        report = report.with_context("label", label);
    }
    report
}

/// How much of each result goes into JSON output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Detail {
    /// Full record with the tabulated posterior instead of the summary.
    pub posterior: bool,
    pub plots: bool,
}

#[derive(Debug, Serialize)]
pub struct PlotData {
    pub posterior: PosteriorPlot,
    pub dose_response: DoseResponseCurve,
}

impl PlotData {
    pub fn for_record(record: &ResultRecord) -> Self {
        PlotData {
            posterior: posterior_plot(record),
            dose_response: dose_response(record, DEFAULT_CURVE_POINTS),
        }
    }
}

/// JSON value of one result at the requested detail.
pub fn result_value(record: &ResultRecord, detail: Detail) -> serde_json::Result<Value> {
    let mut value = if detail.posterior {
        serde_json::to_value(record)?
    } else {
        serde_json::to_value(record.to_summary())?
    };
    if detail.plots {
        if let Value::Object(map) = &mut value {
            map.insert("plots".to_string(), serde_json::to_value(PlotData::for_record(record))?);
        }
    }
    Ok(value)
}

fn fixed(v: f64, digits: usize) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else {
        format!("{:.*}", digits, v)
    }
}

fn percent(coverage: f64) -> String {
    crate::records::format_value((coverage * 100.0 * 1e6).round() / 1e6)
}

/// `example: mode 8.983 [68% 8.86, 9.09] [95% 8.73, 9.20] RM 10.194 SK 10.188`
pub fn summary_line(summary: &ResultSummary) -> String {
    let label = summary.label.as_deref().unwrap_or("-");
    if summary.state.is_degenerate() {
        return format!("{}: {} (limit of detection)", label, summary.state);
    }
    let mut line = format!("{}: mode {}", label, fixed(summary.mode, 3));
    for ci in &summary.intervals {
        line.push_str(&format!(
            " [{}% {}, {}]",
            percent(ci.coverage),
            fixed(ci.lower, 2),
            fixed(ci.upper, 2)
        ));
    }
    line.push_str(&format!(
        " RM {} SK {}",
        fixed(summary.reed_muench, 3),
        fixed(summary.spearman_kaerber, 3)
    ));
    line
}

pub fn render_summary(records: &[ResultRecord]) -> String {
    let mut out = String::new();
    for rec in records {
        out.push_str(&summary_line(&rec.to_summary()));
        out.push('\n');
    }
    out
}

/// Markdown table, one assay per row. Interval columns follow the first
/// record's coverages.
pub fn render_markdown(records: &[ResultRecord]) -> String {
    let coverages: Vec<f64> = records
        .first()
        .map(|r| r.posterior.coverages.clone())
        .unwrap_or_default();

    let mut header = vec![
        "Label".to_string(),
        "State".to_string(),
        "Mode".to_string(),
    ];
    for &c in &coverages {
        header.push(format!("{}% CI", percent(c)));
    }
    header.push("RM".to_string());
    header.push("SK".to_string());

    let mut out = String::new();
    out.push_str(&format!("| {} |\n", header.join(" | ")));
    out.push_str(&format!("|{}\n", "---|".repeat(header.len())));

    for rec in records {
        let s = rec.to_summary();
        let mut cells = vec![
            s.label.clone().unwrap_or_default(),
            s.state.to_string(),
            fixed(s.mode, 3),
        ];
        for ci in &s.intervals {
            cells.push(format!("{} to {}", fixed(ci.lower, 2), fixed(ci.upper, 2)));
        }
        cells.push(fixed(s.reed_muench, 3));
        cells.push(fixed(s.spearman_kaerber, 3));
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    out
}

pub fn render_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

/// One compact JSON document per item.
pub fn render_jsonl<T: Serialize>(items: &[T]) -> serde_json::Result<String> {
    let mut out = String::new();
    for item in items {
        out.push_str(&serde_json::to_string(item)?);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::evaluate_default;
    use crate::records::example_input;

    #[test]
    fn summary_line_lists_every_interval() {
        let rec = evaluate_default(&example_input()).unwrap();
        let line = summary_line(&rec.to_summary());
        assert!(line.starts_with("example: mode "), "{}", line);
        assert!(line.contains("[68% "));
        assert!(line.contains("[95% "));
        assert!(line.contains(" SK 10.18"), "{}", line);
    }

    #[test]
    fn summary_line_for_degenerate_assay() {
        let mut input = example_input();
        input.infected_wells = vec![8; 11];
        let rec = evaluate_default(&input).unwrap();
        assert_eq!(summary_line(&rec.to_summary()), "example: full (limit of detection)");
    }

    #[test]
    fn markdown_table_shape() {
        let rec = evaluate_default(&example_input()).unwrap();
        let md = render_markdown(&[rec.clone(), rec]);
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "| Label | State | Mode | 68% CI | 95% CI | RM | SK |");
        assert_eq!(lines[1], "|---|---|---|---|---|---|---|");
        assert!(lines[2].starts_with("| example | normal | "));
    }

    #[test]
    fn jsonl_is_one_line_per_item() {
        let rec = evaluate_default(&example_input()).unwrap();
        let out = render_jsonl(&[rec.to_summary(), rec.to_summary()]).unwrap();
        assert_eq!(out.lines().count(), 2);
        for line in out.lines() {
            let v: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(v["state"], "normal");
        }
    }

    #[test]
    fn result_value_detail_levels() {
        let rec = evaluate_default(&example_input()).unwrap();

        let summary = result_value(&rec, Detail::default()).unwrap();
        assert!(summary.get("grid").is_none());
        assert!(summary.get("plots").is_none());
        assert_eq!(summary["intervals"].as_array().unwrap().len(), 2);

        let full = result_value(
            &rec,
            Detail {
                posterior: true,
                plots: true,
            },
        )
        .unwrap();
        assert_eq!(full["grid"].as_array().unwrap().len(), rec.posterior.grid.len());
        assert_eq!(
            full["plots"]["dose_response"]["log_dilutions"].as_array().unwrap().len(),
            DEFAULT_CURVE_POINTS
        );
        assert_eq!(full["plots"]["posterior"]["limit_of_detection"], false);
    }

    #[test]
    fn envelope_carries_version_and_errors() {
        let failures = vec![RowFailure {
            line: 4,
            label: Some("bad".to_string()),
            error: midsin_common::Error::MalformedRecord {
                line: 4,
                message: "missing '#'".to_string(),
            },
        }];
        let results: Vec<ResultSummary> = Vec::new();
        let env = Envelope::new("run-test", "batch", &results).with_failures(&failures);
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v["schema_version"], SCHEMA_VERSION);
        assert_eq!(v["errors"][0]["code"], 12);
        assert_eq!(v["errors"][0]["context"]["line"], 4);
        assert_eq!(v["errors"][0]["context"]["label"], "bad");
    }
}
