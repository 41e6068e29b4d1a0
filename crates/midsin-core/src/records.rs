//! Batch CSV layout.
//!
//! One assay per row:
//!
//! ```text
//! label, volume, min dilution, dilution factor, total..., #, infected..., #, comments...
//! ```
//!
//! Header rows are recognized by their column labels and comment rows by a
//! leading `#`; both are echoed. Evaluated rows get the mode, the interval
//! bounds and the classical estimates appended.

use std::io::{Read, Write};

use midsin_config::EstimatorSettings;
use thiserror::Error;
use tracing::{info, warn};

use crate::assay::AssayInput;
use crate::evaluate::{evaluate_batch, ResultRecord};
use crate::logging::{event_names, Stage};

pub const LABEL_NAME: &str = "Label";
pub const LABEL_VOLUME: &str = "Well volume (in mL)";
pub const LABEL_MIN_DILUTION: &str = "Starting dilution";
pub const LABEL_DILUTION_FACTOR: &str = "Dilution factor";
pub const LABEL_TOTAL: &str = "# wells total";
pub const LABEL_INFECTED: &str = "# wells infected";
pub const LABEL_COMMENTS: &str = "Comment (optional)";

pub const LABEL_MODE: &str = "mode log10(SIN/mL)";
pub const LABEL_RM: &str = "RM log10(TCID50/mL)";
pub const LABEL_SK: &str = "SK log10(TCID50/mL)";

/// Ends each list of well counts.
pub const SEPARATOR: &str = "#";

/// Input files quote with `|` so commas can appear in labels.
const QUOTE: u8 = b'|';

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("line {line}: expected label, volume, dilution and factor, found {found} cells")]
    TooShort { line: usize, found: usize },

    #[error("line {line}: missing '#' after the {after} well counts")]
    MissingSeparator { line: usize, after: &'static str },

    #[error("line {line}: {field} is not a number: {value:?}")]
    NotANumber {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("line {line}: {total} total-well counts but {infected} infected-well counts")]
    CountMismatch {
        line: usize,
        total: usize,
        infected: usize,
    },

    #[error("line {line}: {message}")]
    Csv { line: usize, message: String },
}

impl RecordError {
    pub fn line(&self) -> usize {
        match self {
            RecordError::TooShort { line, .. }
            | RecordError::MissingSeparator { line, .. }
            | RecordError::NotANumber { line, .. }
            | RecordError::CountMismatch { line, .. }
            | RecordError::Csv { line, .. } => *line,
        }
    }

    /// The message without its `line N:` prefix.
    fn detail(&self) -> String {
        let full = self.to_string();
        let prefix = format!("line {}: ", self.line());
        match full.strip_prefix(&prefix) {
            Some(rest) => rest.to_string(),
            None => full,
        }
    }

    fn from_csv(err: csv::Error, fallback_line: usize) -> Self {
        let line = err
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(fallback_line);
        RecordError::Csv {
            line,
            message: err.to_string(),
        }
    }
}

impl From<RecordError> for midsin_common::Error {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Csv { message, .. } => midsin_common::Error::Csv(message),
            other => midsin_common::Error::MalformedRecord {
                line: other.line(),
                message: other.detail(),
            },
        }
    }
}

/// One input row, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Header {
        line: usize,
        cells: Vec<String>,
    },
    /// Comment or blank row.
    Comment {
        line: usize,
        cells: Vec<String>,
    },
    Assay {
        line: usize,
        cells: Vec<String>,
        input: Result<AssayInput, RecordError>,
    },
}

impl Row {
    pub fn line(&self) -> usize {
        match self {
            Row::Header { line, .. } | Row::Comment { line, .. } | Row::Assay { line, .. } => *line,
        }
    }

    pub fn cells(&self) -> &[String] {
        match self {
            Row::Header { cells, .. } | Row::Comment { cells, .. } | Row::Assay { cells, .. } => {
                cells
            }
        }
    }
}

fn is_header(cells: &[String]) -> bool {
    cells.iter().any(|c| c.trim() == LABEL_VOLUME)
        || cells.first().is_some_and(|c| c.contains(LABEL_NAME))
}

fn is_comment(cells: &[String]) -> bool {
    cells.iter().all(|c| c.trim().is_empty())
        || cells.first().is_some_and(|c| c.trim_start().starts_with(SEPARATOR))
}

/// Read and classify every row. Only unreadable CSV is an error here;
/// malformed assay rows are reported per row.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<Row>, RecordError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quote(QUOTE)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (index, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| RecordError::from_csv(e, index + 1))?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(index + 1);
        let cells: Vec<String> = record.iter().map(str::to_string).collect();

        let row = if is_header(&cells) {
            Row::Header { line, cells }
        } else if is_comment(&cells) {
            Row::Comment { line, cells }
        } else {
            let input = parse_assay_row(line, &cells);
            Row::Assay { line, cells, input }
        };
        rows.push(row);
    }
    Ok(rows)
}

fn parse_number(line: usize, field: &'static str, value: &str) -> Result<f64, RecordError> {
    value.trim().parse::<f64>().map_err(|_| RecordError::NotANumber {
        line,
        field,
        value: value.to_string(),
    })
}

fn parse_counts(line: usize, field: &'static str, cells: &[String]) -> Result<Vec<u32>, RecordError> {
    cells
        .iter()
        .map(|c| {
            c.trim().parse::<u32>().map_err(|_| RecordError::NotANumber {
                line,
                field,
                value: c.clone(),
            })
        })
        .collect()
}

fn separator_after(cells: &[String], start: usize) -> Option<usize> {
    cells
        .get(start..)?
        .iter()
        .position(|c| c.trim() == SEPARATOR)
        .map(|i| start + i)
}

/// Parse the cells of one assay row.
pub fn parse_assay_row(line: usize, cells: &[String]) -> Result<AssayInput, RecordError> {
    if cells.len() < 4 {
        return Err(RecordError::TooShort {
            line,
            found: cells.len(),
        });
    }
    let inoculum_volume = parse_number(line, "well volume", &cells[1])?;
    let min_dilution = parse_number(line, "starting dilution", &cells[2])?;
    let dilution_factor = parse_number(line, "dilution factor", &cells[3])?;

    let total_end = separator_after(cells, 4).ok_or(RecordError::MissingSeparator {
        line,
        after: "total",
    })?;
    let infected_end = separator_after(cells, total_end + 1).ok_or(RecordError::MissingSeparator {
        line,
        after: "infected",
    })?;
    let total_wells = parse_counts(line, "total wells", &cells[4..total_end])?;
    let infected_wells = parse_counts(line, "infected wells", &cells[total_end + 1..infected_end])?;
    if total_wells.len() != infected_wells.len() {
        return Err(RecordError::CountMismatch {
            line,
            total: total_wells.len(),
            infected: infected_wells.len(),
        });
    }

    let label = cells[0].trim();
    Ok(AssayInput {
        label: (!label.is_empty()).then(|| label.to_string()),
        inoculum_volume,
        min_dilution,
        dilution_factor,
        total_wells,
        infected_wells,
    })
}

/// `nan` for NaN, otherwise the shortest exact representation.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else {
        v.to_string()
    }
}

fn coverage_percent(coverage: f64) -> String {
    format_value((coverage * 100.0 * 1e6).round() / 1e6)
}

/// Labels of the appended result columns.
pub fn output_labels(coverages: &[f64]) -> Vec<String> {
    let mut labels = vec![LABEL_MODE.to_string()];
    for &c in coverages {
        let pct = coverage_percent(c);
        labels.push(format!("{}%CI-lo log10(SIN/mL)", pct));
        labels.push(format!("{}%CI-hi log10(SIN/mL)", pct));
    }
    labels.push(LABEL_RM.to_string());
    labels.push(LABEL_SK.to_string());
    labels
}

pub fn output_header(cells: &[String], coverages: &[f64]) -> Vec<String> {
    let mut out = cells.to_vec();
    out.extend(output_labels(coverages));
    out
}

pub fn output_row(cells: &[String], record: &ResultRecord) -> Vec<String> {
    let mut out = cells.to_vec();
    out.push(format_value(record.posterior.mode));
    out.extend(record.posterior.credible_intervals.iter().map(|&v| format_value(v)));
    out.push(format_value(record.reed_muench));
    out.push(format_value(record.spearman_kaerber));
    out
}

/// Write rows of varying length.
pub fn write_rows<W: Write>(writer: W, rows: &[Vec<String>]) -> Result<(), RecordError> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    for (i, row) in rows.iter().enumerate() {
        wtr.write_record(row)
            .map_err(|e| RecordError::from_csv(e, i + 1))?;
    }
    wtr.flush().map_err(|e| RecordError::Csv {
        line: rows.len(),
        message: e.to_string(),
    })
}

/// Header and result row for assays that did not come from a file.
pub fn result_table(inputs: &[AssayInput], records: &[ResultRecord], coverages: &[f64]) -> Vec<Vec<String>> {
    let columns = inputs.first().map_or(0, |i| i.total_wells.len());
    let mut rows = vec![output_header(&input_header(columns), coverages)];
    for (input, record) in inputs.iter().zip(records) {
        rows.push(output_row(&input_row(input, ""), record));
    }
    rows
}

/// Header of an input file with `dilutions` count columns per block.
pub fn input_header(dilutions: usize) -> Vec<String> {
    let mut header: Vec<String> = [LABEL_NAME, LABEL_VOLUME, LABEL_MIN_DILUTION, LABEL_DILUTION_FACTOR]
        .iter()
        .map(|s| s.to_string())
        .collect();
    header.push(LABEL_TOTAL.to_string());
    header.extend(std::iter::repeat_n(String::new(), dilutions));
    header.push(LABEL_INFECTED.to_string());
    header.extend(std::iter::repeat_n(String::new(), dilutions));
    header.push(LABEL_COMMENTS.to_string());
    header
}

pub fn input_row(input: &AssayInput, comment: &str) -> Vec<String> {
    let mut row = vec![
        input.label.clone().unwrap_or_default(),
        format_value(input.inoculum_volume),
        format_value(input.min_dilution),
        format_value(input.dilution_factor),
    ];
    row.extend(input.total_wells.iter().map(u32::to_string));
    row.push(SEPARATOR.to_string());
    row.extend(input.infected_wells.iter().map(u32::to_string));
    row.push(SEPARATOR.to_string());
    row.push(comment.to_string());
    row
}

/// The built-in example assay.
pub fn example_input() -> AssayInput {
    AssayInput {
        label: Some("example".to_string()),
        inoculum_volume: 0.1,
        min_dilution: 0.01,
        dilution_factor: 0.1,
        total_wells: vec![8; 11],
        infected_wells: vec![8, 8, 8, 8, 8, 7, 7, 5, 2, 0, 0],
    }
}

/// Header plus one row to fill in. The default layout carries the example.
pub fn template_rows(dilutions: usize, replicates: u32) -> Vec<Vec<String>> {
    let example = example_input();
    let row = if dilutions == example.total_wells.len() && example.total_wells.iter().all(|&n| n == replicates) {
        input_row(&example, "")
    } else {
        let blank = AssayInput {
            label: Some("sample".to_string()),
            total_wells: vec![replicates; dilutions],
            infected_wells: vec![0; dilutions],
            ..example
        };
        input_row(&blank, "")
    };
    vec![input_header(dilutions), row]
}

/// A row that could not be turned into a result.
#[derive(Debug)]
pub struct RowFailure {
    pub line: usize,
    pub label: Option<String>,
    pub error: midsin_common::Error,
}

/// Everything produced from one input file.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Echoed input with results appended, in input order.
    pub csv_rows: Vec<Vec<String>>,
    pub records: Vec<ResultRecord>,
    pub failures: Vec<RowFailure>,
}

impl BatchOutcome {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Evaluate every assay row; failed rows are reported and left out.
pub fn evaluate_rows(rows: &[Row], settings: &EstimatorSettings) -> BatchOutcome {
    let inputs: Vec<AssayInput> = rows
        .iter()
        .filter_map(|row| match row {
            Row::Assay { input: Ok(input), .. } => Some(input.clone()),
            _ => None,
        })
        .collect();
    let mut results = evaluate_batch(&inputs, settings).into_iter();

    let mut outcome = BatchOutcome::default();
    for row in rows {
        match row {
            Row::Header { cells, .. } => {
                outcome.csv_rows.push(output_header(cells, &settings.coverages));
            }
            Row::Comment { cells, .. } => outcome.csv_rows.push(cells.clone()),
            Row::Assay { line, cells, input } => {
                let result = match input {
                    Ok(_) => match results.next() {
                        Some(r) => r.map_err(midsin_common::Error::from),
                        None => Err(midsin_common::Error::Internal(format!(
                            "line {}: no result for assay row",
                            line
                        ))),
                    },
                    Err(e) => Err(e.clone().into()),
                };
                match result {
                    Ok(record) => {
                        outcome.csv_rows.push(output_row(cells, &record));
                        outcome.records.push(record);
                    }
                    Err(error) => {
                        warn!(
                            target: event_names::BATCH_ROW_FAILED,
                            stage = %Stage::Parse,
                            line = *line,
                            error = %error,
                            "skipping row"
                        );
                        outcome.failures.push(RowFailure {
                            line: *line,
                            label: cells.first().map(|c| c.trim().to_string()),
                            error,
                        });
                    }
                }
            }
        }
    }

    info!(
        target: event_names::BATCH_FINISHED,
        stage = %Stage::Output,
        evaluated = outcome.records.len(),
        failed = outcome.failures.len(),
        "batch finished"
    );
    outcome
}
