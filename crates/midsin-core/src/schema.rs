//! JSON Schema generation for output types.
//!
//! ```bash
//! midsin schema --list
//! midsin schema ResultRecord
//! midsin schema --all --compact
//! ```

use schemars::schema_for;
use serde_json::Value;
use std::collections::BTreeMap;

pub use crate::assay::{AssayInput, AssayState};
pub use crate::curves::{DoseResponseCurve, PosteriorPlot};
pub use crate::evaluate::{ResultRecord, ResultSummary};
pub use crate::posterior::{CredibleInterval, PosteriorSample};
pub use midsin_common::ErrorReport;

/// Available schema types with their descriptions.
pub fn available_schemas() -> Vec<(&'static str, &'static str)> {
    vec![
        ("AssayInput", "Raw assay: volume, dilution series and well counts"),
        ("AssayState", "normal, empty or full"),
        ("ResultRecord", "Complete evaluation of one assay"),
        ("ResultSummary", "Point and interval estimates without the posterior grid"),
        ("PosteriorSample", "Tabulated posterior with mode, mean and intervals"),
        ("CredibleInterval", "Narrowest interval at one coverage"),
        ("PosteriorPlot", "Plot data for the posterior panel"),
        ("DoseResponseCurve", "Plot data for the infected-wells panel"),
        ("ErrorReport", "Structured error for machine output"),
    ]
}

/// Generate the JSON Schema for a type by name.
pub fn generate_schema(name: &str) -> Option<Value> {
    let schema = match name {
        "AssayInput" => schema_for!(AssayInput),
        "AssayState" => schema_for!(AssayState),
        "ResultRecord" => schema_for!(ResultRecord),
        "ResultSummary" => schema_for!(ResultSummary),
        "PosteriorSample" => schema_for!(PosteriorSample),
        "CredibleInterval" => schema_for!(CredibleInterval),
        "PosteriorPlot" => schema_for!(PosteriorPlot),
        "DoseResponseCurve" => schema_for!(DoseResponseCurve),
        "ErrorReport" => schema_for!(ErrorReport),
        _ => return None,
    };
    serde_json::to_value(schema).ok()
}

/// Generate all schemas as a map from type name to schema.
pub fn generate_all_schemas() -> BTreeMap<String, Value> {
    let mut schemas = BTreeMap::new();
    for (name, _desc) in available_schemas() {
        if let Some(schema) = generate_schema(name) {
            schemas.insert(name.to_string(), schema);
        }
    }
    schemas
}

/// Schema output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    Json,
    JsonCompact,
}

pub fn format_schema(schema: &Value, format: SchemaFormat) -> serde_json::Result<String> {
    match format {
        SchemaFormat::Json => serde_json::to_string_pretty(schema),
        SchemaFormat::JsonCompact => serde_json::to_string(schema),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_schemas_generate() {
        for (name, _desc) in available_schemas() {
            assert!(generate_schema(name).is_some(), "schema for '{}'", name);
        }
    }

    #[test]
    fn test_unknown_schema_returns_none() {
        assert!(generate_schema("Plan").is_none());
        assert!(generate_schema("").is_none());
    }

    #[test]
    fn test_record_schema_lists_flattened_fields() {
        let schema = generate_schema("ResultRecord").unwrap();
        let props = schema["properties"].as_object().unwrap();
        for field in ["state", "grid", "cdf", "mode", "credible_intervals", "reed_muench"] {
            assert!(props.contains_key(field), "missing {}", field);
        }
    }

    #[test]
    fn test_input_schema_requires_counts() {
        let schema = generate_schema("AssayInput").unwrap();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert!(required.contains(&"total_wells"));
        assert!(required.contains(&"infected_wells"));
        assert!(!required.contains(&"label"));
    }

    #[test]
    fn test_format_schema() {
        let schema = generate_schema("CredibleInterval").unwrap();
        let pretty = format_schema(&schema, SchemaFormat::Json).unwrap();
        let compact = format_schema(&schema, SchemaFormat::JsonCompact).unwrap();
        assert!(pretty.contains('\n'));
        assert!(!compact.contains('\n'));
    }
}
