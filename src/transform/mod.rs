//! Conversion between structured-data representations.
//!
//! Supported pairs form a fixed matrix: JSON to XML, CSV and YAML text, and
//! CSV text back to JSON. XML-to-JSON and YAML-to-JSON are known gaps and
//! fail with [`FormatConversionError::NotImplemented`] rather than silently
//! returning an empty result.

use serde_json::{Map as JsonMap, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Xml,
    Csv,
    Yaml,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
            Format::Csv => "csv",
            Format::Yaml => "yaml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = FormatConversionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "json" => Ok(Format::Json),
            "xml" => Ok(Format::Xml),
            "csv" => Ok(Format::Csv),
            "yaml" => Ok(Format::Yaml),
            other => Err(FormatConversionError::UnknownFormat {
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum FormatConversionError {
    #[error("transformation from {from} to {to} is not supported")]
    Unsupported { from: Format, to: Format },

    #[error("transformation from {from} to {to} is not implemented")]
    NotImplemented { from: Format, to: Format },

    #[error("unknown data format '{value}'")]
    UnknownFormat { value: String },

    #[error("malformed conversion input: {reason}")]
    MalformedInput { reason: String },
}

/// Apply the converter registered for the `from -> to` pair.
///
/// Textual formats travel as `Value::String`; tree data as any other
/// `Value`. Purely synchronous, no I/O.
pub fn transform_data(
    data: Value,
    from: Format,
    to: Format,
) -> Result<Value, FormatConversionError> {
    match (from, to) {
        (Format::Json, Format::Xml) => Ok(Value::String(json_to_xml(&data, "root"))),
        (Format::Json, Format::Csv) => json_to_csv(&data).map(Value::String),
        (Format::Json, Format::Yaml) => Ok(Value::String(json_to_yaml(&data, 0))),
        (Format::Csv, Format::Json) => {
            let text = expect_text(&data, from)?;
            Ok(csv_to_json(text))
        }
        (Format::Xml, Format::Json) | (Format::Yaml, Format::Json) => {
            Err(FormatConversionError::NotImplemented { from, to })
        }
        (from, to) => Err(FormatConversionError::Unsupported { from, to }),
    }
}

fn expect_text(data: &Value, from: Format) -> Result<&str, FormatConversionError> {
    data.as_str().ok_or_else(|| FormatConversionError::MalformedInput {
        reason: format!("{from} input must be a string"),
    })
}

/// Tag-delimited serialization. Arrays repeat the parent key as the tag.
fn json_to_xml(data: &Value, tag: &str) -> String {
    match data {
        Value::Object(map) => {
            let mut xml = format!("<{tag}>");
            for (key, value) in map {
                match value {
                    Value::Array(items) => {
                        for item in items {
                            xml.push_str(&json_to_xml(item, key));
                        }
                    }
                    Value::Object(_) => xml.push_str(&json_to_xml(value, key)),
                    scalar => {
                        xml.push_str(&format!("<{key}>{}</{key}>", scalar_text(scalar)));
                    }
                }
            }
            xml.push_str(&format!("</{tag}>"));
            xml
        }
        other => scalar_text(other),
    }
}

/// Tabular serialization. Expects a non-empty array of records; headers come
/// from the first record and later records are not validated against them.
fn json_to_csv(data: &Value) -> Result<String, FormatConversionError> {
    let rows = data
        .as_array()
        .filter(|rows| !rows.is_empty())
        .ok_or_else(|| FormatConversionError::MalformedInput {
            reason: "csv conversion needs a non-empty array of records".to_string(),
        })?;

    let first = rows[0]
        .as_object()
        .ok_or_else(|| FormatConversionError::MalformedInput {
            reason: "csv conversion needs records with named fields".to_string(),
        })?;
    let headers: Vec<&String> = first.keys().collect();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| h.as_str())
            .collect::<Vec<_>>()
            .join(","),
    );

    for row in rows {
        let record = row.as_object();
        let fields: Vec<String> = headers
            .iter()
            .map(|header| {
                record
                    .and_then(|map| map.get(header.as_str()))
                    .map(|value| serde_json::to_string(value).unwrap_or_default())
                    .unwrap_or_else(|| "\"\"".to_string())
            })
            .collect();
        lines.push(fields.join(","));
    }

    Ok(lines.join("\n"))
}

/// Indentation-based serialization, two spaces per level. Scalars render
/// bare; a flat object renders one `key: value` line per field.
fn json_to_yaml(data: &Value, indent: usize) -> String {
    let spaces = " ".repeat(indent);
    match data {
        Value::Array(items) => items
            .iter()
            .map(|item| format!("{spaces}- {}", json_to_yaml(item, 0)))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| match value {
                Value::Object(_) | Value::Array(_) => {
                    format!("{spaces}{key}:\n{}", json_to_yaml(value, indent + 2))
                }
                scalar => format!("{spaces}{key}: {}", scalar_text(scalar)),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        scalar => format!("{spaces}{}", scalar_text(scalar)),
    }
}

/// Naive tabular parse: first line is the header row, fields split on bare
/// commas, every value kept as a string.
fn csv_to_json(text: &str) -> Value {
    let mut lines = text.lines();
    let headers: Vec<&str> = match lines.next() {
        Some(line) => line.split(',').collect(),
        None => return Value::Array(Vec::new()),
    };

    let records: Vec<Value> = lines
        .filter(|line| !line.is_empty())
        .map(|line| {
            let values: Vec<&str> = line.split(',').collect();
            let mut record = JsonMap::new();
            for (index, header) in headers.iter().enumerate() {
                let value = values.get(index).copied().unwrap_or_default();
                record.insert(header.to_string(), Value::String(value.to_string()));
            }
            Value::Object(record)
        })
        .collect();

    Value::Array(records)
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn yaml_renders_flat_object_at_zero_indent() {
        let result = transform_data(json!({"a": 1}), Format::Json, Format::Yaml)
            .expect("supported pair");
        assert_eq!(result, json!("a: 1"));
    }

    #[test]
    fn yaml_is_stable_and_keeps_all_top_level_keys() {
        let input = json!({"name": "relay", "port": 8080, "debug": false});
        let first = transform_data(input.clone(), Format::Json, Format::Yaml).expect("converts");
        let second = transform_data(input, Format::Json, Format::Yaml).expect("converts");
        assert_eq!(first, second);

        let text = first.as_str().expect("string output");
        for key in ["name:", "port:", "debug:"] {
            assert!(text.contains(key), "missing {key} in {text}");
        }
    }

    #[test]
    fn yaml_indents_nested_objects_and_arrays() {
        let input = json!({"server": {"host": "localhost"}, "tags": ["a", "b"]});
        let text = transform_data(input, Format::Json, Format::Yaml)
            .expect("converts")
            .as_str()
            .expect("string output")
            .to_string();
        assert!(text.contains("server:\n  host: localhost"));
        assert!(text.contains("tags:\n  - a\n  - b"));
    }

    #[test]
    fn csv_derives_headers_from_first_record() {
        let input = json!([
            {"id": 1, "name": "alpha"},
            {"id": 2, "name": "beta"}
        ]);
        let text = transform_data(input, Format::Json, Format::Csv)
            .expect("converts")
            .as_str()
            .expect("string output")
            .to_string();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("id,name"));
        assert_eq!(lines.next(), Some("1,\"alpha\""));
        assert_eq!(lines.next(), Some("2,\"beta\""));
    }

    #[test]
    fn csv_of_non_array_input_is_malformed() {
        let result = transform_data(json!({"a": 1}), Format::Json, Format::Csv);
        assert!(matches!(
            result,
            Err(FormatConversionError::MalformedInput { .. })
        ));
    }

    #[test]
    fn csv_parses_back_to_string_records() {
        let parsed = transform_data(json!("id,name\n1,alpha"), Format::Csv, Format::Json)
            .expect("converts");
        assert_eq!(parsed, json!([{"id": "1", "name": "alpha"}]));
    }

    #[test]
    fn xml_wraps_nested_records_in_tags() {
        let text = transform_data(
            json!({"user": {"name": "ada"}, "active": true}),
            Format::Json,
            Format::Xml,
        )
        .expect("converts");
        assert_eq!(
            text,
            json!("<root><active>true</active><user><name>ada</name></user></root>")
        );
    }

    #[test]
    fn reverse_tree_directions_fail_loudly() {
        for from in [Format::Xml, Format::Yaml] {
            let result = transform_data(json!("<root/>"), from, Format::Json);
            assert!(matches!(
                result,
                Err(FormatConversionError::NotImplemented { .. })
            ));
        }
    }

    #[test]
    fn unsupported_pairs_are_rejected() {
        let result = transform_data(json!("x"), Format::Csv, Format::Yaml);
        assert!(matches!(
            result,
            Err(FormatConversionError::Unsupported { .. })
        ));
    }
}
