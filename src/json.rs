//! JSON output for parsed records.
//!
//! Traverses a record in declaration order and writes `{"name": value, ...}`.
//! Compact mode writes everything on one line; pretty mode writes one
//! property per line with a configurable indent and a trailing newline at
//! the outermost scope.

use std::io::{self, Write};

use thiserror::Error;

use crate::error::ErrorInfo;
use crate::record::RecordHandle;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct JsonOptions {
    /// Whether to include newlines and indentation.
    pub pretty: bool,
    /// Spaces per indentation level; only used when pretty.
    pub indent: usize,
}

impl Default for JsonOptions {
    fn default() -> JsonOptions {
        JsonOptions {
            pretty: true,
            indent: 2,
        }
    }
}

#[derive(Debug, Error)]
pub enum JsonError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("{0}")]
    Read(ErrorInfo),
}

/// Writes one record as a JSON object. Field values materialize during the
/// traversal; a failed read aborts the output.
pub fn write_record(
    out: &mut dyn Write,
    options: &JsonOptions,
    record: &RecordHandle,
) -> Result<(), JsonError> {
    write_record_at(out, options, record, 0)?;
    if options.pretty {
        writeln!(out)?;
    }
    Ok(())
}

/// Writes a single value; records recurse.
pub fn write_value(
    out: &mut dyn Write,
    options: &JsonOptions,
    value: &Value,
    indent: usize,
) -> Result<(), JsonError> {
    match value {
        Value::Null => write!(out, "null")?,
        Value::Number(n) => write!(out, "{n}")?,
        Value::String(s) => write_string(out, s)?,
        Value::Record(record) => write_record_at(out, options, record, indent)?,
    }
    Ok(())
}

fn write_record_at(
    out: &mut dyn Write,
    options: &JsonOptions,
    record: &RecordHandle,
    indent: usize,
) -> Result<(), JsonError> {
    write!(out, "{{")?;
    let mut first = true;
    for name in record.field_names() {
        if !first {
            write!(out, ",")?;
        }
        if options.pretty {
            write!(out, "\n{}", " ".repeat(indent + options.indent))?;
        }
        write_string(out, &name)?;
        write!(out, ":")?;
        if options.pretty {
            write!(out, " ")?;
        }
        let value = record.value_of(&name).map_err(JsonError::Read)?;
        write_value(out, options, &value, indent + options.indent)?;
        first = false;
    }
    if !first && options.pretty {
        write!(out, "\n{}", " ".repeat(indent))?;
    }
    write!(out, "}}")?;
    Ok(())
}

fn write_string(out: &mut dyn Write, text: &str) -> Result<(), JsonError> {
    write!(out, "\"")?;
    for c in text.chars() {
        match c {
            '"' => write!(out, "\\\"")?,
            '\\' => write!(out, "\\\\")?,
            '\n' => write!(out, "\\n")?,
            '\r' => write!(out, "\\r")?,
            '\t' => write!(out, "\\t")?,
            c if (c as u32) < 0x20 => write!(out, "\\u{:04x}", c as u32)?,
            c => write!(out, "{c}")?,
        }
    }
    write!(out, "\"")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: Vec<(&str, Value)>) -> RecordHandle {
        RecordHandle::from_fields(
            fields
                .into_iter()
                .map(|(n, v)| (n.to_string(), v))
                .collect(),
        )
    }

    fn to_json(options: &JsonOptions, record: &RecordHandle) -> String {
        let mut out = Vec::new();
        write_record(&mut out, options, record).expect("write");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn compact_object() {
        let rec = record(vec![
            ("a", Value::from(1u64)),
            ("b", Value::from(-2i64)),
            ("c", Value::Null),
            ("d", Value::from("hi")),
        ]);
        let options = JsonOptions {
            pretty: false,
            ..JsonOptions::default()
        };
        assert_eq!(
            to_json(&options, &rec),
            r#"{"a":1,"b":-2,"c":null,"d":"hi"}"#
        );
    }

    #[test]
    fn pretty_object_with_default_indent() {
        let rec = record(vec![("a", Value::from(1u64)), ("b", Value::from("x"))]);
        assert_eq!(
            to_json(&JsonOptions::default(), &rec),
            "{\n  \"a\": 1,\n  \"b\": \"x\"\n}\n"
        );
    }

    #[test]
    fn pretty_nested_record_indents() {
        let inner = record(vec![("x", Value::from(7u64))]);
        let rec = record(vec![("v", Value::Record(inner))]);
        assert_eq!(
            to_json(&JsonOptions::default(), &rec),
            "{\n  \"v\": {\n    \"x\": 7\n  }\n}\n"
        );
    }

    #[test]
    fn custom_indent_width() {
        let rec = record(vec![("a", Value::from(1u64))]);
        let options = JsonOptions {
            pretty: true,
            indent: 4,
        };
        assert_eq!(to_json(&options, &rec), "{\n    \"a\": 1\n}\n");
    }

    #[test]
    fn empty_record_stays_flat() {
        let rec = record(vec![]);
        assert_eq!(to_json(&JsonOptions::default(), &rec), "{}\n");
    }

    #[test]
    fn strings_are_escaped() {
        let rec = record(vec![("s", Value::from("a\"b\\c\nd"))]);
        let options = JsonOptions {
            pretty: false,
            ..JsonOptions::default()
        };
        assert_eq!(to_json(&options, &rec), r#"{"s":"a\"b\\c\nd"}"#);
    }

    #[test]
    fn doubles_use_natural_form() {
        let rec = record(vec![("d", Value::from(1.5))]);
        let options = JsonOptions {
            pretty: false,
            ..JsonOptions::default()
        };
        assert_eq!(to_json(&options, &rec), r#"{"d":1.5}"#);
    }
}
