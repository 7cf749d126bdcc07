//! The application entry point: a parsed definition plus the operations to
//! parse binary files against it.

use std::fs;
use std::rc::Rc;

use tracing::debug;

use crate::error::{DebugInfo, ErrorCollection, ErrorInfo, ErrorKind};
use crate::parser::parse_definition;
use crate::reader::BufferedReader;
use crate::record::RecordHandle;
use crate::source::{ByteSource, FileSource};
use crate::types::TypeInfo;
use crate::value::Value;

/// A set of record type descriptors parsed from one definition file.
pub struct FileParser {
    definitions: Vec<Rc<TypeInfo>>,
}

impl FileParser {
    /// Parses a definition text. A definition with no types at all is a
    /// `NoTypes` error. On failure the collection explains why.
    pub fn from_definition(
        definition: &str,
        path: &str,
        errors: &mut ErrorCollection,
    ) -> Option<FileParser> {
        let definitions = parse_definition(path, definition, errors)?;
        if definitions.is_empty() {
            errors.add(ErrorInfo::new(DebugInfo::new(path), ErrorKind::NoTypes));
            return None;
        }
        Some(FileParser { definitions })
    }

    /// Reads and parses a definition file. Definition files are small, so
    /// the whole file is read into memory first.
    pub fn from_file(path: &str, errors: &mut ErrorCollection) -> Option<FileParser> {
        let definition = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                errors.add(ErrorInfo::with_args(
                    DebugInfo::default(),
                    ErrorKind::CannotOpen,
                    &[path],
                ));
                debug!(target: "binary_reader::file_parser", error = %e, "open failed");
                return None;
            }
        };
        FileParser::from_definition(&definition, path, errors)
    }

    /// The type names available as parse roots, in declaration order.
    pub fn type_names(&self) -> Vec<&str> {
        self.definitions.iter().map(|d| d.alias.as_str()).collect()
    }

    /// Parses a binary file. With no explicit type name the last definition
    /// in the file is the root.
    pub fn parse_file(
        &self,
        path: &str,
        type_name: Option<&str>,
        errors: &mut ErrorCollection,
    ) -> Option<RecordHandle> {
        let source = match FileSource::open(path) {
            Ok(source) => source,
            Err(e) => {
                errors.add(ErrorInfo::with_args(
                    DebugInfo::default(),
                    ErrorKind::CannotOpen,
                    &[path],
                ));
                debug!(target: "binary_reader::file_parser", error = %e, "open failed");
                return None;
            }
        };
        self.parse_source(Box::new(source), type_name, errors)
    }

    /// Parses one record from an arbitrary byte source anchored at offset
    /// zero.
    pub fn parse_source(
        &self,
        source: Box<dyn ByteSource>,
        type_name: Option<&str>,
        errors: &mut ErrorCollection,
    ) -> Option<RecordHandle> {
        let root = match type_name {
            Some(name) => match self.definitions.iter().find(|d| d.alias == name) {
                Some(def) => def,
                None => {
                    errors.add(ErrorInfo::with_args(
                        DebugInfo::default(),
                        ErrorKind::UnknownType,
                        &[name],
                    ));
                    return None;
                }
            },
            // The last definition is the conventional root.
            None => self.definitions.last()?,
        };
        debug!(target: "binary_reader::file_parser", root = %root.alias, "parsing binary");

        let reader = BufferedReader::shared(source);
        match root.read_value(&reader) {
            Ok(Value::Record(handle)) => Some(handle),
            Ok(_) => {
                errors.add(ErrorInfo::new(DebugInfo::default(), ErrorKind::Unknown));
                None
            }
            Err(error) => {
                errors.add(error);
                None
            }
        }
    }
}
