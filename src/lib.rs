//! # binary-reader — data-driven binary file parsing
//!
//! Parses binary files according to a textual type definition: the
//! definition describes a hierarchy of typed, named fields, and the reader
//! produces a tree of lazy, bit-precise field values over an arbitrary byte
//! source.
//!
//! ## Definition language
//!
//! A definition file is a list of record types. Fields use built-in integer
//! primitives (`byte`, `sbyte`, `int8`..`int64`, `uint8`..`uint64`) or
//! previously declared records, optionally refined with options:
//!
//! ```text
//! type Header {
//!   uint32(little) length;
//!   int16(signedness = signed) delta;
//! }
//!
//! type Main {
//!   Header head;
//!   byte kind;
//! }
//! ```
//!
//! Integers default to unsigned, big-endian. Big-endian fields may start
//! and end at arbitrary bit positions; little-endian fields must be
//! byte-aligned whole bytes.
//!
//! ## Usage
//!
//! ```no_run
//! use binary_reader::{ErrorCollection, FileParser};
//!
//! let mut errors = ErrorCollection::new();
//! let parser = FileParser::from_file("format.def", &mut errors).unwrap();
//! let record = parser.parse_file("data.bin", None, &mut errors).unwrap();
//! for name in record.field_names() {
//!     println!("{name} = {:?}", record.value_of(&name));
//! }
//! ```
//!
//! Fields materialize on first access and stay cached; `clear_cache`
//! re-reads from the file, and `reparse` rebuilds a record against a changed
//! definition.

pub mod ast;
pub mod codec;
pub mod error;
pub mod file_parser;
pub mod json;
pub mod number;
pub mod options;
pub mod parser;
pub mod reader;
pub mod record;
pub mod size;
pub mod source;
pub mod types;
pub mod value;

pub use codec::{CodecRegistry, TextCodec, TextConverter};
pub use error::{DebugInfo, ErrorCollection, ErrorInfo, ErrorKind, ErrorLevel};
pub use file_parser::FileParser;
pub use json::{write_record, JsonOptions};
pub use number::Number;
pub use options::{ByteOrder, OptionType, Options, Signedness};
pub use reader::{BufferedReader, SharedReader};
pub use record::RecordHandle;
pub use size::Size;
pub use source::{ByteSource, FileSource, MemorySource};
pub use types::TypeInfo;
pub use value::Value;
