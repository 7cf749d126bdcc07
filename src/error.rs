//! Structured diagnostics: error kinds, severity, source locations, and a
//! per-file collection.
//!
//! Components append diagnostics to a caller-supplied [`ErrorCollection`]
//! rather than aborting; only `Error`-level entries mark the collection
//! failed. Messages come from a static table keyed by kind with positional
//! `%s` substitution.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorLevel {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unknown,
    CannotOpen,
    IoError,

    ShadowingType,
    ShadowingMember,
    UnknownType,
    NoTypes,

    OptionMustBeString,
    OptionMustBeStringTyped,
    UnknownOptionValue,
    UnknownOptionValueTyped,
    AmbiguousOption,
    DuplicateOption,
    OptionInvalidForType,
    UnknownOptionType,

    UnexpectedEndOfStream,
    LittleEndianAlign,

    FieldsMustBeStatic,
}

/// Where in a definition file something happened. `line`/`column` are
/// 1-based; 0 means unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugInfo {
    pub file_path: String,
    pub line: usize,
    pub column: usize,
}

impl DebugInfo {
    pub fn new(file_path: impl Into<String>) -> DebugInfo {
        DebugInfo {
            file_path: file_path.into(),
            line: 0,
            column: 0,
        }
    }

    pub fn at(file_path: impl Into<String>, line: usize, column: usize) -> DebugInfo {
        DebugInfo {
            file_path: file_path.into(),
            line,
            column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub debug: DebugInfo,
    pub kind: ErrorKind,
    pub level: ErrorLevel,
    /// Byte offset within the binary file, when the error comes from a read.
    pub offset: u64,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(debug: DebugInfo, kind: ErrorKind) -> ErrorInfo {
        ErrorInfo::with_args(debug, kind, &[])
    }

    pub fn with_args(debug: DebugInfo, kind: ErrorKind, args: &[&str]) -> ErrorInfo {
        ErrorInfo {
            debug,
            kind,
            level: ErrorLevel::Error,
            offset: 0,
            message: default_message(kind, args),
        }
    }

    /// A diagnostic with a free-form message, used for frontend and codec
    /// failures that have no dedicated kind.
    pub fn custom(debug: DebugInfo, message: impl Into<String>) -> ErrorInfo {
        ErrorInfo {
            debug,
            kind: ErrorKind::Unknown,
            level: ErrorLevel::Error,
            offset: 0,
            message: message.into(),
        }
    }

    pub fn warning(mut self) -> ErrorInfo {
        self.level = ErrorLevel::Warning;
        self
    }

    pub fn at_offset(mut self, offset: u64) -> ErrorInfo {
        self.offset = offset;
        self
    }
}

const DEFAULT_MESSAGES: &[(ErrorKind, &str)] = &[
    (ErrorKind::Unknown, "Unknown error"),
    (ErrorKind::CannotOpen, "Cannot open file '%s'"),
    (ErrorKind::IoError, "Unknown IO error: errno=%s"),
    (ErrorKind::ShadowingType, "Shadowing existing type '%s'"),
    (ErrorKind::ShadowingMember, "Shadowing existing member '%s'"),
    (ErrorKind::UnknownType, "Unknown type '%s'"),
    (ErrorKind::NoTypes, "No types in definition file"),
    (
        ErrorKind::OptionMustBeString,
        "Option values must be a string",
    ),
    (
        ErrorKind::OptionMustBeStringTyped,
        "Option values must be a string for option '%s'",
    ),
    (ErrorKind::UnknownOptionValue, "Unknown option value '%s'"),
    (
        ErrorKind::UnknownOptionValueTyped,
        "Unknown option value '%s' for option '%s'",
    ),
    (ErrorKind::AmbiguousOption, "Ambiguous option value '%s'"),
    (ErrorKind::DuplicateOption, "Option '%s' set multiple times"),
    (
        ErrorKind::OptionInvalidForType,
        "Option '%s' is not valid for this type",
    ),
    (ErrorKind::UnknownOptionType, "Unknown option '%s'"),
    (
        ErrorKind::UnexpectedEndOfStream,
        "Unexpected end of stream",
    ),
    (
        ErrorKind::LittleEndianAlign,
        "Little endian numbers must be byte aligned",
    ),
    (
        ErrorKind::FieldsMustBeStatic,
        "Fields must have a static size",
    ),
];

/// Builds the default message for `kind`, substituting `%s` placeholders
/// positionally from `args`. Missing arguments substitute the empty string;
/// extra arguments are ignored.
pub fn default_message(kind: ErrorKind, args: &[&str]) -> String {
    let format = DEFAULT_MESSAGES
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, f)| *f)
        .unwrap_or(DEFAULT_MESSAGES[0].1);

    let mut out = String::with_capacity(format.len());
    let mut next_arg = 0;
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            match chars.next() {
                Some('s') => {
                    out.push_str(args.get(next_arg).copied().unwrap_or(""));
                    next_arg += 1;
                }
                Some(other) => {
                    out.push('%');
                    out.push(other);
                }
                None => out.push('%'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

impl fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorLevel::Error => "error",
            ErrorLevel::Warning => "warning",
            ErrorLevel::Info => "info",
        };
        f.write_str(name)
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.debug.file_path.is_empty() {
            write!(f, "{}: {}", self.level, self.message)
        } else if self.debug.line == 0 {
            write!(f, "{}: {}: {}", self.debug.file_path, self.level, self.message)
        } else if self.debug.column == 0 {
            write!(
                f,
                "{}:{}: {}: {}",
                self.debug.file_path, self.debug.line, self.level, self.message
            )
        } else {
            write!(
                f,
                "{}:{}:{}: {}: {}",
                self.debug.file_path, self.debug.line, self.debug.column, self.level, self.message
            )
        }
    }
}

impl std::error::Error for ErrorInfo {}

/// Holds the diagnostics for a single file; the file path is copied onto
/// added entries that don't carry one.
#[derive(Debug, Default)]
pub struct ErrorCollection {
    file_path: String,
    errors: Vec<ErrorInfo>,
    has_error: bool,
}

impl ErrorCollection {
    pub fn new() -> ErrorCollection {
        ErrorCollection::default()
    }

    pub fn for_file(file_path: impl Into<String>) -> ErrorCollection {
        ErrorCollection {
            file_path: file_path.into(),
            ..ErrorCollection::default()
        }
    }

    pub fn add(&mut self, mut info: ErrorInfo) {
        if info.debug.file_path.is_empty() {
            info.debug.file_path = self.file_path.clone();
        }
        if info.level == ErrorLevel::Error {
            self.has_error = true;
        }
        self.errors.push(info);
    }

    pub fn add_all_from(&mut self, other: ErrorCollection) {
        for error in other.errors {
            self.add(error);
        }
    }

    pub fn errors(&self) -> &[ErrorInfo] {
        &self.errors
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ErrorInfo> {
        self.errors.iter()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.has_error
    }

    pub fn clear(&mut self) {
        self.errors.clear();
        self.has_error = false;
    }
}

impl<'a> IntoIterator for &'a ErrorCollection {
    type Item = &'a ErrorInfo;
    type IntoIter = std::slice::Iter<'a, ErrorInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}
