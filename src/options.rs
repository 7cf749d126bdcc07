//! Semantic refinements that a definition can apply to a type use.
//!
//! Options are parsed type-directed: a value string must match exactly one
//! descriptor among the allowed option types. An `Unset` slot inherits from a
//! defaults bag; the built-in defaults are unsigned, big-endian.

use std::fmt;

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionType {
    Unknown,
    Signedness,
    ByteOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Signedness {
    #[default]
    Unset,
    Signed,
    Unsigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    Unset,
    Little,
    /// Aka "network" order.
    Big,
}

/// A parsed option value, tagged with its option type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionValue {
    Signedness(Signedness),
    ByteOrder(ByteOrder),
}

impl OptionValue {
    pub fn option_type(&self) -> OptionType {
        match self {
            OptionValue::Signedness(_) => OptionType::Signedness,
            OptionValue::ByteOrder(_) => OptionType::ByteOrder,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionParseError {
    /// The value was not a string (e.g. a number).
    InvalidValueType,
    /// The string doesn't name any known option value.
    UnknownString,
    /// The string names values in two or more option types.
    Ambiguous,
}

struct OptionDescriptor {
    ty: OptionType,
    values: &'static [(&'static str, OptionValue)],
}

const OPTION_DATA: &[OptionDescriptor] = &[
    OptionDescriptor {
        ty: OptionType::Signedness,
        values: &[
            ("signed", OptionValue::Signedness(Signedness::Signed)),
            ("unsigned", OptionValue::Signedness(Signedness::Unsigned)),
        ],
    },
    OptionDescriptor {
        ty: OptionType::ByteOrder,
        values: &[
            ("big", OptionValue::ByteOrder(ByteOrder::Big)),
            ("network", OptionValue::ByteOrder(ByteOrder::Big)),
            ("little", OptionValue::ByteOrder(ByteOrder::Little)),
        ],
    },
];

/// Resolves an option type name as written in a definition file.
pub fn option_type_from_name(name: &str) -> OptionType {
    match name {
        "signedness" => OptionType::Signedness,
        "byte_order" | "order" => OptionType::ByteOrder,
        _ => OptionType::Unknown,
    }
}

/// A bag of option slots applied to a type use. `Unset` slots inherit from a
/// defaults bag at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Options {
    pub signedness: Signedness,
    pub byte_order: ByteOrder,
}

impl Options {
    pub const DEFAULT: Options = Options {
        signedness: Signedness::Unsigned,
        byte_order: ByteOrder::Big,
    };

    /// Parses an option value into its typed enum. `allowed` restricts which
    /// option types are considered; an empty slice means any type.
    pub fn parse_option(
        allowed: &[OptionType],
        value: &Value,
    ) -> Result<OptionValue, OptionParseError> {
        let text = match value {
            Value::String(s) => s.as_str(),
            _ => return Err(OptionParseError::InvalidValueType),
        };

        let mut found = None;
        for descriptor in OPTION_DATA {
            if !allowed.is_empty() && !allowed.contains(&descriptor.ty) {
                continue;
            }
            for (name, parsed) in descriptor.values {
                if *name == text {
                    if found.is_some() {
                        return Err(OptionParseError::Ambiguous);
                    }
                    found = Some(*parsed);
                    break;
                }
            }
        }
        found.ok_or(OptionParseError::UnknownString)
    }

    /// Returns the slot for `ty`, falling back to `defaults` when unset.
    pub fn get(&self, ty: OptionType, defaults: &Options) -> Option<OptionValue> {
        match ty {
            OptionType::Signedness => {
                let v = match self.signedness {
                    Signedness::Unset => defaults.signedness,
                    set => set,
                };
                Some(OptionValue::Signedness(v))
            }
            OptionType::ByteOrder => {
                let v = match self.byte_order {
                    ByteOrder::Unset => defaults.byte_order,
                    set => set,
                };
                Some(OptionValue::ByteOrder(v))
            }
            OptionType::Unknown => None,
        }
    }

    /// Assigns the slot matching the value's type.
    pub fn set(&mut self, value: OptionValue) {
        match value {
            OptionValue::Signedness(v) => self.signedness = v,
            OptionValue::ByteOrder(v) => self.byte_order = v,
        }
    }

    pub fn signedness_or(&self, default: Signedness) -> Signedness {
        match self.signedness {
            Signedness::Unset => default,
            set => set,
        }
    }

    pub fn byte_order_or(&self, default: ByteOrder) -> ByteOrder {
        match self.byte_order {
            ByteOrder::Unset => default,
            set => set,
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptionType::Unknown => "Unknown",
            OptionType::Signedness => "signedness",
            OptionType::ByteOrder => "byte_order",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Signedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signedness::Unset => "unset",
            Signedness::Signed => "signed",
            Signedness::Unsigned => "unsigned",
        };
        f.write_str(name)
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ByteOrder::Unset => "unset",
            ByteOrder::Little => "little",
            ByteOrder::Big => "big",
        };
        f.write_str(name)
    }
}
