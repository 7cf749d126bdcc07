//! The type model: integer primitives and user-defined record types.
//!
//! Types are created by the definition parser, immutable afterwards, and
//! shared by `Rc`. `instantiate` produces a refined copy for a specific use
//! site; `read_value` drives a buffered reader to produce a [`Value`].

use std::rc::Rc;

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};

use crate::error::{DebugInfo, ErrorInfo, ErrorKind};
use crate::options::{ByteOrder, OptionType, Options, Signedness};
use crate::reader::SharedReader;
use crate::record::RecordHandle;
use crate::size::Size;
use crate::number::Number;
use crate::value::Value;

/// A built-in fixed-width integer type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerType {
    /// Width in bits, `1..=64`.
    pub size: Size,
    pub signedness: Signedness,
    pub byte_order: ByteOrder,
}

/// A named field within a record, in declaration order.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub ty: Rc<TypeInfo>,
    pub debug: DebugInfo,
}

/// A user-defined record type: an ordered list of field declarations.
#[derive(Debug, Clone)]
pub struct RecordType {
    pub name: String,
    pub debug: DebugInfo,
    pub fields: Vec<FieldDecl>,
}

impl RecordType {
    /// The sum of the field sizes, present iff every field is statically
    /// sized.
    pub fn static_size(&self) -> Option<Size> {
        let mut total = Size::default();
        for field in &self.fields {
            total += field.ty.static_size()?;
        }
        Some(total)
    }
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Integer(IntegerType),
    Record(Rc<RecordType>),
}

/// A type as used by a field: an alias name bound to a kind, with the debug
/// location of the use site.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub alias: String,
    pub debug: DebugInfo,
    pub kind: TypeKind,
}

const BUILTIN_FILE: &str = "<builtin>";

impl TypeInfo {
    pub fn integer(
        debug: DebugInfo,
        alias: impl Into<String>,
        size: Size,
        signedness: Signedness,
        byte_order: ByteOrder,
    ) -> TypeInfo {
        debug_assert!((1..=64).contains(&size.bit_count()));
        TypeInfo {
            alias: alias.into(),
            debug,
            kind: TypeKind::Integer(IntegerType {
                size,
                signedness,
                byte_order,
            }),
        }
    }

    pub fn record(debug: DebugInfo, record: Rc<RecordType>) -> TypeInfo {
        TypeInfo {
            alias: record.name.clone(),
            debug,
            kind: TypeKind::Record(record),
        }
    }

    /// The built-in integer primitives that seed the bottom scope frame.
    pub fn builtins() -> Vec<Rc<TypeInfo>> {
        let make = |alias: &str, bits: u64, sign: Signedness| {
            Rc::new(TypeInfo::integer(
                DebugInfo::new(BUILTIN_FILE),
                alias,
                Size::from_bits(bits),
                sign,
                ByteOrder::Unset,
            ))
        };
        vec![
            make("byte", 8, Signedness::Unsigned),
            make("sbyte", 8, Signedness::Signed),
            make("int8", 8, Signedness::Signed),
            make("uint8", 8, Signedness::Unsigned),
            make("int16", 16, Signedness::Signed),
            make("uint16", 16, Signedness::Unsigned),
            make("int32", 32, Signedness::Signed),
            make("uint32", 32, Signedness::Unsigned),
            make("int64", 64, Signedness::Signed),
            make("uint64", 64, Signedness::Unsigned),
        ]
    }

    /// The underlying type family name: `integer`, or the record's own name.
    pub fn base_name(&self) -> &str {
        match &self.kind {
            TypeKind::Integer(_) => "integer",
            TypeKind::Record(record) => &record.name,
        }
    }

    pub fn static_size(&self) -> Option<Size> {
        match &self.kind {
            TypeKind::Integer(int) => Some(int.size),
            TypeKind::Record(record) => record.static_size(),
        }
    }

    /// The option types a definition may apply to this type.
    pub fn option_types(&self) -> &'static [OptionType] {
        match &self.kind {
            TypeKind::Integer(_) => &[OptionType::Signedness, OptionType::ByteOrder],
            TypeKind::Record(_) => &[],
        }
    }

    /// A copy of this type refined for a use site: explicit options fill the
    /// unset slots; the receiver is unchanged. Records have no refinement
    /// slots and ignore the options.
    pub fn instantiate(&self, debug: DebugInfo, options: &Options) -> TypeInfo {
        match &self.kind {
            TypeKind::Integer(int) => TypeInfo {
                alias: self.alias.clone(),
                debug,
                kind: TypeKind::Integer(IntegerType {
                    size: int.size,
                    signedness: options.signedness_or(int.signedness),
                    byte_order: options.byte_order_or(int.byte_order),
                }),
            },
            TypeKind::Record(record) => TypeInfo {
                alias: self.alias.clone(),
                debug,
                kind: TypeKind::Record(Rc::clone(record)),
            },
        }
    }

    /// Reads one value of this type at the reader's current position and
    /// advances it by the type's size. A failed read leaves the position
    /// unchanged.
    pub fn read_value(&self, reader: &SharedReader) -> Result<Value, ErrorInfo> {
        match &self.kind {
            TypeKind::Integer(int) => self.read_integer(int, reader),
            TypeKind::Record(record) => self.read_record(record, reader),
        }
    }

    fn read_integer(&self, int: &IntegerType, reader: &SharedReader) -> Result<Value, ErrorInfo> {
        let width = int.size.bit_count();
        let mut reader = reader.borrow_mut();
        let bit_offset = u64::from(reader.position().bit_offset());
        let final_bits = (bit_offset + width) % 8;
        let byte_count = ((bit_offset + width + 7) / 8) as usize;

        let little = int.byte_order_or_default() == ByteOrder::Little;
        if little && (bit_offset != 0 || final_bits != 0) {
            return Err(ErrorInfo::new(self.debug.clone(), ErrorKind::LittleEndianAlign)
                .at_offset(reader.position().byte_count()));
        }

        reader.ensure(int.size)?;
        let position = reader.position();
        let buffer = reader.buffered();
        if buffer.len() < byte_count {
            return Err(ErrorInfo::new(self.debug.clone(), ErrorKind::UnexpectedEndOfStream)
                .at_offset(position.byte_count()));
        }

        let mut value: u64;
        if bit_offset == 0 && final_bits == 0 {
            value = if little {
                LittleEndian::read_uint(&buffer[..byte_count], byte_count)
            } else {
                BigEndian::read_uint(&buffer[..byte_count], byte_count)
            };
        } else {
            // Big-endian bit stream: most significant bits first. A read
            // that touches only one byte takes its bits here too.
            let mut index = 0;
            if bit_offset != 0 || byte_count == 1 {
                let mask = (1u64 << (8 - bit_offset)) - 1;
                let shift = 8 - (bit_offset + width).min(8);
                value = (u64::from(buffer[0]) & mask) >> shift;
                index = 1;
            } else {
                value = 0;
            }
            while index < byte_count - 1 || (index == byte_count - 1 && final_bits == 0) {
                value = (value << 8) | u64::from(buffer[index]);
                index += 1;
            }
            if final_bits != 0 && byte_count != 1 {
                value = (value << final_bits) | (u64::from(buffer[index]) >> (8 - final_bits));
            }
        }

        let number = if int.signedness_or_default() == Signedness::Signed
            && value & (1u64 << (width - 1)) != 0
        {
            // Negative: fill the bits above the width so the two's
            // complement value carries over.
            if width != 64 {
                value |= !((1u64 << width) - 1);
            }
            Number::from_signed(value as i64)
        } else {
            Number::from_unsigned(value)
        };

        reader.skip(int.size)?;
        Ok(Value::Number(number))
    }

    fn read_record(&self, record: &Rc<RecordType>, reader: &SharedReader) -> Result<Value, ErrorInfo> {
        let Some(size) = record.static_size() else {
            return Err(ErrorInfo::new(self.debug.clone(), ErrorKind::FieldsMustBeStatic));
        };

        let start = reader.borrow().position();
        let handle = RecordHandle::new(Rc::clone(reader), Rc::clone(record), start);
        handle.reparse()?;

        reader.borrow_mut().seek(start + size)?;
        Ok(Value::Record(handle))
    }
}

impl IntegerType {
    fn signedness_or_default(&self) -> Signedness {
        match self.signedness {
            Signedness::Unset => Options::DEFAULT.signedness,
            set => set,
        }
    }

    fn byte_order_or_default(&self) -> ByteOrder {
        match self.byte_order {
            ByteOrder::Unset => Options::DEFAULT.byte_order,
            set => set,
        }
    }
}
