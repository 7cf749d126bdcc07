//! Live record handles: lazy, seekable views of one record occurrence.
//!
//! A handle anchors a record type at a start position over a shared reader.
//! Fields materialize on first access and stay cached; `reparse` rebuilds the
//! field layout (for a changed definition) and drops the caches. Children of
//! a re-parsed parent become stale by contract; they share the parent's
//! reader and are not mechanically invalidated.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{ErrorInfo, ErrorKind};
use crate::reader::SharedReader;
use crate::size::Size;
use crate::types::{RecordType, TypeInfo};
use crate::value::Value;

struct ParsedField {
    name: String,
    /// `None` only for test-mode fields, which are always pre-valued.
    ty: Option<Rc<TypeInfo>>,
    /// Absolute offset of the field within the file.
    offset: Size,
    value: Option<Value>,
}

struct Backing {
    reader: SharedReader,
    ty: Rc<RecordType>,
    start: Size,
}

struct RecordInner {
    /// `None` for test-mode records built straight from values.
    backing: Option<Backing>,
    fields: Vec<ParsedField>,
}

/// A reference-counted handle to a parsed record. Clones share state;
/// equality and ordering are by identity.
#[derive(Clone)]
pub struct RecordHandle {
    inner: Rc<RefCell<RecordInner>>,
}

impl RecordHandle {
    pub(crate) fn new(reader: SharedReader, ty: Rc<RecordType>, start: Size) -> RecordHandle {
        RecordHandle {
            inner: Rc::new(RefCell::new(RecordInner {
                backing: Some(Backing { reader, ty, start }),
                fields: Vec::new(),
            })),
        }
    }

    /// A record built directly from values, with no reader behind it. Used
    /// by unit tests and hosts that synthesize records.
    pub fn from_fields(fields: Vec<(String, Value)>) -> RecordHandle {
        RecordHandle {
            inner: Rc::new(RefCell::new(RecordInner {
                backing: None,
                fields: fields
                    .into_iter()
                    .map(|(name, value)| ParsedField {
                        name,
                        ty: None,
                        offset: Size::default(),
                        value: Some(value),
                    })
                    .collect(),
            })),
        }
    }

    /// Rebuilds the field layout from the type definition and invalidates
    /// every cached value. Requires a statically sized type.
    pub fn reparse(&self) -> Result<(), ErrorInfo> {
        let mut inner = self.inner.borrow_mut();
        let Some(backing) = &inner.backing else {
            return Ok(()); // test-mode records have nothing to rebuild
        };

        if backing.ty.static_size().is_none() {
            return Err(ErrorInfo::new(
                backing.ty.debug.clone(),
                ErrorKind::FieldsMustBeStatic,
            ));
        }

        let mut offset = backing.start;
        let mut fields = Vec::with_capacity(backing.ty.fields.len());
        for decl in &backing.ty.fields {
            // A static record size implies static field sizes.
            let Some(size) = decl.ty.static_size() else {
                return Err(ErrorInfo::new(decl.debug.clone(), ErrorKind::FieldsMustBeStatic));
            };
            fields.push(ParsedField {
                name: decl.name.clone(),
                ty: Some(Rc::clone(&decl.ty)),
                offset,
                value: None,
            });
            offset += size;
        }

        inner.fields = fields;
        Ok(())
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> Vec<String> {
        self.inner
            .borrow()
            .fields
            .iter()
            .map(|f| f.name.clone())
            .collect()
    }

    pub fn field_count(&self) -> usize {
        self.inner.borrow().fields.len()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.inner.borrow().fields.iter().any(|f| f.name == name)
    }

    /// Returns the field's value, materializing and caching it on first
    /// access. A name that doesn't exist yields `Null`.
    pub fn value_of(&self, name: &str) -> Result<Value, ErrorInfo> {
        let index = {
            let inner = self.inner.borrow();
            match inner.fields.iter().position(|f| f.name == name) {
                Some(i) => i,
                None => return Ok(Value::Null),
            }
        };
        self.ensure_field(index)
    }

    fn ensure_field(&self, index: usize) -> Result<Value, ErrorInfo> {
        let (ty, offset, reader) = {
            let inner = self.inner.borrow();
            let field = &inner.fields[index];
            if let Some(value) = &field.value {
                return Ok(value.clone());
            }
            let backing = inner
                .backing
                .as_ref()
                .expect("uncached fields only exist behind a reader");
            let ty = field.ty.as_ref().expect("uncached fields carry their type");
            (Rc::clone(ty), field.offset, Rc::clone(&backing.reader))
        };

        reader.borrow_mut().seek(offset)?;
        let value = ty.read_value(&reader)?;
        self.inner.borrow_mut().fields[index].value = Some(value.clone());
        Ok(value)
    }

    /// Drops every cached value; the next access re-reads from the file.
    pub fn clear_cache(&self) {
        for field in self.inner.borrow_mut().fields.iter_mut() {
            field.value = None;
        }
    }

    /// The absolute position this record is anchored at, when it has a
    /// reader behind it.
    pub fn start_position(&self) -> Option<Size> {
        self.inner.borrow().backing.as_ref().map(|b| b.start)
    }

    /// Stable identity for ordering; records never compare structurally.
    pub(crate) fn ptr_id(&self) -> usize {
        Rc::as_ptr(&self.inner) as *const () as usize
    }
}

impl PartialEq for RecordHandle {
    fn eq(&self, other: &RecordHandle) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for RecordHandle {}

impl std::fmt::Debug for RecordHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("RecordHandle")
            .field("fields", &inner.fields.iter().map(|x| &x.name).collect::<Vec<_>>())
            .finish()
    }
}
