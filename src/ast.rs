//! Abstract syntax for definition files, as delivered by the grammar.
//!
//! The AST is deliberately dumb: names, option terms, and source locations.
//! Scope rules, option resolution, and type construction happen in the
//! definition parser.

use crate::error::DebugInfo;
use crate::value::Value;

/// A parsed definition file: top-level type definitions in source order.
#[derive(Debug, Clone, Default)]
pub struct DefinitionFile {
    pub types: Vec<TypeDefAst>,
}

/// `type <name> { <members> }`
#[derive(Debug, Clone)]
pub struct TypeDefAst {
    pub name: String,
    pub debug: DebugInfo,
    pub members: Vec<FieldAst>,
}

/// `<type-use> <name>;`
#[derive(Debug, Clone)]
pub struct FieldAst {
    pub name: String,
    pub debug: DebugInfo,
    pub type_use: TypeUseAst,
}

/// A type alias plus optional option terms: `uint32(little)`.
#[derive(Debug, Clone)]
pub struct TypeUseAst {
    pub name: String,
    pub debug: DebugInfo,
    pub options: Vec<OptionTermAst>,
}

/// One option term: a bare value, or an explicit `name = value` pair. The
/// value is an AST literal (string or number).
#[derive(Debug, Clone)]
pub struct OptionTermAst {
    pub name: Option<String>,
    pub debug: DebugInfo,
    pub value: Value,
}
