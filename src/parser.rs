//! Definition parser: concrete grammar → AST → type model.
//!
//! The grammar side is a pest walk producing the [`ast`](crate::ast) types.
//! The semantic side enforces scoping and shadowing rules, resolves type
//! aliases against a scope seeded with the built-in integers, applies option
//! terms, and emits [`TypeInfo`] descriptors. All failures are reported as
//! diagnostics; a lexer/parser failure surfaces as a single `Unknown`-kind
//! diagnostic at pest's reported location.

use std::rc::Rc;

use pest::iterators::Pair;
use pest::Parser as _;
use pest_derive::Parser;
use tracing::debug;

use crate::ast::{DefinitionFile, FieldAst, OptionTermAst, TypeDefAst, TypeUseAst};
use crate::error::{DebugInfo, ErrorCollection, ErrorInfo, ErrorKind};
use crate::number::Number;
use crate::options::{option_type_from_name, OptionParseError, OptionType, Options};
use crate::types::{FieldDecl, RecordType, TypeInfo};
use crate::value::Value;

#[derive(Parser)]
#[grammar = "grammar.pest"]
struct DefinitionGrammar;

/// Parses a definition file into record type descriptors, in declaration
/// order. Returns `None` when any error-level diagnostic was produced; the
/// collection then holds at least one entry.
pub fn parse_definition(
    path: &str,
    text: &str,
    errors: &mut ErrorCollection,
) -> Option<Vec<Rc<TypeInfo>>> {
    let file = match parse_grammar(path, text) {
        Ok(file) => file,
        Err(error) => {
            errors.add(error);
            return None;
        }
    };

    let definitions = resolve_file(&file, errors);
    debug!(
        target: "binary_reader::parser",
        types = definitions.len(),
        diagnostics = errors.len(),
        "parsed definition file"
    );
    if errors.has_errors() {
        None
    } else {
        Some(definitions)
    }
}

///////////////////////////////////////////////////////////////////////////////
// Grammar walk

fn parse_grammar(path: &str, text: &str) -> Result<DefinitionFile, ErrorInfo> {
    let mut pairs = DefinitionGrammar::parse(Rule::main, text).map_err(|e| {
        let (line, column) = match e.line_col {
            pest::error::LineColLocation::Pos((line, col)) => (line, col),
            pest::error::LineColLocation::Span((line, col), _) => (line, col),
        };
        ErrorInfo::custom(
            DebugInfo::at(path, line, column),
            e.variant.message().to_string(),
        )
    })?;

    let main = pairs.next().ok_or_else(|| {
        ErrorInfo::custom(DebugInfo::new(path), "empty parse".to_string())
    })?;

    let mut file = DefinitionFile::default();
    for inner in main.into_inner() {
        if inner.as_rule() == Rule::type_definition {
            file.types.push(build_type_definition(path, inner));
        }
    }
    Ok(file)
}

fn debug_at(path: &str, pair: &Pair<'_, Rule>) -> DebugInfo {
    let (line, column) = pair.as_span().start_pos().line_col();
    DebugInfo::at(path, line, column)
}

fn build_type_definition(path: &str, pair: Pair<'_, Rule>) -> TypeDefAst {
    let debug = debug_at(path, &pair);
    let mut name = String::new();
    let mut members = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = inner.as_str().to_string(),
            Rule::data_field => members.push(build_data_field(path, inner)),
            _ => {}
        }
    }
    TypeDefAst {
        name,
        debug,
        members,
    }
}

fn build_data_field(path: &str, pair: Pair<'_, Rule>) -> FieldAst {
    let debug = debug_at(path, &pair);
    let mut name = String::new();
    let mut type_use = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::complete_type => type_use = Some(build_complete_type(path, inner)),
            Rule::ident => name = inner.as_str().to_string(),
            _ => {}
        }
    }
    FieldAst {
        name,
        // data_field = complete_type ~ ident ~ ";" guarantees the type use.
        type_use: type_use.unwrap_or(TypeUseAst {
            name: String::new(),
            debug: debug.clone(),
            options: Vec::new(),
        }),
        debug,
    }
}

fn build_complete_type(path: &str, pair: Pair<'_, Rule>) -> TypeUseAst {
    let debug = debug_at(path, &pair);
    let mut name = String::new();
    let mut options = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = inner.as_str().to_string(),
            Rule::option_list => {
                for term in inner.into_inner() {
                    if term.as_rule() == Rule::option_term {
                        options.push(build_option_term(path, term));
                    }
                }
            }
            _ => {}
        }
    }
    TypeUseAst {
        name,
        debug,
        options,
    }
}

fn build_option_term(path: &str, pair: Pair<'_, Rule>) -> OptionTermAst {
    let debug = debug_at(path, &pair);
    let mut name = None;
    let mut value = Value::Null;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::named_option => {
                for part in inner.into_inner() {
                    match part.as_rule() {
                        Rule::ident => name = Some(part.as_str().to_string()),
                        Rule::option_value => value = build_literal(part),
                        _ => {}
                    }
                }
            }
            Rule::option_value => value = build_literal(inner),
            _ => {}
        }
    }
    OptionTermAst { name, debug, value }
}

fn build_literal(pair: Pair<'_, Rule>) -> Value {
    let Some(inner) = pair.into_inner().next() else {
        return Value::Null;
    };
    match inner.as_rule() {
        Rule::string => {
            let text = inner.as_str();
            Value::String(text[1..text.len() - 1].to_string())
        }
        Rule::number => {
            let text = inner.as_str();
            if text.contains('.') {
                text.parse::<f64>().map(Value::from).unwrap_or(Value::Null)
            } else if let Ok(v) = text.parse::<i64>() {
                Value::Number(Number::from_signed(v))
            } else if let Ok(v) = text.parse::<u64>() {
                Value::Number(Number::from_unsigned(v))
            } else {
                text.parse::<f64>().map(Value::from).unwrap_or(Value::Null)
            }
        }
        // Bare identifiers are string values.
        _ => Value::String(inner.as_str().to_string()),
    }
}

///////////////////////////////////////////////////////////////////////////////
// Semantics: scope, shadowing, option application

struct Scope {
    builtins: Vec<Rc<TypeInfo>>,
    types: Vec<Rc<TypeInfo>>,
}

impl Scope {
    fn new() -> Scope {
        Scope {
            builtins: TypeInfo::builtins(),
            types: Vec::new(),
        }
    }

    fn lookup(&self, name: &str) -> Option<&Rc<TypeInfo>> {
        self.types
            .iter()
            .chain(self.builtins.iter())
            .find(|t| t.alias == name)
    }
}

fn resolve_file(file: &DefinitionFile, errors: &mut ErrorCollection) -> Vec<Rc<TypeInfo>> {
    let mut scope = Scope::new();
    let mut definitions = Vec::with_capacity(file.types.len());

    for def in &file.types {
        let record = resolve_type_definition(def, &scope, errors);

        if scope.lookup(&def.name).is_some() {
            errors.add(ErrorInfo::with_args(
                def.debug.clone(),
                ErrorKind::ShadowingType,
                &[&def.name],
            ));
        }

        scope.types.push(Rc::clone(&record));
        definitions.push(record);
    }

    definitions
}

fn resolve_type_definition(
    def: &TypeDefAst,
    scope: &Scope,
    errors: &mut ErrorCollection,
) -> Rc<TypeInfo> {
    let mut fields: Vec<FieldDecl> = Vec::with_capacity(def.members.len());

    for member in &def.members {
        if fields.iter().any(|f| f.name == member.name) {
            errors.add(ErrorInfo::with_args(
                member.debug.clone(),
                ErrorKind::ShadowingMember,
                &[&member.name],
            ));
            continue;
        }
        if scope.lookup(&member.name).is_some() || member.name == def.name {
            errors.add(
                ErrorInfo::with_args(
                    member.debug.clone(),
                    ErrorKind::ShadowingType,
                    &[&member.name],
                )
                .warning(),
            );
        }

        let Some(base) = scope.lookup(&member.type_use.name) else {
            errors.add(ErrorInfo::with_args(
                member.type_use.debug.clone(),
                ErrorKind::UnknownType,
                &[&member.type_use.name],
            ));
            continue;
        };

        let options = apply_options(&member.type_use.options, base.option_types(), errors);
        let ty = base.instantiate(member.type_use.debug.clone(), &options);
        fields.push(FieldDecl {
            name: member.name.clone(),
            ty: Rc::new(ty),
            debug: member.debug.clone(),
        });
    }

    let record = Rc::new(RecordType {
        name: def.name.clone(),
        debug: def.debug.clone(),
        fields,
    });
    Rc::new(TypeInfo::record(def.debug.clone(), record))
}

struct GatheredOption<'a> {
    debug: &'a DebugInfo,
    ty: OptionType,
    value: &'a Value,
}

/// Gathers the option terms of one type use (reporting unknown and duplicate
/// names), then parses and applies them against the type's allowed set.
fn apply_options(
    terms: &[OptionTermAst],
    allowed: &'static [OptionType],
    errors: &mut ErrorCollection,
) -> Options {
    let mut gathered: Vec<GatheredOption<'_>> = Vec::with_capacity(terms.len());
    let mut named_types: Vec<OptionType> = Vec::new();

    for term in terms {
        let ty = match &term.name {
            Some(name) => {
                let ty = option_type_from_name(name);
                if ty == OptionType::Unknown {
                    errors.add(ErrorInfo::with_args(
                        term.debug.clone(),
                        ErrorKind::UnknownOptionType,
                        &[name],
                    ));
                }
                ty
            }
            None => OptionType::Unknown,
        };
        if ty != OptionType::Unknown {
            if named_types.contains(&ty) {
                errors.add(ErrorInfo::with_args(
                    term.debug.clone(),
                    ErrorKind::DuplicateOption,
                    &[&ty.to_string()],
                ));
                continue;
            }
            named_types.push(ty);
        }
        gathered.push(GatheredOption {
            debug: &term.debug,
            ty,
            value: &term.value,
        });
    }

    let mut options = Options::default();
    for opt in gathered {
        let named = [opt.ty];
        let request: &[OptionType] = if opt.ty == OptionType::Unknown {
            allowed
        } else {
            &named
        };

        match Options::parse_option(request, opt.value) {
            Ok(value) => {
                if !allowed.is_empty() && !allowed.contains(&value.option_type()) {
                    errors.add(ErrorInfo::with_args(
                        opt.debug.clone(),
                        ErrorKind::OptionInvalidForType,
                        &[&value.option_type().to_string()],
                    ));
                } else {
                    options.set(value);
                }
            }
            Err(OptionParseError::InvalidValueType) => {
                if opt.ty == OptionType::Unknown {
                    errors.add(ErrorInfo::new(
                        opt.debug.clone(),
                        ErrorKind::OptionMustBeString,
                    ));
                } else {
                    errors.add(ErrorInfo::with_args(
                        opt.debug.clone(),
                        ErrorKind::OptionMustBeStringTyped,
                        &[&opt.ty.to_string()],
                    ));
                }
            }
            Err(OptionParseError::UnknownString) => {
                let text = opt.value.as_str().unwrap_or_default();
                if opt.ty == OptionType::Unknown {
                    errors.add(ErrorInfo::with_args(
                        opt.debug.clone(),
                        ErrorKind::UnknownOptionValue,
                        &[text],
                    ));
                } else {
                    errors.add(ErrorInfo::with_args(
                        opt.debug.clone(),
                        ErrorKind::UnknownOptionValueTyped,
                        &[text, &opt.ty.to_string()],
                    ));
                }
            }
            Err(OptionParseError::Ambiguous) => {
                // Cannot happen with an explicit name; only one type is asked.
                let text = opt.value.as_str().unwrap_or_default();
                errors.add(ErrorInfo::with_args(
                    opt.debug.clone(),
                    ErrorKind::AmbiguousOption,
                    &[text],
                ));
            }
        }
    }

    options
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(text: &str) -> Vec<Rc<TypeInfo>> {
        let mut errors = ErrorCollection::new();
        let defs = parse_definition("test.def", text, &mut errors);
        assert!(
            defs.is_some(),
            "expected success, got: {:?}",
            errors.errors()
        );
        defs.unwrap()
    }

    #[test]
    fn empty_file_parses_to_nothing() {
        assert!(parse_ok("").is_empty());
    }

    #[test]
    fn grammar_error_is_single_unknown_diagnostic() {
        let mut errors = ErrorCollection::new();
        let defs = parse_definition("test.def", "type foo { int16 x; ", &mut errors);
        assert!(defs.is_none());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors()[0].kind, ErrorKind::Unknown);
        assert!(errors.errors()[0].debug.line >= 1);
    }

    #[test]
    fn option_terms_reach_the_model() {
        let defs = parse_ok("type foo { uint16(little) x; int16(signedness = signed, order = big) y; }");
        assert_eq!(defs.len(), 1);
    }

    #[test]
    fn duplicate_named_option_is_reported() {
        let mut errors = ErrorCollection::new();
        let defs = parse_definition(
            "test.def",
            "type foo { uint16(order = little, order = big) x; }",
            &mut errors,
        );
        assert!(defs.is_none());
        assert!(errors
            .iter()
            .any(|e| e.kind == ErrorKind::DuplicateOption));
    }
}
