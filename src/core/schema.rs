//! Schema derivation and the process-wide signature cache.
//!
//! A unit of work's signature is derived exactly once per logic type. The
//! result, including a failed derivation, is kept for the life of the process
//! and shared by every instance of that type.

use crate::core::ConfigValue;
use crate::core::compact::{self, CompactSchema};
use crate::core::describe::{Describe, Element, Fields, Parameters, TypeClass};
use crate::core::error::SchemaDerivationError;
use crate::core::task::WorkLogic;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// One declared parameter, or one field of a structured type.
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    pub name: String,
    /// Position in the declaring parameter list or model.
    pub position: usize,
    /// Classification after unwrapping `Option<T>`.
    pub class: TypeClass,
    pub optional: bool,
    pub default: Option<ConfigValue>,
}

impl ParamDescriptor {
    /// The nested node of a structured parameter.
    pub fn children(&self) -> Option<&SchemaNode> {
        match &self.class {
            TypeClass::Structured(node) => Some(node),
            _ => None,
        }
    }
}

/// A named collection of descriptors: a parameter list or a model's fields.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    type_name: &'static str,
    fields: Vec<ParamDescriptor>,
    problems: Vec<(String, String)>,
}

impl SchemaNode {
    pub(crate) fn from_fields(type_name: &'static str, fields: Fields) -> Self {
        Self {
            type_name,
            fields: fields.entries,
            problems: fields.problems,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The type name without its module path.
    pub fn short_name(&self) -> &'static str {
        let base = self.type_name.split('<').next().unwrap_or(self.type_name);
        base.rsplit("::").next().unwrap_or(base)
    }

    pub fn fields(&self) -> &[ParamDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&ParamDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Derives the parameter schema of `P`, collecting every problem found.
pub fn derive<P: Parameters>() -> (SchemaNode, Vec<String>) {
    let node = SchemaNode::from_fields(std::any::type_name::<P>(), P::declare(Fields::new()));
    let mut errors = Vec::new();
    inspect_node(&node, "", &mut errors);
    (node, errors)
}

fn inspect_node(node: &SchemaNode, prefix: &str, errors: &mut Vec<String>) {
    for (name, problem) in &node.problems {
        errors.push(format!("fn param '{}' {problem}", join_path(prefix, name)));
    }

    let mut seen = HashSet::new();
    for field in &node.fields {
        let path = join_path(prefix, &field.name);
        if !seen.insert(field.name.as_str()) {
            errors.push(format!("fn param '{path}' is declared more than once"));
        }
        inspect_class(&field.class, &path, errors);
    }
}

fn inspect_class(class: &TypeClass, path: &str, errors: &mut Vec<String>) {
    match class {
        TypeClass::Primitive(primitive) => {
            for element in primitive.elements() {
                inspect_element(element, path, errors);
            }
        }
        TypeClass::Structured(node) => inspect_node(node, path, errors),
        TypeClass::Dynamic | TypeClass::Unit => {
            errors.push(format!("fn param '{path}' has no type. Not allowed"));
        }
        TypeClass::Invalid(reason) => errors.push(format!(
            "fn param '{path}' is an unknown type ({reason}). Only basic types \
             (int, float, str, bool, list, dict, tuple, set, path) or models are allowed"
        )),
    }
}

fn inspect_element(element: &Element, path: &str, errors: &mut Vec<String>) {
    match &element.class {
        TypeClass::Dynamic => {}
        TypeClass::Primitive(primitive) => {
            for inner in primitive.elements() {
                inspect_element(inner, path, errors);
            }
        }
        TypeClass::Structured(node) => inspect_node(node, &format!("{path}[]"), errors),
        other => errors.push(format!(
            "fn param '{path}' has an unsupported item type '{}'",
            other.type_name()
        )),
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// The derived contract of a unit-of-work type.
#[derive(Debug)]
pub struct Signature {
    /// Type name of the logic the signature was derived from.
    pub unit: &'static str,
    pub inputs: SchemaNode,
    pub output: TypeClass,
    pub compact: CompactSchema,
}

type CacheEntry = Result<Arc<Signature>, SchemaDerivationError>;

static SIGNATURES: OnceLock<RwLock<HashMap<TypeId, CacheEntry>>> = OnceLock::new();

/// Returns the cached signature of `L`, deriving it on first use.
pub fn signature_of<L: WorkLogic>() -> CacheEntry {
    let cache = SIGNATURES.get_or_init(Default::default);
    let key = TypeId::of::<L>();

    if let Some(entry) = cache.read().unwrap_or_else(PoisonError::into_inner).get(&key) {
        return entry.clone();
    }

    // Re-checked under the write lock so concurrent first uses derive once.
    let mut signatures = cache.write().unwrap_or_else(PoisonError::into_inner);
    signatures
        .entry(key)
        .or_insert_with(build_signature::<L>)
        .clone()
}

fn build_signature<L: WorkLogic>() -> CacheEntry {
    let unit = std::any::type_name::<L>();
    let (inputs, errors) = derive::<L::Params>();

    if !errors.is_empty() {
        for error in &errors {
            log::error!("ERROR: {error}");
        }
        return Err(SchemaDerivationError {
            unit: unit.to_string(),
            errors,
        });
    }

    let compact = compact::render(&inputs);
    log::debug!("Derived signature for {unit}: {} parameter(s)", inputs.fields().len());
    Ok(Arc::new(Signature {
        unit,
        inputs,
        output: <L::Output as Describe>::type_class(),
        compact,
    }))
}
