//! The declaration vocabulary used to describe a unit of work's signature.
//!
//! There is no runtime reflection to lean on, so every type that may appear in
//! a parameter list says what it is through [`Describe`]. Structured types list
//! their fields through [`Model`], and parameter lists through [`Parameters`].

use crate::core::ConfigValue;
use crate::core::binder::BoundArguments;
use crate::core::schema::{ParamDescriptor, SchemaNode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Primitive kinds a parameter can be bound to.
#[derive(Debug, Clone)]
pub enum Primitive {
    /// An integer type and its inclusive range.
    Int { min: i128, max: i128 },
    /// A float type and its largest finite value.
    Float { max: f64 },
    Str,
    Bool,
    Path,
    List(Box<Element>),
    Set(Box<Element>),
    Tuple(Vec<Element>),
    Dict(Box<Element>),
}

impl Primitive {
    /// The name shown in help text.
    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Int { .. } => "int",
            Primitive::Float { .. } => "float",
            Primitive::Str => "str",
            Primitive::Bool => "bool",
            Primitive::Path => "path",
            Primitive::List(_) => "list",
            Primitive::Set(_) => "set",
            Primitive::Tuple(_) => "tuple",
            Primitive::Dict(_) => "dict",
        }
    }

    /// Element types of a collection; empty for scalars.
    pub fn elements(&self) -> Vec<&Element> {
        match self {
            Primitive::List(item) | Primitive::Set(item) | Primitive::Dict(item) => vec![item],
            Primitive::Tuple(items) => items.iter().collect(),
            _ => Vec::new(),
        }
    }
}

/// The classification of a declared type.
#[derive(Debug, Clone)]
pub enum TypeClass {
    Primitive(Primitive),
    /// A model with named, individually typed fields.
    Structured(Arc<SchemaNode>),
    /// Nothing declared: `()` as an output means "no result".
    Unit,
    /// Untyped (`serde_json::Value`). Accepted for collection items and
    /// outputs, rejected for parameters.
    Dynamic,
    /// A type that cannot be bound from configuration.
    Invalid(String),
}

impl TypeClass {
    /// Builds the structured class of `M` from its field declarations.
    pub fn model<M: Model>() -> Self {
        let fields = M::fields(Fields::new());
        TypeClass::Structured(Arc::new(SchemaNode::from_fields(
            std::any::type_name::<M>(),
            fields,
        )))
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        TypeClass::Invalid(reason.into())
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, TypeClass::Structured(_))
    }

    pub fn type_name(&self) -> String {
        match self {
            TypeClass::Primitive(primitive) => primitive.name().to_string(),
            TypeClass::Structured(node) => node.short_name().to_string(),
            TypeClass::Unit => "none".to_string(),
            TypeClass::Dynamic => "any".to_string(),
            TypeClass::Invalid(reason) => format!("invalid<{reason}>"),
        }
    }
}

/// A collection element: its class plus whether `null` is acceptable.
#[derive(Debug, Clone)]
pub struct Element {
    pub class: TypeClass,
    pub optional: bool,
}

impl Element {
    pub fn of<T: Describe>() -> Self {
        Self {
            class: T::type_class(),
            optional: T::is_optional(),
        }
    }
}

/// Implemented by every type that can appear in a signature.
pub trait Describe {
    fn type_class() -> TypeClass;

    /// `true` for `Option<T>`; the class is then the class of `T`.
    fn is_optional() -> bool {
        false
    }
}

/// A structured type: lists its fields once, in declaration order.
///
/// Pair it with [`describe_model!`](crate::describe_model) to make the type
/// usable as a parameter, a field, or an output.
pub trait Model: DeserializeOwned + Serialize {
    fn fields(fields: Fields) -> Fields;
}

/// The parameter list of a unit of work.
///
/// Implemented on a plain `Deserialize` struct whose field names match the
/// declared parameters.
pub trait Parameters: DeserializeOwned {
    fn declare(params: Fields) -> Fields;

    /// Turns bound arguments into the typed parameter struct.
    fn from_bound(bound: BoundArguments) -> Result<Self, serde_json::Error> {
        serde_json::from_value(ConfigValue::Object(bound))
    }
}

impl Parameters for () {
    fn declare(params: Fields) -> Fields {
        params
    }

    fn from_bound(_bound: BoundArguments) -> Result<Self, serde_json::Error> {
        Ok(())
    }
}

/// Builder for parameter and field declarations.
#[derive(Debug, Default)]
pub struct Fields {
    pub(crate) entries: Vec<ParamDescriptor>,
    pub(crate) problems: Vec<(String, String)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a field without a default.
    pub fn required<T: Describe>(mut self, name: impl Into<String>) -> Self {
        let position = self.entries.len();
        self.entries.push(ParamDescriptor {
            name: name.into(),
            position,
            class: T::type_class(),
            optional: T::is_optional(),
            default: None,
        });
        self
    }

    /// Declares a field with a default value.
    pub fn with_default<T: Describe + Serialize>(mut self, name: impl Into<String>, value: T) -> Self {
        let name = name.into();
        let default = match serde_json::to_value(&value) {
            Ok(default) => Some(default),
            Err(e) => {
                self.problems
                    .push((name.clone(), format!("has a default that cannot be serialised: {e}")));
                None
            }
        };
        let position = self.entries.len();
        self.entries.push(ParamDescriptor {
            name,
            position,
            class: T::type_class(),
            optional: T::is_optional(),
            default,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Implements [`Describe`] for one or more [`Model`] types.
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use typeflow::prelude::*;
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct Database {
///     host: String,
///     port: u16,
/// }
///
/// impl Model for Database {
///     fn fields(fields: Fields) -> Fields {
///         fields.required::<String>("host").with_default("port", 5432u16)
///     }
/// }
///
/// typeflow::describe_model!(Database);
/// ```
#[macro_export]
macro_rules! describe_model {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Describe for $ty {
                fn type_class() -> $crate::TypeClass {
                    $crate::TypeClass::model::<$ty>()
                }
            }
        )+
    };
}

macro_rules! describe_primitive {
    ($kind:ident => $($ty:ty),+) => {
        $(
            impl Describe for $ty {
                fn type_class() -> TypeClass {
                    TypeClass::Primitive(Primitive::$kind)
                }
            }
        )+
    };
}

macro_rules! describe_int {
    ($($ty:ty),+) => {
        $(
            impl Describe for $ty {
                fn type_class() -> TypeClass {
                    TypeClass::Primitive(Primitive::Int {
                        min: <$ty>::MIN as i128,
                        max: <$ty>::MAX as i128,
                    })
                }
            }
        )+
    };
}

describe_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Describe for f32 {
    fn type_class() -> TypeClass {
        TypeClass::Primitive(Primitive::Float {
            max: f64::from(f32::MAX),
        })
    }
}

impl Describe for f64 {
    fn type_class() -> TypeClass {
        TypeClass::Primitive(Primitive::Float { max: f64::MAX })
    }
}
describe_primitive!(Str => String);
describe_primitive!(Bool => bool);
describe_primitive!(Path => PathBuf);

impl<T: Describe> Describe for Option<T> {
    fn type_class() -> TypeClass {
        T::type_class()
    }

    fn is_optional() -> bool {
        true
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn type_class() -> TypeClass {
        TypeClass::Primitive(Primitive::List(Box::new(Element::of::<T>())))
    }
}

impl<T: Describe> Describe for HashSet<T> {
    fn type_class() -> TypeClass {
        TypeClass::Primitive(Primitive::Set(Box::new(Element::of::<T>())))
    }
}

impl<T: Describe> Describe for BTreeSet<T> {
    fn type_class() -> TypeClass {
        TypeClass::Primitive(Primitive::Set(Box::new(Element::of::<T>())))
    }
}

impl<T: Describe> Describe for HashMap<String, T> {
    fn type_class() -> TypeClass {
        TypeClass::Primitive(Primitive::Dict(Box::new(Element::of::<T>())))
    }
}

impl<T: Describe> Describe for BTreeMap<String, T> {
    fn type_class() -> TypeClass {
        TypeClass::Primitive(Primitive::Dict(Box::new(Element::of::<T>())))
    }
}

impl<A: Describe, B: Describe> Describe for (A, B) {
    fn type_class() -> TypeClass {
        TypeClass::Primitive(Primitive::Tuple(vec![Element::of::<A>(), Element::of::<B>()]))
    }
}

impl<A: Describe, B: Describe, C: Describe> Describe for (A, B, C) {
    fn type_class() -> TypeClass {
        TypeClass::Primitive(Primitive::Tuple(vec![
            Element::of::<A>(),
            Element::of::<B>(),
            Element::of::<C>(),
        ]))
    }
}

impl Describe for () {
    fn type_class() -> TypeClass {
        TypeClass::Unit
    }
}

impl Describe for ConfigValue {
    fn type_class() -> TypeClass {
        TypeClass::Dynamic
    }
}
