//! Human-readable rendering of a derived schema, used for CLI help text.

use crate::core::ConfigValue;
use crate::core::schema::SchemaNode;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// A rendered entry: either `"<type> (<default>)"` or a nested mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompactEntry {
    Leaf(String),
    Nested(CompactSchema),
}

/// An ordered mapping from field name to rendered entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactSchema {
    entries: Vec<(String, CompactEntry)>,
}

impl CompactSchema {
    pub fn entries(&self) -> &[(String, CompactEntry)] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&CompactEntry> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, entry)| entry)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the schema as a YAML document, keeping declaration order.
    pub fn to_yaml(&self) -> String {
        if self.entries.is_empty() {
            return "{}\n".to_string();
        }
        serde_yaml::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

impl Serialize for CompactSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

impl Serialize for CompactEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CompactEntry::Leaf(text) => serializer.serialize_str(text),
            CompactEntry::Nested(schema) => schema.serialize(serializer),
        }
    }
}

/// Renders a derived schema node.
pub fn render(node: &SchemaNode) -> CompactSchema {
    let entries = node
        .fields()
        .iter()
        .map(|field| {
            let entry = match field.children() {
                Some(child) => CompactEntry::Nested(render(child)),
                None => {
                    let type_name = field.class.type_name();
                    match field.default.as_ref().filter(|d| is_truthy(d)) {
                        Some(default) => CompactEntry::Leaf(format!("{type_name} ({})", display(default))),
                        None => CompactEntry::Leaf(type_name),
                    }
                }
            };
            (field.name.clone(), entry)
        })
        .collect();

    CompactSchema { entries }
}

// Empty defaults (null, false, 0, "", [] and {}) are not shown.
fn is_truthy(value: &ConfigValue) -> bool {
    match value {
        ConfigValue::Null => false,
        ConfigValue::Bool(b) => *b,
        ConfigValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        ConfigValue::String(s) => !s.is_empty(),
        ConfigValue::Array(items) => !items.is_empty(),
        ConfigValue::Object(map) => !map.is_empty(),
    }
}

/// Strings render raw; any other default renders as compact JSON (`["a"]`, `{"k":1}`).
fn display(value: &ConfigValue) -> String {
    match value {
        ConfigValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::describe::{Fields, Model, Parameters};
    use crate::core::schema::derive;
    use crate::describe_model;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct ChildModel {
        child_param1: String,
        child_param2: i64,
        child_param3: bool,
    }

    impl Model for ChildModel {
        fn fields(fields: Fields) -> Fields {
            fields
                .required::<String>("child_param1")
                .with_default("child_param2", 42i64)
                .with_default("child_param3", true)
        }
    }

    describe_model!(ChildModel);

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Example {
        param1: String,
        child: ChildModel,
        param2: i64,
        param3: bool,
        label: String,
    }

    impl Parameters for Example {
        fn declare(params: Fields) -> Fields {
            params
                .required::<String>("param1")
                .required::<ChildModel>("child")
                .with_default("param2", 0i64)
                .with_default("param3", false)
                .with_default("label", String::from("nightly"))
        }
    }

    #[test]
    fn test_render_leaves_and_nested_mappings() {
        let (node, errors) = derive::<Example>();
        assert!(errors.is_empty());
        let compact = render(&node);

        assert_eq!(compact.get("param1"), Some(&CompactEntry::Leaf("str".into())));
        assert_eq!(compact.get("param2"), Some(&CompactEntry::Leaf("int".into())));
        assert_eq!(compact.get("param3"), Some(&CompactEntry::Leaf("bool".into())));
        assert_eq!(
            compact.get("label"),
            Some(&CompactEntry::Leaf("str (nightly)".into()))
        );

        let Some(CompactEntry::Nested(child)) = compact.get("child") else {
            panic!("child should render as a nested mapping");
        };
        assert_eq!(child.get("child_param2"), Some(&CompactEntry::Leaf("int (42)".into())));
        assert_eq!(child.get("child_param3"), Some(&CompactEntry::Leaf("bool (true)".into())));
    }

    #[test]
    fn test_render_is_pure() {
        let (node, _) = derive::<Example>();
        assert_eq!(render(&node), render(&node));
        assert_eq!(render(&node).to_yaml(), render(&node).to_yaml());
    }

    #[test]
    fn test_yaml_keeps_declaration_order() {
        let (node, _) = derive::<Example>();
        let yaml = render(&node).to_yaml();
        let param1 = yaml.find("param1").unwrap();
        let child = yaml.find("child:").unwrap();
        let label = yaml.find("label").unwrap();
        assert!(param1 < child && child < label, "{yaml}");
        assert!(yaml.contains("child_param2: int (42)"), "{yaml}");
    }

    #[test]
    fn test_empty_schema_renders_empty_mapping() {
        let (node, _) = derive::<()>();
        let compact = render(&node);
        assert!(compact.is_empty());
        assert_eq!(compact.to_yaml(), "{}\n");
    }

    #[test]
    fn test_display_of_defaults() {
        assert_eq!(display(&serde_json::json!("plain")), "plain");
        assert_eq!(display(&serde_json::json!(["a"])), r#"["a"]"#);
        assert_eq!(display(&serde_json::json!({"k": 1})), r#"{"k":1}"#);
        assert_eq!(display(&serde_json::json!(2.5)), "2.5");
    }
}
