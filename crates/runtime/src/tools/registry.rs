//! The tool registry: specs the model is offered.

use super::ToolKind;
use crate::model::ToolSpec;

/// An order-stable list of tool specifications.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
}

impl ToolRegistry {
    /// Registry holding every built-in tool.
    pub fn builtin() -> Self {
        Self {
            specs: ToolKind::ALL.into_iter().map(ToolKind::spec).collect(),
        }
    }

    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|spec| spec.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn builtin_order_is_stable() {
        let registry = ToolRegistry::builtin();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, ["list_files", "read_file", "run_bash", "edit_file"]);
    }

    #[test]
    fn names_are_unique() {
        let registry = ToolRegistry::builtin();
        let unique: HashSet<_> = registry.names().collect();
        assert_eq!(unique.len(), registry.len());
    }

    #[test]
    fn lookup_by_name() {
        let registry = ToolRegistry::builtin();
        let spec = registry
            .specs()
            .iter()
            .find(|spec| spec.name == "edit_file")
            .unwrap();
        assert_eq!(
            spec.input_schema["required"],
            serde_json::json!(["path", "search_string", "replace_string"])
        );
        assert!(registry.names().all(|name| name != "missing"));
    }
}
