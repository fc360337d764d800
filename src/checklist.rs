//! Checklist templates.
//!
//! Templates are named, versioned question lists kept as YAML files and
//! loaded once at startup. Answer recording validates question keys against
//! the template named on the inspection; inspections with no template accept
//! any key (older records predate template enforcement).

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{LifecycleError, LifecycleResult};
use crate::models::ChecklistLevel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistQuestion {
    pub key: String,
    pub text: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub requires_photo: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistTemplate {
    pub name: String,
    pub level: ChecklistLevel,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<ChecklistQuestion>,
}

impl ChecklistTemplate {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn has_question(&self, key: &str) -> bool {
        self.questions.iter().any(|q| q.key == key)
    }

    pub fn question_keys(&self) -> Vec<&str> {
        self.questions.iter().map(|q| q.key.as_str()).collect()
    }
}

/// All templates known to this deployment, keyed by template name.
#[derive(Debug, Default)]
pub struct ChecklistRegistry {
    templates: HashMap<String, ChecklistTemplate>,
}

impl ChecklistRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, template: ChecklistTemplate) {
        self.templates.insert(template.name.clone(), template);
    }

    /// Load every `.yaml` file in a directory. Non-YAML files are skipped;
    /// a file that fails to parse aborts the load.
    pub fn load_dir(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let mut registry = Self::new();

        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read checklist directory {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read checklist {}", path.display()))?;
            let template = ChecklistTemplate::from_yaml(&raw)
                .with_context(|| format!("Failed to parse checklist {}", path.display()))?;
            tracing::debug!(
                template = %template.name,
                questions = template.questions.len(),
                "Loaded checklist template"
            );
            registry.insert(template);
        }

        tracing::info!(count = registry.templates.len(), "Checklist registry loaded");
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&ChecklistTemplate> {
        self.templates.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Check a question key against the inspection's template. An empty
    /// template name means no enforcement.
    pub fn validate_question(&self, template_name: &str, question_key: &str) -> LifecycleResult<()> {
        if template_name.is_empty() {
            return Ok(());
        }
        let template = self
            .get(template_name)
            .ok_or_else(|| LifecycleError::UnknownChecklist(template_name.to_string()))?;
        if !template.has_question(question_key) {
            return Err(LifecycleError::UnknownQuestion {
                template: template_name.to_string(),
                question_key: question_key.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CRANE_YAML: &str = r#"
name: crane_simplified
level: SIMPLIFIED
description: Quick visual checks for mobile cranes
questions:
  - key: HOOK_CONDITION
    text: Hook free of cracks and deformation
  - key: WIRE_ROPE
    text: Wire rope free of broken strands
    requires_photo: true
  - key: LOAD_CHART
    text: Load chart present and legible
    category: documentation
"#;

    fn registry() -> ChecklistRegistry {
        let mut registry = ChecklistRegistry::new();
        registry.insert(ChecklistTemplate::from_yaml(CRANE_YAML).unwrap());
        registry
    }

    #[test]
    fn test_parse_template() {
        let template = ChecklistTemplate::from_yaml(CRANE_YAML).unwrap();
        assert_eq!(template.name, "crane_simplified");
        assert_eq!(template.level, ChecklistLevel::Simplified);
        assert_eq!(template.questions.len(), 3);
        assert!(template.questions[1].requires_photo);
        assert!(!template.questions[0].requires_photo);
    }

    #[test]
    fn test_validate_known_question() {
        assert!(registry()
            .validate_question("crane_simplified", "HOOK_CONDITION")
            .is_ok());
    }

    #[test]
    fn test_validate_unknown_question() {
        let err = registry()
            .validate_question("crane_simplified", "BOOM_ANGLE")
            .unwrap_err();
        assert!(matches!(err, LifecycleError::UnknownQuestion { .. }));
    }

    #[test]
    fn test_validate_unknown_template() {
        let err = registry()
            .validate_question("forklift_expanded", "HOOK_CONDITION")
            .unwrap_err();
        assert!(matches!(err, LifecycleError::UnknownChecklist(_)));
    }

    #[test]
    fn test_empty_template_name_skips_validation() {
        assert!(registry().validate_question("", "ANYTHING").is_ok());
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("crane.yaml"), CRANE_YAML).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let registry = ChecklistRegistry::load_dir(dir.path()).unwrap();
        assert_eq!(registry.names(), vec!["crane_simplified"]);
    }
}
