//! Saved export templates
//!
//! A template is a named [`ExportOptions`] set kept in the key-value store
//! under [`TEMPLATES_KEY`]. Names are unique; saving under an existing name
//! replaces that template's options and keeps its id.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::export::ExportOptions;
use crate::error::{ReelError, ReelResult};
use crate::models::{timestamp, TemplateId};
use crate::storage::{read_collection, write_value, KeyValueStore, TEMPLATES_KEY};

/// A named set of export options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportTemplate {
    pub id: TemplateId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub options: ExportOptions,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Template persistence
#[derive(Clone)]
pub struct TemplateStore {
    store: Arc<dyn KeyValueStore>,
}

impl TemplateStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// All templates, sorted by name
    pub fn list(&self) -> Vec<ExportTemplate> {
        let mut templates: Vec<ExportTemplate> = read_collection(self.store.as_ref(), TEMPLATES_KEY);
        templates.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        templates
    }

    /// Save options under a name
    pub fn save(
        &self,
        name: &str,
        description: Option<String>,
        options: ExportOptions,
    ) -> ReelResult<ExportTemplate> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ReelError::Validation("Template name cannot be empty".into()));
        }

        let now = timestamp::now();
        let mut templates = self.list();
        let template = match templates.iter_mut().find(|t| t.name.eq_ignore_ascii_case(name)) {
            Some(existing) => {
                existing.description = description;
                existing.options = options;
                existing.updated_at = now;
                existing.clone()
            }
            None => {
                let template = ExportTemplate {
                    id: TemplateId::new(),
                    name: name.to_string(),
                    description,
                    options,
                    created_at: now,
                    updated_at: now,
                };
                templates.push(template.clone());
                template
            }
        };

        write_value(self.store.as_ref(), TEMPLATES_KEY, &templates)?;
        tracing::info!(template_id = %template.id, name = %template.name, "Saved export template");
        Ok(template)
    }

    /// Find a template by id or by name (case-insensitive)
    pub fn get(&self, id_or_name: &str) -> ReelResult<ExportTemplate> {
        let id = id_or_name.parse::<TemplateId>().ok();
        self.list()
            .into_iter()
            .find(|t| Some(t.id) == id || t.name.eq_ignore_ascii_case(id_or_name))
            .ok_or_else(|| ReelError::template_not_found(id_or_name))
    }

    /// Delete a template by id or name
    pub fn delete(&self, id_or_name: &str) -> ReelResult<ExportTemplate> {
        let template = self.get(id_or_name)?;
        let templates: Vec<ExportTemplate> = self
            .list()
            .into_iter()
            .filter(|t| t.id != template.id)
            .collect();
        write_value(self.store.as_ref(), TEMPLATES_KEY, &templates)?;
        tracing::info!(template_id = %template.id, "Deleted export template");
        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileFormat;
    use crate::storage::MemoryStore;

    fn store() -> TemplateStore {
        TemplateStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_save_and_get() {
        let templates = store();
        let options = ExportOptions {
            format: FileFormat::Csv,
            ..Default::default()
        };
        let saved = templates.save("Slides", Some("csv for slides".into()), options).unwrap();

        assert_eq!(templates.get("slides").unwrap().id, saved.id);
        assert_eq!(templates.get(&saved.id.as_uuid().to_string()).unwrap().name, "Slides");
        assert_eq!(templates.get("Slides").unwrap().options.format, FileFormat::Csv);
    }

    #[test]
    fn test_save_same_name_replaces() {
        let templates = store();
        let first = templates.save("web", None, ExportOptions::default()).unwrap();
        let second = templates
            .save(
                "WEB",
                None,
                ExportOptions {
                    format: FileFormat::Xml,
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(templates.list().len(), 1);
        assert_eq!(templates.list()[0].options.format, FileFormat::Xml);
    }

    #[test]
    fn test_delete_and_not_found() {
        let templates = store();
        templates.save("a", None, ExportOptions::default()).unwrap();
        templates.save("b", None, ExportOptions::default()).unwrap();

        templates.delete("a").unwrap();
        let names: Vec<String> = templates.list().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["b"]);
        assert!(templates.delete("a").unwrap_err().is_not_found());
    }

    #[test]
    fn test_empty_name_is_rejected() {
        assert!(store().save("  ", None, ExportOptions::default()).unwrap_err().is_validation());
    }
}
