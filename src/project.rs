//! # Projects
//!
//! A project groups several pages, each one graph document plus the program text last compiled
//! from it, together with the variable store the pages share.

use crate::error::SerializeError;
use crate::runtime::VariableStore;
use crate::serialization::Document;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub name: String,
    pub document: Document,
    /// Compiled program text, one entry per compiled chain.
    #[serde(default)]
    pub code: Vec<String>,
}

impl Page {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            document: Document::default(),
            code: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    /// Name of the page open in the editor.
    pub current_page: String,
    pub pages: Vec<Page>,
    #[serde(default, rename = "variableStore")]
    pub variables: VariableStore,
}

impl Project {
    /// Empty project with a single page named `page`.
    pub fn new(page: impl Into<String>) -> Self {
        let page = Page::new(page);
        Self {
            id: Uuid::new_v4().simple().to_string(),
            current_page: page.name.clone(),
            pages: vec![page],
            variables: VariableStore::new(),
        }
    }

    pub fn page(&self, name: &str) -> Option<&Page> {
        self.pages.iter().find(|page| page.name == name)
    }

    pub fn page_mut(&mut self, name: &str) -> Option<&mut Page> {
        self.pages.iter_mut().find(|page| page.name == name)
    }

    pub fn current(&self) -> Option<&Page> {
        self.page(&self.current_page)
    }

    /// Add a page, replacing any page with the same name.
    pub fn upsert_page(&mut self, page: Page) {
        match self.page_mut(&page.name) {
            Some(existing) => *existing = page,
            None => self.pages.push(page),
        }
    }

    pub fn to_json(&self) -> Result<String, SerializeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, SerializeError> {
        let project: Project = serde_json::from_str(text)?;
        tracing::debug!(
            "[SERDE] Loaded project {} with {} pages",
            project.id,
            project.pages.len()
        );
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_load() {
        let mut project = Project::new("main");
        project.variables.set("channel", "hello");
        project.upsert_page(Page {
            name: "main".to_string(),
            document: Document::default(),
            code: vec!["startAgent()".to_string()],
        });
        project.upsert_page(Page::new("second"));

        let text = project.to_json().unwrap();
        let loaded = Project::from_json(&text).unwrap();
        assert_eq!(loaded, project);
        assert_eq!(loaded.pages.len(), 2);
        assert_eq!(loaded.current().unwrap().code, ["startAgent()"]);
    }

    #[test]
    fn malformed_variables_load_as_empty() {
        let text = r#"{"id":"p","currentPage":"main","pages":[],"variableStore":[[1,2]]}"#;
        let project = Project::from_json(text).unwrap();
        assert!(project.variables.is_empty());
        assert!(project.current().is_none());
    }
}
