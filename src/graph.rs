//! Graph records consumed and produced by normalization.
//!
//! The canonicalizers only need the capabilities described by [`NodeRecord`]
//! and [`EdgeRecord`]; [`GraphNode`] and [`GraphEdge`] are the KGX-shaped
//! records the rest of the crate reads and writes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A record with a primary identifier, a label, cross-references and synonyms.
pub trait NodeRecord {
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn name(&self) -> Option<&str>;
    fn set_name(&mut self, name: Option<String>);
    fn xref(&self) -> &[String];
    fn set_xref(&mut self, xref: Vec<String>);
    fn synonym(&self) -> &[String];
    fn set_synonym(&mut self, synonym: Vec<String>);
}

/// A directed statement whose endpoints are node identifiers.
pub trait EdgeRecord {
    fn id(&self) -> &str;
    fn subject(&self) -> &str;
    fn set_subject(&mut self, subject: String);
    fn object(&self) -> &str;
    fn set_object(&mut self, object: String);
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub xref: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonym: Vec<String>,
    /// Properties normalization does not touch.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category.push(category.into());
        self
    }
}

impl NodeRecord for GraphNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    fn xref(&self) -> &[String] {
        &self.xref
    }

    fn set_xref(&mut self, xref: Vec<String>) {
        self.xref = xref;
    }

    fn synonym(&self) -> &[String] {
        &self.synonym
    }

    fn set_synonym(&mut self, synonym: Vec<String>) {
        self.synonym = synonym;
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphEdge {
    #[serde(default)]
    pub id: String,
    pub subject: String,
    pub predicate: String,
    pub object: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GraphEdge {
    pub fn new(
        id: impl Into<String>,
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            extra: Map::new(),
        }
    }
}

impl EdgeRecord for GraphEdge {
    fn id(&self) -> &str {
        &self.id
    }

    fn subject(&self) -> &str {
        &self.subject
    }

    fn set_subject(&mut self, subject: String) {
        self.subject = subject;
    }

    fn object(&self) -> &str {
        &self.object
    }

    fn set_object(&mut self, object: String) {
        self.object = object;
    }
}
