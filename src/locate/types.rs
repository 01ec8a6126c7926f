//! Page and revision entities

use crate::types::{EntityId, JsonObject, JsonValue};
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;

/// A page: an open property bag identified by title and/or page id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Page {
    attributes: JsonObject,
}

impl Page {
    /// Wrap a property bag
    pub fn new(attributes: JsonObject) -> Self {
        Self { attributes }
    }

    /// Page title
    pub fn title(&self) -> Option<&str> {
        self.attributes.get("title").and_then(JsonValue::as_str)
    }

    /// Canonical page id
    pub fn page_id(&self) -> Option<EntityId> {
        self.attributes.get("pageid").and_then(EntityId::from_value)
    }

    /// Whether the page does not exist (or its title is invalid)
    pub fn is_missing(&self) -> bool {
        is_flagged(&self.attributes, "missing") || is_flagged(&self.attributes, "invalid")
    }

    /// Look up one attribute
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.attributes.get(key)
    }

    /// The page's revisions, if they were requested
    pub fn revisions(&self) -> &[JsonValue] {
        self.attributes
            .get("revisions")
            .and_then(JsonValue::as_array)
            .map_or(&[], Vec::as_slice)
    }

    /// All attributes
    pub fn attributes(&self) -> &JsonObject {
        &self.attributes
    }

    /// Mutable access to all attributes
    pub fn attributes_mut(&mut self) -> &mut JsonObject {
        &mut self.attributes
    }

    /// Unwrap into the property bag
    pub fn into_attributes(self) -> JsonObject {
        self.attributes
    }

    /// A copy of this page with its `revisions` list removed
    pub fn without_revisions(&self) -> Page {
        let mut attributes = self.attributes.clone();
        attributes.remove("revisions");
        Page { attributes }
    }
}

impl From<JsonObject> for Page {
    fn from(attributes: JsonObject) -> Self {
        Self::new(attributes)
    }
}

/// A revision, with an optional association to the page it belongs to.
///
/// The owning page is held as a side channel next to the attributes, never
/// inside them, and carries no `revisions` list. It is absent for revisions
/// known to be missing. Serializing a revision emits its attributes only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Revision {
    attributes: JsonObject,
    page: Option<Arc<Page>>,
}

impl Revision {
    /// A revision without a known page
    pub fn new(attributes: JsonObject) -> Self {
        Self {
            attributes,
            page: None,
        }
    }

    /// A revision located inside `page`
    pub fn with_page(attributes: JsonObject, page: Arc<Page>) -> Self {
        Self {
            attributes,
            page: Some(page),
        }
    }

    /// Canonical revision id
    pub fn rev_id(&self) -> Option<EntityId> {
        self.attributes.get("revid").and_then(EntityId::from_value)
    }

    /// Revision timestamp, as returned by the API
    pub fn timestamp(&self) -> Option<&str> {
        self.attributes.get("timestamp").and_then(JsonValue::as_str)
    }

    /// Whether the revision does not exist
    pub fn is_missing(&self) -> bool {
        is_flagged(&self.attributes, "missing")
    }

    /// The owning page (without its revisions)
    pub fn page(&self) -> Option<&Page> {
        self.page.as_deref()
    }

    /// Look up one attribute
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.attributes.get(key)
    }

    /// All attributes
    pub fn attributes(&self) -> &JsonObject {
        &self.attributes
    }

    /// Mutable access to all attributes
    pub fn attributes_mut(&mut self) -> &mut JsonObject {
        &mut self.attributes
    }

    /// Mutable access to the owning page, if one is associated
    pub fn page_mut(&mut self) -> Option<&mut Page> {
        self.page.as_mut().map(Arc::make_mut)
    }

    /// Associate the owning page
    pub fn set_page(&mut self, page: Arc<Page>) {
        self.page = Some(page);
    }

    /// Unwrap into the property bag, dropping the page association
    pub fn into_attributes(self) -> JsonObject {
        self.attributes
    }
}

impl Serialize for Revision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.attributes.serialize(serializer)
    }
}

fn is_flagged(attributes: &JsonObject, key: &str) -> bool {
    attributes
        .get(key)
        .is_some_and(|v| !matches!(v, JsonValue::Bool(false) | JsonValue::Null))
}
