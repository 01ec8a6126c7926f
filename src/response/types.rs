//! Response document types
//!
//! A [`Response`] is built once from the raw JSON document and exposes a
//! single ordered view of its entity collection, whichever shape the API
//! used for it.

use crate::error::{Error, Result};
use crate::types::{EntityId, JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Marker keys that the legacy format encodes as an empty string
const FLAG_KEYS: &[&str] = &["missing", "invalid"];

/// A `{from, to}` title normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleMapping {
    /// Title as given in the request
    pub from: String,
    /// Normalized title
    pub to: String,
}

/// A `{from, to}` redirect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    /// Redirect page title
    pub from: String,
    /// Redirect target title
    pub to: String,
    /// Section fragment of the target, if any
    #[serde(default)]
    pub tofragment: Option<String>,
}

/// A warning attached to a response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Warning {
    /// Machine-readable warning code
    pub code: Option<String>,
    /// Module that raised the warning
    pub module: Option<String>,
    /// Human-readable text
    pub text: Option<String>,
}

/// One entity of the page collection
#[derive(Debug, Clone, PartialEq)]
pub struct PageEntry {
    /// Canonical page id (from `pageid`, else from the collection key)
    pub id: Option<EntityId>,
    /// Page title
    pub title: Option<String>,
    /// The page's property bag
    pub entity: JsonObject,
}

/// One response of a continued query
#[derive(Debug, Clone, Default)]
pub struct Response {
    pages: Vec<PageEntry>,
    /// Direct index by id, only for id-keyed collections
    keyed: Option<HashMap<EntityId, usize>>,
    bad_revisions: Vec<JsonObject>,
    normalized: Vec<TitleMapping>,
    redirects: Vec<Redirect>,
    continuation: Option<JsonObject>,
    batch_complete: bool,
    warnings: Vec<Warning>,
}

impl Response {
    /// Ingest a raw response document
    ///
    /// Fails with [`Error::Api`] if the document carries an API error, and
    /// with [`Error::MalformedResponse`] if its structure is unusable.
    pub fn from_value(value: JsonValue) -> Result<Self> {
        let JsonValue::Object(mut document) = value else {
            return Err(Error::malformed("response is not a JSON object"));
        };

        if let Some(error) = extract_api_error(&document) {
            return Err(error);
        }

        let mut response = Response {
            batch_complete: document.get("batchcomplete").is_some_and(is_flag_set),
            warnings: document
                .get("warnings")
                .map(parse_warnings)
                .unwrap_or_default(),
            ..Default::default()
        };

        match document.remove("continue") {
            Some(JsonValue::Object(token)) => response.continuation = Some(token),
            Some(JsonValue::Null) | None => {}
            Some(other) => {
                return Err(Error::malformed(format!(
                    "'continue' must be an object, got {other}"
                )))
            }
        }

        match document.remove("query") {
            Some(JsonValue::Object(query)) => response.ingest_query(query)?,
            Some(JsonValue::Null) | None => {}
            Some(_) => return Err(Error::malformed("'query' must be an object")),
        }

        Ok(response)
    }

    /// Parse and ingest a response body
    pub fn parse(body: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(body)?)
    }

    fn ingest_query(&mut self, mut query: JsonObject) -> Result<()> {
        if let Some(normalized) = query.remove("normalized") {
            self.normalized = serde_json::from_value(normalized)
                .map_err(|e| Error::malformed(format!("bad 'normalized' list: {e}")))?;
        }
        if let Some(redirects) = query.remove("redirects") {
            self.redirects = serde_json::from_value(redirects)
                .map_err(|e| Error::malformed(format!("bad 'redirects' list: {e}")))?;
        }

        match query.remove("pages") {
            Some(JsonValue::Object(map)) => {
                let mut index = HashMap::with_capacity(map.len());
                for (key, entity) in map {
                    let entry = page_entry(entity, Some(&key))?;
                    if let Some(id) = EntityId::parse(&key).ok().or_else(|| entry.id.clone()) {
                        index.insert(id, self.pages.len());
                    }
                    self.pages.push(entry);
                }
                self.keyed = Some(index);
            }
            Some(JsonValue::Array(list)) => {
                for entity in list {
                    self.pages.push(page_entry(entity, None)?);
                }
            }
            Some(JsonValue::Null) | None => {}
            Some(_) => return Err(Error::malformed("'pages' must be an object or an array")),
        }

        let bad = match query.remove("badrevids") {
            Some(JsonValue::Object(map)) => map.into_iter().map(|(_, entity)| entity).collect(),
            Some(JsonValue::Array(list)) => list,
            _ => Vec::new(),
        };
        for entity in bad {
            let JsonValue::Object(mut entity) = entity else {
                return Err(Error::malformed("bad revision entry is not an object"));
            };
            backfill_flags(&mut entity);
            // an entry listed under badrevids is missing by definition
            entity.entry("missing").or_insert(JsonValue::Bool(true));
            self.bad_revisions.push(entity);
        }

        Ok(())
    }

    /// All page entities, in document order
    pub fn pages(&self) -> &[PageEntry] {
        &self.pages
    }

    /// Look a page up by canonical id
    pub fn page_by_id(&self, id: &EntityId) -> Option<&PageEntry> {
        match &self.keyed {
            Some(index) => index.get(id).map(|&i| &self.pages[i]),
            None => self.pages.iter().find(|p| p.id.as_ref() == Some(id)),
        }
    }

    /// Whether the page collection was keyed by id
    pub fn is_keyed(&self) -> bool {
        self.keyed.is_some()
    }

    /// Entries of `query.badrevids`
    pub fn bad_revisions(&self) -> &[JsonObject] {
        &self.bad_revisions
    }

    /// Title normalizations, in document order
    pub fn normalized(&self) -> &[TitleMapping] {
        &self.normalized
    }

    /// Redirects, in document order
    pub fn redirects(&self) -> &[Redirect] {
        &self.redirects
    }

    /// The opaque continuation token, if more responses follow
    pub fn continuation(&self) -> Option<&JsonObject> {
        self.continuation.as_ref()
    }

    /// Whether this response completes the current batch
    pub fn is_batch_complete(&self) -> bool {
        self.batch_complete
    }

    /// Warnings attached to this response
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

/// Build a page entry, normalizing its legacy flags
fn page_entry(entity: JsonValue, key: Option<&str>) -> Result<PageEntry> {
    let JsonValue::Object(mut entity) = entity else {
        return Err(Error::malformed("page entry is not an object"));
    };
    backfill_flags(&mut entity);

    let id = entity
        .get("pageid")
        .and_then(EntityId::from_value)
        .or_else(|| key.and_then(|k| EntityId::parse(k).ok()));
    let title = entity
        .get("title")
        .and_then(JsonValue::as_str)
        .map(String::from);

    Ok(PageEntry { id, title, entity })
}

/// Rewrite `""` markers to `true` so "missing" is always boolean
fn backfill_flags(entity: &mut JsonObject) {
    for key in FLAG_KEYS {
        if let Some(flag) = entity.get_mut(*key) {
            if flag.as_str() == Some("") {
                *flag = JsonValue::Bool(true);
            }
        }
    }
}

/// Whether a flag-style field counts as set (`""` or `true`)
fn is_flag_set(value: &JsonValue) -> bool {
    !matches!(value, JsonValue::Bool(false) | JsonValue::Null)
}

fn extract_api_error(document: &JsonObject) -> Option<Error> {
    let error = match document.get("error") {
        Some(error) => error,
        None => document
            .get("errors")
            .and_then(JsonValue::as_array)
            .and_then(|errors| errors.first())?,
    };
    let field = |name: &str| error.get(name).and_then(JsonValue::as_str).map(String::from);
    Some(Error::Api {
        code: field("code").unwrap_or_else(|| "unknown".to_string()),
        info: field("info")
            .or_else(|| field("text"))
            .or_else(|| field("*"))
            .unwrap_or_default(),
    })
}

/// Accepts both `[{code, module, text}]` and the legacy `{module: {"*": text}}`
fn parse_warnings(value: &JsonValue) -> Vec<Warning> {
    let str_field =
        |v: &JsonValue, name: &str| v.get(name).and_then(JsonValue::as_str).map(String::from);
    match value {
        JsonValue::Array(list) => list
            .iter()
            .map(|w| Warning {
                code: str_field(w, "code"),
                module: str_field(w, "module"),
                text: str_field(w, "text").or_else(|| str_field(w, "*")),
            })
            .collect(),
        JsonValue::Object(by_module) => by_module
            .iter()
            .map(|(module, w)| Warning {
                code: str_field(w, "code"),
                module: Some(module.clone()),
                text: str_field(w, "warnings").or_else(|| str_field(w, "*")),
            })
            .collect(),
        _ => Vec::new(),
    }
}
