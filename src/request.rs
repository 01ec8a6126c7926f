//! Request shaping
//!
//! A [`QueryRequest`] names exactly one entity set through its
//! [`QueryTarget`] and carries the caller's remaining parameters. Shape
//! violations are rejected before any response is pulled.

use crate::error::{Error, Result};
use crate::types::{EntityId, QueryParams};

/// Parameters that identify the entity set and so belong to the target
const TARGET_KEYS: &[&str] = &["titles", "pageids", "revids", "generator"];

/// The entity set a request asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTarget {
    /// One page by title
    Title(String),
    /// One page by id
    PageId(EntityId),
    /// One revision by id
    RevisionId(EntityId),
    /// Every page produced by a generator module
    Generator(String),
}

impl QueryTarget {
    /// The parameter key and value naming this target
    pub fn param(&self) -> (&'static str, String) {
        match self {
            Self::Title(title) => ("titles", title.clone()),
            Self::PageId(id) => ("pageids", id.to_string()),
            Self::RevisionId(id) => ("revids", id.to_string()),
            Self::Generator(name) => ("generator", name.clone()),
        }
    }

    /// Whether the target names a single entity
    pub fn is_single(&self) -> bool {
        !matches!(self, Self::Generator(_))
    }
}

/// A validated request: one target plus caller parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    target: QueryTarget,
    params: QueryParams,
}

impl QueryRequest {
    /// Build and validate a request
    pub fn new(target: QueryTarget, params: QueryParams) -> Result<Self> {
        let request = Self { target, params };
        request.validate()?;
        Ok(request)
    }

    /// The request's target
    pub fn target(&self) -> &QueryTarget {
        &self.target
    }

    /// The caller's parameters, without the target
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    /// Check that the request identifies exactly one entity set
    pub fn validate(&self) -> Result<()> {
        if let Some(key) = TARGET_KEYS.iter().find(|key| self.params.contains_key(**key)) {
            return Err(Error::invalid_request(format!(
                "parameter '{key}' conflicts with the request target {:?}",
                self.target
            )));
        }

        for (key, required) in [("action", "query"), ("format", "json")] {
            if let Some(value) = self.params.get(key) {
                if value != required {
                    return Err(Error::invalid_request(format!(
                        "{key} must be '{required}', got '{value}'"
                    )));
                }
            }
        }

        match &self.target {
            QueryTarget::Title(title) if title.trim().is_empty() => {
                Err(Error::invalid_request("title must not be empty"))
            }
            QueryTarget::Title(title) if title.contains('|') => Err(Error::invalid_request(
                format!("'{title}' names more than one title"),
            )),
            QueryTarget::Generator(name) if name.trim().is_empty() => {
                Err(Error::invalid_request("generator name must not be empty"))
            }
            QueryTarget::PageId(id) | QueryTarget::RevisionId(id) if id.is_negative() => {
                Err(Error::invalid_request(format!("id {id} is negative")))
            }
            _ => Ok(()),
        }
    }

    /// The full parameter map for the first request.
    ///
    /// A caller's `formatversion` is kept, since both response formats are
    /// ingested; it defaults to `2`.
    pub fn to_params(&self) -> QueryParams {
        let mut params = self.params.clone();
        params.insert("action".to_string(), "query".to_string());
        params.insert("format".to_string(), "json".to_string());
        params
            .entry("formatversion".to_string())
            .or_insert_with(|| "2".to_string());
        let (key, value) = self.target.param();
        params.insert(key.to_string(), value);
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_to_params_adds_target_and_format() {
        let request = QueryRequest::new(
            QueryTarget::Title("Main Page".to_string()),
            params(&[("prop", "info|links")]),
        )
        .unwrap();

        let built = request.to_params();
        assert_eq!(built["action"], "query");
        assert_eq!(built["format"], "json");
        assert_eq!(built["formatversion"], "2");
        assert_eq!(built["titles"], "Main Page");
        assert_eq!(built["prop"], "info|links");
    }

    #[test]
    fn test_generator_target() {
        let request = QueryRequest::new(
            QueryTarget::Generator("allpages".to_string()),
            params(&[("gaplimit", "max")]),
        )
        .unwrap();
        assert!(!request.target().is_single());
        assert_eq!(request.to_params()["generator"], "allpages");
    }

    #[test]
    fn test_large_ids_are_passed_verbatim() {
        let id = EntityId::parse("123456789123456789").unwrap();
        let request = QueryRequest::new(QueryTarget::RevisionId(id), QueryParams::new()).unwrap();
        assert_eq!(request.to_params()["revids"], "123456789123456789");
    }

    #[test_case("titles", "Other")]
    #[test_case("pageids", "1")]
    #[test_case("revids", "1")]
    #[test_case("generator", "allpages")]
    fn test_conflicting_target_params(key: &str, value: &str) {
        let err = QueryRequest::new(
            QueryTarget::Title("Main Page".to_string()),
            params(&[(key, value)]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidRequestShape { .. }));
    }

    #[test_case(QueryTarget::Title(String::new()) ; "empty title")]
    #[test_case(QueryTarget::Title("A|B".to_string()) ; "multiple titles")]
    #[test_case(QueryTarget::Generator(" ".to_string()) ; "blank generator")]
    #[test_case(QueryTarget::PageId(EntityId::parse("-1").unwrap()) ; "negative page id")]
    fn test_invalid_targets(target: QueryTarget) {
        assert!(matches!(
            QueryRequest::new(target, QueryParams::new()),
            Err(Error::InvalidRequestShape { .. })
        ));
    }

    #[test]
    fn test_rejects_other_actions() {
        let err = QueryRequest::new(
            QueryTarget::Title("X".to_string()),
            params(&[("action", "parse")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("parse"));
    }

    #[test_case("format", "xml" ; "non json format")]
    #[test_case("action", "parse" ; "non query action")]
    fn test_rejects_fixed_params(key: &str, value: &str) {
        let err = QueryRequest::new(QueryTarget::Title("X".to_string()), params(&[(key, value)]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequestShape { .. }));
    }

    #[test]
    fn test_caller_format_params_are_kept() {
        let request = QueryRequest::new(
            QueryTarget::Title("X".to_string()),
            params(&[("format", "json"), ("formatversion", "1")]),
        )
        .unwrap();
        let built = request.to_params();
        assert_eq!(built["format"], "json");
        assert_eq!(built["formatversion"], "1");
    }
}
