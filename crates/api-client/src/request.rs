//! Request descriptors and URL joining

use reqwest::Method;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A query parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    /// Free text
    Str(String),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// Rendered as `true` / `false`
    Bool(bool),
    /// Rendered comma-separated
    List(Vec<String>),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::List(items) => f.write_str(&items.join(",")),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for QueryValue {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for QueryValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or_else(|_| Self::Str(value.to_string()), Self::Int)
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<&[String]> for QueryValue {
    fn from(value: &[String]) -> Self {
        Self::List(value.to_vec())
    }
}

impl From<Vec<u64>> for QueryValue {
    fn from(value: Vec<u64>) -> Self {
        Self::List(value.iter().map(ToString::to_string).collect())
    }
}

/// One logical API call: method, endpoint path, query and optional body
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    /// HTTP method
    pub method: Method,
    /// Endpoint path relative to the API root, without a leading slash
    pub path: String,
    /// Query parameters, rendered in key order
    pub params: BTreeMap<String, QueryValue>,
    /// JSON body
    pub body: Option<Value>,
}

impl RequestDescriptor {
    /// Create a request
    pub fn new(method: Method, path: impl AsRef<str>) -> Self {
        Self {
            method,
            path: path.as_ref().trim_start_matches('/').to_string(),
            params: BTreeMap::new(),
            body: None,
        }
    }

    /// GET request
    pub fn get(path: impl AsRef<str>) -> Self {
        Self::new(Method::GET, path)
    }

    /// POST request with a JSON body
    pub fn post(path: impl AsRef<str>, body: Value) -> Self {
        let mut request = Self::new(Method::POST, path);
        request.body = Some(body);
        request
    }

    /// Add or replace a query parameter
    #[must_use]
    pub fn param(mut self, key: &str, value: impl Into<QueryValue>) -> Self {
        self.set_param(key, value);
        self
    }

    /// Add a query parameter when `value` is present
    ///
    /// Empty lists are skipped as well.
    #[must_use]
    pub fn param_opt<V: Into<QueryValue>>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            let value = value.into();
            if !matches!(&value, QueryValue::List(items) if items.is_empty()) {
                self.params.insert(key.to_string(), value);
            }
        }
        self
    }

    /// Add or replace a query parameter in place
    pub fn set_param(&mut self, key: &str, value: impl Into<QueryValue>) {
        self.params.insert(key.to_string(), value.into());
    }

    /// Rendered `(key, value)` query pairs
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

/// Normalize a base URL once: surrounding whitespace and trailing slashes go
#[must_use]
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join a normalized base URL and an endpoint path with exactly one slash
#[must_use]
pub fn join_url(base_url: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base_url.to_string()
    } else {
        format!("{base_url}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_value_rendering() {
        assert_eq!(QueryValue::from("Pica pica").to_string(), "Pica pica");
        assert_eq!(QueryValue::from(42u32).to_string(), "42");
        assert_eq!(QueryValue::from(37.5).to_string(), "37.5");
        assert_eq!(QueryValue::from(true).to_string(), "true");
        assert_eq!(QueryValue::from(false).to_string(), "false");
        assert_eq!(
            QueryValue::from(vec!["Aves".to_string(), "Plantae".to_string()]).to_string(),
            "Aves,Plantae"
        );
        assert_eq!(QueryValue::from(vec![1u64, 2, 3]).to_string(), "1,2,3");
    }

    #[test]
    fn test_descriptor_strips_leading_slash() {
        let request = RequestDescriptor::get("/taxa/autocomplete");
        assert_eq!(request.path, "taxa/autocomplete");
        assert_eq!(request.method, Method::GET);
    }

    #[test]
    fn test_param_opt_skips_missing_and_empty() {
        let request = RequestDescriptor::get("observations")
            .param_opt("taxon_id", Some(3u64))
            .param_opt::<u64>("place_id", None)
            .param_opt("iconic_taxa", Some(Vec::<String>::new()))
            .param("photos", true);

        assert_eq!(
            request.query_pairs(),
            vec![
                ("photos".to_string(), "true".to_string()),
                ("taxon_id".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_post_body() {
        let request = RequestDescriptor::post("observations", json!({"species_guess": "magpie"}));
        assert_eq!(request.method, Method::POST);
        assert!(request.body.is_some());
    }

    #[test]
    fn test_join_keeps_version_prefix() {
        let base = normalize_base_url("https://api.inaturalist.org/v1/");
        assert_eq!(base, "https://api.inaturalist.org/v1");
        assert_eq!(join_url(&base, "/taxa"), "https://api.inaturalist.org/v1/taxa");
        assert_eq!(join_url(&base, "taxa/1"), "https://api.inaturalist.org/v1/taxa/1");
        assert_eq!(join_url(&base, ""), "https://api.inaturalist.org/v1");
    }

    #[test]
    fn test_normalize_multiple_trailing_slashes() {
        assert_eq!(normalize_base_url(" http://localhost:4000/v1// "), "http://localhost:4000/v1");
    }
}
