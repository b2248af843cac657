//! External data sources for ingestion.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{RagError, Result};

/// A raw record as returned by a source: a JSON object with a text field.
pub type Record = serde_json::Value;

/// Where ingestion gets its records from.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Fetch all records. Called once per ingestion run, never retried.
    async fn fetch(&self) -> Result<Vec<Record>>;
}

/// Fetches records from a URL with a single GET.
///
/// The body is either a JSON array of records, or an object whose text
/// field holds an array with one entry per record, e.g.
/// `{"text": ["first", "second"]}`.
pub struct HttpSource {
    url: String,
    text_field: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text_field: "text".to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Dotted path of the text field, used to unpack object bodies. Should
    /// match the ingestion pipeline's field.
    pub fn with_text_field(mut self, field: impl Into<String>) -> Self {
        self.text_field = field.into();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn unpack_object(&self, body: &serde_json::Value) -> Option<Vec<Record>> {
        let entries = self
            .text_field
            .split('.')
            .try_fold(body, |value, key| value.get(key))?
            .as_array()?;

        Some(
            entries
                .iter()
                .map(|entry| nest_field(&self.text_field, entry.clone()))
                .collect(),
        )
    }
}

#[async_trait]
impl DataSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self) -> Result<Vec<Record>> {
        debug!("Fetching records from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| RagError::Fetch(format!("{}: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RagError::Fetch(format!("{}: HTTP {status}", self.url)));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RagError::Fetch(format!("{}: invalid JSON: {e}", self.url)))?;

        let records = match body {
            serde_json::Value::Array(records) => records,
            object @ serde_json::Value::Object(_) => self.unpack_object(&object).ok_or_else(|| {
                RagError::Fetch(format!(
                    "{}: expected an array under `{}` in the response object",
                    self.url, self.text_field
                ))
            })?,
            other => {
                return Err(RagError::Fetch(format!(
                    "{}: expected a JSON array of records, got {}",
                    self.url,
                    json_kind(&other)
                )));
            }
        };

        info!("Fetched {} records from {}", records.len(), self.url);
        Ok(records)
    }
}

/// A source backed by records held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    records: Vec<Record>,
}

impl StaticSource {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Build records of the form `{"text": ...}`.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let records = texts
            .into_iter()
            .map(|t| serde_json::json!({ "text": t.into() }))
            .collect();
        Self { records }
    }
}

#[async_trait]
impl DataSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self) -> Result<Vec<Record>> {
        Ok(self.records.clone())
    }
}

/// Look up a string field by dotted path, e.g. `content.rendered`.
pub fn extract_text<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    field
        .split('.')
        .try_fold(record, |value, key| value.get(key))
        .and_then(serde_json::Value::as_str)
}

/// Remove the value at a dotted path, dropping parent objects it leaves empty.
pub(crate) fn remove_field(fields: &mut serde_json::Map<String, serde_json::Value>, path: &str) {
    let Some((head, rest)) = path.split_once('.') else {
        fields.remove(path);
        return;
    };

    let emptied = match fields.get_mut(head) {
        Some(serde_json::Value::Object(inner)) => {
            remove_field(inner, rest);
            inner.is_empty()
        }
        _ => false,
    };
    if emptied {
        fields.remove(head);
    }
}

/// Wrap `value` so that it sits at the dotted `path`.
fn nest_field(path: &str, value: serde_json::Value) -> Record {
    path.rsplit('.').fold(value, |inner, key| {
        let mut object = serde_json::Map::new();
        object.insert(key.to_string(), inner);
        serde_json::Value::Object(object)
    })
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
