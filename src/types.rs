//! API types for the TABStack SDK.

use crate::error::Result;
use crate::schema::Schema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn is_false(flag: &bool) -> bool {
    !*flag
}

fn is_blank(text: &Option<String>) -> bool {
    text.as_deref().map_or(true, str::is_empty)
}

fn is_empty_data(data: &Option<Value>) -> bool {
    match data {
        None | Some(Value::Null) => true,
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

/// Request for markdown conversion.
#[derive(Debug, Clone, Serialize, Default)]
pub struct MarkdownRequest {
    /// URL to fetch and convert.
    pub url: String,
    /// Return page metadata as a separate field instead of YAML frontmatter.
    #[serde(skip_serializing_if = "is_false")]
    pub metadata: bool,
    /// Bypass the service cache.
    #[serde(skip_serializing_if = "is_false")]
    pub nocache: bool,
}

impl MarkdownRequest {
    /// Request for `url` with default options.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Request for schema generation.
#[derive(Debug, Clone, Serialize, Default)]
pub struct SchemaRequest {
    /// URL to analyze.
    pub url: String,
    /// Instructions to guide schema generation.
    #[serde(skip_serializing_if = "is_blank")]
    pub instructions: Option<String>,
    /// Bypass the service cache.
    #[serde(skip_serializing_if = "is_false")]
    pub nocache: bool,
}

impl SchemaRequest {
    /// Request for `url` with default options.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Request for structured JSON extraction.
#[derive(Debug, Clone, Serialize)]
pub struct JsonExtractRequest {
    /// URL to extract data from.
    pub url: String,
    /// Structure of the data to extract.
    pub json_schema: Schema,
    /// Bypass the service cache.
    #[serde(skip_serializing_if = "is_false")]
    pub nocache: bool,
}

impl JsonExtractRequest {
    /// Request for `url` shaped by `schema`.
    pub fn new(url: impl Into<String>, schema: Schema) -> Self {
        Self {
            url: url.into(),
            json_schema: schema,
            nocache: false,
        }
    }
}

/// Request for AI-transformed JSON.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    /// URL to fetch content from.
    pub url: String,
    /// Structure of the generated output.
    pub json_schema: Schema,
    /// How to transform the content.
    pub instructions: String,
    /// Bypass the service cache.
    #[serde(skip_serializing_if = "is_false")]
    pub nocache: bool,
}

impl GenerateRequest {
    /// Request for `url` shaped by `schema` and guided by `instructions`.
    pub fn new(url: impl Into<String>, schema: Schema, instructions: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            json_schema: schema,
            instructions: instructions.into(),
            nocache: false,
        }
    }
}

/// Request for a browser automation task.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomateRequest {
    /// Task description in natural language.
    pub task: String,
    /// Starting URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Context data, e.g. values for form filling.
    #[serde(skip_serializing_if = "is_empty_data")]
    pub data: Option<Value>,
    /// Safety constraints for execution.
    #[serde(skip_serializing_if = "is_blank")]
    pub guardrails: Option<String>,
    /// Maximum task iterations (1-100).
    pub max_iterations: u32,
    /// Maximum validation attempts (1-10).
    pub max_validation_attempts: u32,
}

impl AutomateRequest {
    /// Request for `task` with default limits.
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            ..Default::default()
        }
    }
}

impl Default for AutomateRequest {
    fn default() -> Self {
        Self {
            task: String::new(),
            url: None,
            data: None,
            guardrails: None,
            max_iterations: 50,
            max_validation_attempts: 3,
        }
    }
}

/// Metadata extracted from a web page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Metadata {
    /// Page title.
    pub title: Option<String>,
    /// Page description.
    pub description: Option<String>,
    /// Author.
    pub author: Option<String>,
    /// Publisher.
    pub publisher: Option<String>,
    /// Featured image URL.
    pub image: Option<String>,
    /// Site name.
    pub site_name: Option<String>,
    /// Canonical URL.
    pub url: Option<String>,
    /// Content type, e.g. `article`.
    #[serde(rename = "type")]
    pub content_type: Option<String>,
}

/// Response from markdown conversion.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkdownResponse {
    /// URL that was converted.
    pub url: String,
    /// Markdown content.
    pub content: String,
    /// Page metadata, when requested.
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Response from schema generation.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaResponse {
    /// The generated schema.
    pub schema: Schema,
}

impl SchemaResponse {
    /// Rebuild the schema from the JSON Schema body returned by the service.
    pub fn from_json(body: &Value) -> Result<Self> {
        Ok(Self {
            schema: Schema::from_json_schema(body)?,
        })
    }
}

/// Response from JSON extraction or generation.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonResponse {
    /// Data matching the requested schema.
    pub data: Value,
}

impl JsonResponse {
    /// Deserialize the data into a caller-defined type.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{number, string};
    use serde_json::json;

    #[test]
    fn test_markdown_flags_only_sent_when_set() {
        let req = MarkdownRequest::new("https://example.com");
        assert_eq!(serde_json::to_value(&req).unwrap(), json!({"url": "https://example.com"}));

        let req = MarkdownRequest {
            metadata: true,
            nocache: true,
            ..MarkdownRequest::new("https://example.com")
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"url": "https://example.com", "metadata": true, "nocache": true})
        );
    }

    #[test]
    fn test_schema_request_skips_empty_instructions() {
        let req = SchemaRequest {
            instructions: Some(String::new()),
            ..SchemaRequest::new("https://example.com")
        };
        assert_eq!(serde_json::to_value(&req).unwrap(), json!({"url": "https://example.com"}));
    }

    #[test]
    fn test_json_request_embeds_schema() {
        let schema = Schema::from_fields([("title", string()), ("points", number())]).unwrap();
        let req = GenerateRequest::new("https://example.com", schema, "summarize");
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["json_schema"]["required"], json!(["title", "points"]));
        assert_eq!(body["instructions"], "summarize");
        assert!(body.get("nocache").is_none());
    }

    #[test]
    fn test_automate_request_defaults() {
        let body = serde_json::to_value(AutomateRequest::new("Find repositories")).unwrap();
        assert_eq!(
            body,
            json!({"task": "Find repositories", "maxIterations": 50, "maxValidationAttempts": 3})
        );
    }

    #[test]
    fn test_automate_request_omits_empty_context() {
        let req = AutomateRequest {
            data: Some(json!({})),
            guardrails: Some(String::new()),
            max_iterations: 0,
            ..AutomateRequest::new("Test")
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"task": "Test", "maxIterations": 0, "maxValidationAttempts": 3})
        );
    }

    #[test]
    fn test_automate_request_all_fields() {
        let req = AutomateRequest {
            url: Some("https://example.com".into()),
            data: Some(json!({"query": "rust"})),
            guardrails: Some("browse only".into()),
            max_iterations: 30,
            max_validation_attempts: 2,
            ..AutomateRequest::new("Search and extract")
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "task": "Search and extract",
                "url": "https://example.com",
                "data": {"query": "rust"},
                "guardrails": "browse only",
                "maxIterations": 30,
                "maxValidationAttempts": 2
            })
        );
    }

    #[test]
    fn test_markdown_response_metadata() {
        let resp: MarkdownResponse = serde_json::from_value(json!({
            "url": "https://example.com",
            "content": "# Title",
            "metadata": {"title": "Title", "site_name": "Example", "type": "article"}
        }))
        .unwrap();
        let metadata = resp.metadata.unwrap();
        assert_eq!(metadata.site_name.as_deref(), Some("Example"));
        assert_eq!(metadata.content_type.as_deref(), Some("article"));
        assert!(metadata.author.is_none());
    }

    #[test]
    fn test_json_response_into_typed() {
        #[derive(Deserialize)]
        struct Story {
            title: String,
        }
        let resp = JsonResponse {
            data: json!({"title": "Hello"}),
        };
        let story: Story = resp.into_typed().unwrap();
        assert_eq!(story.title, "Hello");
    }
}
