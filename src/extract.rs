//! Extract operator: markdown conversion, schema generation and structured
//! extraction.

use crate::client::Client;
use crate::error::Result;
use crate::types::{
    JsonExtractRequest, JsonResponse, MarkdownRequest, MarkdownResponse, SchemaRequest,
    SchemaResponse,
};

/// Extract operator, obtained from [`Client::extract`].
#[derive(Debug, Clone, Copy)]
pub struct Extract<'a> {
    client: &'a Client,
}

impl<'a> Extract<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Convert a page to markdown.
    pub async fn markdown(&self, request: MarkdownRequest) -> Result<MarkdownResponse> {
        self.client.post("v1/extract/markdown", &request).await
    }

    /// Generate a schema describing the data on a page.
    ///
    /// The result can be passed straight to [`json`](Self::json).
    pub async fn schema(&self, request: SchemaRequest) -> Result<SchemaResponse> {
        let body = self.client.post_value("v1/extract/json/schema", &request).await?;
        SchemaResponse::from_json(&body)
    }

    /// Extract structured data matching a schema.
    pub async fn json(&self, request: JsonExtractRequest) -> Result<JsonResponse> {
        let data = self.client.post_value("v1/extract/json", &request).await?;
        Ok(JsonResponse { data })
    }
}
