//! Generate operator: AI-transformed JSON.

use crate::client::Client;
use crate::error::Result;
use crate::types::{GenerateRequest, JsonResponse};

/// Generate operator, obtained from [`Client::generate`].
#[derive(Debug, Clone, Copy)]
pub struct Generate<'a> {
    client: &'a Client,
}

impl<'a> Generate<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Fetch a page and transform its content into JSON matching the schema,
    /// following the request's instructions.
    pub async fn json(&self, request: GenerateRequest) -> Result<JsonResponse> {
        let data = self.client.post_value("v1/generate/json", &request).await?;
        Ok(JsonResponse { data })
    }
}
