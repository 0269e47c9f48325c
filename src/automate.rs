//! Automate operator: browser automation with streamed progress.

use crate::client::Client;
use crate::error::{Error, Result};
use crate::sse::EventStream;
use crate::types::AutomateRequest;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};

/// Stream of events from an automate task.
pub type AutomateStream = EventStream<BoxStream<'static, Result<Bytes>>>;

/// Automate operator, obtained from [`Client::automate`].
#[derive(Debug, Clone, Copy)]
pub struct Automate<'a> {
    client: &'a Client,
}

impl<'a> Automate<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Start a task and stream its events.
    ///
    /// Error statuses are returned here, before any event. After that, each
    /// item is either an event or the error that ended the stream. Drop the
    /// stream to stop early and release the connection.
    ///
    /// ```rust,no_run
    /// use futures::StreamExt;
    /// use tabstack::{AutomateRequest, Client, EventPayload};
    ///
    /// # async fn run() -> Result<(), tabstack::Error> {
    /// let client = Client::from_env()?;
    /// let mut events = client
    ///     .automate()
    ///     .execute(AutomateRequest {
    ///         url: Some("https://github.com/trending".into()),
    ///         ..AutomateRequest::new("Find the top 3 trending repositories")
    ///     })
    ///     .await?;
    ///
    /// while let Some(event) = events.next().await {
    ///     if let EventPayload::TaskCompleted(done) = event?.payload {
    ///         println!("{:?}", done.final_answer);
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn execute(&self, request: AutomateRequest) -> Result<AutomateStream> {
        let response = self.client.post_stream("v1/automate", &request).await?;
        let body = response.bytes_stream().map_err(Error::transport).boxed();
        Ok(EventStream::new(body))
    }
}
