//! Browser automation example.
//!
//! Streams the events of an automate task and prints the final answer.
//!
//! Run with: `TABSTACK_API_KEY=your-key cargo run --example automate_stream`

use futures::StreamExt;
use tabstack::{AutomateRequest, Client, EventPayload};

#[tokio::main]
async fn main() -> Result<(), tabstack::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let client = Client::from_env()?;

    let mut events = client
        .automate()
        .execute(AutomateRequest {
            url: Some("https://github.com/trending".into()),
            guardrails: Some("browse and extract only".into()),
            ..AutomateRequest::new("Find the top 3 trending repositories")
        })
        .await?;

    while let Some(event) = events.next().await {
        let event = event?;
        match &event.payload {
            EventPayload::TaskCompleted(done) => {
                println!("Result: {:?}", done.final_answer);
                break;
            }
            EventPayload::AgentExtracted(extracted) => {
                println!("Extracted: {:#}", extracted.extracted_data);
            }
            EventPayload::Error(details) => {
                eprintln!("Error: {}", details.text().unwrap_or_default());
            }
            _ => println!("[{}]", event.event_type),
        }
    }

    Ok(())
}
