//! Basic extraction example.
//!
//! This example shows how to extract structured data from a web page.
//!
//! Run with: `TABSTACK_API_KEY=your-key cargo run --example basic_extraction`

use tabstack::schema::{array, number, object, string};
use tabstack::{Client, JsonExtractRequest, MarkdownRequest, Schema, SchemaRequest};

#[tokio::main]
async fn main() -> Result<(), tabstack::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Create a client from TABSTACK_API_KEY
    let client = Client::from_env()?;

    // Convert a page to markdown
    let page = client
        .extract()
        .markdown(MarkdownRequest {
            metadata: true,
            ..MarkdownRequest::new("https://example.com")
        })
        .await?;
    println!("Markdown ({} chars)", page.content.len());
    if let Some(metadata) = page.metadata {
        println!("Title: {:?}", metadata.title);
    }

    // Define the schema for the data you want to extract
    let schema = Schema::builder()
        .field(
            "stories",
            array(
                object()
                    .field("title", string())
                    .field("points", number().with_description("upvotes"))
                    .field("author", string())
                    .build()?,
            ),
        )
        .build()?;

    let result = client
        .extract()
        .json(JsonExtractRequest::new(
            "https://news.ycombinator.com",
            schema,
        ))
        .await?;
    println!("Extracted data: {:#}", result.data);

    // Or let the service propose a schema
    let suggested = client
        .extract()
        .schema(SchemaRequest {
            instructions: Some("top stories with title, points and author".into()),
            ..SchemaRequest::new("https://news.ycombinator.com")
        })
        .await?;
    println!(
        "Suggested schema: {:#}",
        suggested.schema.to_json_schema()
    );

    Ok(())
}
