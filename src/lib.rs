//! Rust SDK for the TABStack API.
//!
//! TABStack is an AI-powered web extraction service. The client exposes three
//! operators:
//!
//! - [`Extract`]: convert pages to markdown, generate schemas, and extract
//!   structured JSON
//! - [`Generate`]: transform page content into new JSON with AI
//! - [`Automate`]: run browser automation tasks and stream progress events
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tabstack::schema::{array, number, object, string};
//! use tabstack::{Client, JsonExtractRequest, Schema};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tabstack::Error> {
//!     let client = Client::builder("your-api-key").build()?;
//!
//!     let schema = Schema::builder()
//!         .field(
//!             "stories",
//!             array(
//!                 object()
//!                     .field("title", string())
//!                     .field("points", number())
//!                     .build()?,
//!             ),
//!         )
//!         .build()?;
//!
//!     let result = client
//!         .extract()
//!         .json(JsonExtractRequest::new("https://news.ycombinator.com", schema))
//!         .await?;
//!
//!     println!("{:?}", result.data["stories"]);
//!     Ok(())
//! }
//! ```

mod automate;
mod client;
mod error;
mod events;
mod extract;
mod generate;
pub mod schema;
mod sse;
mod types;
mod version;

pub use automate::{Automate, AutomateStream};
pub use client::{Client, ClientBuilder, API_KEY_ENV, BASE_URL_ENV};
pub use error::{Error, Result};
pub use events::{
    AgentAction, AgentExtracted, AutomateEvent, BrowserNavigated, ErrorDetails, EventData,
    EventPayload, EventType, TaskCompleted,
};
pub use extract::Extract;
pub use generate::Generate;
pub use schema::Schema;
pub use sse::{EventIter, EventReader, EventStream, Frame, SseDecoder};
pub use types::*;
pub use version::SDK_VERSION;
