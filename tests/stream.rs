//! Event stream hosting: the async stream and the blocking iterator must agree
//! for any chunking of the same bytes.

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tabstack::{AutomateEvent, Error, EventIter, EventStream, EventType};

const BODY: &str = concat!(
    "event: start\r\ndata: {\"message\": \"Starting\"}\r\n\r\n",
    "event: browser:navigated\ndata: {\"url\": \"https://example.com\", \"title\": \"Example\"}\n\n",
    "data: {\"type\": \"agent:extracted\", \"data\": {\"extracted_data\": [1, 2, 3]}}\n\n",
    "event: agent:action\ndata: {\"action\": \"click\",\ndata: \"selector\": \"button\"}\n\n",
    "event: done\ndata: {}\n\n",
);

fn chunked(size: usize) -> Vec<Result<Bytes, Error>> {
    BODY.as_bytes()
        .chunks(size)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect()
}

fn blocking(size: usize) -> Vec<AutomateEvent> {
    EventIter::new(chunked(size).into_iter())
        .map(|e| e.unwrap())
        .collect()
}

async fn streaming(size: usize) -> Vec<AutomateEvent> {
    EventStream::new(stream::iter(chunked(size)))
        .map(|e| e.unwrap())
        .collect()
        .await
}

#[tokio::test]
async fn test_async_and_blocking_hosts_agree() {
    let reference = blocking(BODY.len());
    assert_eq!(reference.len(), 5);

    for size in [1, 2, 3, 7, 16, 64] {
        assert_eq!(blocking(size), reference, "blocking, chunk size {}", size);
        assert_eq!(streaming(size).await, reference, "async, chunk size {}", size);
    }
}

#[tokio::test]
async fn test_event_types_in_order() {
    let types: Vec<EventType> = streaming(5).await.into_iter().map(|e| e.event_type).collect();
    assert_eq!(
        types,
        [
            EventType::Start,
            EventType::BrowserNavigated,
            EventType::AgentExtracted,
            EventType::AgentAction,
            EventType::Done,
        ]
    );
}

#[tokio::test]
async fn test_transport_error_ends_stream() {
    let chunks: Vec<Result<Bytes, Error>> = vec![
        Ok(Bytes::from_static(b"event: start\ndata: {}\n\n")),
        Err(Error::Timeout),
        Ok(Bytes::from_static(b"event: done\ndata: {}\n\n")),
    ];
    let mut events = EventStream::new(stream::iter(chunks));

    assert!(events.next().await.unwrap().is_ok());
    assert!(matches!(events.next().await, Some(Err(Error::Timeout))));
    assert!(events.next().await.is_none());
}
