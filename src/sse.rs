//! Server-Sent Events parsing for the automate stream.
//!
//! [`SseDecoder`] turns raw bytes into [`Frame`]s and performs no I/O.
//! [`EventReader`] adds event decoding and pull-based consumption on top of
//! it, and is hosted by [`EventStream`] for async byte streams and by
//! [`EventIter`] for blocking iterators. Both hosts produce the same events
//! for the same bytes regardless of how the bytes are chunked.

use crate::error::{Error, Result};
use crate::events::AutomateEvent;
use futures::stream::{FusedStream, Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tracing::{debug, trace};

const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Longest prefix of a frame's text kept for error reporting.
const MAX_RAW_FRAME: usize = 8 * 1024;

/// One dispatched SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Value of the `event` field, if one was sent.
    pub event: Option<String>,
    /// Concatenated `data` lines, joined with `\n`.
    pub data: String,
    /// Value of the last `id` field, if any.
    pub id: Option<String>,
    /// Text of the frame's field lines, for error reporting. Comment lines are
    /// left out and the text is cut off after 8 KiB.
    pub raw: String,
}

/// Incremental SSE framing state.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Bytes of a line whose terminator has not arrived yet.
    buffer: Vec<u8>,
    /// Length of the prefix of `buffer` already searched for a terminator.
    scanned: usize,
    bom_checked: bool,
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
    raw: String,
}

impl SseDecoder {
    /// Create a decoder at the start of a stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every frame it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        self.buffer.extend_from_slice(chunk);

        if !self.bom_checked {
            if self.buffer.len() < BOM.len() && BOM.starts_with(&self.buffer) {
                return frames;
            }
            if self.buffer.starts_with(&BOM) {
                self.buffer.drain(..BOM.len());
            }
            self.bom_checked = true;
        }

        let buf = std::mem::take(&mut self.buffer);
        let mut start = 0;
        let mut i = self.scanned;
        loop {
            let Some(offset) = buf[i..].iter().position(|&b| b == b'\n' || b == b'\r') else {
                i = buf.len();
                break;
            };
            let end = i + offset;
            let next = match buf[end] {
                // may be half of "\r\n"
                b'\r' if end + 1 == buf.len() => {
                    i = end;
                    break;
                }
                b'\r' if buf[end + 1] == b'\n' => end + 2,
                _ => end + 1,
            };
            if let Some(frame) = self.process_line(&buf[start..end]) {
                frames.push(frame);
            }
            start = next;
            i = next;
        }
        self.buffer = buf;
        self.buffer.drain(..start);
        self.scanned = i - start;

        frames
    }

    /// Signal end of input.
    ///
    /// A trailing lone `\r` still terminates its line. Whatever frame is left
    /// incomplete after that is discarded.
    pub fn finish(&mut self) -> Option<Frame> {
        let mut frame = None;
        if self.buffer.last() == Some(&b'\r') {
            let buf = std::mem::take(&mut self.buffer);
            frame = self.process_line(&buf[..buf.len() - 1]);
        }

        if self.has_partial() {
            debug!(
                pending_bytes = self.buffer.len(),
                pending_frame = %self.raw,
                "Event stream ended mid-frame; discarding partial frame"
            );
        }
        *self = Self::default();
        frame
    }

    /// Whether an incomplete line or frame is buffered.
    pub fn has_partial(&self) -> bool {
        !self.buffer.is_empty() || !self.raw.is_empty()
    }

    fn process_line(&mut self, line: &[u8]) -> Option<Frame> {
        let line = String::from_utf8_lossy(line);

        if line.is_empty() {
            return self.dispatch();
        }

        if line.starts_with(':') {
            return None;
        }
        self.record_raw(&line);

        let (field, value) = match line.find(':') {
            Some(idx) => {
                let value = &line[idx + 1..];
                (&line[..idx], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (&line[..], ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" if !value.contains('\0') => self.id = Some(value.to_string()),
            _ => trace!(field = field, "Ignoring SSE field"),
        }

        None
    }

    fn record_raw(&mut self, line: &str) {
        let room = MAX_RAW_FRAME.saturating_sub(self.raw.len());
        if room == 0 {
            return;
        }
        let mut end = line.len().min(room);
        while !line.is_char_boundary(end) {
            end -= 1;
        }
        self.raw.push_str(&line[..end]);
        if end == line.len() {
            self.raw.push('\n');
        }
    }

    fn dispatch(&mut self) -> Option<Frame> {
        let event = self.event.take();
        let id = self.id.take();
        let raw = std::mem::take(&mut self.raw);
        let data = std::mem::take(&mut self.data).join("\n");

        if data.is_empty() {
            trace!(event = ?event, "Skipping frame without data");
            return None;
        }

        Some(Frame {
            event,
            data,
            id,
            raw,
        })
    }
}

/// Pull-based event decoder shared by [`EventStream`] and [`EventIter`].
///
/// Push chunks in with [`push`](Self::push), pull events out with
/// [`next_event`](Self::next_event). After the first decode error the reader
/// yields nothing more.
#[derive(Debug, Default)]
pub struct EventReader {
    decoder: SseDecoder,
    pending: VecDeque<Frame>,
    ended: bool,
    failed: bool,
}

impl EventReader {
    /// Create a reader at the start of a stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of the body.
    pub fn push(&mut self, chunk: &[u8]) {
        if self.ended || self.failed {
            return;
        }
        let frames = self.decoder.feed(chunk);
        self.pending.extend(frames);
    }

    /// Signal that the body is complete.
    pub fn end(&mut self) {
        if self.ended {
            return;
        }
        self.pending.extend(self.decoder.finish());
        self.ended = true;
    }

    /// Stop producing events, e.g. after a transport error.
    pub fn fail(&mut self) {
        self.failed = true;
        self.pending.clear();
    }

    /// Next decoded event, or `None` if more input is needed or the reader
    /// is done.
    pub fn next_event(&mut self) -> Option<Result<AutomateEvent>> {
        if self.failed {
            return None;
        }
        let frame = self.pending.pop_front()?;
        match AutomateEvent::from_frame(&frame) {
            Ok(event) => {
                trace!(event_type = %event.event_type, "Decoded automate event");
                Some(Ok(event))
            }
            Err(e) => {
                self.fail();
                Some(Err(e))
            }
        }
    }

    /// Whether no further events will be produced.
    pub fn is_done(&self) -> bool {
        self.failed || (self.ended && self.pending.is_empty())
    }
}

/// Async stream of automate events over a stream of byte chunks.
///
/// Dropping the stream drops the underlying body and releases the connection.
pub struct EventStream<S> {
    inner: Option<S>,
    reader: EventReader,
}

impl<S> EventStream<S> {
    /// Wrap a byte-chunk stream.
    pub fn new(inner: S) -> Self {
        Self {
            inner: Some(inner),
            reader: EventReader::new(),
        }
    }
}

impl<S, B, E> Stream for EventStream<S>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<Error>,
{
    type Item = Result<AutomateEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(item) = this.reader.next_event() {
                if item.is_err() {
                    this.inner = None;
                }
                return Poll::Ready(Some(item));
            }
            if this.reader.is_done() {
                this.inner = None;
                return Poll::Ready(None);
            }
            let Some(inner) = this.inner.as_mut() else {
                return Poll::Ready(None);
            };

            match ready!(inner.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => this.reader.push(chunk.as_ref()),
                Some(Err(e)) => {
                    this.inner = None;
                    this.reader.fail();
                    return Poll::Ready(Some(Err(e.into())));
                }
                None => {
                    this.inner = None;
                    this.reader.end();
                }
            }
        }
    }
}

impl<S, B, E> FusedStream for EventStream<S>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<Error>,
{
    fn is_terminated(&self) -> bool {
        self.inner.is_none() && self.reader.is_done()
    }
}

/// Blocking iterator of automate events over an iterator of byte chunks.
pub struct EventIter<I> {
    inner: Option<I>,
    reader: EventReader,
}

impl<I> EventIter<I> {
    /// Wrap a byte-chunk iterator.
    pub fn new(inner: I) -> Self {
        Self {
            inner: Some(inner),
            reader: EventReader::new(),
        }
    }
}

impl<I, B, E> Iterator for EventIter<I>
where
    I: Iterator<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<Error>,
{
    type Item = Result<AutomateEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.reader.next_event() {
                if item.is_err() {
                    self.inner = None;
                }
                return Some(item);
            }
            if self.reader.is_done() {
                self.inner = None;
                return None;
            }

            match self.inner.as_mut()?.next() {
                Some(Ok(chunk)) => self.reader.push(chunk.as_ref()),
                Some(Err(e)) => {
                    self.inner = None;
                    self.reader.fail();
                    return Some(Err(e.into()));
                }
                None => {
                    self.inner = None;
                    self.reader.end();
                }
            }
        }
    }
}
