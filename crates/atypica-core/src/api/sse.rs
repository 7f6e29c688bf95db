use eventsource_stream::Eventsource;
use futures_core::Stream;
use futures_util::StreamExt;
use std::pin::Pin;
use tokio_util::bytes::Bytes;

use crate::api::error::SseParseError;

#[derive(Debug, Clone)]
pub struct SseEvent {
    pub event_type: Option<String>,
    pub data: String,
}

pub type SseStream = Pin<Box<dyn Stream<Item = Result<SseEvent, SseParseError>> + Send>>;

pub fn parse_sse_stream<S, E>(byte_stream: S) -> SseStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + 'static,
{
    let events = byte_stream
        .map(|chunk| chunk.map_err(|e| std::io::Error::other(e.to_string())))
        .eventsource()
        .map(|event| {
            event.map_err(SseParseError::from).map(|event| SseEvent {
                event_type: (!event.event.is_empty()).then_some(event.event),
                data: event.data,
            })
        });

    Box::pin(events)
}
