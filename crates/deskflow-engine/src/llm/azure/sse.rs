use eventsource_stream::EventStream;
use futures_util::Stream;
use pin_project::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};

/// One decoded server-sent event from the completions endpoint.
#[derive(Debug, Clone)]
pub enum SseEvent {
    Message(serde_json::Value),
    Done,
}

/// Decodes the provider's SSE byte stream into JSON events, skipping
/// malformed payloads rather than failing the whole stream.
#[pin_project]
pub struct SseParser<S> {
    #[pin]
    events: EventStream<S>,
}

impl<S> SseParser<S>
where
    S: Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            events: EventStream::new(stream),
        }
    }
}

impl<S> Stream for SseParser<S>
where
    S: Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + Unpin,
{
    type Item = Result<SseEvent, Box<dyn std::error::Error + Send + Sync>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            match this.events.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => {
                    if event.data.trim() == "[DONE]" {
                        return Poll::Ready(Some(Ok(SseEvent::Done)));
                    }
                    match serde_json::from_str::<serde_json::Value>(&event.data) {
                        Ok(json) => return Poll::Ready(Some(Ok(SseEvent::Message(json)))),
                        Err(e) => {
                            log::warn!("skipping malformed SSE payload: {e}");
                            continue;
                        }
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(
                        Box::new(e) as Box<dyn std::error::Error + Send + Sync>
                    )));
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
