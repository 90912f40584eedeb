use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    dto::sse::ServerEvent,
    error::ServiceError,
    services::sse_events,
    state::SharedState,
};

/// Which side of the session the stream serves. Host and player streams carry
/// the same events today; the split keeps the URLs stable and the disconnect
/// logs attributable.
#[derive(Clone, Copy)]
pub enum StreamRole {
    Host,
    Player,
}

impl StreamRole {
    fn label(self) -> &'static str {
        match self {
            StreamRole::Host => "host",
            StreamRole::Player => "player",
        }
    }
}

/// Subscribe to the event stream of a live session, failing when the pin is
/// unknown or the session has expired.
pub async fn subscribe(
    state: &SharedState,
    pin: &str,
) -> Result<broadcast::Receiver<ServerEvent>, ServiceError> {
    // Resolve the pin first so a bad URL gets a 404 instead of a silent
    // stream that never produces anything.
    state.sessions().get(pin).await.map_err(ServiceError::from)?;
    Ok(state.sse().subscribe(pin))
}

/// Convert a broadcast receiver into an SSE response, forwarding events and
/// logging once the client disconnects. A synthetic handshake event is pushed
/// first so the subscriber can confirm which session it observes.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    pin: &str,
    role: StreamRole,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + use<>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    let handshake = sse_events::connected_event(pin);
    let pin = pin.to_string();

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        if let Some(payload) = handshake
            && tx.send(Ok(to_event(payload))).await.is_err()
        {
            return;
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {
                            // Skip lagged messages but keep the stream alive.
                            continue;
                        }
                    }
                }
            }
        }

        tracing::info!(%pin, role = role.label(), "SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stream_can_outlive_the_pin_borrow() {
        let (sender, receiver) = broadcast::channel(4);

        let sse = {
            let pin = String::from("424242");
            to_sse_stream(receiver, &pin, StreamRole::Player)
        };

        drop(sender);
        drop(sse);
    }
}
