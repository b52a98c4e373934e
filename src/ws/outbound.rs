//! Socket writer task.
//!
//! Each socket has exactly one writer, fed by the session's bounded queue.
//! The writer stops when the queue closes, a close frame is written, a
//! write fails, or the session is cancelled. On exit it cancels the
//! session so the matching receive loop stops too.

use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{Sink, SinkExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::domain::{Outbound, OutboundFrame};

/// Close reasons longer than this do not fit in a close frame.
const MAX_CLOSE_REASON_BYTES: usize = 123;

/// How long a finishing session waits for its writer to flush.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Builds a close message, truncating the reason to the protocol limit.
#[must_use]
pub fn close_message(code: u16, reason: &str) -> Message {
    let mut truncated = String::with_capacity(reason.len().min(MAX_CLOSE_REASON_BYTES));
    for ch in reason.chars() {
        if truncated.len() + ch.len_utf8() > MAX_CLOSE_REASON_BYTES {
            break;
        }
        truncated.push(ch);
    }
    Message::Close(Some(CloseFrame {
        code,
        reason: truncated.into(),
    }))
}

/// Drains `rx` into `sink` until the session ends.
pub async fn write_pump<S>(
    mut sink: S,
    mut rx: mpsc::Receiver<OutboundFrame>,
    cancel: CancellationToken,
) where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            frame = rx.recv() => match frame {
                Some(OutboundFrame::Text(text)) => {
                    if let Err(e) = sink.send(Message::text(text)).await {
                        tracing::debug!(error = %e, "socket write failed");
                        break;
                    }
                }
                Some(OutboundFrame::Close { code, reason }) => {
                    let _ = sink.send(close_message(code, &reason)).await;
                    break;
                }
                None => break,
            },
        }
    }
    cancel.cancel();
}

/// Spawns the writer task for a socket's sending half.
pub fn spawn_writer(
    sink: SplitSink<WebSocket, Message>,
    rx: mpsc::Receiver<OutboundFrame>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(write_pump(sink, rx, cancel))
}

/// Closes the session with `code` and waits briefly for the writer to
/// send the close frame.
pub async fn finish(outbound: &Outbound, writer: JoinHandle<()>, code: u16, reason: &str) {
    outbound.close(code, reason);
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer)
        .await
        .is_err()
    {
        tracing::debug!("writer did not drain in time");
        outbound.abort();
    }
}
