//! Response body module
//!
//! `ResourceBody` is the body type of every response produced by the
//! resource service. Small bodies are held in memory; file content is
//! streamed through a bounded channel fed by a background copy task.

use hyper::body::{Body, Bytes, Frame, SizeHint};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Chunks in flight between the copy task and the connection
const CHANNEL_CAPACITY: usize = 4;

/// Response body
#[derive(Debug)]
pub enum ResourceBody {
    /// No body (HEAD, 304, redirects)
    Empty,
    /// Complete in-memory body, taken on first poll
    Full(Option<Bytes>),
    /// Streamed body; an `Err` item aborts the response
    Channel(mpsc::Receiver<io::Result<Bytes>>),
}

impl ResourceBody {
    pub const fn empty() -> Self {
        Self::Empty
    }

    pub fn full(data: impl Into<Bytes>) -> Self {
        Self::Full(Some(data.into()))
    }

    /// Create a streamed body and the sender that feeds it
    pub fn channel() -> (BodySender, Self) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        (BodySender { tx }, Self::Channel(rx))
    }
}

impl Body for ResourceBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Empty => Poll::Ready(None),
            Self::Full(data) => Poll::Ready(data.take().map(|d| Ok(Frame::data(d)))),
            Self::Channel(rx) => rx
                .poll_recv(cx)
                .map(|item| item.map(|chunk| chunk.map(Frame::data))),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Full(data) => data.is_none(),
            Self::Channel(_) => false,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            Self::Empty | Self::Full(None) => SizeHint::with_exact(0),
            Self::Full(Some(data)) => SizeHint::with_exact(data.len() as u64),
            Self::Channel(_) => SizeHint::default(),
        }
    }
}

/// Write side of a streamed `ResourceBody`
#[derive(Debug)]
pub struct BodySender {
    tx: mpsc::Sender<io::Result<Bytes>>,
}

impl BodySender {
    /// Send one chunk, waiting for room in the channel
    ///
    /// Fails with `BrokenPipe` once the receiving side has gone away.
    pub async fn send(&self, chunk: Bytes) -> io::Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }
        self.tx
            .send(Ok(chunk))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "response body receiver dropped"))
    }

    /// Propagate a failure to the receiving side
    pub async fn fail(&self, err: io::Error) {
        // Nothing left to notify if the receiver is gone
        let _ = self.tx.send(Err(err)).await;
    }
}
