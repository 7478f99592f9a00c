//! Response body type for locally generated and relayed responses.
//!
//! - **Buffered**: JSON error and health bodies.
//! - **Empty**: responses without content.
//! - **Streaming**: origin responses, relayed frame by frame.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use http_body::Frame;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, StreamBody};

/// Boxed error accepted from upstream bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Relay response body.
///
/// Implements [`http_body::Body`] so it can be used directly with hyper responses.
#[derive(Default)]
pub enum RelayBody {
    /// Small in-memory payload.
    Buffered(Full<Bytes>),
    /// No content.
    #[default]
    Empty,
    /// Body streamed from the origin.
    Streaming(UnsyncBoxBody<Bytes, std::io::Error>),
}

impl RelayBody {
    /// Create a buffered body from bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// Create an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Wrap a stream of byte chunks, such as an origin response body.
    pub fn from_stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        let frames = stream
            .map_ok(Frame::data)
            .map_err(|err| std::io::Error::other(err.into()));
        Self::Streaming(StreamBody::new(frames).boxed_unsync())
    }
}

impl fmt::Debug for RelayBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffered(full) => f.debug_tuple("Buffered").field(full).finish(),
            Self::Empty => f.write_str("Empty"),
            Self::Streaming(_) => f.write_str("Streaming(..)"),
        }
    }
}

impl http_body::Body for RelayBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Empty => Poll::Ready(None),
            Self::Streaming(body) => Pin::new(body).poll_frame(cx),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Empty => true,
            Self::Streaming(body) => body.is_end_stream(),
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Empty => http_body::SizeHint::with_exact(0),
            Self::Streaming(body) => body.size_hint(),
        }
    }
}
