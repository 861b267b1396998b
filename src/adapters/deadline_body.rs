//! Relayed response body bounded by the retrieval deadline.
//!
//! The header phase of a retrieval is bounded in the handler; this wrapper
//! carries the same deadline into the body so an upstream that stalls
//! mid-transfer ends the relay with an error instead of holding the inbound
//! connection open.
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use axum::body::Body as AxumBody;
use bytes::Bytes;
use hyper::body::{Body, Frame, SizeHint};
use tokio::time::{Instant, Sleep, sleep_until};

use crate::ports::http_client::HttpClientError;

pub struct DeadlineBody {
    inner: AxumBody,
    sleep: Pin<Box<Sleep>>,
    limit: Duration,
    expired: bool,
}

impl DeadlineBody {
    /// `limit` is only used to describe the failure.
    pub fn new(inner: AxumBody, expires_at: Instant, limit: Duration) -> Self {
        Self {
            inner,
            sleep: Box::pin(sleep_until(expires_at)),
            limit,
            expired: false,
        }
    }
}

impl Body for DeadlineBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if this.expired {
            return Poll::Ready(None);
        }

        if let Poll::Ready(frame) = Pin::new(&mut this.inner).poll_frame(cx) {
            return Poll::Ready(frame);
        }

        match this.sleep.as_mut().poll(cx) {
            Poll::Ready(()) => {
                this.expired = true;
                tracing::error!(
                    "Upstream body not complete within {} seconds, aborting relay",
                    this.limit.as_secs()
                );
                Poll::Ready(Some(Err(axum::Error::new(HttpClientError::Timeout(
                    this.limit.as_secs(),
                )))))
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.expired || self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
