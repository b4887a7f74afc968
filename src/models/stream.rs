use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::error::OpenAIError;

/// An asynchronous sequence of decoded records fed by a transport task.
///
/// Dropping the stream, or calling [`cancel`](Self::cancel), aborts the
/// producing task and with it the underlying network request.
#[derive(Debug)]
pub struct ResponseStream<T> {
    receiver: mpsc::Receiver<Result<T, OpenAIError>>,
    producer: Option<AbortHandle>,
    cancelled: bool,
}

impl<T> ResponseStream<T> {
    /// Creates a new ResponseStream
    pub fn new(
        receiver: mpsc::Receiver<Result<T, OpenAIError>>,
        producer: Option<AbortHandle>,
    ) -> Self {
        Self {
            receiver,
            producer,
            cancelled: false,
        }
    }

    /// Stops the stream. No record is yielded after this returns, including
    /// records that were already buffered.
    pub fn cancel(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
        self.receiver.close();
        self.cancelled = true;
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl<T> Stream for ResponseStream<T> {
    type Item = Result<T, OpenAIError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.cancelled {
            return Poll::Ready(None);
        }
        this.receiver.poll_recv(cx)
    }
}

impl<T> Drop for ResponseStream<T> {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}
