//! Stream handles that carry the context of the call they belong to.

use std::{
    ops::{Deref, DerefMut},
    pin::Pin,
    task::{self, Poll},
};

use pin_project::pin_project;
use tokio_stream::Stream;
use tonic::Request;

use crate::context::Context;

/// Decorates an inbound stream with the context produced when the stream was
/// opened.
///
/// Extraction runs once per call, so a streaming handler that unwraps its
/// request with `into_inner` would otherwise lose the extensions holding the
/// context. Every message read through this wrapper observes the same
/// context. All other capabilities of the inner handle (for example
/// `Streaming::message` or `Streaming::trailers`) are reachable through
/// `Deref`.
#[pin_project]
#[derive(Debug)]
pub struct ContextStream<S> {
    #[pin]
    inner: S,
    context: Context,
}

impl<S> ContextStream<S> {
    pub fn new(inner: S, context: Context) -> Self {
        Self { inner, context }
    }

    /// Split a streaming request into its body and the context attached by
    /// the server interceptors.
    pub fn from_request(req: Request<S>) -> Self {
        let context = Context::from_request(&req);
        Self::new(req.into_inner(), context)
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S> Deref for ContextStream<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.inner
    }
}

impl<S> DerefMut for ContextStream<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S: Stream> Stream for ContextStream<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> Poll<Option<S::Item>> {
        self.project().inner.poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
