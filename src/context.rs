//! Per-call association store.
//!
//! A [`Context`] travels in the tonic request extensions. It is an immutable
//! chain: deriving a child with [`Context::with_headers`] or
//! [`Context::with_tags`] allocates a new link and leaves the parent as it
//! was, so one context can be shared freely between tasks.

use std::{
    any::{Any, TypeId},
    fmt,
    marker::PhantomData,
    sync::Arc,
};

use tonic::Request;

use crate::{
    schema::HeaderRecord,
    tags::{NoopTags, TagSink},
};

// association keys, one per record type
struct Marker<R>(PhantomData<R>);

struct TagsMarker;

struct Node {
    key: TypeId,
    value: Arc<dyn Any + Send + Sync>,
    parent: Option<Arc<Node>>,
}

#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Node>>,
}

impl Context {
    /// An empty context with no associations.
    pub fn new() -> Self {
        Self::default()
    }

    /// The context carried by `req`, or an empty one if nothing was attached.
    pub fn from_request<T>(req: &Request<T>) -> Self {
        req.extensions().get::<Context>().cloned().unwrap_or_default()
    }

    /// Store this context in the extensions of `req`, replacing any context
    /// already there. The client interceptors read it back from there.
    pub fn attach<T>(&self, req: &mut Request<T>) {
        req.extensions_mut().insert(self.clone());
    }

    /// Derive a child context associated with `headers`.
    pub fn with_headers<R: HeaderRecord>(&self, headers: R) -> Self {
        self.with_value(TypeId::of::<Marker<R>>(), Arc::new(headers))
    }

    /// The record associated for `R`, or its zero value when there is none.
    pub fn headers<R: HeaderRecord>(&self) -> R {
        self.find::<R>().cloned().unwrap_or_default()
    }

    pub fn find<R: HeaderRecord>(&self) -> Option<&R> {
        self.value(TypeId::of::<Marker<R>>())
    }

    pub fn has_headers<R: HeaderRecord>(&self) -> bool {
        self.find::<R>().is_some()
    }

    /// Derive a child context that forwards tags into `sink`.
    pub fn with_tags(&self, sink: Arc<dyn TagSink>) -> Self {
        self.with_value(TypeId::of::<TagsMarker>(), Arc::new(sink))
    }

    /// The tag sink of this context; a no-op sink when none was attached.
    pub fn tags(&self) -> &dyn TagSink {
        match self.value::<Arc<dyn TagSink>>(TypeId::of::<TagsMarker>()) {
            Some(sink) => sink.as_ref(),
            None => &NoopTags,
        }
    }

    pub fn has_tags(&self) -> bool {
        self.value::<Arc<dyn TagSink>>(TypeId::of::<TagsMarker>())
            .is_some()
    }

    fn with_value(&self, key: TypeId, value: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            head: Some(Arc::new(Node {
                key,
                value,
                parent: self.head.clone(),
            })),
        }
    }

    fn value<V: Any>(&self, key: TypeId) -> Option<&V> {
        self.nodes()
            .find(|node| node.key == key)
            .and_then(|node| node.value.downcast_ref::<V>())
    }

    fn nodes(&self) -> impl Iterator<Item = &Node> {
        std::iter::successors(self.head.as_deref(), |node| node.parent.as_deref())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("associations", &self.nodes().count())
            .finish()
    }
}
