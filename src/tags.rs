//! Request tagging sinks that extraction forwards caller identity into.

use std::{collections::BTreeMap, fmt, sync::Arc};

use parking_lot::Mutex;

pub trait TagSink: Send + Sync {
    fn set(&self, key: &str, value: &str);
}

/// Builds the tag sink for each call an interceptor extracts.
#[derive(Clone)]
pub struct TagSinkFactory(Arc<dyn Fn() -> Arc<dyn TagSink> + Send + Sync>);

impl TagSinkFactory {
    pub fn new<F>(make: F) -> Self
    where
        F: Fn() -> Arc<dyn TagSink> + Send + Sync + 'static,
    {
        Self(Arc::new(make))
    }

    /// A fresh `T` for every call.
    pub fn per_call<T: TagSink + Default + 'static>() -> Self {
        Self::new(|| Arc::new(T::default()) as Arc<dyn TagSink>)
    }

    /// The same sink for every call. Only sinks without per-call state, such
    /// as [`TracingTags`], should be shared.
    pub fn shared(sink: Arc<dyn TagSink>) -> Self {
        Self::new(move || sink.clone())
    }

    pub fn make(&self) -> Arc<dyn TagSink> {
        (self.0)()
    }
}

impl fmt::Debug for TagSinkFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagSinkFactory").finish_non_exhaustive()
    }
}

/// Discards every tag.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTags;

impl TagSink for NoopTags {
    fn set(&self, _key: &str, _value: &str) {}
}

/// Emits one `tracing` event per tag, inside whatever span is current.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingTags;

impl TagSink for TracingTags {
    fn set(&self, key: &str, value: &str) {
        tracing::info!(tag.key = key, tag.value = value, "request tag");
    }
}

/// Keeps tags in memory so they can be read back later in the request.
#[derive(Debug, Default)]
pub struct RequestTags {
    values: Mutex<BTreeMap<String, String>>,
}

impl RequestTags {
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    pub fn values(&self) -> BTreeMap<String, String> {
        self.values.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}

impl TagSink for RequestTags {
    fn set(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_string(), value.to_string());
    }
}
