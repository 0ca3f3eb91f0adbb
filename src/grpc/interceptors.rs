use std::marker::PhantomData;

use tonic::{metadata::MetadataMap, service::Interceptor, Request, Status};

use crate::{
    context::Context,
    schema::{self, AssociationPolicy, HeaderRecord},
    tags::TagSinkFactory,
};

/// Server interceptor: decodes the `R` headers of an inbound call and
/// publishes them into the call's [`Context`].
///
/// tonic runs interceptors once per call, so for streaming calls this happens
/// at stream open; handlers pick the context up with
/// [`ContextStream::from_request`](crate::stream::ContextStream::from_request).
pub struct ExtractHeaders<R> {
    tags: Option<TagSinkFactory>,
    _record: PhantomData<fn() -> R>,
}

impl<R: HeaderRecord> ExtractHeaders<R> {
    pub fn new() -> Self {
        Self {
            tags: None,
            _record: PhantomData,
        }
    }

    /// Forward tagged fields into a sink built by `factory`, once per call,
    /// for calls whose context has no sink of its own.
    pub fn with_tags(mut self, factory: TagSinkFactory) -> Self {
        self.tags = Some(factory);
        self
    }

    /// The context `ctx` becomes once `metadata` has been extracted into it.
    pub fn extract(&self, ctx: Context, metadata: &MetadataMap) -> Context {
        let ctx = match &self.tags {
            Some(factory) if !ctx.has_tags() => ctx.with_tags(factory.make()),
            _ => ctx,
        };
        let Some(headers) = schema::decode::<R>(metadata).into_published() else {
            return ctx;
        };
        tracing::debug!(schema = R::schema().name, ?headers, "extracted headers");
        schema::forward_tags(&headers, ctx.tags());
        ctx.with_headers(headers)
    }
}

impl<R: HeaderRecord> Default for ExtractHeaders<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for ExtractHeaders<R> {
    fn clone(&self) -> Self {
        Self {
            tags: self.tags.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: HeaderRecord> Interceptor for ExtractHeaders<R> {
    fn call(&mut self, mut req: Request<()>) -> Result<Request<()>, Status> {
        let ctx = self.extract(Context::from_request(&req), req.metadata());
        ctx.attach(&mut req);
        Ok(req)
    }
}

/// Client interceptor: encodes the `R` headers found in the outgoing
/// request's [`Context`] into its metadata.
pub struct InjectHeaders<R> {
    _record: PhantomData<fn() -> R>,
}

impl<R: HeaderRecord> InjectHeaders<R> {
    pub fn new() -> Self {
        Self {
            _record: PhantomData,
        }
    }

    /// Append the headers held by `ctx` to `metadata`.
    pub fn inject(&self, ctx: &Context, metadata: &mut MetadataMap) {
        match R::schema().policy {
            AssociationPolicy::Always => schema::encode(&ctx.headers::<R>(), metadata),
            AssociationPolicy::WhenPresent | AssociationPolicy::WhenNonEmpty => {
                if let Some(headers) = ctx.find::<R>() {
                    schema::encode(headers, metadata)
                }
            }
        }
    }
}

impl<R: HeaderRecord> Default for InjectHeaders<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for InjectHeaders<R> {
    fn clone(&self) -> Self {
        Self {
            _record: PhantomData,
        }
    }
}

impl<R: HeaderRecord> Interceptor for InjectHeaders<R> {
    fn call(&mut self, mut req: Request<()>) -> Result<Request<()>, Status> {
        let ctx = Context::from_request(&req);
        self.inject(&ctx, req.metadata_mut());
        Ok(req)
    }
}

/// Runs `first`, then `second`, stopping at the first error.
#[derive(Clone, Debug, Default)]
pub struct Chain<A, B> {
    first: A,
    second: B,
}

pub fn chain<A: Interceptor, B: Interceptor>(first: A, second: B) -> Chain<A, B> {
    Chain { first, second }
}

impl<A: Interceptor, B: Interceptor> Interceptor for Chain<A, B> {
    fn call(&mut self, req: Request<()>) -> Result<Request<()>, Status> {
        let req = self.first.call(req)?;
        self.second.call(req)
    }
}
