use std::net::SocketAddr;

use tokio::{net::TcpListener, sync::mpsc};
use tokio_stream::{
    wrappers::{ReceiverStream, TcpListenerStream},
    StreamExt,
};
use tonic::{codegen::InterceptedService, transport::Server, Request, Response, Status, Streaming};

use super::{
    client,
    interceptors::{chain, Chain, ExtractHeaders},
    rpc::{
        demo_server::{Demo, DemoServer},
        ForwardPingRequest, Identity, PingRequest,
    },
    util::log_metadata,
};
use crate::{
    context::Context,
    error::Result,
    headers::{SsnHeaders, VmlHeaders},
    stream::ContextStream,
    tags::TagSinkFactory,
};

/// Server interceptor extracting every header family we propagate.
///
/// Both families tag `username`. SSN is extracted second, so its username is
/// the one tagged when a call carries both.
pub type Extraction = Chain<ExtractHeaders<VmlHeaders>, ExtractHeaders<SsnHeaders>>;

pub fn extraction(tags: TagSinkFactory) -> Extraction {
    chain(
        ExtractHeaders::new().with_tags(tags.clone()),
        ExtractHeaders::new().with_tags(tags),
    )
}

pub struct DemoService {}

#[tonic::async_trait]
impl Demo for DemoService {
    async fn ping(&self, request: Request<PingRequest>) -> Result<Response<Identity>, Status> {
        log_metadata("request", request.metadata());
        let ctx = Context::from_request(&request);
        Ok(Response::new(identity(&ctx, request.get_ref().seq)))
    }

    async fn forward_ping(
        &self,
        request: Request<ForwardPingRequest>,
    ) -> Result<Response<Identity>, Status> {
        log_metadata("request", request.metadata());

        // the next hop is called with this call's context
        let ctx = Context::from_request(&request);
        let ForwardPingRequest { addr, streaming } = request.into_inner();
        tracing::debug!(%addr, streaming, "forwarding ping");

        let identity = if streaming {
            client::ping_stream_once(&addr, &ctx).await?
        } else {
            client::ping(&addr, &ctx).await?
        };
        Ok(Response::new(identity))
    }

    type PingStreamStream = ReceiverStream<Result<Identity, Status>>;

    async fn ping_stream(
        &self,
        request: Request<Streaming<PingRequest>>,
    ) -> Result<Response<Self::PingStreamStream>, Status> {
        log_metadata("request", request.metadata());

        let mut pings = ContextStream::from_request(request);
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            while let Some(ping) = pings.next().await {
                let reply = ping.map(|ping| identity(pings.context(), ping.seq));
                if tx.send(reply).await.is_err() {
                    break;
                }
            }
        });
        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

/// What `ctx` holds, as reported back to callers.
fn identity(ctx: &Context, seq: u32) -> Identity {
    let vml = ctx.headers::<VmlHeaders>();
    let ssn = ctx.find::<SsnHeaders>();
    Identity {
        seq,
        ocr_cache_allow: vml.ocr_cache_allow(),
        vml_username: vml.username,
        vml_ocr_cache: vml.ocr_cache_control,
        ssn_username: ssn.map(|h| h.username.clone()).unwrap_or_default(),
        ssn_present: ssn.is_some(),
    }
}

pub fn service(tags: TagSinkFactory) -> InterceptedService<DemoServer<DemoService>, Extraction> {
    DemoServer::with_interceptor(DemoService {}, extraction(tags))
}

pub async fn run(addr: SocketAddr, tags: TagSinkFactory) -> Result<()> {
    tracing::info!(%addr, "demo server listening");
    Server::builder()
        .add_service(service(tags))
        .serve(addr)
        .await?;

    Ok(())
}

/// Serve on an already bound listener, e.g. one bound to port 0.
pub async fn serve_listener(listener: TcpListener, tags: TagSinkFactory) -> Result<()> {
    Server::builder()
        .add_service(service(tags))
        .serve_with_incoming(TcpListenerStream::new(listener))
        .await?;

    Ok(())
}
