use tonic::{
    codegen::InterceptedService,
    transport::{Channel, Endpoint},
    Request,
};

use super::{
    interceptors::{chain, Chain, InjectHeaders},
    rpc::{demo_client::DemoClient, ForwardPingRequest, Identity, PingRequest},
    util::log_metadata,
};
use crate::{
    context::Context,
    error::{Error, Result},
    headers::{SsnHeaders, VmlHeaders},
};

/// Client interceptor re-emitting every header family we propagate.
pub type Propagation = Chain<InjectHeaders<VmlHeaders>, InjectHeaders<SsnHeaders>>;

pub type PropagatingClient = DemoClient<InterceptedService<Channel, Propagation>>;

pub fn propagation() -> Propagation {
    chain(InjectHeaders::new(), InjectHeaders::new())
}

pub async fn connect(addr: &str) -> Result<PropagatingClient> {
    let channel = Endpoint::from_shared(addr_to_url(addr))?.connect().await?;
    Ok(DemoClient::with_interceptor(channel, propagation()))
}

/// Unary ping carrying the headers held by `ctx`.
pub async fn ping(addr: &str, ctx: &Context) -> Result<Identity> {
    let mut request = Request::new(PingRequest { seq: 0 });
    ctx.attach(&mut request);

    let mut client = connect(addr).await?;
    let response = client.ping(request).await?;
    log_metadata("response", response.metadata());
    Ok(response.into_inner())
}

/// Open a `PingStream`, send `count` pings and collect every reply.
pub async fn ping_stream(addr: &str, ctx: &Context, count: u32) -> Result<Vec<Identity>> {
    let pings = tokio_stream::iter((1..=count).map(|seq| PingRequest { seq }));
    let mut request = Request::new(pings);
    ctx.attach(&mut request);

    let mut client = connect(addr).await?;
    let response = client.ping_stream(request).await?;
    log_metadata("response", response.metadata());

    let mut replies = response.into_inner();
    let mut identities = Vec::new();
    while let Some(identity) = replies.message().await? {
        identities.push(identity);
    }
    Ok(identities)
}

/// Ask the server at `addr` to ping `fwd_addr` on our behalf.
pub async fn forward_ping(
    addr: &str,
    fwd_addr: &str,
    streaming: bool,
    ctx: &Context,
) -> Result<Identity> {
    let mut request = Request::new(ForwardPingRequest {
        addr: fwd_addr.to_string(),
        streaming,
    });
    ctx.attach(&mut request);

    let mut client = connect(addr).await?;
    let response = client.forward_ping(request).await?;
    log_metadata("response", response.metadata());
    Ok(response.into_inner())
}

/// First reply of a one-message `PingStream`.
pub async fn ping_stream_once(addr: &str, ctx: &Context) -> Result<Identity> {
    ping_stream(addr, ctx, 1)
        .await?
        .into_iter()
        .next()
        .ok_or(Error::EmptyStream)
}

fn addr_to_url(addr: &str) -> String {
    format!("http://{}", addr)
}
