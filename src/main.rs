use std::{net::SocketAddr, sync::Arc};

use clap::Parser;
use ctx_headers::{
    grpc::server,
    logging,
    tags::{TagSinkFactory, TracingTags},
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Demo server propagating caller headers", long_about = None)]
struct Args {
    /// address to listen on
    #[arg(short, long, env = "CTX_HEADERS_ADDR", default_value = "127.0.0.1:9090")]
    addr: SocketAddr,

    /// log filter used when RUST_LOG is not set
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level)?;

    server::run(args.addr, TagSinkFactory::shared(Arc::new(TracingTags))).await?;
    Ok(())
}
