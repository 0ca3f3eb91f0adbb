use clap::Parser;
use ctx_headers::{
    grpc::{client, rpc::Identity},
    logging, Context, SsnHeaders, VmlHeaders,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Send pings carrying caller headers", long_about = None)]
struct Args {
    /// server address
    #[arg(short, long, env = "CTX_HEADERS_ADDR", default_value = "127.0.0.1:9090")]
    addr: String,

    /// if this flag is set, ask the server to forward the ping to this address
    #[arg(short, long)]
    fwd: Option<String>,

    /// sent as vml-username
    #[arg(short, long, default_value = "")]
    username: String,

    /// sent as vml-ocr-cache
    #[arg(long, default_value = "")]
    ocr_cache: String,

    /// sent as x-ssn-username; omitted entirely when not given
    #[arg(long)]
    ssn_username: Option<String>,

    /// use the streaming rpc
    #[arg(long)]
    stream: bool,

    /// number of pings to send on a stream
    #[arg(short, long, default_value_t = 3)]
    count: u32,

    /// log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level)?;

    // nothing was received here, so the headers are attached directly
    let mut ctx = Context::new().with_headers(VmlHeaders {
        username: args.username,
        ocr_cache_control: args.ocr_cache,
    });
    if let Some(username) = args.ssn_username {
        ctx = ctx.with_headers(SsnHeaders { username });
    }

    match args.fwd {
        Some(fwd) => print_identity(&client::forward_ping(&args.addr, &fwd, args.stream, &ctx).await?),
        None if args.stream => {
            for identity in client::ping_stream(&args.addr, &ctx, args.count).await? {
                print_identity(&identity);
            }
        }
        None => print_identity(&client::ping(&args.addr, &ctx).await?),
    }
    Ok(())
}

fn print_identity(identity: &Identity) {
    println!(
        "#{} vml-username={:?} vml-ocr-cache={:?} (allow={}) x-ssn-username={}",
        identity.seq,
        identity.vml_username,
        identity.vml_ocr_cache,
        identity.ocr_cache_allow,
        if identity.ssn_present {
            format!("{:?}", identity.ssn_username)
        } else {
            "<absent>".to_string()
        },
    );
}
