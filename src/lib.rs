//! Propagation of caller headers across gRPC hops.
//!
//! Server interceptors decode a header family from inbound metadata into the
//! call's [`Context`]; handlers hand that context to their outbound requests;
//! client interceptors encode it back into outgoing metadata.

pub mod context;
pub mod error;
pub mod headers;
pub mod logging;
pub mod schema;
pub mod stream;
pub mod tags;

pub mod grpc {
    pub mod client;
    pub mod interceptors;
    pub mod rpc {
        tonic::include_proto!("rpc");
    }
    pub mod server;
    mod util;
}

pub use context::Context;
pub use grpc::interceptors::{chain, Chain, ExtractHeaders, InjectHeaders};
pub use headers::{SsnHeaders, VmlHeaders};
pub use schema::{AssociationPolicy, HeaderRecord};
pub use stream::ContextStream;
