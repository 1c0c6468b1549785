//! Serve a small JSON-RPC service.
//!
//! ```sh
//! # with a config file
//! cargo run --example serve -- service.toml
//! # on ./rpc.sock
//! cargo run --example serve
//! ```
//!
//! Then call it:
//!
//! ```sh
//! curl --unix-socket ./rpc.sock http://localhost/rpc \
//!   -H 'Content-Type: application/json' -H 'Accept: application/json' \
//!   -d '{"jsonrpc":"2.0","method":"subtract","params":[45,3],"id":1}'
//! ```

use jrpc_http::{ErrorPayload, Parameters, ServiceBuilder, ServiceConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

async fn subtract(params: Parameters) -> Result<i64, ErrorPayload> {
    let [minuend, subtrahend] = params.positional::<i64>()?[..] else {
        return Err(ErrorPayload::invalid_params().with_detail("expected two integers"));
    };
    Ok(minuend - subtrahend)
}

async fn whoami(params: Parameters) -> Result<Option<String>, ErrorPayload> {
    Ok(params.remote_address().map(|ip| ip.to_string()))
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let builder = match std::env::args().nth(1) {
        Some(path) => ServiceConfig::load(path)?.into_builder()?,
        None => ServiceBuilder::new().route("/rpc").unix_socket("./rpc.sock"),
    };

    let service = builder
        .register("subtract", subtract)
        .register("whoami", whoami)
        .build();

    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    service.serve(token).await?;
    Ok(())
}
