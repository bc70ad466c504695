//! dbgbridge: a remote debugging bridge.
//!
//! Connects to a debuggee's remote debugging channel and serves a simple
//! JSON protocol to one local client. The workspace crates do the work;
//! this crate wires them together and owns process-wide concerns such as
//! logging.

pub mod logging;
pub mod resolve;

use std::sync::Arc;

use anyhow::{anyhow, Context};

pub use bridge_config::{self as config, Config};
pub use bridge_frontend::{self as frontend, Frontend};
pub use bridge_protocol as protocol;
pub use bridge_session::{self as session, DebugChannel, Session};
pub use resolve::{resolve_target, ResolveError};

/// Debug the process listening at `address:port` through `channel`.
///
/// The client frontend listens on `config.frontend.host` at
/// `port + config.frontend.port_offset`. Returns once the debuggee exits
/// or the frontend is stopped; the session is disposed either way.
pub async fn run_bridge(
    channel: Arc<dyn DebugChannel>,
    address: &str,
    port: u16,
    config: &Config,
) -> anyhow::Result<()> {
    bridge_config::validate::validate(config).map_err(|errors| {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow!("invalid configuration: {}", details.join("; "))
    })?;

    let target = resolve_target(address, port)
        .await
        .context("cannot resolve debuggee address")?;

    let frontend_port = port
        .checked_add(config.frontend.port_offset)
        .ok_or_else(|| {
            anyhow!(
                "frontend port {} + {} is out of range",
                port,
                config.frontend.port_offset
            )
        })?;
    let frontend_addr = resolve_target(&config.frontend.host, frontend_port)
        .await
        .context("cannot resolve frontend host")?;

    let frontend = Arc::new(Frontend::new(
        frontend_addr,
        config.frontend.read_chunk_size,
    ));
    frontend
        .listen()
        .await
        .with_context(|| format!("cannot listen on {}", frontend_addr))?;

    let session = Session::new(channel, frontend, target, config);
    let result = session.run().await;
    session.dispose();

    result.with_context(|| format!("debug session for {} failed", target))
}
