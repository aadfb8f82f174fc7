use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use sfbridge_client::sinks::SinkWriterEnum;
use sfbridge_client::source::Subscription;
use sfbridge_client::Forwarder;

use crate::app::get_app;
use crate::structs::BridgeInfo;

pub struct BridgeServer {
    forwarder: Forwarder<SinkWriterEnum>,
    subscription: Subscription,
    listener: TcpListener,
    info: BridgeInfo,
}

impl BridgeServer {
    pub async fn bind(
        forwarder: Forwarder<SinkWriterEnum>,
        subscription: Subscription,
        info: BridgeInfo,
        addr: SocketAddr,
    ) -> Result<Self> {
        match TcpListener::bind(addr).await {
            Ok(listener) => Ok(Self {
                forwarder,
                subscription,
                listener,
                info,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                bail!(
                    "Port {} is already in use. Another bridge may be running; \
                     check with `sudo lsof -nP -iTCP:{} -sTCP:LISTEN`, or stop it \
                     with `sfbridge terminate`.",
                    addr.port(),
                    addr.port()
                )
            }
            Err(e) => bail!("Failed to bind to address {}: {}", addr, e),
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves the admin endpoints on a background task and drives the
    /// forwarding loop in the foreground. Returns when the loop ends:
    /// Ok on graceful shutdown, Err on a fatal subscription failure.
    pub async fn run(self) -> Result<()> {
        let BridgeServer {
            forwarder,
            subscription,
            listener,
            info,
        } = self;

        let cancellation_token = CancellationToken::new();
        spawn_signal_listener(cancellation_token.clone());

        let app = get_app(
            Arc::new(info),
            forwarder.counters(),
            cancellation_token.clone(),
        );

        let server = tokio::spawn(axum::serve(listener, app).into_future());

        let result = forwarder.run(subscription, cancellation_token).await;

        server.abort();

        if let Err(e) = forwarder.close().await {
            warn!(error = %e, "Sink did not close cleanly");
        }

        result
    }
}

fn spawn_signal_listener(cancellation_token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm =
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(stream) => stream,
                    Err(e) => {
                        warn!(error = %e, "Failed to install SIGTERM handler");
                        return;
                    }
                };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }

        info!("Termination signal received");
        cancellation_token.cancel();
    });
}
