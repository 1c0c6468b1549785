//! Listener bootstrap.

use crate::{error::ServeError, transport::TlsTransport, Service};
use tokio_util::sync::CancellationToken;
use tracing::info;

impl Service {
    /// Serve on the configured transport until `shutdown` is cancelled.
    ///
    /// Exactly one of a unix socket or a TLS listener must be configured.
    ///
    /// On a unix socket, a stale file at the socket path is removed, and the
    /// new socket file gets the configured permission bits. Peers on a unix
    /// socket have no address, so an authorization table can only admit them
    /// through reverse proxy headers.
    ///
    /// On TLS, the certificate and key must be PEM files. The peer address
    /// is passed to the authorization gate.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<(), ServeError> {
        let settings = self.settings().clone();
        match (&settings.unix, &settings.tls) {
            (Some(_), Some(_)) => Err(ServeError::BothTransports),
            (None, None) => Err(ServeError::NoTransport),
            (Some(unix), None) => {
                #[cfg(unix)]
                {
                    unix::serve(self, unix, shutdown).await
                }
                #[cfg(not(unix))]
                {
                    let _ = (unix, shutdown);
                    Err(std::io::Error::from(std::io::ErrorKind::Unsupported).into())
                }
            }
            (None, Some(tls)) => serve_tls(self, tls, shutdown).await,
        }
    }
}

#[cfg(unix)]
mod unix {
    use crate::{error::ServeError, transport::UnixTransport, Service};
    use std::{fs::Permissions, io, os::unix::fs::PermissionsExt};
    use tokio::net::UnixListener;
    use tokio_util::sync::CancellationToken;
    use tracing::{debug, info};

    pub(super) async fn serve(
        service: Service,
        unix: &UnixTransport,
        shutdown: CancellationToken,
    ) -> Result<(), ServeError> {
        match tokio::fs::remove_file(&unix.path).await {
            Ok(()) => debug!(path = %unix.path.display(), "removed stale socket file"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        let listener = UnixListener::bind(&unix.path)?;
        tokio::fs::set_permissions(&unix.path, Permissions::from_mode(unix.mode)).await?;

        info!(
            path = %unix.path.display(),
            mode = %format!("{:#o}", unix.mode),
            route = service.route(),
            "listening on unix socket"
        );

        axum::serve(listener, service.into_axum())
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;

        info!(path = %unix.path.display(), "unix socket listener stopped");
        Ok(())
    }
}

#[cfg(feature = "tls")]
async fn serve_tls(
    service: Service,
    tls: &TlsTransport,
    shutdown: CancellationToken,
) -> Result<(), ServeError> {
    use axum_server::{tls_rustls::RustlsConfig, Handle};
    use std::{net::SocketAddr, time::Duration};

    for path in [&tls.cert, &tls.key] {
        if !path.exists() {
            return Err(ServeError::MissingFile(path.clone()));
        }
    }
    let config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;

    let handle = Handle::new();
    let watcher = handle.clone();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        watcher.graceful_shutdown(Some(Duration::from_secs(10)));
    });

    info!(addr = %tls.addr, route = service.route(), "listening with TLS");

    let app = service
        .into_axum()
        .into_make_service_with_connect_info::<SocketAddr>();
    axum_server::bind_rustls(tls.addr, config)
        .handle(handle)
        .serve(app)
        .await?;

    info!(addr = %tls.addr, "TLS listener stopped");
    Ok(())
}

#[cfg(not(feature = "tls"))]
async fn serve_tls(
    _service: Service,
    _tls: &TlsTransport,
    _shutdown: CancellationToken,
) -> Result<(), ServeError> {
    Err(ServeError::TlsDisabled)
}
