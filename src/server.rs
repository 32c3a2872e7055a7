//! Web server

use crate::cli;

use std::path::PathBuf;
use std::{net::SocketAddr, process::exit, str::FromStr, time::Duration};

use axum::Router;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use expanduser::expanduser;
use tokio::signal;

/// Serve the gridded model evaluation service
///
/// # Arguments
///
/// * `args`: Command line arguments
/// * `router`: The application [Router] to serve
pub async fn serve(args: &cli::CommandLineArgs, router: Router) {
    let addr = SocketAddr::from_str(&format!("{}:{}", args.host, args.port))
        .expect("invalid host name, IP address or port number");

    // Catch ctrl+c and try to shutdown gracefully
    let handle = Handle::new();
    tokio::spawn(shutdown_signal(
        handle.clone(),
        args.graceful_shutdown_timeout,
    ));

    tracing::info!("listening on {}", addr);
    if args.https {
        let tls_config = tls_config(&args.cert_file, &args.key_file).await;
        axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(router.into_make_service())
            .await
            .unwrap();
    } else {
        axum_server::bind(addr)
            .handle(handle)
            .serve(router.into_make_service())
            .await
            .unwrap();
    }
}

/// Load the TLS configuration from the certificate and key file arguments.
async fn tls_config(cert_file: &str, key_file: &str) -> RustlsConfig {
    let cert_file = tls_file(cert_file, "certificate");
    let key_file = tls_file(key_file, "key");
    RustlsConfig::from_pem_file(cert_file, key_file)
        .await
        .expect("failed to load TLS certificate files")
}

/// Expand and check one TLS file path, exiting with a clear message if it is
/// absent.
fn tls_file(path: &str, kind: &str) -> PathBuf {
    let expanded = expanduser(path)
        .expect("failed to expand ~ to user name, provide an absolute path instead");
    if !expanded.exists() {
        eprintln!("TLS {} file expected at '{}' but not found.", kind, expanded.display());
        exit(1)
    }
    expanded
        .canonicalize()
        .expect("failed to determine absolute path to TLS file")
}

/// Graceful shutdown handler
///
/// Installs signal handlers to catch Ctrl-C or SIGTERM and trigger a graceful shutdown.
async fn shutdown_signal(handle: Handle, timeout: u64) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("signal received, starting graceful shutdown");
    handle.graceful_shutdown(Some(Duration::from_secs(timeout)));
}
