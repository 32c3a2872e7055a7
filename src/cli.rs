//! Command Line Interface (CLI) arguments.

use clap::Parser;

/// Gridverify command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "0.0.0.0", env = "GRIDVERIFY_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 8080, env = "GRIDVERIFY_PORT")]
    pub port: u16,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "GRIDVERIFY_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/gridverify/certs/cert.pem",
        env = "GRIDVERIFY_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/gridverify/certs/key.pem",
        env = "GRIDVERIFY_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for operations to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "GRIDVERIFY_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
    /// Directory uploaded payloads are spooled to for the duration of a request
    #[arg(long, default_value = "./uploads", env = "GRIDVERIFY_UPLOAD_DIR")]
    pub upload_dir: String,
    /// Directory rendered plot artifacts are written to and served from
    #[arg(long, default_value = "./plots", env = "GRIDVERIFY_PLOT_DIR")]
    pub plot_dir: String,
    /// Maximum accepted request body size in bytes
    #[arg(long, default_value_t = 256 * 1024 * 1024, env = "GRIDVERIFY_MAX_UPLOAD_SIZE")]
    pub max_upload_size: usize,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
