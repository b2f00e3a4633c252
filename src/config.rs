use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub max_request_bytes: usize,
}

/// One-shot maintenance modes selected on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Serve,
    Migrate,
    /// `partition: None` sweeps today's partition.
    Sweep {
        partition: Option<String>,
        remove: bool,
    },
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Day-partitioned frame inbox")]
pub struct Args {
    /// Host to bind to (overrides FRAME_INBOX_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides FRAME_INBOX_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory holding one sub-directory per day partition (overrides FRAME_INBOX_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides FRAME_INBOX_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Largest accepted request body in bytes (overrides FRAME_INBOX_MAX_REQUEST_BYTES)
    #[arg(long)]
    pub max_request_bytes: Option<usize>,

    /// Run migrations and exit
    #[arg(long, conflicts_with = "sweep")]
    pub migrate: bool,

    /// Report blobs of a partition (YYYYMMDD, default today) that have no record, then exit
    #[arg(long, value_name = "PARTITION")]
    pub sweep: Option<Option<String>>,

    /// With --sweep, also remove the unregistered blobs
    #[arg(long, requires = "sweep")]
    pub sweep_remove: bool,
}

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_REQUEST_BYTES: usize = 64 * 1024 * 1024;

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the run mode.
    pub fn from_env_and_args() -> Result<(Self, Mode)> {
        Self::from_args(Args::parse())
    }

    fn from_args(args: Args) -> Result<(Self, Mode)> {
        // --- Environment fallback ---
        let env_host = env::var("FRAME_INBOX_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env("FRAME_INBOX_PORT", DEFAULT_PORT)?;
        let env_storage =
            env::var("FRAME_INBOX_STORAGE_DIR").unwrap_or_else(|_| "./data/frames".into());
        let env_db = env::var("FRAME_INBOX_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/frame_inbox.db".into());
        let env_max_request =
            parse_env("FRAME_INBOX_MAX_REQUEST_BYTES", DEFAULT_MAX_REQUEST_BYTES)?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            max_request_bytes: args.max_request_bytes.unwrap_or(env_max_request),
        };

        let mode = match (args.migrate, args.sweep) {
            (true, _) => Mode::Migrate,
            (false, Some(partition)) => Mode::Sweep {
                partition,
                remove: args.sweep_remove,
            },
            (false, None) => Mode::Serve,
        };

        Ok((cfg, mode))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> (AppConfig, Mode) {
        let argv = std::iter::once("frame-inbox").chain(argv.iter().copied());
        let args = Args::try_parse_from(argv).unwrap();
        AppConfig::from_args(args).unwrap()
    }

    #[test]
    fn cli_flags_override_defaults() {
        let (cfg, mode) = parse(&[
            "--host",
            "127.0.0.1",
            "--port",
            "9100",
            "--storage-dir",
            "/tmp/f",
        ]);
        assert_eq!(cfg.addr(), "127.0.0.1:9100");
        assert_eq!(cfg.storage_dir, "/tmp/f");
        assert_eq!(mode, Mode::Serve);
    }

    #[test]
    fn maintenance_modes() {
        assert_eq!(parse(&["--migrate"]).1, Mode::Migrate);
        assert_eq!(
            parse(&["--sweep", "20240307", "--sweep-remove"]).1,
            Mode::Sweep {
                partition: Some("20240307".into()),
                remove: true
            }
        );
        assert_eq!(
            parse(&["--sweep"]).1,
            Mode::Sweep {
                partition: None,
                remove: false
            }
        );
        assert!(Args::try_parse_from(["frame-inbox", "--sweep-remove"]).is_err());
    }
}
