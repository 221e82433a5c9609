//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;

use tilesync::bulk::BulkError;
use tilesync::config::ConfigFileError;
use tilesync::coord::CoordError;
use tilesync::provider::ProviderError;
use tilesync::retrieval::FetchError;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    LoggingInit(String),
    Config(String),
    Provider(ProviderError),
    /// Invalid sector bounds on the command line.
    Sector(CoordError),
    HttpClient(FetchError),
    Runtime(std::io::Error),
    Bulk(BulkError),
    /// The estimated download exceeds `--max-download`.
    TooLarge { estimated: u64, limit: u64 },
}

impl CliError {
    /// Prints the error and exits with status 1.
    pub fn exit(&self) -> ! {
        eprintln!("{} {}", console::style("Error:").red().bold(), self);

        match self {
            CliError::Provider(_) => {
                eprintln!();
                eprintln!("Available providers: google, tianditu, tencent, baidu, xyz");
                eprintln!("  google layers:   satellite, hybrid, roadmap, terrain");
                eprintln!("  tianditu layers: img, vec, ter");
                eprintln!("  xyz:             pass the URL template as --layer");
            }
            CliError::TooLarge { .. } => {
                eprintln!();
                eprintln!("Narrow the sector, lower the level, or raise --max-download.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Provider(e) => write!(f, "Provider error: {}", e),
            CliError::Sector(e) => write!(f, "Invalid sector: {}", e),
            CliError::HttpClient(e) => write!(f, "Failed to create HTTP client: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Bulk(e) => write!(f, "Bulk retrieval failed: {}", e),
            CliError::TooLarge { estimated, limit } => write!(
                f,
                "Estimated download of {} exceeds the limit of {}",
                tilesync::config::format_size(*estimated),
                tilesync::config::format_size(*limit)
            ),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Provider(e) => Some(e),
            CliError::Sector(e) => Some(e),
            CliError::HttpClient(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Bulk(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<ProviderError> for CliError {
    fn from(e: ProviderError) -> Self {
        CliError::Provider(e)
    }
}

impl From<CoordError> for CliError {
    fn from(e: CoordError) -> Self {
        CliError::Sector(e)
    }
}

impl From<BulkError> for CliError {
    fn from(e: BulkError) -> Self {
        CliError::Bulk(e)
    }
}
