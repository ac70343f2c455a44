//! [`Args`] definitions.

use clap::Parser;

use crate::config::StoreKind;

/// Server issuing signed tokens and keeping sessions.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,

    /// Revocation store overriding the configured one.
    #[arg(long, value_enum)]
    pub store: Option<StoreKind>,
}

impl Args {
    /// Parses command line arguments.
    ///
    /// # Errors
    ///
    /// If the command line arguments are malformed.
    pub fn parse() -> Result<Self, clap::Error> {
        <Self as Parser>::try_parse()
    }
}
