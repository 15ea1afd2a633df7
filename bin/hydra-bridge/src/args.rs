//! Parses command-line arguments for the bridge node.

use std::path::PathBuf;

use clap::{crate_version, Parser};

#[derive(Debug, Parser)]
#[clap(
    name = "hydra-bridge",
    about = "Bridges funds between Cardano and a Hydra head",
    version = crate_version!()
)]
pub(crate) struct Cli {
    #[clap(
        long,
        short = 'p',
        help = "The file containing params for the bridge",
        default_value = "params.toml"
    )]
    pub params: PathBuf,

    #[clap(
        long,
        short = 'c',
        help = "The file containing the configuration for the bridge",
        default_value = "config.toml"
    )]
    pub config: PathBuf,
}
