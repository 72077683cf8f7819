//! fleetpack CLI
//!
//! Command-line interface for managing packets and specs on a fleetpack
//! server, and for building and installing packets locally.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use fleetpack_client::HttpClient;
use tracing_subscriber::EnvFilter;

mod packet;
mod spec;

#[derive(Parser)]
#[command(name = "fleetpack-cli")]
#[command(about = "Manage packets and specs on a fleetpack server", long_about = None)]
struct Cli {
    /// Server address
    #[arg(
        short,
        long,
        global = true,
        env = "FLEETPACK_ADDR",
        default_value = "http://localhost:8080"
    )]
    address: String,

    /// Bearer token for the server
    #[arg(short, long, global = true, env = "FLEETPACK_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Packet related commands
    #[command(subcommand)]
    Packet(PacketCommand),

    /// Spec related commands
    #[command(subcommand)]
    Spec(SpecCommand),
}

#[derive(Subcommand)]
pub(crate) enum PacketCommand {
    /// List all packets on the server
    List,

    /// Upload a .jpk file
    Upload {
        /// Packet file
        file: PathBuf,
    },

    /// Build a .jpk from a packet directory
    Build {
        /// Packet directory
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Output file (default: <name>[_<version>].jpk)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Scaffold an empty packet directory
    Init {
        /// Directory to create
        dir: PathBuf,
        /// Packet name
        #[arg(short, long)]
        name: String,
        /// Labels as key=value,...
        #[arg(short, long, default_value = "")]
        labels: String,
    },

    /// Show control info for a hash
    Info {
        /// Packet hash
        hash: String,
    },

    /// Download a packet to a file
    Download {
        /// Packet hash
        hash: String,
        /// Output file (default: <name>[_<version>].jpk)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Delete a packet from the server
    Delete {
        /// Packet hash
        hash: String,
    },

    /// Install a packet from a file or the server
    Install {
        /// Path to a .jpk file, or a packet hash
        packet: String,
        /// Install root
        #[arg(short, long, default_value = "/")]
        root: PathBuf,
    },

    /// Uninstall a packet from a file or the server
    Uninstall {
        /// Path to a .jpk file, or a packet hash
        packet: String,
        /// Install root
        #[arg(short, long, default_value = "/")]
        root: PathBuf,
    },

    /// Resolve the desired state for a label set
    Compute {
        /// Labels as key=value,...
        #[arg(short, long, default_value = "")]
        labels: String,
    },

    /// Print the hash a packet file is stored under
    Hash {
        /// Packet file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub(crate) enum SpecCommand {
    /// List all specs
    List,

    /// Show one spec
    Get {
        /// Spec id
        id: String,
    },

    /// Create a spec from a YAML or JSON file
    Create {
        /// Spec file
        #[arg(short, long, default_value = "/dev/stdin")]
        file: PathBuf,
    },

    /// Replace a spec from a YAML or JSON file
    Update {
        /// Spec id
        id: String,
        /// Spec file
        #[arg(short, long, default_value = "/dev/stdin")]
        file: PathBuf,
    },

    /// Delete a spec
    Delete {
        /// Spec id
        id: String,
    },

    /// Merge every spec matching a label set
    Compute {
        /// Labels as key=value,...
        #[arg(short, long, default_value = "")]
        labels: String,
    },
}

impl Cli {
    fn client(&self) -> Result<HttpClient> {
        let client = HttpClient::new(&self.address)?;
        Ok(match &self.token {
            Some(token) if !token.is_empty() => client.with_token(token),
            _ => client,
        })
    }
}

/// Write a value to stdout as YAML
pub(crate) fn print_yaml<T: serde::Serialize>(value: &T) -> Result<()> {
    print!("{}", serde_yaml::to_string(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = cli.client()?;

    match cli.command {
        Commands::Packet(cmd) => packet::run(&client, cmd).await,
        Commands::Spec(cmd) => spec::run(&client, cmd).await,
    }
}
