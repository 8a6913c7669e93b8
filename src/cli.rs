use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "smolvid")]
#[command(about = "Shrink social-media videos to a fixed size", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Server(ServerArgs),
    /// Compress one URL and write the result to disk
    Compress(CompressArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind to; defaults to the configured host and port
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(clap::Args, Debug)]
pub struct CompressArgs {
    /// Page URL hosting the video
    pub url: String,

    /// Where to write the compressed MP4 (default: ./<id>_smol.mp4)
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}
