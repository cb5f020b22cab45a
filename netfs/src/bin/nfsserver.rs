use std::net::TcpListener;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use blockfs::{BlockStorage, FileDisk, FileSys, NUM_BLOCKS};
use netfs::server::Server;

/// Hosts the block file system for a single nfsclient connection.
#[derive(Parser)]
struct Cli {
    /// TCP port to listen on
    port: u16,

    /// Disk image backing the file system (created if absent)
    #[arg(long, default_value = "DISK")]
    disk: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let storage = FileDisk::open_disk(&cli.disk, NUM_BLOCKS)
        .with_context(|| format!("could not open disk image {:?}", cli.disk))?;
    let fs = FileSys::mount(storage).context("could not mount file system")?;

    let listener = TcpListener::bind(("0.0.0.0", cli.port))
        .with_context(|| format!("could not listen on port {}", cli.port))?;

    Server::new(fs).serve(&listener)
}
