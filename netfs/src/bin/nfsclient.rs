use std::path::PathBuf;

use clap::Parser;

use netfs::shell::Shell;

/// Command-line client for an nfsserver instance.
#[derive(Parser)]
struct Cli {
    /// Script file to execute instead of the interactive prompt
    #[arg(short = 's', long = "script")]
    script: Option<PathBuf>,

    /// Server address as server:port
    server: String,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut shell = Shell::connect(&cli.server)?;
    match cli.script {
        Some(script) => shell.run_script(&script),
        None => shell.run(),
    }
}
