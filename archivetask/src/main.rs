//! Task CLI binary entrypoint.
//!
//! Parses the command line and hands off to the `tasks` module, which
//! talks to the archive hub over its TCP wire protocol. Each invocation
//! is one task: connect, do the work, print the result, exit.
//!
mod tasks;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "archivetask", version, about = "Operational tasks for the Cipher Archive hub")]
struct Cli {
    /// Hub TCP address to connect to
    #[arg(long, default_value = "127.0.0.1:7401")]
    hub: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the archive address and how many files it holds
    Address,
    /// Encrypt an IPFS hash and store it as a file record
    StoreFile {
        /// Filename to record
        #[arg(long)]
        name: String,
        /// Plain IPFS hash string to encrypt
        #[arg(long)]
        hash: String,
        /// Secret address token to use instead of a random one
        #[arg(long)]
        secret: Option<String>,
        /// Owner address, defaults to the dev account
        #[arg(long)]
        owner: Option<String>,
    },
    /// List the file records stored for an owner
    ListFiles {
        /// Owner address, defaults to the dev account
        #[arg(long)]
        owner: Option<String>,
    },
    /// Recover the secret address and IPFS hash of a stored record
    DecryptFile {
        /// Store index of the record
        #[arg(long)]
        index: u64,
        /// Owner address, defaults to the dev account
        #[arg(long)]
        owner: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Address => tasks::address(&cli.hub).await,
        Commands::StoreFile {
            name,
            hash,
            secret,
            owner,
        } => tasks::store_file(&cli.hub, &name, &hash, secret, owner).await,
        Commands::ListFiles { owner } => tasks::list_files(&cli.hub, owner).await,
        Commands::DecryptFile { index, owner } => tasks::decrypt_file(&cli.hub, index, owner).await,
    }
}
