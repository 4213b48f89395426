//! Anchor-Proof CLI Application
//!
//! A command-line interface for issuing and verifying anchored proofs.

use anchor_proof::cli::{self, Denomination};
use anchor_proof::core::Network;
use anchor_proof::crypto::HashFunction;
use anchor_proof::explorer::{self, ExplorerAdapter, ExplorerConfig, Provider, DEFAULT_FEE_URL};
use anchor_proof::proof::VerifierConfig;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "anchor-proof")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Verify artifacts anchored on Bitcoin through Merkle proofs", long_about = None)]
struct Cli {
    /// Blockchain data provider (blockcypher, sochain)
    #[arg(long, global = true, default_value = "blockcypher")]
    provider: Provider,

    /// Bitcoin network (main, test)
    #[arg(short, long, global = true, default_value = "test")]
    network: Network,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value = "30")]
    timeout: u64,

    /// Override the provider's API root
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Recommended-fees endpoint
    #[arg(long, global = true, default_value = DEFAULT_FEE_URL)]
    fee_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a proof file against its anchoring transaction
    Verify {
        /// Proof file (JSON)
        #[arg(short, long)]
        proof: PathBuf,

        /// Artifact the proof was issued for
        #[arg(short, long)]
        artifact: Option<PathBuf>,

        /// Signing authority's public key (hex, SEC1)
        #[arg(long)]
        public_key: Option<String>,

        /// Node hash used by the Merkle tree
        #[arg(long, value_enum, default_value = "sha256")]
        hash: HashArg,
    },

    /// Build a Merkle tree over artifacts and write their proof files
    Prove {
        /// Artifacts to include, in leaf order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Directory for the generated proof files
        #[arg(short, long, default_value = "proofs")]
        output: PathBuf,

        /// Id of the transaction anchoring the root
        #[arg(long)]
        tx: Option<String>,

        /// Private key (hex) to sign content hashes and the root
        #[arg(long)]
        private_key: Option<String>,
    },

    /// Print the content hash of a file
    Hash {
        file: PathBuf,
    },

    /// Show a transaction and its anchored payload
    Tx {
        txid: String,
    },

    /// List unspent outputs of an address
    Utxos {
        address: String,
    },

    /// Show recommended fees
    Fees {
        /// Transaction size in bytes
        #[arg(short, long, default_value = "250")]
        size: u64,
    },

    /// Broadcast a raw transaction
    Broadcast {
        /// Raw transaction hex
        raw_hex: String,
    },

    /// Convert between satoshi and bitcoin
    Convert {
        amount: String,

        /// Unit the amount is given in
        #[arg(short, long, value_enum, default_value = "satoshi")]
        from: Denomination,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum HashArg {
    Sha256,
    DoubleSha256,
}

impl From<HashArg> for HashFunction {
    fn from(arg: HashArg) -> Self {
        match arg {
            HashArg::Sha256 => HashFunction::Sha256,
            HashArg::DoubleSha256 => HashFunction::DoubleSha256,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Offline commands don't need an explorer
    match &cli.command {
        Commands::Prove {
            files,
            output,
            tx,
            private_key,
        } => {
            cli::cmd_prove(files, output, tx.as_deref(), private_key.as_deref())?;
            return Ok(());
        }
        Commands::Hash { file } => {
            cli::cmd_hash(file)?;
            return Ok(());
        }
        Commands::Convert { amount, from } => {
            cli::cmd_convert(amount, *from)?;
            return Ok(());
        }
        _ => {}
    }

    let mut config = ExplorerConfig::new(cli.provider, cli.network)
        .with_timeout(Duration::from_secs(cli.timeout))
        .with_fee_url(cli.fee_url.clone());
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url.clone());
    }

    let adapter = explorer::connect(&config)?;
    run_explorer_command(&cli.command, adapter)
}

fn run_explorer_command(
    command: &Commands,
    adapter: Arc<dyn ExplorerAdapter>,
) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        match command {
            Commands::Verify {
                proof,
                artifact,
                public_key,
                hash,
            } => {
                let config = VerifierConfig {
                    hash_function: (*hash).into(),
                };
                cli::cmd_verify(
                    adapter,
                    config,
                    proof,
                    artifact.as_deref(),
                    public_key.as_deref(),
                )
                .await?;
            }

            Commands::Tx { txid } => cli::cmd_tx(adapter, txid).await?,

            Commands::Utxos { address } => cli::cmd_utxos(adapter, address).await?,

            Commands::Fees { size } => cli::cmd_fees(adapter, *size).await?,

            Commands::Broadcast { raw_hex } => cli::cmd_broadcast(adapter, raw_hex).await?,

            Commands::Prove { .. } | Commands::Hash { .. } | Commands::Convert { .. } => {
                unreachable!()
            }
        }

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(())
}
