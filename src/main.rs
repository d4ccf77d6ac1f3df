//! Picochain CLI
//!
//! Drives an in-process node: generate keys, mine blocks, transfer value.

use clap::{Parser, Subcommand};
use picochain::node::{Node, NodeConfig};
use picochain::wallet::Wallet;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "picochain")]
#[command(version = "0.1.0")]
#[command(about = "A single-node proof-of-work UTXO ledger", long_about = None)]
struct Cli {
    /// Upper bound on a single proof-of-work search, in seconds
    #[arg(long, default_value = "600")]
    mining_timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a fresh key pair and print it
    Keygen,

    /// Mine blocks crediting the given address
    Mine {
        /// Reward address (hex public key)
        #[arg(short, long)]
        address: String,

        /// Number of blocks to mine
        #[arg(short, long, default_value = "1")]
        count: u32,
    },

    /// Mine, transfer between two fresh wallets, and print balances
    Demo,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let node = Node::new(NodeConfig {
        mining_timeout: Duration::from_secs(cli.mining_timeout),
    });

    match cli.command {
        Commands::Keygen => {
            let wallet = Wallet::new();
            println!("address:     {}", wallet.address());
            println!("private key: {}", wallet.private_key());
        }

        Commands::Mine { address, count } => {
            for _ in 0..count {
                let block = node.mine_next(&address).await?;
                println!(
                    "mined block {} (nonce {}, difficulty {}): {}",
                    block.index, block.nonce, block.difficulty, block.hash
                );
            }
            println!("balance of {}: {}", address, node.balance_of(&address).await);
        }

        Commands::Demo => {
            let alice = Wallet::new();
            let bob = Wallet::new();
            println!("alice: {}", alice.address());
            println!("bob:   {}", bob.address());

            node.mine_next(&alice.address()).await?;
            println!("alice mined a block, balance {}", node.balance_of(&alice.address()).await);

            let tx = node
                .submit_transaction(&bob.address(), 30, &alice.private_key())
                .await?;
            println!("alice -> bob 30, transaction {}", tx.id);

            node.mine_next(&alice.address()).await?;
            println!(
                "after next block: alice {}, bob {}",
                node.balance_of(&alice.address()).await,
                node.balance_of(&bob.address()).await
            );

            let chain = node.chain().await;
            println!("chain height {}, tip {}", chain.len() - 1, chain.last().map(|b| b.hash.as_str()).unwrap_or(""));
        }
    }

    Ok(())
}
