//! Devnet Wallet CLI
//!
//! Mnemonic generator and SPL token tools for Solana test networks.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use devnet_wallet::services::{ensure_test_cluster, request_airdrop, TransferSettings};
use devnet_wallet::types::lamports_to_sol;
use devnet_wallet::{
    Cluster, Config, ConfiguredWallet, GeneratorSession, RpcClient, SolanaRpc, TokenLister,
    TransferError, TransferForm, TransferRequest, WalletAdapter,
};
use rust_decimal::Decimal;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "devnet-wallet")]
#[command(about = "HD wallet generator and SPL token tools for Solana test networks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// RPC endpoint or cluster moniker (devnet, testnet, localhost)
    #[arg(short, long, global = true)]
    url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new mnemonic and derive wallets from it
    Mnemonic {
        /// Number of wallets to derive
        #[arg(short, long, default_value = "1")]
        count: u32,
    },

    /// Derive wallets from an existing mnemonic
    Derive {
        /// Mnemonic phrase, quoted
        #[arg(short, long)]
        phrase: String,

        /// Number of wallets to derive
        #[arg(short, long, default_value = "1")]
        count: u32,
    },

    /// Show the connected wallet address and SOL balance
    Address,

    /// Request test SOL for the connected wallet
    Airdrop {
        /// Amount of SOL
        #[arg(short, long, default_value = "1")]
        sol: Decimal,
    },

    /// List SPL token balances of the connected wallet
    Tokens,

    /// Transfer SPL tokens from the connected wallet
    Transfer {
        /// Recipient wallet address
        #[arg(long)]
        to: String,

        /// Token mint address
        #[arg(long)]
        mint: String,

        /// Amount in whole tokens, e.g. 1.5
        #[arg(long)]
        amount: String,
    },

    /// Interactive session with the generator and token tools
    Shell,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let mut config = Config::from_env()?;
    if let Some(url) = &cli.url {
        config.rpc_url = Cluster::url_for(url);
    }

    match cli.command {
        Commands::Mnemonic { count } => generate_mnemonic(&config, count)?,
        Commands::Derive { phrase, count } => derive_wallets(&config, &phrase, count)?,
        Commands::Address => show_address(&config).await?,
        Commands::Airdrop { sol } => airdrop(&config, sol).await?,
        Commands::Tokens => list_tokens(&config).await?,
        Commands::Transfer { to, mint, amount } => {
            transfer(&config, TransferRequest::new(to, mint, amount)).await?
        }
        Commands::Shell => run_shell(&config).await?,
    }

    Ok(())
}

fn print_header(title: &str) {
    println!("\n{}", "=".repeat(70));
    println!("  {}", title.bold());
    println!("{}\n", "=".repeat(70));
}

fn generate_mnemonic(config: &Config, count: u32) -> Result<()> {
    print_header("MNEMONIC GENERATOR");

    let mut session = GeneratorSession::with_path_template(&config.derivation_path)?;
    let mnemonic = session.generate()?.to_string();
    println!("Mnemonic: {}", mnemonic.yellow());
    println!("{}\n", "Test networks only. Anyone with this phrase controls the wallets.".dimmed());

    for _ in 0..count {
        session.derive_next()?;
    }
    print_wallets(&session);

    Ok(())
}

fn derive_wallets(config: &Config, phrase: &str, count: u32) -> Result<()> {
    print_header("HD WALLET DERIVATION");

    let mut session = GeneratorSession::with_path_template(&config.derivation_path)?;
    session.import(phrase)?;
    for _ in 0..count {
        session.derive_next()?;
    }
    print_wallets(&session);

    Ok(())
}

fn print_wallets(session: &GeneratorSession) {
    println!("Path: {}\n", session.path_template());
    for line in session.render() {
        println!("  {}", line);
    }
}

async fn connect_wallet(config: &Config) -> Result<ConfiguredWallet> {
    let mut wallet = ConfiguredWallet::from_config(config);
    wallet
        .connect()
        .await
        .with_context(|| format!("Failed to connect {} wallet", wallet.name()))?;
    Ok(wallet)
}

fn rpc_client(config: &Config) -> Result<RpcClient> {
    debug!("Using RPC endpoint {}", config.rpc_url);
    RpcClient::new(config.rpc_url.clone(), config.rpc_settings()).context("Failed to build RPC client")
}

async fn show_address(config: &Config) -> Result<()> {
    let wallet = connect_wallet(config).await?;
    let rpc = rpc_client(config)?;
    print_address(&wallet, &rpc).await
}

async fn print_address(wallet: &dyn WalletAdapter, rpc: &dyn SolanaRpc) -> Result<()> {
    let owner = wallet.public_key().context("Wallet not connected")?;
    let lamports = rpc.get_balance(&owner).await?;

    println!("Wallet:  {} ({})", owner.to_string().cyan(), wallet.name());
    println!("Balance: {} SOL", lamports_to_sol(lamports).normalize());
    Ok(())
}

async fn airdrop(config: &Config, sol: Decimal) -> Result<()> {
    let wallet = connect_wallet(config).await?;
    let rpc = rpc_client(config)?;
    run_airdrop(config, &wallet, &rpc, sol).await
}

async fn run_airdrop(
    config: &Config,
    wallet: &dyn WalletAdapter,
    rpc: &dyn SolanaRpc,
    sol: Decimal,
) -> Result<()> {
    ensure_test_cluster(config)?;

    let receipt = request_airdrop(wallet, rpc, sol, config.commitment).await?;
    println!("{} {}", "Airdrop confirmed:".green(), receipt.signature);
    println!(
        "Balance: {} SOL",
        lamports_to_sol(receipt.balance_lamports).normalize()
    );
    Ok(())
}

async fn list_tokens(config: &Config) -> Result<()> {
    let wallet = connect_wallet(config).await?;
    let rpc = rpc_client(config)?;
    let mut lister = TokenLister::new();
    print_tokens(&mut lister, &wallet, &rpc).await;
    Ok(())
}

async fn print_tokens(lister: &mut TokenLister, wallet: &dyn WalletAdapter, rpc: &dyn SolanaRpc) {
    let owner = wallet.public_key();
    if !lister.account_changed(owner, rpc).await {
        lister.refresh(owner, rpc).await;
    }

    println!("Your Tokens");
    let lines = lister.render();
    if lines.is_empty() {
        println!("  {}", "No token accounts found.".dimmed());
    }
    for line in lines {
        println!("  {}", line);
    }
}

async fn transfer(config: &Config, request: TransferRequest) -> Result<()> {
    let wallet = connect_wallet(config).await?;
    let rpc = rpc_client(config)?;
    let mut form = TransferForm::new(TransferSettings::from_config(config));
    run_transfer(&mut form, &wallet, &rpc, &request).await?;
    Ok(())
}

async fn run_transfer(
    form: &mut TransferForm,
    wallet: &dyn WalletAdapter,
    rpc: &dyn SolanaRpc,
    request: &TransferRequest,
) -> Result<(), TransferError> {
    let receipt = form.submit(wallet, rpc, request).await?;

    println!("{}", form.status().unwrap_or("Transfer successful!").green());
    println!("  Signature: {}", receipt.signature);
    println!("  Amount:    {} base units ({} decimals)", receipt.amount_base_units, receipt.decimals);
    if receipt.created_recipient_account {
        println!("  Created recipient token account");
    }
    Ok(())
}

const SHELL_HELP: &str = "\
Commands:
  generate                        Generate a new mnemonic
  import <phrase>                 Use an existing mnemonic
  wallet                          Derive the next wallet
  wallets                         List derived wallets
  address                         Show the connected wallet
  airdrop [sol]                   Request test SOL
  tokens                          Refresh the token list
  transfer <to> <mint> <amount>   Send SPL tokens
  help                            Show this help
  quit                            Leave the shell";

async fn run_shell(config: &Config) -> Result<()> {
    print_header("DEVNET WALLET SHELL");

    let wallet = connect_wallet(config).await?;
    let rpc = rpc_client(config)?;
    let mut session = GeneratorSession::with_path_template(&config.derivation_path)?;
    let mut lister = TokenLister::new();
    let mut form = TransferForm::new(TransferSettings::from_config(config));

    println!("Connected {} wallet on {}", wallet.name(), config.rpc_url);
    println!("{}\n", SHELL_HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let args: Vec<&str> = words.collect();

        match command {
            "generate" => match session.generate() {
                Ok(mnemonic) => println!("Mnemonic: {}", mnemonic.yellow()),
                Err(e) => println!("{}", e.to_string().red()),
            },
            "import" => match session.import(&args.join(" ")) {
                Ok(()) => println!("{}", "Mnemonic imported".green()),
                Err(e) => println!("{}", e.to_string().red()),
            },
            "wallet" => match session.derive_next() {
                Ok(w) => println!("Wallet {}: {}", w.index + 1, w.address),
                Err(e) => println!("{}", e.to_string().red()),
            },
            "wallets" => print_wallets(&session),
            "address" => {
                if let Err(e) = print_address(&wallet, &rpc).await {
                    println!("{}", e.to_string().red());
                }
            }
            "airdrop" => {
                let sol = match args.first().map(|s| s.parse::<Decimal>()) {
                    None => Decimal::ONE,
                    Some(Ok(sol)) => sol,
                    Some(Err(e)) => {
                        println!("{}", format!("Invalid amount: {}", e).red());
                        continue;
                    }
                };
                if let Err(e) = run_airdrop(config, &wallet, &rpc, sol).await {
                    println!("{}", e.to_string().red());
                }
            }
            "tokens" => print_tokens(&mut lister, &wallet, &rpc).await,
            "transfer" => {
                let field = |i: usize| args.get(i).copied().unwrap_or_default();
                let request = TransferRequest::new(field(0), field(1), field(2));
                if let Err(e) = run_transfer(&mut form, &wallet, &rpc, &request).await {
                    println!("{}", e.to_string().red());
                }
            }
            "help" => println!("{}", SHELL_HELP),
            "quit" | "exit" => break,
            other => println!("Unknown command '{}'. Type 'help' for commands.", other),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use devnet_wallet::solana::RpcSettings;
    use devnet_wallet::wallet::BurnerWallet;

    fn unreachable_rpc() -> RpcClient {
        RpcClient::new("http://127.0.0.1:9", RpcSettings::default()).unwrap()
    }

    #[tokio::test]
    async fn test_failed_transfer_is_an_error() {
        let wallet = BurnerWallet::from_secret([3u8; 32]);
        let mut form = TransferForm::new(TransferSettings::default());
        let request = TransferRequest::new("", "", "");

        let err = run_transfer(&mut form, &wallet, &unreachable_rpc(), &request)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::MissingFields));
        assert_eq!(form.error(), Some("Please fill all fields"));
    }

    #[tokio::test]
    async fn test_disconnected_transfer_is_an_error() {
        let wallet = BurnerWallet::new();
        let mut form = TransferForm::new(TransferSettings::default());
        let request = TransferRequest::new("recipient", "mint", "1");

        let err = run_transfer(&mut form, &wallet, &unreachable_rpc(), &request)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::WalletNotConnected));
    }
}
