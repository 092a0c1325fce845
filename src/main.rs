//! lumenvault - Wallet session and transaction client for a vault lending
//! marketplace on Stellar.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use lumenvault::sdp::{disburse_all, HttpRelay, DEFAULT_RELAY_URL};
use lumenvault::vault::{InitVaultParams, VaultOps};
use lumenvault::{
    FreighterBridge, HorizonClient, SessionSnapshot, SigningAgent, TxError, WalletSession,
};

/// lumenvault: vault marketplace wallet client
#[derive(Parser)]
#[command(name = "lumenvault")]
#[command(about = "Wallet session and transaction client for vault lending", long_about = None)]
struct Cli {
    /// Signing agent bridge URL
    #[arg(long, default_value = lumenvault::agent::freighter::DEFAULT_BRIDGE_URL, global = true)]
    bridge_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the signing agent and show session state
    Status,

    /// Connect to the signing agent and print the session
    Connect,

    /// Deposit into a vault contract as the connected account
    Deposit {
        /// Vault contract id (C...)
        #[arg(value_name = "CONTRACT")]
        contract: String,

        /// Amount in whole units (e.g. 25 or 12.5)
        #[arg(value_name = "AMOUNT")]
        amount: String,
    },

    /// Initialize a vault contract as the connected admin
    InitVault {
        /// Vault contract id (C...)
        #[arg(value_name = "CONTRACT")]
        contract: String,

        /// Borrower account address
        #[arg(long)]
        borrower: String,

        /// Loan token contract address
        #[arg(long)]
        token: String,

        /// Vault share token contract address
        #[arg(long)]
        share_token: String,

        /// Funding cap
        #[arg(long)]
        cap: String,

        /// Funding duration in seconds
        #[arg(long)]
        funding_duration: String,

        /// Comma-separated installment dates (unix timestamps)
        #[arg(long)]
        installment_dates: String,

        /// Comma-separated installment amounts
        #[arg(long)]
        installment_amounts: String,
    },

    /// Fan out a disbursement to recipients through the relay
    Disburse {
        /// Recipient addresses
        #[arg(long, value_delimiter = ',', required = true)]
        recipients: Vec<String>,

        /// Amount per recipient
        #[arg(long)]
        amount: String,

        /// Relay endpoint
        #[arg(long, default_value = DEFAULT_RELAY_URL)]
        relay_url: String,
    },
}

fn print_session(snapshot: &SessionSnapshot) {
    println!("status:  {}", snapshot.status);
    println!("address: {}", snapshot.address.as_deref().unwrap_or("-"));
    println!("network: {}", snapshot.network);
    println!("balance: {}", snapshot.balance);
    if let Some(error) = &snapshot.last_error {
        println!("error:   {}", error);
    }
}

fn print_tx_error(err: &TxError) -> ! {
    eprintln!("Failed during {}: {}", err.stage, err.error);
    std::process::exit(1);
}

async fn connect_session(agent: Arc<dyn SigningAgent>) -> WalletSession {
    let session = WalletSession::new(agent);
    if let Err(err) = session.connect().await {
        eprintln!("Connection failed: {}", err);
        std::process::exit(1);
    }
    session
}

#[tokio::main]
async fn main() {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let cli = Cli::parse();
    let agent: Arc<dyn SigningAgent> = Arc::new(FreighterBridge::new(&cli.bridge_url));

    match cli.command {
        Commands::Status => {
            let detected = agent.detect().await;
            println!("agent:   {}", if detected { "detected" } else { "not detected" });

            let session = WalletSession::new(agent);
            session.check_connection().await;
            print_session(&session.snapshot().await);
        }

        Commands::Connect => {
            let session = connect_session(agent).await;
            session.refresh_balance().await.ok();
            print_session(&session.snapshot().await);
        }

        Commands::Deposit { contract, amount } => {
            let session = connect_session(agent.clone()).await;
            let horizon = HorizonClient::for_network(session.snapshot().await.network);
            let ops = VaultOps::new(session, agent, horizon);

            info!(contract = %contract, amount = %amount, "submitting deposit");
            match ops.deposit(&contract, &amount).await {
                Ok(outcome) => println!("Deposit accepted: {}", outcome.hash),
                Err(err) => print_tx_error(&err),
            }
        }

        Commands::InitVault {
            contract,
            borrower,
            token,
            share_token,
            cap,
            funding_duration,
            installment_dates,
            installment_amounts,
        } => {
            let session = connect_session(agent.clone()).await;
            let horizon = HorizonClient::for_network(session.snapshot().await.network);
            let ops = VaultOps::new(session, agent, horizon);

            let params = InitVaultParams {
                borrower,
                token,
                share_token,
                cap,
                funding_duration_secs: funding_duration,
                installment_dates: InitVaultParams::split_csv(&installment_dates),
                installment_amounts: InitVaultParams::split_csv(&installment_amounts),
            };

            info!(contract = %contract, "initializing vault");
            match ops.initialize_vault(&contract, &params).await {
                Ok(outcome) => println!("Vault initialized: {}", outcome.hash),
                Err(err) => print_tx_error(&err),
            }
        }

        Commands::Disburse {
            recipients,
            amount,
            relay_url,
        } => {
            let relay = HttpRelay::new(&relay_url);
            let report = disburse_all(&relay, &recipients, &amount).await;

            for payout in &report.results {
                match &payout.result {
                    Ok(hash) => println!("{}  ok    {}", payout.destination, hash),
                    Err(err) => println!("{}  FAIL  {}", payout.destination, err),
                }
            }
            println!("{}", report.summary());
        }
    }
}
