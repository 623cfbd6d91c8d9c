// packet - CLI driver for the red-packet ledger
// Loads state from a sled store, applies one operation, saves state and log

use chrono::DateTime;
use clap::{Parser, Subcommand};
use redpacket::indexer::PacketIndex;
use redpacket::ledger::{AccountId, ClaimOutcome, LedgerConfig, PacketId, PacketLedger};
use redpacket::storage::PacketStore;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "packet", about = "Red-packet ledger CLI", version)]
struct Cli {
    /// Directory for the sled database
    #[arg(long, default_value = "./packet-data")]
    data_dir: PathBuf,

    /// Minimum meaningful share, in smallest currency units
    #[arg(long, default_value_t = 1)]
    min_share: u64,

    /// Seconds before the owner may reclaim undistributed funds
    #[arg(long, default_value_t = 86_400)]
    lock_window_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a packet, locking a deposit for up to `count` claimants
    Create {
        #[arg(long)]
        owner: String,
        #[arg(long, default_value = "")]
        message: String,
        #[arg(long)]
        count: u32,
        /// Equal shares instead of randomized ones
        #[arg(long)]
        even: bool,
        #[arg(long)]
        deposit: u64,
    },
    /// Claim a share from a packet
    Claim {
        packet_id: u64,
        #[arg(long)]
        account: String,
    },
    /// Reclaim the undistributed remainder after the lock window
    Withdraw {
        packet_id: u64,
        #[arg(long)]
        account: String,
    },
    /// Show the live state of a packet
    Show { packet_id: u64 },
    /// List packets from the read model, newest first
    List {
        #[arg(long, default_value_t = 0)]
        page: usize,
    },
    /// Print the event log
    Events {
        #[arg(long, default_value_t = 0)]
        since: u64,
    },
}

fn format_time(unix: u64) -> String {
    DateTime::from_timestamp(unix as i64, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| unix.to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let config = LedgerConfig::default()
        .with_min_share(cli.min_share)
        .with_lock_window_secs(cli.lock_window_secs);

    let store = PacketStore::open(&cli.data_dir)?;
    let ledger = PacketLedger::new(config);
    if let Some(state) = store.load_state()? {
        ledger.import_state(state);
    }
    ledger.events().restore(store.load_events()?);

    let mut mutated = false;
    match cli.command {
        Command::Create {
            owner,
            message,
            count,
            even,
            deposit,
        } => {
            let id = ledger.create(AccountId::new(owner), message, count, even, deposit)?;
            mutated = true;
            println!("created packet {id}");
        }
        Command::Claim { packet_id, account } => {
            let outcome = ledger.claim(PacketId::new(packet_id), AccountId::new(account))?;
            mutated = true;
            match outcome {
                ClaimOutcome::Claimed(amount) => println!("claimed {amount}"),
                ClaimOutcome::AlreadyClaimed => println!("already claimed"),
            }
        }
        Command::Withdraw { packet_id, account } => {
            let amount = ledger.withdraw(PacketId::new(packet_id), AccountId::new(account))?;
            mutated = true;
            println!("withdrew {amount}");
        }
        Command::Show { packet_id } => {
            let snapshot = ledger.get_packet(PacketId::new(packet_id))?;
            println!(
                "packet {} [{:?}] owner={} message={:?}",
                snapshot.id, snapshot.state, snapshot.owner, snapshot.message
            );
            println!(
                "  total={} balance={} claimed {}/{} mode={} created={}",
                snapshot.total_amount,
                snapshot.balance,
                snapshot.claimed_count,
                snapshot.total_count,
                if snapshot.is_even { "even" } else { "random" },
                format_time(snapshot.creation_time),
            );
            for claim in ledger.claims(PacketId::new(packet_id))? {
                println!(
                    "  claim {} -> {} at {}",
                    claim.claimer(),
                    claim.amount(),
                    format_time(claim.timestamp()),
                );
            }
        }
        Command::List { page } => {
            let mut index = PacketIndex::new();
            let events = ledger.events().entries();
            index.apply_all(&events);
            for packet in index.recent(page) {
                println!(
                    "packet {} owner={} total={} claimed {}/{} created={}{}",
                    packet.packet_id,
                    packet.owner,
                    packet.total_amount,
                    packet.claimed_count,
                    packet.total_count,
                    format_time(packet.creation_time),
                    if packet.withdrawn { " (withdrawn)" } else { "" },
                );
            }
        }
        Command::Events { since } => {
            for envelope in ledger.events().since(since) {
                println!(
                    "{:>6}  {}  {:?}",
                    envelope.sequence(),
                    format_time(envelope.timestamp()),
                    envelope.event(),
                );
            }
        }
    }

    if mutated {
        store.save_state(&ledger.export_state())?;
        store.save_events(&ledger.events().entries())?;
        store.flush()?;
    }
    Ok(())
}
