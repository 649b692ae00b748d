//! Demo driver: run one tree-based group key exchange and print the
//! message accounting and derived symmetric key.

use clap::Parser;
use num_bigint::BigUint;
use rand::rngs::OsRng;
use tracing_subscriber::EnvFilter;

use tree_dh::{naive_pairwise_count, DomainParameters, GroupExchange};

#[derive(Parser, Debug)]
#[command(
    about = "Run a tree-based N-party Diffie-Hellman key exchange",
    author,
    version
)]
struct Args {
    /// Number of participants (minimum 3); participant 0 coordinates
    #[arg(long, default_value_t = 5)]
    parties: usize,

    /// Use a small demonstration prime instead of the 2048-bit RFC 3526
    /// group (fast, insecure)
    #[arg(long)]
    insecure: bool,

    /// Run each participant on its own thread instead of sequentially
    #[arg(long)]
    threaded: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let params = if args.insecure {
        // 2^61 - 1, prime, good enough to exercise the protocol quickly.
        DomainParameters::new_insecure(
            BigUint::from(2305843009213693951u64),
            BigUint::from(5u32),
        )?
    } else {
        DomainParameters::rfc3526_group14()
    };

    let n = args.parties;
    let (total, broadcasts, directed, key_hex) = if args.threaded {
        let outcome = tree_dh::run_threaded(&params, n)?;
        (
            outcome.tally.total(),
            outcome.tally.broadcasts(),
            outcome.tally.directed(),
            outcome.symmetric_key.to_hex(),
        )
    } else {
        let outcome = GroupExchange::new(params, n)?.run(&mut OsRng)?;
        (
            outcome.tally.total(),
            outcome.tally.broadcasts(),
            outcome.tally.directed(),
            outcome.symmetric_key.to_hex(),
        )
    };

    println!("parties:            {n}");
    println!("messages:           {total} ({broadcasts} broadcast + {directed} directed)");
    println!("naive pairwise:     {} messages", naive_pairwise_count(n));
    println!("symmetric key:      {key_hex}");
    Ok(())
}
