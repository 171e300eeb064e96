//! Builds a tree from a descending run of keys, printing it after every
//! insertion, then removes one key and prints the result.

use anyhow::{bail, Result};
use clap::Parser;
use log::{info, warn, LevelFilter};
use rbtree::RedBlackTree;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

/// Inserts a run of keys into a red-black tree and prints it as it grows.
#[derive(clap::Parser)]
#[command(version, about)]
struct Args {
    /// First (largest) key to insert
    #[arg(long, default_value_t = 20)]
    from: i64,
    /// Last (smallest) key to insert, inclusive
    #[arg(long, default_value_t = 2)]
    to: i64,
    /// Key removed once all keys are inserted
    #[arg(long, default_value_t = 10)]
    remove: i64,
    /// Verbosity of the log written to the terminal
    #[arg(long, default_value_t = LevelFilter::Warn)]
    log_level: LevelFilter,
    /// Only print the final tree
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    TermLogger::init(
        args.log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    if args.from < args.to {
        bail!("--from ({}) must not be smaller than --to ({})", args.from, args.to);
    }

    let mut tree = RedBlackTree::new();
    for key in (args.to..=args.from).rev() {
        tree.insert(key);
        if !args.quiet {
            println!("{tree}");
            println!(" === ");
        }
    }
    info!("inserted {} keys", tree.len());

    match tree.remove(&args.remove) {
        Ok(key) => info!("removed {key}"),
        Err(err) => warn!("could not remove {}: {err}", args.remove),
    }
    println!("{tree}");

    if !tree.is_valid() {
        warn!("the tree no longer satisfies the red-black properties after removal");
    }

    Ok(())
}
