// src/cli.rs
//
// Command-line definition, shared by the binary and build.rs (man page).

use clap::{Args, Parser, Subcommand};

pub const DEFAULT_DB_PATH: &str = "/var/lib/rpmsolve/installed.db";

#[derive(Parser)]
#[command(name = "rpmsolve")]
#[command(author, version, about = "RPM dependency checking and transaction ordering", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare two [epoch:]version[-release] strings
    Vercmp {
        /// First EVR
        a: String,
        /// Second EVR
        b: String,
    },
    /// Check the dependencies of a transaction
    Check(TransactionArgs),
    /// Print the install/erase order of a transaction
    Order {
        #[command(flatten)]
        transaction: TransactionArgs,
        /// Print the order as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the installed-package database
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

/// Packages and collaborators making up a transaction
#[derive(Args)]
pub struct TransactionArgs {
    /// Packages to install (.rpm files, or .json metadata records)
    pub packages: Vec<String>,
    /// Installed package to erase, by name
    #[arg(short, long, value_name = "NAME")]
    pub erase: Vec<String>,
    /// Installed-package database
    #[arg(short, long, value_name = "PATH")]
    pub db: Option<String>,
    /// Repository directory or primary.xml[.gz|.zst] for suggestions
    #[arg(short, long, value_name = "PATH")]
    pub repo: Option<String>,
    /// Add packages from the repository to satisfy missing dependencies
    #[arg(long, requires = "repo")]
    pub solve: bool,
    /// Erase installed packages replaced or obsoleted by added ones
    #[arg(short = 'U', long)]
    pub upgrade: bool,
    /// JSON transaction configuration
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<String>,
    /// Transaction color (overrides the configuration)
    #[arg(long)]
    pub color: Option<u32>,
    /// Skip Conflicts checking
    #[arg(long)]
    pub no_conflicts: bool,
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Create the database
    Init {
        /// Database path
        #[arg(short, long, default_value = DEFAULT_DB_PATH)]
        db_path: String,
    },
    /// Record a package as installed
    Register {
        /// Package file (.rpm, or a .json metadata record)
        package: String,
        /// Database path
        #[arg(short, long, default_value = DEFAULT_DB_PATH)]
        db_path: String,
    },
    /// List installed packages
    List {
        /// Database path
        #[arg(short, long, default_value = DEFAULT_DB_PATH)]
        db_path: String,
    },
}
