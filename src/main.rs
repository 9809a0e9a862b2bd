// src/main.rs

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, DbCommands, TransactionArgs};
use rpmsolve::config::TransactionConfig;
use rpmsolve::db::InstalledDb;
use rpmsolve::packages::rpm::RpmPackage;
use rpmsolve::packages::{MemoryHeader, PackageHeader};
use rpmsolve::repository::Repository;
use rpmsolve::transaction::{InstalledPackages, TransactionSet};
use rpmsolve::version::{EpochPolicy, Evr};
use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Read a package header from an .rpm file or a JSON metadata record
fn load_package(path: &str) -> Result<Arc<dyn PackageHeader>> {
    if Path::new(path).extension().is_some_and(|ext| ext == "json") {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path))?;
        let header: MemoryHeader = serde_json::from_str(&content)
            .with_context(|| format!("Invalid package record {}", path))?;
        Ok(Arc::new(header))
    } else {
        Ok(Arc::new(RpmPackage::parse(path)?))
    }
}

/// Build a transaction set from the command-line inputs
fn build_transaction(args: &TransactionArgs) -> Result<TransactionSet> {
    let mut config = match &args.config {
        Some(path) => TransactionConfig::load(path)?,
        None => TransactionConfig::default(),
    };
    if let Some(color) = args.color {
        config.color = color;
    }
    if args.no_conflicts {
        config.check_conflicts = false;
        config.check_installed_conflicts = false;
    }

    let mut ts = TransactionSet::with_config(config);

    let db = match &args.db {
        Some(path) => Some(InstalledDb::open(path)?),
        None => None,
    };

    if !args.erase.is_empty() {
        let db = db
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("--erase needs an installed database (--db)"))?;
        for name in &args.erase {
            let installed = db.packages_named(name)?;
            if installed.is_empty() {
                return Err(anyhow::anyhow!("Package '{}' is not installed", name));
            }
            for package in installed {
                ts.add_erase(package.header, package.offset)?;
            }
        }
    }
    if let Some(db) = db {
        ts.set_installed(Box::new(db));
    }

    if let Some(path) = &args.repo {
        let repo = Arc::new(Repository::load(path)?);
        ts.set_available(repo.index().clone());
        if args.solve {
            ts.set_solve_callback(repo.solver());
        }
    }

    for path in &args.packages {
        let header = load_package(path)?;
        if ts.add_install(header, Some(path.clone()), Vec::new(), args.upgrade)?.is_none() {
            warn!("Skipping {}: a newer version is already in the transaction", path);
        }
    }

    info!("Transaction has {} elements", ts.len());
    Ok(ts)
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Vercmp { a, b }) => {
            let ordering = Evr::parse(&a).compare(&Evr::parse(&b), EpochPolicy::Promote);
            let op = match ordering {
                Ordering::Less => "<",
                Ordering::Equal => "==",
                Ordering::Greater => ">",
            };
            println!("{} {} {}", a, op, b);
            Ok(())
        }
        Some(Commands::Check(args)) => {
            let mut ts = build_transaction(&args)?;
            let problems = ts.check()?;

            for suggestion in ts.suggestions() {
                println!("Suggested: {}", suggestion);
            }
            if problems.is_empty() {
                println!("No dependency problems ({} elements)", ts.len());
                return Ok(());
            }

            println!("Dependency problems:");
            for problem in &problems {
                println!("  {}", problem);
            }
            Err(anyhow::anyhow!("{} dependency problem(s) found", problems.len()))
        }
        Some(Commands::Order { transaction, json }) => {
            let mut ts = build_transaction(&transaction)?;
            let order = ts.order();

            for cycle in ts.ordering_cycles() {
                warn!("{}", cycle);
            }

            if json {
                let entries: Vec<serde_json::Value> = order
                    .iter()
                    .filter_map(|&index| ts.element(index))
                    .map(|te| {
                        serde_json::json!({
                            "nevra": te.nevra(),
                            "kind": te.kind(),
                            "depth": te.graph.depth,
                            "tree": te.graph.tree_id,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for te in ts.ordered_elements() {
                    println!("{:<7} {}", te.kind().as_str(), te.nevra());
                }
            }
            Ok(())
        }
        Some(Commands::Db { command }) => match command {
            DbCommands::Init { db_path } => {
                info!("Initializing installed database at: {}", db_path);
                rpmsolve::db::init(&db_path)?;
                println!("Database initialized successfully at: {}", db_path);
                Ok(())
            }
            DbCommands::Register { package, db_path } => {
                let header = load_package(&package)?;
                let mut db = InstalledDb::open(&db_path)?;
                let offset = db.register(header.as_ref())?;
                println!("Registered {} at offset {}", header.nevra(), offset);
                Ok(())
            }
            DbCommands::List { db_path } => {
                let db = InstalledDb::open(&db_path)?;
                let packages = db.list()?;
                if packages.is_empty() {
                    println!("No packages installed.");
                } else {
                    println!("Installed packages:");
                    for pkg in &packages {
                        let evr = Evr::new(pkg.epoch, pkg.version.clone(), pkg.release.clone());
                        print!("  {}-{}", pkg.name, evr);
                        if let Some(arch) = &pkg.arch {
                            print!(".{}", arch);
                        }
                        println!();
                    }
                    println!("\nTotal: {} package(s)", packages.len());
                }
                Ok(())
            }
        },
        None => {
            // No command provided, show help
            println!("rpmsolve v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'rpmsolve --help' for usage information");
            Ok(())
        }
    }
}
