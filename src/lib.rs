pub mod advisor;
pub mod cli;
pub mod fields;
pub mod header;
pub mod ingest;
pub mod mapping;
pub mod record;
pub mod sheet;
pub mod store;
pub mod table;
pub mod validate;

use std::{env, fs, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    advisor::MappingAdvisor,
    cli::{Cli, Commands, IngestArgs, ListArgs},
    fields::AliasTable,
    ingest::IngestOptions,
    store::Store,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("loan_intake", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Starting async runtime")?;
    match cli.command {
        Commands::Ingest(args) => runtime.block_on(handle_ingest(&args)),
        Commands::List(args) => runtime.block_on(handle_list(&args)),
    }
}

async fn handle_ingest(args: &IngestArgs) -> Result<()> {
    info!(
        "Ingesting '{}' into '{}'",
        args.input.display(),
        args.database
    );
    let bytes = fs::read(&args.input)
        .with_context(|| format!("Reading input file {:?}", args.input))?;
    let aliases = match &args.aliases {
        Some(path) => AliasTable::load(path)
            .with_context(|| format!("Loading alias table from {path:?}"))?,
        None => AliasTable::default(),
    };
    let advisor =
        MappingAdvisor::from_config(args.classifier_url.clone(), args.classifier_token.clone());
    let store = Store::connect(&args.database).await?;
    let options = IngestOptions {
        minimum_required_fields: args.min_direct_fields,
        sample_rows: args.sample_rows,
        ..IngestOptions::default()
    };
    let name_hint = args.input.file_name().and_then(|name| name.to_str());

    let report =
        ingest::ingest_bytes(&bytes, name_hint, &store, &aliases, &advisor, &options).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} row(s) inserted, {} duplicate(s) skipped, {} failed ({} processed, mapped via {})",
            report.rows_inserted,
            report.duplicates_skipped,
            report.failed_rows,
            report.total_processed,
            report.mapping_source.as_str()
        );
        for failure in &report.failures {
            println!("  failed {}: {}", failure.identifier, failure.reason);
        }
        table::print_loaners(&report.preview);
    }
    Ok(())
}

async fn handle_list(args: &ListArgs) -> Result<()> {
    let store = Store::connect(&args.database).await?;
    let records = store.select_all().await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        table::print_loaners(&records);
    }
    info!("Listed {} loaner record(s)", records.len());
    Ok(())
}
