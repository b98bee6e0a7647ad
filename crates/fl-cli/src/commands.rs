use anyhow::Context;
use colored::Colorize;
use fl_chaincode::{Chaincode, ChaincodeConfig, OperationKind};
use fl_store::FileKvStore;
use fl_types::RecordKey;
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Ops => cmd_ops(format),
        Command::Config => cmd_config(&load_config(&cli)?),
        Command::Invoke(ref args) => cmd_invoke(&open_chaincode(&cli)?, args, format),
        Command::Read(ref args) => cmd_read(&open_chaincode(&cli)?, args, format),
        Command::Show(ref args) => cmd_show(&open_chaincode(&cli)?, args, format),
        Command::Keys => cmd_keys(&open_chaincode(&cli)?, format),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ChaincodeConfig> {
    match &cli.config {
        Some(path) => ChaincodeConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(ChaincodeConfig::default()),
    }
}

fn open_chaincode(cli: &Cli) -> anyhow::Result<Chaincode<FileKvStore>> {
    let config = load_config(cli)?;
    let store = FileKvStore::open(&cli.store)
        .with_context(|| format!("opening ledger {}", cli.store.display()))?;
    Ok(Chaincode::with_config(store, config))
}

fn cmd_invoke(
    cc: &Chaincode<FileKvStore>,
    args: &InvokeArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let payload = cc
        .invoke(&args.operation, args.args.as_slice())
        .with_context(|| format!("{} failed", args.operation))?;
    match format {
        OutputFormat::Json => {
            let value = payload.as_deref().map(String::from_utf8_lossy);
            println!(
                "{}",
                json!({ "operation": args.operation, "ok": true, "value": value })
            );
        }
        OutputFormat::Text => match payload {
            Some(bytes) => println!("{}", String::from_utf8_lossy(&bytes)),
            None => println!("{} {}", "✓".green().bold(), args.operation.bold()),
        },
    }
    Ok(())
}

fn cmd_read(
    cc: &Chaincode<FileKvStore>,
    args: &ReadArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let bytes = cc
        .query("read", &[args.key.as_str()])
        .with_context(|| format!("reading {}", args.key))?;
    let value = String::from_utf8_lossy(&bytes);
    match format {
        OutputFormat::Json => println!("{}", json!({ "key": args.key, "value": value })),
        OutputFormat::Text => println!("{value}"),
    }
    Ok(())
}

fn cmd_show(
    cc: &Chaincode<FileKvStore>,
    args: &ShowArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let record = cc
        .record(&args.key)
        .with_context(|| format!("decoding {}", args.key))?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&record)?),
        OutputFormat::Text => {
            println!("{} {}", record.kind().to_string().cyan().bold(), args.key.yellow());
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }
    Ok(())
}

fn cmd_keys(cc: &Chaincode<FileKvStore>, format: OutputFormat) -> anyhow::Result<()> {
    let keys = cc.store().keys()?;
    match format {
        OutputFormat::Json => println!("{}", json!(keys)),
        OutputFormat::Text if keys.is_empty() => println!("Ledger is empty."),
        OutputFormat::Text => {
            for key in &keys {
                println!("  {:<12} {}", key_label(key).dimmed(), key);
            }
        }
    }
    Ok(())
}

fn cmd_ops(format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let ops: Vec<_> = OperationKind::ALL
                .iter()
                .map(|k| json!({ "name": k.name(), "params": k.params() }))
                .collect();
            println!("{}", json!(ops));
        }
        OutputFormat::Text => {
            for kind in OperationKind::ALL {
                println!("  {:<24} {}", kind.name().bold(), kind.params().join(" "));
            }
        }
    }
    Ok(())
}

fn cmd_config(config: &ChaincodeConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}

/// Short label for the namespace a key belongs to.
fn key_label(key: &str) -> &'static str {
    match RecordKey::parse(key) {
        Some(RecordKey::User { .. }) => "user",
        Some(RecordKey::Project { .. }) => "project",
        Some(RecordKey::ProjectLike { .. }) => "like",
        Some(RecordKey::ProjectUpdate { .. }) => "update",
        Some(RecordKey::UpdateSequence { .. }) => "counter",
        None => "value",
    }
}
