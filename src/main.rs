//! ContentGate CLI - content verification RPC server and tools

use anyhow::Context;
use clap::Parser;
use contentgate::config::{
    CliArgs, Commands, DatabaseLocation, HandlerConfig, LogFormat, ModuleConfig, ServerConfig,
};
use contentgate::hash::hash_file;
use contentgate::rpc::{init_module, ApiServer};
use contentgate::storage::{AuditStore, ProvisionMode};
use std::io::Read;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = CliArgs::parse();

    init_logging(&args);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(args: &CliArgs) {
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    // RUST_LOG wins over -v/-q
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match args.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn run(args: CliArgs) -> anyhow::Result<()> {
    match &args.command {
        Commands::Serve { port, bind, max_body_size, .. } => {
            let server_config = ServerConfig {
                bind: bind.clone(),
                port: *port,
                max_body_size: *max_body_size,
            };
            cmd_serve(&ModuleConfig::from_cli(&args), server_config)
        }
        Commands::Invoke { payload, rpc_id } => {
            cmd_invoke(&ModuleConfig::from_cli(&args), rpc_id, payload.as_deref())
        }
        Commands::Provision { .. } => cmd_provision(&ModuleConfig::from_cli(&args)),
        Commands::History { limit, kind, version, json } => cmd_history(
            &args.database,
            *limit,
            kind.as_deref(),
            version.as_deref(),
            *json,
        ),
        Commands::Digest { file } => cmd_digest(file),
        Commands::List { kind } => cmd_list(&HandlerConfig::with_base_dir(&args.data_dir), kind),
    }
}

fn cmd_serve(module_config: &ModuleConfig, server_config: ServerConfig) -> anyhow::Result<()> {
    let module = init_module(module_config).context("module initialization failed")?;

    let server = ApiServer::new(server_config, module.into());
    server.run()?;

    Ok(())
}

fn cmd_invoke(module_config: &ModuleConfig, rpc_id: &str, payload: Option<&str>) -> anyhow::Result<()> {
    let payload = match payload {
        Some(p) => p.to_string(),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read payload from stdin")?;
            if buf.trim().is_empty() {
                "{}".to_string()
            } else {
                buf
            }
        }
    };

    let module = init_module(module_config).context("module initialization failed")?;
    let response = module.registry.invoke(rpc_id, &payload)?;

    println!("{}", response);
    Ok(())
}

fn cmd_provision(module_config: &ModuleConfig) -> anyhow::Result<()> {
    let path = match &module_config.database {
        DatabaseLocation::File(path) => path.clone(),
        DatabaseLocation::Memory => {
            anyhow::bail!("provisioning an in-memory database has no lasting effect")
        }
    };

    let store = AuditStore::open(&path)
        .with_context(|| format!("failed to open audit database {}", path.display()))?;
    store.provision(module_config.provision)?;

    println!("Table 'files' ready in {} ({} records)", path.display(), store.count()?);
    Ok(())
}

fn cmd_history(
    database: &Path,
    limit: usize,
    kind: Option<&str>,
    version: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let store = AuditStore::open(database)
        .with_context(|| format!("failed to open audit database {}", database.display()))?;
    store.provision(ProvisionMode::Preserve)?;

    let summaries: Vec<_> = store
        .recent_for(kind, version, limit)?
        .iter()
        .map(|r| r.summary())
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No audit records.");
        return Ok(());
    }

    println!("{:>6}  {:<12} {:<10} {:<16} {:>10}  {}", "ID", "TYPE", "VERSION", "HASH", "SIZE", "CREATED");
    for s in &summaries {
        println!(
            "{:>6}  {:<12} {:<10} {:<16} {:>10}  {}",
            s.id,
            s.kind,
            s.version,
            &s.hash[..s.hash.len().min(16)],
            s.size,
            s.created_at.to_rfc3339(),
        );
    }

    Ok(())
}

fn cmd_digest(file: &Path) -> anyhow::Result<()> {
    let result = hash_file(file)?;
    println!("{}  {} ({} bytes)", result.hash, file.display(), result.size);
    Ok(())
}

fn cmd_list(handler_config: &HandlerConfig, kind: &str) -> anyhow::Result<()> {
    let versions = handler_config.library().list_versions(kind)?;

    if versions.is_empty() {
        println!("No versions of '{}' under {}", kind, handler_config.base_dir.display());
        return Ok(());
    }

    for version in versions {
        println!("{}/{}", kind, version);
    }
    Ok(())
}
