use std::io::Read;
use std::path::Path;

use clap::Parser;
use dlpgate::cli::{Cli, Commands};
use dlpgate::dlp::scanner;
use dlpgate::dlp::TracingObserver;
use dlpgate::policy::config::{AppConfig, DEFAULT_TEMPLATE};
use dlpgate::proxy::ProxyServer;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start => {
            cmd_start(&cli.config).await?;
        }
        Commands::Scan { file, json } => {
            let clean = cmd_scan(&cli.config, file.as_deref(), json)?;
            if !clean {
                std::process::exit(1);
            }
        }
        Commands::Rules => {
            cmd_rules(&cli.config)?;
        }
        Commands::Init => {
            cmd_init(&cli.config)?;
        }
    }

    Ok(())
}

/// Load the config file, or the bundled template if it does not exist.
fn load_or_bundled(config_path: &Path) -> anyhow::Result<AppConfig> {
    if config_path.exists() {
        Ok(AppConfig::load_from_path(config_path)?)
    } else {
        warn!(
            "{} not found, using the bundled default configuration",
            config_path.display()
        );
        Ok(AppConfig::bundled()?)
    }
}

async fn cmd_start(config_path: &Path) -> anyhow::Result<()> {
    let config = AppConfig::load_from_path(config_path)?;
    println!("dlpgate starting...");
    println!("Config: {}", config_path.display());
    println!("Listen: {}", config.proxy.listen);
    println!("Deny list entries: {}", config.policy.deny_list.len());
    println!("Rules loaded: {}", config.rules.len());

    let server = ProxyServer::from_config(&config)?;
    let addr = server.start().await?;
    println!("Proxy running on {}", addr);
    println!("Browse to http://{}/<target-url> to route traffic through dlpgate", addr);

    tokio::signal::ctrl_c().await?;
    println!("\nShutting down...");
    Ok(())
}

fn cmd_scan(config_path: &Path, file: Option<&Path>, json: bool) -> anyhow::Result<bool> {
    let config = load_or_bundled(config_path)?;
    let rules = config.compile_rules()?;

    let text = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let result = scanner::scan(&text, &rules, &TracingObserver);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.clean {
        println!("Clean: no rule matched.");
    } else {
        println!("Policy violation ({} rule(s) matched)", result.hits.len());
        for hit in &result.hits {
            println!("{}", "─".repeat(60));
            println!("Pattern: {}", hit.rule_id);
            for m in &hit.matches {
                println!("  [{}..{}] {}", m.start, m.end, m.matched_text);
            }
            println!("{}", hit.highlight);
        }
    }
    Ok(result.clean)
}

fn cmd_rules(config_path: &Path) -> anyhow::Result<()> {
    let config = load_or_bundled(config_path)?;
    let rules = config.compile_rules()?;

    println!("Current Policy ({})", config_path.display());
    println!("═══════════════════════════════════════");
    println!("Undecodable POST bodies: {:?}", config.policy.undecodable_post);
    println!("Deny list ({}):", config.policy.deny_list.len());
    for entry in &config.policy.deny_list {
        println!("  {}", entry);
    }
    println!("Rules ({}):", rules.len());
    for rule in rules.iter() {
        let case = if rule.case_sensitive() {
            "case-sensitive"
        } else {
            "case-insensitive"
        };
        println!("  [{}] {} ({})", rule.id(), rule.pattern(), case);
    }
    Ok(())
}

fn cmd_init(config_path: &Path) -> anyhow::Result<()> {
    if config_path.exists() {
        println!("Config already exists: {}", config_path.display());
        return Ok(());
    }
    std::fs::write(config_path, DEFAULT_TEMPLATE)?;
    println!("Created config: {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Edit the deny list and rules in {}", config_path.display());
    println!("  2. Start the proxy: dlpgate start");
    Ok(())
}
