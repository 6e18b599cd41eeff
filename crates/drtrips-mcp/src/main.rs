use anyhow::Result;
use clap::{Parser, Subcommand};
use drtrips_research_mcp::SERVER_NAME;

mod config;
#[cfg(feature = "stdio")]
mod mcp;

#[derive(Parser, Debug)]
#[command(name = "drtrips-research-mcp")]
#[command(about = "Cited web research over MCP stdio (Perplexity via OpenRouter)", long_about = None)]
struct Cli {
    /// Defaults to `mcp-stdio` so MCP clients can launch the bare binary.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as an MCP stdio server (for Cursor / Claude Desktop / MCP clients).
    #[cfg(feature = "stdio")]
    McpStdio(McpStdioCmd),
    /// Diagnose configuration/launch issues (json; no secrets).
    Doctor(DoctorCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug, Default)]
struct McpStdioCmd {
    /// Model identifier sent upstream (overrides MODEL_USE).
    #[arg(long)]
    model: Option<String>,
    /// Chat-completions endpoint (overrides DRTRIPS_ENDPOINT).
    #[arg(long)]
    endpoint: Option<String>,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    /// Pretty-print the JSON report.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
    pretty: bool,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[cfg(feature = "stdio")]
async fn serve(cmd: McpStdioCmd, env_file: Option<&std::path::Path>) -> Result<()> {
    let mut cfg = match drtrips_local::ClientConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            log::error!("❌ Fatal Error: {e}");
            return Err(e.into());
        }
    };
    if let Some(m) = cmd.model {
        cfg.model = m;
    }
    if let Some(e) = cmd.endpoint {
        cfg.endpoint = e;
    }
    log::info!(
        "configuration loaded: model={} api_key=set env_file={}",
        cfg.model,
        env_file.map_or_else(|| "none".to_string(), |p| p.display().to_string())
    );

    let svc = mcp::ResearchMcp::from_config(cfg)?;
    log::info!(
        "{SERVER_NAME} running on stdio (tool: {})",
        drtrips_research_mcp::TOOL_NAME
    );
    mcp::serve_stdio(svc)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    log::info!("{SERVER_NAME} stopped");
    Ok(())
}

#[cfg(not(feature = "stdio"))]
async fn serve_default(_env_file: Option<&std::path::Path>) -> Result<()> {
    anyhow::bail!("{SERVER_NAME} was built without the `stdio` feature")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Before logging init so RUST_LOG can come from the env file too.
    let env_file = config::load_env_file();

    // stderr only: stdout carries the MCP protocol.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        #[cfg(feature = "stdio")]
        None => serve(McpStdioCmd::default(), env_file.as_deref()).await?,
        #[cfg(not(feature = "stdio"))]
        None => serve_default(env_file.as_deref()).await?,
        #[cfg(feature = "stdio")]
        Some(Commands::McpStdio(cmd)) => serve(cmd, env_file.as_deref()).await?,
        Some(Commands::Doctor(args)) => {
            let report = config::doctor_report(env_file.as_deref());
            let s = if args.pretty {
                serde_json::to_string_pretty(&report)?
            } else {
                report.to_string()
            };
            println!("{s}");
        }
        Some(Commands::Version(args)) => match args.output.as_str() {
            "text" => println!("{SERVER_NAME} {}", env!("CARGO_PKG_VERSION")),
            _ => println!(
                "{}",
                serde_json::json!({
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                })
            ),
        },
    }
    Ok(())
}
