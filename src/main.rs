//! openapi-mcp server - main entry point.
//!
//! Subcommands:
//! - `serve`: compile a document and serve its tools over SSE sessions
//! - `inspect`: print a document summary and the tools it compiles to

use clap::{Args, Parser, Subcommand};
use openapi_mcp::dispatch::{EchoInvoker, HttpInvoker, InvocationDispatcher, ReqwestInvoker};
use openapi_mcp::protocol::{ContentProvider, ProtocolRouter, SessionProtocolServer, StaticContent};
use openapi_mcp::spec::{load_document, SpecSummary};
use openapi_mcp::tools::{compile, CatalogHandle};
use openapi_mcp::transport::SseServer;
use openapi_mcp::types::ObservabilityConfig;
use openapi_mcp::Config;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "openapi-mcp-server")]
#[command(version, about = "Serve an OpenAPI document as MCP tools over SSE")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile the document and serve its tools
    Serve(ServeArgs),
    /// Print the document summary and compiled tool names
    Inspect {
        /// Path to a .yaml, .yml or .json document
        spec: PathBuf,
        /// Also list component schemas
        #[arg(long)]
        schemas: bool,
    },
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Path to a .yaml, .yml or .json document
    #[arg(env = "OPENAPI_MCP_SPEC")]
    spec: PathBuf,

    /// Address the SSE transport binds to
    #[arg(long, env = "OPENAPI_MCP_LISTEN")]
    listen: Option<String>,

    /// Base URL for outbound calls, overriding the document's servers
    #[arg(long, env = "OPENAPI_MCP_BASE_URL")]
    base_url: Option<String>,

    /// Outbound request timeout in seconds
    #[arg(long, env = "OPENAPI_MCP_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Maximum concurrent sessions
    #[arg(long, env = "OPENAPI_MCP_MAX_SESSIONS")]
    max_sessions: Option<usize>,

    /// JSON file with static resources, resource templates and prompts
    #[arg(long, env = "OPENAPI_MCP_CONTENT")]
    content: Option<PathBuf>,

    /// Answer tool calls with the request they would send instead of calling the API
    #[arg(long)]
    echo: bool,

    /// Log level when RUST_LOG is unset
    #[arg(long, env = "OPENAPI_MCP_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl ServeArgs {
    fn to_config(&self) -> Config {
        let mut config = Config::default();
        if let Some(listen) = &self.listen {
            config.server.listen_addr = listen.clone();
        }
        if let Some(max) = self.max_sessions {
            config.server.max_sessions = max;
        }
        if let Some(secs) = self.timeout_secs {
            config.http.request_timeout = Duration::from_secs(secs);
        }
        config.http.base_url = self.base_url.clone();
        config.observability = ObservabilityConfig {
            log_level: self.log_level.clone(),
            json_logs: openapi_mcp::observability::json_from_env(),
        };
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Inspect { spec, schemas } => inspect(&spec, schemas),
    }
}

fn inspect(path: &Path, schemas: bool) -> Result<(), Box<dyn std::error::Error>> {
    let model = load_document(path)?;
    print!("{}", SpecSummary::new(&model).with_schemas(schemas));

    let tools = compile(&model)?;
    println!();
    println!("Tools ({}):", tools.len());
    for tool in &tools {
        println!("  {} - {}", tool.name, tool.description);
    }
    Ok(())
}

async fn serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.to_config();
    openapi_mcp::observability::init_tracing_with(&config.observability);

    let catalog = Arc::new(CatalogHandle::open(&args.spec, config.http.base_url.clone())?);

    let invoker: Arc<dyn HttpInvoker> = if args.echo {
        tracing::warn!("Echo mode: tool calls are not sent upstream");
        Arc::new(EchoInvoker::new())
    } else {
        Arc::new(ReqwestInvoker::new(config.http.request_timeout)?)
    };

    let content: Arc<dyn ContentProvider> = match &args.content {
        Some(path) => Arc::new(StaticContent::from_file(path)?),
        None => Arc::new(StaticContent::default()),
    };

    let dispatcher = InvocationDispatcher::new(Arc::clone(&catalog), invoker);
    let router = ProtocolRouter::new(dispatcher, content, config.server.name.clone());
    let sessions = Arc::new(SessionProtocolServer::new(
        router,
        config.session.clone(),
        config.server.max_sessions,
    ));
    let server = Arc::new(SseServer::new(sessions, config.server.clone()));

    #[cfg(unix)]
    spawn_reload_on_hangup(Arc::clone(&catalog), args.spec.clone())?;

    let shutdown = Arc::clone(&server);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.shutdown();
        }
    });

    tracing::info!(
        "🚀 openapi-mcp starting on {} ({} tools)",
        config.server.listen_addr,
        catalog.load().len()
    );
    match catalog.load().base_url() {
        Some(url) => tracing::info!("  ✓ Upstream API: {}", url),
        None => tracing::warn!("  ✗ No base URL: every tool call will fail"),
    }

    server.serve().await?;
    Ok(())
}

/// Rebuild and republish the catalog on SIGHUP. A failed reload keeps the
/// previous catalog.
#[cfg(unix)]
fn spawn_reload_on_hangup(catalog: Arc<CatalogHandle>, path: PathBuf) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            match catalog.reload(&path) {
                Ok(count) => tracing::info!(tools = count, "Reloaded document"),
                Err(e) => {
                    tracing::error!(error = %e, "Reload failed, keeping previous catalog")
                }
            }
        }
    });
    Ok(())
}
