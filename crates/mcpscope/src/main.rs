//! mcpscope - sign in with OAuth 2.0 PKCE and explore remote MCP servers.
//!
//! This is the main entry point for the mcpscope CLI.

mod commands;
mod config;
mod context;
mod logging;

use clap::{Parser, Subcommand};
use context::App;

#[derive(Parser)]
#[command(name = "mcpscope")]
#[command(author, version, about = "Sign in with OAuth and explore remote MCP servers", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the token and MCP forwarding gateway
    Serve {
        /// Address to listen on
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Sign in through the browser
    Login {
        /// Print the authorization URL without opening a browser
        #[arg(long)]
        no_browser: bool,
    },
    /// Forget stored credentials
    Logout,
    /// Show who is signed in and when the token expires
    Status,
    /// Refresh the access token now
    Refresh,
    /// List the tools an MCP endpoint offers
    Tools {
        /// MCP endpoint URL (defaults to the configured endpoint)
        endpoint: Option<String>,
        /// Print the raw tool definitions as JSON
        #[arg(long)]
        json: bool,
    },
    /// Call a tool on an MCP endpoint
    Call {
        /// Tool name
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(short, long)]
        args: Option<String>,
        /// MCP endpoint URL (defaults to the configured endpoint)
        #[arg(short, long)]
        endpoint: Option<String>,
    },
    /// Interactive session with an MCP endpoint
    Shell {
        /// MCP endpoint URL (defaults to the configured endpoint)
        endpoint: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let cwd = std::env::current_dir()?;
    let app = App::load(&cwd).await?;

    match cli.command {
        Commands::Serve { host, port } => commands::serve::serve(&app, host, port).await,
        Commands::Login { no_browser } => commands::auth::login(&app, no_browser).await,
        Commands::Logout => commands::auth::logout(&app).await,
        Commands::Status => commands::auth::status(&app).await,
        Commands::Refresh => commands::auth::refresh(&app).await,
        Commands::Tools { endpoint, json } => commands::mcp::tools(&app, endpoint, json).await,
        Commands::Call {
            tool,
            args,
            endpoint,
        } => commands::mcp::call(&app, endpoint, &tool, args).await,
        Commands::Shell { endpoint } => commands::mcp::shell(&app, endpoint).await,
    }
}
