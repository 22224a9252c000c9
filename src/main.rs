use anyhow::Context as _;
use clap::{Parser, Subcommand};
use newsdesk::{AppContext, ArticleStore, Settings, logging, urls};
use newsdesk_http::HttpServer;
use std::net::SocketAddr;
use std::process::exit;
use tracing::{error, info};

const MAX_DB_CONNECTIONS: u32 = 5;

#[derive(Parser)]
#[command(name = "newsdesk", version, about = "News site with a Basic-auth admin")]
struct Cli {
	/// Increase log verbosity (-v debug, -vv trace)
	#[arg(short, long, action = clap::ArgAction::Count, global = true)]
	verbose: u8,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
	/// Run the web server (default)
	Serve {
		/// Listen address, overrides NEWSDESK_BIND
		#[arg(long)]
		bind: Option<SocketAddr>,
	},
	/// Create the database schema and exit
	Migrate,
}

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init(cli.verbose);

	if let Err(err) = run(cli).await {
		error!("{err:#}");
		exit(1);
	}
}

async fn run(cli: Cli) -> anyhow::Result<()> {
	let mut settings = Settings::from_env().context("invalid configuration")?;
	tracing::debug!(?settings, "settings loaded");

	let store = ArticleStore::connect(&settings.database_url, MAX_DB_CONNECTIONS)
		.await
		.with_context(|| format!("failed to open database {}", settings.database_url))?;
	store.migrate().await.context("failed to create schema")?;

	match cli.command.unwrap_or(Command::Serve { bind: None }) {
		Command::Migrate => {
			info!(database = %settings.database_url, "schema is up to date");
			store.close().await;
			Ok(())
		}
		Command::Serve { bind } => {
			if let Some(bind) = bind {
				settings.bind = bind;
			}
			serve(settings, store).await
		}
	}
}

async fn serve(settings: Settings, store: ArticleStore) -> anyhow::Result<()> {
	let bind = settings.bind;
	let grace = settings.shutdown_grace;
	let max_body_bytes = settings.max_body_bytes;

	let ctx = AppContext::new(settings, store.clone())
		.await
		.context("failed to initialise application")?;
	let server = HttpServer::new(urls::build_handler(&ctx)).with_max_body_bytes(max_body_bytes);

	info!(%bind, "newsdesk listening");
	server
		.listen_with_shutdown(bind, shutdown_signal(), grace)
		.await
		.with_context(|| format!("server error on {bind}"))?;

	store.close().await;
	info!("shutdown complete");
	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(err) = tokio::signal::ctrl_c().await {
			error!(error = %err, "failed to listen for ctrl-c");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(err) => {
				error!(error = %err, "failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => info!("received ctrl-c, shutting down"),
		() = terminate => info!("received SIGTERM, shutting down"),
	}
}
