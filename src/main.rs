use anyhow::Context;
use bookquest_app::modules::rankings::load_rankings;
use bookquest_kernel::{settings::Settings, InitCtx, ModuleRegistry};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bookquest", about = "Reading challenge tracker API", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print the current rankings as JSON
    Rankings,
    /// Load settings and build the store client, then exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load bookquest settings")?;
    bookquest_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        backend = ?settings.store.backend,
        "bookquest bootstrap starting"
    );

    let store = bookquest_db::connect(&settings.store).context("failed to configure data store")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&settings, store).await,
        Command::Rankings => {
            let rankings = load_rankings(&store)
                .await
                .context("failed to load rankings")?;
            println!("{}", serde_json::to_string_pretty(&rankings)?);
            Ok(())
        }
        Command::CheckConfig => {
            tracing::info!(
                host = %settings.server.host,
                port = settings.server.port,
                backend = store.backend(),
                "configuration is valid"
            );
            Ok(())
        }
    }
}

async fn serve(settings: &Settings, store: bookquest_db::SharedStore) -> anyhow::Result<()> {
    let mut registry = ModuleRegistry::new();
    bookquest_app::register_all(&mut registry, &store);

    let ctx = InitCtx { settings };
    registry.init_modules(&ctx).await?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        tracing::info!("shutdown requested");
    };
    bookquest_http::start_server(&registry, settings, shutdown).await
}
