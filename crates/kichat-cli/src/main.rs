mod cli;
mod command;
mod repl;

use anyhow::{Context, Result};
use clap::Parser;
use kichat::auth::{AuthBackend, AuthContext, LocalAuthBackend, SqliteAuthBackend};
use kichat::logging::init_logging;
use kichat::{ChatConfig, ChatController, ChatStore, CompletionClient, MemoryChatStore, SqliteChatStore};
use std::sync::Arc;
use tracing::info;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(if cli.verbose { "kichat=debug" } else { "warn" })?;

    let mut config = ChatConfig::load(cli.config.as_deref()).context("loading config")?;
    if let Some(model) = cli.model {
        config.provider.model = model;
    }

    let provider = CompletionClient::new(&config.provider, &config.timeouts)
        .context("building completion client")?;
    info!("using model {}", config.provider.model);

    // accounts live in the chat database so stored chats keep their owner
    let (store, backend): (Arc<dyn ChatStore>, Arc<dyn AuthBackend>) = if cli.guest {
        (
            Arc::new(MemoryChatStore::new()),
            Arc::new(LocalAuthBackend::new()),
        )
    } else {
        let path = config.store.resolved_database_path();
        let store = SqliteChatStore::open(&path)
            .await
            .with_context(|| format!("opening chat database {:?}", path))?;
        let backend = SqliteAuthBackend::with_pool(store.pool().clone())
            .await
            .context("preparing account tables")?;
        (Arc::new(store), Arc::new(backend))
    };

    let auth = AuthContext::new(backend);
    let controller = ChatController::new(Arc::new(provider), store, auth, config.chat.clone())
        .with_callbacks(repl::print_callbacks());

    repl::run(controller).await
}
