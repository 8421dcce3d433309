mod wiring;

use crate::{cli, context, rest, storage};
use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct App {
    pub ctx: context::Context,
    pub repo: Arc<storage::SqliteRepository>,
}

impl App {
    pub async fn from_cli() -> Result<(Self, cli::Cli)> {
        let cli = crate::cli::parse();
        let ctx = context::Context::from_cli(&cli)?;

        crate::tracing::init(&ctx.config.log);
        log::info!("🚀 Starting catanddog");
        log::info!("🗄️ Database: {}", ctx.config.db.uri);
        log::info!("⏱️ DB call timeout: {:?}", ctx.config.db.timeout);
        if let Some(path) = ctx.config.log.file.as_deref() {
            log::info!("📝 Log file: {}", path.to_string_lossy());
        }

        let repo = wiring::init_storage(&ctx).await?;
        Ok((Self { ctx, repo }, cli))
    }
}

pub async fn run_server(app: App) -> Result<()> {
    let web = app.ctx.config.web.clone();
    log::info!("⏱️ Request budget: {:?}", web.request_timeout);
    log::info!("🧮 Update concurrency: {}", web.update_concurrency);

    let shutdown = CancellationToken::new();

    let rest_repo = app.repo.clone();
    let rest_shutdown = shutdown.clone();
    let mut rest_handle =
        tokio::spawn(async move { rest::serve(rest_repo, web, rest_shutdown).await });

    let rest_result = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("🧨 Ctrl-C received, shutting down");
            shutdown.cancel();
            rest_handle.await
        }
        res = &mut rest_handle => res,
    };

    app.repo.close().await;

    match rest_result {
        Ok(Ok(())) => {
            log::info!("✅ Shutdown complete");
            Ok(())
        }
        Ok(Err(e)) => {
            log::error!("REST server error: {}", e);
            Err(e)
        }
        Err(e) => {
            log::error!("REST task failed: {}", e);
            Err(e.into())
        }
    }
}

pub async fn run() -> Result<()> {
    let (app, cli) = App::from_cli().await?;

    if let Some(cli::Command::InitDb { .. }) = &cli.cmd {
        // one-shot: storage is already initialized by wiring
        log::info!("✅ Database ready at {}", app.ctx.config.db.uri);
        app.repo.close().await;
        return Ok(());
    }

    run_server(app).await
}
