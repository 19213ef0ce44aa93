//! Prediction server entry point.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use ploidy::api::{router, AppState};
use ploidy::common::config::AppCfg;
use ploidy::common::log;
use ploidy::inference::{Pipeline, Pool};
use ploidy::model::service::{install, store};
use ploidy::model::{FsModelRepo, ModelStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppCfg::load().context("loading configuration")?;
    log::init(&cfg).context("initialising logging")?;

    let repo = FsModelRepo::new(&cfg);
    let loaded = ModelStore::load(&repo).context("loading trained artefacts")?;
    install(Arc::new(loaded))?;
    let pool = Arc::new(Pool::new(cfg.worker_threads)?);
    let workers = pool.threads();
    let pipeline = Arc::new(Pipeline::new(store()?, &cfg, pool));
    info!(
        listen_addr = %cfg.listen_addr,
        features = pipeline.store().schema().len(),
        explain = cfg.explain.enabled,
        workers,
        "starting ploidy server"
    );

    let app = router(Arc::new(AppState { pipeline }), &cfg);
    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("binding {}", cfg.listen_addr))?;
    info!(listen_addr = %cfg.listen_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
