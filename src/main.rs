use anyhow::Result;
use classroom_store::{
    app,
    config::AppConfig,
    services::{
        asset_store::AssetStore, classroom_service::ClassroomService, record_store::RecordStore,
    },
};
use std::io::ErrorKind;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;

    tracing::info!("Starting classroom-store with config: {:?}", cfg);

    // --- Initialize stores (uploads dir + empty lectures.json if missing) ---
    let service = ClassroomService::new(
        RecordStore::new(&cfg.data_dir),
        AssetStore::new(&cfg.uploads_dir),
        cfg.teacher_password.clone(),
    );
    service.init().await?;

    // --- Build router ---
    let app = app(service, cfg.max_upload_bytes);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
