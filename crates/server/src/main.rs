use std::process;

use clap::Parser;

use facedup_core::encoding::infrastructure::onnx_face_encoder::OnnxFaceEncoder;
use facedup_core::shared::constants::{
    DETECTOR_MODEL_NAME, DETECTOR_MODEL_URL, EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL,
};
use facedup_core::shared::model_resolver::{ModelResolver, ModelSpec};
use facedup_server::app::BoxError;
use facedup_server::{create_router, App, AppState, Config};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), BoxError> {
    let config = Config::parse();
    config.validate()?;

    // Everything holding a blocking HTTP client is built, and finally
    // dropped, outside the runtime.
    let encoder = build_encoder(&config)?;
    let app = App::build(&config, Box::new(encoder))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let served = runtime.block_on(serve(&config, app.state()));
    drop(runtime);

    app.shutdown();
    served
}

fn build_encoder(config: &Config) -> Result<OnnxFaceEncoder, BoxError> {
    let resolver = ModelResolver::with_default_cache(config.model_dir.clone())?;

    log::info!("Resolving model: {DETECTOR_MODEL_NAME}");
    let detector = resolver.resolve(
        ModelSpec {
            name: DETECTOR_MODEL_NAME,
            url: DETECTOR_MODEL_URL,
        },
        Some(Box::new(download_progress)),
    )?;
    log::info!("Resolving model: {EMBEDDING_MODEL_NAME}");
    let embedder = resolver.resolve(
        ModelSpec {
            name: EMBEDDING_MODEL_NAME,
            url: EMBEDDING_MODEL_URL,
        },
        Some(Box::new(download_progress)),
    )?;

    Ok(OnnxFaceEncoder::new(&detector, &embedder, config.confidence)?)
}

async fn serve(config: &Config, state: AppState) -> Result<(), BoxError> {
    let router = create_router(state, config.body_limit_bytes());
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading model... {downloaded} bytes");
    }
}
