//! Leaf disease REST server binary.
//!
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use env_logger::TimestampPrecision;
use leaf_server::{
    config::{ModelArgs, ServerArgs},
    endpoints::{router, AppState},
    inferer::Inferer,
    meter::spawn_meter_logger,
    model_store,
};

#[derive(Parser, Debug)]
#[clap(author, version)]
struct Args {
    #[clap(flatten)]
    model: ModelArgs,

    #[clap(flatten)]
    server: ServerArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logger
    env_logger::builder()
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();

    args.model.validate()?;
    args.server.validate()?;

    // Load the model in the background so that health checks answer right away
    let model_args = args.model.clone();
    let inferer = Inferer::spawn(
        move || model_store::load(&model_args),
        args.server.queue_depth,
    )?;
    let state = Arc::new(AppState { inferer });

    spawn_meter_logger(args.server.meter_interval());

    // Build HTTP server with endpoints
    let app = router(state, args.server.max_upload_bytes);

    // Serve HTTP server
    let addr = args.server.socket_addr();
    log::info!("Listening on http://{addr}");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
