use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use common::{
    protocol::{HealthStatus, Severity},
    report::render_prediction,
    Error,
};
use image::{Rgb, RgbImage};
use leaf_client::LeafClient;
use leaf_server::{
    calibration::Calibrator,
    endpoints::{router, AppState},
    inferer::Inferer,
    model_store::{LoadedModel, ModelInfo},
    nn::InferModel,
};

struct StubModel;

impl InferModel for StubModel {
    fn run(&self, _input: &RgbImage) -> Result<Vec<f32>> {
        Ok(vec![0.70, 0.10, 0.02, 0.03, 0.05, 0.04, 0.03, 0.03])
    }

    fn num_classes(&self) -> usize {
        8
    }
}

/// Serve the real router with a stub model on an ephemeral port.
async fn spawn_server() -> String {
    let inferer = Inferer::spawn(
        || {
            Ok(LoadedModel {
                model: Box::new(StubModel),
                info: ModelInfo {
                    version: "v7".into(),
                    accuracy: "99.87%".into(),
                    metadata_path: None,
                    calibrator: Calibrator::default(),
                },
            })
        },
        4,
    )
    .expect("spawn inferer");
    inferer.settled().await;

    let app = router(Arc::new(AppState { inferer }), 1 << 20);
    let addr: SocketAddr = "127.0.0.1:0".parse().expect("address");
    let server = axum::Server::bind(&addr).serve(app.into_make_service());
    let addr = server.local_addr();
    tokio::spawn(server);

    format!("http://{addr}")
}

#[tokio::test]
async fn test_predict_round_trip() -> Result<(), Error> {
    let client = LeafClient::new(&spawn_server().await)?;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("leaf.jpg");
    RgbImage::from_pixel(80, 60, Rgb([40, 140, 60])).save(&path)?;

    let resp = client.predict(&path).await?;
    assert_eq!(resp.predicted_disease, "Anthracnose");
    assert_eq!(resp.severity, Severity::High);
    assert_eq!(resp.all_predictions.0[0].name, "Anthracnose");
    assert_eq!(resp.all_predictions.0[1].name, "Bacterial Canker");

    let report = render_prediction(&resp);
    assert!(report.contains("Disease:    Anthracnose"));

    Ok(())
}

#[tokio::test]
async fn test_catalog_and_health() -> Result<(), Error> {
    let client = LeafClient::new(&spawn_server().await)?;

    let health = client.health().await?;
    assert_eq!(health.status, HealthStatus::Healthy);

    let list = client.diseases().await?;
    assert_eq!(list.count, 8);

    let info = client.info("Gall Midge").await?;
    assert_eq!(info.details.kind, "Pest Infestation");

    let err = client.info("Leaf Rust").await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("404"), "{message}");
    assert!(message.contains("Disease 'Leaf Rust' not found"), "{message}");

    Ok(())
}

#[tokio::test]
async fn test_missing_file_is_reported() -> Result<(), Error> {
    let client = LeafClient::new(&spawn_server().await)?;
    assert!(client
        .predict(std::path::Path::new("no/such/leaf.jpg"))
        .await
        .is_err());

    Ok(())
}
