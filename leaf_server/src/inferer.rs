use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread,
};

use anyhow::{anyhow, Result};
use image::RgbImage;
use thiserror::Error;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot, watch,
};

use crate::model_store::{LoadedModel, ModelInfo};

/// Lifecycle of the model behind the inferer.
#[derive(Clone, Debug)]
pub enum ModelState {
    Loading,
    Ready(Arc<ModelInfo>),
    Failed(String),
}

#[derive(Debug, Error)]
pub enum InferError {
    #[error("model is still loading")]
    NotReady,
    #[error("model failed to load: {0}")]
    Unavailable(String),
    #[error("inference queue is full")]
    Busy,
    #[error("inference worker stopped")]
    WorkerGone,
    #[error("inference failed: {0:#}")]
    Model(anyhow::Error),
}

struct InferJob {
    image: RgbImage,
    reply: oneshot::Sender<Result<Vec<f32>>>,
}

/// Runs the model on a dedicated thread and hands out predictions to async callers.
///
/// The worker thread first builds the model with the given loader and then serves
/// one image at a time from a bounded queue.
pub struct Inferer {
    jobs_tx: mpsc::Sender<InferJob>,
    state_rx: watch::Receiver<ModelState>,
}

impl Inferer {
    pub fn spawn<F>(loader: F, queue_depth: usize) -> std::io::Result<Self>
    where
        F: FnOnce() -> Result<LoadedModel> + Send + 'static,
    {
        let (jobs_tx, jobs_rx) = mpsc::channel(queue_depth.max(1));
        let (state_tx, state_rx) = watch::channel(ModelState::Loading);

        thread::Builder::new()
            .name("inferer".into())
            .spawn(move || run_worker(loader, jobs_rx, state_tx))?;

        Ok(Self { jobs_tx, state_rx })
    }

    pub fn state(&self) -> ModelState {
        self.state_rx.borrow().clone()
    }

    /// Description of the loaded model, or why there is none.
    pub fn ready_info(&self) -> Result<Arc<ModelInfo>, InferError> {
        match &*self.state_rx.borrow() {
            ModelState::Loading => Err(InferError::NotReady),
            ModelState::Ready(info) => Ok(Arc::clone(info)),
            ModelState::Failed(reason) => Err(InferError::Unavailable(reason.clone())),
        }
    }

    /// Wait until loading has either succeeded or failed.
    pub async fn settled(&self) -> ModelState {
        let mut state_rx = self.state_rx.clone();
        loop {
            let state = state_rx.borrow_and_update().clone();
            if !matches!(state, ModelState::Loading) {
                return state;
            }
            if state_rx.changed().await.is_err() {
                // Worker is gone; report whatever it left behind
                return state_rx.borrow().clone();
            }
        }
    }

    /// Run the model on `image` and return its raw class scores.
    pub async fn predict(&self, image: RgbImage) -> Result<Vec<f32>, InferError> {
        self.ready_info()?;

        let (reply, reply_rx) = oneshot::channel();
        self.jobs_tx
            .try_send(InferJob { image, reply })
            .map_err(|e| match e {
                TrySendError::Full(_) => InferError::Busy,
                TrySendError::Closed(_) => InferError::WorkerGone,
            })?;

        reply_rx
            .await
            .map_err(|_| InferError::WorkerGone)?
            .map_err(InferError::Model)
    }
}

fn run_worker<F>(
    loader: F,
    mut jobs_rx: mpsc::Receiver<InferJob>,
    state_tx: watch::Sender<ModelState>,
) where
    F: FnOnce() -> Result<LoadedModel>,
{
    log::info!("Loading model");
    let LoadedModel { model, info } = match loader() {
        Ok(loaded) => loaded,
        Err(e) => {
            log::error!("Failed to load model: {e:#}");
            state_tx.send_replace(ModelState::Failed(format!("{e:#}")));
            return;
        }
    };
    log::info!("Model {} ready", info.version);
    state_tx.send_replace(ModelState::Ready(Arc::new(info)));

    while let Some(job) = jobs_rx.blocking_recv() {
        // A panicking model fails this request only
        let result = panic::catch_unwind(AssertUnwindSafe(|| model.run(&job.image)))
            .unwrap_or_else(|payload| {
                Err(anyhow!("model panicked: {}", panic_message(&*payload)))
            });
        if let Err(e) = &result {
            log::warn!("Inference failed: {e:#}");
        }
        // The requester may have gone away in the meantime
        job.reply.send(result).ok();
    }
    log::debug!("Inference queue closed, stopping worker");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
