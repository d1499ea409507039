//! Command line and environment configuration shared by the binaries.
//!
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use anyhow::{bail, Result};
use clap::Args;

use crate::{
    calibration::validate_temperature,
    nn::{InputLayout, ResizeFilter},
};

/// Where to find the model and how to feed it.
#[derive(Args, Clone, Debug)]
pub struct ModelArgs {
    /// Directory holding `model.onnx` (and optionally `metadata.json`)
    #[clap(long, env = "MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Root with one numbered directory per model version; the highest is used
    #[clap(long, env = "MODELS_ROOT", default_value = "saved_models")]
    pub models_root: PathBuf,

    /// Calibration temperature; defaults to the model metadata, then 0.15
    #[clap(long, env = "TEMPERATURE")]
    pub temperature: Option<f32>,

    /// Interpolation used to resize images to the network input
    #[clap(
        long,
        env = "RESIZE_FILTER",
        value_enum,
        default_value_t = ResizeFilter::default()
    )]
    pub resize_filter: ResizeFilter,

    /// Layout of the model input tensor
    #[clap(
        long,
        env = "INPUT_LAYOUT",
        value_enum,
        default_value_t = InputLayout::default()
    )]
    pub input_layout: InputLayout,
}

impl ModelArgs {
    pub fn validate(&self) -> Result<()> {
        if let Some(temperature) = self.temperature {
            validate_temperature(temperature)?;
        }
        Ok(())
    }
}

/// HTTP serving options.
#[derive(Args, Clone, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to
    #[clap(long, env = "BIND_ADDRESS", default_value = "0.0.0.0")]
    pub address: IpAddr,

    /// Port to bind the HTTP server to
    #[clap(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Largest accepted request body in bytes
    #[clap(long, env = "MAX_UPLOAD_BYTES", default_value_t = 16 * 1024 * 1024)]
    pub max_upload_bytes: usize,

    /// Number of images that may wait for the inference worker
    #[clap(long, env = "QUEUE_DEPTH", default_value_t = 16)]
    pub queue_depth: usize,

    /// Seconds between throughput log lines
    #[clap(long, env = "METER_INTERVAL_SECS", default_value_t = 10)]
    pub meter_interval_secs: u64,
}

impl ServerArgs {
    pub fn validate(&self) -> Result<()> {
        if self.queue_depth == 0 {
            bail!("queue depth must be at least 1");
        }
        if self.meter_interval_secs == 0 {
            bail!("meter interval must be at least one second");
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    pub fn meter_interval(&self) -> Duration {
        Duration::from_secs(self.meter_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::*;

    #[derive(Parser, Debug)]
    struct TestArgs {
        #[clap(flatten)]
        model: ModelArgs,

        #[clap(flatten)]
        server: ServerArgs,
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let args = TestArgs::try_parse_from(["test"])?;
        args.model.validate()?;
        args.server.validate()?;

        assert_eq!(args.model.models_root, PathBuf::from("saved_models"));
        assert_eq!(args.model.resize_filter, ResizeFilter::CatmullRom);
        assert_eq!(args.model.input_layout, InputLayout::Nhwc);
        assert_eq!(args.server.queue_depth, 16);

        Ok(())
    }

    #[test]
    fn test_flags() -> Result<()> {
        let args = TestArgs::try_parse_from([
            "test",
            "--model-dir",
            "models/7",
            "--temperature",
            "0.5",
            "--resize-filter",
            "lanczos3",
            "--input-layout",
            "nchw",
            "--address",
            "127.0.0.1",
            "--port",
            "3000",
        ])?;

        assert_eq!(args.model.model_dir, Some(PathBuf::from("models/7")));
        assert_eq!(args.model.temperature, Some(0.5));
        assert_eq!(args.model.resize_filter, ResizeFilter::Lanczos3);
        assert_eq!(args.model.input_layout, InputLayout::Nchw);
        assert_eq!(args.server.socket_addr(), "127.0.0.1:3000".parse::<SocketAddr>()?);

        Ok(())
    }

    #[test]
    fn test_every_option_reads_the_environment() {
        let command = TestArgs::command();
        let envs: Vec<_> = command
            .get_arguments()
            .filter(|arg| arg.get_id() != "help")
            .map(|arg| (arg.get_id().to_string(), arg.get_env().map(|e| e.to_owned())))
            .collect();

        for (id, env) in envs.iter() {
            assert!(env.is_some(), "--{id} has no environment fallback");
        }
        let names: Vec<_> = envs.iter().filter_map(|(_, env)| env.clone()).collect();
        for expected in [
            "RESIZE_FILTER",
            "INPUT_LAYOUT",
            "MAX_UPLOAD_BYTES",
            "QUEUE_DEPTH",
            "METER_INTERVAL_SECS",
        ] {
            assert!(names.iter().any(|n| n == expected), "{expected} missing");
        }
    }

    #[test]
    fn test_validation() -> Result<()> {
        let args = TestArgs::try_parse_from(["test", "--temperature", "0", "--queue-depth", "0"])?;
        assert!(args.model.validate().is_err());
        assert!(args.server.validate().is_err());

        Ok(())
    }
}
