//! Classify leaf images from the command line without running the server.
//!
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use common::report::render_prediction;
use env_logger::TimestampPrecision;
use leaf_server::{config::ModelArgs, model_store, prediction::classify};

#[derive(Parser, Debug)]
#[clap(author, version)]
struct Args {
    #[clap(flatten)]
    model: ModelArgs,

    /// Print JSON instead of a text report
    #[clap(long)]
    json: bool,

    /// Images to classify
    #[clap(required = true)]
    images: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::builder()
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();

    args.model.validate()?;
    let loaded = model_store::load(&args.model)?;

    let mut failures = 0;
    for path in args.images.iter() {
        let result = image::open(path)
            .with_context(|| format!("failed to open {}", path.display()))
            .and_then(|image| classify(loaded.model.as_ref(), &loaded.info, &image.to_rgb8()));

        match result {
            Ok(resp) if args.json => println!("{}", serde_json::to_string_pretty(&resp)?),
            Ok(resp) => {
                println!("📄 {}", path.display());
                println!("{}", render_prediction(&resp));
            }
            Err(e) => {
                log::error!("{}: {e:#}", path.display());
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} images could not be classified", args.images.len());
    }

    Ok(())
}
