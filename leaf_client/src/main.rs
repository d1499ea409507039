use std::path::PathBuf;

use clap::{Parser, Subcommand};
use common::{report::render_prediction, Error};
use env_logger::TimestampPrecision;
use leaf_client::LeafClient;

#[derive(Parser, Debug)]
#[clap(author, version)]
struct Args {
    /// Base URL of the leaf disease server
    #[clap(long, env = "LEAF_SERVER", default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Print raw JSON instead of text
    #[clap(long)]
    json: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a leaf image and print the diagnosis
    Predict { image: PathBuf },
    /// Show whether the server has its model loaded
    Health,
    /// List the diseases the model knows
    Diseases,
    /// Describe one disease
    Info { disease: String },
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    env_logger::builder()
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();

    let client = LeafClient::new(&args.server)?;

    match args.command {
        Command::Predict { image } => {
            let resp = client.predict(&image).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&resp)?);
            } else {
                println!("{}", render_prediction(&resp));
            }
        }
        Command::Health => {
            let resp = client.health().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&resp)?);
            } else {
                println!("status:       {:?}", resp.status);
                println!("model loaded: {}", resp.model_loaded);
                println!("timestamp:    {}", resp.timestamp);
                if let Some(error) = resp.error {
                    println!("error:        {error}");
                }
            }
        }
        Command::Diseases => {
            let resp = client.diseases().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&resp)?);
            } else {
                println!("{} supported classes", resp.count);
                for name in resp.diseases.iter() {
                    match resp.details.get(name) {
                        Some(details) => println!(
                            "{} {:20} {:22} {}",
                            details.icon, name, details.kind, details.severity
                        ),
                        None => println!("   {name}"),
                    }
                }
            }
        }
        Command::Info { disease } => {
            let resp = client.info(&disease).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&resp)?);
            } else {
                let details = resp.details;
                println!("{} {}", details.icon, resp.disease);
                println!("Type:        {}", details.kind);
                println!("Severity:    {} {}", details.severity.icon(), details.severity);
                println!("Description: {}", details.description);
                println!("Causes:      {}", details.causes);
                println!("Treatment:");
                for step in details.treatment.iter() {
                    println!("  • {step}");
                }
                println!("Prevention:  {}", details.prevention);
            }
        }
    }

    Ok(())
}
