use clap::{Parser, Subcommand};
use serde_json::{Map, Value};

pub mod config;
pub mod demo;
pub mod qdrant;
pub mod services;
pub mod tools;

#[derive(Parser, Debug)]
#[command(version, about = "MCP tool server for the Qdrant vector database")]
struct Args {
    #[clap(
        short,
        long,
        default_value = "config.toml",
        help = "Path to config file",
        env = "CONFIG_PATH"
    )]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the MCP tools (default)
    Serve {
        #[clap(long, help = "stdio or http_streamable")]
        transport: Option<config::Transport>,
        #[clap(long, help = "Listen address for http_streamable")]
        addr: Option<String>,
    },
    /// Print the tool descriptors as JSON
    Tools,
    /// Invoke one tool and print the result envelope
    Call {
        name: String,
        #[clap(default_value = "{}", help = "Tool arguments as a JSON object")]
        arguments: String,
    },
    /// Walk through every tool against a scratch collection
    Demo {
        #[clap(long, default_value_t = 128)]
        dim: usize,
    },
    /// Delete demo collections (default: every known demo collection)
    Cleanup {
        #[clap(default_values = demo::DEMO_COLLECTIONS.iter().copied())]
        names: Vec<String>,
    },
}

fn parse_arguments(raw: &str) -> anyhow::Result<Map<String, Value>> {
    match serde_json::from_str(raw)? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("tool arguments must be a JSON object, got {}", other),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let mut config = config::Config::load_or_default(&args.config)?;
    log::debug!("Start with: {:#?}", config);

    match args.command.unwrap_or(Command::Serve {
        transport: None,
        addr: None,
    }) {
        Command::Serve { transport, addr } => {
            if let Some(transport) = transport {
                config.server.transport = transport;
            }
            if let Some(addr) = addr {
                config.server.addr = addr;
            }
            services::serve(&config).await?;
        }
        Command::Tools => {
            let dispatcher = services::dispatcher(&config)?;
            let descriptors: Vec<Value> =
                dispatcher.tools().iter().map(|t| t.descriptor()).collect();
            println!("{}", serde_json::to_string_pretty(&descriptors)?);
        }
        Command::Call { name, arguments } => {
            let arguments = parse_arguments(&arguments)?;
            let dispatcher = services::dispatcher(&config)?;
            let outcome = dispatcher.invoke(&name, Some(arguments)).await;
            println!("{}", outcome.to_pretty_json());
            if !outcome.is_success() {
                std::process::exit(1);
            }
        }
        Command::Demo { dim } => {
            let dispatcher = services::dispatcher(&config)?;
            demo::run_walkthrough(&dispatcher, dim).await?;
            println!("\nDemo completed successfully");
        }
        Command::Cleanup { names } => {
            let dispatcher = services::dispatcher(&config)?;
            let report = demo::cleanup(&dispatcher, &names).await?;
            for name in &report.deleted {
                println!("Deleted collection: {name}");
            }
            println!(
                "Deleted {} collections, {} not found",
                report.deleted.len(),
                report.missing.len()
            );
        }
    }
    Ok(())
}
