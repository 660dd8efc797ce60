use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use enactment_rs::engine::builder::build_arena;
use enactment_rs::engine::{Builder, EngineConfig, FunctionRegistry, WorkflowLoader};
use enactment_rs::sdk::EchoFunction;

use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a workflow file and print the final state
    Run {
        /// Path to the workflow file
        #[arg(short, long)]
        file: String,

        /// JSON object file with extra initial state
        #[arg(short, long)]
        input: Option<String>,

        /// Write the final state here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Check a workflow file without running it
    Validate {
        /// Path to the workflow file
        #[arg(short, long)]
        file: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Run {
            file,
            input,
            output,
        } => {
            let config = EngineConfig::from_env()?;

            // Functions run as echo until a remote invoker is registered
            let registry = FunctionRegistry::new();
            registry.register(Arc::new(EchoFunction)).await;
            registry.set_default(Arc::new(EchoFunction)).await;

            let mut def = WorkflowLoader::new()
                .load_workflow(&file)
                .with_context(|| format!("Failed to load workflow {}", file))?;
            if let Some(input) = input {
                let content = fs::read_to_string(&input)
                    .with_context(|| format!("Failed to read input {}", input))?;
                let values: HashMap<String, Value> = serde_json::from_str(&content)
                    .with_context(|| format!("Input {} must be a JSON object", input))?;
                def.state.extend(values);
            }

            let executor = Builder::new(registry, config).build_from_def(&def)?;
            println!("Running workflow: {} (run {})", def.name, executor.run_id());
            executor.run().await?;

            let state = serde_json::to_string_pretty(&executor.store().to_json().await)?;
            match output {
                Some(path) => {
                    fs::write(&path, state)?;
                    println!("State written to {}", path);
                }
                None => println!("{}", state),
            }
        }
        Commands::Validate { file } => {
            let def = WorkflowLoader::new()
                .load_workflow(&file)
                .with_context(|| format!("Failed to load workflow {}", file))?;
            let arena = build_arena(&def)?;
            println!("Workflow '{}' is valid: {} nodes", def.name, arena.len());
        }
    }

    Ok(())
}
