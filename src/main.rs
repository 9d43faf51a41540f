use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

use txflow::api;
use txflow::config;
use txflow::engine::Engine;
use txflow::model::intent::{BuildIntent, NaturalIntent};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();
    let config = config::Config::from_env()?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli.command, config))
}

async fn run(command: cli::Command, config: config::Config) -> Result<()> {
    match command {
        cli::Command::Serve { host, port } => {
            let port = port.unwrap_or(config.port);
            let engine = Engine::new(config);
            api::serve(engine, &host, port).await
        }

        cli::Command::Build {
            prompt,
            payer,
            network,
            skip_simulation,
            priority_fee,
            compute_budget,
        } => {
            let network = network.map(|n| n.parse()).transpose()?;
            let engine = Engine::new(config);
            let request = NaturalIntent {
                prompt,
                payer,
                network,
                skip_simulation,
                priority_fee,
                compute_budget,
            };
            let builds = engine.build_from_natural(&request).await;
            println!("{}", serde_json::to_string_pretty(&builds)?);
            Ok(())
        }

        cli::Command::Parse { prompt } => {
            let engine = Engine::new(config);
            let segments = engine.parse(&prompt).await?;
            for (segment, outcome) in segments {
                match outcome {
                    Ok(intent) => {
                        println!("{segment}");
                        println!("{}", serde_json::to_string_pretty(&intent)?);
                    }
                    Err(e) => println!("{segment}\n  error: {e}"),
                }
            }
            Ok(())
        }

        cli::Command::Estimate { intent } => {
            let intent: BuildIntent =
                serde_json::from_str(&intent).context("parsing intent JSON")?;
            let engine = Engine::new(config);
            let estimate = engine.estimate(std::slice::from_ref(&intent)).await;
            println!("{}", serde_json::to_string_pretty(&estimate)?);
            Ok(())
        }

        cli::Command::Decode { transaction } => {
            let engine = Engine::new(config);
            let decoded = engine.decode(&transaction)?;
            println!("{}", serde_json::to_string_pretty(&decoded)?);
            Ok(())
        }

        cli::Command::Resolve { query } => {
            let engine = Engine::new(config);
            match engine.resolve(&query).await {
                Some(answer) => println!("{}", serde_json::to_string_pretty(&answer)?),
                None => println!("Nothing known about '{query}'"),
            }
            Ok(())
        }

        cli::Command::Intents => {
            let engine = Engine::new(config);
            for handler in engine.handlers() {
                println!("{:<12} {}", handler.name, handler.description);
                println!("{:<12}   actions: {}", "", handler.actions.join(", "));
            }
            Ok(())
        }
    }
}
