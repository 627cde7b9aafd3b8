use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

mod cli;

use cli::Cli;
use cli::commands::Commands;
use forecast_mcp::client::ServiceClient;
use forecast_mcp::config::Config;
use forecast_mcp::inference::{FeatureInput, PredictionRequest};
use forecast_mcp::tuning::Optimizer;

fn setup_logging(to_stderr: bool) -> Result<()> {
    let mut builder = env_logger::Builder::from_default_env();

    if to_stderr {
        builder.target(env_logger::Target::Stderr).init();
        info!("Logging initialized, writing to stderr");
        return Ok(());
    }

    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("forecast-mcp")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("forecast-mcp.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, mut config: Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    let base_url = cli
        .url
        .clone()
        .unwrap_or_else(|| format!("http://{}:{}", config.service.bind_address, config.service.port));

    match &cli.command {
        None => serve(config).await,
        Some(Commands::Serve { bind, port }) => {
            if let Some(bind) = bind {
                config.service.bind_address = bind.clone();
            }
            if let Some(port) = port {
                config.service.port = *port;
            }
            serve(config).await
        }
        Some(Commands::Tools) => handle_tools(&ServiceClient::new(&base_url)).await,
        Some(Commands::Invoke { name, params }) => handle_invoke(&ServiceClient::new(&base_url), name, params).await,
        Some(Commands::Predict { features, text }) => {
            handle_predict(&ServiceClient::new(&base_url), features, text.as_deref()).await
        }
        Some(Commands::Version) => {
            let version = ServiceClient::new(&base_url).version().await?;
            println!("{} {}", "Version:".green(), version);
            Ok(())
        }
        Some(Commands::Health) => {
            let health = ServiceClient::new(&base_url).health().await?;
            print_json(&health)
        }
        Some(Commands::Optimize { trials, seed, persist }) => {
            config.tuning.persist_model |= *persist;
            handle_optimize(config, *trials, *seed).await
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    println!(
        "{} http://{}:{}",
        "Serving on".cyan(),
        config.service.bind_address,
        config.service.port
    );
    forecast_mcp::server::serve(&config).await.context("Server failed")
}

async fn handle_tools(client: &ServiceClient) -> Result<()> {
    let tools = client.list_tools().await?;
    for tool in tools {
        println!("{} - {}", tool.name.green().bold(), tool.description);
        for (name, spec) in &tool.parameters {
            let marker = if spec.required { "*".red().to_string() } else { " ".to_string() };
            println!("  {}{} ({}) {}", marker, name, spec.param_type.as_str(), spec.description.dimmed());
        }
    }
    Ok(())
}

async fn handle_invoke(client: &ServiceClient, name: &str, params: &str) -> Result<()> {
    let parameters: Value = serde_json::from_str(params).context("Parameters must be valid JSON")?;
    info!("Invoking {} with {}", name, parameters);
    let result = client.invoke(name, parameters).await?;
    print_json(&result)
}

async fn handle_predict(client: &ServiceClient, features: &str, text: Option<&str>) -> Result<()> {
    let features: FeatureInput = serde_json::from_str(features).context("Features must be a JSON object or array")?;
    let mut request = PredictionRequest::new(features);
    if let Some(text) = text {
        request = request.with_text(text);
    }
    let outcome = client.predict(&request).await?;
    if outcome.low_variance {
        println!("{} {} (low variance input)", "Prediction:".yellow(), outcome.prediction);
    } else {
        println!("{} {}", "Prediction:".green(), outcome.prediction);
    }
    Ok(())
}

async fn handle_optimize(config: Config, trials: Option<usize>, seed: Option<u64>) -> Result<()> {
    if !config.tuning.enabled {
        return Err(eyre!("Tuning is disabled by configuration"));
    }
    let optimizer = Optimizer::new(config.tuning.clone(), config.storage.clone(), config.provider.training_days);
    println!("{} {} trials", "Optimizing:".cyan(), optimizer.trial_budget(trials));

    let result = tokio::task::spawn_blocking(move || optimizer.run(trials, seed))
        .await
        .context("Search task failed")??;

    println!("{} {:.6}", "Best score:".green(), result.best_score);
    print_json(&serde_json::to_value(&result)?)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging first
    setup_logging(cli.log_stderr).context("Failed to setup logging")?;

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, config).await.context("Application failed")?;

    Ok(())
}
