use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing::{error, info};

use crate::alert::{AlertDispatcher, LogNotifier, SmsGatewayNotifier};
use crate::broker::{AmqpBroker, Broker, MemoryBroker};
use crate::config::{generate_default_config, NotifierMode, Settings};
use crate::detector::Detector;
use crate::producer::Router;
use crate::reading::ChannelId;
use crate::secrets::{EnvSecrets, FileSecrets, SecretProvider};
use crate::source::ReadingSource;

#[derive(Parser)]
#[command(name = "smokewatch")]
#[command(about = "Smoker telemetry monitoring pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the source CSV and publish readings to the broker
    Produce {
        /// Source CSV file (defaults to the configured path)
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Broker URL
        #[arg(short, long)]
        url: Option<String>,
        /// Seconds to pause between rows
        #[arg(short, long)]
        delay_secs: Option<u64>,
    },
    /// Consume one channel and watch for anomalies
    Watch {
        #[arg(short = 'C', long, value_enum)]
        channel: ChannelArg,
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Run the whole pipeline in-process over the in-memory broker
    Run {
        #[arg(short, long)]
        file: Option<PathBuf>,
        #[arg(short, long)]
        delay_secs: Option<u64>,
    },
    /// Generate default configuration
    Init {
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ChannelArg {
    Smoker,
    FoodA,
    FoodB,
}

impl From<ChannelArg> for ChannelId {
    fn from(arg: ChannelArg) -> Self {
        match arg {
            ChannelArg::Smoker => ChannelId::Smoker,
            ChannelArg::FoodA => ChannelId::FoodA,
            ChannelArg::FoodB => ChannelId::FoodB,
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::new_from_file(path)?,
        None => Settings::new()?,
    };

    match cli.command {
        Commands::Produce {
            file,
            url,
            delay_secs,
        } => handle_produce(file, url, delay_secs, &settings).await?,
        Commands::Watch { channel, url } => handle_watch(channel.into(), url, &settings).await?,
        Commands::Run { file, delay_secs } => handle_run(file, delay_secs, &settings).await?,
        Commands::Init { force } => handle_init(force)?,
    }

    Ok(())
}

async fn handle_produce(
    file: Option<PathBuf>,
    url: Option<String>,
    delay_secs: Option<u64>,
    settings: &Settings,
) -> anyhow::Result<()> {
    let path = file.unwrap_or_else(|| settings.producer.source_file.clone());
    let delay = Duration::from_secs(delay_secs.unwrap_or(settings.producer.delay_secs));
    let url = url.unwrap_or_else(|| settings.broker.url.clone());

    let rows = ReadingSource::new(&path).read_rows()?;
    let broker = AmqpBroker::connect(&url).await?;
    let router = Router::connect(&broker, delay).await?;

    println!(
        "{} Publishing {} rows from {} (one row every {}s)",
        "✓".green(),
        rows.len(),
        path.display(),
        delay.as_secs()
    );
    router.run(&rows).await;
    println!("{} All rows published", "✓".green());
    Ok(())
}

async fn handle_watch(
    channel: ChannelId,
    url: Option<String>,
    settings: &Settings,
) -> anyhow::Result<()> {
    let url = url.unwrap_or_else(|| settings.broker.url.clone());
    let broker = AmqpBroker::connect(&url).await?;
    let queue = broker.open(channel.queue_name()).await?;
    let detector = Detector::new(
        settings.detectors.config_for(channel),
        build_dispatcher(settings)?,
    );

    println!(
        "{} Watching {} on queue {}",
        "✓".green(),
        channel.label().bold(),
        channel.queue_name()
    );
    detector.run(queue).await?;
    Ok(())
}

async fn handle_run(
    file: Option<PathBuf>,
    delay_secs: Option<u64>,
    settings: &Settings,
) -> anyhow::Result<()> {
    let path = file.unwrap_or_else(|| settings.producer.source_file.clone());
    let delay = Duration::from_secs(delay_secs.unwrap_or(settings.producer.delay_secs));

    let rows = ReadingSource::new(&path).read_rows()?;
    let broker = MemoryBroker::new();

    let mut detectors = Vec::new();
    for channel in ChannelId::ALL {
        let queue = broker.open(channel.queue_name()).await?;
        let detector = Detector::new(
            settings.detectors.config_for(channel),
            build_dispatcher(settings)?,
        );
        detectors.push(tokio::spawn(async move {
            if let Err(e) = detector.run(queue).await {
                error!(channel = %channel, error = %e, "Detector stopped");
            }
        }));
    }

    let router = Router::connect(&broker, delay).await?;
    println!(
        "{} Running pipeline in-process: {} rows from {}",
        "✓".green(),
        rows.len(),
        path.display()
    );
    router.run(&rows).await;

    // The detectors block forever by design; wait for them to drain the
    // queues, then stop them.
    while !broker.drained() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    for handle in &detectors {
        handle.abort();
    }
    info!("Pipeline drained; detectors stopped");
    println!("{} Pipeline complete", "✓".green());
    Ok(())
}

fn build_dispatcher(settings: &Settings) -> anyhow::Result<AlertDispatcher> {
    let dispatcher = match settings.notifier.mode {
        NotifierMode::Log => AlertDispatcher::new(Arc::new(LogNotifier)),
        NotifierMode::Sms => {
            let secrets: Box<dyn SecretProvider> = match &settings.notifier.secrets_file {
                Some(path) => Box::new(FileSecrets::load(path)?),
                None => Box::new(EnvSecrets::new(settings.notifier.secrets_env_prefix.clone())),
            };
            AlertDispatcher::new(Arc::new(SmsGatewayNotifier::from_secrets(secrets.as_ref())?))
        }
    };
    Ok(dispatcher)
}

fn handle_init(force: bool) -> anyhow::Result<()> {
    let config_dir = PathBuf::from("config");
    if config_dir.join("default.toml").exists() && !force {
        error!("Configuration already exists. Use --force to overwrite.");
        return Ok(());
    }

    std::fs::create_dir_all(&config_dir)?;
    let default_config = generate_default_config();
    let config_str = toml::to_string_pretty(&default_config)?;
    std::fs::write(config_dir.join("default.toml"), config_str)?;

    println!("{} Default configuration generated", "✓".green());
    Ok(())
}
