use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use baeum::catalog::Catalog;
use baeum::chat::ChatProxy;
use baeum::config::Config;
use baeum::posting::{FilePostLog, PostLog, Poster, TelegramChannel};
use baeum::rotation::FileStateStore;
use baeum::scheduler::PostTrigger;
use baeum::server::BotServer;

#[derive(Parser)]
#[command(
    name = "baeum",
    version,
    about = "Learning-topic posting bot with catalog rotation and scheduled delivery",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file (defaults to environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server and the posting schedule
    Serve,

    /// Post topics now, outside the schedule
    Post {
        /// Number of rotation topics to post
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        /// Post this specific topic id instead of rotating
        #[arg(long)]
        id: Option<String>,

        /// Pick uniformly at random among unposted topics
        #[arg(long, default_value = "false")]
        random: bool,
    },

    /// Show the next rotation candidates without posting
    Preview {
        /// Number of candidates to show
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },

    /// Show rotation progress
    Status,

    /// Show recent posting log entries
    Logs {
        /// Maximum entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate()?;

    setup_tracing(&cli.log_format, cli.verbose)?;

    match cli.command {
        Commands::Serve => serve(config).await?,

        Commands::Post { count, id, random } => {
            let poster = build_poster(&config, true)?;
            let report = match id {
                Some(id) => poster.run_topic(&id).await,
                None if random => poster.run_random().await,
                None => poster.run(count).await,
            };

            for id in &report.posted {
                println!("posted: {id}");
            }
            for error in &report.errors {
                eprintln!("error: {error}");
            }
            if !report.success() {
                std::process::exit(1);
            }
        }

        Commands::Preview { count } => {
            let poster = build_poster(&config, false)?;
            let topics = poster
                .preview(count)
                .await
                .context("Selection failed")?;

            for topic in topics {
                println!("{} [{}] {}", topic.id, topic.category_id, topic.title);
            }
        }

        Commands::Status => {
            let poster = build_poster(&config, false)?;
            let status = poster.status().await;

            println!(
                "Cycle: {}/{} posted",
                status.posted_this_cycle, status.catalog_size
            );
            if let Some(date) = status.last_post_date {
                println!("Last post: {date}");
            }
            for cat in &status.categories {
                println!("  {}: {}/{}", cat.category_id, cat.posted, cat.total);
            }
        }

        Commands::Logs { limit } => {
            let log = FilePostLog::new(&config.posting.log_path);
            let entries = log.recent(limit).await.context("Failed to read log")?;

            if entries.is_empty() {
                println!("No posting log entries yet");
            }
            for entry in entries {
                let topic = entry.topic_id.as_deref().unwrap_or("-");
                match entry.error {
                    Some(error) => println!("{} {:7} {} ({})", entry.timestamp, "error", topic, error),
                    None => println!(
                        "{} {:7} {} (message {})",
                        entry.timestamp,
                        "success",
                        topic,
                        entry.message_id.unwrap_or_default()
                    ),
                }
            }
        }
    }

    Ok(())
}

/// Run the server together with the schedule trigger until interrupted
async fn serve(config: Config) -> Result<()> {
    let poster = build_poster(&config, true)?;
    let log: Arc<dyn PostLog> = Arc::new(FilePostLog::new(&config.posting.log_path));
    let chat = Arc::new(ChatProxy::new(config.chat.clone())?);

    let trigger = Arc::new(PostTrigger::new(config.schedule.clone(), poster.clone())?);
    let server = BotServer::new(config.server.clone(), poster, log, chat);

    let trigger_handle = {
        let trigger = trigger.clone();
        tokio::spawn(async move {
            if let Err(e) = trigger.start().await {
                tracing::error!(error = %e, "Posting schedule terminated");
            }
        })
    };

    server
        .start_with_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await
        .context("Server failed")?;

    trigger.stop().await;
    let _ = trigger_handle.await;

    Ok(())
}

/// Wire the orchestrator from config
///
/// `with_channel` commands talk to Telegram and need valid credentials;
/// read-only commands skip that check and use a stub channel that is never
/// invoked.
fn build_poster(config: &Config, with_channel: bool) -> Result<Arc<Poster>> {
    let catalog = Arc::new(
        Catalog::from_file(&config.catalog.path).with_context(|| {
            format!("Failed to load catalog from {}", config.catalog.path.display())
        })?,
    );

    let store = Arc::new(FileStateStore::new(&config.posting.state_path));
    let log = Arc::new(FilePostLog::new(&config.posting.log_path));

    let channel: Arc<dyn baeum::posting::ChannelClient> = if with_channel {
        config.validate_channel()?;
        Arc::new(TelegramChannel::new(config.telegram.clone())?)
    } else {
        Arc::new(NullChannel)
    };

    Ok(Arc::new(
        Poster::new(catalog, store, log, channel).with_pause(config.pause_between_sends()),
    ))
}

/// Placeholder channel for read-only commands
struct NullChannel;

#[async_trait::async_trait]
impl baeum::posting::ChannelClient for NullChannel {
    fn name(&self) -> &str {
        "null"
    }

    async fn send(
        &self,
        _text: &str,
    ) -> Result<baeum::posting::SentMessage, baeum::posting::ChannelError> {
        Err(baeum::posting::ChannelError::InvalidConfig(
            "no channel configured".to_string(),
        ))
    }
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("baeum=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("baeum=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
