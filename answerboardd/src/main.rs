use answerboard_core::{config::Config, run_feed};
use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "answerboardd", about = "Answerboard feed daemon")]
struct Args {
    /// Путь к конфигу
    #[arg(short, long, default_value = "/etc/answerboard/answerboard.yml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::load(&args.config)?;

    tracing::info!("Starting answerboard daemon");

    // Создаём канал для graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Создаём задачу для обработки сигналов завершения
    tokio::spawn(async move {
        let _ = signal::ctrl_c().await;
        tracing::info!("Received SIGINT/SIGTERM, initiating graceful shutdown");
        let _ = shutdown_tx.send(true);
    });

    // Запускаем ленту с каналом shutdown
    run_feed(config, shutdown_rx).await
}
