use std::{
    io::BufRead,
    path::PathBuf,
    sync::Arc,
    thread,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::Context;
use chatcore::{init_logging, Broker, CancellationToken, Message, PublishError, Settings};
use clap::Parser;
use tokio::sync::mpsc;

/// Локальная чат-консоль поверх брокера.
///
/// Строка `@bob текст` отправляется лично `bob`, любая другая строка
/// рассылается всем зарегистрированным пользователям.
#[derive(Debug, Parser)]
#[command(name = "chatcore", version, about)]
struct Args {
    /// Файл настроек (toml, yaml, json).
    #[arg(short, long, env = "CHATCORE_CONFIG")]
    config: Option<PathBuf>,

    /// Уровень логирования поверх настроек.
    #[arg(long)]
    log_level: Option<String>,

    /// Пользователи, для которых создаются inbox'ы.
    #[arg(short, long, value_delimiter = ',', default_value = "alice,bob")]
    users: Vec<String>,

    /// От чьего имени отправляются строки из stdin.
    #[arg(long = "as", default_value = "alice")]
    sender: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings =
        Settings::load(args.config.as_deref()).context("failed to load settings")?;
    if let Some(level) = args.log_level {
        settings.logging.level = level;
    }
    let logging = init_logging(settings.logging.clone()).context("failed to init logging")?;

    let root = CancellationToken::new();
    let broker = Arc::new(Broker::from_config(root.clone(), &settings.broker));
    let event_loop = broker.spawn();

    let mut readers = Vec::with_capacity(args.users.len());
    for user in &args.users {
        let mut sub = broker
            .subscribe(user, settings.broker.inbox_capacity)
            .with_context(|| format!("failed to register '{user}'"))?;
        let me = user.clone();
        let token = root.clone();
        readers.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    msg = sub.recv() => match msg {
                        Some(msg) => tracing::info!(
                            to = %me,
                            from = %msg.sender,
                            broadcast = msg.broadcast,
                            content = %msg.content,
                            "message received"
                        ),
                        None => break,
                    },
                }
            }
        }));
    }

    let mut lines = spawn_stdin_reader();
    tokio::select! {
        res = wait_for_shutdown_signal() => {
            res.context("failed to install signal handlers")?;
            tracing::info!("shutdown signal received");
        }
        _ = pump_console(&broker, &args.sender, &mut lines) => {
            tracing::info!("console input closed");
        }
    }

    root.cancel();
    event_loop.await.context("broker task panicked")??;
    for reader in readers {
        let _ = reader.await;
    }

    tracing::info!(stats = ?broker.stats(), "broker stopped");
    logging.shutdown();
    Ok(())
}

/// Публикует строки консоли, пока вход не закрыт или брокер не остановлен.
async fn pump_console(
    broker: &Broker,
    sender: &str,
    lines: &mut mpsc::Receiver<String>,
) {
    while let Some(line) = lines.recv().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match broker.publish(parse_line(sender, line, unix_now())) {
            Ok(()) => {}
            Err(e @ PublishError::QueueFull { .. }) => {
                tracing::warn!(error = %e, "message not sent");
            }
            Err(PublishError::Cancelled) => break,
        }
    }
}

/// Чтение stdin в отдельном потоке: блокирующий read не держит runtime
/// при завершении.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn parse_line(
    sender: &str,
    line: &str,
    timestamp: i64,
) -> Message {
    match line.strip_prefix('@').and_then(|rest| rest.split_once(' ')) {
        Some((recipient, text)) if !recipient.is_empty() => {
            Message::private(sender, recipient, text.trim(), timestamp)
        }
        _ => Message::broadcast(sender, line, timestamp),
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Ждёт SIGINT, SIGTERM или SIGQUIT.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Ждёт Ctrl-C.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
