use anyhow::Result;
use clap::Parser;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
mod config;
mod error;
mod events;
mod mappings;
mod services;
mod utils;

use config::Config;
use mappings::PredefinedAtoms;
use services::{load_rule, Session, SharedSession, WindowWatcher, X11Transport};

#[derive(Parser, Debug)]
#[command(name = "xprop-rust")]
#[command(about = "Применяет правила к окнам X11 по иерархии WM_CLASS")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "xprop.toml")]
    config: String,

    /// X-дисплей (по умолчанию session.display или $DISPLAY)
    #[arg(long)]
    display: Option<String>,

    /// Режим сухого запуска (изменяющие запросы только логируются)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (перекрывает logging.level)
    #[arg(long)]
    log_level: Option<String>,

    /// Вывести таблицу предопределённых атомов и выйти
    #[arg(long)]
    list_atoms: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_atoms {
        for (name, atom) in PredefinedAtoms::all() {
            println!("{:>3} {}", atom, name);
        }
        return Ok(());
    }

    // Загрузка конфигурации
    let config = Config::load(&args.config)?;

    // Инициализация системы логирования
    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing(level, &config.logging.format)?;

    info!("Запуск xprop-rust v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    if args.dry_run {
        warn!("Режим сухого запуска - окна не изменяются");
    }

    let display = utils::resolve_display(args.display.as_deref(), config.session.display.as_deref())?;
    let transport = X11Transport::connect(display.as_deref(), args.dry_run)?;
    let fd = transport.connection_fd();

    let session: SharedSession<X11Transport> =
        Arc::new(Mutex::new(Session::new(transport, config.session.options())));

    // Правила добавляются до первого прохода; ошибка в любом из них фатальна
    {
        let mut session = session.lock();
        for rule in &config.rules {
            let loaded = load_rule(rule, session.transport_mut())?;
            session.add_rule(loaded.labels, loaded.actions)?;
        }
        info!("Загружено правил: {}", session.rule_count());

        let report = session.start_scan()?;
        info!(
            "Начальный проход: {} совпадений, ожидают {} записей журнала",
            report.matches,
            session.pending_count()
        );
    }

    let watcher = WindowWatcher::new(session.clone(), fd)?;
    let mut watcher_handle = tokio::spawn(watcher.run());

    info!("Все сервисы запущены");

    // Ожидание сигнала завершения или падения наблюдателя
    let mut fatal = None;
    let mut watcher_finished = false;
    tokio::select! {
        result = signal::ctrl_c() => match result {
            Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
            Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
        },
        result = &mut watcher_handle => {
            watcher_finished = true;
            match result {
                Ok(Ok(())) => warn!("WindowWatcher завершился без ошибки"),
                Ok(Err(e)) => {
                    error!("Ошибка в WindowWatcher: {}", e);
                    fatal = Some(anyhow::Error::from(e));
                }
                Err(e) => {
                    error!("Задача WindowWatcher аварийно завершилась: {}", e);
                    fatal = Some(anyhow::Error::from(e));
                }
            }
        },
    }

    info!("Завершение работы...");

    if !watcher_finished {
        watcher_handle.abort();

        let shutdown_timeout = tokio::time::Duration::from_secs(5);
        match tokio::time::timeout(shutdown_timeout, watcher_handle).await {
            Ok(_) => info!("WindowWatcher остановлен"),
            Err(_) => warn!("Таймаут при остановке WindowWatcher"),
        }
    }

    {
        let session = session.lock();
        if session.pending_count() > 0 {
            info!("Незавершённых записей журнала: {}", session.pending_count());
        }
    }

    if let Some(e) = fatal {
        return Err(e);
    }

    info!("xprop-rust завершил работу");
    Ok(())
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        "full" => registry.with(tracing_subscriber::fmt::layer()).init(),
        _ => registry.with(tracing_subscriber::fmt::layer().compact()).init(),
    }

    Ok(())
}
