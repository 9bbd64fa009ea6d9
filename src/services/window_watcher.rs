use crate::error::Result;
use crate::services::lifecycle::Session;
use crate::services::transport::{ConnectionFd, Transport};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::unix::AsyncFd;
use tracing::{debug, info};

/// Общая сессия: и загрузка правил, и обработка событий идут через этот замок
pub type SharedSession<T> = Arc<Mutex<Session<T>>>;

/// Просыпается, когда дескриптор X-соединения готов к чтению,
/// и разбирает накопившиеся события через сессию.
pub struct WindowWatcher<T: Transport> {
    session: SharedSession<T>,
    fd: AsyncFd<ConnectionFd>,
}

impl<T: Transport> WindowWatcher<T> {
    pub fn new(session: SharedSession<T>, fd: ConnectionFd) -> Result<Self> {
        info!("Инициализация WindowWatcher");
        Ok(Self {
            session,
            fd: AsyncFd::new(fd)?,
        })
    }

    pub async fn run(self) -> Result<()> {
        info!("WindowWatcher запущен, ожидаем события X-сервера");

        loop {
            self.drain()?;

            let mut guard = self.fd.readable().await?;
            guard.clear_ready();
        }
    }

    /// x11rb может прочитать события в буфер, пока ждёт ответы,
    /// поэтому опрашиваем до пустой очереди
    fn drain(&self) -> Result<()> {
        let mut session = self.session.lock();
        let mut total = 0;
        loop {
            let count = session.dispatch_events()?;
            if count == 0 {
                break;
            }
            total += count;
        }
        if total > 0 {
            debug!(
                "Обработано {} событий, ожидают {} записей журнала",
                total,
                session.pending_count()
            );
        }
        Ok(())
    }
}

impl<T: Transport> Drop for WindowWatcher<T> {
    fn drop(&mut self) {
        info!("WindowWatcher завершает работу");
    }
}
