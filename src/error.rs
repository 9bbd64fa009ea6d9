use thiserror::Error;

#[derive(Error, Debug)]
pub enum XpropError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Некорректное правило: {0}")]
    MalformedRule(String),

    #[error("Не удалось подключиться к X-серверу: {0}")]
    Connect(#[from] x11rb::errors::ConnectError),

    #[error("Соединение с X-сервером потеряно: {0}")]
    Connection(#[from] x11rb::errors::ConnectionError),

    #[error("Ошибка ответа X-сервера: {0}")]
    Reply(#[from] x11rb::errors::ReplyError),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl XpropError {
    pub fn malformed_rule<T>(msg: impl Into<String>) -> Result<T> {
        Err(XpropError::MalformedRule(msg.into()))
    }
}

pub type Result<T> = std::result::Result<T, XpropError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! xprop_error {
    (malformed_rule, $($arg:tt)*) => {
        $crate::error::XpropError::MalformedRule(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::XpropError::Internal(format!($($arg)*))
    };
}
