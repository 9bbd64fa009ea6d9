use crate::error::{XpropError, Result};
use tracing::info;

/// Выбрать дисплей: аргумент командной строки, затем конфигурация, затем $DISPLAY.
/// `None` означает, что x11rb возьмёт $DISPLAY сам.
pub fn resolve_display(cli: Option<&str>, configured: Option<&str>) -> Result<Option<String>> {
    if let Some(name) = cli.or(configured) {
        info!("Используется дисплей {}", name);
        return Ok(Some(name.to_string()));
    }

    match std::env::var("DISPLAY") {
        Ok(name) if !name.is_empty() => {
            info!("Используется $DISPLAY={}", name);
            Ok(None)
        }
        _ => Err(XpropError::Internal(
            "Дисплей не задан: укажите --display, session.display или переменную DISPLAY".to_string(),
        )),
    }
}
