use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::services::SessionOptions;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Имя дисплея; по умолчанию берётся $DISPLAY
    #[serde(default)]
    pub display: Option<String>,
    #[serde(default = "default_true")]
    pub reparent_as_unmap: bool,
    #[serde(default = "default_true")]
    pub grab_during_scan: bool,
}

/// Правило в том виде, как оно записано в конфигурации
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleConfig {
    /// Путь классов через точку: "Outer.Inner"
    pub class: String,
    #[serde(default)]
    pub actions: Vec<ActionConfig>,
}

/// Сырое описание действия; проверяется при загрузке правил
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ActionConfig {
    pub action: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub property: Option<AtomRef>,
    #[serde(default, rename = "type")]
    pub type_: Option<AtomRef>,
    #[serde(default)]
    pub format: Option<u8>,
    #[serde(default)]
    pub data: Option<PropertyData>,
    #[serde(default)]
    pub x: Option<i32>,
    #[serde(default)]
    pub y: Option<i32>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// Атом задаётся номером или именем
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AtomRef {
    Id(u32),
    Name(String),
}

/// Данные свойства: строка (UTF-8) или массив байт
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PropertyData {
    Text(String),
    Bytes(Vec<u8>),
}

impl PropertyData {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            PropertyData::Text(text) => text.as_bytes().to_vec(),
            PropertyData::Bytes(bytes) => bytes.clone(),
        }
    }
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            display: None,
            reparent_as_unmap: true,
            grab_during_scan: true,
        }
    }
}

impl SessionConfig {
    pub fn options(&self) -> SessionOptions {
        SessionOptions {
            reparent_as_unmap: self.reparent_as_unmap,
            grab_during_scan: self.grab_during_scan,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("XPROP_").split("__"));

        Self::from_figment(figment)
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "full" | "compact" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        if let Some(display) = &self.session.display {
            if display.is_empty() {
                anyhow::bail!("Пустое имя дисплея в session.display");
            }
        }

        // Содержимое правил проверяется при загрузке, здесь только классы
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.class.trim().is_empty() {
                anyhow::bail!("Пустой класс в правиле #{}", i + 1);
            }
        }

        Ok(())
    }
}
