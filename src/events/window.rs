use serde::{Deserialize, Serialize};
use std::fmt;

/// Идентификатор окна X11
pub type WindowId = u32;

/// Идентификатор атома X11
pub type Atom = u32;

/// Пара WM_CLASS окна (instance, class)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowClass {
    pub instance: String,
    pub class: String,
}

impl WindowClass {
    pub fn new(instance: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            class: class.into(),
        }
    }

    /// Метка, по которой сопоставляются правила (вторая строка WM_CLASS)
    pub fn label(&self) -> &str {
        &self.class
    }
}

impl fmt::Display for WindowClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" ({})", self.class, self.instance)
    }
}

/// Геометрия окна
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for WindowGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Переход жизненного цикла, которого может ожидать отложенное действие
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleKind {
    Map,
    Unmap,
}

impl fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleKind::Map => write!(f, "Map"),
            LifecycleKind::Unmap => write!(f, "Unmap"),
        }
    }
}

/// Структурное событие, полученное от X-сервера
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Map { window: WindowId },
    Unmap { window: WindowId },
    Reparent { window: WindowId, parent: WindowId },
    Destroy { window: WindowId },
    Other,
}

impl fmt::Display for WindowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowEvent::Map { window } => write!(f, "MapNotify(0x{:x})", window),
            WindowEvent::Unmap { window } => write!(f, "UnmapNotify(0x{:x})", window),
            WindowEvent::Reparent { window, parent } => {
                write!(f, "ReparentNotify(0x{:x} -> 0x{:x})", window, parent)
            }
            WindowEvent::Destroy { window } => write!(f, "DestroyNotify(0x{:x})", window),
            WindowEvent::Other => write!(f, "Other"),
        }
    }
}
