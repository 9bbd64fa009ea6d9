use crate::debug_if_enabled;
use crate::error::Result;
use crate::events::{Atom, LifecycleKind, WindowGeometry, WindowId};
use crate::mappings::atoms;
use crate::services::transport::Transport;
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::ops::{Deref, DerefMut};
use tracing::{debug, warn};

/// Режим записи свойства
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyMode {
    Replace,
    Prepend,
    Append,
}

impl PropertyMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "replace" => Some(PropertyMode::Replace),
            "prepend" => Some(PropertyMode::Prepend),
            "append" => Some(PropertyMode::Append),
            _ => None,
        }
    }
}

/// Формат данных свойства: размер элемента в битах
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyFormat {
    Eight,
    Sixteen,
    ThirtyTwo,
}

impl PropertyFormat {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            8 => Some(PropertyFormat::Eight),
            16 => Some(PropertyFormat::Sixteen),
            32 => Some(PropertyFormat::ThirtyTwo),
            _ => None,
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            PropertyFormat::Eight => 8,
            PropertyFormat::Sixteen => 16,
            PropertyFormat::ThirtyTwo => 32,
        }
    }

    /// Размер одного элемента в байтах
    pub fn unit(self) -> usize {
        usize::from(self.bits() / 8)
    }

    /// Количество элементов для поля data_len запроса ChangeProperty
    pub fn element_count(self, len: usize) -> u32 {
        u32::try_from(len / self.unit()).unwrap_or(u32::MAX)
    }
}

/// Запись свойства окна
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyWrite {
    pub mode: PropertyMode,
    pub property: Atom,
    pub type_: Atom,
    pub format: PropertyFormat,
    pub data: Vec<u8>,
}

/// Эффект, применяемый к окну
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetProperty(PropertyWrite),
    Map,
    Unmap,
    Remap,
    ClearProperties,
    Configure(WindowGeometry),
    OverrideRedirect(bool),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::SetProperty(write) => write!(
                f,
                "SetProperty({} = {} байт)",
                atoms::PredefinedAtoms::name_of(write.property)
                    .map(str::to_string)
                    .unwrap_or_else(|| write.property.to_string()),
                write.data.len()
            ),
            Action::Map => write!(f, "Map"),
            Action::Unmap => write!(f, "Unmap"),
            Action::Remap => write!(f, "Remap"),
            Action::ClearProperties => write!(f, "ClearProperties"),
            Action::Configure(geometry) => write!(f, "Configure({})", geometry),
            Action::OverrideRedirect(enabled) => write!(f, "OverrideRedirect({})", enabled),
        }
    }
}

/// Свойства, которые ClearProperties никогда не удаляет
const PROTECTED_PROPERTIES: [Atom; 3] = [atoms::WM_CLASS, atoms::WM_NAME, atoms::WM_NORMAL_HINTS];

impl Action {
    /// Отправить запросы действия. Возвращает событие, которого теперь
    /// следует ждать для этого окна (только для Map/Unmap).
    pub fn execute<T: Transport>(&self, transport: &mut T, window: WindowId) -> Result<Option<LifecycleKind>> {
        debug_if_enabled!("Применяем {} к окну 0x{:x}", self, window);

        match self {
            Action::SetProperty(write) => {
                set_property(transport, window, write)?;
                Ok(None)
            }
            Action::Map => {
                transport.map_window(window)?;
                Ok(Some(LifecycleKind::Map))
            }
            Action::Unmap => {
                transport.unmap_window(window)?;
                Ok(Some(LifecycleKind::Unmap))
            }
            Action::Remap => {
                transport.unmap_window(window)?;
                transport.map_window(window)?;
                Ok(None)
            }
            Action::ClearProperties => {
                clear_properties(transport, window)?;
                Ok(None)
            }
            Action::Configure(geometry) => {
                transport.configure_window(window, *geometry)?;
                Ok(None)
            }
            Action::OverrideRedirect(enabled) => {
                transport.set_override_redirect(window, *enabled)?;
                Ok(None)
            }
        }
    }
}

fn set_property<T: Transport>(transport: &mut T, window: WindowId, write: &PropertyWrite) -> Result<()> {
    let (format, data) = if write.type_ == atoms::ATOM {
        // Данные типа ATOM задаются именем атома
        let name = String::from_utf8_lossy(&write.data);
        let atom = match transport.intern_atom(&name)? {
            Some(atom) => atom,
            None => {
                warn!("Не удалось получить атом '{}', записываем NONE", name);
                atoms::NONE
            }
        };
        (PropertyFormat::ThirtyTwo, Cow::Owned(atom.to_ne_bytes().to_vec()))
    } else {
        (write.format, Cow::Borrowed(write.data.as_slice()))
    };

    transport.change_property(window, write.mode, write.property, write.type_, format, &data)
}

fn clear_properties<T: Transport>(transport: &mut T, window: WindowId) -> Result<()> {
    let mut grab = ServerGrab::new(transport)?;

    let wm_state = grab.intern_atom("WM_STATE")?;
    let present = grab.list_properties(window)?;

    let mut seen = HashSet::with_capacity(present.len());
    let mut deleted = 0usize;
    for property in present {
        if PROTECTED_PROPERTIES.contains(&property) || Some(property) == wm_state {
            continue;
        }
        if !seen.insert(property) {
            continue;
        }
        grab.delete_property(window, property)?;
        deleted += 1;
    }

    debug!("Удалено {} свойств окна 0x{:x}", deleted, window);
    Ok(())
}

/// Захват сервера на время жизни значения; освобождается в Drop на любом пути выхода.
/// Захваты X-сервера не считаются, поэтому вложенный guard только
/// увеличивает глубину, а GrabServer/UngrabServer шлёт внешний.
pub struct ServerGrab<'a, T: Transport> {
    transport: &'a mut T,
}

impl<'a, T: Transport> ServerGrab<'a, T> {
    pub fn new(transport: &'a mut T) -> Result<Self> {
        if *transport.grab_depth() == 0 {
            transport.grab_server()?;
        }
        *transport.grab_depth() += 1;
        Ok(Self { transport })
    }
}

impl<T: Transport> Deref for ServerGrab<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.transport
    }
}

impl<T: Transport> DerefMut for ServerGrab<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.transport
    }
}

impl<T: Transport> Drop for ServerGrab<'_, T> {
    fn drop(&mut self) {
        let depth = self.transport.grab_depth();
        *depth = depth.saturating_sub(1);
        if *depth > 0 {
            return;
        }
        if let Err(e) = self.transport.ungrab_server() {
            warn!("Не удалось освободить захват сервера: {}", e);
        }
        if let Err(e) = self.transport.flush() {
            warn!("Не удалось отправить UngrabServer: {}", e);
        }
    }
}
