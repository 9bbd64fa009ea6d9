use crate::debug_if_enabled;
use crate::error::{Result, XpropError};
use crate::events::{Atom, WindowClass, WindowEvent, WindowGeometry, WindowId};
use crate::services::actions::{PropertyFormat, PropertyMode};
use std::os::unix::io::{AsRawFd, RawFd};
use tracing::{debug, info};
use x11rb::connection::Connection;
use x11rb::errors::{ConnectionError, ReplyError};
use x11rb::properties::WmClass;
use x11rb::protocol::xproto::{
    ChangeWindowAttributesAux, ConfigureWindowAux, ConnectionExt as _, EventMask, PropMode,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use super::r#trait::Transport;

/// Сессия с реальным X-сервером через x11rb
pub struct X11Transport {
    conn: RustConnection,
    roots: Vec<WindowId>,
    dry_run: bool,
    grab_depth: u32,
}

/// Дескриптор соединения, по готовности которого просыпается наблюдатель окон
#[derive(Debug, Clone, Copy)]
pub struct ConnectionFd(RawFd);

impl AsRawFd for ConnectionFd {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

impl X11Transport {
    pub fn connect(display_name: Option<&str>, dry_run: bool) -> Result<Self> {
        let shown = display_name.unwrap_or("$DISPLAY");
        info!("Подключение к X-серверу {} (dry_run: {})", shown, dry_run);

        let (conn, screen_num) = x11rb::connect(display_name)?;
        let roots: Vec<WindowId> = conn.setup().roots.iter().map(|screen| screen.root).collect();
        info!(
            "Соединение установлено: {} экран(ов), экран по умолчанию #{}",
            roots.len(),
            screen_num
        );

        let transport = Self {
            conn,
            roots,
            dry_run,
            grab_depth: 0,
        };
        transport.watch_roots()?;
        Ok(transport)
    }

    /// Подписка на структурные события всех корневых окон
    fn watch_roots(&self) -> Result<()> {
        let aux = ChangeWindowAttributesAux::new().event_mask(EventMask::SUBSTRUCTURE_NOTIFY);
        for &root in &self.roots {
            self.conn.change_window_attributes(root, &aux)?.check()?;
            info!("Отслеживаем структурные события корня 0x{:x}", root);
        }
        self.conn.flush()?;
        Ok(())
    }

    pub fn connection_fd(&self) -> ConnectionFd {
        ConnectionFd(self.conn.stream().as_raw_fd())
    }

    fn skip_in_dry_run(&self, what: std::fmt::Arguments<'_>) -> bool {
        if self.dry_run {
            info!("[DRY RUN] {}", what);
        }
        self.dry_run
    }
}

/// Ошибка X11 в ответе означает, что окно исчезло: это не сбой
fn vanished<T>(result: std::result::Result<T, ReplyError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ReplyError::X11Error(e)) => {
            debug_if_enabled!("Ответ не получен (окно исчезло?): {:?}", e.error_kind);
            Ok(None)
        }
        Err(ReplyError::ConnectionError(e)) => Err(XpropError::Connection(e)),
    }
}

/// WM_CLASS с чужим типом или форматом x11rb отдаёт как ошибку разбора;
/// такое окно просто остаётся без класса
fn class_from_reply(
    result: std::result::Result<Option<WmClass>, ReplyError>,
) -> Result<Option<WindowClass>> {
    let wm_class = match result {
        Err(ReplyError::ConnectionError(ConnectionError::ParseError(e))) => {
            debug_if_enabled!("WM_CLASS не разобран: {:?}", e);
            None
        }
        other => vanished(other)?.flatten(),
    };
    Ok(wm_class.map(|wm_class| {
        WindowClass::new(
            String::from_utf8_lossy(wm_class.instance()),
            String::from_utf8_lossy(wm_class.class()),
        )
    }))
}

fn prop_mode(mode: PropertyMode) -> PropMode {
    match mode {
        PropertyMode::Replace => PropMode::REPLACE,
        PropertyMode::Prepend => PropMode::PREPEND,
        PropertyMode::Append => PropMode::APPEND,
    }
}

impl Transport for X11Transport {
    fn roots(&self) -> Vec<WindowId> {
        self.roots.clone()
    }

    fn query_children(&mut self, windows: &[WindowId]) -> Result<Vec<Vec<WindowId>>> {
        let cookies = windows
            .iter()
            .map(|&window| self.conn.query_tree(window))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut children = Vec::with_capacity(cookies.len());
        for cookie in cookies {
            let reply = vanished(cookie.reply())?;
            children.push(reply.map(|tree| tree.children).unwrap_or_default());
        }
        Ok(children)
    }

    fn query_classes(&mut self, windows: &[WindowId]) -> Result<Vec<Option<WindowClass>>> {
        let cookies = windows
            .iter()
            .map(|&window| WmClass::get(&self.conn, window))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut classes = Vec::with_capacity(cookies.len());
        for cookie in cookies {
            classes.push(class_from_reply(cookie.reply())?);
        }
        Ok(classes)
    }

    fn list_properties(&mut self, window: WindowId) -> Result<Vec<Atom>> {
        let reply = vanished(self.conn.list_properties(window)?.reply())?;
        Ok(reply.map(|list| list.atoms).unwrap_or_default())
    }

    fn intern_atom(&mut self, name: &str) -> Result<Option<Atom>> {
        let reply = vanished(self.conn.intern_atom(false, name.as_bytes())?.reply())?;
        Ok(reply.map(|reply| reply.atom))
    }

    fn change_property(
        &mut self,
        window: WindowId,
        mode: PropertyMode,
        property: Atom,
        type_: Atom,
        format: PropertyFormat,
        data: &[u8],
    ) -> Result<()> {
        if self.skip_in_dry_run(format_args!(
            "ChangeProperty 0x{:x}: property={} type={} format={} ({} байт)",
            window,
            property,
            type_,
            format.bits(),
            data.len()
        )) {
            return Ok(());
        }
        let data_len = format.element_count(data.len());
        self.conn
            .change_property(prop_mode(mode), window, property, type_, format.bits(), data_len, data)?;
        Ok(())
    }

    fn delete_property(&mut self, window: WindowId, property: Atom) -> Result<()> {
        if self.skip_in_dry_run(format_args!("DeleteProperty 0x{:x}: {}", window, property)) {
            return Ok(());
        }
        self.conn.delete_property(window, property)?;
        Ok(())
    }

    fn map_window(&mut self, window: WindowId) -> Result<()> {
        if self.skip_in_dry_run(format_args!("MapWindow 0x{:x}", window)) {
            return Ok(());
        }
        self.conn.map_window(window)?;
        Ok(())
    }

    fn unmap_window(&mut self, window: WindowId) -> Result<()> {
        if self.skip_in_dry_run(format_args!("UnmapWindow 0x{:x}", window)) {
            return Ok(());
        }
        self.conn.unmap_window(window)?;
        Ok(())
    }

    fn configure_window(&mut self, window: WindowId, geometry: WindowGeometry) -> Result<()> {
        if self.skip_in_dry_run(format_args!("ConfigureWindow 0x{:x}: {}", window, geometry)) {
            return Ok(());
        }
        let aux = ConfigureWindowAux::new()
            .x(geometry.x)
            .y(geometry.y)
            .width(geometry.width)
            .height(geometry.height);
        self.conn.configure_window(window, &aux)?;
        Ok(())
    }

    fn set_override_redirect(&mut self, window: WindowId, enabled: bool) -> Result<()> {
        if self.skip_in_dry_run(format_args!("OverrideRedirect 0x{:x}: {}", window, enabled)) {
            return Ok(());
        }
        let aux = ChangeWindowAttributesAux::new().override_redirect(u32::from(enabled));
        self.conn.change_window_attributes(window, &aux)?;
        Ok(())
    }

    fn grab_server(&mut self) -> Result<()> {
        if self.skip_in_dry_run(format_args!("GrabServer")) {
            return Ok(());
        }
        self.conn.grab_server()?;
        Ok(())
    }

    fn ungrab_server(&mut self) -> Result<()> {
        if self.skip_in_dry_run(format_args!("UngrabServer")) {
            return Ok(());
        }
        self.conn.ungrab_server()?;
        Ok(())
    }

    fn grab_depth(&mut self) -> &mut u32 {
        &mut self.grab_depth
    }

    fn flush(&mut self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }

    fn poll_events(&mut self) -> Result<Vec<WindowEvent>> {
        let mut events = Vec::new();
        while let Some(event) = self.conn.poll_for_event()? {
            let event = match event {
                Event::MapNotify(e) => WindowEvent::Map { window: e.window },
                Event::UnmapNotify(e) => WindowEvent::Unmap { window: e.window },
                Event::ReparentNotify(e) => WindowEvent::Reparent {
                    window: e.window,
                    parent: e.parent,
                },
                Event::DestroyNotify(e) => WindowEvent::Destroy { window: e.window },
                Event::Error(e) => {
                    // Асинхронные ошибки запросов к уже исчезнувшим окнам
                    debug!(
                        "Ошибка X11 {:?} для ресурса 0x{:x} (major {})",
                        e.error_kind, e.bad_value, e.major_opcode
                    );
                    WindowEvent::Other
                }
                _ => WindowEvent::Other,
            };
            events.push(event);
        }
        Ok(events)
    }
}
