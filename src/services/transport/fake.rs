//! Recording in-memory transport used by the engine tests.

use crate::error::{Result, XpropError};
use crate::events::{Atom, WindowClass, WindowEvent, WindowGeometry, WindowId};
use crate::services::actions::{PropertyFormat, PropertyMode};
use std::collections::{HashMap, VecDeque};

use super::r#trait::Transport;

pub const ROOT: WindowId = 1;

/// Запрос, отправленный движком
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    QueryChildren(Vec<WindowId>),
    QueryClasses(Vec<WindowId>),
    ListProperties(WindowId),
    ChangeProperty {
        window: WindowId,
        mode: PropertyMode,
        property: Atom,
        type_: Atom,
        format: PropertyFormat,
        data: Vec<u8>,
    },
    DeleteProperty(WindowId, Atom),
    Map(WindowId),
    Unmap(WindowId),
    Configure(WindowId, WindowGeometry),
    OverrideRedirect(WindowId, bool),
    Grab,
    Ungrab,
}

#[derive(Debug, Default)]
pub struct FakeTransport {
    pub children: HashMap<WindowId, Vec<WindowId>>,
    pub classes: HashMap<WindowId, WindowClass>,
    pub properties: HashMap<WindowId, Vec<Atom>>,
    pub atoms: HashMap<String, Atom>,
    pub refuse_interning: bool,
    pub broken: bool,
    pub requests: Vec<Request>,
    pub pending_events: VecDeque<Vec<WindowEvent>>,
    next_atom: Atom,
    grab_depth: u32,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            next_atom: 300,
            ..Self::default()
        }
    }

    /// Добавить окно с классом под родителя
    pub fn window(&mut self, parent: WindowId, window: WindowId, class: Option<&str>) -> &mut Self {
        self.children.entry(parent).or_default().push(window);
        if let Some(class) = class {
            self.classes
                .insert(window, WindowClass::new(class.to_lowercase(), class));
        }
        self
    }

    pub fn queue_events(&mut self, events: Vec<WindowEvent>) {
        self.pending_events.push_back(events);
    }

    /// Только изменяющие запросы, без чтения дерева
    pub fn effects(&self) -> Vec<Request> {
        self.requests
            .iter()
            .filter(|request| {
                !matches!(
                    request,
                    Request::QueryChildren(_) | Request::QueryClasses(_) | Request::ListProperties(_)
                )
            })
            .cloned()
            .collect()
    }

    fn check(&self) -> Result<()> {
        if self.broken {
            return Err(XpropError::Internal("соединение закрыто".to_string()));
        }
        Ok(())
    }
}

impl Transport for FakeTransport {
    fn roots(&self) -> Vec<WindowId> {
        vec![ROOT]
    }

    fn query_children(&mut self, windows: &[WindowId]) -> Result<Vec<Vec<WindowId>>> {
        self.check()?;
        self.requests.push(Request::QueryChildren(windows.to_vec()));
        Ok(windows
            .iter()
            .map(|window| self.children.get(window).cloned().unwrap_or_default())
            .collect())
    }

    fn query_classes(&mut self, windows: &[WindowId]) -> Result<Vec<Option<WindowClass>>> {
        self.check()?;
        self.requests.push(Request::QueryClasses(windows.to_vec()));
        Ok(windows.iter().map(|window| self.classes.get(window).cloned()).collect())
    }

    fn list_properties(&mut self, window: WindowId) -> Result<Vec<Atom>> {
        self.check()?;
        self.requests.push(Request::ListProperties(window));
        Ok(self.properties.get(&window).cloned().unwrap_or_default())
    }

    fn intern_atom(&mut self, name: &str) -> Result<Option<Atom>> {
        self.check()?;
        if self.refuse_interning {
            return Ok(None);
        }
        if let Some(&atom) = self.atoms.get(name) {
            return Ok(Some(atom));
        }
        let atom = self.next_atom;
        self.next_atom += 1;
        self.atoms.insert(name.to_string(), atom);
        Ok(Some(atom))
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
        self.check()?;
        self.requests.push(Request::ChangeProperty {
            window,
            mode,
            property,
            type_,
            format,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn delete_property(&mut self, window: WindowId, property: Atom) -> Result<()> {
        self.check()?;
        self.requests.push(Request::DeleteProperty(window, property));
        if let Some(present) = self.properties.get_mut(&window) {
            present.retain(|&atom| atom != property);
        }
        Ok(())
    }

    fn map_window(&mut self, window: WindowId) -> Result<()> {
        self.check()?;
        self.requests.push(Request::Map(window));
        Ok(())
    }

    fn unmap_window(&mut self, window: WindowId) -> Result<()> {
        self.check()?;
        self.requests.push(Request::Unmap(window));
        Ok(())
    }

    fn configure_window(&mut self, window: WindowId, geometry: WindowGeometry) -> Result<()> {
        self.check()?;
        self.requests.push(Request::Configure(window, geometry));
        Ok(())
    }

    fn set_override_redirect(&mut self, window: WindowId, enabled: bool) -> Result<()> {
        self.check()?;
        self.requests.push(Request::OverrideRedirect(window, enabled));
        Ok(())
    }

    fn grab_server(&mut self) -> Result<()> {
        self.check()?;
        self.requests.push(Request::Grab);
        Ok(())
    }

    fn ungrab_server(&mut self) -> Result<()> {
        self.requests.push(Request::Ungrab);
        Ok(())
    }

    fn grab_depth(&mut self) -> &mut u32 {
        &mut self.grab_depth
    }

    fn flush(&mut self) -> Result<()> {
        self.check()
    }

    fn poll_events(&mut self) -> Result<Vec<WindowEvent>> {
        self.check()?;
        Ok(self.pending_events.pop_front().unwrap_or_default())
    }
}
