use crate::error::Result;
use crate::events::{Atom, WindowClass, WindowEvent, WindowGeometry, WindowId};
use crate::services::actions::{PropertyFormat, PropertyMode};

/// Trait for the protocol session the rule engine drives.
///
/// Batch queries (`query_classes`, `query_children`) must issue every request
/// before reading the first reply. A window that vanished before answering is
/// reported as `None` / no children, never as an error; only a broken
/// connection is an error.
pub trait Transport {
    /// Root windows of all screens
    fn roots(&self) -> Vec<WindowId>;

    /// Children of every window in the batch, in stacking order
    fn query_children(&mut self, windows: &[WindowId]) -> Result<Vec<Vec<WindowId>>>;

    /// WM_CLASS of every window in the batch
    fn query_classes(&mut self, windows: &[WindowId]) -> Result<Vec<Option<WindowClass>>>;

    fn list_properties(&mut self, window: WindowId) -> Result<Vec<Atom>>;

    /// `None` if the server refused to intern the name
    fn intern_atom(&mut self, name: &str) -> Result<Option<Atom>>;

    fn change_property(
        &mut self,
        window: WindowId,
        mode: PropertyMode,
        property: Atom,
        type_: Atom,
        format: PropertyFormat,
        data: &[u8],
    ) -> Result<()>;

    fn delete_property(&mut self, window: WindowId, property: Atom) -> Result<()>;

    fn map_window(&mut self, window: WindowId) -> Result<()>;

    fn unmap_window(&mut self, window: WindowId) -> Result<()>;

    fn configure_window(&mut self, window: WindowId, geometry: WindowGeometry) -> Result<()>;

    fn set_override_redirect(&mut self, window: WindowId, enabled: bool) -> Result<()>;

    fn grab_server(&mut self) -> Result<()>;

    fn ungrab_server(&mut self) -> Result<()>;

    /// Глубина вложенных `ServerGrab`; запросы уходят только на внешнем уровне
    fn grab_depth(&mut self) -> &mut u32;

    fn flush(&mut self) -> Result<()>;

    /// Everything queued on the connection right now, without blocking
    fn poll_events(&mut self) -> Result<Vec<WindowEvent>>;
}
