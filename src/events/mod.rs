pub mod window;

pub use window::{Atom, LifecycleKind, WindowClass, WindowEvent, WindowGeometry, WindowId};
