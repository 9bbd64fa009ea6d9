pub mod actions;
pub mod ledger;
pub mod lifecycle;
pub mod matcher;
pub mod rule_loader;
pub mod rule_table;
pub mod transport;
pub mod window_watcher;

pub use lifecycle::{Session, SessionOptions};
pub use rule_loader::load_rule;
pub use transport::X11Transport;
pub use window_watcher::{SharedSession, WindowWatcher};
