//! Transport: responsibility and boundaries
//!
//! This module is the ONLY place that talks to the X server. It issues requests,
//! collects replies and translates structural events into `WindowEvent`s.
//! It MUST NOT know about rules, the ledger or matching; all of that lives in
//! the engine modules, which reach the server exclusively through `Transport`.

mod r#trait;
mod x11;

#[cfg(test)]
pub mod fake;

pub use self::r#trait::Transport;
pub use self::x11::{ConnectionFd, X11Transport};
