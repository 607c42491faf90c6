//! Safety checks run before swact and lock commands reach the engine.

pub mod lock;
pub mod swact;

pub use lock::LockPreCheck;
pub use swact::{SwactPreCheck, SwactRefusal};
