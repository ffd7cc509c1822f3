//! Type definitions for registry state, manifests and promotion requests

mod inventory;
mod keys;
mod manifest;
mod names;
mod request;

pub use inventory::*;
pub use keys::*;
pub use manifest::*;
pub use names::*;
pub use request::*;
