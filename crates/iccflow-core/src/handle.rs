//! Capability traits shared by the engine's value types

use crate::context::Context;

/// Produces an independent deep copy
///
/// `Clone` on engine types may share storage copy-on-write; `duplicate`
/// never does.
pub trait Duplicable: Sized {
    fn duplicate(&self) -> Self;
}

/// Exposes the context an object was created with
pub trait Contextual {
    fn context(&self) -> Option<&Context>;
}
