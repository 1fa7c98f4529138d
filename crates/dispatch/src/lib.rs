//! Event dispatch: routes one normalized message through the module chain
//! and returns at most one response.

pub mod dispatcher;
pub mod normalize;

pub use {
    dispatcher::{DispatchTimeouts, EventDispatcher},
    normalize::{MarkupStripper, Passthrough, TextNormalizer},
};
