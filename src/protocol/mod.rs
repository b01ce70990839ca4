//! Wire protocol of the garden node
//!
//! The payload format published on every cycle and the rules channel names
//! must follow.

pub mod payload;
pub mod topics;

pub use payload::*;
pub use topics::*;
