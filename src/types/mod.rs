//! Core data types shared by the adapter, tools and turn controller.

pub mod generation;
pub mod message;
pub mod stream;
pub mod tool;

pub use generation::*;
pub use message::*;
pub use stream::*;
pub use tool::*;
