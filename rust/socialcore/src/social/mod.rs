pub mod error;
pub mod text;
pub mod style;
pub mod config;
pub mod registry;
pub mod scanner;
pub mod incremental;
pub mod reconcile;
pub mod diagnostics;
pub mod dispatch;
pub mod controller;
pub mod wasm;

pub use error::{OffsetFault, SocialError};
pub use text::*;
pub use style::*;
pub use config::*;
pub use registry::*;
pub use scanner::*;
pub use incremental::*;
pub use reconcile::*;
pub use diagnostics::*;
pub use dispatch::*;
pub use controller::*;
pub use wasm::*;

#[cfg(test)]
mod tests;
