//! Text renderer for compiled trees
//!
//! [`Renderer`] walks the folder tree, compiles each hooked stamp and hands
//! the resulting mappings to the [`Encoder`].

pub mod config;
pub mod encoder;
mod walk;

pub use config::RenderConfig;
pub use encoder::Encoder;
pub use walk::Renderer;
