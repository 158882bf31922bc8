//! Terminal front end: half-block renderer, starfield backdrop, and the
//! bell that stands in for audio.

pub mod bell;
pub mod renderer;
pub mod starfield;

pub use bell::Bell;
pub use renderer::Renderer;
pub use starfield::Starfield;
