//! Rendering Module
//!
//! Pixel layers, the compositor and the frame animations that paint into
//! their own layers.

pub mod layer;
pub mod renderer;
pub mod animation;

pub use layer::{Layer, Rgb};
pub use renderer::{FrameCapture, LayerId, NullSink, PixelOrder, PixelSink, Renderer};
pub use animation::{Animation, Animator, DestructionBlink, ErrorIndicator, Staged};
