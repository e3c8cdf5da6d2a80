pub mod render;

pub use render::{FrameStats, Renderer, SkiaRenderer, ViewRenderer};
