#[cfg(feature = "desktop")]
pub mod annotate;
pub mod overlay;
pub mod skeleton;

pub use overlay::{FrameOverlay, HudState};
pub use skeleton::{skeleton_edges, EdgeSide, Rgb, SkeletonEdge, SKELETON_CONNECTIONS};
