pub mod tcp;

pub use tcp::{FrameTag, MbapHeader};
