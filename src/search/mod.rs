pub mod highlight;

pub use highlight::{HighlightBox, resolve_highlights};
