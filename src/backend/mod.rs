use std::sync::Arc;

mod fixture;
mod hayro;
mod traits;

pub use fixture::{FixtureBackend, FixturePage};
pub use hayro::HayroBackend;
pub use traits::{DecodedDocument, RasterBackend, RgbaFrame, TextFragment};

pub fn default_backend() -> Arc<dyn RasterBackend> {
    Arc::new(HayroBackend)
}
