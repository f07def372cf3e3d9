//! Test support utilities for oral-scan.
//!
//! Provides port mocks, synthetic image builders, and a writer for tiny
//! randomly-initialized model artifacts.
//!
//! # Example
//!
//! ```
//! use oral_scan_test_support::{MockImageSource, SyntheticImageBuilder, TinyModelBuilder};
//!
//! let dir = std::env::temp_dir().join("oral-scan-doc-example");
//! std::fs::create_dir_all(&dir).unwrap();
//! let artifact = TinyModelBuilder::new().favor_label("Ulcers").write_to(&dir).unwrap();
//!
//! let img = SyntheticImageBuilder::gradient(64, 48);
//! let source = MockImageSource::new(vec![SyntheticImageBuilder::png("a.png", &img).unwrap()]);
//! # let _ = (artifact, source);
//! ```

mod builders;
mod mocks;
mod model;

pub use builders::SyntheticImageBuilder;
pub use mocks::{MockImageSource, MockOverlayStore, MockProgressSink, MockResultOutput};
pub use model::{TinyModelBuilder, WeightInit};
