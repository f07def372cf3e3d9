//! Mock implementations of core port traits.

use std::sync::{Arc, Mutex, PoisonError};

use image::RgbImage;
use oral_scan_core::domain::{ImageBytes, ScanReport};
use oral_scan_core::ports::{
    ImageSource, OverlayStore, ProgressEvent, ProgressSink, ResultOutput, UnreadableImage,
};

/// Mock implementation of `ImageSource` for testing.
///
/// Yields pre-built payloads (or read failures) and tracks iteration for assertions.
pub struct MockImageSource {
    images: Vec<Result<ImageBytes, UnreadableImage>>,
    iteration_count: Arc<Mutex<usize>>,
}

impl MockImageSource {
    /// Creates a new mock source with the given images.
    #[must_use]
    pub fn new(images: Vec<ImageBytes>) -> Self {
        Self::with_failures(images.into_iter().map(Ok).collect())
    }

    /// Creates a source where some items fail to read.
    #[must_use]
    pub fn with_failures(images: Vec<Result<ImageBytes, UnreadableImage>>) -> Self {
        Self {
            images,
            iteration_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Creates an empty mock source.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(vec![])
    }

    /// Returns the number of times the source has been iterated.
    #[must_use]
    pub fn iteration_count(&self) -> usize {
        *self
            .iteration_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl ImageSource for MockImageSource {
    fn images(
        &self,
    ) -> Box<dyn Iterator<Item = Result<ImageBytes, UnreadableImage>> + Send + '_> {
        let count = Arc::clone(&self.iteration_count);
        if let Ok(mut c) = count.lock() {
            *c += 1;
        }
        Box::new(self.images.iter().cloned())
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.images.len())
    }
}

/// Mock implementation of `ResultOutput` for testing.
///
/// Captures reports for later assertions.
pub struct MockResultOutput {
    reports: Arc<Mutex<Vec<ScanReport>>>,
    flush_count: Arc<Mutex<usize>>,
}

impl MockResultOutput {
    /// Creates a new mock output.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reports: Arc::new(Mutex::new(Vec::new())),
            flush_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Returns all captured reports.
    #[must_use]
    pub fn reports(&self) -> Vec<ScanReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of times `flush()` was called.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        *self
            .flush_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockResultOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultOutput for MockResultOutput {
    fn write(&self, report: &ScanReport) -> anyhow::Result<()> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report.clone());
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        if let Ok(mut c) = self.flush_count.lock() {
            *c += 1;
        }
        Ok(())
    }
}

/// Mock implementation of `ProgressSink` for testing.
///
/// Captures events for later assertions.
pub struct MockProgressSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl MockProgressSink {
    /// Creates a new mock progress sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns all captured events.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of `Started` events.
    #[must_use]
    pub fn started_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Started { .. }))
            .count()
    }

    /// Returns the number of `Completed` events.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Completed { .. }))
            .count()
    }

    /// Returns the number of `Skipped` events.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Skipped { .. }))
            .count()
    }

    /// Returns the final `(processed, skipped, elevated)` counts, if finished.
    #[must_use]
    pub fn finished_counts(&self) -> Option<(usize, usize, usize)> {
        self.events().iter().find_map(|e| match e {
            ProgressEvent::Finished {
                processed,
                skipped,
                elevated,
            } => Some((*processed, *skipped, *elevated)),
            _ => None,
        })
    }
}

impl Default for MockProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for MockProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Mock implementation of `OverlayStore` for testing.
///
/// Keeps overlays in memory, or fails every save when built with `failing()`.
pub struct MockOverlayStore {
    saved: Arc<Mutex<Vec<(String, RgbImage)>>>,
    fail: bool,
}

impl MockOverlayStore {
    /// Creates a store that accepts every overlay.
    #[must_use]
    pub fn new() -> Self {
        Self {
            saved: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    /// Creates a store whose saves always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Returns the saved `(source path, overlay)` pairs.
    #[must_use]
    pub fn saved(&self) -> Vec<(String, RgbImage)> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MockOverlayStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayStore for MockOverlayStore {
    fn save(&self, source_path: &str, overlay: &RgbImage) -> anyhow::Result<String> {
        if self.fail {
            anyhow::bail!("overlay store unavailable");
        }
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((source_path.to_string(), overlay.clone()));
        Ok(format!("memory://{source_path}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_image_source_empty() {
        let source = MockImageSource::empty();
        assert_eq!(source.count_hint(), Some(0));
        assert_eq!(source.images().count(), 0);
        assert_eq!(source.iteration_count(), 1);
    }

    #[test]
    fn test_mock_image_source_with_failures() {
        let source = MockImageSource::with_failures(vec![
            Ok(ImageBytes::new("a.png", vec![1, 2, 3])),
            Err(UnreadableImage::new("b.png", "permission denied")),
        ]);

        let items: Vec<_> = source.images().collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert_eq!(items[1].as_ref().unwrap_err().path, "b.png");
    }

    #[test]
    fn test_mock_progress_sink() {
        let sink = MockProgressSink::new();

        sink.on_event(ProgressEvent::Started {
            path: "test.jpg".into(),
            index: 0,
            total: Some(1),
        });
        sink.on_event(ProgressEvent::Finished {
            processed: 1,
            skipped: 0,
            elevated: 1,
        });

        assert_eq!(sink.started_count(), 1);
        assert_eq!(sink.finished_counts(), Some((1, 0, 1)));
    }

    #[test]
    fn test_mock_overlay_store() {
        let store = MockOverlayStore::new();
        let location = store.save("a.png", &RgbImage::new(2, 2)).unwrap();
        assert_eq!(location, "memory://a.png");
        assert_eq!(store.saved().len(), 1);

        assert!(MockOverlayStore::failing()
            .save("a.png", &RgbImage::new(2, 2))
            .is_err());
    }
}
