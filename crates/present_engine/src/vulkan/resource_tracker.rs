//! Resource lifetime tracking for in-flight frames
//!
//! Each frame slot owns one tracker holding strong claims on every GPU
//! resource its recorded draw commands reference. The claims are released
//! only after the slot's fence proves GPU completion, so a resource whose
//! last application-side owner dropped it mid-frame stays alive until the
//! GPU can no longer read it.

use std::any::Any;
use std::sync::Arc;

/// A strong claim on a frame-referenced GPU resource
pub type ResourceClaim = Arc<dyn Any + Send + Sync>;

/// Per-slot tracker keeping frame-referenced resources alive until the
/// slot's fence signals.
///
/// Discipline: claim before draw, release after fence. Claims are taken
/// during command recording and cleared at slot reuse, one full
/// round-trip behind submission.
#[derive(Default)]
pub struct FrameResourceTracker {
    live: Vec<ResourceClaim>,
}

impl FrameResourceTracker {
    /// Create a tracker with no claims
    pub fn new() -> Self {
        Self { live: Vec::new() }
    }

    /// Claim a resource for the lifetime of this slot's in-flight frame
    pub fn track(&mut self, resource: ResourceClaim) {
        self.live.push(resource);
    }

    /// Release every claim. Callers must only do this once the owning
    /// slot's fence has been observed signaled.
    pub fn clear(&mut self) {
        self.live.clear();
    }

    /// Number of live claims
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Whether the tracker holds no claims
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Weak;

    #[test]
    fn test_claim_keeps_resource_alive() {
        let mut tracker = FrameResourceTracker::new();
        let resource: Arc<u32> = Arc::new(7);
        let weak: Weak<u32> = Arc::downgrade(&resource);

        tracker.track(resource.clone());
        // The application drops its last reference right after the draw call
        drop(resource);

        assert!(weak.upgrade().is_some(), "claim must outlive the application's reference");
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_clear_releases_claims() {
        let mut tracker = FrameResourceTracker::new();
        let resource: Arc<u32> = Arc::new(7);
        let weak: Weak<u32> = Arc::downgrade(&resource);

        tracker.track(resource);
        tracker.clear();

        assert!(weak.upgrade().is_none(), "clearing must release the last claim");
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_claims_accumulate_within_a_frame() {
        let mut tracker = FrameResourceTracker::new();
        tracker.track(Arc::new(1u32));
        tracker.track(Arc::new(2u32));
        tracker.track(Arc::new(3u32));
        assert_eq!(tracker.len(), 3);
    }
}
