//! Per-frame GPU resources and frame pacing counters
//!
//! A window keeps one [`FrameSlot`] per swapchain image, reused round-robin,
//! plus a matching ring of [`FrameSemaphores`]. Two explicit counters select
//! the next slot and the next semaphore pair; they advance together but
//! carry independent moduli, because the image index the driver hands back
//! at acquisition is allowed to diverge from the slot order.

use ash::vk;

use crate::vulkan::{Fence, FrameResourceTracker, Semaphore, VulkanResult};

/// The semaphore pair ordering one frame's GPU work.
///
/// `image_acquired` is signaled when the driver hands back a backbuffer and
/// waited on by the frame's submission; `render_complete` is signaled by the
/// submission and waited on by presentation.
pub struct FrameSemaphores {
    pub image_acquired: Semaphore,
    pub render_complete: Semaphore,
}

impl FrameSemaphores {
    /// Create a semaphore pair
    pub fn new(device: ash::Device) -> VulkanResult<Self> {
        Ok(Self {
            image_acquired: Semaphore::new(device.clone())?,
            render_complete: Semaphore::new(device)?,
        })
    }
}

/// One slot of the bounded frame-in-flight pool.
///
/// Owns the command buffer, the completion fence, and the resource claims
/// of the frame most recently submitted through it. The fence must be
/// observed signaled before the command buffer is re-recorded or the
/// claims are released.
pub struct FrameSlot {
    pub command_buffer: vk::CommandBuffer,
    pub fence: Fence,
    pub textures: FrameResourceTracker,
}

impl FrameSlot {
    /// Create a slot over an allocated command buffer.
    ///
    /// The fence starts signaled so first use never stalls.
    pub fn new(device: ash::Device, command_buffer: vk::CommandBuffer) -> VulkanResult<Self> {
        Ok(Self {
            command_buffer,
            fence: Fence::new(device, true)?,
            textures: FrameResourceTracker::new(),
        })
    }
}

/// Round-robin frame and semaphore indices with independent moduli.
///
/// Kept as explicit small integers rather than implicit iteration: the
/// frame index picks the next [`FrameSlot`], the semaphore index picks the
/// next [`FrameSemaphores`], and the image index always comes from the
/// driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCounters {
    frame_index: u32,
    semaphore_index: u32,
    frame_modulus: u32,
    semaphore_modulus: u32,
}

impl FrameCounters {
    /// Create counters for the given ring sizes, starting at slot 0
    pub fn new(frame_modulus: u32, semaphore_modulus: u32) -> Self {
        debug_assert!(frame_modulus > 0 && semaphore_modulus > 0);
        Self {
            frame_index: 0,
            semaphore_index: 0,
            frame_modulus,
            semaphore_modulus,
        }
    }

    /// Slot index to use for the frame currently being prepared
    pub fn frame_index(&self) -> usize {
        self.frame_index as usize
    }

    /// Semaphore-pair index to use for the frame currently being prepared
    pub fn semaphore_index(&self) -> usize {
        self.semaphore_index as usize
    }

    /// Advance both counters after a completed render tick
    pub fn advance(&mut self) {
        self.frame_index = (self.frame_index + 1) % self.frame_modulus;
        self.semaphore_index = (self.semaphore_index + 1) % self.semaphore_modulus;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_buffered_slot_sequence() {
        // 800x600 double-buffered scenario: slot 0, slot 1, then back to 0
        let mut counters = FrameCounters::new(2, 2);
        assert_eq!(counters.frame_index(), 0);
        counters.advance();
        assert_eq!(counters.frame_index(), 1);
        counters.advance();
        assert_eq!(counters.frame_index(), 0);
    }

    #[test]
    fn test_frame_index_is_monotonic_modulo_slot_count() {
        let mut counters = FrameCounters::new(3, 3);
        let observed: Vec<usize> = (0..7)
            .map(|_| {
                let index = counters.frame_index();
                counters.advance();
                index
            })
            .collect();
        assert_eq!(observed, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_counters_diverge_with_different_moduli() {
        let mut counters = FrameCounters::new(3, 2);
        counters.advance();
        counters.advance();
        // frame: 2 % 3 = 2, semaphore: 2 % 2 = 0
        assert_eq!(counters.frame_index(), 2);
        assert_eq!(counters.semaphore_index(), 0);

        counters.advance();
        assert_eq!(counters.frame_index(), 0);
        assert_eq!(counters.semaphore_index(), 1);
    }
}
