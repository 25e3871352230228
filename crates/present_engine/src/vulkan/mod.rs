//! Low-level Vulkan wrappers and primitives
//!
//! RAII wrappers over the raw API, following a strict ownership rule: every
//! wrapper destroys exactly what it created, and anything referenced across
//! frames is either owned by the window controller or claimed through the
//! resource tracker.

pub mod commands;
pub mod context;
pub mod framebuffer;
pub mod render_pass;
pub mod resource_tracker;
pub mod surface;
pub mod swapchain;
pub mod sync;
pub mod texture;

// Re-export commonly used types
pub use commands::{CommandPool, CommandRecorder, ActiveRenderPass};
pub use context::{
    LogicalDevice, PhysicalDeviceInfo, VulkanContext, VulkanError, VulkanInstance, VulkanResult,
};
pub use framebuffer::Framebuffer;
pub use render_pass::RenderPass;
pub use resource_tracker::{FrameResourceTracker, ResourceClaim};
pub use surface::Surface;
pub use swapchain::Swapchain;
pub use sync::{Fence, Semaphore};
pub use texture::Texture;
