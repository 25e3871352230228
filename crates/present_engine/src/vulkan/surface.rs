//! Presentable surface management
//!
//! Wraps the `vk::SurfaceKHR` bound to an OS window. The surface is shared
//! (`Arc`) between the window controller and the swapchain so that a
//! recreated chain can never outlive the surface it presents to.

use ash::extensions::khr::Surface as SurfaceLoader;
use ash::vk;

use crate::vulkan::context::{VulkanError, VulkanInstance, VulkanResult};
use crate::window::Window;

/// Surface wrapper with RAII cleanup.
///
/// Exactly one exists per window, for the window's lifetime. Both the
/// window controller and the current swapchain hold a strong reference.
pub struct Surface {
    loader: SurfaceLoader,
    surface: vk::SurfaceKHR,
}

impl Surface {
    /// Create the presentable surface for a window
    pub fn new(instance: &VulkanInstance, window: &mut Window) -> VulkanResult<Self> {
        let loader = SurfaceLoader::new(&instance.entry, &instance.instance);
        let surface = window.create_vulkan_surface(instance.instance.handle())
            .map_err(|e| VulkanError::InitializationFailed(format!("Surface creation: {}", e)))?;

        Ok(Self { loader, surface })
    }

    /// Get the surface handle
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Get the surface extension loader
    pub fn loader(&self) -> &SurfaceLoader {
        &self.loader
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_surface(self.surface, None);
        }
    }
}
