//! Immediate-mode UI overlay host
//!
//! Owns the resources the UI layer needs from this window: a dear imgui
//! context and a descriptor pool dedicated to overlay rendering. The pool
//! is sized against the swapchain image count, so it is resized alongside
//! swapchain rebuilds; translating the UI draw lists into Vulkan commands
//! is the embedding application's overlay backend, not this crate.

use ash::vk;

use crate::vulkan::{VulkanError, VulkanResult};

/// Descriptor pool plus imgui context for one window's overlay
pub struct OverlayHost {
    device: ash::Device,
    descriptor_pool: vk::DescriptorPool,
    context: imgui::Context,
    capacity_per_image: u32,
    sized_for_images: u32,
}

impl OverlayHost {
    /// Create the overlay host, sizing the descriptor pool for the given
    /// swapchain image count
    pub fn new(
        device: ash::Device,
        capacity_per_image: u32,
        image_count: u32,
    ) -> VulkanResult<Self> {
        let descriptor_pool = create_descriptor_pool(&device, capacity_per_image, image_count)?;

        let mut context = imgui::Context::create();
        context.set_ini_filename(None::<std::path::PathBuf>);
        // The overlay backend samples the atlas through this pool's sets;
        // build it up front so the first frame has glyph data.
        context.fonts().build_rgba32_texture();

        Ok(Self {
            device,
            descriptor_pool,
            context,
            capacity_per_image,
            sized_for_images: image_count,
        })
    }

    /// Resize the descriptor pool when the swapchain image count changes.
    ///
    /// Precondition: no overlay draw referencing the old pool is in flight
    /// (the window controller waits the device idle before rebuilds).
    pub fn resize(&mut self, image_count: u32) -> VulkanResult<()> {
        if image_count == self.sized_for_images {
            return Ok(());
        }

        log::debug!(
            "Resizing overlay descriptor pool: {} -> {} images",
            self.sized_for_images, image_count
        );

        let new_pool = create_descriptor_pool(&self.device, self.capacity_per_image, image_count)?;
        unsafe {
            self.device.destroy_descriptor_pool(self.descriptor_pool, None);
        }
        self.descriptor_pool = new_pool;
        self.sized_for_images = image_count;
        Ok(())
    }

    /// Update the UI layer's notion of the drawable size and frame delta
    pub fn begin_frame(&mut self, extent: vk::Extent2D, delta_seconds: f32) {
        let io = self.context.io_mut();
        io.display_size = [extent.width as f32, extent.height as f32];
        io.delta_time = delta_seconds.max(f32::EPSILON);
    }

    /// Get the imgui context
    pub fn context_mut(&mut self) -> &mut imgui::Context {
        &mut self.context
    }

    /// Get the overlay descriptor pool handle
    pub fn descriptor_pool(&self) -> vk::DescriptorPool {
        self.descriptor_pool
    }
}

impl Drop for OverlayHost {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.descriptor_pool, None);
        }
    }
}

fn create_descriptor_pool(
    device: &ash::Device,
    capacity_per_image: u32,
    image_count: u32,
) -> VulkanResult<vk::DescriptorPool> {
    let capacity = capacity_per_image * image_count.max(1);

    let pool_sizes = [
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: capacity,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::SAMPLER,
            descriptor_count: capacity,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: capacity,
        },
    ];

    let pool_info = vk::DescriptorPoolCreateInfo::builder()
        // Overlay backends allocate and free per-texture sets
        .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
        .max_sets(capacity)
        .pool_sizes(&pool_sizes);

    unsafe {
        device.create_descriptor_pool(&pool_info, None)
            .map_err(VulkanError::from)
    }
}
