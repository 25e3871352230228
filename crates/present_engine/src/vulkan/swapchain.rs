//! Vulkan swapchain management for presentation and double buffering
//!
//! This module handles the swapchain lifecycle: creation, recreation during
//! window resize or display-mode changes, and cleanup. The swapchain is the
//! driver-managed ring of images the window draws into and hands back for
//! display, and it is the single most recreation-prone resource in the
//! presentation path.
//!
//! ## Surface negotiation
//!
//! Four properties are negotiated against the surface on every (re)build:
//!
//! - **Format**: prefers `B8G8R8A8_SRGB` with `SRGB_NONLINEAR` for
//!   gamma-correct output, falling back to the first reported format.
//! - **Present mode**: `FIFO` by default (universally supported, no
//!   tearing); `MAILBOX` when the caller asks for low-latency presentation
//!   and the driver offers it.
//! - **Extent**: the surface's `current_extent` when the platform fixes it,
//!   otherwise the requested drawable size clamped to the surface limits.
//!   The extent must always equal the OS-reported drawable size; a mismatch
//!   is the trigger for recreation, never a silent rescale.
//! - **Image count**: one more than the driver minimum, capped by the
//!   driver maximum when one exists.
//!
//! The choosers are free functions so the negotiation policy is testable
//! without a device.
//!
//! ## Recreation
//!
//! `recreate` passes the old chain through `old_swapchain`, letting the
//! driver recycle resources and keeping the old chain alive until the new
//! one is fully constructed. The caller must wait out all in-flight frames
//! before dependent per-image resources are replaced.
//!
//! ## Fatal conditions
//!
//! `ERROR_SURFACE_LOST_KHR` and `ERROR_DEVICE_LOST` map to
//! `VulkanError::SurfaceLost` / `DeviceLost`; both are fatal to the window
//! and never retried here.

use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::{vk, Device};
use std::sync::Arc;

use crate::vulkan::context::{VulkanContext, VulkanError, VulkanResult};
use crate::vulkan::surface::Surface;

/// Choose the surface format, preferring sRGB for color accuracy
pub(crate) fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    formats
        .iter()
        .find(|sf| {
            sf.format == vk::Format::B8G8R8A8_SRGB
                && sf.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .cloned()
        .unwrap_or(formats[0])
}

/// Choose the present mode. FIFO is guaranteed by Vulkan; MAILBOX is used
/// only when explicitly requested and available.
pub(crate) fn choose_present_mode(
    modes: &[vk::PresentModeKHR],
    prefer_low_latency: bool,
) -> vk::PresentModeKHR {
    if prefer_low_latency {
        if let Some(&mode) = modes.iter().find(|&&m| m == vk::PresentModeKHR::MAILBOX) {
            return mode;
        }
    }
    vk::PresentModeKHR::FIFO
}

/// Choose the swap extent from the surface capabilities and the drawable size
pub(crate) fn choose_extent(
    caps: &vk::SurfaceCapabilitiesKHR,
    window_extent: vk::Extent2D,
) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        caps.current_extent
    } else {
        vk::Extent2D {
            width: window_extent.width.clamp(
                caps.min_image_extent.width,
                caps.max_image_extent.width,
            ),
            height: window_extent.height.clamp(
                caps.min_image_extent.height,
                caps.max_image_extent.height,
            ),
        }
    }
}

/// Choose the backbuffer image count: min+1, capped by the driver maximum
/// (a maximum of 0 means unlimited)
pub(crate) fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        desired.min(caps.max_image_count)
    } else {
        desired
    }
}

/// Vulkan swapchain wrapper with automatic resource management
///
/// Holds a strong reference to the [`Surface`] it presents to, so the
/// surface outlives any in-flight presentation referencing it.
pub struct Swapchain {
    device: Device,
    swapchain_loader: SwapchainLoader,
    // Held so the surface outlives any in-flight presentation
    #[allow(dead_code)]
    surface: Arc<Surface>,
    swapchain: vk::SwapchainKHR,
    image_views: Vec<vk::ImageView>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    image_count: u32,
}

impl Swapchain {
    /// Create a new swapchain
    pub fn new(
        context: &VulkanContext,
        surface: Arc<Surface>,
        window_extent: vk::Extent2D,
        prefer_low_latency: bool,
    ) -> VulkanResult<Self> {
        Self::create(context, surface, window_extent, prefer_low_latency, vk::SwapchainKHR::null())
    }

    /// Recreate the swapchain with new window dimensions.
    ///
    /// The old chain is handed to the driver via `old_swapchain`; the caller
    /// drops it only after this returns, so the replacement is fully
    /// constructed before the previous chain goes away.
    pub fn recreate(
        context: &VulkanContext,
        surface: Arc<Surface>,
        window_extent: vk::Extent2D,
        prefer_low_latency: bool,
        old: &Swapchain,
    ) -> VulkanResult<Self> {
        Self::create(context, surface, window_extent, prefer_low_latency, old.handle())
    }

    fn create(
        context: &VulkanContext,
        surface: Arc<Surface>,
        window_extent: vk::Extent2D,
        prefer_low_latency: bool,
        old_swapchain: vk::SwapchainKHR,
    ) -> VulkanResult<Self> {
        let device = context.raw_device();
        let physical_device = context.physical_device().device;
        let swapchain_loader = context.swapchain_loader().clone();

        let surface_caps = unsafe {
            surface.loader()
                .get_physical_device_surface_capabilities(physical_device, surface.handle())
                .map_err(VulkanError::from)?
        };

        let surface_formats = unsafe {
            surface.loader()
                .get_physical_device_surface_formats(physical_device, surface.handle())
                .map_err(VulkanError::from)?
        };

        if surface_formats.is_empty() {
            return Err(VulkanError::InitializationFailed(
                "Surface reports no formats".to_string()
            ));
        }

        let present_modes = unsafe {
            surface.loader()
                .get_physical_device_surface_present_modes(physical_device, surface.handle())
                .map_err(VulkanError::from)?
        };

        let format = choose_surface_format(&surface_formats);
        let present_mode = choose_present_mode(&present_modes, prefer_low_latency);
        let extent = choose_extent(&surface_caps, window_extent);
        let image_count = choose_image_count(&surface_caps);

        log::debug!(
            "Creating swapchain: {}x{}, {} images, format {:?}, present mode {:?}",
            extent.width, extent.height, image_count, format.format, present_mode
        );

        let swapchain_create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface.handle())
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(surface_caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe {
            swapchain_loader
                .create_swapchain(&swapchain_create_info, None)
                .map_err(VulkanError::from)?
        };

        let images = unsafe {
            swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(VulkanError::from)?
        };

        let image_views: Result<Vec<_>, _> = images
            .iter()
            .map(|&image| {
                let create_info = vk::ImageViewCreateInfo::builder()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(format.format)
                    .components(vk::ComponentMapping {
                        r: vk::ComponentSwizzle::IDENTITY,
                        g: vk::ComponentSwizzle::IDENTITY,
                        b: vk::ComponentSwizzle::IDENTITY,
                        a: vk::ComponentSwizzle::IDENTITY,
                    })
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });

                unsafe { device.create_image_view(&create_info, None) }
            })
            .collect();

        let image_views = image_views.map_err(VulkanError::from)?;
        let image_count = images.len() as u32;

        Ok(Self {
            device,
            swapchain_loader,
            surface,
            swapchain,
            image_views,
            format,
            extent,
            image_count,
        })
    }

    /// Get swapchain extent
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Get surface format
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    /// Get backbuffer image views
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Get swapchain handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Get image count
    pub fn image_count(&self) -> u32 {
        self.image_count
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &image_view in &self.image_views {
                self.device.destroy_image_view(image_view, None);
            }

            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(f: vk::Format, cs: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR { format: f, color_space: cs }
    }

    #[test]
    fn test_format_prefers_srgb() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn test_format_falls_back_to_first() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn test_present_mode_defaults_to_fifo() {
        let modes = [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(&modes, false), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_present_mode_low_latency_uses_mailbox_when_available() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&modes, true), vk::PresentModeKHR::MAILBOX);

        let fifo_only = [vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(&fifo_only, true), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_extent_uses_fixed_current_extent() {
        let caps = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width: 800, height: 600 },
            ..Default::default()
        };
        let chosen = choose_extent(&caps, vk::Extent2D { width: 1, height: 1 });
        assert_eq!(chosen, vk::Extent2D { width: 800, height: 600 });
    }

    #[test]
    fn test_extent_clamps_requested_size() {
        let caps = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width: u32::MAX, height: u32::MAX },
            min_image_extent: vk::Extent2D { width: 64, height: 64 },
            max_image_extent: vk::Extent2D { width: 1920, height: 1080 },
            ..Default::default()
        };
        let chosen = choose_extent(&caps, vk::Extent2D { width: 4000, height: 16 });
        assert_eq!(chosen, vk::Extent2D { width: 1920, height: 64 });
    }

    #[test]
    fn test_image_count_is_min_plus_one_capped() {
        let caps = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 3,
            ..Default::default()
        };
        assert_eq!(choose_image_count(&caps), 3);

        let tight = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 2,
            ..Default::default()
        };
        assert_eq!(choose_image_count(&tight), 2);

        let unlimited = vk::SurfaceCapabilitiesKHR {
            min_image_count: 3,
            max_image_count: 0,
            ..Default::default()
        };
        assert_eq!(choose_image_count(&unlimited), 4);
    }
}
