//! Vulkan texture management
//!
//! A sampled GPU image with image view and sampler. Draw collaborators hold
//! these behind `Arc` so the per-frame usage tracking can extend a
//! texture's lifetime past GPU completion. Content generation beyond
//! solid-color placeholders is the texture-owning subsystem's concern.

use ash::vk;
use crate::vulkan::commands::CommandPool;
use crate::vulkan::sync::Fence;
use crate::vulkan::{VulkanResult, VulkanError};

/// Basic Vulkan texture with image, image view, and sampler
pub struct Texture {
    device: ash::Device,
    image: vk::Image,
    image_view: vk::ImageView,
    sampler: vk::Sampler,
    memory: vk::DeviceMemory,
    extent: vk::Extent2D,
    format: vk::Format,
}

impl Texture {
    /// Create an uninitialized sampled RGBA texture of the given size.
    ///
    /// The image is allocated device-local in UNDEFINED layout; filling it
    /// (upload, layout transition) is the owning subsystem's job.
    pub fn new_sampled(
        device: ash::Device,
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let format = vk::Format::R8G8B8A8_UNORM;

        let image_create_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);

        let image = unsafe {
            device.create_image(&image_create_info, None)
                .map_err(VulkanError::from)?
        };

        let memory_requirements = unsafe { device.get_image_memory_requirements(image) };
        let memory_properties = unsafe {
            instance.get_physical_device_memory_properties(physical_device)
        };
        let memory_type_index = find_memory_type(
            memory_requirements.memory_type_bits,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            &memory_properties,
        )?;

        let memory_allocate_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(memory_requirements.size)
            .memory_type_index(memory_type_index);

        let memory = unsafe {
            device.allocate_memory(&memory_allocate_info, None)
                .map_err(VulkanError::from)?
        };

        unsafe {
            device.bind_image_memory(image, memory, 0)
                .map_err(VulkanError::from)?;
        }

        let view_create_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        let image_view = unsafe {
            device.create_image_view(&view_create_info, None)
                .map_err(VulkanError::from)?
        };

        let sampler_create_info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR);

        let sampler = unsafe {
            device.create_sampler(&sampler_create_info, None)
                .map_err(VulkanError::from)?
        };

        Ok(Self {
            device,
            image,
            image_view,
            sampler,
            memory,
            extent,
            format,
        })
    }

    /// Create a 1x1 solid-color texture, uploaded and ready to sample.
    ///
    /// Placeholder content for overlay badges and material defaults. The
    /// upload submits a one-shot command buffer on the given queue and
    /// blocks until its fence signals, so this belongs in setup paths, not
    /// the frame cycle.
    pub fn create_solid_color(
        device: ash::Device,
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        command_pool: &CommandPool,
        queue: vk::Queue,
        color: [u8; 4],
    ) -> VulkanResult<Self> {
        let texture = Self::new_sampled(
            device,
            instance,
            physical_device,
            vk::Extent2D { width: 1, height: 1 },
        )?;
        texture.upload_pixels(instance, physical_device, command_pool, queue, &color)?;
        Ok(texture)
    }

    /// Upload RGBA pixel data through a staging buffer, transitioning the
    /// image UNDEFINED -> TRANSFER_DST -> SHADER_READ_ONLY. Blocks until
    /// the copy completes.
    fn upload_pixels(
        &self,
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        command_pool: &CommandPool,
        queue: vk::Queue,
        pixels: &[u8],
    ) -> VulkanResult<()> {
        let device = &self.device;
        let buffer_size = pixels.len() as vk::DeviceSize;

        let staging_create_info = vk::BufferCreateInfo::builder()
            .size(buffer_size)
            .usage(vk::BufferUsageFlags::TRANSFER_SRC)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let staging_buffer = unsafe {
            device.create_buffer(&staging_create_info, None)
                .map_err(VulkanError::from)?
        };

        let memory_requirements = unsafe { device.get_buffer_memory_requirements(staging_buffer) };
        let memory_properties = unsafe {
            instance.get_physical_device_memory_properties(physical_device)
        };
        let memory_type_index = match find_memory_type(
            memory_requirements.memory_type_bits,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            &memory_properties,
        ) {
            Ok(index) => index,
            Err(e) => {
                unsafe { device.destroy_buffer(staging_buffer, None) };
                return Err(e);
            }
        };

        let allocate_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(memory_requirements.size)
            .memory_type_index(memory_type_index);

        let staging_memory = match unsafe { device.allocate_memory(&allocate_info, None) } {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(staging_buffer, None) };
                return Err(VulkanError::from(e));
            }
        };

        let result = self.fill_and_copy_staging(
            command_pool, queue, staging_buffer, staging_memory, pixels,
        );

        // Staging resources go away whether or not the copy succeeded
        unsafe {
            device.destroy_buffer(staging_buffer, None);
            device.free_memory(staging_memory, None);
        }

        result
    }

    fn fill_and_copy_staging(
        &self,
        command_pool: &CommandPool,
        queue: vk::Queue,
        staging_buffer: vk::Buffer,
        staging_memory: vk::DeviceMemory,
        pixels: &[u8],
    ) -> VulkanResult<()> {
        let device = &self.device;
        unsafe {
            device.bind_buffer_memory(staging_buffer, staging_memory, 0)
                .map_err(VulkanError::from)?;

            let data_ptr = device.map_memory(
                staging_memory, 0, pixels.len() as vk::DeviceSize, vk::MemoryMapFlags::empty(),
            ).map_err(VulkanError::from)? as *mut u8;
            std::ptr::copy_nonoverlapping(pixels.as_ptr(), data_ptr, pixels.len());
            device.unmap_memory(staging_memory);
        }

        self.record_and_submit_copy(command_pool, queue, staging_buffer)
    }

    fn record_and_submit_copy(
        &self,
        command_pool: &CommandPool,
        queue: vk::Queue,
        staging_buffer: vk::Buffer,
    ) -> VulkanResult<()> {
        let device = &self.device;
        let command_buffer = command_pool.allocate_command_buffers(1)?[0];

        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        let subresource_range = vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        };

        unsafe {
            device.begin_command_buffer(command_buffer, &begin_info)
                .map_err(VulkanError::from)?;

            let to_transfer = vk::ImageMemoryBarrier::builder()
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(self.image)
                .subresource_range(subresource_range)
                .src_access_mask(vk::AccessFlags::empty())
                .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);

            device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_transfer.build()],
            );

            let region = vk::BufferImageCopy::builder()
                .buffer_offset(0)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                .image_extent(vk::Extent3D {
                    width: self.extent.width,
                    height: self.extent.height,
                    depth: 1,
                });

            device.cmd_copy_buffer_to_image(
                command_buffer,
                staging_buffer,
                self.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region.build()],
            );

            let to_sampled = vk::ImageMemoryBarrier::builder()
                .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(self.image)
                .subresource_range(subresource_range)
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags::SHADER_READ);

            device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_sampled.build()],
            );

            device.end_command_buffer(command_buffer)
                .map_err(VulkanError::from)?;
        }

        let fence = Fence::new(device.clone(), false)?;
        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::builder()
            .command_buffers(&command_buffers);

        unsafe {
            device.queue_submit(queue, &[submit_info.build()], fence.handle())
                .map_err(VulkanError::from)?;
        }
        fence.wait(u64::MAX)?;

        unsafe {
            device.free_command_buffers(command_pool.handle(), &command_buffers);
        }

        Ok(())
    }

    /// Get the image handle
    pub fn image(&self) -> vk::Image {
        self.image
    }

    /// Get the image view handle
    pub fn image_view(&self) -> vk::ImageView {
        self.image_view
    }

    /// Get the sampler handle
    pub fn sampler(&self) -> vk::Sampler {
        self.sampler
    }

    /// Get the texture extent
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Get the texture format
    pub fn format(&self) -> vk::Format {
        self.format
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
            self.device.destroy_image_view(self.image_view, None);
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// Find a memory type satisfying the filter and property flags
fn find_memory_type(
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
) -> VulkanResult<u32> {
    for i in 0..memory_properties.memory_type_count {
        if (type_filter & (1 << i)) != 0
            && memory_properties.memory_types[i as usize]
                .property_flags
                .contains(properties)
        {
            return Ok(i);
        }
    }

    Err(VulkanError::InvalidOperation {
        reason: "Failed to find suitable memory type".to_string(),
    })
}
