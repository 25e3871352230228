//! Per-window presentation engine
//!
//! [`VulkanWindow`] owns everything one OS window needs to present: the
//! GLFW window, its surface, the negotiated swapchain, the render pass,
//! the bounded pool of frame slots, and the UI overlay host. `render()`
//! drives one full frame cycle per call:
//!
//! 1. wait the next slot's fence (the sole backpressure point bounding
//!    frames in flight to the slot count) and retire its texture claims;
//! 2. acquire a backbuffer with the current "image acquired" semaphore;
//!    a stale surface aborts the tick and schedules a rebuild instead;
//! 3. record the slot's command buffer against the *acquired* image's
//!    framebuffer, running the delegate's UI and scene hooks;
//! 4. submit, signaling "render complete" and the slot fence;
//! 5. present, waiting on "render complete"; staleness here marks a
//!    rebuild for the next frame rather than failing this one;
//! 6. advance the frame and semaphore counters round-robin.
//!
//! Resize, DPI change, and fullscreen toggles all funnel through
//! `update_framebuffer()`, which waits out all in-flight work, rebuilds the
//! swapchain (old chain handed to the driver and kept alive until the new
//! one exists), and rebuilds every per-image resource in dependency order.
//!
//! The render queue is treated as externally serialized: one thread calls
//! `render()`, and submissions from sibling windows to the same hardware
//! queue must be serialized by the caller.

use ash::vk;
use std::sync::Arc;
use std::time::Instant;

use crate::config::WindowConfig;
use crate::frame::{FrameCounters, FrameSemaphores, FrameSlot};
use crate::overlay::OverlayHost;
use crate::vulkan::{
    CommandPool, CommandRecorder, Framebuffer, RenderPass, Surface, Swapchain, Texture,
    VulkanContext, VulkanError, VulkanInstance, VulkanResult,
};
use crate::window::Window;

/// Whether a drawable size is too degenerate to present to.
///
/// True while the window is minimized or collapsed to zero area; the frame
/// cycle and swapchain rebuilds both skip entirely until the drawable
/// comes back.
pub(crate) fn is_degenerate_drawable(width: u32, height: u32) -> bool {
    width == 0 || height == 0
}

/// Per-frame services handed to delegate hooks during command recording.
///
/// This is how collaborators register the textures their draw commands
/// reference; registration must happen before the frame is submitted.
pub struct FrameContext<'a> {
    tracker: &'a mut crate::vulkan::FrameResourceTracker,
    extent: vk::Extent2D,
}

impl FrameContext<'_> {
    /// Claim a texture for the current frame. The texture stays alive until
    /// this frame's fence is observed signaled, even if the caller drops its
    /// own last reference immediately after drawing.
    pub fn add_texture_used_this_frame(&mut self, texture: Arc<Texture>) {
        self.tracker.track(texture);
    }

    /// Drawable extent of the frame being recorded
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

/// Extension points the presentation engine calls while recording a frame.
///
/// `render_ui` populates overlay geometry through the hosted imgui context;
/// `do_render` records scene draw commands; `draw_overlay` is where an
/// application's overlay backend translates the finished UI draw data into
/// commands (a no-op by default, since draw-list translation is outside
/// this crate).
pub trait WindowDelegate {
    /// Populate UI geometry for this frame
    fn render_ui(&mut self, ui: &mut imgui::Ui, frame: &mut FrameContext<'_>);

    /// Record scene draw commands into the active render pass
    fn do_render(&mut self, cmd_buf: vk::CommandBuffer, frame: &mut FrameContext<'_>);

    /// Record overlay draw commands from the finished UI draw data
    fn draw_overlay(&mut self, _draw_data: &imgui::DrawData, _cmd_buf: vk::CommandBuffer) {}
}

/// A GLFW window presenting through Vulkan, with an immediate-mode UI
/// overlay hosted in the same render pass.
pub struct VulkanWindow {
    // Destruction order matters: per-image resources first, then the
    // chain, then the surface, with the device outliving everything.
    slots: Vec<FrameSlot>,
    semaphores: Vec<FrameSemaphores>,
    framebuffers: Vec<Framebuffer>,
    command_pool: CommandPool,
    overlay: OverlayHost,
    swapchain: Swapchain,
    render_pass: RenderPass,
    surface: Arc<Surface>,
    window: Window,
    context: Arc<VulkanContext>,

    render_queue: vk::Queue,
    queue_family: u32,
    counters: FrameCounters,
    clear_color: [f32; 4],
    prefer_low_latency: bool,
    resize_event_pending: bool,
    pending_fullscreen: Option<bool>,
    last_frame: Instant,
}

impl VulkanWindow {
    /// Create a window over an existing context, surface, and render queue
    pub fn new(
        context: Arc<VulkanContext>,
        window: Window,
        surface: Arc<Surface>,
        render_queue: vk::Queue,
        queue_family: u32,
        config: &WindowConfig,
    ) -> VulkanResult<Self> {
        let (fb_width, fb_height) = window.get_framebuffer_size();
        let extent = vk::Extent2D { width: fb_width, height: fb_height };

        let swapchain = Swapchain::new(
            &context,
            surface.clone(),
            extent,
            config.prefer_low_latency_present,
        )?;

        let render_pass = RenderPass::new_present_pass(
            context.raw_device(),
            swapchain.format().format,
        )?;

        let overlay = OverlayHost::new(
            context.raw_device(),
            config.overlay_descriptor_capacity,
            swapchain.image_count(),
        )?;

        let (command_pool, framebuffers, slots, semaphores, counters) =
            Self::build_frame_resources(&context, queue_family, &render_pass, &swapchain)?;

        log::info!(
            "Created window '{}' ({}x{}, {} backbuffers)",
            window.get_title(), extent.width, extent.height, swapchain.image_count()
        );

        Ok(Self {
            slots,
            semaphores,
            framebuffers,
            command_pool,
            overlay,
            swapchain,
            render_pass,
            surface,
            window,
            context,
            render_queue,
            queue_family,
            counters,
            clear_color: config.clear_color,
            prefer_low_latency: config.prefer_low_latency_present,
            resize_event_pending: false,
            pending_fullscreen: None,
            last_frame: Instant::now(),
        })
    }

    /// Create a window together with a fresh Vulkan context.
    ///
    /// Convenience for single-window applications; multi-window setups
    /// build the context once and call [`VulkanWindow::new`] per window.
    pub fn create(
        glfw: glfw::Glfw,
        config: &WindowConfig,
    ) -> VulkanResult<(Self, Arc<VulkanContext>)> {
        config.validate()
            .map_err(|e| VulkanError::InitializationFailed(e.to_string()))?;

        let mut window = Window::new(glfw, &config.title, config.width, config.height)
            .map_err(|e| VulkanError::InitializationFailed(e.to_string()))?;

        let instance = VulkanInstance::new(&window, &config.title, cfg!(debug_assertions))?;
        let surface = Arc::new(Surface::new(&instance, &mut window)?);
        let context = Arc::new(VulkanContext::new(instance, surface.handle(), surface.loader())?);

        let render_queue = context.render_queue();
        let queue_family = context.render_queue_family();
        let vulkan_window = Self::new(
            context.clone(), window, surface, render_queue, queue_family, config,
        )?;

        Ok((vulkan_window, context))
    }

    fn build_frame_resources(
        context: &VulkanContext,
        queue_family: u32,
        render_pass: &RenderPass,
        swapchain: &Swapchain,
    ) -> VulkanResult<(
        CommandPool,
        Vec<Framebuffer>,
        Vec<FrameSlot>,
        Vec<FrameSemaphores>,
        FrameCounters,
    )> {
        let device = context.raw_device();
        let image_count = swapchain.image_count();

        let command_pool = CommandPool::new(device.clone(), queue_family)?;
        let command_buffers = command_pool.allocate_command_buffers(image_count)?;

        let framebuffers: VulkanResult<Vec<_>> = swapchain
            .image_views()
            .iter()
            .map(|&view| {
                Framebuffer::new(
                    device.clone(),
                    render_pass.handle(),
                    &[view],
                    swapchain.extent(),
                )
            })
            .collect();
        let framebuffers = framebuffers?;

        let slots: VulkanResult<Vec<_>> = command_buffers
            .into_iter()
            .map(|command_buffer| FrameSlot::new(device.clone(), command_buffer))
            .collect();
        let slots = slots?;

        let semaphores: VulkanResult<Vec<_>> = (0..image_count)
            .map(|_| FrameSemaphores::new(device.clone()))
            .collect();
        let semaphores = semaphores?;

        // Both rings are sized to the image count today, but the counters
        // keep independent moduli because acquisition order and slot order
        // are allowed to diverge.
        let counters = FrameCounters::new(image_count, image_count);

        Ok((command_pool, framebuffers, slots, semaphores, counters))
    }

    /// Render one frame. Call once per application tick.
    pub fn render(&mut self, delegate: &mut dyn WindowDelegate) -> VulkanResult<()> {
        // Fullscreen toggles are deferred to the tick boundary
        if let Some(fullscreen) = self.pending_fullscreen.take() {
            self.window.set_fullscreen(fullscreen);
            self.resize_event_pending = true;
        }

        // A zero-area drawable (minimized) skips the whole cycle
        let (fb_width, fb_height) = self.window.get_framebuffer_size();
        if is_degenerate_drawable(fb_width, fb_height) {
            return Ok(());
        }

        let extent = self.swapchain.extent();
        if self.resize_event_pending
            || fb_width != extent.width
            || fb_height != extent.height
        {
            self.update_framebuffer()?;
        }

        let now = Instant::now();
        let delta = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        // Step 1: fence wait bounds frames in flight to the slot count.
        // Only after the wait may the slot's texture claims be released.
        let slot_index = self.counters.frame_index();
        {
            let slot = &mut self.slots[slot_index];
            slot.fence.wait(u64::MAX)?;
            slot.textures.clear();
        }

        // Step 2: acquire a backbuffer. The image index the driver returns
        // need not match the slot index.
        let semaphore_index = self.counters.semaphore_index();
        let acquire_semaphore = self.semaphores[semaphore_index].image_acquired.handle();
        let image_index = match unsafe {
            self.context.swapchain_loader().acquire_next_image(
                self.swapchain.handle(),
                u64::MAX,
                acquire_semaphore,
                vk::Fence::null(),
            )
        } {
            Ok((index, false)) => index,
            Ok((_, true)) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                log::warn!("Swapchain stale at acquisition; rebuilding next tick");
                self.resize_event_pending = true;
                return Ok(());
            }
            Err(e) => return Err(VulkanError::from(e)),
        };

        // Step 3: record this slot's command buffer against the acquired
        // image's framebuffer
        let extent = self.swapchain.extent();
        self.overlay.begin_frame(extent, delta);

        let device = self.context.raw_device();
        let slot = &mut self.slots[slot_index];
        let mut recorder = CommandRecorder::new(slot.command_buffer, device.clone());
        recorder.begin()?;

        {
            let mut frame = FrameContext { tracker: &mut slot.textures, extent };
            let ui = self.overlay.context_mut().new_frame();
            delegate.render_ui(ui, &mut frame);
        }

        {
            let render_area = vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            };
            let clear_values = [vk::ClearValue {
                color: vk::ClearColorValue { float32: self.clear_color },
            }];

            let mut pass = recorder.begin_render_pass(
                self.render_pass.handle(),
                self.framebuffers[image_index as usize].handle(),
                render_area,
                &clear_values,
            )?;

            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            pass.set_viewport(&viewport);
            pass.set_scissor(&render_area);

            {
                let mut frame = FrameContext { tracker: &mut slot.textures, extent };
                delegate.do_render(pass.command_buffer(), &mut frame);
            }

            let draw_data = self.overlay.context_mut().render();
            delegate.draw_overlay(draw_data, pass.command_buffer());
        }

        let command_buffer = recorder.end()?;

        // Step 4: submit, signaling render-complete and the slot fence
        slot.fence.reset()?;

        let wait_semaphores = [acquire_semaphore];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [self.semaphores[semaphore_index].render_complete.handle()];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            device.queue_submit(
                self.render_queue,
                &[submit_info.build()],
                slot.fence.handle(),
            ).map_err(VulkanError::from)?;
        }

        // Step 5: present, waiting on render-complete. Staleness here is
        // recovered next frame, never surfaced as a failure.
        let swapchains = [self.swapchain.handle()];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe {
            self.context.swapchain_loader().queue_present(self.render_queue, &present_info)
        } {
            Ok(false) => {}
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                log::warn!("Swapchain stale at presentation; rebuilding next tick");
                self.resize_event_pending = true;
            }
            Err(e) => return Err(VulkanError::from(e)),
        }

        // Step 6: advance round-robin
        self.counters.advance();
        Ok(())
    }

    /// Rebuild the swapchain and every dependent per-image resource when
    /// the drawable size changed. Returns whether a rebuild occurred.
    pub fn update_framebuffer(&mut self) -> VulkanResult<bool> {
        let (width, height) = self.window.get_framebuffer_size();
        if is_degenerate_drawable(width, height) {
            // Minimized; keep the old chain until the drawable comes back
            return Ok(false);
        }

        let extent = self.swapchain.extent();
        if !self.resize_event_pending && width == extent.width && height == extent.height {
            return Ok(false);
        }

        log::debug!(
            "Rebuilding swapchain: {}x{} -> {}x{}",
            extent.width, extent.height, width, height
        );

        // Precondition: no frame may be mid-submission against the
        // resources being replaced
        self.context.wait_idle()?;

        // Every fallible step builds into temporaries first; a failure here
        // leaves the previous swapchain, slots, and counters intact, so the
        // fatal condition resurfaces on the next attempt instead of leaving
        // the window with a half-torn-down resource set.
        let new_swapchain = Swapchain::recreate(
            &self.context,
            self.surface.clone(),
            vk::Extent2D { width, height },
            self.prefer_low_latency,
            &self.swapchain,
        )?;

        // The render pass survives rebuilds unless format negotiation
        // changed underneath it
        let old_format = self.swapchain.format().format;
        let new_render_pass = if new_swapchain.format().format != old_format {
            log::info!(
                "Surface format changed {:?} -> {:?}; recreating render pass",
                old_format, new_swapchain.format().format
            );
            Some(RenderPass::new_present_pass(
                self.context.raw_device(),
                new_swapchain.format().format,
            )?)
        } else {
            None
        };

        let (command_pool, framebuffers, slots, semaphores, counters) =
            Self::build_frame_resources(
                &self.context,
                self.queue_family,
                new_render_pass.as_ref().unwrap_or(&self.render_pass),
                &new_swapchain,
            )?;

        self.overlay.resize(new_swapchain.image_count())?;

        // Commit. Old framebuffers are dropped before the old chain so they
        // never outlive the image views they reference.
        self.framebuffers = framebuffers;
        self.slots = slots;
        self.semaphores = semaphores;
        self.command_pool = command_pool;
        self.swapchain = new_swapchain;
        if let Some(render_pass) = new_render_pass {
            self.render_pass = render_pass;
        }
        self.counters = counters;

        self.resize_event_pending = false;
        Ok(true)
    }

    /// Request a fullscreen transition, applied at the next tick boundary
    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.pending_fullscreen = Some(fullscreen);
    }

    /// Whether the window is currently fullscreen
    pub fn is_fullscreen(&self) -> bool {
        self.window.is_fullscreen()
    }

    /// Claim a texture for the frame currently being prepared.
    ///
    /// The claim is released only once this frame's fence proves GPU
    /// completion. Collaborators that draw a texture must register it here
    /// (or through [`FrameContext`]) before the frame is submitted.
    pub fn add_texture_used_this_frame(&mut self, texture: Arc<Texture>) {
        let slot = &mut self.slots[self.counters.frame_index()];
        slot.textures.track(texture);
    }

    /// Queue this window renders and presents on
    pub fn render_queue(&self) -> vk::Queue {
        self.render_queue
    }

    /// Family index of the render queue
    pub fn render_queue_family(&self) -> u32 {
        self.queue_family
    }

    /// The OS window
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// The OS window, mutably (event polling, close flag)
    pub fn window_mut(&mut self) -> &mut Window {
        &mut self.window
    }

    /// The shared Vulkan context
    pub fn context(&self) -> &Arc<VulkanContext> {
        &self.context
    }

    /// Current swapchain state (extent, format, image count)
    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    /// Render pass overlay backends must be compatible with
    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass.handle()
    }

    /// Descriptor pool dedicated to overlay rendering
    pub fn overlay_descriptor_pool(&self) -> vk::DescriptorPool {
        self.overlay.descriptor_pool()
    }
}

impl Drop for VulkanWindow {
    fn drop(&mut self) {
        log::info!("Destroying window '{}'", self.window.get_title());
        // All in-flight work must finish before per-frame resources are torn down
        let _ = self.context.wait_idle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_area_drawable_is_degenerate() {
        assert!(is_degenerate_drawable(0, 0));
        assert!(is_degenerate_drawable(0, 600));
        assert!(is_degenerate_drawable(800, 0));
    }

    #[test]
    fn test_minimize_skips_then_restore_resumes() {
        // 800x600 -> minimized -> 800x600: frames are skipped only while
        // the drawable has zero area
        assert!(!is_degenerate_drawable(800, 600));
        assert!(is_degenerate_drawable(0, 0));
        assert!(!is_degenerate_drawable(800, 600));
    }

    #[test]
    fn test_single_pixel_drawable_still_renders() {
        assert!(!is_degenerate_drawable(1, 1));
    }
}
