//! Per-window Vulkan presentation engine
//!
//! Each [`VulkanWindow`] owns one OS window end to end: the surface, the
//! negotiated swapchain, a bounded pool of frame slots (command buffer +
//! fence + texture claims), per-frame semaphore pairs, and an
//! immediate-mode UI overlay host sharing the window's render pass.
//! Applications plug in through [`WindowDelegate`] and call
//! [`VulkanWindow::render`] once per tick; resize, fullscreen, and stale
//! surface recovery are handled internally.
//!
//! Typical single-window setup:
//!
//! ```no_run
//! use present_engine::{VulkanWindow, WindowConfig, WindowDelegate, FrameContext};
//!
//! struct App;
//!
//! impl WindowDelegate for App {
//!     fn render_ui(&mut self, ui: &mut imgui::Ui, _frame: &mut FrameContext<'_>) {
//!         ui.window("status").build(|| ui.text("hello"));
//!     }
//!     fn do_render(&mut self, _cmd: ash::vk::CommandBuffer, _frame: &mut FrameContext<'_>) {}
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let glfw = glfw::init(glfw::fail_on_errors)?;
//! let config = WindowConfig::new("viewer");
//! let (mut window, _context) = VulkanWindow::create(glfw, &config)?;
//! let mut app = App;
//! while !window.window().should_close() {
//!     window.window_mut().poll_events();
//!     window.render(&mut app)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod frame;
pub mod overlay;
pub mod vulkan;
pub mod window;
pub mod window_controller;

pub use config::{Config, ConfigError, WindowConfig};
pub use frame::{FrameCounters, FrameSemaphores, FrameSlot};
pub use overlay::OverlayHost;
pub use vulkan::{
    CommandPool, FrameResourceTracker, ResourceClaim, Surface, Swapchain, Texture,
    VulkanContext, VulkanError, VulkanInstance, VulkanResult,
};
pub use window::{Window, WindowError, WindowedGeometry};
pub use window_controller::{FrameContext, VulkanWindow, WindowDelegate};
