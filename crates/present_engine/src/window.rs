//! GLFW-based window management for Vulkan rendering
//!
//! Provides cross-platform window creation and event handling for a window
//! that presents through Vulkan: no client API context, resize and close
//! event polling, Vulkan surface creation, and fullscreen transitions that
//! save and restore the windowed geometry.

use thiserror::Error;

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    #[error("GLFW initialization failed")]
    InitializationFailed,

    #[error("Window creation failed")]
    CreationFailed,

    #[error("GLFW error: {0}")]
    GlfwError(String),
}

pub type WindowResult<T> = Result<T, WindowError>;

/// Position and size of a window while it is in windowed mode.
///
/// Captured immediately before a fullscreen transition and restored
/// bit-for-bit when the window leaves fullscreen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowedGeometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Tracks the fullscreen flag and the saved windowed geometry.
///
/// The geometry is saved exactly once per fullscreen transition and taken
/// exactly once on exit; redundant transitions are rejected so a saved
/// geometry can never be overwritten while fullscreen.
#[derive(Debug, Default)]
pub(crate) struct FullscreenState {
    fullscreen: bool,
    saved: Option<WindowedGeometry>,
}

impl FullscreenState {
    /// Record entry into fullscreen. Returns false if already fullscreen.
    pub fn enter(&mut self, geometry: WindowedGeometry) -> bool {
        if self.fullscreen {
            return false;
        }
        self.saved = Some(geometry);
        self.fullscreen = true;
        true
    }

    /// Record exit from fullscreen, yielding the geometry to restore.
    /// Returns None if not fullscreen.
    pub fn exit(&mut self) -> Option<WindowedGeometry> {
        if !self.fullscreen {
            return None;
        }
        self.fullscreen = false;
        self.saved.take()
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }
}

/// GLFW window wrapper with proper resource management
pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
    title: String,
    fullscreen: FullscreenState,
}

impl Window {
    /// Create a new window configured for Vulkan rendering
    pub fn new(mut glfw: glfw::Glfw, title: &str, width: u32, height: u32) -> WindowResult<Self> {
        // Configure for Vulkan (no OpenGL context)
        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(true));

        let (mut window, events) = glfw
            .create_window(width, height, title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        // Set up event polling
        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_size_polling(true);
        window.set_framebuffer_size_polling(true);

        Ok(Self {
            glfw,
            window,
            events,
            title: title.to_string(),
            fullscreen: FullscreenState::default(),
        })
    }

    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    pub fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    pub fn poll_events(&mut self) {
        self.glfw.poll_events();
    }

    pub fn flush_events(&self) -> glfw::FlushedMessages<(f64, glfw::WindowEvent)> {
        glfw::flush_messages(&self.events)
    }

    /// Drawable size in pixels, which may differ from the logical size on
    /// high-DPI displays. This is the size the swapchain must match.
    pub fn get_framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width as u32, height as u32)
    }

    pub fn get_title(&self) -> &str {
        &self.title
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen.is_fullscreen()
    }

    /// Enter or leave fullscreen on the primary monitor.
    ///
    /// Entering saves the current windowed position and size; leaving
    /// restores them. Redundant calls are no-ops.
    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        if fullscreen {
            let (x, y) = self.window.get_pos();
            let (width, height) = self.window.get_size();
            if !self.fullscreen.enter(WindowedGeometry { x, y, width, height }) {
                return;
            }

            let window = &mut self.window;
            self.glfw.with_primary_monitor(|_, monitor| {
                if let Some(monitor) = monitor {
                    if let Some(mode) = monitor.get_video_mode() {
                        log::debug!("Entering fullscreen at {}x{}@{}Hz",
                            mode.width, mode.height, mode.refresh_rate);
                        window.set_monitor(
                            glfw::WindowMode::FullScreen(monitor),
                            0,
                            0,
                            mode.width,
                            mode.height,
                            Some(mode.refresh_rate),
                        );
                    } else {
                        log::warn!("Primary monitor has no video mode; staying windowed");
                    }
                } else {
                    log::warn!("No primary monitor found; staying windowed");
                }
            });
        } else if let Some(geometry) = self.fullscreen.exit() {
            log::debug!("Restoring windowed geometry {:?}", geometry);
            self.window.set_monitor(
                glfw::WindowMode::Windowed,
                geometry.x,
                geometry.y,
                geometry.width as u32,
                geometry.height as u32,
                None,
            );
        }
    }

    /// Get required Vulkan instance extensions from GLFW
    pub fn get_required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or(WindowError::GlfwError("Failed to get required extensions".to_string()))
    }

    /// Create a Vulkan surface using GLFW's built-in functionality
    pub fn create_vulkan_surface(&mut self, instance: ash::vk::Instance) -> WindowResult<ash::vk::SurfaceKHR> {
        let mut surface = ash::vk::SurfaceKHR::null();
        let result = self.window.create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == ash::vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::GlfwError(format!("Failed to create Vulkan surface: {:?}", result)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fullscreen_round_trip_restores_geometry() {
        let mut state = FullscreenState::default();
        let geometry = WindowedGeometry { x: 120, y: 45, width: 800, height: 600 };

        assert!(state.enter(geometry));
        assert!(state.is_fullscreen());

        let restored = state.exit().expect("geometry must be restored on exit");
        assert_eq!(restored, geometry);
        assert!(!state.is_fullscreen());
    }

    #[test]
    fn test_redundant_enter_preserves_saved_geometry() {
        let mut state = FullscreenState::default();
        let original = WindowedGeometry { x: 0, y: 0, width: 1024, height: 768 };
        let other = WindowedGeometry { x: 99, y: 99, width: 1, height: 1 };

        assert!(state.enter(original));
        // A second enter while fullscreen must not overwrite the saved geometry
        assert!(!state.enter(other));

        assert_eq!(state.exit(), Some(original));
    }

    #[test]
    fn test_exit_without_enter_is_noop() {
        let mut state = FullscreenState::default();
        assert_eq!(state.exit(), None);
        assert!(!state.is_fullscreen());
    }

    #[test]
    fn test_exit_is_consumed_once() {
        let mut state = FullscreenState::default();
        let geometry = WindowedGeometry { x: 1, y: 2, width: 3, height: 4 };

        state.enter(geometry);
        assert!(state.exit().is_some());
        // Saved geometry is consumed; a second exit has nothing to restore
        assert_eq!(state.exit(), None);
    }
}
