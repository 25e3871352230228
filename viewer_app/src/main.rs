//! Viewer demo application
//!
//! Opens one Vulkan-presented window with a small status overlay. Esc
//! closes the window; F11 toggles fullscreen.

use ash::vk;
use glfw::{Action, Key, WindowEvent};
use present_engine::{
    CommandPool, FrameContext, Texture, VulkanContext, VulkanWindow, WindowConfig,
    WindowDelegate,
};
use std::sync::Arc;
use std::time::Instant;

struct ViewerApp {
    start_time: Instant,
    frames: u64,
    // Placeholder an overlay backend would sample; registered with every
    // frame so its GPU lifetime is fence-bounded
    badge: Arc<Texture>,
}

impl ViewerApp {
    fn new(context: &VulkanContext) -> Result<Self, Box<dyn std::error::Error>> {
        let upload_pool = CommandPool::new(context.raw_device(), context.render_queue_family())?;
        let badge = Arc::new(Texture::create_solid_color(
            context.raw_device(),
            context.instance(),
            context.physical_device().device,
            &upload_pool,
            context.render_queue(),
            [255, 140, 0, 255],
        )?);

        Ok(Self {
            start_time: Instant::now(),
            frames: 0,
            badge,
        })
    }
}

impl WindowDelegate for ViewerApp {
    fn render_ui(&mut self, ui: &mut imgui::Ui, frame: &mut FrameContext<'_>) {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let extent = frame.extent();

        ui.window("Viewer")
            .size([260.0, 110.0], imgui::Condition::FirstUseEver)
            .position([20.0, 20.0], imgui::Condition::FirstUseEver)
            .build(|| {
                ui.text(format!("Drawable: {}x{}", extent.width, extent.height));
                ui.text(format!("Frames: {}", self.frames));
                let badge = self.badge.extent();
                ui.text(format!("Badge texture: {}x{}", badge.width, badge.height));
                if elapsed > 0.0 {
                    ui.text(format!("Average FPS: {:.1}", self.frames as f64 / elapsed));
                }
                ui.separator();
                ui.text("Esc: quit    F11: fullscreen");
            });
    }

    fn do_render(&mut self, _cmd_buf: vk::CommandBuffer, frame: &mut FrameContext<'_>) {
        // The cleared backbuffer is the whole scene for this demo; the
        // badge claim still goes through the tracker so it stays alive
        // until this frame's fence signals
        frame.add_texture_used_this_frame(self.badge.clone());
        self.frames += 1;
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let glfw = glfw::init(glfw::fail_on_errors)?;

    let config = WindowConfig::new("Viewer")
        .with_size(1280, 720)
        .with_clear_color([0.05, 0.05, 0.08, 1.0])
        .with_low_latency_present(true);

    let (mut window, context) = VulkanWindow::create(glfw, &config)?;
    let mut app = ViewerApp::new(&context)?;

    log::info!("Entering main loop");
    while !window.window().should_close() {
        window.window_mut().poll_events();

        let events: Vec<(f64, WindowEvent)> = window.window().flush_events().collect();
        for (_, event) in events {
            match event {
                WindowEvent::Key(Key::Escape, _, Action::Press, _) => {
                    window.window_mut().set_should_close(true);
                }
                WindowEvent::Key(Key::F11, _, Action::Press, _) => {
                    let fullscreen = !window.is_fullscreen();
                    log::info!("Toggling fullscreen -> {}", fullscreen);
                    window.set_fullscreen(fullscreen);
                }
                _ => {}
            }
        }

        window.render(&mut app)?;
    }

    log::info!("Main loop finished after {} frames", app.frames);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Starting viewer demo");
    run().map_err(|e| {
        log::error!("Viewer error: {e}");
        e
    })
}
