use log::{debug, info};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::config::Config;
use crate::context::VulkanContext;
use crate::error::{Error, Result};

pub fn window_attributes(config: &Config) -> WindowAttributes {
    Window::default_attributes()
        .with_title(config.title.clone())
        .with_inner_size(LogicalSize::new(config.width, config.height))
        .with_resizable(false)
}

struct App {
    config: Config,
    // Declared before `window` so the surface goes before the window it is bound to.
    context: Option<VulkanContext>,
    window: Option<Window>,
    error: Option<Error>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            context: None,
            window: None,
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = event_loop.create_window(window_attributes(&self.config))?;
        let context = VulkanContext::for_window(&self.config.instance(), &window)?;
        self.context = Some(context);
        self.window = Some(window);
        Ok(())
    }

    /// Keeps a start-up failure for `run` to return. The caller prints it.
    fn record_failure(&mut self, err: Error) {
        debug!("start-up failed: {}", err);
        self.context = None;
        self.window = None;
        self.error.get_or_insert(err);
    }

    fn finish(mut self) -> Result<()> {
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.context = None;
        self.window = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.error.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            self.record_failure(err);
            self.shutdown(event_loop);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let WindowEvent::CloseRequested = event {
            info!("window closed");
            self.shutdown(event_loop);
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.context = None;
        self.window = None;
    }
}

/// Opens the window and polls events until it is closed.
pub fn run(config: Config) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    app.finish()
}
