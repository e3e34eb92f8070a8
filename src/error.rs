use ash::vk;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to load the Vulkan library: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error("validation layers requested, but not available: {}", .0.join(", "))]
    MissingRequiredLayer(Vec<String>),

    #[error("failed to create Vulkan instance: {0}")]
    InstanceCreation(vk::Result),

    #[error("failed to set up debug messenger: {0}")]
    DiagnosticMessengerCreation(vk::Result),

    #[error("failed to find GPUs with Vulkan support")]
    NoDevicesFound,

    #[error("failed to find a suitable GPU")]
    NoSuitableDevice,

    #[error("failed to create window surface: {0}")]
    SurfaceCreation(vk::Result),

    #[error("failed to create logical device: {0}")]
    DeviceCreation(vk::Result),

    #[error("{call} failed: {result}")]
    Vulkan {
        call: &'static str,
        result: vk::Result,
    },

    #[error("window handle unavailable: {0}")]
    WindowHandle(#[from] raw_window_handle::HandleError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

impl Error {
    pub(crate) fn vulkan(call: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |result| Self::Vulkan { call, result }
    }
}
