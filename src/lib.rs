pub mod config;
pub mod context;
pub mod device;
pub mod device_selector;
pub mod diagnostics;
pub mod error;
pub mod gpu;
pub mod queue_family;
pub mod surface;
pub mod vulkan;
pub mod window;

pub use ash::vk::QueueFlags;
pub use ash::{Entry, Instance};
pub use device_selector::{select_device, DeviceSelector, SelectedDevice};
pub use error::{Error, Result};
