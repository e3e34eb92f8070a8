//! Brings up everything in creation order: instance and messenger, surface,
//! device selection, logical device.
//!
//! Fields are declared in reverse creation order so they are released in
//! reverse creation order, and each wrapper keeps the instance alive through
//! an `Rc` until it has released its own handle.

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::CStr;
use std::rc::Rc;

use crate::config::InstanceConfig;
use crate::device::LogicalDevice;
use crate::device_selector::DeviceSelector;
use crate::diagnostics::LogHandler;
use crate::error::Result;
use crate::gpu::Gpu;
use crate::surface::{self, Surface};
use crate::vulkan::Vulkan;

pub struct VulkanContext {
    device: LogicalDevice,
    surface: Option<Surface>,
    vulkan: Rc<Vulkan>,
}

impl VulkanContext {
    /// No window: the device only needs a graphics queue family.
    pub fn headless(config: &InstanceConfig) -> Result<Self> {
        Self::build(config, &[], |_| Ok(None))
    }

    /// The device must also be able to present to `window`.
    pub fn for_window<W>(config: &InstanceConfig, window: &W) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let extensions = surface::required_extensions(window.display_handle()?.as_raw())?;
        Self::build(config, &extensions, |vulkan| {
            Surface::new(vulkan, window).map(Some)
        })
    }

    fn build<F>(config: &InstanceConfig, extensions: &[&CStr], create_surface: F) -> Result<Self>
    where
        F: FnOnce(&Rc<Vulkan>) -> Result<Option<Surface>>,
    {
        let vulkan = Rc::new(Vulkan::new(config, extensions, LogHandler)?);
        let surface = create_surface(&vulkan)?;

        let device = {
            let gpus = vulkan.physical_devices()?;
            let mut selector: DeviceSelector<'_, Gpu<'_>> = DeviceSelector::new();
            if let Some(surface) = surface.as_ref() {
                selector = selector.with_presentation(surface);
            }
            let selected = selector.select(gpus)?;
            LogicalDevice::new(&vulkan, &selected)?
        };

        Ok(Self {
            device,
            surface,
            vulkan,
        })
    }

    pub fn vulkan(&self) -> &Vulkan {
        &self.vulkan
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    pub fn device(&self) -> &LogicalDevice {
        &self.device
    }
}
