use ash::vk::{
    PhysicalDevice, PhysicalDeviceLimits, PhysicalDeviceProperties, PhysicalDeviceType, QueueFlags,
};
use std::fmt;

use crate::device_selector::QueueFamilySource;
use crate::error::{Error, Result};
use crate::queue_family::QueueFamily;
use crate::vulkan::{fixed_str, Vulkan};

/// A physical device, borrowed from the instance that enumerated it.
#[derive(Clone, Copy)]
pub struct Gpu<'a> {
    vulkan: &'a Vulkan,
    physical_device: PhysicalDevice,
    properties: PhysicalDeviceProperties,
}

impl<'a> Gpu<'a> {
    pub(crate) fn new(vulkan: &'a Vulkan, physical_device: PhysicalDevice) -> Self {
        let properties = unsafe {
            vulkan
                .vk_instance()
                .get_physical_device_properties(physical_device)
        };
        Self {
            vulkan,
            physical_device,
            properties,
        }
    }

    pub fn vk_physical_device(&self) -> PhysicalDevice {
        self.physical_device
    }

    pub fn name(&self) -> String {
        fixed_str(&self.properties.device_name)
    }

    pub fn vendor_id(&self) -> u32 {
        self.properties.vendor_id
    }

    pub fn device_id(&self) -> u32 {
        self.properties.device_id
    }

    pub fn driver_version(&self) -> u32 {
        self.properties.driver_version
    }

    pub fn device_type(&self) -> PhysicalDeviceType {
        self.properties.device_type
    }

    pub fn is_discrete(&self) -> bool {
        self.properties.device_type == PhysicalDeviceType::DISCRETE_GPU
    }

    pub fn is_virtual(&self) -> bool {
        self.properties.device_type == PhysicalDeviceType::VIRTUAL_GPU
    }

    pub fn limits(&self) -> PhysicalDeviceLimits {
        self.properties.limits
    }

    /// Index of the first queue family that supports all of `flags`.
    pub fn queue_family_index(&self, flags: QueueFlags) -> Option<u32> {
        self.queue_families()
            .into_iter()
            .find(|family| family.supports(flags))
            .map(|family| family.index)
    }

    pub fn supports_graphics(&self) -> bool {
        self.queue_family_index(QueueFlags::GRAPHICS).is_some()
    }

    pub fn supports_compute(&self) -> bool {
        self.queue_family_index(QueueFlags::COMPUTE).is_some()
    }

    pub fn supports_transfer(&self) -> bool {
        self.queue_family_index(QueueFlags::TRANSFER).is_some()
    }

    pub fn device_extensions(&self) -> Result<Vec<String>> {
        let extensions = unsafe {
            self.vulkan
                .vk_instance()
                .enumerate_device_extension_properties(self.physical_device)
                .map_err(Error::vulkan("vkEnumerateDeviceExtensionProperties"))?
        };
        Ok(extensions
            .iter()
            .map(|extension| fixed_str(&extension.extension_name))
            .collect())
    }

    pub fn vulkan(&self) -> &'a Vulkan {
        self.vulkan
    }
}

impl QueueFamilySource for Gpu<'_> {
    fn queue_families(&self) -> Vec<QueueFamily> {
        let properties = unsafe {
            self.vulkan
                .vk_instance()
                .get_physical_device_queue_family_properties(self.physical_device)
        };
        QueueFamily::enumerate(&properties)
    }

    fn label(&self) -> String {
        format!("\"{}\" ({:?})", self.name(), self.device_type())
    }
}

impl fmt::Debug for Gpu<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gpu")
            .field("name", &self.name())
            .field("device_type", &self.device_type())
            .field("physical_device", &self.physical_device)
            .finish()
    }
}
