use ash::vk::{self, DeviceCreateInfo, DeviceQueueCreateInfo, PhysicalDevice, PhysicalDeviceFeatures, Queue};
use ash::Device;
use log::{info, warn};
use std::os::raw::c_char;
use std::rc::Rc;

use crate::device_selector::SelectedDevice;
use crate::error::{Error, Result};
use crate::gpu::Gpu;
use crate::queue_family::QueueFamilyIndices;
use crate::vulkan::Vulkan;

/// The logical device opened on the selected physical device, with its
/// graphics queue and, when a surface was involved, its present queue.
pub struct LogicalDevice {
    handle: Device,
    physical_device: PhysicalDevice,
    queue_families: QueueFamilyIndices,
    graphics_queue: Queue,
    present_queue: Option<Queue>,
    _vulkan: Rc<Vulkan>,
}

impl LogicalDevice {
    pub fn new(vulkan: &Rc<Vulkan>, selected: &SelectedDevice<Gpu<'_>>) -> Result<Self> {
        let queue_families = selected.queue_families;
        let graphics_family = queue_families
            .graphics_family
            .ok_or(Error::NoSuitableDevice)?;

        let priorities: [f32; 1] = [1.];
        let queue_info: Vec<DeviceQueueCreateInfo> = queue_families
            .unique_families()
            .into_iter()
            .map(|index| {
                DeviceQueueCreateInfo::default()
                    .queue_family_index(index)
                    .queue_priorities(&priorities)
            })
            .collect();

        #[allow(unused_mut)]
        let mut extension_names_raw: Vec<*const c_char> = Vec::new();
        #[cfg(any(target_os = "macos", target_os = "ios"))]
        {
            extension_names_raw.push(ash::khr::portability_subset::NAME.as_ptr());
        }

        let features = PhysicalDeviceFeatures::default();
        let create_info = DeviceCreateInfo::default()
            .queue_create_infos(&queue_info)
            .enabled_extension_names(&extension_names_raw)
            .enabled_features(&features);

        let physical_device = selected.device.vk_physical_device();
        let handle = unsafe {
            vulkan
                .vk_instance()
                .create_device(physical_device, &create_info, None)
                .map_err(Error::DeviceCreation)?
        };

        let graphics_queue = unsafe { handle.get_device_queue(graphics_family, 0) };
        let present_queue = queue_families
            .present_family
            .map(|family| unsafe { handle.get_device_queue(family, 0) });

        info!(
            "opened logical device on {} with queue families {:?}",
            selected.device.name(),
            queue_families.unique_families()
        );

        Ok(Self {
            handle,
            physical_device,
            queue_families,
            graphics_queue,
            present_queue,
            _vulkan: vulkan.clone(),
        })
    }

    pub fn handle(&self) -> &Device {
        &self.handle
    }

    pub fn vk_physical_device(&self) -> PhysicalDevice {
        self.physical_device
    }

    pub fn queue_families(&self) -> QueueFamilyIndices {
        self.queue_families
    }

    pub fn graphics_queue(&self) -> Queue {
        self.graphics_queue
    }

    pub fn present_queue(&self) -> Option<Queue> {
        self.present_queue
    }

    pub fn wait(&self) -> Result<()> {
        unsafe {
            self.handle
                .device_wait_idle()
                .map_err(Error::vulkan("vkDeviceWaitIdle"))
        }
    }
}

/// Returns whether the device went idle. Teardown continues either way.
fn idle_before_destroy(result: std::result::Result<(), vk::Result>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            warn!("vkDeviceWaitIdle failed during teardown: {}", err);
            false
        }
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            idle_before_destroy(self.handle.device_wait_idle());
            self.handle.destroy_device(None);
        }
    }
}
