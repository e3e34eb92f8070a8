use ash::vk::SurfaceKHR;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle};
use std::ffi::CStr;
use std::rc::Rc;

use crate::device_selector::PresentationSupport;
use crate::error::{Error, Result};
use crate::gpu::Gpu;
use crate::vulkan::Vulkan;

/// Instance extensions the window system needs to create a surface.
pub fn required_extensions(display: RawDisplayHandle) -> Result<Vec<&'static CStr>> {
    let names = ash_window::enumerate_required_extensions(display)
        .map_err(Error::vulkan("vkEnumerateInstanceExtensionProperties"))?;
    // ash-window hands out pointers to its own static, nul-terminated names.
    Ok(names
        .iter()
        .map(|&name| unsafe { CStr::from_ptr(name) })
        .collect())
}

/// A presentation target bound to a window.
///
/// Holds on to the instance so the instance cannot be destroyed first.
pub struct Surface {
    vulkan: Rc<Vulkan>,
    loader: ash::khr::surface::Instance,
    handle: SurfaceKHR,
}

impl Surface {
    pub fn new<W>(vulkan: &Rc<Vulkan>, window: &W) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window.display_handle()?.as_raw();
        let handle = window.window_handle()?.as_raw();

        let surface = unsafe {
            ash_window::create_surface(
                vulkan.library(),
                vulkan.vk_instance(),
                display,
                handle,
                None,
            )
            .map_err(Error::SurfaceCreation)?
        };
        let loader = ash::khr::surface::Instance::new(vulkan.library(), vulkan.vk_instance());

        Ok(Self {
            vulkan: vulkan.clone(),
            loader,
            handle: surface,
        })
    }

    pub fn handle(&self) -> SurfaceKHR {
        self.handle
    }

    pub fn vulkan(&self) -> &Vulkan {
        &self.vulkan
    }
}

impl<'a> PresentationSupport<Gpu<'a>> for Surface {
    fn supports_present(&self, device: &Gpu<'a>, family_index: u32) -> Result<bool> {
        unsafe {
            self.loader
                .get_physical_device_surface_support(
                    device.vk_physical_device(),
                    family_index,
                    self.handle,
                )
                .map_err(Error::vulkan("vkGetPhysicalDeviceSurfaceSupportKHR"))
        }
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_surface(self.handle, None);
        }
    }
}
