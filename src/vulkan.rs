use ash::vk::{
    self, make_api_version, ApplicationInfo, InstanceCreateFlags, InstanceCreateInfo,
    LayerProperties,
};
pub use ash::{Entry, Instance};
use log::{debug, info, warn};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use crate::config::InstanceConfig;
use crate::diagnostics::{DiagnosticHandler, DiagnosticMessenger, HandlerSlot};
use crate::error::{Error, Result};
use crate::gpu::Gpu;

pub const VALIDATION_LAYERS: &[&CStr] = &[c"VK_LAYER_KHRONOS_validation"];

const ENGINE_NAME: &CStr = c"No Engine";

/// Reads a fixed-size, nul-terminated name array filled in by the driver.
pub(crate) fn fixed_str(raw: &[c_char]) -> String {
    let bytes: Vec<u8> = raw
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Names in `required` that do not appear in `available`.
pub fn missing_layers(required: &[&CStr], available: &[LayerProperties]) -> Vec<String> {
    let available: Vec<String> = available
        .iter()
        .map(|layer| fixed_str(&layer.layer_name))
        .collect();

    required
        .iter()
        .map(|layer| layer.to_string_lossy().into_owned())
        .filter(|layer| !available.contains(layer))
        .collect()
}

struct Diagnostics {
    messenger: Option<DiagnosticMessenger>,
    // Referenced by the driver through the messenger user-data pointer.
    _slot: Box<HandlerSlot>,
}

/// The process-wide Vulkan instance, plus the validation messenger when
/// diagnostics are enabled.
pub struct Vulkan {
    library: Entry,
    instance: Instance,
    diagnostics: Option<Diagnostics>,
}

impl Vulkan {
    pub fn new(
        config: &InstanceConfig,
        extensions: &[&CStr],
        handler: impl DiagnosticHandler + 'static,
    ) -> Result<Self> {
        let library = unsafe { Entry::load()? };

        let validation = config.validation.is_enabled()
            && Self::validation_layers_available(&library, config)?;

        let c_name = CString::new(config.application_name.as_str())
            .unwrap_or_else(|_| CString::from(c"vk_setup"));
        let appinfo = ApplicationInfo::default()
            .application_name(&c_name)
            .application_version(make_api_version(0, 1, 0, 0))
            .engine_name(ENGINE_NAME)
            .engine_version(make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let mut extension_names_raw: Vec<*const c_char> =
            extensions.iter().map(|ext| ext.as_ptr()).collect();
        if validation {
            extension_names_raw.push(ash::ext::debug_utils::NAME.as_ptr());
        }

        #[allow(unused_mut)]
        let mut flags = InstanceCreateFlags::empty();
        #[cfg(any(target_os = "macos", target_os = "ios"))]
        {
            extension_names_raw.push(ash::khr::portability_enumeration::NAME.as_ptr());
            flags |= InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
        }

        let layers_names_raw: Vec<*const c_char> = if validation {
            VALIDATION_LAYERS.iter().map(|layer| layer.as_ptr()).collect()
        } else {
            Vec::new()
        };

        let slot = validation.then(|| HandlerSlot::new(handler));
        // Reports problems in instance creation and destruction themselves.
        let mut instance_debug_info = slot
            .as_ref()
            .map(|slot| slot.create_info(config.diagnostic_level));

        let mut create_info = InstanceCreateInfo::default()
            .flags(flags)
            .application_info(&appinfo)
            .enabled_layer_names(&layers_names_raw)
            .enabled_extension_names(&extension_names_raw);
        if let Some(debug_info) = instance_debug_info.as_mut() {
            create_info = create_info.push_next(debug_info);
        }

        let instance = unsafe {
            library
                .create_instance(&create_info, None)
                .map_err(Error::InstanceCreation)?
        };

        match Self::available_extensions(&library) {
            Ok(names) => {
                debug!("available instance extensions:");
                for name in names {
                    debug!("\t{}", name);
                }
            }
            Err(error) => debug!("could not list instance extensions: {}", error),
        }

        let diagnostics = match slot {
            Some(slot) => {
                let debug_info = slot.create_info(config.diagnostic_level);
                let messenger = match DiagnosticMessenger::new(&library, &instance, &debug_info) {
                    Ok(messenger) => Some(messenger),
                    Err(error) if config.validation.is_required() => {
                        unsafe { instance.destroy_instance(None) };
                        return Err(error);
                    }
                    Err(error) => {
                        warn!("{}, continuing without diagnostics", error);
                        None
                    }
                };
                Some(Diagnostics {
                    messenger,
                    _slot: slot,
                })
            }
            None => None,
        };

        info!(
            "created Vulkan instance for \"{}\" (validation {})",
            config.application_name,
            if validation { "on" } else { "off" }
        );

        Ok(Self {
            library,
            instance,
            diagnostics,
        })
    }

    fn validation_layers_available(library: &Entry, config: &InstanceConfig) -> Result<bool> {
        let available = unsafe {
            library
                .enumerate_instance_layer_properties()
                .map_err(Error::vulkan("vkEnumerateInstanceLayerProperties"))?
        };
        let missing = missing_layers(VALIDATION_LAYERS, &available);
        if missing.is_empty() {
            Ok(true)
        } else if config.validation.is_required() {
            Err(Error::MissingRequiredLayer(missing))
        } else {
            warn!(
                "validation layers not available ({}), continuing without them",
                missing.join(", ")
            );
            Ok(false)
        }
    }

    fn available_extensions(library: &Entry) -> Result<Vec<String>> {
        let extensions = unsafe {
            library
                .enumerate_instance_extension_properties(None)
                .map_err(Error::vulkan("vkEnumerateInstanceExtensionProperties"))?
        };
        Ok(extensions
            .iter()
            .map(|extension| fixed_str(&extension.extension_name))
            .collect())
    }

    pub fn available_instance_layers() -> Result<Vec<String>> {
        let library = unsafe { Entry::load()? };
        let layers = unsafe {
            library
                .enumerate_instance_layer_properties()
                .map_err(Error::vulkan("vkEnumerateInstanceLayerProperties"))?
        };
        Ok(layers
            .iter()
            .map(|layer| fixed_str(&layer.layer_name))
            .collect())
    }

    pub fn available_instance_extensions() -> Result<Vec<String>> {
        let library = unsafe { Entry::load()? };
        Self::available_extensions(&library)
    }

    pub fn library(&self) -> &Entry {
        &self.library
    }

    pub fn vk_instance(&self) -> &Instance {
        &self.instance
    }

    pub fn has_diagnostics(&self) -> bool {
        self.diagnostics
            .as_ref()
            .is_some_and(|diagnostics| diagnostics.messenger.is_some())
    }

    /// All physical devices, in the order the driver enumerates them.
    pub fn physical_devices(&self) -> Result<Vec<Gpu<'_>>> {
        let devices = unsafe {
            self.instance
                .enumerate_physical_devices()
                .map_err(Error::vulkan("vkEnumeratePhysicalDevices"))?
        };

        if devices.is_empty() {
            return Err(Error::NoDevicesFound);
        }

        Ok(devices
            .into_iter()
            .map(|physical_device| Gpu::new(self, physical_device))
            .collect())
    }
}

impl Drop for Vulkan {
    fn drop(&mut self) {
        unsafe {
            if let Some(messenger) = self
                .diagnostics
                .as_ref()
                .and_then(|diagnostics| diagnostics.messenger.as_ref())
            {
                messenger.destroy();
            }
            self.instance.destroy_instance(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(name: &str) -> LayerProperties {
        let mut properties = LayerProperties::default();
        for (slot, byte) in properties.layer_name.iter_mut().zip(name.bytes()) {
            *slot = byte as c_char;
        }
        properties
    }

    #[test]
    fn fixed_str_stops_at_nul() {
        let mut raw = [0 as c_char; 16];
        for (slot, byte) in raw.iter_mut().zip(b"VK_KHR_surface") {
            *slot = *byte as c_char;
        }
        assert_eq!(fixed_str(&raw), "VK_KHR_surface");
        assert_eq!(fixed_str(&[0; 4]), "");
    }

    #[test]
    fn validation_layer_present() {
        let available = [layer("VK_LAYER_MESA_device_select"), layer("VK_LAYER_KHRONOS_validation")];
        assert!(missing_layers(VALIDATION_LAYERS, &available).is_empty());
    }

    #[test]
    fn validation_layer_absent() {
        let available = [layer("VK_LAYER_MESA_device_select")];
        assert_eq!(
            missing_layers(VALIDATION_LAYERS, &available),
            vec!["VK_LAYER_KHRONOS_validation".to_owned()]
        );
        assert_eq!(missing_layers(VALIDATION_LAYERS, &[]).len(), 1);
    }

    #[test]
    fn layer_names_must_match_exactly() {
        let available = [layer("VK_LAYER_KHRONOS_validation_extra")];
        assert_eq!(missing_layers(VALIDATION_LAYERS, &available).len(), 1);
    }
}
