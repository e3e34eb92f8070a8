//! Physical device selection.
//!
//! Candidates are scanned in the order the platform enumerated them and the
//! first one whose queue families satisfy the requirement is chosen. There is
//! no ranking: device type and limits play no part.

use log::{debug, info};

use crate::error::{Error, Result};
use crate::queue_family::{QueueFamily, QueueFamilyIndices, QueueRequirement};

/// Something whose queue families can be enumerated.
pub trait QueueFamilySource {
    /// Queries the queue families afresh, in platform order.
    fn queue_families(&self) -> Vec<QueueFamily>;

    /// Label used when logging selection decisions.
    fn label(&self) -> String {
        String::from("<device>")
    }
}

/// A presentation target that can tell whether a queue family of `D` may
/// present to it.
pub trait PresentationSupport<D> {
    fn supports_present(&self, device: &D, family_index: u32) -> Result<bool>;
}

#[derive(Debug)]
pub struct SelectedDevice<D> {
    pub device: D,
    /// Position of `device` in the candidate sequence.
    pub position: usize,
    pub queue_families: QueueFamilyIndices,
}

pub struct DeviceSelector<'a, D> {
    presentation: Option<&'a dyn PresentationSupport<D>>,
}

impl<'a, D: QueueFamilySource> DeviceSelector<'a, D> {
    /// A selector that only asks for a graphics-capable queue family.
    pub fn new() -> Self {
        Self { presentation: None }
    }

    /// Additionally require a queue family that can present to `target`.
    pub fn with_presentation(mut self, target: &'a dyn PresentationSupport<D>) -> Self {
        self.presentation = Some(target);
        self
    }

    pub fn requirement(&self) -> QueueRequirement {
        match self.presentation {
            Some(_) => QueueRequirement::GraphicsPresent,
            None => QueueRequirement::Graphics,
        }
    }

    pub fn find_queue_families(&self, device: &D) -> Result<QueueFamilyIndices> {
        let requirement = self.requirement();
        let mut indices = QueueFamilyIndices::default();

        for family in device.queue_families() {
            if indices.graphics_family.is_none() && family.supports_graphics() {
                indices.graphics_family = Some(family.index);
            }

            if let Some(target) = self.presentation {
                if indices.present_family.is_none()
                    && target.supports_present(device, family.index)?
                {
                    indices.present_family = Some(family.index);
                }
            }

            if indices.is_complete(requirement) {
                break;
            }
        }

        Ok(indices)
    }

    pub fn is_device_suitable(&self, device: &D) -> Result<bool> {
        Ok(self
            .find_queue_families(device)?
            .is_complete(self.requirement()))
    }

    /// Returns the first suitable device of `devices`.
    pub fn select<I>(&self, devices: I) -> Result<SelectedDevice<D>>
    where
        I: IntoIterator<Item = D>,
    {
        let requirement = self.requirement();

        for (position, device) in devices.into_iter().enumerate() {
            let queue_families = self.find_queue_families(&device)?;
            if queue_families.is_complete(requirement) {
                info!(
                    "selected physical device {} ({:?})",
                    device.label(),
                    queue_families
                );
                return Ok(SelectedDevice {
                    device,
                    position,
                    queue_families,
                });
            }
            debug!(
                "skipping physical device {}: {:?} does not satisfy {:?}",
                device.label(),
                queue_families,
                requirement
            );
        }

        Err(Error::NoSuitableDevice)
    }
}

impl<'a, D: QueueFamilySource> Default for DeviceSelector<'a, D> {
    fn default() -> Self {
        Self::new()
    }
}

/// Selects the first device with a graphics-capable queue family.
pub fn select_device<D, I>(devices: I) -> Result<SelectedDevice<D>>
where
    D: QueueFamilySource,
    I: IntoIterator<Item = D>,
{
    DeviceSelector::new().select(devices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::{self, QueueFlags};
    use std::cell::Cell;

    #[derive(Debug, Clone)]
    struct FakeDevice {
        id: usize,
        families: Vec<QueueFlags>,
        present: Vec<bool>,
    }

    impl FakeDevice {
        fn new(id: usize, families: &[QueueFlags]) -> Self {
            Self {
                id,
                families: families.to_vec(),
                present: vec![false; families.len()],
            }
        }

        fn presenting(mut self, family: usize) -> Self {
            self.present[family] = true;
            self
        }
    }

    impl QueueFamilySource for FakeDevice {
        fn queue_families(&self) -> Vec<QueueFamily> {
            self.families
                .iter()
                .enumerate()
                .map(|(index, &flags)| QueueFamily::new(index as u32, flags, 1))
                .collect()
        }
    }

    #[derive(Default)]
    struct FakeSurface {
        queries: Cell<usize>,
        fail: bool,
    }

    impl PresentationSupport<FakeDevice> for FakeSurface {
        fn supports_present(&self, device: &FakeDevice, family_index: u32) -> Result<bool> {
            self.queries.set(self.queries.get() + 1);
            if self.fail {
                return Err(Error::vulkan("vkGetPhysicalDeviceSurfaceSupportKHR")(
                    vk::Result::ERROR_SURFACE_LOST_KHR,
                ));
            }
            Ok(device.present[family_index as usize])
        }
    }

    fn compute_only(id: usize) -> FakeDevice {
        FakeDevice::new(id, &[QueueFlags::COMPUTE, QueueFlags::TRANSFER])
    }

    fn graphics(id: usize) -> FakeDevice {
        FakeDevice::new(id, &[QueueFlags::TRANSFER, QueueFlags::GRAPHICS])
    }

    #[test]
    fn first_suitable_device_wins() {
        let devices: Vec<FakeDevice> = (0..7)
            .map(|id| if id == 2 || id == 5 { graphics(id) } else { compute_only(id) })
            .collect();

        let selected = select_device(devices).unwrap();
        assert_eq!(selected.device.id, 2);
        assert_eq!(selected.position, 2);
    }

    #[test]
    fn empty_input_is_no_suitable_device() {
        let result = select_device(Vec::<FakeDevice>::new());
        assert!(matches!(result, Err(Error::NoSuitableDevice)));
    }

    #[test]
    fn no_graphics_family_is_no_suitable_device() {
        let result = select_device(vec![compute_only(0), compute_only(1)]);
        assert!(matches!(result, Err(Error::NoSuitableDevice)));
    }

    #[test]
    fn recorded_index_is_driver_position() {
        let device = FakeDevice::new(
            0,
            &[
                QueueFlags::TRANSFER,
                QueueFlags::COMPUTE,
                QueueFlags::GRAPHICS,
                QueueFlags::GRAPHICS | QueueFlags::COMPUTE,
            ],
        );

        let selected = select_device(vec![device]).unwrap();
        assert_eq!(selected.queue_families.graphics_family, Some(2));
        assert_eq!(selected.queue_families.present_family, None);
    }

    #[test]
    fn minimal_selection_ignores_presentation() {
        let selector = DeviceSelector::<FakeDevice>::new();
        assert_eq!(selector.requirement(), QueueRequirement::Graphics);

        // Family 0 cannot present anywhere, which only matters to the extended selector.
        let selected = selector.select(vec![graphics(0)]).unwrap();
        assert_eq!(selected.queue_families.present_family, None);
        assert!(selected.queue_families.is_complete(QueueRequirement::Graphics));
    }

    #[test]
    fn present_and_graphics_on_the_same_family() {
        let surface = FakeSurface::default();
        let device = FakeDevice::new(0, &[QueueFlags::COMPUTE, QueueFlags::GRAPHICS]).presenting(1);

        let selected = DeviceSelector::<FakeDevice>::new()
            .with_presentation(&surface)
            .select(vec![device])
            .unwrap();
        assert_eq!(selected.queue_families.graphics_family, Some(1));
        assert_eq!(selected.queue_families.present_family, Some(1));
        assert_eq!(selected.queue_families.unique_families(), vec![1]);
    }

    #[test]
    fn present_and_graphics_on_different_families() {
        let surface = FakeSurface::default();
        let device = FakeDevice::new(0, &[QueueFlags::GRAPHICS, QueueFlags::TRANSFER]).presenting(1);

        let selected = DeviceSelector::<FakeDevice>::new()
            .with_presentation(&surface)
            .select(vec![device])
            .unwrap();
        assert_eq!(selected.queue_families.graphics_family, Some(0));
        assert_eq!(selected.queue_families.present_family, Some(1));
    }

    #[test]
    fn requirements_split_across_devices_are_rejected() {
        let surface = FakeSurface::default();
        let graphics_only = FakeDevice::new(0, &[QueueFlags::GRAPHICS]);
        let present_only = FakeDevice::new(1, &[QueueFlags::TRANSFER]).presenting(0);

        let result = DeviceSelector::<FakeDevice>::new()
            .with_presentation(&surface)
            .select(vec![graphics_only, present_only]);
        assert!(matches!(result, Err(Error::NoSuitableDevice)));
    }

    #[test]
    fn extended_selection_skips_devices_without_present() {
        let surface = FakeSurface::default();
        let headless = graphics(0);
        let windowed = graphics(1).presenting(0);

        let selected = DeviceSelector::<FakeDevice>::new()
            .with_presentation(&surface)
            .select(vec![headless, windowed])
            .unwrap();
        assert_eq!(selected.device.id, 1);
        assert_eq!(selected.queue_families.graphics_family, Some(1));
        assert_eq!(selected.queue_families.present_family, Some(0));
    }

    #[test]
    fn scan_stops_once_complete() {
        let surface = FakeSurface::default();
        let device = FakeDevice::new(
            0,
            &[QueueFlags::GRAPHICS, QueueFlags::GRAPHICS, QueueFlags::GRAPHICS],
        )
        .presenting(0)
        .presenting(2);

        let selector = DeviceSelector::<FakeDevice>::new().with_presentation(&surface);
        let indices = selector.find_queue_families(&device).unwrap();
        assert_eq!(indices.present_family, Some(0));
        assert_eq!(surface.queries.get(), 1);
    }

    #[test]
    fn presentation_query_failure_propagates() {
        let surface = FakeSurface {
            fail: true,
            ..Default::default()
        };

        let result = DeviceSelector::<FakeDevice>::new()
            .with_presentation(&surface)
            .select(vec![graphics(0)]);
        assert!(matches!(result, Err(Error::Vulkan { .. })));
    }

    #[test]
    fn suitability_follows_the_requirement() {
        let minimal = DeviceSelector::<FakeDevice>::new();
        assert!(minimal.is_device_suitable(&graphics(0)).unwrap());
        assert!(!minimal.is_device_suitable(&compute_only(1)).unwrap());

        let surface = FakeSurface::default();
        let windowed = DeviceSelector::<FakeDevice>::new().with_presentation(&surface);
        assert!(!windowed.is_device_suitable(&graphics(2)).unwrap());
        assert!(windowed.is_device_suitable(&graphics(3).presenting(0)).unwrap());
        assert!(!windowed.is_device_suitable(&compute_only(4).presenting(0)).unwrap());
    }
}
