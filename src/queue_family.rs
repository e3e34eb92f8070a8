use ash::vk::{QueueFamilyProperties, QueueFlags};

/// One command-submission channel of a physical device.
///
/// `index` is the position of the family in the sequence the driver returned,
/// and is the identifier later passed to queue creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFamily {
    pub index: u32,
    pub flags: QueueFlags,
    pub queue_count: u32,
}

impl QueueFamily {
    pub fn new(index: u32, flags: QueueFlags, queue_count: u32) -> Self {
        Self {
            index,
            flags,
            queue_count,
        }
    }

    pub(crate) fn enumerate(properties: &[QueueFamilyProperties]) -> Vec<QueueFamily> {
        properties
            .iter()
            .enumerate()
            .map(|(index, info)| Self::new(index as u32, info.queue_flags, info.queue_count))
            .collect()
    }

    pub fn supports(&self, flags: QueueFlags) -> bool {
        self.flags.contains(flags)
    }

    pub fn supports_graphics(&self) -> bool {
        self.supports(QueueFlags::GRAPHICS)
    }
}

/// Which queue families a device must expose to be usable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueRequirement {
    /// A family that accepts graphics commands.
    Graphics,
    /// A graphics family and a family that can present to a surface.
    /// The two may be the same family.
    GraphicsPresent,
}

impl QueueRequirement {
    pub fn needs_present(self) -> bool {
        matches!(self, QueueRequirement::GraphicsPresent)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics_family: Option<u32>,
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    /// True when every family `requirement` asks for has been resolved.
    pub fn is_complete(&self, requirement: QueueRequirement) -> bool {
        let graphics = self.graphics_family.is_some();
        let present = !requirement.needs_present() || self.present_family.is_some();
        graphics && present
    }

    /// Resolved family indices with duplicates removed, in ascending order.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families: Vec<u32> = self
            .graphics_family
            .iter()
            .chain(self.present_family.iter())
            .copied()
            .collect();
        families.sort_unstable();
        families.dedup();
        families
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn properties(flags: &[QueueFlags]) -> Vec<QueueFamilyProperties> {
        flags
            .iter()
            .map(|&queue_flags| QueueFamilyProperties {
                queue_flags,
                queue_count: 1,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn enumerate_keeps_driver_order() {
        let families = QueueFamily::enumerate(&properties(&[
            QueueFlags::TRANSFER,
            QueueFlags::COMPUTE,
            QueueFlags::GRAPHICS | QueueFlags::COMPUTE,
        ]));

        let indices: Vec<u32> = families.iter().map(|family| family.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(!families[0].supports_graphics());
        assert!(families[2].supports_graphics());
        assert!(families[2].supports(QueueFlags::COMPUTE));
    }

    #[test]
    fn default_indices_are_incomplete() {
        let indices = QueueFamilyIndices::default();
        assert!(!indices.is_complete(QueueRequirement::Graphics));
        assert!(!indices.is_complete(QueueRequirement::GraphicsPresent));
    }

    #[test]
    fn present_alone_is_never_complete() {
        let indices = QueueFamilyIndices {
            graphics_family: None,
            present_family: Some(0),
        };
        assert!(!indices.is_complete(QueueRequirement::Graphics));
        assert!(!indices.is_complete(QueueRequirement::GraphicsPresent));
    }

    #[test]
    fn shared_family_is_listed_once() {
        let indices = QueueFamilyIndices {
            graphics_family: Some(1),
            present_family: Some(1),
        };
        assert_eq!(indices.unique_families(), vec![1]);

        let split = QueueFamilyIndices {
            graphics_family: Some(2),
            present_family: Some(0),
        };
        assert_eq!(split.unique_families(), vec![0, 2]);
    }

    proptest! {
        #[test]
        fn complete_iff_required_fields_resolved(
            graphics in proptest::option::of(0u32..16),
            present in proptest::option::of(0u32..16),
        ) {
            let indices = QueueFamilyIndices {
                graphics_family: graphics,
                present_family: present,
            };

            prop_assert_eq!(
                indices.is_complete(QueueRequirement::Graphics),
                graphics.is_some()
            );
            prop_assert_eq!(
                indices.is_complete(QueueRequirement::GraphicsPresent),
                graphics.is_some() && present.is_some()
            );
        }
    }
}
