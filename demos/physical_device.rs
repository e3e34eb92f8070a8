use vk_setup::config::{InstanceConfig, ValidationMode};
use vk_setup::diagnostics::LogHandler;
use vk_setup::vulkan::Vulkan;

pub fn main() -> vk_setup::Result<()> {
    env_logger::init();

    let config = InstanceConfig {
        application_name: String::from("My Application"),
        validation: ValidationMode::Required,
        ..Default::default()
    };
    let vulkan = Vulkan::new(&config, &[], LogHandler)?;

    for device in vulkan.physical_devices()? {
        println!(
            "{} ({:?}) graphics: {} compute: {} transfer: {}",
            device.name(),
            device.device_type(),
            device.supports_graphics(),
            device.supports_compute(),
            device.supports_transfer()
        );
        for extension in device.device_extensions()? {
            println!("\t{}", extension);
        }
    }
    Ok(())
}
