use vk_setup::config::InstanceConfig;
use vk_setup::context::VulkanContext;

pub fn main() -> vk_setup::Result<()> {
    env_logger::init();

    let context = VulkanContext::headless(&InstanceConfig::default())?;
    let device = context.device();
    println!(
        "graphics queue {:?} on family {:?}",
        device.graphics_queue(),
        device.queue_families().graphics_family
    );
    Ok(())
}
