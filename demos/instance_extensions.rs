use vk_setup::vulkan::Vulkan;

pub fn main() -> vk_setup::Result<()> {
    let instance_extensions = Vulkan::available_instance_extensions()?;
    for extension in instance_extensions {
        println!("{}", extension);
    }
    Ok(())
}
