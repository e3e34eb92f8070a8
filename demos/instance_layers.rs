use vk_setup::vulkan::Vulkan;

pub fn main() -> vk_setup::Result<()> {
    let instance_layers = Vulkan::available_instance_layers()?;
    for layer in instance_layers {
        println!("{}", layer);
    }
    Ok(())
}
