use clap::Parser;
use log::info;
use std::process::ExitCode;

use vk_setup::config::Config;
use vk_setup::context::VulkanContext;
use vk_setup::{window, Result};

fn run(config: Config) -> Result<()> {
    if config.headless {
        let context = VulkanContext::headless(&config.instance())?;
        info!(
            "headless device ready (queue families {:?})",
            context.device().queue_families()
        );
        return Ok(());
    }
    window::run(config)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Config::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
