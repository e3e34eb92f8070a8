use clap::{Parser, ValueEnum};

use crate::diagnostics::Severity;

/// Whether validation layers and the diagnostic messenger are used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ValidationMode {
    Off,
    /// On in debug builds. Missing layers or a failed messenger only warn.
    Auto,
    /// Always on. Missing layers or a failed messenger are fatal.
    Required,
}

impl ValidationMode {
    pub fn is_enabled(self) -> bool {
        match self {
            ValidationMode::Off => false,
            ValidationMode::Auto => cfg!(debug_assertions),
            ValidationMode::Required => true,
        }
    }

    pub fn is_required(self) -> bool {
        self == ValidationMode::Required
    }
}

/// Everything the instance bootstrap needs, resolved once at start-up.
#[derive(Clone, Debug)]
pub struct InstanceConfig {
    pub application_name: String,
    pub validation: ValidationMode,
    /// `None` reports everything except informational messages.
    pub diagnostic_level: Option<Severity>,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            application_name: String::from("Hello Triangle"),
            validation: ValidationMode::Auto,
            diagnostic_level: None,
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(version, about = "Opens a window and brings up a Vulkan device for it")]
pub struct Config {
    /// Application name reported to the driver.
    #[arg(long = "app-name", default_value = "Hello Triangle")]
    pub application_name: String,

    #[arg(long, default_value = "Vulkan")]
    pub title: String,

    #[arg(long, default_value_t = 800)]
    pub width: u32,

    #[arg(long, default_value_t = 600)]
    pub height: u32,

    #[arg(long, value_enum, env = "VK_SETUP_VALIDATION", default_value_t = ValidationMode::Auto)]
    pub validation: ValidationMode,

    /// Least severe validation message that gets reported. Without it,
    /// everything but informational messages is reported.
    #[arg(long, value_enum)]
    pub diagnostic_level: Option<Severity>,

    /// Skip the window: select a graphics device, open it and exit.
    #[arg(long)]
    pub headless: bool,
}

impl Config {
    pub fn instance(&self) -> InstanceConfig {
        InstanceConfig {
            application_name: self.application_name.clone(),
            validation: self.validation,
            diagnostic_level: self.diagnostic_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_open_an_800_by_600_window() {
        let config = Config::try_parse_from(["vk_setup"]).unwrap();
        assert_eq!(config.width, 800);
        assert_eq!(config.height, 600);
        assert_eq!(config.title, "Vulkan");
        assert_eq!(config.diagnostic_level, None);
        assert_eq!(InstanceConfig::default().diagnostic_level, None);
        assert!(!config.headless);
        assert_eq!(config.instance().application_name, "Hello Triangle");
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "vk_setup",
            "--app-name",
            "triangle-demo",
            "--validation",
            "required",
            "--diagnostic-level",
            "warning",
            "--headless",
        ])
        .unwrap();

        let instance = config.instance();
        assert_eq!(instance.application_name, "triangle-demo");
        assert_eq!(instance.validation, ValidationMode::Required);
        assert_eq!(instance.diagnostic_level, Some(Severity::Warning));
        assert!(config.headless);
    }

    #[test]
    fn unknown_validation_mode_is_rejected() {
        assert!(Config::try_parse_from(["vk_setup", "--validation", "sometimes"]).is_err());
    }

    #[test]
    fn validation_mode_resolution() {
        assert!(!ValidationMode::Off.is_enabled());
        assert!(ValidationMode::Required.is_enabled());
        assert!(ValidationMode::Required.is_required());
        assert!(!ValidationMode::Auto.is_required());
        assert_eq!(ValidationMode::Auto.is_enabled(), cfg!(debug_assertions));
    }
}
