//! Validation-layer diagnostics.
//!
//! The driver reports through `vulkan_debug_callback`, which converts the raw
//! callback data into a [`DiagnosticMessage`] and hands it to the
//! [`DiagnosticHandler`] registered when the instance was created.

use std::borrow::Cow;
use std::ffi::{c_void, CStr};
use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};

use ash::vk::{
    self, Bool32, DebugUtilsMessageSeverityFlagsEXT, DebugUtilsMessageTypeFlagsEXT,
    DebugUtilsMessengerCallbackDataEXT, DebugUtilsMessengerCreateInfoEXT, DebugUtilsMessengerEXT,
};
use bitflags::bitflags;
use log::Level;

use crate::error::{Error, Result};

/// Reported when no `--diagnostic-level` is given: everything but INFO.
pub const DEFAULT_SEVERITIES: DebugUtilsMessageSeverityFlagsEXT = DebugUtilsMessageSeverityFlagsEXT::from_raw(
    DebugUtilsMessageSeverityFlagsEXT::VERBOSE.as_raw()
        | DebugUtilsMessageSeverityFlagsEXT::WARNING.as_raw()
        | DebugUtilsMessageSeverityFlagsEXT::ERROR.as_raw(),
);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum)]
pub enum Severity {
    Verbose,
    Info,
    Warning,
    Error,
}

impl Severity {
    /// The most severe level present in `flags`.
    pub fn from_vk(flags: DebugUtilsMessageSeverityFlagsEXT) -> Self {
        if flags.contains(DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            Severity::Error
        } else if flags.contains(DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            Severity::Warning
        } else if flags.contains(DebugUtilsMessageSeverityFlagsEXT::INFO) {
            Severity::Info
        } else {
            Severity::Verbose
        }
    }

    pub fn to_vk(self) -> DebugUtilsMessageSeverityFlagsEXT {
        match self {
            Severity::Verbose => DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
            Severity::Info => DebugUtilsMessageSeverityFlagsEXT::INFO,
            Severity::Warning => DebugUtilsMessageSeverityFlagsEXT::WARNING,
            Severity::Error => DebugUtilsMessageSeverityFlagsEXT::ERROR,
        }
    }

    /// Severity mask that lets through `self` and everything more severe.
    pub fn and_above(self) -> DebugUtilsMessageSeverityFlagsEXT {
        [
            Severity::Verbose,
            Severity::Info,
            Severity::Warning,
            Severity::Error,
        ]
        .into_iter()
        .filter(|&severity| severity >= self)
        .fold(DebugUtilsMessageSeverityFlagsEXT::empty(), |mask, severity| {
            mask | severity.to_vk()
        })
    }

    /// Severity mask for an optional minimum level. Without one the
    /// informational messages are left out, the rest get through.
    pub fn mask(min_severity: Option<Severity>) -> DebugUtilsMessageSeverityFlagsEXT {
        match min_severity {
            Some(severity) => severity.and_above(),
            None => DEFAULT_SEVERITIES,
        }
    }

    pub fn log_level(self) -> Level {
        match self {
            Severity::Verbose => Level::Debug,
            Severity::Info => Level::Info,
            Severity::Warning => Level::Warn,
            Severity::Error => Level::Error,
        }
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct MessageCategories: u32 {
        /// Unrelated to the Vulkan specification or performance.
        const GENERAL = 1;
        /// A Vulkan specification violation or likely mistake.
        const VALIDATION = 1 << 1;
        /// Potentially non-optimal use of the API.
        const PERFORMANCE = 1 << 2;
    }
}

impl MessageCategories {
    pub fn from_vk(types: DebugUtilsMessageTypeFlagsEXT) -> Self {
        let mut categories = MessageCategories::empty();
        categories.set(
            MessageCategories::GENERAL,
            types.contains(DebugUtilsMessageTypeFlagsEXT::GENERAL),
        );
        categories.set(
            MessageCategories::VALIDATION,
            types.contains(DebugUtilsMessageTypeFlagsEXT::VALIDATION),
        );
        categories.set(
            MessageCategories::PERFORMANCE,
            types.contains(DebugUtilsMessageTypeFlagsEXT::PERFORMANCE),
        );
        categories
    }

    pub fn to_vk(self) -> DebugUtilsMessageTypeFlagsEXT {
        let mut types = DebugUtilsMessageTypeFlagsEXT::empty();
        if self.contains(MessageCategories::GENERAL) {
            types |= DebugUtilsMessageTypeFlagsEXT::GENERAL;
        }
        if self.contains(MessageCategories::VALIDATION) {
            types |= DebugUtilsMessageTypeFlagsEXT::VALIDATION;
        }
        if self.contains(MessageCategories::PERFORMANCE) {
            types |= DebugUtilsMessageTypeFlagsEXT::PERFORMANCE;
        }
        types
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelatedObject<'a> {
    pub object_type: vk::ObjectType,
    pub handle: u64,
    pub name: Option<Cow<'a, str>>,
}

#[derive(Clone, Debug)]
pub struct DiagnosticMessage<'a> {
    pub severity: Severity,
    pub categories: MessageCategories,
    pub id_name: Cow<'a, str>,
    pub id_number: i32,
    pub text: Cow<'a, str>,
    pub objects: Vec<RelatedObject<'a>>,
}

impl<'a> DiagnosticMessage<'a> {
    unsafe fn from_raw(
        severity: DebugUtilsMessageSeverityFlagsEXT,
        types: DebugUtilsMessageTypeFlagsEXT,
        data: &'a DebugUtilsMessengerCallbackDataEXT<'a>,
    ) -> Self {
        let objects = if data.p_objects.is_null() || data.object_count == 0 {
            Vec::new()
        } else {
            std::slice::from_raw_parts(data.p_objects, data.object_count as usize)
                .iter()
                .map(|object| RelatedObject {
                    object_type: object.object_type,
                    handle: object.object_handle,
                    name: (!object.p_object_name.is_null())
                        .then(|| lossy_str(object.p_object_name)),
                })
                .collect()
        };

        Self {
            severity: Severity::from_vk(severity),
            categories: MessageCategories::from_vk(types),
            id_name: lossy_str(data.p_message_id_name),
            id_number: data.message_id_number,
            text: lossy_str(data.p_message),
            objects,
        }
    }
}

unsafe fn lossy_str<'a>(ptr: *const c_char) -> Cow<'a, str> {
    if ptr.is_null() {
        Cow::from("")
    } else {
        CStr::from_ptr(ptr).to_string_lossy()
    }
}

/// What the triggering Vulkan call should do after a message was handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    /// Abort the call with `VK_ERROR_VALIDATION_FAILED_EXT`. Only meant for
    /// testing layers themselves.
    Abort,
}

impl Verdict {
    fn to_vk(self) -> Bool32 {
        match self {
            Verdict::Continue => vk::FALSE,
            Verdict::Abort => vk::TRUE,
        }
    }
}

/// Receives validation-layer messages. The driver may call it from any thread.
pub trait DiagnosticHandler: Send + Sync {
    fn handle(&self, message: &DiagnosticMessage<'_>) -> Verdict;
}

impl<F> DiagnosticHandler for F
where
    F: Fn(&DiagnosticMessage<'_>) -> Verdict + Send + Sync,
{
    fn handle(&self, message: &DiagnosticMessage<'_>) -> Verdict {
        self(message)
    }
}

/// Forwards messages to the `log` facade under the `vulkan` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogHandler;

impl DiagnosticHandler for LogHandler {
    fn handle(&self, message: &DiagnosticMessage<'_>) -> Verdict {
        log::log!(
            target: "vulkan",
            message.severity.log_level(),
            "{:?} [{} ({})] : {}",
            message.categories,
            message.id_name,
            message.id_number,
            message.text,
        );
        for object in &message.objects {
            log::log!(
                target: "vulkan",
                message.severity.log_level(),
                "    {:?} {:#x} {}",
                object.object_type,
                object.handle,
                object.name.as_deref().unwrap_or(""),
            );
        }
        Verdict::Continue
    }
}

/// Heap slot holding the registered handler. Its address is the messenger's
/// user-data pointer, so it must outlive the instance.
pub(crate) struct HandlerSlot {
    handler: Box<dyn DiagnosticHandler>,
}

impl HandlerSlot {
    pub(crate) fn new(handler: impl DiagnosticHandler + 'static) -> Box<Self> {
        Box::new(Self {
            handler: Box::new(handler),
        })
    }

    pub(crate) fn create_info(
        &self,
        min_severity: Option<Severity>,
    ) -> DebugUtilsMessengerCreateInfoEXT<'static> {
        DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(Severity::mask(min_severity))
            .message_type(MessageCategories::all().to_vk())
            .pfn_user_callback(Some(vulkan_debug_callback))
            .user_data(self as *const HandlerSlot as *mut c_void)
    }
}

unsafe extern "system" fn vulkan_debug_callback(
    message_severity: DebugUtilsMessageSeverityFlagsEXT,
    message_type: DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const DebugUtilsMessengerCallbackDataEXT<'_>,
    user_data: *mut c_void,
) -> Bool32 {
    if p_callback_data.is_null() || user_data.is_null() {
        return vk::FALSE;
    }

    let slot = &*(user_data as *const HandlerSlot);
    let data = &*p_callback_data;
    let message = DiagnosticMessage::from_raw(message_severity, message_type, data);

    // Unwinding into the driver is undefined behaviour.
    panic::catch_unwind(AssertUnwindSafe(|| slot.handler.handle(&message)))
        .unwrap_or(Verdict::Continue)
        .to_vk()
}

/// A debug utils messenger registered on an instance.
pub(crate) struct DiagnosticMessenger {
    loader: ash::ext::debug_utils::Instance,
    handle: DebugUtilsMessengerEXT,
}

impl DiagnosticMessenger {
    pub(crate) fn new(
        entry: &ash::Entry,
        instance: &ash::Instance,
        create_info: &DebugUtilsMessengerCreateInfoEXT<'_>,
    ) -> Result<Self> {
        let loader = ash::ext::debug_utils::Instance::new(entry, instance);
        let handle = unsafe {
            loader
                .create_debug_utils_messenger(create_info, None)
                .map_err(Error::DiagnosticMessengerCreation)?
        };
        Ok(Self { loader, handle })
    }

    /// # Safety
    /// Must be called exactly once, before the owning instance is destroyed.
    pub(crate) unsafe fn destroy(&self) {
        self.loader
            .destroy_debug_utils_messenger(self.handle, None);
    }
}
