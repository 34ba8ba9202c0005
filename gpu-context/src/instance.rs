//! Low-level API instance: a thin owner of `ash::Entry` + `ash::Instance`,
//! nothing more.

use std::ffi::{CStr, CString};
use std::sync::Arc;

use ash::vk;

use crate::adapter::Adapter;
use crate::config::ContextConfig;
use crate::error::{fatal, DeviceError};

pub struct InstanceShared {
    pub(crate) entry: ash::Entry,
    pub(crate) raw: ash::Instance,
}

impl Drop for InstanceShared {
    fn drop(&mut self) {
        unsafe { self.raw.destroy_instance(None) };
    }
}

/// One process-wide low-level API instance (specification §3, "Device
/// context").
pub struct Instance {
    pub(crate) shared: Arc<InstanceShared>,
}

impl Instance {
    /// Creates the instance. Fatal per §7 ("fatal if no adapter supports
    /// the API") is actually raised later, at [`Instance::pick_adapter`];
    /// here we only fail if the Vulkan loader itself cannot be found,
    /// which is equally fatal.
    pub fn new(config: &ContextConfig) -> Self {
        let entry = match unsafe { ash::Entry::load() } {
            Ok(entry) => entry,
            Err(err) => fatal(format!("failed to load the Vulkan loader: {err}")),
        };

        let app_name = CString::new(config.application_name.clone()).unwrap_or_default();
        let engine_name = CString::new("ngrid").unwrap();
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(config.application_version)
            .engine_name(&engine_name)
            .engine_version(1)
            .api_version(vk::API_VERSION_1_1);

        let layer_names: Vec<CString> = config
            .instance_layers
            .iter()
            .map(|s| CString::new(s.as_str()).unwrap())
            .collect();
        let layer_ptrs: Vec<*const i8> = layer_names.iter().map(|s| s.as_ptr()).collect();

        let ext_names: Vec<CString> = config
            .instance_extensions
            .iter()
            .map(|s| CString::new(s.as_str()).unwrap())
            .collect();
        let ext_ptrs: Vec<*const i8> = ext_names.iter().map(|s| s.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_layer_names(&layer_ptrs)
            .enabled_extension_names(&ext_ptrs);

        let raw = match unsafe { entry.create_instance(&create_info, None) } {
            Ok(raw) => raw,
            Err(err) => fatal(format!("no adapter supports the API: {err}")),
        };

        Self {
            shared: Arc::new(InstanceShared { entry, raw }),
        }
    }

    pub fn raw(&self) -> &ash::Instance {
        &self.shared.raw
    }

    pub fn entry(&self) -> &ash::Entry {
        &self.shared.entry
    }

    /// Enumerates physical devices and applies the preferred-adapter-id
    /// override from `config`, else picks the first adapter that reports
    /// compute-queue support. Fatal per §7 if none is suitable.
    pub fn pick_adapter(&self, config: &ContextConfig) -> Adapter {
        let physical_devices = match unsafe { self.shared.raw.enumerate_physical_devices() } {
            Ok(list) if !list.is_empty() => list,
            Ok(_) => fatal("no adapter supports the API: zero physical devices enumerated"),
            Err(err) => fatal(format!("failed to enumerate physical devices: {err}")),
        };

        let chosen = if let Some(id) = config.preferred_adapter_id {
            physical_devices
                .get(id as usize)
                .copied()
                .unwrap_or_else(|| {
                    fatal(format!(
                        "preferred adapter id {id} is out of range of {} enumerated adapters",
                        physical_devices.len()
                    ))
                })
        } else {
            *physical_devices
                .iter()
                .find(|&&pd| Adapter::supports_compute(&self.shared.raw, pd))
                .unwrap_or_else(|| fatal("no adapter supports the API: none expose a compute queue"))
        };

        Adapter::new(self.shared.clone(), chosen)
    }

    /// Thin wrapper matching §6's device-transient error classification.
    pub(crate) fn classify_vk_error(result: vk::Result) -> DeviceError {
        match result {
            vk::Result::ERROR_OUT_OF_DATE_KHR => DeviceError::OutOfDate,
            vk::Result::ERROR_SURFACE_LOST_KHR => DeviceError::SurfaceLost,
            other => DeviceError::Vulkan(other),
        }
    }
}

pub(crate) fn as_cstr(bytes: &[i8]) -> &CStr {
    unsafe { CStr::from_ptr(bytes.as_ptr()) }
}
