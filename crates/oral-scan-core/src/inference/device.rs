//! Device selection for inference.

use candle_core::Device;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Where forward passes should run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevicePreference {
    /// Use a GPU when one was compiled in and is present, otherwise the CPU.
    #[default]
    Auto,
    /// Always use the CPU.
    Cpu,
}

/// Returns the device to run inference on.
///
/// With `Auto`, tries Metal (macOS) or CUDA when the matching cargo feature is
/// enabled, falling back to CPU.
#[must_use]
pub fn select_device(preference: DevicePreference) -> Device {
    if preference == DevicePreference::Auto {
        #[cfg(feature = "metal")]
        {
            if let Ok(device) = Device::new_metal(0) {
                info!("Using Metal device for inference");
                return device;
            }
        }

        #[cfg(feature = "cuda")]
        {
            if let Ok(device) = Device::new_cuda(0) {
                info!("Using CUDA device for inference");
                return device;
            }
        }
    }

    info!("Using CPU for inference");
    Device::Cpu
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_preference_is_cpu() {
        assert!(matches!(select_device(DevicePreference::Cpu), Device::Cpu));
    }

    #[test]
    fn test_auto_returns_a_device() {
        let _device = select_device(DevicePreference::Auto);
    }
}
