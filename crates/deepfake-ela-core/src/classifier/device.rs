//! Compute device selection for the classifier.

use candle_core::Device;

use crate::config::DeviceKind;

/// Create the device for `kind`.
///
/// CUDA is attempted only when built with the `cuda` feature; otherwise, or
/// when no GPU is present, the CPU is used and a warning is logged.
pub fn select_device(kind: DeviceKind) -> Device {
    match kind {
        DeviceKind::Cpu => Device::Cpu,
        DeviceKind::Cuda => cuda_or_cpu(),
    }
}

#[cfg(feature = "cuda")]
fn cuda_or_cpu() -> Device {
    match Device::new_cuda(0) {
        Ok(device) => {
            tracing::info!("Using CUDA device 0");
            device
        }
        Err(e) => {
            tracing::warn!("CUDA requested but unavailable ({}), using CPU", e);
            Device::Cpu
        }
    }
}

#[cfg(not(feature = "cuda"))]
fn cuda_or_cpu() -> Device {
    tracing::warn!("CUDA requested but built without the `cuda` feature, using CPU");
    Device::Cpu
}
