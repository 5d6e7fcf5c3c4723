// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Execution device selection for the pose engine.
use std::fmt;
use std::str::FromStr;

use crate::error::LandmarkError;

/// Hardware device the ONNX Runtime sessions run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    /// Default CPU execution provider.
    #[default]
    Cpu,
    /// NVIDIA GPU through CUDA, with the device index.
    Cuda(usize),
    /// Apple `CoreML`.
    CoreMl,
    /// `DirectML` on Windows, with the adapter index.
    DirectMl(usize),
}

impl Device {
    /// Whether this binary was built with the execution provider for the device.
    ///
    /// Devices that are not compiled in fall back to the CPU at session creation.
    #[must_use]
    pub const fn is_compiled(&self) -> bool {
        match self {
            Self::Cpu => true,
            Self::Cuda(_) => cfg!(feature = "cuda"),
            Self::CoreMl => cfg!(feature = "coreml"),
            Self::DirectMl(_) => cfg!(feature = "directml"),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(i) => write!(f, "cuda:{i}"),
            Self::CoreMl => write!(f, "coreml"),
            Self::DirectMl(i) => write!(f, "directml:{i}"),
        }
    }
}

impl FromStr for Device {
    type Err = LandmarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "cpu" => Ok(Self::Cpu),
            "coreml" => Ok(Self::CoreMl),
            _ => {
                if let Some(rest) = s.strip_prefix("cuda") {
                    parse_device_index(rest).map(Self::Cuda)
                } else if let Some(rest) = s.strip_prefix("directml") {
                    parse_device_index(rest).map(Self::DirectMl)
                } else {
                    Err(LandmarkError::ConfigError(format!(
                        "unknown device '{s}', expected one of: cpu, cuda[:N], coreml, directml[:N]"
                    )))
                }
            }
        }
    }
}

/// Parse the `":N"` suffix of a device string. An empty suffix means index 0.
fn parse_device_index(s: &str) -> Result<usize, LandmarkError> {
    if s.is_empty() {
        return Ok(0);
    }
    s.strip_prefix(':')
        .and_then(|index| index.parse::<usize>().ok())
        .ok_or_else(|| LandmarkError::ConfigError(format!("invalid device index '{s}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device() {
        assert_eq!(Device::from_str("cpu").unwrap(), Device::Cpu);
        assert_eq!(Device::from_str("CPU").unwrap(), Device::Cpu);
        assert_eq!(Device::from_str("cuda").unwrap(), Device::Cuda(0));
        assert_eq!(Device::from_str("cuda:1").unwrap(), Device::Cuda(1));
        assert_eq!(Device::from_str("coreml").unwrap(), Device::CoreMl);
        assert_eq!(Device::from_str("directml:2").unwrap(), Device::DirectMl(2));
    }

    #[test]
    fn test_parse_device_rejects_garbage() {
        assert!(Device::from_str("tpu").is_err());
        assert!(Device::from_str("cuda:x").is_err());
        assert!(Device::from_str("cuda1").is_err());
    }

    #[test]
    fn test_device_display_round_trips() {
        for device in [Device::Cpu, Device::Cuda(3), Device::CoreMl, Device::DirectMl(1)] {
            assert_eq!(device.to_string().parse::<Device>().unwrap(), device);
        }
    }

    #[test]
    fn test_cpu_always_compiled() {
        assert!(Device::Cpu.is_compiled());
        assert_eq!(Device::Cuda(0).is_compiled(), cfg!(feature = "cuda"));
    }
}
