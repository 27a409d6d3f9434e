//! Toolchain/device bindings
//!
//! A kit binds a target to the device and toolchain it builds for. The
//! engine only needs the device class, whether the build device is ready,
//! and any configuration issues to surface as hints when a step fails.

use serde::{Deserialize, Serialize};

/// Class of device a kit builds for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceType {
    /// Local desktop machine
    #[default]
    Desktop,
    /// Remote or embedded device
    Remote,
}

/// Toolchain/device binding of a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kit {
    /// Human-readable kit name
    pub display_name: String,
    /// Device class the kit builds for
    pub device_type: DeviceType,
    /// Whether the build device is prepared to build
    pub device_ready: bool,
    /// Configuration problems reported by the kit, surfaced as hints when
    /// a step of this kit fails
    pub issues: Vec<String>,
}

impl Kit {
    pub fn desktop(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            device_type: DeviceType::Desktop,
            device_ready: true,
            issues: Vec::new(),
        }
    }

    /// Configuration problems of this kit, if any
    pub fn validate(&self) -> &[String] {
        &self.issues
    }
}
