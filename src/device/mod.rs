//! Simulators and physical devices.
//!
//! [`DeviceCatalog`] enumerates what is available right now; [`DeviceSelector`]
//! turns an optional request plus saved preferences into one identifier.

mod catalog;
mod selector;

pub use catalog::{
    DeviceCatalog, DevicectlDiscovery, DiscoveryStrategy, SimctlDiscovery, XctraceDiscovery,
    parse_devicectl_json, parse_simctl_json, parse_xctrace_table,
};
pub use selector::{DeviceSelector, Prompt, SelectionRequest, StdinPrompt};

use std::fmt;

use crate::platform::Platform;

/// A build target reported by the toolchain.
///
/// Identity is the identifier alone; names are user-assignable and the
/// state changes between enumerations.
#[derive(Debug, Clone, Eq)]
pub struct Device {
    /// Display name
    pub name: String,
    /// Stable identifier (UDID)
    pub identifier: String,
    /// Free-form state label, may be empty
    pub state: String,
    /// Platform the device runs
    pub platform: Platform,
    /// Whether the toolchain reports it usable
    pub available: bool,
}

impl Device {
    /// Whether `request` names this device exactly, by name or identifier
    pub fn matches(&self, request: &str) -> bool {
        self.name == request || self.identifier == request
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl std::hash::Hash for Device {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.identifier)?;
        if !self.state.is_empty() {
            write!(f, " ({})", self.state)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str, id: &str, state: &str) -> Device {
        Device {
            name: name.to_string(),
            identifier: id.to_string(),
            state: state.to_string(),
            platform: Platform::Ios,
            available: true,
        }
    }

    #[test]
    fn identity_is_the_identifier() {
        assert_eq!(device("Old name", "U1", "Booted"), device("New name", "U1", ""));
        assert_ne!(device("Same", "U1", ""), device("Same", "U2", ""));
    }

    #[test]
    fn matches_name_or_identifier_exactly() {
        let d = device("iPhone 15", "ABC-123", "");
        assert!(d.matches("iPhone 15"));
        assert!(d.matches("ABC-123"));
        assert!(!d.matches("iphone 15"));
        assert!(!d.matches("ABC"));
    }

    #[test]
    fn display_omits_empty_state() {
        assert_eq!(device("iPhone", "U1", "").to_string(), "iPhone [U1]");
        assert_eq!(device("iPhone", "U1", "Shutdown").to_string(), "iPhone [U1] (Shutdown)");
    }
}
