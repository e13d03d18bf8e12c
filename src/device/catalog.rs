//! Device enumeration.
//!
//! Each source of devices is a [`DiscoveryStrategy`]. The catalog tries its
//! strategies in order and takes the first answer that is not an error; an
//! empty list is an answer. When every strategy fails the catalog logs the
//! failures and reports no devices.

use std::fs;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::Device;
use crate::error::DiscoveryError;
use crate::platform::{DeviceClass, Platform};
use crate::toolchain::{Invocation, Toolchain};

type DiscoveryResult = std::result::Result<Vec<Device>, DiscoveryError>;

/// One way of listing devices for a platform.
pub trait DiscoveryStrategy {
    /// Short name used in log messages
    fn name(&self) -> &'static str;

    /// List devices for `platform`, in the order the source reports them.
    fn discover(&self, toolchain: &dyn Toolchain, platform: Platform) -> DiscoveryResult;
}

/// Run a discovery command and return its stdout.
fn capture_stdout(
    toolchain: &dyn Toolchain,
    source_name: &str,
    invocation: &Invocation,
) -> std::result::Result<String, DiscoveryError> {
    let tool_failed = |reason: String| DiscoveryError::ToolFailed {
        source_name: source_name.to_string(),
        reason,
    };

    let output = toolchain
        .run(invocation)
        .map_err(|e| tool_failed(e.to_string()))?;

    if !output.success() {
        let mut reason = match output.status {
            Some(code) => format!("exited with status {code}"),
            None => "terminated by a signal".to_string(),
        };
        let stderr = output.stderr.trim();
        if !stderr.is_empty() {
            reason.push_str(": ");
            reason.push_str(stderr);
        }
        return Err(tool_failed(reason));
    }

    Ok(output.stdout)
}

// ===== simctl =====

/// `xcrun simctl list devices --json`
#[derive(Debug, Default, Clone, Copy)]
pub struct SimctlDiscovery;

#[derive(Debug, Deserialize)]
struct SimctlOutput {
    devices: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct SimctlDevice {
    name: String,
    udid: String,
    #[serde(default)]
    state: String,
    #[serde(rename = "isAvailable", default)]
    is_available: bool,
}

/// Parse simctl JSON, keeping available devices on runtimes for `platform`.
pub fn parse_simctl_json(json: &str, platform: Platform) -> DiscoveryResult {
    let parse_failed = |reason: String| DiscoveryError::ParseFailed {
        source_name: "simctl".to_string(),
        reason,
    };

    let Some(prefix) = platform.simulator_runtime_prefix() else {
        return Ok(Vec::new());
    };

    let output: SimctlOutput = serde_json::from_str(json).map_err(|e| parse_failed(e.to_string()))?;

    let mut devices = Vec::new();
    for (runtime, entries) in output.devices {
        if !runtime.starts_with(prefix) {
            continue;
        }

        let entries: Vec<SimctlDevice> =
            serde_json::from_value(entries).map_err(|e| parse_failed(format!("{runtime}: {e}")))?;

        devices.extend(entries.into_iter().filter(|d| d.is_available).map(|d| Device {
            name: d.name,
            identifier: d.udid,
            state: d.state,
            platform,
            available: true,
        }));
    }

    Ok(devices)
}

impl DiscoveryStrategy for SimctlDiscovery {
    fn name(&self) -> &'static str {
        "simctl"
    }

    fn discover(&self, toolchain: &dyn Toolchain, platform: Platform) -> DiscoveryResult {
        let invocation = Invocation::new("xcrun")
            .args(["simctl", "list", "devices", "--json"])
            .captured();
        let stdout = capture_stdout(toolchain, self.name(), &invocation)?;
        parse_simctl_json(&stdout, platform)
    }
}

// ===== devicectl =====

/// `xcrun devicectl list devices --json-output <file>`
#[derive(Debug, Default, Clone, Copy)]
pub struct DevicectlDiscovery;

#[derive(Debug, Default, Deserialize)]
struct DevicectlPayload {
    #[serde(default)]
    result: DevicectlResult,
}

#[derive(Debug, Default, Deserialize)]
struct DevicectlResult {
    #[serde(default)]
    devices: Vec<DevicectlDevice>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DevicectlDevice {
    hardware_properties: HardwareProperties,
    device_properties: DeviceProperties,
    connection_properties: ConnectionProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct HardwareProperties {
    reality: Option<String>,
    platform: Option<String>,
    udid: Option<String>,
    marketing_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DeviceProperties {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ConnectionProperties {
    tunnel_state: Option<String>,
    pairing_state: Option<String>,
}

fn first_non_empty(candidates: [Option<String>; 2]) -> Option<String> {
    candidates.into_iter().flatten().find(|s| !s.is_empty())
}

/// Parse devicectl JSON, keeping physical devices for `platform`.
pub fn parse_devicectl_json(json: &str, platform: Platform) -> DiscoveryResult {
    let Some(wanted) = platform.devicectl_platform() else {
        return Ok(Vec::new());
    };

    let payload: DevicectlPayload =
        serde_json::from_str(json).map_err(|e| DiscoveryError::ParseFailed {
            source_name: "devicectl".to_string(),
            reason: e.to_string(),
        })?;

    let devices = payload
        .result
        .devices
        .into_iter()
        .filter_map(|item| {
            let hardware = item.hardware_properties;
            if hardware.reality.as_deref() != Some("physical") {
                return None;
            }
            if !hardware
                .platform
                .as_deref()
                .is_some_and(|p| p.eq_ignore_ascii_case(wanted))
            {
                return None;
            }
            let identifier = hardware.udid.filter(|u| !u.is_empty())?;

            let name = first_non_empty([item.device_properties.name, hardware.marketing_name])
                .unwrap_or_else(|| "Unknown Device".to_string());
            let connection = item.connection_properties;
            let state = first_non_empty([connection.tunnel_state, connection.pairing_state])
                .unwrap_or_default();

            Some(Device {
                name,
                identifier,
                state,
                platform,
                available: true,
            })
        })
        .collect();

    Ok(devices)
}

impl DiscoveryStrategy for DevicectlDiscovery {
    fn name(&self) -> &'static str {
        "devicectl"
    }

    fn discover(&self, toolchain: &dyn Toolchain, platform: Platform) -> DiscoveryResult {
        let output_file = |source| DiscoveryError::OutputFile {
            source_name: self.name().to_string(),
            source,
        };

        // Removed when dropped, on every return path below.
        let json_file = tempfile::Builder::new()
            .prefix("devicectl-")
            .suffix(".json")
            .tempfile()
            .map_err(output_file)?;

        let invocation = Invocation::new("xcrun")
            .args(["devicectl", "list", "devices", "--json-output"])
            .arg(json_file.path().display().to_string())
            .captured();
        capture_stdout(toolchain, self.name(), &invocation)?;

        let json = fs::read_to_string(json_file.path()).map_err(output_file)?;
        parse_devicectl_json(&json, platform)
    }
}

// ===== xctrace =====

/// `xcrun xctrace list devices`, for toolchains without devicectl
#[derive(Debug, Default, Clone, Copy)]
pub struct XctraceDiscovery;

/// Parse the xctrace device table loosely.
///
/// Lines mentioning `Simulator` are skipped. A line is a device when it
/// contains the platform token and a parenthesised group; the identifier is
/// the last group and one further trailing group (the OS version) is
/// stripped from the name.
pub fn parse_xctrace_table(text: &str, platform: Platform) -> Vec<Device> {
    let Some(token) = platform.device_table_token() else {
        return Vec::new();
    };

    let mut devices = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.contains("Simulator") {
            continue;
        }
        if !line.contains(token) || !line.contains(')') {
            continue;
        }
        let Some((name_part, tail)) = line.rsplit_once('(') else {
            continue;
        };

        let identifier = tail.trim_end_matches(')').trim();
        if identifier.is_empty() {
            continue;
        }

        let name_part = name_part.trim();
        let name = match name_part.rsplit_once('(') {
            Some((name, _version)) => name.trim(),
            None => name_part,
        };

        devices.push(Device {
            name: name.to_string(),
            identifier: identifier.to_string(),
            state: String::new(),
            platform,
            available: true,
        });
    }
    devices
}

impl DiscoveryStrategy for XctraceDiscovery {
    fn name(&self) -> &'static str {
        "xctrace"
    }

    fn discover(&self, toolchain: &dyn Toolchain, platform: Platform) -> DiscoveryResult {
        let invocation = Invocation::new("xcrun")
            .args(["xctrace", "list", "devices"])
            .captured();
        let stdout = capture_stdout(toolchain, self.name(), &invocation)?;
        Ok(parse_xctrace_table(&stdout, platform))
    }
}

// ===== catalog =====

/// Lists simulators and physical devices through ordered discovery strategies.
pub struct DeviceCatalog<'a> {
    toolchain: &'a dyn Toolchain,
    simulated: Vec<Box<dyn DiscoveryStrategy>>,
    physical: Vec<Box<dyn DiscoveryStrategy>>,
}

impl<'a> DeviceCatalog<'a> {
    /// Catalog using simctl for simulators and devicectl, then xctrace, for
    /// physical devices.
    pub fn new(toolchain: &'a dyn Toolchain) -> Self {
        Self::with_strategies(
            toolchain,
            vec![Box::new(SimctlDiscovery)],
            vec![Box::new(DevicectlDiscovery), Box::new(XctraceDiscovery)],
        )
    }

    /// Catalog with explicit strategy lists
    pub fn with_strategies(
        toolchain: &'a dyn Toolchain,
        simulated: Vec<Box<dyn DiscoveryStrategy>>,
        physical: Vec<Box<dyn DiscoveryStrategy>>,
    ) -> Self {
        Self {
            toolchain,
            simulated,
            physical,
        }
    }

    /// Available simulators for `platform`
    pub fn list_simulated(&self, platform: Platform) -> Vec<Device> {
        self.discover(&self.simulated, platform, DeviceClass::Simulator)
    }

    /// Attached physical devices for `platform`
    pub fn list_physical(&self, platform: Platform) -> Vec<Device> {
        self.discover(&self.physical, platform, DeviceClass::Physical)
    }

    /// Devices of either class
    pub fn list(&self, platform: Platform, class: DeviceClass) -> Vec<Device> {
        match class {
            DeviceClass::Simulator => self.list_simulated(platform),
            DeviceClass::Physical => self.list_physical(platform),
        }
    }

    fn discover(
        &self,
        strategies: &[Box<dyn DiscoveryStrategy>],
        platform: Platform,
        class: DeviceClass,
    ) -> Vec<Device> {
        if !platform.has_devices() {
            return Vec::new();
        }

        for strategy in strategies {
            match strategy.discover(self.toolchain, platform) {
                Ok(devices) => {
                    log::debug!(
                        "{} reported {} {} {}(s)",
                        strategy.name(),
                        devices.len(),
                        platform,
                        class
                    );
                    return devices;
                }
                Err(e) => {
                    log::warn!("Could not list {platform} {class}s via {}: {e}", strategy.name());
                }
            }
        }

        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedToolchain;
    use crate::toolchain::ToolOutput;

    const SIMCTL: &str = r#"{
      "devices": {
        "com.apple.CoreSimulator.SimRuntime.tvOS-17-0": [
          {"name": "Apple TV", "udid": "TV-1", "state": "Shutdown", "isAvailable": true}
        ],
        "com.apple.CoreSimulator.SimRuntime.iOS-17-2": [
          {"name": "iPhone 15", "udid": "IOS-1", "state": "Booted", "isAvailable": true},
          {"name": "iPhone 8", "udid": "IOS-OLD", "state": "Shutdown", "isAvailable": false},
          {"name": "iPad Air", "udid": "IOS-2", "state": "Shutdown", "isAvailable": true}
        ],
        "com.apple.CoreSimulator.SimRuntime.iOS-16-4": [
          {"name": "iPhone 14", "udid": "IOS-3", "isAvailable": true}
        ]
      }
    }"#;

    const DEVICECTL: &str = r#"{
      "info": {"outcome": "success"},
      "result": {
        "devices": [
          {
            "hardwareProperties": {"reality": "physical", "platform": "iOS", "udid": "00008110-A", "marketingName": "iPhone 13"},
            "deviceProperties": {"name": "Ana's iPhone"},
            "connectionProperties": {"tunnelState": "connected", "pairingState": "paired"}
          },
          {
            "hardwareProperties": {"reality": "physical", "platform": "iOS", "udid": "00008110-B", "marketingName": "iPhone 12"},
            "deviceProperties": {},
            "connectionProperties": {"pairingState": "paired"}
          },
          {
            "hardwareProperties": {"reality": "virtual", "platform": "iOS", "udid": "SIM"},
            "deviceProperties": {"name": "Simulated"}
          },
          {
            "hardwareProperties": {"reality": "physical", "platform": "tvOS", "udid": "TV-HW"},
            "deviceProperties": {"name": "Living Room"}
          },
          {
            "hardwareProperties": {"reality": "physical", "platform": "iOS"},
            "deviceProperties": {"name": "No UDID"}
          },
          {
            "hardwareProperties": {"reality": "physical", "platform": "ios", "udid": "00008110-C"}
          }
        ]
      }
    }"#;

    const XCTRACE: &str = "\
== Devices ==
Studio Mac (5B4C1A2E-0000-0000-0000-000000000000)
Ana's iPhone (17.2) (00008110-001A2B3C4D5E)
Living Room Apple TV (17.0) (TV-UDID-1)
iPhone no version (NOVERSION)

== Simulators ==
iPhone 15 Simulator (17.2) (SIM-UDID)
";

    #[test]
    fn simctl_filters_runtime_and_availability_in_source_order() {
        let devices = parse_simctl_json(SIMCTL, Platform::Ios).expect("parse");
        let ids: Vec<_> = devices.iter().map(|d| d.identifier.as_str()).collect();
        assert_eq!(ids, vec!["IOS-1", "IOS-2", "IOS-3"]);
        assert_eq!(devices[0].state, "Booted");
        assert_eq!(devices[2].state, "");

        let tv = parse_simctl_json(SIMCTL, Platform::Tvos).expect("parse");
        assert_eq!(tv.len(), 1);
        assert_eq!(tv[0].platform, Platform::Tvos);
    }

    #[test]
    fn simctl_garbage_is_a_parse_error() {
        let err = parse_simctl_json("not json", Platform::Ios).unwrap_err();
        assert!(matches!(err, DiscoveryError::ParseFailed { .. }));
    }

    #[test]
    fn devicectl_keeps_matching_physical_devices() {
        let devices = parse_devicectl_json(DEVICECTL, Platform::Ios).expect("parse");
        assert_eq!(devices.len(), 3);

        assert_eq!(devices[0].name, "Ana's iPhone");
        assert_eq!(devices[0].state, "connected");
        assert_eq!(devices[1].name, "iPhone 12");
        assert_eq!(devices[1].state, "paired");
        assert_eq!(devices[2].name, "Unknown Device");
        assert_eq!(devices[2].identifier, "00008110-C");
        assert_eq!(devices[2].state, "");

        let tv = parse_devicectl_json(DEVICECTL, Platform::Tvos).expect("parse");
        assert_eq!(tv.len(), 1);
        assert_eq!(tv[0].identifier, "TV-HW");
    }

    #[test]
    fn xctrace_table_is_parsed_loosely() {
        let phones = parse_xctrace_table(XCTRACE, Platform::Ios);
        assert_eq!(phones.len(), 2);
        assert_eq!(phones[0].name, "Ana's iPhone");
        assert_eq!(phones[0].identifier, "00008110-001A2B3C4D5E");
        assert_eq!(phones[1].name, "iPhone no version");
        assert_eq!(phones[1].identifier, "NOVERSION");

        let tvs = parse_xctrace_table(XCTRACE, Platform::Tvos);
        assert_eq!(tvs.len(), 1);
        assert_eq!(tvs[0].name, "Living Room Apple TV");
    }

    fn write_devicectl_output(invocation: &Invocation, json: &str) {
        if let Some(path) = invocation.arg_after("--json-output") {
            fs::write(path, json).expect("write devicectl output");
        }
    }

    #[test]
    fn physical_listing_prefers_devicectl() {
        let toolchain = ScriptedToolchain::new(|inv| {
            if inv.has_arg("devicectl") {
                write_devicectl_output(inv, DEVICECTL);
                ToolOutput::success_with("")
            } else {
                ToolOutput::success_with(XCTRACE)
            }
        });

        let catalog = DeviceCatalog::new(&toolchain);
        let devices = catalog.list_physical(Platform::Ios);
        assert_eq!(devices.len(), 3);

        let calls = toolchain.invocations();
        assert_eq!(calls.len(), 1);
        let json_path = calls[0].arg_after("--json-output").expect("json path").to_string();
        assert!(json_path.ends_with(".json"));
        assert!(!std::path::Path::new(&json_path).exists());
    }

    #[test]
    fn physical_listing_falls_back_to_xctrace() {
        let toolchain = ScriptedToolchain::new(|inv| {
            if inv.has_arg("devicectl") {
                ToolOutput::failure(72, "xcrun: error: unable to find utility \"devicectl\"")
            } else {
                ToolOutput::success_with(XCTRACE)
            }
        });

        let devices = DeviceCatalog::new(&toolchain).list_physical(Platform::Ios);
        assert_eq!(devices.len(), 2);
        assert_eq!(toolchain.invocations().len(), 2);
        assert!(toolchain.invocations()[1].has_arg("xctrace"));
    }

    #[test]
    fn empty_devicectl_answer_does_not_fall_back() {
        let toolchain = ScriptedToolchain::new(|inv| {
            write_devicectl_output(inv, r#"{"result": {"devices": []}}"#);
            ToolOutput::success_with(XCTRACE)
        });

        let devices = DeviceCatalog::new(&toolchain).list_physical(Platform::Ios);
        assert!(devices.is_empty());
        assert_eq!(toolchain.invocations().len(), 1);
    }

    #[test]
    fn total_failure_yields_no_devices() {
        let toolchain = ScriptedToolchain::new(|_| ToolOutput::failure(1, "boom"));
        let catalog = DeviceCatalog::new(&toolchain);
        assert!(catalog.list_simulated(Platform::Ios).is_empty());
        assert!(catalog.list_physical(Platform::Tvos).is_empty());
    }

    #[test]
    fn macos_never_invokes_the_toolchain() {
        let toolchain = ScriptedToolchain::succeeding();
        let catalog = DeviceCatalog::new(&toolchain);
        assert!(catalog.list(Platform::Macos, DeviceClass::Simulator).is_empty());
        assert!(catalog.list(Platform::Macos, DeviceClass::Physical).is_empty());
        assert!(toolchain.invocations().is_empty());
    }
}
