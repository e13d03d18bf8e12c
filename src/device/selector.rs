//! Device selection precedence.
//!
//! Given the current catalog, the first rule that produces a device wins:
//! 1. an explicit request naming a listed device (by name or identifier)
//! 2. the saved preference, unless a prompt is forced, if it is still listed
//! 3. without a terminal: the first listed device, saved as the new default
//! 4. with a terminal: ask the operator, saving only on confirmation
//!
//! An empty catalog selects nothing.

use std::io::{self, BufRead, IsTerminal, Write};

use super::{Device, DeviceCatalog};
use crate::cli::RuntimeConfig;
use crate::platform::{DeviceClass, Platform};
use crate::state::PreferenceStore;

/// Invalid answers tolerated before interactive selection gives up.
const MAX_ATTEMPTS: usize = 3;

/// Line-oriented operator input.
pub trait Prompt {
    /// Whether both stdin and stdout are attached to a terminal
    fn is_interactive(&self) -> bool;

    /// Show `message` and read one line, trimmed. `None` on end of input.
    fn read_line(&mut self, message: &str) -> Option<String>;
}

/// Prompt on the process's stdin and stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn is_interactive(&self) -> bool {
        io::stdin().is_terminal() && io::stdout().is_terminal()
    }

    fn read_line(&mut self, message: &str) -> Option<String> {
        print!("{message}");
        io::stdout().flush().ok()?;

        let mut input = String::new();
        match io::stdin().lock().read_line(&mut input) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(input.trim().to_string()),
        }
    }
}

/// What to select.
#[derive(Debug, Clone, Copy)]
pub struct SelectionRequest<'r> {
    /// Target platform
    pub platform: Platform,
    /// Simulator or physical device
    pub class: DeviceClass,
    /// Device name or identifier given by the operator
    pub explicit: Option<&'r str>,
    /// Ask even when a saved preference is usable
    pub force_prompt: bool,
}

impl<'r> SelectionRequest<'r> {
    /// Request with no explicit device and no forced prompt
    pub fn new(platform: Platform, class: DeviceClass) -> Self {
        Self {
            platform,
            class,
            explicit: None,
            force_prompt: false,
        }
    }

    /// Prefer the device named `target`
    pub fn with_target(mut self, target: Option<&'r str>) -> Self {
        self.explicit = target.filter(|t| !t.trim().is_empty());
        self
    }

    /// Ignore the saved preference and ask
    pub fn forcing_prompt(mut self, force: bool) -> Self {
        self.force_prompt = force;
        self
    }
}

/// Resolves one device identifier per request.
pub struct DeviceSelector<'a> {
    catalog: DeviceCatalog<'a>,
    store: &'a mut PreferenceStore,
    prompt: &'a mut dyn Prompt,
    config: &'a RuntimeConfig,
}

impl<'a> DeviceSelector<'a> {
    /// Create a selector over `catalog`, saving into `store`
    pub fn new(
        catalog: DeviceCatalog<'a>,
        store: &'a mut PreferenceStore,
        prompt: &'a mut dyn Prompt,
        config: &'a RuntimeConfig,
    ) -> Self {
        Self {
            catalog,
            store,
            prompt,
            config,
        }
    }

    /// Resolve the request to a device identifier, or `None`.
    pub fn select(&mut self, request: &SelectionRequest<'_>) -> Option<String> {
        let SelectionRequest {
            platform,
            class,
            explicit,
            force_prompt,
        } = *request;

        let devices = self.catalog.list(platform, class);
        if devices.is_empty() {
            self.config
                .error_println(&format!("No {platform} {class}s found"));
            return None;
        }

        if let Some(wanted) = explicit {
            if let Some(device) = devices.iter().find(|d| d.matches(wanted)) {
                return Some(device.identifier.clone());
            }
            self.config
                .warning_println(&format!("Device '{wanted}' not found"));
        }

        if !force_prompt && let Some(saved) = self.store.get(platform, class) {
            if let Some(device) = devices.iter().find(|d| d.identifier == saved) {
                self.config
                    .success_println(&format!("Using saved {class}: {}", device.name));
                return Some(device.identifier.clone());
            }
            self.config
                .warning_println(&format!("Saved {class} no longer available"));
        }

        if !self.prompt.is_interactive() {
            let device = &devices[0];
            self.config.verbose_println("[Non-interactive mode]");
            self.config
                .success_println(&format!("Auto-selecting {class}: {}", device.name));
            self.remember(platform, class, device);
            return Some(device.identifier.clone());
        }

        self.choose_interactively(platform, class, &devices)
    }

    fn choose_interactively(
        &mut self,
        platform: Platform,
        class: DeviceClass,
        devices: &[Device],
    ) -> Option<String> {
        self.config.verbose_println("[Interactive mode]");
        self.config.println(&format!(
            "\nAvailable {} {class}s:",
            platform.display_name()
        ));
        for (i, device) in devices.iter().enumerate() {
            self.config.indent(&format!("{}. {}", i + 1, device));
        }

        let question = format!("\nSelect {class} (1-{}) or 'q' to quit: ", devices.len());
        for _ in 0..MAX_ATTEMPTS {
            let Some(answer) = self.prompt.read_line(&question) else {
                self.config.warning_println("Selection cancelled");
                return None;
            };

            if answer.eq_ignore_ascii_case("q") {
                return None;
            }

            let chosen = answer
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|index| devices.get(index));

            let Some(device) = chosen else {
                self.config.error_println("Invalid selection");
                continue;
            };

            let save = self
                .prompt
                .read_line(&format!("Save this as default {class}? (y/n): "))
                .is_some_and(|a| matches!(a.to_lowercase().as_str(), "y" | "yes"));
            if save && self.remember(platform, class, device) {
                self.config.success_println("Saved as default");
            }
            return Some(device.identifier.clone());
        }

        self.config.warning_println("Too many invalid selections");
        None
    }

    /// Persist `device` as the default. Failure to save is only a warning.
    fn remember(&mut self, platform: Platform, class: DeviceClass, device: &Device) -> bool {
        match self.store.set(platform, class, &device.identifier) {
            Ok(()) => true,
            Err(e) => {
                self.config
                    .warning_println(&format!("Could not save default {class}: {e}"));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedPrompt, ScriptedToolchain};
    use crate::toolchain::ToolOutput;
    use tempfile::TempDir;

    const SIMCTL: &str = r#"{"devices": {"com.apple.CoreSimulator.SimRuntime.iOS-17-2": [
        {"name": "iPhone 15", "udid": "U1", "state": "Shutdown", "isAvailable": true},
        {"name": "iPhone 15 Pro", "udid": "U2", "state": "Booted", "isAvailable": true},
        {"name": "iPad mini", "udid": "U3", "state": "Shutdown", "isAvailable": true}
    ]}}"#;

    struct Fixture {
        _dir: TempDir,
        toolchain: ScriptedToolchain,
        store: PreferenceStore,
        config: RuntimeConfig,
    }

    impl Fixture {
        fn new(simctl: &'static str) -> Self {
            let dir = TempDir::new().expect("temp dir");
            let store = PreferenceStore::load(dir.path().join("devices.json"));
            Self {
                _dir: dir,
                toolchain: ScriptedToolchain::new(move |_| ToolOutput::success_with(simctl)),
                store,
                config: RuntimeConfig::new(false, true),
            }
        }

        fn select(&mut self, prompt: &mut ScriptedPrompt, request: SelectionRequest<'_>) -> Option<String> {
            let catalog = DeviceCatalog::new(&self.toolchain);
            let mut selector = DeviceSelector::new(catalog, &mut self.store, prompt, &self.config);
            selector.select(&request)
        }
    }

    fn ios_sim() -> SelectionRequest<'static> {
        SelectionRequest::new(Platform::Ios, DeviceClass::Simulator)
    }

    #[test]
    fn explicit_request_beats_saved_preference() {
        let mut fx = Fixture::new(SIMCTL);
        fx.store.set(Platform::Ios, DeviceClass::Simulator, "U1").expect("save");
        let mut prompt = ScriptedPrompt::interactive(&[]);

        assert_eq!(
            fx.select(&mut prompt, ios_sim().with_target(Some("iPad mini"))),
            Some("U3".to_string())
        );
        assert_eq!(
            fx.select(&mut prompt, ios_sim().with_target(Some("U2")).forcing_prompt(true)),
            Some("U2".to_string())
        );
        assert!(prompt.asked().is_empty());
    }

    #[test]
    fn unmatched_request_falls_through_to_saved_preference() {
        let mut fx = Fixture::new(SIMCTL);
        fx.store.set(Platform::Ios, DeviceClass::Simulator, "U2").expect("save");
        let mut prompt = ScriptedPrompt::non_interactive();

        assert_eq!(
            fx.select(&mut prompt, ios_sim().with_target(Some("iPhone 99"))),
            Some("U2".to_string())
        );
    }

    #[test]
    fn saved_preference_is_used_while_listed() {
        let mut fx = Fixture::new(SIMCTL);
        fx.store.set(Platform::Ios, DeviceClass::Simulator, "U3").expect("save");
        let mut prompt = ScriptedPrompt::interactive(&[]);

        assert_eq!(fx.select(&mut prompt, ios_sim()), Some("U3".to_string()));
        assert!(prompt.asked().is_empty());
    }

    #[test]
    fn stale_preference_is_never_returned() {
        let mut fx = Fixture::new(SIMCTL);
        fx.store
            .set(Platform::Ios, DeviceClass::Simulator, "GONE")
            .expect("save");
        let mut prompt = ScriptedPrompt::non_interactive();

        let chosen = fx.select(&mut prompt, ios_sim());
        assert_eq!(chosen, Some("U1".to_string()));
        assert_eq!(fx.store.get(Platform::Ios, DeviceClass::Simulator), Some("U1"));
    }

    #[test]
    fn non_interactive_picks_first_and_persists() {
        let mut fx = Fixture::new(SIMCTL);
        let mut prompt = ScriptedPrompt::non_interactive();

        assert_eq!(fx.select(&mut prompt, ios_sim()), Some("U1".to_string()));

        let reloaded = PreferenceStore::load(fx.store.path());
        assert_eq!(reloaded.get(Platform::Ios, DeviceClass::Simulator), Some("U1"));
        assert_eq!(reloaded.get(Platform::Ios, DeviceClass::Physical), None);
    }

    #[test]
    fn empty_catalog_selects_nothing() {
        let mut fx = Fixture::new(r#"{"devices": {}}"#);
        fx.store.set(Platform::Ios, DeviceClass::Simulator, "U1").expect("save");
        let mut prompt = ScriptedPrompt::non_interactive();

        assert_eq!(fx.select(&mut prompt, ios_sim().with_target(Some("U1"))), None);
    }

    #[test]
    fn forced_prompt_ignores_saved_preference() {
        let mut fx = Fixture::new(SIMCTL);
        fx.store.set(Platform::Ios, DeviceClass::Simulator, "U1").expect("save");
        let mut prompt = ScriptedPrompt::interactive(&["2", "n"]);

        assert_eq!(
            fx.select(&mut prompt, ios_sim().forcing_prompt(true)),
            Some("U2".to_string())
        );
        assert_eq!(fx.store.get(Platform::Ios, DeviceClass::Simulator), Some("U1"));
    }

    #[test]
    fn interactive_choice_saved_on_confirmation() {
        let mut fx = Fixture::new(SIMCTL);
        let mut prompt = ScriptedPrompt::interactive(&["3", "y"]);

        assert_eq!(fx.select(&mut prompt, ios_sim()), Some("U3".to_string()));
        assert_eq!(fx.store.get(Platform::Ios, DeviceClass::Simulator), Some("U3"));
        assert_eq!(prompt.asked().len(), 2);
        assert!(prompt.asked()[0].contains("(1-3)"));
    }

    #[test]
    fn invalid_answers_are_retried_then_abandoned() {
        let mut fx = Fixture::new(SIMCTL);
        let mut prompt = ScriptedPrompt::interactive(&["0", "abc", "2", "n"]);
        assert_eq!(fx.select(&mut prompt, ios_sim()), Some("U2".to_string()));

        let mut prompt = ScriptedPrompt::interactive(&["9", "-1", "x", "1"]);
        assert_eq!(fx.select(&mut prompt, ios_sim()), None);
        assert_eq!(prompt.asked().len(), MAX_ATTEMPTS);
    }

    #[test]
    fn quit_and_end_of_input_select_nothing() {
        let mut fx = Fixture::new(SIMCTL);

        let mut prompt = ScriptedPrompt::interactive(&["Q"]);
        assert_eq!(fx.select(&mut prompt, ios_sim()), None);

        let mut prompt = ScriptedPrompt::interactive(&[]);
        assert_eq!(fx.select(&mut prompt, ios_sim()), None);
        assert!(fx.store.is_empty());
    }
}
