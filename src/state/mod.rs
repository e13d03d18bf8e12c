//! State kept between invocations.
//!
//! The only persisted state is the saved device preference for each
//! platform and device class.

mod preferences;

pub use preferences::{DEFAULT_PREFERENCES_FILE, PreferenceStore, preference_key};
