//! Integration-wide names, configuration keys and defaults.

pub const NAME: &str = "Home Mind";
pub const DOMAIN: &str = "home_mind";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const ISSUE_URL: &str = "https://github.com/jonasbkarlsson/home_mind/issues";

// Configuration and options
pub const CONF_ASSIST_SATELLITE_ENTITY: &str = "assist_satellite";
pub const CONF_LAST_RECOGNIZED_FACE_ENTITY: &str = "last_recognized_face";
pub const CONF_HOLD_OFF_TIME_MINUTES: &str = "hold_off_time_minutes";

/// Subentry type carrying the conversation settings.
pub const SUBENTRY_CONVERSATION: &str = "conversation";

// Defaults
pub const HOLD_OFF_TIME_MINUTES: i64 = 120;
pub const GENERATION_TIMEOUT_SECS: u64 = 30;
pub const CONF_GENERATION_TIMEOUT_SECS: &str = "generation_timeout_secs";

// Event channels
pub const EVENT_STATE_CHANGED: &str = "state_changed";
pub const EVENT_HOME_MIND: &str = "home_mind_event";
pub const EVENT_DEVICE_REGISTRY_UPDATED: &str = "device_registry_updated";

// Host services
pub const SERVICE_GENERATE_CONTENT: &str = "generate_content";
pub const ASSIST_SATELLITE_DOMAIN: &str = "assist_satellite";
pub const SERVICE_START_CONVERSATION: &str = "start_conversation";
pub const SERVICE_INTERRUPT_CONVERSATION: &str = "interrupt_conversation";

pub fn startup_message() -> String {
    format!(
        "\n-------------------------------------------------------------------\n\
         {NAME}\n\
         Version: {VERSION}\n\
         This is a custom integration!\n\
         If you have any issues with this you need to open an issue here:\n\
         {ISSUE_URL}\n\
         -------------------------------------------------------------------"
    )
}
