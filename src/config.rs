//! Node configuration.
//!
//! [`DeviceConfig`] is the record persisted in flash and written by the
//! provisioning portal. [`NodeOptions`] and [`StoreLayout`] are build-time
//! tunables that never leave RAM.

use core::fmt;
use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::router::DuplicatePolicy;
use crate::error::Error;

/// Version marker stored in front of the record. Bump whenever the field
/// layout of [`DeviceConfig`] changes so older images fall back to defaults.
pub const CONFIG_SALT: u16 = 1263;

/// Size of the EEPROM-style image the record lives in.
pub const EEPROM_SIZE: usize = 512;

/// Fixed slot reserved for the encoded record.
pub const RECORD_SLOT_LEN: usize = 128;

pub const DEFAULT_BROKER_PORT: u16 = 8883;

pub const DEFAULT_TOPIC_PREFIX: &str = "esp";

/// Wait between broker connection attempts.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// How long the button must be held before a factory reset.
pub const RESET_HOLD: Duration = Duration::from_secs(10);

/// The portal reboots the node if nobody configures it within this window.
pub const PORTAL_TIMEOUT: Duration = Duration::from_secs(180);

pub const MAX_ADDRESS_LEN: usize = 29;
pub const MAX_CREDENTIAL_LEN: usize = 16;

pub type BrokerAddress = heapless::String<MAX_ADDRESS_LEN>;
pub type Credential = heapless::String<MAX_CREDENTIAL_LEN>;

// ───────────────────────────────────────────────────────────────
// Persisted record
// ───────────────────────────────────────────────────────────────

/// Broker settings persisted across reboots.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Must equal the store's expected salt, otherwise the record is ignored.
    pub salt: u16,
    pub broker_address: BrokerAddress,
    pub broker_user: Credential,
    pub broker_password: Credential,
    pub broker_port: u16,
}

impl DeviceConfig {
    /// Compiled-in defaults stamped with `salt`.
    pub fn defaults(salt: u16) -> Self {
        Self {
            salt,
            broker_address: BrokerAddress::new(),
            broker_user: Credential::new(),
            broker_password: Credential::new(),
            broker_port: DEFAULT_BROKER_PORT,
        }
    }

    /// Build a validated record from portal-style inputs.
    pub fn with_broker(
        address: &str,
        port: u16,
        user: &str,
        password: &str,
    ) -> Result<Self, Error> {
        let cfg = Self {
            salt: CONFIG_SALT,
            broker_address: bounded(address, "broker address longer than 29 bytes")?,
            broker_user: bounded(user, "broker user longer than 16 bytes")?,
            broker_password: bounded(password, "broker password longer than 16 bytes")?,
            broker_port: port,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// `true` once a broker address has been provisioned.
    pub fn has_broker(&self) -> bool {
        !self.broker_address.is_empty()
    }

    /// Range-check the fields a human typed into the portal.
    pub fn validate(&self) -> Result<(), Error> {
        if self.broker_address.is_empty() {
            return Err(Error::Config("broker address is empty"));
        }
        if !is_printable_ascii(&self.broker_address) || self.broker_address.contains(' ') {
            return Err(Error::Config("broker address must be printable ASCII without spaces"));
        }
        if !is_printable_ascii(&self.broker_user) {
            return Err(Error::Config("broker user must be printable ASCII"));
        }
        if !is_printable_ascii(&self.broker_password) {
            return Err(Error::Config("broker password must be printable ASCII"));
        }
        if self.broker_port == 0 {
            return Err(Error::Config("broker port must be 1-65535"));
        }
        Ok(())
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::defaults(CONFIG_SALT)
    }
}

// The password never reaches the log.
impl fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("salt", &self.salt)
            .field("broker_address", &self.broker_address.as_str())
            .field("broker_port", &self.broker_port)
            .field("broker_user", &self.broker_user.as_str())
            .field(
                "broker_password",
                &if self.broker_password.is_empty() { "" } else { "***" },
            )
            .finish()
    }
}

fn bounded<const N: usize>(s: &str, msg: &'static str) -> Result<heapless::String<N>, Error> {
    let mut out = heapless::String::new();
    out.push_str(s).map_err(|_| Error::Config(msg))?;
    Ok(out)
}

/// Every byte in `0x20..=0x7E`.
pub(crate) fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

// ───────────────────────────────────────────────────────────────
// Storage layout
// ───────────────────────────────────────────────────────────────

/// Where the record lives and which salt marks it valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLayout {
    pub offset: usize,
    pub salt: u16,
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self {
            offset: 0,
            salt: CONFIG_SALT,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Runtime tunables
// ───────────────────────────────────────────────────────────────

/// Tunables for the node core. The defaults reproduce the stock firmware.
#[derive(Debug, Clone)]
pub struct NodeOptions {
    /// First topic segment, e.g. `esp` in `esp/<id>/relay`.
    pub topic_prefix: String,
    /// Fixed wait between failed connection attempts.
    pub retry_interval: Duration,
    /// Button hold time that triggers a factory reset.
    pub reset_hold: Duration,
    pub duplicate_policy: DuplicatePolicy,
    /// Upper bound on inbound messages dispatched per `pump`.
    pub max_messages_per_pump: usize,
    /// Subscribe the built-in `reboot` and `reset` topics.
    pub control_topics: bool,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_owned(),
            retry_interval: RETRY_INTERVAL,
            reset_hold: RESET_HOLD,
            duplicate_policy: DuplicatePolicy::Reject,
            max_messages_per_pump: 8,
            control_topics: true,
        }
    }
}
