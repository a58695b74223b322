//! Device identity derived from the ESP32 factory MAC address.
//!
//! The identity is the full 6-byte MAC as 12 lowercase hex digits
//! (`a1b2c3d4e5f6`). It is:
//! - Deterministic across reboots (factory-burned eFuse MAC)
//! - The topic namespace root (`esp/a1b2c3d4e5f6/relay`)
//! - The MQTT client id and DHCP hostname (`esp-a1b2c3d4e5f6`)

use core::fmt;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Fixed-size identity string: 12 hex digits.
pub type IdentityString = heapless::String<12>;

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: the buffer is exactly the 6 bytes the call writes.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceIdentity(IdentityString);

impl DeviceIdentity {
    pub fn from_mac(mac: &MacAddress) -> Self {
        use core::fmt::Write;
        let mut id = IdentityString::new();
        for byte in mac {
            // 6 x 2 digits always fits the 12-byte buffer.
            let _ = write!(id, "{:02x}", byte);
        }
        Self(id)
    }

    /// Identity of the chip we are running on.
    pub fn from_hardware() -> Self {
        Self::from_mac(&read_mac())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `esp-<identity>`, used for DHCP, the portal SSID and the MQTT client id.
    pub fn hostname(&self) -> heapless::String<16> {
        use core::fmt::Write;
        let mut name = heapless::String::<16>::new();
        let _ = write!(name, "esp-{}", self.0);
        name
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
