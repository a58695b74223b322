//! Whole-device control: network teardown and restart.
//!
//! On target, `restart` lets the log drain for a second and then calls
//! `esp_restart()`, which never returns. The simulation backend only
//! records that a restart was requested.

use log::{info, warn};

use crate::app::ports::SystemPort;

#[derive(Debug)]
pub struct EspSystem {
    #[cfg(not(target_os = "espidf"))]
    restarts: u32,
    #[cfg(not(target_os = "espidf"))]
    network_up: bool,
}

impl Default for EspSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl EspSystem {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            restarts: 0,
            #[cfg(not(target_os = "espidf"))]
            network_up: true,
        }
    }

    /// Simulation: restarts requested so far.
    #[cfg(not(target_os = "espidf"))]
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    /// Simulation: whether the station is still associated.
    #[cfg(not(target_os = "espidf"))]
    pub fn network_up(&self) -> bool {
        self.network_up
    }
}

impl SystemPort for EspSystem {
    #[cfg(target_os = "espidf")]
    fn disconnect_network(&mut self) {
        // SAFETY: plain ESP-IDF calls; both tolerate a stopped driver.
        let ret = unsafe { esp_idf_svc::sys::esp_wifi_disconnect() };
        if ret != esp_idf_svc::sys::ESP_OK {
            warn!("System: esp_wifi_disconnect returned {}", ret);
        }
        // Forget the stored station config so the portal runs on next boot.
        let ret = unsafe { esp_idf_svc::sys::esp_wifi_restore() };
        if ret != esp_idf_svc::sys::ESP_OK {
            warn!("System: esp_wifi_restore returned {}", ret);
        }
        info!("System: network disconnected");
    }

    #[cfg(not(target_os = "espidf"))]
    fn disconnect_network(&mut self) {
        if !self.network_up {
            warn!("System(sim): network already down");
        }
        self.network_up = false;
        info!("System(sim): network disconnected");
    }

    #[cfg(target_os = "espidf")]
    fn restart(&mut self) {
        info!("System: restarting");
        esp_idf_hal::delay::FreeRtos::delay_ms(1000);
        // SAFETY: terminal call, never returns.
        unsafe { esp_idf_svc::sys::esp_restart() };
    }

    #[cfg(not(target_os = "espidf"))]
    fn restart(&mut self) {
        self.restarts += 1;
        self.network_up = true;
        info!("System(sim): restart #{}", self.restarts);
    }
}
