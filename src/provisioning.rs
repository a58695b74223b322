//! Broker settings entered through the Wi-Fi setup portal.
//!
//! The portal itself (soft-AP, captive page, Wi-Fi credentials) belongs to
//! the platform. This module covers the node's side of it: deciding whether
//! the portal is needed, prefilling its fields from the current record,
//! and turning the submitted form into a validated, persisted
//! [`DeviceConfig`].

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::StoragePort;
use crate::app::store::ConfigStore;
use crate::config::DeviceConfig;
use crate::error::Error;

/// Raw form values, exactly as the portal posts them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalForm {
    #[serde(rename = "mqtt-server-address", default)]
    pub address: String,
    #[serde(rename = "mqtt-server-port", default)]
    pub port: String,
    #[serde(rename = "mqtt-username", default)]
    pub user: String,
    #[serde(rename = "mqtt-password", default)]
    pub password: String,
}

impl PortalForm {
    pub fn from_json(body: &str) -> Result<Self, Error> {
        serde_json::from_str(body).map_err(|e| {
            warn!("Portal: malformed form body: {}", e);
            Error::Config("portal form is not valid JSON")
        })
    }

    /// Field defaults shown when the portal opens.
    pub fn prefill(config: &DeviceConfig) -> Self {
        Self {
            address: config.broker_address.as_str().to_owned(),
            port: config.broker_port.to_string(),
            user: config.broker_user.as_str().to_owned(),
            password: config.broker_password.as_str().to_owned(),
        }
    }

    /// Parse and validate into a record.
    pub fn to_config(&self) -> Result<DeviceConfig, Error> {
        let port = self
            .port
            .trim()
            .parse::<u16>()
            .map_err(|_| Error::Config("broker port must be 1-65535"))?;
        DeviceConfig::with_broker(self.address.trim(), port, &self.user, &self.password)
    }
}

/// Tracks one portal session.
#[derive(Debug, Default)]
pub struct Provisioning {
    should_save: bool,
}

impl Provisioning {
    pub fn new() -> Self {
        Self::default()
    }

    /// The portal must run when no broker has been configured yet.
    pub fn required(config: &DeviceConfig) -> bool {
        !config.has_broker()
    }

    /// Portal callback: the user pressed save.
    pub fn on_save_config(&mut self) {
        info!("Portal: should save config");
        self.should_save = true;
    }

    pub fn should_save(&self) -> bool {
        self.should_save
    }

    /// Take the portal's submitted body, if any. Only a body that parses
    /// counts as a save; otherwise the prefilled form comes back and
    /// nothing will be committed.
    pub fn receive(&mut self, body: Option<&str>, current: &DeviceConfig) -> PortalForm {
        match body.map(PortalForm::from_json) {
            Some(Ok(form)) => {
                self.on_save_config();
                form
            }
            // A malformed body was already logged by the parser.
            Some(Err(_)) | None => PortalForm::prefill(current),
        }
    }

    /// Persist `form` if the portal asked for it.
    ///
    /// Returns the stored record, or `None` when there was nothing to save.
    /// An invalid form leaves the store untouched.
    pub fn commit<S: StoragePort>(
        &mut self,
        form: &PortalForm,
        store: &mut ConfigStore<S>,
    ) -> Result<Option<DeviceConfig>, Error> {
        if !self.should_save {
            return Ok(None);
        }
        let config = form.to_config()?;
        store.save(&config)?;
        self.should_save = false;
        info!(
            "Portal: broker set to {}:{}",
            config.broker_address, config.broker_port
        );
        Ok(Some(store.snapshot().clone()))
    }
}
