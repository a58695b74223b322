//! Persistent config record with salt-based validity check.
//!
//! The record is `postcard`-encoded into a fixed [`RECORD_SLOT_LEN`]-byte
//! slot at a fixed offset and always written as a whole slot. On load, an
//! undecodable slot or a salt other than the expected one means "no record":
//! the compiled defaults are used instead, never a mixture of both.

use log::{info, warn};

use crate::config::{DeviceConfig, RECORD_SLOT_LEN, StoreLayout};

use super::ports::{StorageError, StoragePort};

pub struct ConfigStore<S: StoragePort> {
    storage: S,
    layout: StoreLayout,
    current: DeviceConfig,
}

impl<S: StoragePort> ConfigStore<S> {
    /// Bind to `storage` without reading it. The snapshot starts as defaults.
    pub fn new(storage: S, layout: StoreLayout) -> Self {
        Self {
            storage,
            layout,
            current: DeviceConfig::defaults(layout.salt),
        }
    }

    /// Bind and load in one step. `Err` means storage is unusable.
    pub fn open(storage: S, layout: StoreLayout) -> Result<Self, StorageError> {
        let mut store = Self::new(storage, layout);
        store.load()?;
        Ok(store)
    }

    /// Read the slot and refresh the snapshot.
    ///
    /// Only an I/O failure is an error; a corrupt or foreign record yields
    /// the defaults.
    pub fn load(&mut self) -> Result<DeviceConfig, StorageError> {
        let mut slot = [0u8; RECORD_SLOT_LEN];
        self.storage.read(self.layout.offset, &mut slot)?;

        self.current = match postcard::from_bytes::<DeviceConfig>(&slot) {
            Ok(cfg) if cfg.salt == self.layout.salt => {
                info!(
                    "ConfigStore: loaded broker {}:{}",
                    cfg.broker_address, cfg.broker_port
                );
                cfg
            }
            Ok(cfg) => {
                warn!(
                    "ConfigStore: salt {} != {}, using defaults",
                    cfg.salt, self.layout.salt
                );
                self.defaults()
            }
            Err(_) => {
                warn!("ConfigStore: stored record unreadable, using defaults");
                self.defaults()
            }
        };
        Ok(self.current.clone())
    }

    /// Persist `config` (stamped with the expected salt) as one slot write.
    pub fn save(&mut self, config: &DeviceConfig) -> Result<(), StorageError> {
        let mut record = config.clone();
        record.salt = self.layout.salt;

        let mut slot = [0u8; RECORD_SLOT_LEN];
        let used = encode_record(&record, &mut slot)?;
        self.storage.write(self.layout.offset, &slot)?;

        info!("ConfigStore: saved ({} bytes)", used);
        self.current = record;
        Ok(())
    }

    /// Overwrite the stored record with the compiled defaults.
    pub fn reset_to_defaults(&mut self) -> Result<(), StorageError> {
        info!("ConfigStore: restoring defaults");
        let defaults = self.defaults();
        self.save(&defaults)
    }

    /// Read-only view of the active record.
    pub fn snapshot(&self) -> &DeviceConfig {
        &self.current
    }

    pub fn defaults(&self) -> DeviceConfig {
        DeviceConfig::defaults(self.layout.salt)
    }

    pub fn layout(&self) -> StoreLayout {
        self.layout
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

fn encode_record(record: &DeviceConfig, slot: &mut [u8]) -> Result<usize, StorageError> {
    postcard::to_slice(record, slot)
        .map(|used| used.len())
        .map_err(|e| {
            warn!("ConfigStore: cannot encode record: {}", e);
            StorageError::Encode
        })
}
