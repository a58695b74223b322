//! NVS-backed EEPROM image.
//!
//! Implements [`StoragePort`] as a fixed [`EEPROM_SIZE`]-byte image held in
//! RAM and mirrored to a single NVS blob, the same model as the Arduino
//! EEPROM emulation: the whole image is read at construction, and every
//! write commits the full blob so a record is never half-written.
//!
//! - **`target_os = "espidf"`**: blob `img` in namespace `homenode`.
//! - **all other targets**: RAM only, starts erased (`0xFF`).

use log::info;

#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{StorageError, StoragePort};
use crate::config::EEPROM_SIZE;

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};

#[cfg(target_os = "espidf")]
const NVS_NAMESPACE: &str = "homenode";
#[cfg(target_os = "espidf")]
const NVS_IMAGE_KEY: &str = "img";

const ERASED: u8 = 0xFF;

pub struct NvsStorage {
    image: Vec<u8>,
    #[cfg(target_os = "espidf")]
    nvs: EspNvs<NvsDefault>,
}

impl NvsStorage {
    /// Open NVS and pull the image into RAM.
    #[cfg(target_os = "espidf")]
    pub fn new(partition: EspDefaultNvsPartition) -> Result<Self, StorageError> {
        let nvs = EspNvs::new(partition, NVS_NAMESPACE, true).map_err(|e| {
            warn!("NvsStorage: open failed: {}", e);
            StorageError::IoError
        })?;

        let mut image = vec![ERASED; EEPROM_SIZE];
        let mut buf = vec![0u8; EEPROM_SIZE];
        match nvs.get_blob(NVS_IMAGE_KEY, &mut buf) {
            Ok(Some(stored)) => {
                let len = stored.len().min(EEPROM_SIZE);
                image[..len].copy_from_slice(&stored[..len]);
                info!("NvsStorage: image loaded ({} bytes)", len);
            }
            Ok(None) => info!("NvsStorage: no image yet, starting erased"),
            Err(e) => {
                warn!("NvsStorage: read failed: {}", e);
                return Err(StorageError::IoError);
            }
        }

        Ok(Self { image, nvs })
    }

    /// Simulation backend: an erased RAM image.
    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Result<Self, StorageError> {
        info!("NvsStorage: simulation backend");
        Ok(Self::from_image(vec![ERASED; EEPROM_SIZE]))
    }

    /// Simulation backend seeded with existing contents, resized to
    /// [`EEPROM_SIZE`].
    #[cfg(not(target_os = "espidf"))]
    pub fn from_image(mut image: Vec<u8>) -> Self {
        image.resize(EEPROM_SIZE, ERASED);
        Self { image }
    }

    /// Current RAM copy of the image.
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    fn range(&self, offset: usize, len: usize) -> Result<core::ops::Range<usize>, StorageError> {
        let end = offset.checked_add(len).ok_or(StorageError::OutOfRange)?;
        if end > self.image.len() {
            return Err(StorageError::OutOfRange);
        }
        Ok(offset..end)
    }

    #[cfg(target_os = "espidf")]
    fn commit(&mut self) -> Result<(), StorageError> {
        self.nvs.set_blob(NVS_IMAGE_KEY, &self.image).map_err(|e| {
            warn!("NvsStorage: commit failed: {}", e);
            StorageError::IoError
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn commit(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
}

impl StoragePort for NvsStorage {
    fn capacity(&self) -> usize {
        self.image.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        let range = self.range(offset, buf.len())?;
        buf.copy_from_slice(&self.image[range]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        let range = self.range(offset, data.len())?;
        let previous = self.image[range.clone()].to_vec();
        self.image[range.clone()].copy_from_slice(data);
        if let Err(e) = self.commit() {
            // Keep RAM consistent with flash.
            self.image[range].copy_from_slice(&previous);
            return Err(e);
        }
        Ok(())
    }
}
