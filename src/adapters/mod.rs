//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements   | Connects to                  |
//! |-------------|--------------|------------------------------|
//! | `device_id` | —            | eFuse factory MAC            |
//! | `mqtt`      | Transport    | ESP-IDF MQTT client over TLS |
//! | `nvs`       | StoragePort  | NVS blob / in-memory image   |
//! | `system`    | SystemPort   | Wi-Fi driver, `esp_restart`  |
//! | `time`      | Clock        | ESP32 system timer           |

pub mod device_id;
pub mod mqtt;
pub mod nvs;
pub mod system;
pub mod time;
