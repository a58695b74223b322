//! homenode firmware — relay node entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                    │
//! │                                                            │
//! │  NvsStorage     MqttTransport   SystemClock   EspSystem    │
//! │  (StoragePort)  (Transport)     (Clock)       (SystemPort) │
//! │  PinButton (ButtonInput)        BoardRelay (RelayOutput)   │
//! │  StatusLed (relay mirror, portal blink)                    │
//! │                                                            │
//! │  ─────────────── Port Trait Boundary ──────────────────    │
//! │                                                            │
//! │  ┌──────────────────────────────────────────────────────┐  │
//! │  │  Node: ConfigStore · Connection · Router · Hooks     │  │
//! │  └──────────────────────────────────────────────────────┘  │
//! │                 RelayDevice (topics + hooks)               │
//! └────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Result, anyhow};
use embedded_hal::digital::OutputPin as LedPin;
use log::{error, info, warn};

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{Output, OutputPin, PinDriver, Pull};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use homenode::adapters::device_id::DeviceIdentity;
use homenode::adapters::mqtt::MqttTransport;
use homenode::adapters::nvs::NvsStorage;
use homenode::adapters::system::EspSystem;
use homenode::adapters::time::SystemClock;
use homenode::app::ports::{Clock, SystemPort};
use homenode::app::store::ConfigStore;
use homenode::config::{NodeOptions, PORTAL_TIMEOUT, StoreLayout};
use homenode::devices::relay::{RelayDevice, RelayOutput};
use homenode::drivers::button::PinButton;
use homenode::drivers::led::{LedPattern, StatusLed};
use homenode::provisioning::Provisioning;
use homenode::Node;

/// Main loop period.
const LOOP_MS: u32 = 10;

// ── Board wiring (Sonoff Basic) ───────────────────────────────

type BoardLed<'d, L> = Rc<RefCell<StatusLed<PinDriver<'d, L, Output>>>>;

/// Coil on GPIO12; the status LED on GPIO13 mirrors it.
struct BoardRelay<'d, C: OutputPin, L: OutputPin> {
    coil: PinDriver<'d, C, Output>,
    led: BoardLed<'d, L>,
}

impl<C: OutputPin, L: OutputPin> RelayOutput for BoardRelay<'_, C, L> {
    fn set(&mut self, on: bool) {
        let coil = if on { self.coil.set_high() } else { self.coil.set_low() };
        if coil.is_err() {
            warn!("Board: relay GPIO write failed");
        }
        self.led
            .borrow_mut()
            .set_pattern(if on { LedPattern::Solid } else { LedPattern::Off });
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("homenode v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;
    let identity = DeviceIdentity::from_hardware();
    info!("Boot: identity {}", identity);

    // ── 2. Relay on before anything can block ─────────────────
    // Active low.
    let led = Rc::new(RefCell::new(StatusLed::new(
        PinDriver::output(peripherals.pins.gpio13)?,
        true,
    )));
    let relay = RelayDevice::new(BoardRelay {
        coil: PinDriver::output(peripherals.pins.gpio12)?,
        led: Rc::clone(&led),
    });

    // ── 3. Config record ──────────────────────────────────────
    let mut store = match NvsStorage::new(nvs_partition.clone())
        .and_then(|storage| ConfigStore::open(storage, StoreLayout::default()))
    {
        Ok(store) => store,
        Err(e) => {
            error!("Boot: config storage unusable ({}), restarting", e);
            EspSystem::new().restart();
            return Ok(());
        }
    };

    // ── 4. Network ────────────────────────────────────────────
    let mut esp_wifi = EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs_partition))?;
    let mut wifi = BlockingWifi::wrap(&mut esp_wifi, sys_loop)?;
    connect_wifi(&mut wifi)?;

    // ── 5. Broker provisioning ────────────────────────────────
    if Provisioning::required(store.snapshot()) {
        provision(&mut store, &led, &SystemClock::new());
    }

    // ── 6. Node ───────────────────────────────────────────────
    let options = NodeOptions::default();
    let mut node = Node::new(
        identity,
        store,
        MqttTransport::new(),
        SystemClock::new(),
        EspSystem::new(),
        &options,
    )?;
    relay.install(&mut node)?;

    let mut button_pin = PinDriver::input(peripherals.pins.gpio0)?;
    button_pin.set_pull(Pull::Up)?;
    let mut button = PinButton::new(button_pin, SystemClock::new());

    info!("Boot: entering main loop");
    loop {
        node.tick(&mut button);
        FreeRtos::delay_ms(LOOP_MS);
    }
}

fn connect_wifi(wifi: &mut BlockingWifi<&mut EspWifi<'static>>) -> Result<()> {
    let ssid = option_env!("HOMENODE_WIFI_SSID").unwrap_or("");
    let password = option_env!("HOMENODE_WIFI_PASS").unwrap_or("");

    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: ssid.try_into().map_err(|_| anyhow!("wifi ssid too long"))?,
        password: password
            .try_into()
            .map_err(|_| anyhow!("wifi password too long"))?,
        auth_method: if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPAWPA2Personal
        },
        ..Default::default()
    }))?;

    wifi.start()?;
    wifi.connect()?;
    wifi.wait_netif_up()?;
    info!("WiFi: connected to '{}'", ssid);
    Ok(())
}

/// Apply the broker form baked in at build time, blinking the LED while
/// the portal is open. Without a usable form the node waits out the portal
/// window and restarts.
fn provision<P: LedPin>(
    store: &mut ConfigStore<NvsStorage>,
    led: &RefCell<StatusLed<P>>,
    clock: &impl Clock,
) {
    let mut led = led.borrow_mut();
    let steady = led.pattern();
    led.set_pattern(LedPattern::FastBlink);
    led.tick(clock.now_ms());

    let mut session = Provisioning::new();
    let form = session.receive(option_env!("HOMENODE_PORTAL_FORM"), store.snapshot());

    match session.commit(&form, store) {
        Ok(Some(cfg)) => {
            info!("Portal: configured {}:{}", cfg.broker_address, cfg.broker_port);
            led.set_pattern(steady);
            return;
        }
        Ok(None) => warn!("Portal: no broker settings submitted"),
        Err(e) => warn!("Portal: no usable broker settings ({})", e),
    }
    info!("Portal: restarting in {} s", PORTAL_TIMEOUT.as_secs());
    led.run_for(clock, PORTAL_TIMEOUT);
    EspSystem::new().restart();
}
