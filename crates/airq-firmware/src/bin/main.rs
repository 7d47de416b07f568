#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

//! Board wiring (ESP32-S3):
//!
//! | Signal        | Pin    |
//! |---------------|--------|
//! | MQ-135 AOUT   | GPIO4  |
//! | DHT22 DATA    | GPIO18 |
//! | Buzzer (+)    | GPIO5  |

use airq_core::alarm::Buzzer;
use airq_core::app_state::{AppError, AppRunState};
use airq_core::config::{CloudConfig, DeviceConfig, NetworkConfig};
use airq_core::connection::Connector;
use airq_core::dashboard::blynk::BlynkDashboard;
use airq_core::monitor::Monitor;
use airq_firmware::dht22::Dht22;
use airq_firmware::gas::AdcGasSensor;
use airq_firmware::http::TcpHttpTransport;
use airq_firmware::wifi::WifiLink;
use airq_firmware::wifi_secrets;
use embassy_executor::Spawner;
use embassy_net::{Runner, StackResources};
use embassy_time::{Delay, Duration, Instant, Timer};
use esp_hal::analog::adc::{Adc, AdcConfig, Attenuation};
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Flex, Level, Output, OutputConfig};
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use esp_radio::wifi::WifiDevice;
use log::{error, info, warn};
use static_cell::StaticCell;

/// Pause between main loop passes
const LOOP_TICK: Duration = Duration::from_millis(50);

/// Pause before retrying the network after the retry policy gave up
const RECONNECT_PAUSE: Duration = Duration::from_secs(60);

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

/// Re-establishes the link whenever it drops, leaving sampling untouched
#[embassy_executor::task]
async fn connection_task(mut link: WifiLink, mut connector: Connector) {
    loop {
        if connector.state().is_connected() {
            link.wait_disconnected().await;
            connector.link_lost();
        } else {
            Timer::after(RECONNECT_PAUSE).await;
        }

        if let Err(e) = connector.establish(&mut link, &mut Delay).await {
            warn!("{}", AppError::from(e));
        }
    }
}

/// Log the error and park the core. Nothing useful can run without the
/// failed peripheral.
async fn halt(e: AppError) -> ! {
    error!("Fatal: {}", e);
    loop {
        Timer::after(Duration::from_secs(3600)).await;
    }
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let device_config = DeviceConfig::new(
        NetworkConfig {
            ssid: wifi_secrets::SSID,
            password: wifi_secrets::PASSWORD,
        },
        CloudConfig {
            host: wifi_secrets::BLYNK_HOST,
            auth_token: wifi_secrets::BLYNK_AUTH_TOKEN,
        },
    );
    if let Err(e) = device_config.validate() {
        halt(e.into()).await;
    }

    // Local hardware first so the alarm is silent before anything else runs
    let buzzer_pin = Output::new(peripherals.GPIO5, Level::Low, OutputConfig::default());
    let buzzer = match Buzzer::new(buzzer_pin) {
        Ok(buzzer) => buzzer,
        Err(e) => halt(AppError::hardware(format_args!("buzzer: {}", e))).await,
    };

    let mut adc_config = AdcConfig::new();
    let gas_pin = adc_config.enable_pin(peripherals.GPIO4, Attenuation::_11dB);
    let gas = AdcGasSensor::new(Adc::new(peripherals.ADC1, adc_config), gas_pin);

    let climate = Dht22::new(Flex::new(peripherals.GPIO18));

    info!("Sensors initialized!");

    // Wi-Fi and the network stack
    static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    let radio = match esp_radio::init() {
        Ok(radio) => RADIO.init(radio),
        Err(e) => halt(AppError::hardware(format_args!("radio: {:?}", e))).await,
    };
    let (wifi_controller, interfaces) =
        match esp_radio::wifi::new(&*radio, peripherals.WIFI, Default::default()) {
            Ok(wifi) => wifi,
            Err(e) => halt(AppError::hardware(format_args!("wifi: {:?}", e))).await,
        };

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    static RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        RESOURCES.init(StackResources::new()),
        seed,
    );
    if spawner.spawn(net_task(runner)).is_err() {
        halt(AppError::Unknown).await;
    }

    // Bounded bring-up; sampling starts either way
    let mut link = WifiLink::new(wifi_controller, stack, device_config.network.clone());
    let mut connector = Connector::new(device_config.retry);
    let mut run_state = AppRunState::WifiConnecting;
    info!("Run state: {:?}", run_state);
    if let Err(e) = connector.establish(&mut link, &mut Delay).await {
        warn!("{}; sampling offline", AppError::from(e));
    }
    run_state = AppRunState::after_connect(connector.state());
    info!("Run state: {:?}", run_state);

    if spawner.spawn(connection_task(link, connector)).is_err() {
        warn!("Could not spawn reconnect task");
    }

    let dashboard = BlynkDashboard::new(TcpHttpTransport::new(stack), &device_config.cloud);
    let mut monitor = Monitor::new(&device_config, gas, climate, dashboard, buzzer);

    run_state = AppRunState::SensorsRunning;
    info!("Run state: {:?}", run_state);

    loop {
        match monitor.step(Instant::now()).await {
            Some(Ok(report)) => info!(
                "Cycle done: {} (published: {}, event sent: {})",
                report.category.label(),
                report.published,
                report.event_sent
            ),
            Some(Err(e)) => warn!("Cycle skipped: {}", e),
            None => {}
        }
        Timer::after(LOOP_TICK).await;
    }
}
