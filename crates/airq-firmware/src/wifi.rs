//! Station-mode Wi-Fi link

use airq_core::config::NetworkConfig;
use airq_core::connection::{LinkError, NetworkLink};
use embassy_net::Stack;
use embassy_time::{Duration, with_timeout};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiEvent};
use log::{error, info};

/// How long to wait for DHCP after the association succeeded
const DHCP_TIMEOUT: Duration = Duration::from_secs(15);

pub struct WifiLink {
    controller: WifiController<'static>,
    stack: Stack<'static>,
    network: NetworkConfig<'static>,
}

impl WifiLink {
    pub fn new(
        controller: WifiController<'static>,
        stack: Stack<'static>,
        network: NetworkConfig<'static>,
    ) -> Self {
        Self {
            controller,
            stack,
            network,
        }
    }

    /// Resolves when the station loses its association
    pub async fn wait_disconnected(&mut self) {
        self.controller
            .wait_for_event(WifiEvent::StaDisconnected)
            .await;
    }

    async fn ensure_started(&mut self) -> Result<(), LinkError> {
        if matches!(self.controller.is_started(), Ok(true)) {
            return Ok(());
        }

        let client = ClientConfig::default()
            .with_ssid(self.network.ssid.into())
            .with_password(self.network.password.into());
        self.controller
            .set_config(&ModeConfig::Client(client))
            .map_err(|e| {
                error!("Wi-Fi config rejected: {:?}", e);
                LinkError::Driver
            })?;

        self.controller.start_async().await.map_err(|e| {
            error!("Wi-Fi start failed: {:?}", e);
            LinkError::Driver
        })?;
        info!("Wi-Fi started");
        Ok(())
    }
}

impl NetworkLink for WifiLink {
    async fn connect(&mut self) -> Result<(), LinkError> {
        self.ensure_started().await?;

        self.controller.connect_async().await.map_err(|e| {
            error!("Wi-Fi connect to {} failed: {:?}", self.network.ssid, e);
            LinkError::NotFound
        })?;

        with_timeout(DHCP_TIMEOUT, self.stack.wait_config_up())
            .await
            .map_err(|_| LinkError::NoAddress)?;

        if let Some(config) = self.stack.config_v4() {
            info!("Got IP {}", config.address);
        }
        Ok(())
    }
}
