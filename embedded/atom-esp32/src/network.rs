use core::net::Ipv4Addr;

use atom_core::connectivity::{LinkState, ReconnectPolicy, WifiLink, supervise};
use atom_core::env_monitor::LatestSnapshot;
use atom_core::http::{CONNECTION_TIMEOUT, PORT, Site, serve_connection};
use atom_core::status_led::StatusBoard;
use atom_core::system_settings::log_toggles::{LogChannel, LogToggleReceiver, may_log};
use embassy_net::{Runner, Stack, tcp::TcpSocket};
use embassy_time::{Delay, Timer};
use esp_radio::wifi::{WifiController, WifiDevice, WifiError};
use log::{info, warn};

const SOCKET_BUFFER_SIZE: usize = 1536;

/// [`WifiLink`] over the esp-radio station interface. The link only counts as connected
/// once DHCP handed out an address.
pub struct EspWifiLink {
    controller: WifiController<'static>,
    stack: Stack<'static>,
    ssid: &'static str,
    was_connected: bool,
    begin_failed: bool,
}

impl EspWifiLink {
    /// `controller` must already carry the client configuration for `ssid`
    pub fn new(
        controller: WifiController<'static>,
        stack: Stack<'static>,
        ssid: &'static str,
    ) -> Self {
        Self {
            controller,
            stack,
            ssid,
            was_connected: false,
            begin_failed: false,
        }
    }
}

impl WifiLink for EspWifiLink {
    type Error = WifiError;

    fn ssid(&self) -> &str {
        self.ssid
    }

    async fn begin(&mut self) -> Result<(), Self::Error> {
        self.begin_failed = false;
        if !self.controller.is_started()? {
            self.controller.start_async().await?;
        }
        let result = self.controller.connect_async().await;
        self.begin_failed = result.is_err();
        result
    }

    async fn state(&mut self) -> LinkState {
        let associated = matches!(self.controller.is_connected(), Ok(true));
        let state = match (associated, self.stack.config_v4().is_some()) {
            (true, true) if self.stack.is_link_up() => LinkState::Connected,
            (true, _) => LinkState::WaitingForAddress,
            (false, _) if self.was_connected => LinkState::ConnectionLost,
            (false, _) if self.begin_failed => LinkState::ConnectFailed,
            (false, _) if !self.controller.is_started().unwrap_or(false) => LinkState::Idle,
            (false, _) => LinkState::Disconnected,
        };
        self.was_connected = state == LinkState::Connected;
        state
    }

    async fn disconnect(&mut self) {
        if matches!(self.controller.is_connected(), Ok(true)) {
            let _ = self.controller.disconnect_async().await;
        }
        self.was_connected = false;
    }

    fn address(&self) -> Option<Ipv4Addr> {
        self.stack.config_v4().map(|config| config.address.address())
    }
}

#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

#[embassy_executor::task]
pub async fn wifi_task(
    link: EspWifiLink,
    board: &'static StatusBoard,
    log_receiver: LogToggleReceiver,
) {
    supervise(link, ReconnectPolicy::default(), board, Delay, log_receiver).await
}

/// Accepts one client at a time on port 80. The status matrix shows "serving" while a
/// client is connected.
#[embassy_executor::task]
pub async fn http_server_task(
    stack: Stack<'static>,
    site: Site,
    latest: &'static LatestSnapshot,
    board: &'static StatusBoard,
    mut log_receiver: LogToggleReceiver,
) {
    let mut rx_buffer = [0u8; SOCKET_BUFFER_SIZE];
    let mut tx_buffer = [0u8; SOCKET_BUFFER_SIZE];

    loop {
        stack.wait_config_up().await;
        let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Some(CONNECTION_TIMEOUT));

        if let Err(e) = socket.accept(PORT).await {
            warn!("Failed to accept a connection: {e:?}");
            Timer::after_millis(100).await;
            continue;
        }
        board.set_serving(true);
        may_log(&mut log_receiver, LogChannel::Http, || {
            info!("New client {:?}", socket.remote_endpoint())
        })
        .await;

        if let Err(e) = serve_connection(&mut socket, &site, latest, &mut log_receiver).await {
            may_log(&mut log_receiver, LogChannel::Http, || {
                warn!("Request failed: {e}")
            })
            .await;
        }

        socket.close();
        let _ = socket.flush().await;
        board.set_serving(false);
        may_log(&mut log_receiver, LogChannel::Http, || {
            info!("Client disconnected")
        })
        .await;
    }
}
