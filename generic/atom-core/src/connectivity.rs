use core::fmt::Debug;
use core::net::Ipv4Addr;

use embedded_hal_async::delay::DelayNs;
use log::{error, info};

use crate::status_led::StatusBoard;
use crate::system_settings::log_toggles::{LogChannel, LogToggleReceiver, may_log};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Disconnected,
    /// Associated with the access point but no DHCP lease yet
    WaitingForAddress,
    NoSsid,
    ConnectFailed,
    ConnectionLost,
    Connected,
}

impl LinkState {
    pub fn message(self) -> &'static str {
        match self {
            LinkState::Idle => "[STATE] WiFi idle status",
            LinkState::Disconnected => "[STATE] WiFi disconnected",
            LinkState::WaitingForAddress => "[STATE] WiFi waiting for an address",
            LinkState::NoSsid => "[ERR] WiFi SSID not available",
            LinkState::ConnectFailed => "[ERR] WiFi connection failed",
            LinkState::ConnectionLost => "[ERR] WiFi connection lost",
            LinkState::Connected => "[OK] WiFi connected",
        }
    }
}

/// Station side of a WiFi interface
pub trait WifiLink {
    type Error: Debug;

    fn ssid(&self) -> &str;

    /// Start associating with the configured access point. May return before the link is up.
    fn begin(&mut self) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    fn state(&mut self) -> impl core::future::Future<Output = LinkState>;

    fn disconnect(&mut self) -> impl core::future::Future<Output = ()>;

    fn address(&self) -> Option<Ipv4Addr>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Pause between dropping the old association and starting a new one
    pub settle_ms: u32,
    /// How many times the state is polled before giving up
    pub attempts: u8,
    pub retry_ms: u32,
    /// Link check interval while connected
    pub poll_ms: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            settle_ms: 1500,
            attempts: 20,
            retry_ms: 500,
            poll_ms: 500,
        }
    }
}

/// Run a full connection cycle and report whether the link came up
pub async fn connect<L: WifiLink>(
    link: &mut L,
    policy: &ReconnectPolicy,
    delay: &mut impl DelayNs,
    log_receiver: &mut LogToggleReceiver,
) -> bool {
    link.disconnect().await;
    info!("Connecting to {}", link.ssid());
    delay.delay_ms(policy.settle_ms).await;
    if let Err(e) = link.begin().await {
        error!("[ERR] Failed to start WiFi association: {e:?}");
    }

    let mut state = link.state().await;
    let mut attempts = 0;
    while state != LinkState::Connected && attempts < policy.attempts {
        state = link.state().await;
        attempts += 1;
        may_log(log_receiver, LogChannel::Wifi, || info!("{}", state.message())).await;
        delay.delay_ms(policy.retry_ms).await;
    }

    if state == LinkState::Connected {
        if let Some(address) = link.address() {
            info!("IP address: {address}");
        }
        true
    } else {
        error!("[ERR] unable to connect WiFi");
        false
    }
}

/// Keep the station connected forever and mirror the link state on the status board
pub async fn supervise<L: WifiLink, D: DelayNs>(
    mut link: L,
    policy: ReconnectPolicy,
    board: &StatusBoard,
    mut delay: D,
    mut log_receiver: LogToggleReceiver,
) -> ! {
    let connected = connect(&mut link, &policy, &mut delay, &mut log_receiver).await;
    board.set_link_up(connected);
    loop {
        if link.state().await != LinkState::Connected {
            board.set_link_up(false);
            error!("[ERR] Lost WiFi connection, reconnecting...");
            if connect(&mut link, &policy, &mut delay, &mut log_receiver).await {
                info!("[OK] WiFi reconnected");
            } else {
                error!("[ERR] unable to reconnect");
            }
        }
        board.set_link_up(link.state().await == LinkState::Connected);
        delay.delay_ms(policy.poll_ms).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    extern crate std;
    use crate::status_led::LedStatus;
    use crate::system_settings::log_toggles::{LogChannelToggles, LogToggleWatcher, LogToggles};
    use embassy_futures::select::select;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_sync::watch::Watch;
    use embassy_time::{Delay, Timer};
    use std::vec::Vec;

    struct NoDelay;

    impl DelayNs for NoDelay {
        async fn delay_ns(&mut self, _ns: u32) {}
    }

    /// Reports `Disconnected` until `connect_after` state polls happened
    struct FakeLink {
        connect_after: Option<usize>,
        polls: usize,
        begins: usize,
        disconnects: usize,
    }

    impl FakeLink {
        fn new(connect_after: Option<usize>) -> Self {
            Self {
                connect_after,
                polls: 0,
                begins: 0,
                disconnects: 0,
            }
        }
    }

    impl WifiLink for FakeLink {
        type Error = ();

        fn ssid(&self) -> &str {
            "test-net"
        }

        async fn begin(&mut self) -> Result<(), ()> {
            self.begins += 1;
            Ok(())
        }

        async fn state(&mut self) -> LinkState {
            self.polls += 1;
            match self.connect_after {
                Some(n) if self.polls > n => LinkState::Connected,
                _ => LinkState::Disconnected,
            }
        }

        async fn disconnect(&mut self) {
            self.disconnects += 1;
        }

        fn address(&self) -> Option<Ipv4Addr> {
            Some(Ipv4Addr::new(192, 168, 1, 42))
        }
    }

    /// Comes up on the first association and drops once after `drop_after` state polls
    struct FlakyLink<'a> {
        board: &'a StatusBoard,
        drop_after: usize,
        polls: usize,
        begins: usize,
        status_on_begin: Vec<LedStatus>,
    }

    impl WifiLink for &mut FlakyLink<'_> {
        type Error = ();

        fn ssid(&self) -> &str {
            "test-net"
        }

        async fn begin(&mut self) -> Result<(), ()> {
            self.begins += 1;
            self.status_on_begin.push(self.board.status());
            Ok(())
        }

        async fn state(&mut self) -> LinkState {
            self.polls += 1;
            match self.begins {
                0 => LinkState::Idle,
                1 if self.polls > self.drop_after => LinkState::ConnectionLost,
                _ => LinkState::Connected,
            }
        }

        async fn disconnect(&mut self) {}

        fn address(&self) -> Option<Ipv4Addr> {
            Some(Ipv4Addr::new(192, 168, 1, 42))
        }
    }

    fn receiver() -> LogToggleReceiver {
        static WATCH: LogToggleWatcher<CriticalSectionRawMutex, 4> = Watch::new();
        WATCH.dyn_sender().send(LogToggles {
            active: true,
            config: LogChannelToggles::all(true),
        });
        WATCH.dyn_receiver().unwrap()
    }

    #[test]
    fn test_default_policy() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.attempts, 20);
        assert_eq!(policy.settle_ms, 1500);
        assert_eq!(policy.retry_ms, 500);
    }

    #[test]
    fn test_connect_succeeds_once_link_is_up() {
        let mut link = FakeLink::new(Some(3));
        let connected = embassy_futures::block_on(connect(
            &mut link,
            &ReconnectPolicy::default(),
            &mut NoDelay,
            &mut receiver(),
        ));
        assert!(connected);
        assert_eq!(link.begins, 1);
        assert_eq!(link.disconnects, 1);
        assert_eq!(link.polls, 4);
    }

    #[test]
    fn test_connect_gives_up_after_all_attempts() {
        let mut link = FakeLink::new(None);
        let connected = embassy_futures::block_on(connect(
            &mut link,
            &ReconnectPolicy::default(),
            &mut NoDelay,
            &mut receiver(),
        ));
        assert!(!connected);
        // initial check plus one poll per attempt
        assert_eq!(link.polls, 21);
    }

    #[test]
    fn test_lost_link_turns_red_and_reconnects() {
        let board = StatusBoard::new();
        let mut link = FlakyLink {
            board: &board,
            drop_after: 3,
            polls: 0,
            begins: 0,
            status_on_begin: Vec::new(),
        };
        let policy = ReconnectPolicy {
            settle_ms: 1,
            attempts: 5,
            retry_ms: 1,
            poll_ms: 1,
        };
        embassy_futures::block_on(select(
            supervise(&mut link, policy, &board, Delay, receiver()),
            Timer::after_millis(100),
        ));

        assert_eq!(link.begins, 2);
        assert_eq!(link.status_on_begin, [LedStatus::Error, LedStatus::Error]);
        assert!(board.link_up());
        assert_eq!(board.status(), LedStatus::Ok);
    }
}
