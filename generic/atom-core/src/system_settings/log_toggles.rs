use core::str::FromStr;

use embassy_sync::watch::{self, Watch};
use embedded_cli::arguments::FromArgumentError;
use postcard::experimental::max_size::MaxSize;
use serde::{Deserialize, Serialize};
use ufmt::{derive::uDebug, uDisplay, uwriteln};

pub type LogToggleSender = watch::DynSender<'static, LogToggles>;
pub type LogToggleReceiver = watch::DynReceiver<'static, LogToggles>;
pub type LogToggleWatcher<M, const N: usize> = Watch<M, LogToggles, N>;

/// Generates the persisted toggle struct and the matching channel enum from
/// `field, Variant` pairs
macro_rules! log_toggles {
    ($($variant:ident, $enum:ident),*) => {
        #[derive(Clone, Debug, uDebug, PartialEq, Eq, Serialize, Deserialize, MaxSize)]
        pub struct LogChannelToggles {
            $(pub $variant: bool),+
        }

        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub enum LogChannel {
            $($enum),+
        }

        impl uDisplay for LogChannelToggles {
            fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
            where
                W: ufmt::uWrite + ?Sized,
            {
                uwriteln!(f, "Channel:       | Enabled:")?;
                uwriteln!(f, "---------------|---------")?;
                $(uwriteln!(f, "{} | {}", stringify!($variant), self.$variant)?;)+
                Ok(())
            }
        }

        impl LogChannelToggles {
            pub const fn all(state: bool) -> Self {
                Self {
                    $($variant: state),+
                }
            }

            fn should_log(&self, channel: LogChannel) -> bool {
                match channel {
                    $(LogChannel::$enum => self.$variant),+
                }
            }

            pub fn set(&mut self, channel: &LogChannel, state: bool) {
                match channel {
                    $(LogChannel::$enum => self.$variant = state,)+
                }
            }
        }

        impl FromStr for LogChannel {
            type Err = ();
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(match s {
                    $(stringify!($variant) => LogChannel::$enum,)+
                    $(stringify!($enum) => LogChannel::$enum,)+
                    _ => {
                        return Err(());
                    }
                })
            }
        }

        impl uDisplay for LogChannel {
            fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
            where
                W: ufmt::uWrite + ?Sized,
            {
                match self {
                    $(LogChannel::$enum => f.write_str(stringify!($enum)),)+
                }
            }
        }
    };
}

log_toggles!(
    measure, Measure, http, Http, wifi, Wifi, game, Game, imu, Imu
);

/// Everything except the raw accelerometer stream is on after a fresh format
impl Default for LogChannelToggles {
    fn default() -> Self {
        Self {
            imu: false,
            ..Self::all(true)
        }
    }
}

impl<'a> embedded_cli::arguments::FromArgument<'a> for LogChannel {
    fn from_arg(arg: &'a str) -> Result<Self, FromArgumentError<'a>>
    where
        Self: Sized,
    {
        arg.parse().map_err(|_| FromArgumentError {
            value: arg,
            expected: "one of measure, http, wifi, game, imu",
        })
    }
}

#[derive(Clone, Debug, uDebug, Default, PartialEq, Eq)]
pub struct LogToggles {
    pub active: bool,
    pub config: LogChannelToggles,
}

impl LogToggles {
    pub fn should_log(&self, channel: LogChannel) -> bool {
        self.active && self.config.should_log(channel)
    }
}

/// Run `c` only if logging is active and `channel` is enabled.
/// Waits until the first toggle configuration has been published.
pub async fn may_log<C>(receiver: &mut LogToggleReceiver, channel: LogChannel, c: C)
where
    C: FnOnce(),
{
    let toggles = receiver.get().await;
    if toggles.should_log(channel) {
        c();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    extern crate std;
    use core::cell::Cell;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    #[test]
    fn test_channel_parses_field_and_variant_names() {
        assert_eq!("wifi".parse::<LogChannel>(), Ok(LogChannel::Wifi));
        assert_eq!("Measure".parse::<LogChannel>(), Ok(LogChannel::Measure));
        assert_eq!("motor".parse::<LogChannel>(), Err(()));
    }

    #[test]
    fn test_inactive_logging_mutes_every_channel() {
        let mut toggles = LogToggles {
            active: true,
            config: LogChannelToggles::all(true),
        };
        assert!(toggles.should_log(LogChannel::Http));
        toggles.active = false;
        assert!(!toggles.should_log(LogChannel::Http));
    }

    #[test]
    fn test_set_toggles_single_channel() {
        let mut config = LogChannelToggles::default();
        assert!(!config.imu);
        config.set(&LogChannel::Imu, true);
        config.set(&LogChannel::Game, false);
        assert!(config.should_log(LogChannel::Imu));
        assert!(!config.should_log(LogChannel::Game));
        assert!(config.should_log(LogChannel::Wifi));
    }

    #[test]
    fn test_may_log_follows_published_toggles() {
        static WATCH: LogToggleWatcher<CriticalSectionRawMutex, 2> = Watch::new();
        let sender = WATCH.dyn_sender();
        let mut receiver = WATCH.dyn_receiver().unwrap();
        let hits = Cell::new(0);

        sender.send(LogToggles {
            active: true,
            config: LogChannelToggles::default(),
        });
        embassy_futures::block_on(may_log(&mut receiver, LogChannel::Game, || {
            hits.set(hits.get() + 1)
        }));
        embassy_futures::block_on(may_log(&mut receiver, LogChannel::Imu, || {
            hits.set(hits.get() + 1)
        }));
        assert_eq!(hits.get(), 1);
    }
}
