use core::fmt::Write as _;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_cli::{Command, CommandGroup, cli::CliBuilder, cli::CliHandle};
use embedded_io_async::Read;
use log::info;
use ufmt::uwrite;

use crate::system_settings::StoreSignals;
use crate::system_settings::log_toggles::{
    LogChannel, LogChannelToggles, LogToggleSender, LogToggles,
};

/// Byte that opens the console
const ENTER: u8 = 13;

/// Something that can describe the live state of the application for the `status` command
pub trait StatusReport {
    fn report(&self, out: &mut dyn core::fmt::Write) -> core::fmt::Result;
}

struct Context<M: RawMutex + 'static, S: ?Sized + 'static> {
    sender: LogToggleSender,
    logging_config: LogToggles,
    interface_open: bool,
    store_signals: &'static StoreSignals<M>,
    status: &'static S,
}

#[derive(CommandGroup)]
enum RootGroup {
    Base(Base),
    Logging(Logging),
    Storage(Flash),
    Device(Device),
}

#[derive(Command)]
#[command(help_title = "Basic commands")]
enum Base {
    /// Exit the CLI. This will start logging out all enabled channels. To open the CLI again press enter
    Exit,
}

// This is okay because these names will be converted to CLI commands, and they need the additional context
#[allow(clippy::enum_variant_names)]
#[derive(Command)]
#[command(help_title = "Manage Logging output")]
enum Logging {
    /// Enable printing of a certain log channel
    LogEnable {
        /// Which logging channel to enable
        channel: LogChannel,
    },
    /// Disable printing of a certain log channel
    LogDisable {
        /// Which logging channel to disable
        channel: LogChannel,
    },
    /// List all available logging channels
    LogList,
}

impl Logging {
    fn handle<TX: embedded_io::Write, M: RawMutex, S: ?Sized>(
        &self,
        cli: &mut CliHandle<'_, TX, TX::Error>,
        context: &mut Context<M, S>,
    ) -> Result<(), TX::Error> {
        match self {
            Logging::LogList => {
                uwrite!(
                    cli.writer(),
                    "Available logging channels: \n{}",
                    context.logging_config.config
                )?;
            }
            Logging::LogEnable { channel } => {
                set_log(context, channel, true);
                uwrite!(cli.writer(), "Enabled logging for channel {}", channel)?;
            }
            Logging::LogDisable { channel } => {
                set_log(context, channel, false);
                uwrite!(cli.writer(), "Disabled logging for channel {}", channel)?;
            }
        }
        Ok(())
    }
}

/// Apply a toggle change, persist it and publish it to all log receivers
fn set_log<M: RawMutex, S: ?Sized>(
    context: &mut Context<M, S>,
    channel: &LogChannel,
    state: bool,
) {
    context.logging_config.config.set(channel, state);
    context
        .store_signals
        .log_toggles
        .signal(context.logging_config.config.clone());
    context.sender.send(context.logging_config.clone());
}

#[derive(Command)]
#[command(help_title = "Manage values stored in flash")]
enum Flash {
    /// Erase all stored settings
    FlashFormat,
}

impl Flash {
    fn handle<TX: embedded_io::Write, M: RawMutex, S: ?Sized>(
        &self,
        cli: &mut CliHandle<'_, TX, TX::Error>,
        context: &mut Context<M, S>,
    ) -> Result<(), TX::Error> {
        match self {
            Flash::FlashFormat => {
                context.store_signals.format.signal(());
                uwrite!(cli.writer(), "Formatting flash")?;
            }
        }
        Ok(())
    }
}

#[derive(Command)]
#[command(help_title = "Inspect the device")]
enum Device {
    /// Print the current state of the application
    Status,
}

impl Device {
    fn handle<TX: embedded_io::Write, M: RawMutex, S: StatusReport + ?Sized>(
        &self,
        cli: &mut CliHandle<'_, TX, TX::Error>,
        context: &mut Context<M, S>,
    ) -> Result<(), TX::Error> {
        match self {
            Device::Status => {
                if context.status.report(cli.writer()).is_err() {
                    let _ = write!(cli.writer(), "Failed to format the status");
                }
            }
        }
        Ok(())
    }
}

pub struct CLIHandler<TX, M, S>
where
    TX: embedded_io::Write,
    M: RawMutex + 'static,
    S: StatusReport + ?Sized + 'static,
{
    context: Context<M, S>,
    cli: embedded_cli::cli::Cli<TX, TX::Error, [u8; 255], [u8; 255]>,
}

impl<TX, M, S> CLIHandler<TX, M, S>
where
    TX: embedded_io::Write,
    M: RawMutex + 'static,
    S: StatusReport + ?Sized + 'static,
{
    /// Publishes the initial log toggles (usually restored from flash) and sets up the console
    pub fn new(
        initial_log_toggles: LogChannelToggles,
        log_toggle_sender: LogToggleSender,
        store_signals: &'static StoreSignals<M>,
        status: &'static S,
        tx: TX,
    ) -> Option<Self> {
        let context = Context {
            sender: log_toggle_sender,
            logging_config: LogToggles {
                active: true,
                config: initial_log_toggles,
            },
            interface_open: false,
            store_signals,
            status,
        };
        context.sender.send(context.logging_config.clone());

        let command_buffer = [0u8; 255];
        let history_buffer = [0u8; 255];
        let cli = CliBuilder::default()
            .writer(tx)
            .command_buffer(command_buffer)
            .history_buffer(history_buffer)
            .build()
            .ok()?;

        info!("CLI is ready, press enter to open it");
        Some(Self { context, cli })
    }

    pub fn is_open(&self) -> bool {
        self.context.interface_open
    }

    /// Wait for the next byte from the console and process it
    pub async fn run<RX: Read>(&mut self, rx: &mut RX) {
        let mut buf: [u8; 1] = [0; 1];
        if let Ok(1) = rx.read(&mut buf).await {
            self.process(buf[0]);
        }
    }

    pub fn process(&mut self, byte: u8) {
        // if the interface is not open, only enter opens it
        if !self.context.interface_open {
            if byte != ENTER {
                return;
            }
            self.context.interface_open = true;
            self.context.logging_config.active = false;
            self.context
                .sender
                .send(self.context.logging_config.clone());
        }

        let context = &mut self.context;
        let _ = self.cli.process_byte::<RootGroup, _>(
            byte,
            &mut RootGroup::processor(|cli, command| {
                match command {
                    RootGroup::Logging(logging) => logging.handle(cli, context),
                    RootGroup::Storage(storage) => storage.handle(cli, context),
                    RootGroup::Device(device) => device.handle(cli, context),
                    RootGroup::Base(Base::Exit) => {
                        context.interface_open = false;
                        context.logging_config.active = true;
                        context.sender.send(context.logging_config.clone());
                        Ok(())
                    }
                }
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    extern crate std;
    use crate::system_settings::log_toggles::LogToggleWatcher;
    use core::cell::RefCell;
    use core::convert::Infallible;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_sync::watch::Watch;
    use std::boxed::Box;
    use std::string::String;
    use std::vec::Vec;

    struct Console<'a>(&'a RefCell<Vec<u8>>);

    impl embedded_io::ErrorType for Console<'_> {
        type Error = Infallible;
    }

    impl embedded_io::Write for Console<'_> {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    struct FixedStatus;

    impl StatusReport for FixedStatus {
        fn report(&self, out: &mut dyn core::fmt::Write) -> core::fmt::Result {
            write!(out, "level 3, turn 7")
        }
    }

    struct Fixture {
        watch: &'static LogToggleWatcher<CriticalSectionRawMutex, 2>,
        signals: &'static StoreSignals<CriticalSectionRawMutex>,
        output: &'static RefCell<Vec<u8>>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                watch: Box::leak(Box::new(Watch::new())),
                signals: Box::leak(Box::new(StoreSignals::new())),
                output: Box::leak(Box::new(RefCell::new(Vec::new()))),
            }
        }

        fn handler(&self) -> TestCli {
            CLIHandler::new(
                LogChannelToggles::default(),
                self.watch.dyn_sender(),
                self.signals,
                &FixedStatus,
                Console(self.output),
            )
            .unwrap()
        }

        fn toggles(&self) -> LogToggles {
            self.watch.try_get().unwrap()
        }

        fn output(&self) -> String {
            String::from_utf8_lossy(&self.output.borrow()).into_owned()
        }
    }

    type TestCli = CLIHandler<Console<'static>, CriticalSectionRawMutex, FixedStatus>;

    fn type_line(cli: &mut TestCli, line: &str) {
        for b in line.bytes() {
            cli.process(b);
        }
        cli.process(ENTER);
    }

    #[test]
    fn test_only_enter_opens_the_console() {
        let fixture = Fixture::new();
        let mut cli = fixture.handler();
        assert!(fixture.toggles().active);
        cli.process(b'x');
        assert!(!cli.is_open());
        cli.process(ENTER);
        assert!(cli.is_open());
        assert!(!fixture.toggles().active);
    }

    #[test]
    fn test_log_disable_publishes_and_persists() {
        let fixture = Fixture::new();
        let mut cli = fixture.handler();
        cli.process(ENTER);
        type_line(&mut cli, "log-disable game");
        assert!(!fixture.toggles().config.game);
        assert!(fixture.signals.log_toggles.signaled());
        assert!(fixture.output().contains("Disabled logging for channel Game"));
    }

    #[test]
    fn test_exit_resumes_logging() {
        let fixture = Fixture::new();
        let mut cli = fixture.handler();
        cli.process(ENTER);
        type_line(&mut cli, "exit");
        assert!(!cli.is_open());
        assert!(fixture.toggles().active);
    }

    #[test]
    fn test_flash_format_and_status() {
        let fixture = Fixture::new();
        let mut cli = fixture.handler();
        cli.process(ENTER);
        type_line(&mut cli, "flash-format");
        assert!(fixture.signals.format.signaled());
        type_line(&mut cli, "status");
        assert!(fixture.output().contains("level 3, turn 7"));
    }
}
