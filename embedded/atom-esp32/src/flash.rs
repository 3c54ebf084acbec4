use atom_core::flash::{FlashError, FlashHandling, FlashType, PersistentStorage};
use atom_core::system_settings::StoreSignals;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use esp_bootloader_esp_idf::partitions::{self, FlashRegion, PartitionEntry, PartitionType};
use esp_hal::peripherals::FLASH;
use esp_storage::FlashStorage;
use log::{info, warn};
use static_cell::StaticCell;
use thiserror::Error;

pub type ESPFlashError = FlashError<partitions::Error>;
type ESPFlashType = FlashRegion<'static, FlashStorage<'static>>;

#[derive(Error, Debug)]
pub enum FlashSetupError {
    #[error("Failed to read the partition table: {0:?}")]
    PartitionTable(partitions::Error),
    #[error("The partition table has no settings partition")]
    MissingPartition,
    #[error("Formatting the settings partition failed: {0}")]
    Format(ESPFlashError),
}

pub struct FlashHandler {
    flash: FlashType<'static, ESPFlashType>,
}

impl FlashHandling<ESPFlashType> for FlashHandler {
    fn get_flash(&self) -> &FlashType<'static, ESPFlashType> {
        &self.flash
    }
}

impl FlashHandler {
    /// Mount the settings database on the first partition of the given type.
    /// A database that does not mount is formatted.
    pub async fn new(
        flash: FLASH<'static>,
        partition: PartitionType,
    ) -> Result<Self, FlashSetupError> {
        static STORAGE: StaticCell<FlashStorage<'static>> = StaticCell::new();
        static PARTITION_TABLE: StaticCell<[u8; partitions::PARTITION_TABLE_MAX_LEN]> =
            StaticCell::new();
        static SETTINGS_PARTITION: StaticCell<PartitionEntry<'static>> = StaticCell::new();

        let storage = STORAGE.init(FlashStorage::new(flash).multicore_auto_park());
        let table_memory = PARTITION_TABLE.init([0u8; partitions::PARTITION_TABLE_MAX_LEN]);
        let table = partitions::read_partition_table(storage, table_memory)
            .map_err(FlashSetupError::PartitionTable)?;
        let entry = table
            .find_partition(partition)
            .map_err(FlashSetupError::PartitionTable)?
            .ok_or(FlashSetupError::MissingPartition)?;
        let entry = SETTINGS_PARTITION.init(entry);
        info!("Storing settings into partition with offset: {}", entry.offset());
        let region = entry.as_embedded_storage(storage);

        let flash = FlashType::new(PersistentStorage::new(0, region), ekv::Config::default());
        let handler = Self { flash };
        if handler.flash.mount().await.is_ok() {
            info!("Flash mounted successfully");
        } else {
            warn!("Failed to mount flash. Assuming first boot, formatting...");
            handler.format().await.map_err(FlashSetupError::Format)?;
        }
        Ok(handler)
    }
}

#[embassy_executor::task]
pub async fn flash_task(
    flash_handler: &'static FlashHandler,
    store_signals: &'static StoreSignals<CriticalSectionRawMutex>,
) {
    loop {
        flash_handler.run(store_signals).await;
    }
}
