#![no_std]

//! Firmware library: CH32V203 hardware and the foreground task

pub use embassy_executor::Spawner;
pub use embassy_time::Duration;

pub use ssi_core::*;

// Re-export hardware implementations
pub use crate::ch32v203_hardware::*;
pub use crate::tasks::*;

// Embassy tasks module
pub mod tasks {
    use super::*;

    /// Acquisition task wrapper: schedule, drain and report over USART1
    #[embassy_executor::task]
    pub async fn acquisition_task_wrapper(
        link: &'static SsiLink,
        config: SsiConfig,
        format: ReportFormat,
        uart: Usart1Tx,
    ) {
        #[cfg(feature = "defmt")]
        defmt::info!("Acquisition task started");
        ssi_core::controller::acquisition_task(link, config, format, uart).await;
    }
}

// CH32V203 hardware module
pub mod ch32v203_hardware;

// Time driver for embassy
pub mod time_driver;
