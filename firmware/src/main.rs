#![no_std]
#![no_main]

#[cfg(feature = "defmt")]
use defmt_rtt as _;

// RISC-V runtime
use riscv_rt as _;

// Panic handler
use panic_halt as _;

use core::fmt::Write;
use embassy_executor::Spawner;
use embassy_time::Duration;

use ssi_reader_firmware::*;

// Shared between the TIM2 interrupt and the acquisition task
static LINK: SsiLink = SsiLink::new();

/// Main firmware entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    #[cfg(feature = "defmt")]
    defmt::info!("SSI reader firmware starting...");

    // Clock line LOW and state Idle before the tick interrupt is enabled
    let mut hal = Ch32v203SsiHal::new();
    if hal.initialize().is_err() || LINK.init(hal.clock_line()).is_err() {
        halt("pin setup failed");
    }
    configure_systick();

    let mut uart = match Usart1Tx::new(pins::BAUD) {
        Ok(uart) => uart,
        Err(_) => halt("USART1 setup failed"),
    };
    write_banner(&mut uart).ok();

    let timer_config = TickTimerConfig::default();
    if hal.tick_timer().start(&timer_config).is_err() || hal.tick_timer().enable_interrupt(true).is_err() {
        writeln!(uart, "Tick timer setup failed").ok();
        halt("tick timer setup failed");
    }

    let config = match SsiConfig::new(
        Schedule::Every(Duration::from_millis(100)),
        LeadingBit::Discard,
        5_000, // 5 µm per count
        Duration::from_millis(1),
    ) {
        Ok(config) => config,
        Err(reason) => halt(reason),
    };

    #[cfg(feature = "defmt")]
    defmt::info!("Tick {} ns, SSI clock {} Hz", timer_config.period_ns(), timer_config.bit_rate_hz());

    spawner.must_spawn(acquisition_task_wrapper(&LINK, config, ReportFormat::default(), uart));

    // Main supervision loop
    loop {
        embassy_time::Timer::after(Duration::from_secs(1)).await;
        #[cfg(feature = "defmt")]
        defmt::trace!("Heartbeat, state: {:?}", LINK.state());
    }
}

/// Park the core after an unrecoverable startup error
fn halt(_reason: &str) -> ! {
    #[cfg(feature = "defmt")]
    defmt::error!("Halting: {=str}", _reason);
    loop {
        unsafe { riscv::asm::wfi(); }
    }
}

// ========================================
// Interrupt Handlers
// ========================================

/// TIM2 update: one protocol tick
#[no_mangle]
extern "C" fn TIM2_IRQHandler() {
    Tim2TickTimer::new().clear_pending();

    let mut clock = ClockPin::new();
    let mut data = DataPin::new();
    // Register-backed pins cannot fail
    let _ = LINK.on_tick(&mut clock, &mut data);
}

/// SysTick: 1ms time base for embassy-time
#[no_mangle]
extern "C" fn SysTick() {
    clear_systick_flag();
    time_driver::on_systick();
}
