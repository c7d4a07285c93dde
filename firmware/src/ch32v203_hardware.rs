//! CH32V203 Hardware Implementation
//!
//! Register-level clock/data pins, TIM2 tick timer, USART1 transmitter and
//! SysTick. Assumes the startup code has set HCLK, PCLK1 and PCLK2 to 72 MHz.

use core::fmt;
use ssi_core::{ClockOutput, DataInput, HalError, SsiHal, TickTimer, TickTimerConfig};

/// Core and peripheral bus clock
pub const HCLK_HZ: u32 = 72_000_000;

/// Memory map
const RCC_BASE: u32 = 0x4002_1000;
const GPIOA_BASE: u32 = 0x4001_0800;
const GPIOB_BASE: u32 = 0x4001_0C00;
const TIM2_BASE: u32 = 0x4000_0000;
const USART1_BASE: u32 = 0x4001_3800;
const PFIC_BASE: u32 = 0xE000_E000;
const SYSTICK_BASE: u32 = 0xE000_F000;

/// RCC register offsets
const RCC_APB2PCENR: u32 = 0x18;
const RCC_APB1PCENR: u32 = 0x1C;

/// GPIO register offsets
const GPIO_CFGLR: u32 = 0x00;
const GPIO_CFGHR: u32 = 0x04;
const GPIO_INDR: u32 = 0x08;
const GPIO_OUTDR: u32 = 0x0C;
const GPIO_BSHR: u32 = 0x10;

/// General purpose timer register offsets
const TIM_CTLR1: u32 = 0x00;
const TIM_DMAINTENR: u32 = 0x0C;
const TIM_INTFR: u32 = 0x10;
const TIM_SWEVGR: u32 = 0x14;
const TIM_CNT: u32 = 0x24;
const TIM_PSC: u32 = 0x28;
const TIM_ATRLR: u32 = 0x2C;

/// USART register offsets
const USART_STATR: u32 = 0x00;
const USART_DATAR: u32 = 0x04;
const USART_BRR: u32 = 0x08;
const USART_CTLR1: u32 = 0x0C;

/// PFIC interrupt enable/disable registers (IRQ 32..63)
const PFIC_IENR2: u32 = 0x104;
const PFIC_IRER2: u32 = 0x184;
const PFIC_IENR1: u32 = 0x100;

/// SysTick register offsets (QingKe V4)
const SYSTICK_CTLR: u32 = 0x00;
const SYSTICK_SR: u32 = 0x04;
const SYSTICK_CNT: u32 = 0x08;
const SYSTICK_CMP: u32 = 0x10;

/// Interrupt numbers
const SYSTICK_IRQ: u32 = 12;
const TIM2_IRQ: u32 = 44;

#[inline(always)]
fn read_reg(addr: u32) -> u32 {
    // SAFETY: only called with the fixed peripheral addresses above
    unsafe { core::ptr::read_volatile(addr as *const u32) }
}

#[inline(always)]
fn write_reg(addr: u32, value: u32) {
    // SAFETY: only called with the fixed peripheral addresses above
    unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
}

#[inline(always)]
fn modify_reg(addr: u32, f: impl FnOnce(u32) -> u32) {
    write_reg(addr, f(read_reg(addr)));
}

/// Pin assignments
pub mod pins {
    /// SSI clock output (PB0)
    pub const CLOCK_PIN: u8 = 0;

    /// SSI data input (PB1)
    pub const DATA_PIN: u8 = 1;

    /// USART1 TX (PA9)
    pub const UART_TX_PIN: u8 = 9;

    /// Report link baud rate
    pub const BAUD: u32 = 9600;
}

/// SSI clock line on PB0, push-pull output
#[derive(Clone, Copy)]
pub struct ClockPin;

impl ClockPin {
    /// Handle to the pin; register access is stateless so any context may hold one
    pub const fn new() -> Self {
        Self
    }

    fn init(&self) {
        // CNF=00 (push-pull), MODE=11 (50MHz output)
        modify_reg(GPIOB_BASE + GPIO_CFGLR, |cfg| {
            (cfg & !(0xF << (pins::CLOCK_PIN * 4))) | (0x3 << (pins::CLOCK_PIN * 4))
        });
    }
}

impl ClockOutput for ClockPin {
    fn set_level(&mut self, high: bool) -> Result<(), HalError> {
        // BSHR: low half sets, high half resets
        let bit = if high { pins::CLOCK_PIN } else { pins::CLOCK_PIN + 16 };
        write_reg(GPIOB_BASE + GPIO_BSHR, 1 << bit);
        Ok(())
    }
}

/// SSI data line on PB1, input with pull-up
#[derive(Clone, Copy)]
pub struct DataPin;

impl DataPin {
    pub const fn new() -> Self {
        Self
    }

    fn init(&self) {
        // CNF=10 (pull-up/down input), MODE=00
        modify_reg(GPIOB_BASE + GPIO_CFGLR, |cfg| {
            (cfg & !(0xF << (pins::DATA_PIN * 4))) | (0x8 << (pins::DATA_PIN * 4))
        });
        // OUTDR bit selects pull-up
        modify_reg(GPIOB_BASE + GPIO_OUTDR, |odr| odr | (1 << pins::DATA_PIN));
    }
}

impl DataInput for DataPin {
    fn is_high(&mut self) -> Result<bool, HalError> {
        Ok(read_reg(GPIOB_BASE + GPIO_INDR) & (1 << pins::DATA_PIN) != 0)
    }
}

/// TIM2 in up-counting mode; the update event is the protocol tick
#[derive(Clone, Copy)]
pub struct Tim2TickTimer;

impl Tim2TickTimer {
    pub const fn new() -> Self {
        Self
    }
}

impl TickTimer for Tim2TickTimer {
    fn start(&mut self, config: &TickTimerConfig) -> Result<(), HalError> {
        if config.timer_clock_hz != HCLK_HZ {
            return Err(HalError::InvalidConfig);
        }

        write_reg(TIM2_BASE + TIM_CTLR1, 0);
        write_reg(TIM2_BASE + TIM_PSC, config.prescaler as u32 - 1);
        write_reg(TIM2_BASE + TIM_ATRLR, config.reload as u32 - 1);
        write_reg(TIM2_BASE + TIM_CNT, 0);
        // Load PSC/ATRLR now, then drop the update flag it raised
        write_reg(TIM2_BASE + TIM_SWEVGR, 1);
        write_reg(TIM2_BASE + TIM_INTFR, 0);
        // ARPE=1, CEN=1
        write_reg(TIM2_BASE + TIM_CTLR1, (1 << 7) | 1);

        #[cfg(feature = "defmt")]
        defmt::info!("TIM2 tick: {} ns", config.period_ns());
        Ok(())
    }

    fn enable_interrupt(&mut self, enable: bool) -> Result<(), HalError> {
        if read_reg(TIM2_BASE + TIM_CTLR1) & 1 == 0 && enable {
            return Err(HalError::NotInitialized);
        }
        if enable {
            modify_reg(TIM2_BASE + TIM_DMAINTENR, |r| r | 1); // UIE
            write_reg(PFIC_BASE + PFIC_IENR2, 1 << (TIM2_IRQ - 32));
        } else {
            write_reg(PFIC_BASE + PFIC_IRER2, 1 << (TIM2_IRQ - 32));
            modify_reg(TIM2_BASE + TIM_DMAINTENR, |r| r & !1);
        }
        Ok(())
    }

    fn clear_pending(&mut self) {
        write_reg(TIM2_BASE + TIM_INTFR, 0);
    }
}

/// Blocking USART1 transmitter, 8 data bits, no parity, 1 stop bit
pub struct Usart1Tx {
    _private: (),
}

impl Usart1Tx {
    /// Configure PA9 and USART1 for transmit only
    pub fn new(baud: u32) -> Result<Self, HalError> {
        if baud == 0 {
            return Err(HalError::InvalidConfig);
        }

        // PA9: CNF=10 (AF push-pull), MODE=11
        let shift = (pins::UART_TX_PIN - 8) * 4;
        modify_reg(GPIOA_BASE + GPIO_CFGHR, |cfg| (cfg & !(0xF << shift)) | (0xB << shift));

        write_reg(USART1_BASE + USART_BRR, HCLK_HZ / baud);
        // UE=1, TE=1; M=0 and PCE=0 give 8N1
        write_reg(USART1_BASE + USART_CTLR1, (1 << 13) | (1 << 3));

        Ok(Self { _private: () })
    }

    /// Send one byte, waiting for the data register to empty
    pub fn write_byte(&mut self, byte: u8) {
        while read_reg(USART1_BASE + USART_STATR) & (1 << 7) == 0 {}
        write_reg(USART1_BASE + USART_DATAR, byte as u32);
    }
}

impl fmt::Write for Usart1Tx {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
        Ok(())
    }
}

/// CH32V203 reader hardware
pub struct Ch32v203SsiHal {
    clock: ClockPin,
    data: DataPin,
    timer: Tim2TickTimer,
}

impl Ch32v203SsiHal {
    pub const fn new() -> Self {
        Self {
            clock: ClockPin::new(),
            data: DataPin::new(),
            timer: Tim2TickTimer::new(),
        }
    }
}

impl Default for Ch32v203SsiHal {
    fn default() -> Self {
        Self::new()
    }
}

impl SsiHal for Ch32v203SsiHal {
    type Clock = ClockPin;
    type Data = DataPin;
    type Timer = Tim2TickTimer;

    fn initialize(&mut self) -> Result<(), HalError> {
        enable_peripheral_clocks();
        self.clock.set_low()?;
        self.clock.init();
        self.data.init();

        #[cfg(feature = "defmt")]
        defmt::info!("CH32V203 SSI pins initialized");
        Ok(())
    }

    fn clock_line(&mut self) -> &mut Self::Clock {
        &mut self.clock
    }

    fn data_line(&mut self) -> &mut Self::Data {
        &mut self.data
    }

    fn tick_timer(&mut self) -> &mut Self::Timer {
        &mut self.timer
    }
}

/// Enable GPIOA, GPIOB, AFIO, USART1 and TIM2 clocks
fn enable_peripheral_clocks() {
    // Bit 0 = AFIO, Bit 2 = GPIOA, Bit 3 = GPIOB, Bit 14 = USART1
    modify_reg(RCC_BASE + RCC_APB2PCENR, |r| r | (1 << 0) | (1 << 2) | (1 << 3) | (1 << 14));
    // Bit 0 = TIM2
    modify_reg(RCC_BASE + RCC_APB1PCENR, |r| r | 1);
}

/// Configure SysTick for 1ms interrupts
pub fn configure_systick() {
    write_reg(SYSTICK_BASE + SYSTICK_CTLR, 0);
    write_reg(SYSTICK_BASE + SYSTICK_SR, 0);
    write_reg(SYSTICK_BASE + SYSTICK_CNT, 0);
    write_reg(SYSTICK_BASE + SYSTICK_CMP, HCLK_HZ / 1_000 - 1);
    // STE, STIE, STCLK=HCLK, STRE (reload on compare)
    write_reg(SYSTICK_BASE + SYSTICK_CTLR, 0xF);
    write_reg(PFIC_BASE + PFIC_IENR1, 1 << SYSTICK_IRQ);
}

/// Acknowledge the SysTick compare flag
pub fn clear_systick_flag() {
    write_reg(SYSTICK_BASE + SYSTICK_SR, 0);
}
