//! Hardware Abstraction Layer for the SSI reader

// Re-export time types based on feature
#[cfg(feature = "embassy-time")]
pub use embassy_time::{Duration, Instant};

#[cfg(not(feature = "embassy-time"))]
pub use self::mock_time::{Duration, Instant};

#[cfg(not(feature = "embassy-time"))]
mod mock_time {
    /// Instant type for builds without embassy-time; only hosted builds can read a clock
    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
    pub struct Instant(u64);

    impl Instant {
        /// Microseconds since the first call, from the host clock
        #[cfg(any(test, feature = "std"))]
        pub fn now() -> Self {
            use std::sync::OnceLock;

            static EPOCH: OnceLock<std::time::Instant> = OnceLock::new();
            let epoch = EPOCH.get_or_init(std::time::Instant::now);
            Self(epoch.elapsed().as_micros() as u64)
        }

        pub const fn from_micros(us: u64) -> Self {
            Self(us)
        }

        pub const fn from_millis(ms: u64) -> Self {
            Self(ms * 1_000)
        }

        pub fn saturating_duration_since(&self, earlier: Instant) -> Duration {
            Duration::from_micros(self.0.saturating_sub(earlier.0))
        }

        pub const fn as_micros(&self) -> u64 {
            self.0
        }

        pub const fn as_millis(&self) -> u64 {
            self.0 / 1_000
        }
    }

    impl core::ops::Add<Duration> for Instant {
        type Output = Instant;

        fn add(self, rhs: Duration) -> Instant {
            Instant(self.0 + rhs.as_micros())
        }
    }

    /// Mock duration type, microsecond resolution
    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
    pub struct Duration(u64);

    impl Duration {
        pub const fn from_micros(us: u64) -> Self {
            Self(us)
        }

        pub const fn from_millis(ms: u64) -> Self {
            Self(ms * 1_000)
        }

        pub const fn as_micros(&self) -> u64 {
            self.0
        }

        pub const fn as_millis(&self) -> u64 {
            self.0 / 1_000
        }
    }

    impl core::ops::Mul<u32> for Duration {
        type Output = Duration;

        fn mul(self, rhs: u32) -> Duration {
            Duration(self.0 * rhs as u64)
        }
    }
}

use embedded_hal::digital::{InputPin, OutputPin};

/// Error types for HAL operations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// GPIO operation failed
    GpioError,
    /// Hardware not initialized
    NotInitialized,
    /// Invalid configuration
    InvalidConfig,
}

#[cfg(feature = "std")]
impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HalError::GpioError => write!(f, "GPIO operation failed"),
            HalError::NotInitialized => write!(f, "Hardware not initialized"),
            HalError::InvalidConfig => write!(f, "Invalid configuration"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

/// SSI clock line, driven by the reader
pub trait ClockOutput {
    /// Drive the line (true = HIGH)
    fn set_level(&mut self, high: bool) -> Result<(), HalError>;

    fn set_high(&mut self) -> Result<(), HalError> {
        self.set_level(true)
    }

    fn set_low(&mut self) -> Result<(), HalError> {
        self.set_level(false)
    }
}

/// SSI data line, driven by the sensor
pub trait DataInput {
    /// Sample the line (true = HIGH)
    fn is_high(&mut self) -> Result<bool, HalError>;
}

/// Tick timer control
pub trait TickTimer {
    /// Program the period and start counting
    fn start(&mut self, config: &crate::types::TickTimerConfig) -> Result<(), HalError>;

    /// Enable or disable the compare-match interrupt
    fn enable_interrupt(&mut self, enable: bool) -> Result<(), HalError>;

    /// Acknowledge a pending compare match (called from the interrupt handler)
    fn clear_pending(&mut self);
}

/// Complete reader HAL interface
pub trait SsiHal {
    type Clock: ClockOutput;
    type Data: DataInput;
    type Timer: TickTimer;

    /// Configure pins: clock as output driven LOW, data as input
    fn initialize(&mut self) -> Result<(), HalError>;

    fn clock_line(&mut self) -> &mut Self::Clock;

    fn data_line(&mut self) -> &mut Self::Data;

    fn tick_timer(&mut self) -> &mut Self::Timer;
}

/// Clock line over an embedded-hal output pin
pub struct EmbeddedHalClock<P> {
    pin: P,
    inverted: bool,
}

impl<P> EmbeddedHalClock<P>
where
    P: OutputPin,
{
    /// `inverted` for line drivers that flip the level (e.g. RS-422 transceivers)
    pub fn new(pin: P, inverted: bool) -> Self {
        Self { pin, inverted }
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P> ClockOutput for EmbeddedHalClock<P>
where
    P: OutputPin,
{
    fn set_level(&mut self, high: bool) -> Result<(), HalError> {
        let output_state = if self.inverted { !high } else { high };
        if output_state {
            self.pin.set_high().map_err(|_| HalError::GpioError)
        } else {
            self.pin.set_low().map_err(|_| HalError::GpioError)
        }
    }
}

/// Data line over an embedded-hal input pin
pub struct EmbeddedHalData<P> {
    pin: P,
    inverted: bool,
}

impl<P> EmbeddedHalData<P>
where
    P: InputPin,
{
    pub fn new(pin: P, inverted: bool) -> Self {
        Self { pin, inverted }
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P> DataInput for EmbeddedHalData<P>
where
    P: InputPin,
{
    fn is_high(&mut self) -> Result<bool, HalError> {
        let level = self.pin.is_high().map_err(|_| HalError::GpioError)?;
        Ok(level != self.inverted)
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Mock implementations for testing

    use super::*;
    use crate::types::FRAME_BITS;
    use heapless::Vec;

    /// Enough room for a few frames of edges
    pub const EDGE_HISTORY: usize = 256;

    /// Clock line that records every level written to it
    #[derive(Default)]
    pub struct MockClockLine {
        level: bool,
        writes: Vec<bool, EDGE_HISTORY>,
        fail: bool,
    }

    impl MockClockLine {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn is_high(&self) -> bool {
            self.level
        }

        /// Every level written so far, oldest first
        pub fn writes(&self) -> &[bool] {
            &self.writes
        }

        /// Number of LOW to HIGH transitions seen
        pub fn rising_edges(&self) -> usize {
            let mut previous = false;
            let mut edges = 0;
            for &level in self.writes.iter() {
                if level && !previous {
                    edges += 1;
                }
                previous = level;
            }
            edges
        }

        pub fn clear(&mut self) {
            self.writes.clear();
        }

        /// Make subsequent writes fail
        pub fn set_failing(&mut self, fail: bool) {
            self.fail = fail;
        }
    }

    impl ClockOutput for MockClockLine {
        fn set_level(&mut self, high: bool) -> Result<(), HalError> {
            if self.fail {
                return Err(HalError::GpioError);
            }
            self.level = high;
            // Oldest entries are kept; a full history just stops recording
            self.writes.push(high).ok();
            Ok(())
        }
    }

    /// Data line that replays a frame MSB first, one bit per read
    #[derive(Default)]
    pub struct MockDataLine {
        pattern: u32,
        remaining: u32,
        idle_level: bool,
        reads: usize,
        fail: bool,
    }

    impl MockDataLine {
        pub fn new() -> Self {
            Self::default()
        }

        /// Line held at a constant level
        pub fn constant(level: bool) -> Self {
            Self {
                idle_level: level,
                ..Self::default()
            }
        }

        /// Line that shifts out a full frame
        pub fn with_frame(pattern: u32) -> Self {
            let mut line = Self::constant(true);
            line.load_frame(pattern);
            line
        }

        /// Queue the next frame; after it is exhausted the line returns to idle
        pub fn load_frame(&mut self, pattern: u32) {
            self.pattern = pattern;
            self.remaining = FRAME_BITS;
        }

        pub fn set_idle_level(&mut self, level: bool) {
            self.idle_level = level;
        }

        /// Number of samples taken so far
        pub fn reads(&self) -> usize {
            self.reads
        }

        pub fn set_failing(&mut self, fail: bool) {
            self.fail = fail;
        }
    }

    impl DataInput for MockDataLine {
        fn is_high(&mut self) -> Result<bool, HalError> {
            if self.fail {
                return Err(HalError::GpioError);
            }
            self.reads += 1;
            if self.remaining == 0 {
                return Ok(self.idle_level);
            }
            self.remaining -= 1;
            Ok(self.pattern & (1 << self.remaining) != 0)
        }
    }

    /// Timer that only records what it was asked to do
    #[derive(Default)]
    pub struct MockTickTimer {
        pub running: bool,
        pub interrupt_enabled: bool,
        pub period_ns: u64,
        pub acknowledged: usize,
    }

    impl MockTickTimer {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl TickTimer for MockTickTimer {
        fn start(&mut self, config: &crate::types::TickTimerConfig) -> Result<(), HalError> {
            self.period_ns = config.period_ns();
            self.running = true;
            Ok(())
        }

        fn enable_interrupt(&mut self, enable: bool) -> Result<(), HalError> {
            if !self.running && enable {
                return Err(HalError::NotInitialized);
            }
            self.interrupt_enabled = enable;
            Ok(())
        }

        fn clear_pending(&mut self) {
            self.acknowledged += 1;
        }
    }

    /// Mock hardware collection
    #[derive(Default)]
    pub struct MockSsiHal {
        pub clock: MockClockLine,
        pub data: MockDataLine,
        pub timer: MockTickTimer,
        pub initialized: bool,
    }

    impl MockSsiHal {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl SsiHal for MockSsiHal {
        type Clock = MockClockLine;
        type Data = MockDataLine;
        type Timer = MockTickTimer;

        fn initialize(&mut self) -> Result<(), HalError> {
            self.clock.set_low()?;
            self.initialized = true;
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
}
