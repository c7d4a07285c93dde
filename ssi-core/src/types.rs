//! Core data types for the SSI reader

use crate::hal::Duration;

/// Number of data bits clocked out of the sensor per frame
pub const FRAME_BITS: u32 = 25;

/// Clock half-periods per frame (one HIGH and one LOW per bit)
pub const HALF_PERIODS: u32 = 2 * FRAME_BITS;

/// Ticks from arming until the state machine is idle again
pub const FRAME_TICKS: u32 = HALF_PERIODS + 1;

/// Mask covering every captured bit
pub const FRAME_MASK: u32 = (1 << FRAME_BITS) - 1;

/// Mask covering the captured bits below the leading one
pub const POSITION_MASK: u32 = (1 << (FRAME_BITS - 1)) - 1;

/// Shortest accepted tick period
pub const MIN_TICK_PERIOD_NS: u32 = 1_000;

/// Longest accepted tick period; slower clocks let the sensor monoflop expire mid-frame
pub const MAX_TICK_PERIOD_NS: u32 = 10_000;

/// Protocol state machine states
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AcquisitionState {
    /// Clock idles LOW, ticks are ignored
    Idle = 0,
    /// A frame is being clocked out of the sensor
    Clocking = 1,
}

impl AcquisitionState {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode a stored state; unknown values read as `Idle`
    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => AcquisitionState::Clocking,
            _ => AcquisitionState::Idle,
        }
    }

    pub const fn is_idle(self) -> bool {
        matches!(self, AcquisitionState::Idle)
    }
}

/// What the consumer does with the first bit of a frame.
///
/// The sensor shifts out [`FRAME_BITS`] bits but only the low 24 carry
/// position in the reference wiring. Whether the leading bit is a status flag
/// or position data depends on the encoder model.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LeadingBit {
    /// Mask the frame down to its low 24 bits
    Discard,
    /// Use all captured bits as position
    Keep,
}

/// A finished frame as handed from the tick handler to the foreground
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample(u32);

impl RawSample {
    pub const fn new(raw: u32) -> Self {
        Self(raw & FRAME_MASK)
    }

    /// All captured bits, MSB first as received
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// The first bit clocked out of the sensor
    pub const fn leading_bit(&self) -> bool {
        self.0 & (1 << (FRAME_BITS - 1)) != 0
    }

    /// Position counts after applying the leading-bit policy
    pub const fn counts(&self, policy: LeadingBit) -> u32 {
        match policy {
            LeadingBit::Discard => self.0 & POSITION_MASK,
            LeadingBit::Keep => self.0,
        }
    }
}

/// When the foreground may arm the next acquisition
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Schedule {
    /// After this many foreground polls since the last arm
    Polls(u32),
    /// After this much time since the last arm
    Every(Duration),
}

/// Reader configuration
#[derive(Copy, Clone, Debug)]
pub struct SsiConfig {
    /// Spacing between acquisitions
    pub schedule: Schedule,
    /// Leading bit policy applied when converting to position
    pub leading_bit: LeadingBit,
    /// Linear distance of one count in nanometres
    pub resolution_nm: u32,
    /// Delay between foreground polls
    pub poll_period: Duration,
}

impl Default for SsiConfig {
    fn default() -> Self {
        Self {
            schedule: Schedule::Polls(100_000),
            leading_bit: LeadingBit::Discard,
            resolution_nm: 5_000, // 0.005 mm
            poll_period: Duration::from_micros(10),
        }
    }
}

impl SsiConfig {
    /// Create a new configuration with validation
    pub fn new(
        schedule: Schedule,
        leading_bit: LeadingBit,
        resolution_nm: u32,
        poll_period: Duration,
    ) -> Result<Self, &'static str> {
        match schedule {
            Schedule::Polls(0) => return Err("Poll threshold must be at least 1"),
            Schedule::Every(interval) if interval.as_micros() == 0 => {
                return Err("Acquisition interval must be non-zero");
            }
            _ => {}
        }
        if resolution_nm == 0 {
            return Err("Resolution must be non-zero");
        }

        Ok(Self {
            schedule,
            leading_bit,
            resolution_nm,
            poll_period,
        })
    }
}

/// Hardware timer settings that produce the protocol tick
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickTimerConfig {
    /// Timer input clock in Hz
    pub timer_clock_hz: u32,
    /// Clock divider in front of the counter
    pub prescaler: u16,
    /// Counts per compare match
    pub reload: u16,
}

impl Default for TickTimerConfig {
    fn default() -> Self {
        Self {
            timer_clock_hz: 72_000_000,
            prescaler: 8,
            reload: 50, // 5.555 µs
        }
    }
}

impl TickTimerConfig {
    /// Create a new timer configuration with validation
    pub fn new(timer_clock_hz: u32, prescaler: u16, reload: u16) -> Result<Self, &'static str> {
        if timer_clock_hz == 0 {
            return Err("Timer clock must be non-zero");
        }
        if prescaler == 0 || reload == 0 {
            return Err("Prescaler and reload must be non-zero");
        }

        let config = Self {
            timer_clock_hz,
            prescaler,
            reload,
        };
        let period = config.period_ns();
        if period < MIN_TICK_PERIOD_NS as u64 || period > MAX_TICK_PERIOD_NS as u64 {
            return Err("Tick period must be between 1 and 10 microseconds");
        }

        Ok(config)
    }

    /// Tick period in nanoseconds, truncated
    pub fn period_ns(&self) -> u64 {
        self.prescaler as u64 * self.reload as u64 * 1_000_000_000 / self.timer_clock_hz as u64
    }

    /// Duration of one full frame from arming to completion
    pub fn frame_ns(&self) -> u64 {
        self.period_ns() * FRAME_TICKS as u64
    }

    /// SSI clock frequency produced on the clock line
    pub fn bit_rate_hz(&self) -> u32 {
        (self.timer_clock_hz as u64 / (2 * self.prescaler as u64 * self.reload as u64)) as u32
    }
}
