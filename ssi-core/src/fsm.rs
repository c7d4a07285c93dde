//! Tick-driven SSI protocol state machine

use portable_atomic::{AtomicU32, AtomicU8, Ordering};
use crate::hal::{ClockOutput, DataInput, HalError};
use crate::handoff::Mailbox;
use crate::types::{AcquisitionState, RawSample, HALF_PERIODS};

/// Outcome of a single timer tick
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickEvent {
    /// No acquisition armed, nothing touched
    Idle,
    /// A half-period was produced, frame still running
    Clocked,
    /// The last bit was sampled and the frame published
    Completed(RawSample),
}

/// State shared between the tick interrupt and the foreground.
///
/// The interrupt side owns bit accumulation and the `Clocking -> Idle`
/// transition through [`SsiLink::on_tick`]. The foreground may only request
/// `Idle -> Clocking` through [`SsiLink::arm`] and collect finished frames with
/// [`SsiLink::try_take_completed`]. Everything is atomic so a `static` instance
/// can be touched from both contexts without locks.
pub struct SsiLink {
    state: AtomicU8,
    tick: AtomicU32,
    register: AtomicU32,
    mailbox: Mailbox,
}

impl SsiLink {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(AcquisitionState::Idle as u8),
            tick: AtomicU32::new(0),
            register: AtomicU32::new(0),
            mailbox: Mailbox::new(),
        }
    }

    /// Startup: drive the clock LOW and force `Idle`.
    ///
    /// Must run before the tick interrupt is enabled.
    pub fn init<C: ClockOutput>(&self, clock: &mut C) -> Result<(), HalError> {
        self.state.store(AcquisitionState::Idle.as_u8(), Ordering::Relaxed);
        self.tick.store(0, Ordering::Relaxed);
        self.register.store(0, Ordering::Relaxed);
        clock.set_low()
    }

    /// Current acquisition state
    pub fn state(&self) -> AcquisitionState {
        AcquisitionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_idle(&self) -> bool {
        self.state().is_idle()
    }

    /// Ticks elapsed in the running frame
    pub fn tick_count(&self) -> u32 {
        self.tick.load(Ordering::Relaxed)
    }

    /// Bits accumulated so far in the running frame
    pub fn sample_register(&self) -> u32 {
        self.register.load(Ordering::Relaxed)
    }

    /// Start a new acquisition.
    ///
    /// Returns `false` and changes nothing while a frame is still clocking.
    pub fn arm(&self) -> bool {
        if !self.is_idle() {
            return false;
        }
        // The interrupt ignores these while idle; the release store below
        // publishes them before the first tick can see `Clocking`.
        self.register.store(0, Ordering::Relaxed);
        self.tick.store(0, Ordering::Relaxed);
        self.state.store(AcquisitionState::Clocking.as_u8(), Ordering::Release);

        #[cfg(feature = "defmt")]
        defmt::debug!("SSI acquisition armed");
        true
    }

    /// Advance the protocol by one tick (interrupt context).
    ///
    /// Tick 0 pulls the clock LOW, odd ticks raise it, even ticks lower it
    /// and shift in the data line. A pin error is returned after the tick has
    /// advanced, so a frame always completes after the same number of ticks;
    /// a failed data read shifts in a 0.
    pub fn on_tick<C, D>(&self, clock: &mut C, data: &mut D) -> Result<TickEvent, HalError>
    where
        C: ClockOutput,
        D: DataInput,
    {
        if self.is_idle() {
            return Ok(TickEvent::Idle);
        }

        let tick = self.tick.load(Ordering::Relaxed);
        let mut result = Ok(());

        if tick == 0 {
            result = clock.set_low();
        } else if tick <= HALF_PERIODS {
            if tick % 2 == 1 {
                result = clock.set_high();
            } else {
                // Falling edge: sensor output is stable here
                result = clock.set_low();
                let bit = match data.is_high() {
                    Ok(level) => level,
                    Err(e) => {
                        result = result.and(Err(e));
                        false
                    }
                };
                let register = self.register.load(Ordering::Relaxed);
                self.register.store((register << 1) | bit as u32, Ordering::Relaxed);
            }
        }

        let tick = tick + 1;
        let event = if tick > HALF_PERIODS {
            let sample = RawSample::new(self.register.load(Ordering::Relaxed));
            self.tick.store(0, Ordering::Relaxed);
            self.mailbox.publish(sample);
            self.state.store(AcquisitionState::Idle.as_u8(), Ordering::Release);

            #[cfg(feature = "defmt")]
            defmt::trace!("SSI frame complete: {=u32:#x}", sample.raw());
            TickEvent::Completed(sample)
        } else {
            self.tick.store(tick, Ordering::Relaxed);
            TickEvent::Clocked
        };

        result.map(|_| event)
    }

    /// Collect the last finished frame, at most once per completion
    pub fn try_take_completed(&self) -> Option<RawSample> {
        self.mailbox.try_take()
    }

    /// True while a finished frame is waiting to be taken
    pub fn has_completed(&self) -> bool {
        self.mailbox.is_ready()
    }
}

impl Default for SsiLink {
    fn default() -> Self {
        Self::new()
    }
}
