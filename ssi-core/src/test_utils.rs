//! Test utilities for driving the SSI state machine on the host

use std::vec::Vec;

use crate::fsm::{SsiLink, TickEvent};
use crate::hal::{ClockOutput, DataInput, HalError};
use crate::types::{RawSample, FRAME_BITS, FRAME_TICKS, HALF_PERIODS};

/// What happened while ticking one acquisition through
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRun {
    /// Frame published on the last tick, if the run completed
    pub sample: Option<RawSample>,
    /// Ticks delivered, including the completing one
    pub ticks: u32,
    /// Pin errors reported along the way
    pub errors: Vec<HalError>,
}

/// Tick `link` until it publishes a frame, giving up after `max_ticks`.
///
/// The published frame is left in the mailbox whether or not a pin failed.
pub fn tick_until_complete<C, D>(link: &SsiLink, clock: &mut C, data: &mut D, max_ticks: u32) -> FrameRun
where
    C: ClockOutput,
    D: DataInput,
{
    let mut run = FrameRun {
        sample: None,
        ticks: 0,
        errors: Vec::new(),
    };

    while run.ticks < max_ticks {
        run.ticks += 1;
        match link.on_tick(clock, data) {
            Ok(TickEvent::Completed(sample)) => {
                run.sample = Some(sample);
                break;
            }
            Ok(TickEvent::Idle) => break,
            Ok(TickEvent::Clocked) => {}
            Err(e) => {
                run.errors.push(e);
                // Completed despite the error; the register holds the frame
                // until the next arm, and the mailbox is left for the caller
                if link.is_idle() {
                    run.sample = Some(RawSample::new(link.sample_register()));
                    break;
                }
            }
        }
    }
    run
}

/// Arm and run one full acquisition
pub fn acquire<C, D>(link: &SsiLink, clock: &mut C, data: &mut D) -> FrameRun
where
    C: ClockOutput,
    D: DataInput,
{
    link.arm();
    tick_until_complete(link, clock, data, FRAME_TICKS)
}

/// Clock level the state machine must leave after each tick of a frame
pub fn expected_clock_levels() -> Vec<bool> {
    (0..=HALF_PERIODS).map(|tick| tick % 2 == 1).collect()
}

/// Frame bits MSB first
pub fn pattern_bits(pattern: u32) -> Vec<bool> {
    (0..FRAME_BITS).rev().map(|bit| pattern & (1 << bit) != 0).collect()
}

/// Rebuild a frame from bits given MSB first
pub fn bits_to_pattern(bits: &[bool]) -> u32 {
    bits.iter().fold(0, |acc, &bit| (acc << 1) | bit as u32)
}

/// A data line model of a real encoder.
///
/// Unlike [`crate::hal::mock::MockDataLine`], which hands out one bit per
/// read, this model latches the position and shifts a new bit onto the line
/// on each rising clock edge, as an SSI sensor does. Wire it with
/// [`SensorClock`] so it sees the clock edges.
#[derive(Debug, Default)]
pub struct EncoderModel {
    shift: u32,
    remaining: u32,
    output: bool,
    clock: bool,
}

impl EncoderModel {
    /// Idle encoder, output high
    pub fn new() -> Self {
        Self {
            output: true,
            ..Self::default()
        }
    }

    /// Latch a position to shift out on the next frame
    pub fn latch(&mut self, position: u32) {
        self.shift = position;
        self.remaining = FRAME_BITS;
    }

    fn clock_edge(&mut self, high: bool) {
        if high && !self.clock {
            if self.remaining > 0 {
                self.remaining -= 1;
                self.output = self.shift & (1 << self.remaining) != 0;
            } else {
                self.output = true;
            }
        }
        self.clock = high;
    }

    pub fn output(&self) -> bool {
        self.output
    }
}

/// Clock output feeding an [`EncoderModel`]
pub struct SensorClock<'a> {
    pub encoder: &'a core::cell::RefCell<EncoderModel>,
}

impl ClockOutput for SensorClock<'_> {
    fn set_level(&mut self, high: bool) -> Result<(), HalError> {
        self.encoder.borrow_mut().clock_edge(high);
        Ok(())
    }
}

/// Data input reading an [`EncoderModel`]
pub struct SensorData<'a> {
    pub encoder: &'a core::cell::RefCell<EncoderModel>,
}

impl DataInput for SensorData<'_> {
    fn is_high(&mut self) -> Result<bool, HalError> {
        Ok(self.encoder.borrow().output())
    }
}
