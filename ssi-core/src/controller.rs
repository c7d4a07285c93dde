//! Foreground acquisition scheduling

use crate::fsm::SsiLink;
use crate::hal::Instant;
use crate::types::Schedule;

/// Decides when the foreground arms the next acquisition.
///
/// Never arms while a frame is clocking; a due schedule simply waits for the
/// state machine to go idle.
#[derive(Debug)]
pub struct AcquisitionScheduler {
    schedule: Schedule,
    polls: u32,
    last_armed: Option<Instant>,
}

impl AcquisitionScheduler {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule,
            polls: 0,
            last_armed: None,
        }
    }

    /// Poll once using the current time; returns true if a frame was armed
    #[cfg(any(test, feature = "std", feature = "embassy-time"))]
    pub fn poll(&mut self, link: &SsiLink) -> bool {
        self.poll_at(link, Instant::now())
    }

    /// Poll once at a given time
    pub fn poll_at(&mut self, link: &SsiLink, now: Instant) -> bool {
        let armed = link.is_idle() && self.is_due(now) && link.arm();
        if armed {
            self.polls = 0;
            self.last_armed = Some(now);
        }
        self.polls = self.polls.saturating_add(1);
        armed
    }

    fn is_due(&self, now: Instant) -> bool {
        match self.schedule {
            Schedule::Polls(threshold) => self.polls >= threshold,
            Schedule::Every(interval) => match self.last_armed {
                Some(last) => now.saturating_duration_since(last) >= interval,
                None => true,
            },
        }
    }

    /// Polls counted since the last arm
    pub fn poll_count(&self) -> u32 {
        self.polls
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    /// Replace the schedule and restart counting
    pub fn set_schedule(&mut self, schedule: Schedule) {
        self.schedule = schedule;
        self.polls = 0;
        self.last_armed = None;
    }
}

/// Async task running the foreground side: arm, drain, report
#[cfg(feature = "embassy-time")]
pub async fn acquisition_task<W: core::fmt::Write>(
    link: &SsiLink,
    config: crate::types::SsiConfig,
    format: crate::report::ReportFormat,
    mut sink: W,
) {
    use embassy_time::Timer;

    let mut scheduler = AcquisitionScheduler::new(config.schedule);

    loop {
        scheduler.poll(link);

        if let Some(sample) = link.try_take_completed() {
            let position = crate::report::Position::from_sample(sample, &config);
            if format.write_report(&mut sink, position).is_err() {
                #[cfg(feature = "defmt")]
                defmt::warn!("Report write failed");
            }

            #[cfg(feature = "defmt")]
            defmt::debug!("Position: {} nm", position.nanometers());
        }

        Timer::after(config.poll_period).await;
    }
}
