//! Clock generation, sampling and frame assembly tests

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use embedded_hal_mock::eh1::pin::{Mock as PinMock, State, Transaction as PinTransaction};
    use proptest::prelude::*;
    use rstest::rstest;
    use ssi_core::hal::mock::{MockClockLine, MockDataLine};
    use ssi_core::test_utils::*;
    use ssi_core::*;

    const ALTERNATING: u32 = 0x155_5555;

    fn frame_transactions(pattern: u32) -> (Vec<PinTransaction>, Vec<PinTransaction>) {
        let mut clock = vec![PinTransaction::set(State::Low)];
        let mut data = Vec::new();
        for bit in pattern_bits(pattern) {
            clock.push(PinTransaction::set(State::High));
            clock.push(PinTransaction::set(State::Low));
            data.push(PinTransaction::get(if bit { State::High } else { State::Low }));
        }
        (clock, data)
    }

    fn report_line(sample: RawSample, leading_bit: LeadingBit) -> String {
        let config = SsiConfig::new(Schedule::Polls(1), leading_bit, 5_000, Duration::from_micros(10))
            .unwrap();
        let mut line = String::new();
        ReportFormat::default()
            .write_report(&mut line, Position::from_sample(sample, &config))
            .unwrap();
        line
    }

    #[test]
    fn test_pin_sequence_for_one_frame() {
        let pattern = 0x1A5_0C3F & FRAME_MASK;
        let (clock_expect, data_expect) = frame_transactions(pattern);

        let mut clock = EmbeddedHalClock::new(PinMock::new(&clock_expect), false);
        let mut data = EmbeddedHalData::new(PinMock::new(&data_expect), false);
        let link = SsiLink::new();

        let run = acquire(&link, &mut clock, &mut data);
        assert_eq!(run.sample, Some(RawSample::new(pattern)));
        assert_eq!(run.ticks, FRAME_TICKS);
        assert!(run.errors.is_empty());

        clock.release().done();
        data.release().done();
    }

    #[test]
    fn test_inverted_line_driver() {
        // Transceiver flips both lines: the physical levels are the complement
        let pattern = 0x0F0_F0F0;
        let (_, data_expect) = frame_transactions(!pattern & FRAME_MASK);
        // Tick 0 and even ticks drive LOW, which the inverter turns HIGH
        let clock_expect: Vec<_> = (0..FRAME_TICKS)
            .map(|tick| PinTransaction::set(if tick % 2 == 0 { State::High } else { State::Low }))
            .collect();

        let mut clock = EmbeddedHalClock::new(PinMock::new(&clock_expect), true);
        let mut data = EmbeddedHalData::new(PinMock::new(&data_expect), true);
        let link = SsiLink::new();

        let run = acquire(&link, &mut clock, &mut data);
        assert_eq!(run.sample.map(|s| s.raw()), Some(pattern));

        clock.release().done();
        data.release().done();
    }

    #[test]
    fn test_clock_levels_per_tick() {
        let link = SsiLink::new();
        let mut clock = MockClockLine::new();
        let mut data = MockDataLine::with_frame(ALTERNATING);

        acquire(&link, &mut clock, &mut data);

        assert_eq!(clock.writes(), expected_clock_levels().as_slice());
        assert_eq!(clock.rising_edges(), FRAME_BITS as usize);
        assert!(!clock.is_high(), "clock must rest LOW between frames");
        assert_eq!(data.reads(), FRAME_BITS as usize);
    }

    #[test]
    fn test_idle_ticks_touch_nothing() {
        let link = SsiLink::new();
        let mut clock = MockClockLine::new();
        let mut data = MockDataLine::constant(true);

        for _ in 0..200 {
            assert_eq!(link.on_tick(&mut clock, &mut data), Ok(TickEvent::Idle));
        }
        assert!(clock.writes().is_empty());
        assert_eq!(data.reads(), 0);
        assert_eq!(link.sample_register(), 0);
        assert_eq!(link.try_take_completed(), None);
    }

    #[rstest]
    #[case::alternating(ALTERNATING)]
    #[case::all_low(0)]
    #[case::all_high(FRAME_MASK)]
    #[case::leading_bit_only(1 << 24)]
    #[case::lsb_only(1)]
    fn test_frame_capture(#[case] pattern: u32) {
        let link = SsiLink::new();
        let mut clock = MockClockLine::new();
        let mut data = MockDataLine::with_frame(pattern);

        let run = acquire(&link, &mut clock, &mut data);

        assert_eq!(run.sample, Some(RawSample::new(pattern)));
        assert!(link.is_idle());
        assert_eq!(link.tick_count(), 0);
        assert_eq!(link.try_take_completed(), Some(RawSample::new(pattern)));
    }

    #[rstest]
    #[case::alternating_discard(ALTERNATING, LeadingBit::Discard, "Position: 27962.025 mm\n")]
    #[case::alternating_keep(ALTERNATING, LeadingBit::Keep, "Position: 111848.105 mm\n")]
    #[case::all_low(0, LeadingBit::Discard, "Position: 0.000 mm\n")]
    #[case::full_scale(FRAME_MASK, LeadingBit::Discard, "Position: 83886.075 mm\n")]
    #[case::full_scale_keep(FRAME_MASK, LeadingBit::Keep, "Position: 167772.155 mm\n")]
    #[case::leading_bit_dropped((1 << 24) | 2469, LeadingBit::Discard, "Position: 12.345 mm\n")]
    #[case::single_count(1, LeadingBit::Discard, "Position: 0.005 mm\n")]
    fn test_capture_to_report(
        #[case] pattern: u32,
        #[case] leading_bit: LeadingBit,
        #[case] expected: &str,
    ) {
        let encoder = RefCell::new(EncoderModel::new());
        encoder.borrow_mut().latch(pattern);
        let link = SsiLink::new();

        let run = acquire(
            &link,
            &mut SensorClock { encoder: &encoder },
            &mut SensorData { encoder: &encoder },
        );

        let sample = run.sample.expect("frame should complete");
        assert_eq!(report_line(sample, leading_bit), expected);
    }

    #[test]
    fn test_rearm_while_clocking_is_rejected() {
        let link = SsiLink::new();
        let mut clock = MockClockLine::new();
        let mut data = MockDataLine::with_frame(ALTERNATING);

        assert!(link.arm());
        for _ in 0..7 {
            link.on_tick(&mut clock, &mut data).unwrap();
        }
        let register = link.sample_register();

        assert!(!link.arm());
        assert_eq!(link.state(), AcquisitionState::Clocking);
        assert_eq!(link.tick_count(), 7);
        assert_eq!(link.sample_register(), register);

        // The frame in progress still completes intact
        let run = tick_until_complete(&link, &mut clock, &mut data, FRAME_TICKS);
        assert_eq!(run.sample, Some(RawSample::new(ALTERNATING)));
        assert_eq!(run.ticks, FRAME_TICKS - 7);
    }

    #[test]
    fn test_undrained_sample_is_overwritten() {
        let link = SsiLink::new();
        let mut clock = MockClockLine::new();
        let mut data = MockDataLine::with_frame(0x123);

        acquire(&link, &mut clock, &mut data);
        data.load_frame(0x456);
        clock.clear();
        acquire(&link, &mut clock, &mut data);

        assert_eq!(link.try_take_completed(), Some(RawSample::new(0x456)));
        assert_eq!(link.try_take_completed(), None);
    }

    #[test]
    fn test_sample_drained_once() {
        let link = SsiLink::new();
        let mut clock = MockClockLine::new();
        let mut data = MockDataLine::with_frame(0x0AB_CDEF);

        acquire(&link, &mut clock, &mut data);
        assert!(link.has_completed());
        assert!(link.try_take_completed().is_some());
        assert!(!link.has_completed());
        assert_eq!(link.try_take_completed(), None);
    }

    #[test]
    fn test_failed_reads_keep_frame_timing() {
        let link = SsiLink::new();
        let mut clock = MockClockLine::new();
        let mut data = MockDataLine::with_frame(FRAME_MASK);
        data.set_failing(true);

        let run = acquire(&link, &mut clock, &mut data);

        assert_eq!(run.ticks, FRAME_TICKS);
        assert_eq!(run.errors.len(), FRAME_BITS as usize);
        assert!(run.errors.iter().all(|e| *e == HalError::GpioError));
        // Failed reads shift in zeros
        assert_eq!(run.sample, Some(RawSample::new(0)));
        assert!(link.is_idle());
        // Still waiting for the foreground, as on a clean frame
        assert!(link.has_completed());
        assert_eq!(link.try_take_completed(), Some(RawSample::new(0)));
    }

    #[rstest]
    #[case::clean(false)]
    #[case::failing_data(true)]
    fn test_frame_run_leaves_mailbox_full(#[case] failing: bool) {
        let link = SsiLink::new();
        let mut clock = MockClockLine::new();
        let mut data = MockDataLine::with_frame(0x0AA_AAAA);
        data.set_failing(failing);

        let run = acquire(&link, &mut clock, &mut data);

        assert_eq!(run.errors.is_empty(), !failing);
        assert_eq!(link.try_take_completed(), run.sample);
        assert_eq!(link.try_take_completed(), None);
    }

    #[test]
    fn test_back_to_back_frames_from_encoder() {
        let encoder = RefCell::new(EncoderModel::new());
        let link = SsiLink::new();
        let mut clock = SensorClock { encoder: &encoder };
        let mut data = SensorData { encoder: &encoder };

        for position in [0x100_0001, 0x0FF_FFFF, 0x155_5555, 0] {
            encoder.borrow_mut().latch(position);
            let run = acquire(&link, &mut clock, &mut data);
            assert_eq!(run.sample, Some(RawSample::new(position)));
            assert_eq!(link.try_take_completed(), Some(RawSample::new(position)));
        }
    }

    proptest! {
        #[test]
        fn prop_any_frame_is_reassembled(pattern in 0u32..(1 << FRAME_BITS)) {
            let link = SsiLink::new();
            let mut clock = MockClockLine::new();
            let mut data = MockDataLine::with_frame(pattern);

            let run = acquire(&link, &mut clock, &mut data);

            prop_assert_eq!(run.sample, Some(RawSample::new(pattern)));
            prop_assert_eq!(clock.rising_edges(), FRAME_BITS as usize);
            prop_assert_eq!(data.reads(), FRAME_BITS as usize);
        }

        #[test]
        fn prop_encoder_model_round_trip(pattern in 0u32..(1 << FRAME_BITS)) {
            let encoder = RefCell::new(EncoderModel::new());
            encoder.borrow_mut().latch(pattern);
            let link = SsiLink::new();

            let run = acquire(
                &link,
                &mut SensorClock { encoder: &encoder },
                &mut SensorData { encoder: &encoder },
            );

            let sample = run.sample.unwrap();
            prop_assert_eq!(bits_to_pattern(&pattern_bits(sample.raw())), pattern);
            prop_assert_eq!(sample.leading_bit(), pattern >> 24 == 1);
            prop_assert_eq!(sample.counts(LeadingBit::Discard), pattern & POSITION_MASK);
        }

        #[test]
        fn prop_report_is_truncated_millimetres(counts in 0u32..=POSITION_MASK, resolution_nm in 1u32..100_000) {
            let position = Position::from_sample(
                RawSample::new(counts),
                &SsiConfig::new(Schedule::Polls(1), LeadingBit::Discard, resolution_nm, Duration::from_micros(10)).unwrap(),
            );
            let nm = counts as u64 * resolution_nm as u64;
            let text = position.to_string();
            let (whole, fraction) = text.split_once('.').unwrap();

            prop_assert_eq!(whole.parse::<u64>().unwrap(), nm / 1_000_000);
            prop_assert_eq!(fraction.len(), 3);
            prop_assert_eq!(fraction.parse::<u64>().unwrap(), (nm % 1_000_000) / 1_000);
        }
    }
}
