// Host-side simulation of the SSI reader: encoder model, tick loop and report output

use std::cell::RefCell;

use ssi_core::test_utils::{EncoderModel, SensorClock, SensorData};
use ssi_core::*;

fn main() {
    println!("🧪 SSI Reader Host Simulation");

    // Test 1: Timer settings
    show_timing();

    // Test 2: A few acquisitions end to end
    run_acquisitions();

    println!("✅ Simulation finished");
    println!();
    println!("📝 Run the full test suite with: cargo test");
}

fn show_timing() {
    println!("⏱️  Tick timer...");

    let timer = TickTimerConfig::default();
    println!("  Tick period: {} ns", timer.period_ns());
    println!("  SSI clock:   {} Hz", timer.bit_rate_hz());
    println!("  Frame time:  {} ns ({} ticks)", timer.frame_ns(), FRAME_TICKS);
}

fn run_acquisitions() {
    println!("🔧 Acquisitions...");

    let config = SsiConfig {
        schedule: Schedule::Polls(10),
        ..default_config()
    };
    let format = ReportFormat::default();
    let link = SsiLink::new();
    let encoder = RefCell::new(EncoderModel::new());
    let mut clock = SensorClock { encoder: &encoder };
    let mut data = SensorData { encoder: &encoder };
    let mut scheduler = AcquisitionScheduler::new(config.schedule);

    let mut out = String::new();
    if write_banner(&mut out).is_err() {
        return;
    }

    let positions = [(1 << 24) | 2_469, (1 << 24) | 200_000, 0x155_5555, 0x1FF_FFFF];
    let mut next = positions.iter();
    let mut reports = 0;

    while reports < positions.len() {
        if let Some(sample) = link.try_take_completed() {
            let position = Position::from_sample(sample, &config);
            if format.write_report(&mut out, position).is_err() {
                return;
            }
            reports += 1;
        }
        if next.len() > 0 && scheduler.poll(&link) {
            if let Some(&position) = next.next() {
                encoder.borrow_mut().latch(position);
            }
        }
        if let Err(e) = link.on_tick(&mut clock, &mut data) {
            println!("  ❌ Tick failed: {}", e);
            return;
        }
    }

    for line in out.lines() {
        println!("  {}", line);
    }
    println!("  ✅ {} frames reported", reports);
}
