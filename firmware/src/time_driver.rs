//! SysTick-backed embassy time driver for CH32V203

use core::cell::Cell;
use critical_section::Mutex;
use embassy_time_driver::{AlarmHandle, Driver};

/// Millisecond tick counter with a single alarm slot
pub struct SysTickDriver {
    state: Mutex<DriverState>,
}

struct DriverState {
    ticks: Cell<u64>,
    alarm_taken: Cell<bool>,
    alarm_at: Cell<u64>,
    callback: Cell<Option<(fn(*mut ()), *mut ())>>,
}

// Only touched inside critical sections
unsafe impl Send for DriverState {}

impl SysTickDriver {
    const fn new() -> Self {
        Self {
            state: Mutex::new(DriverState {
                ticks: Cell::new(0),
                alarm_taken: Cell::new(false),
                alarm_at: Cell::new(u64::MAX),
                callback: Cell::new(None),
            }),
        }
    }

    /// Advance time by one tick and fire the alarm if due (SysTick interrupt)
    pub fn on_systick(&self) {
        let fire = critical_section::with(|cs| {
            let state = self.state.borrow(cs);
            let now = state.ticks.get() + 1;
            state.ticks.set(now);
            if now >= state.alarm_at.get() {
                state.alarm_at.set(u64::MAX);
                state.callback.get()
            } else {
                None
            }
        });

        if let Some((callback, ctx)) = fire {
            callback(ctx);
        }
    }
}

impl Driver for SysTickDriver {
    fn now(&self) -> u64 {
        critical_section::with(|cs| self.state.borrow(cs).ticks.get())
    }

    unsafe fn allocate_alarm(&self) -> Option<AlarmHandle> {
        critical_section::with(|cs| {
            let state = self.state.borrow(cs);
            if state.alarm_taken.replace(true) {
                None
            } else {
                Some(AlarmHandle::new(0))
            }
        })
    }

    fn set_alarm_callback(&self, _alarm: AlarmHandle, callback: fn(*mut ()), ctx: *mut ()) {
        critical_section::with(|cs| self.state.borrow(cs).callback.set(Some((callback, ctx))));
    }

    fn set_alarm(&self, _alarm: AlarmHandle, timestamp: u64) -> bool {
        critical_section::with(|cs| {
            let state = self.state.borrow(cs);
            if timestamp <= state.ticks.get() {
                // Already due, caller polls immediately
                state.alarm_at.set(u64::MAX);
                false
            } else {
                state.alarm_at.set(timestamp);
                true
            }
        })
    }
}

// Export the driver
embassy_time_driver::time_driver_impl!(static DRIVER: SysTickDriver = SysTickDriver::new());

/// Forward a SysTick interrupt to the time driver
pub fn on_systick() {
    DRIVER.on_systick();
}

// Critical section implementation for single-core RISC-V
critical_section::set_impl!(RiscvCriticalSection);

struct RiscvCriticalSection;

unsafe impl critical_section::Impl for RiscvCriticalSection {
    unsafe fn acquire() -> critical_section::RawRestoreState {
        let mstatus = riscv::register::mstatus::read();
        riscv::register::mstatus::clear_mie();
        mstatus.mie() as u8
    }

    unsafe fn release(was_enabled: critical_section::RawRestoreState) {
        if was_enabled != 0 {
            riscv::register::mstatus::set_mie();
        }
    }
}
