use std::{
    sync::atomic::{
        AtomicU8,
        Ordering::{AcqRel, Acquire, Relaxed, Release},
    },
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

use crate::Value;

const PARKED: u8 = 0b01;
const TOKEN: u8 = 0b10;

/// Single-token parker. An `unpark` that arrives before `park` is kept
/// and consumed by the next `park`.
#[derive(Debug, Default)]
pub struct NativeParker {
    state: AtomicU8,
    lock: Mutex<()>,
    cv: Condvar,
    // what the parked worker waits on, for diagnostics
    blocker: Mutex<Option<Value>>,
}

impl NativeParker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocker(&self) -> Option<Value> {
        self.blocker.lock().clone()
    }

    pub fn park(&self, blocker: Option<Value>) {
        self.park_until(blocker, None);
    }

    /// Park for at most `timeout`. Returns `true` if a token was consumed.
    pub fn park_timeout(&self, blocker: Option<Value>, timeout: Duration) -> bool {
        self.park_until(blocker, Some(Instant::now() + timeout))
    }

    fn park_until(&self, blocker: Option<Value>, deadline: Option<Instant>) -> bool {
        *self.blocker.lock() = blocker;

        // Fast path: unpark before park => just ignore
        if self.try_consume_token() {
            *self.blocker.lock() = None;
            return true;
        }

        self.state.fetch_or(PARKED, Release);

        if self.try_consume_token() {
            self.state.fetch_and(!PARKED, AcqRel);
            *self.blocker.lock() = None;
            return true;
        }

        let mut guard = self.lock.lock();
        let woken = loop {
            if self.try_consume_token() {
                break true;
            }
            match deadline {
                Some(deadline) => {
                    if self.cv.wait_until(&mut guard, deadline).timed_out() {
                        break self.try_consume_token();
                    }
                }
                None => self.cv.wait(&mut guard),
            }
        };
        drop(guard);

        self.state.fetch_and(!PARKED, AcqRel);
        *self.blocker.lock() = None;
        woken
    }

    #[inline]
    fn try_consume_token(&self) -> bool {
        let mut s = self.state.load(Acquire);
        while s & TOKEN != 0 {
            match self
                .state
                .compare_exchange_weak(s, s & !TOKEN, AcqRel, Relaxed)
            {
                Ok(_) => return true,
                Err(cur) => s = cur,
            }
        }
        false
    }

    pub fn unpark(&self) {
        let prev = self.state.fetch_or(TOKEN, Release);

        if prev & PARKED != 0 {
            let _g = self.lock.lock();
            self.cv.notify_one();
        }
    }
}
