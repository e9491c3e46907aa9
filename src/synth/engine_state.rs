use std::sync::atomic::{AtomicU8, Ordering};

use log::debug;
use parking_lot::{Mutex, MutexGuard};

/// Engine-wide lifecycle state. Only `Running` renders audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    Initializing = 0,
    LoadingSample = 1,
    ClearingSample = 2,
    Running = 3,
}

impl EngineState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => EngineState::LoadingSample,
            2 => EngineState::ClearingSample,
            3 => EngineState::Running,
            _ => EngineState::Initializing,
        }
    }
}

/// Atomic engine state plus the lock that serialises temporary switches.
/// The render thread only ever reads the atomic.
pub struct EngineStateCell {
    value: AtomicU8,
    transition: Mutex<()>,
}

impl EngineStateCell {
    pub fn new(state: EngineState) -> Self {
        Self {
            value: AtomicU8::new(state as u8),
            transition: Mutex::new(()),
        }
    }

    pub fn get(&self) -> EngineState {
        EngineState::from_u8(self.value.load(Ordering::Acquire))
    }

    pub fn set(&self, state: EngineState) {
        debug!("engine state -> {:?}", state);
        self.value.store(state as u8, Ordering::Release);
    }

    /// Switch to `state` until the guard drops, waiting for any other switch
    pub fn enter(&self, state: EngineState) -> StateGuard<'_> {
        let lock = self.transition.lock();
        self.switch(state, lock)
    }

    /// Like [`enter`](Self::enter) but gives up if another switch is active
    pub fn try_enter(&self, state: EngineState) -> Option<StateGuard<'_>> {
        let lock = self.transition.try_lock()?;
        Some(self.switch(state, lock))
    }

    fn switch<'a>(&'a self, state: EngineState, lock: MutexGuard<'a, ()>) -> StateGuard<'a> {
        let previous = self.get();
        self.set(state);
        StateGuard {
            cell: self,
            previous,
            _lock: lock,
        }
    }
}

/// Restores the state that was active before the switch
pub struct StateGuard<'a> {
    cell: &'a EngineStateCell,
    previous: EngineState,
    _lock: MutexGuard<'a, ()>,
}

impl StateGuard<'_> {
    pub fn previous(&self) -> EngineState {
        self.previous
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        self.cell.set(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_restores_previous_state() {
        let cell = EngineStateCell::new(EngineState::Running);
        {
            let guard = cell.enter(EngineState::LoadingSample);
            assert_eq!(cell.get(), EngineState::LoadingSample);
            assert_eq!(guard.previous(), EngineState::Running);
        }
        assert_eq!(cell.get(), EngineState::Running);

        cell.set(EngineState::Initializing);
        drop(cell.enter(EngineState::LoadingSample));
        assert_eq!(cell.get(), EngineState::Initializing);
    }

    #[test]
    fn try_enter_fails_while_a_switch_is_held() {
        let cell = EngineStateCell::new(EngineState::Running);
        let held = cell.enter(EngineState::LoadingSample);
        assert!(cell.try_enter(EngineState::ClearingSample).is_none());
        drop(held);
        let guard = cell.try_enter(EngineState::ClearingSample).unwrap();
        assert_eq!(cell.get(), EngineState::ClearingSample);
        drop(guard);
        assert_eq!(cell.get(), EngineState::Running);
    }
}
