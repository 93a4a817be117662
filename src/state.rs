use std::sync::{Mutex, MutexGuard, PoisonError};

/// Point-in-time copy of the three canvas slots.
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasSlots<C> {
    pub base: C,
    pub intermediate: Option<C>,
    pub result: Option<C>,
}

/// Canvas slots shared between the orchestrator and its workers.
///
/// Two locks live here and they have different jobs:
///
/// - `slots` guards each individual read or write, so a slot value is never observed half
///   written. It is held only for the duration of one accessor call.
/// - `run_lock` is the identity locked workers serialize on for their whole run. It belongs to
///   the container and is never replaced, unlike the canvases stored in the slots.
///
/// Unlocked workers only go through `slots`, so their read-modify-write sequences interleave
/// with everyone else's.
pub struct SharedCanvasState<C> {
    run_lock: Mutex<()>,
    slots: Mutex<CanvasSlots<C>>,
}

/// Exclusive hold on a [`SharedCanvasState`] run lock. Released on drop.
#[must_use = "the run lock is released as soon as the guard is dropped"]
pub struct ExclusiveRun<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl<C: Clone> SharedCanvasState<C> {
    pub fn new(base: C) -> Self {
        Self {
            run_lock: Mutex::new(()),
            slots: Mutex::new(CanvasSlots {
                base,
                intermediate: None,
                result: None,
            }),
        }
    }

    /// Block until no other exclusive run is active, then hold the run lock.
    ///
    /// A poisoned run lock (a previous holder panicked) is recovered: the guarded value is `()`,
    /// so there is no partially updated data behind it.
    pub fn exclusive(&self) -> ExclusiveRun<'_> {
        let guard = self
            .run_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        ExclusiveRun { _guard: guard }
    }

    pub fn base(&self) -> C {
        self.lock_slots().base.clone()
    }

    pub fn set_base(&self, canvas: C) {
        self.lock_slots().base = canvas;
    }

    pub fn intermediate(&self) -> Option<C> {
        self.lock_slots().intermediate.clone()
    }

    /// Fill `intermediate` from the current base if it is still absent.
    ///
    /// `init` runs without the slot lock held, so it may call back into this state. The slot is
    /// checked again before the write: if another caller filled it meanwhile, that value is kept
    /// and the computed one is dropped. The absent-to-present transition therefore happens exactly
    /// once. Returns whether this call performed it.
    pub fn init_intermediate_with(&self, init: impl FnOnce(&C) -> C) -> bool {
        let base = {
            let slots = self.lock_slots();
            if slots.intermediate.is_some() {
                return false;
            }
            slots.base.clone()
        };

        let first = init(&base);

        let mut slots = self.lock_slots();
        if slots.intermediate.is_some() {
            tracing::debug!("intermediate canvas filled concurrently; discarding ours");
            return false;
        }
        slots.intermediate = Some(first);
        tracing::debug!("intermediate canvas initialized");
        true
    }

    /// Replace `intermediate`, returning the previous value. There is no way to clear it.
    pub fn replace_intermediate(&self, canvas: C) -> Option<C> {
        self.lock_slots().intermediate.replace(canvas)
    }

    pub fn result(&self) -> Option<C> {
        self.lock_slots().result.clone()
    }

    /// `result := intermediate`, returning the copied value.
    pub fn snapshot_result(&self) -> Option<C> {
        let mut slots = self.lock_slots();
        slots.result = slots.intermediate.clone();
        slots.result.clone()
    }

    pub fn slots(&self) -> CanvasSlots<C> {
        self.lock_slots().clone()
    }

    fn lock_slots(&self) -> MutexGuard<'_, CanvasSlots<C>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C> std::fmt::Debug for SharedCanvasState<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCanvasState").finish_non_exhaustive()
    }
}
