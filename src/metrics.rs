//! Process-wide game counters, reported by the health endpoint.
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

static SESSIONS_CREATED: AtomicU64 = AtomicU64::new(0);
static MOVES: AtomicU64 = AtomicU64::new(0);
static ENCOUNTERS: AtomicU64 = AtomicU64::new(0);
static TURNS: AtomicU64 = AtomicU64::new(0);
static VICTORIES: AtomicU64 = AtomicU64::new(0);
static DEFEATS: AtomicU64 = AtomicU64::new(0);
static PERSISTENCE_FAILURES: AtomicU64 = AtomicU64::new(0);

pub fn inc_sessions_created() {
    SESSIONS_CREATED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_moves(encounter: bool) {
    MOVES.fetch_add(1, Ordering::Relaxed);
    if encounter {
        ENCOUNTERS.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn inc_turns() {
    TURNS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_victories() {
    VICTORIES.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_defeats() {
    DEFEATS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_persistence_failures() {
    PERSISTENCE_FAILURES.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Snapshot {
    pub sessions_created: u64,
    pub moves: u64,
    pub encounters: u64,
    pub turns: u64,
    pub victories: u64,
    pub defeats: u64,
    pub persistence_failures: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        sessions_created: SESSIONS_CREATED.load(Ordering::Relaxed),
        moves: MOVES.load(Ordering::Relaxed),
        encounters: ENCOUNTERS.load(Ordering::Relaxed),
        turns: TURNS.load(Ordering::Relaxed),
        victories: VICTORIES.load(Ordering::Relaxed),
        defeats: DEFEATS.load(Ordering::Relaxed),
        persistence_failures: PERSISTENCE_FAILURES.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Counters are global to the test binary, so only assert on growth.
    #[test]
    fn counters_only_grow() {
        let before = snapshot();
        inc_moves(true);
        inc_moves(false);
        inc_turns();
        let after = snapshot();
        assert!(after.moves >= before.moves + 2);
        assert!(after.encounters > before.encounters);
        assert!(after.turns > before.turns);
    }
}
