//! One-time, process-wide backend selection.
//!
//! Each accelerated primitive sits behind a strategy trait with a builtin
//! implementation that is always available. The first use of a slot probes
//! the compiled-in candidates in order and binds the first one that reports
//! itself available; the choice never changes afterwards.

use std::sync::OnceLock;

use tracing::debug;

/// A selectable implementation of some primitive.
pub trait Backend: Send + Sync {
    /// Short identifier, used in logs.
    fn name(&self) -> &'static str;

    /// Whether this implementation can be used in this process.
    fn is_available(&self) -> bool;
}

/// Holds the backend chosen for one primitive.
pub struct BackendSlot<T: ?Sized + 'static> {
    kind: &'static str,
    cell: OnceLock<&'static T>,
}

impl<T: ?Sized + Backend + 'static> BackendSlot<T> {
    pub const fn new(kind: &'static str) -> Self {
        Self {
            kind,
            cell: OnceLock::new(),
        }
    }

    /// Returns the bound backend, probing `candidates` on first use.
    ///
    /// Candidates are tried in order; `fallback` is bound when none of them
    /// is available.
    pub fn get_or_select<F>(&self, candidates: F, fallback: &'static T) -> &'static T
    where
        F: FnOnce() -> Vec<&'static T>,
    {
        *self.cell.get_or_init(|| {
            let chosen = candidates()
                .into_iter()
                .find(|candidate| candidate.is_available())
                .unwrap_or(fallback);
            debug!(kind = self.kind, backend = chosen.name(), "backend selected");
            chosen
        })
    }

    /// The bound backend, if selection already ran.
    pub fn get(&self) -> Option<&'static T> {
        self.cell.get().copied()
    }
}

/// Resolves every backend slot now.
///
/// Selection is lazy and race-free without this; calling it before spawning
/// worker threads just moves the probing cost to startup.
pub fn init() {
    let pbkdf2 = crate::crypto::pbkdf2::pbkdf2_backend();
    let bcrypt = crate::crypto::eks::bcrypt_backend();
    debug!(
        pbkdf2 = pbkdf2.name(),
        bcrypt = bcrypt.name(),
        "backends initialized"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Probe: Backend {}

    struct Fixed(&'static str, bool);

    impl Backend for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn is_available(&self) -> bool {
            self.1
        }
    }

    impl Probe for Fixed {}

    static MISSING: Fixed = Fixed("missing", false);
    static FAST: Fixed = Fixed("fast", true);
    static PURE: Fixed = Fixed("pure", true);

    #[test]
    fn picks_first_available_candidate() {
        let slot: BackendSlot<dyn Probe> = BackendSlot::new("probe");
        assert!(slot.get().is_none());
        let chosen = slot.get_or_select(|| vec![&MISSING as &'static dyn Probe, &FAST, &PURE], &PURE);
        assert_eq!(chosen.name(), "fast");
    }

    #[test]
    fn falls_back_when_nothing_is_available() {
        let slot: BackendSlot<dyn Probe> = BackendSlot::new("probe");
        let chosen = slot.get_or_select(|| vec![&MISSING as &'static dyn Probe], &PURE);
        assert_eq!(chosen.name(), "pure");
    }

    #[test]
    fn selection_is_permanent() {
        let slot: BackendSlot<dyn Probe> = BackendSlot::new("probe");
        slot.get_or_select(|| vec![&PURE as &'static dyn Probe], &PURE);
        let again = slot.get_or_select(|| vec![&FAST as &'static dyn Probe], &FAST);
        assert_eq!(again.name(), "pure");
        assert_eq!(slot.get().map(|b| b.name()), Some("pure"));
    }

    #[test]
    fn init_binds_all_slots() {
        init();
        assert!(crate::crypto::pbkdf2::PBKDF2_BACKEND.get().is_some());
        assert!(crate::crypto::eks::BCRYPT_BACKEND.get().is_some());
    }
}
