//! Deferral of interrupts across non-resumable store mutations
//!
//! The metadata update protocol has a window between "backup taken" and
//! "mutation applied + backup cleaned up" where an externally delivered
//! interrupt would strand an orphaned backup object. [`CriticalSection`] is an
//! RAII guard for that window: while any guard is alive, Ctrl-C is recorded
//! instead of acted on, and the pending interrupt terminates the process once
//! the last guard is dropped.
//!
//! [`install_interrupt_handler`] must be called once from an async context at
//! process start; without it, guards still nest correctly but interrupts keep
//! their default behavior.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{info, warn};

static ACTIVE_SECTIONS: AtomicUsize = AtomicUsize::new(0);
static INTERRUPT_PENDING: AtomicBool = AtomicBool::new(false);

/// Exit code used when terminating on a (possibly deferred) interrupt.
const INTERRUPT_EXIT_CODE: i32 = 130;

/// Guard marking a window during which interrupts must not take effect.
///
/// Guards nest; the process only honors a deferred interrupt when the
/// outermost guard is released.
pub struct CriticalSection(());

impl CriticalSection {
    pub fn enter() -> Self {
        ACTIVE_SECTIONS.fetch_add(1, Ordering::SeqCst);
        Self(())
    }
}

impl Drop for CriticalSection {
    fn drop(&mut self) {
        let remaining = ACTIVE_SECTIONS.fetch_sub(1, Ordering::SeqCst) - 1;
        if remaining == 0 && INTERRUPT_PENDING.swap(false, Ordering::SeqCst) {
            warn!("Honoring interrupt deferred during a critical store operation");
            std::process::exit(INTERRUPT_EXIT_CODE);
        }
    }
}

/// Whether any critical section is currently active.
pub fn in_critical_section() -> bool {
    ACTIVE_SECTIONS.load(Ordering::SeqCst) > 0
}

/// Install the Ctrl-C handler that cooperates with [`CriticalSection`].
///
/// Interrupts arriving outside a critical section terminate the process
/// immediately; inside one they are recorded and honored on guard release.
pub fn install_interrupt_handler() {
    tokio::spawn(async {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            if in_critical_section() {
                INTERRUPT_PENDING.store(true, Ordering::SeqCst);
                warn!("Interrupt received during a critical store operation; deferring");
            } else {
                info!("Interrupted");
                std::process::exit(INTERRUPT_EXIT_CODE);
            }
        }
    });
}
