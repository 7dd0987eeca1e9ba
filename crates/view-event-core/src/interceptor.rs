//! Registration interception.
//!
//! Hosts route every view registration through [`RegistrationInterceptor::intercept`].
//! Hooks run before and after the host's own registration; a hook that
//! returns an error or panics is logged and otherwise ignored, so the
//! registration always completes and its return value reaches the caller
//! unchanged.

use crate::host::{HookPhase, RegistrationHook, RouteBearing};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::RwLock;
use tracing::{debug, error};

#[derive(Default)]
pub struct RegistrationInterceptor {
    before: RwLock<Vec<RegistrationHook>>,
    after: RwLock<Vec<RegistrationHook>>,
}

impl RegistrationInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_hook(&self, phase: HookPhase, hook: RegistrationHook) {
        let hooks = match phase {
            HookPhase::Before => &self.before,
            HookPhase::After => &self.after,
        };
        hooks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(hook);
        debug!("Registered {:?} registration hook", phase);
    }

    pub fn hook_count(&self, phase: HookPhase) -> usize {
        self.snapshot(phase).len()
    }

    /// Run `original` for `view`, wrapped by the installed hooks.
    pub fn intercept<R>(&self, view: &dyn RouteBearing, original: impl FnOnce() -> R) -> R {
        self.run_hooks(HookPhase::Before, view);
        let result = original();
        self.run_hooks(HookPhase::After, view);
        result
    }

    // Hooks may register further hooks or views, so the list is copied out
    // before any of them runs.
    fn snapshot(&self, phase: HookPhase) -> Vec<RegistrationHook> {
        let hooks = match phase {
            HookPhase::Before => &self.before,
            HookPhase::After => &self.after,
        };
        hooks
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn run_hooks(&self, phase: HookPhase, view: &dyn RouteBearing) {
        for hook in self.snapshot(phase) {
            match catch_unwind(AssertUnwindSafe(|| hook(view))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(
                        "Failed to execute {:?} registration hook for {}: {}",
                        phase,
                        view.url(),
                        e
                    );
                }
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    error!(
                        "{:?} registration hook panicked for {}: {}",
                        phase,
                        view.url(),
                        message
                    );
                }
            }
        }
    }
}
