//! # Service lifecycle glue
//!
//! SPEC_FULL.md §10.4. The base trait every long-lived Jazz component
//! (containers, the HTTP front end) implements so `jazz-node::service::Services`
//! can start and stop them uniformly, in the teacher's `main.rs` ctrl-c +
//! graceful-shutdown shape generalized from "stop the node" to "release
//! containers in reverse initialization order".

use crate::status::StatusCode;

/// A component with an explicit start/stop lifecycle.
///
/// Implementors must be safe to `shutdown` more than once; the second call
/// should be a no-op rather than an error, since shutdown ordering across
/// several containers is easier to get right when it's idempotent.
pub trait Lifecycle {
    /// Bring the component up. Called once, in dependency order.
    fn start(&mut self) -> Result<(), StatusCode>;

    /// Stop accepting new work and release resources. Called once per
    /// component, in the reverse of `start` order.
    fn shutdown(&mut self) -> Result<(), StatusCode>;
}

/// Tracks whether a component has been started, for implementors that want
/// `shutdown` to be a safe no-op before `start` or after a prior `shutdown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    NotStarted,
    Running,
    ShutDown,
}

impl Default for LifecycleState {
    fn default() -> Self {
        LifecycleState::NotStarted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy {
        state: LifecycleState,
    }

    impl Lifecycle for Dummy {
        fn start(&mut self) -> Result<(), StatusCode> {
            self.state = LifecycleState::Running;
            Ok(())
        }

        fn shutdown(&mut self) -> Result<(), StatusCode> {
            self.state = LifecycleState::ShutDown;
            Ok(())
        }
    }

    #[test]
    fn transitions_through_states() {
        let mut d = Dummy {
            state: LifecycleState::NotStarted,
        };
        assert_eq!(d.state, LifecycleState::NotStarted);
        d.start().unwrap();
        assert_eq!(d.state, LifecycleState::Running);
        d.shutdown().unwrap();
        assert_eq!(d.state, LifecycleState::ShutDown);
    }
}
