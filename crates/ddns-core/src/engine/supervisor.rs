//! Crash-recovery supervisor for the update loop
//!
//! Each loop instance runs in its own task so that a panic in the loop body
//! is caught as a [`tokio::task::JoinError`] instead of taking the process
//! down. Instances run strictly one at a time: a relaunch replaces the dead
//! instance, it never runs alongside it.
//!
//! ## Restart budget
//!
//! After a failure the supervisor relaunches the loop while
//! `restart_count < restart_ceiling`, incrementing the count once per
//! relaunch. With the default ceiling of 5, five failures are survived and
//! the sixth ends supervision with [`SupervisorExit::RestartCeilingReached`].
//! What happens after that is up to the caller; the daemon goes inert.

use std::any::Any;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use super::{EngineEvent, UpdateLoop};

/// Default number of relaunches after unexpected failures
pub const DEFAULT_RESTART_CEILING: usize = 5;

/// Why [`Supervisor::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorExit {
    /// Shutdown signal received; the running instance was aborted
    Shutdown,
    /// The loop returned cleanly (not expected in production)
    Completed,
    /// Failures exhausted the restart budget
    RestartCeilingReached {
        /// Number of relaunches performed
        restart_count: usize,
    },
}

/// Bounded-restart supervisor around an [`UpdateLoop`]
pub struct Supervisor {
    /// Template for each loop instance; clones share last observed address
    update_loop: UpdateLoop,

    /// Maximum number of relaunches
    restart_ceiling: usize,

    /// Relaunches performed so far
    restart_count: usize,
}

impl Supervisor {
    /// Create a supervisor with the default restart ceiling
    pub fn new(update_loop: UpdateLoop) -> Self {
        Self::with_restart_ceiling(update_loop, DEFAULT_RESTART_CEILING)
    }

    /// Create a supervisor with a custom restart ceiling
    pub fn with_restart_ceiling(update_loop: UpdateLoop, restart_ceiling: usize) -> Self {
        Self {
            update_loop,
            restart_ceiling,
            restart_count: 0,
        }
    }

    /// Relaunches performed so far
    pub fn restart_count(&self) -> usize {
        self.restart_count
    }

    /// Maximum number of relaunches
    pub fn restart_ceiling(&self) -> usize {
        self.restart_ceiling
    }

    /// The supervised loop
    pub fn update_loop(&self) -> &UpdateLoop {
        &self.update_loop
    }

    /// Run the loop until the restart budget is spent
    pub async fn run(&mut self) -> SupervisorExit {
        self.run_with_shutdown(None).await
    }

    /// Run the loop until shutdown is signalled or the restart budget is spent
    ///
    /// # Parameters
    ///
    /// - `shutdown_rx`: Optional oneshot receiver; when it resolves the running
    ///   instance is aborted and `SupervisorExit::Shutdown` is returned
    pub async fn run_with_shutdown(
        &mut self,
        mut shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> SupervisorExit {
        let events = self.update_loop.events().clone();

        loop {
            let instance = self.update_loop.clone();
            let mut handle = tokio::spawn(async move { instance.run().await });

            let joined = match shutdown_rx.as_mut() {
                Some(rx) => tokio::select! {
                    joined = &mut handle => joined,
                    _ = rx => {
                        handle.abort();
                        info!("Shutdown signal received, stopping update loop");
                        events.emit(EngineEvent::Stopped {
                            reason: "Shutdown signal".to_string(),
                        });
                        return SupervisorExit::Shutdown;
                    }
                },
                None => (&mut handle).await,
            };

            let reason = match joined {
                Ok(Ok(())) => {
                    info!("Update loop exited");
                    return SupervisorExit::Completed;
                }
                Ok(Err(e)) => e.to_string(),
                Err(e) if e.is_panic() => panic_message(e.into_panic()),
                Err(e) => e.to_string(),
            };

            error!(
                "Update loop failed: {} (restarts so far: {}/{})",
                reason, self.restart_count, self.restart_ceiling
            );
            events.emit(EngineEvent::LoopFailed {
                reason,
                restart_count: self.restart_count,
            });

            if self.restart_count >= self.restart_ceiling {
                error!(
                    "Restart ceiling of {} reached, update loop will not be restarted",
                    self.restart_ceiling
                );
                events.emit(EngineEvent::RestartCeilingReached {
                    restart_count: self.restart_count,
                });
                return SupervisorExit::RestartCeilingReached {
                    restart_count: self.restart_count,
                };
            }

            self.restart_count += 1;
            warn!(
                "Starting a new update loop ({}/{})",
                self.restart_count, self.restart_ceiling
            );
            events.emit(EngineEvent::LoopRestarted {
                restart_count: self.restart_count,
            });
        }
    }
}

/// Render a panic payload as text
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_formats_payloads() {
        assert_eq!(panic_message(Box::new("boom")), "panic: boom");
        assert_eq!(
            panic_message(Box::new(String::from("index out of bounds"))),
            "panic: index out of bounds"
        );
        assert_eq!(panic_message(Box::new(42u8)), "panic with non-string payload");
    }
}
