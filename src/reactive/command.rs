use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use super::Derived;
use crate::error::{Error, Result};

/// A named operation with an optional enabling condition and a single
/// in-flight execution at a time.
pub struct ReactiveCommand {
    name: &'static str,
    condition: Option<Derived<bool>>,
    executing: Arc<watch::Sender<bool>>,
}

/// Clears the executing flag when an execution ends, including on drop of a
/// cancelled future.
struct ExecutionGuard {
    executing: Arc<watch::Sender<bool>>,
}

impl Drop for ExecutionGuard {
    fn drop(&mut self) {
        self.executing.send_replace(false);
    }
}

impl ReactiveCommand {
    pub fn new(name: &'static str) -> Self {
        let (executing, _) = watch::channel(false);
        Self {
            name,
            condition: None,
            executing: Arc::new(executing),
        }
    }

    pub fn with_condition(name: &'static str, condition: Derived<bool>) -> Self {
        Self {
            condition: Some(condition),
            ..Self::new(name)
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.condition.as_ref().map_or(true, Derived::get)
    }

    pub fn is_executing(&self) -> bool {
        *self.executing.borrow()
    }

    pub fn can_execute(&self) -> bool {
        self.is_enabled() && !self.is_executing()
    }

    pub fn subscribe_executing(&self) -> watch::Receiver<bool> {
        self.executing.subscribe()
    }

    /// Run an asynchronous effect under this command's guard.
    pub async fn execute<T, F, Fut>(&self, effect: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _guard = self.begin()?;
        tracing::debug!(command = self.name, "executing");
        let result = effect().await;
        tracing::debug!(command = self.name, ok = result.is_ok(), "finished");
        result
    }

    /// Run a synchronous effect under this command's guard.
    pub fn run<T>(&self, effect: impl FnOnce() -> Result<T>) -> Result<T> {
        let _guard = self.begin()?;
        tracing::debug!(command = self.name, "running");
        effect()
    }

    fn begin(&self) -> Result<ExecutionGuard> {
        if !self.is_enabled() {
            return Err(Error::CommandDisabled { command: self.name });
        }
        let started = self.executing.send_if_modified(|running| {
            if *running {
                false
            } else {
                *running = true;
                true
            }
        });
        if !started {
            return Err(Error::CommandBusy { command: self.name });
        }
        Ok(ExecutionGuard {
            executing: Arc::clone(&self.executing),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn disabled_command_fails_before_running_the_effect() {
        let condition = Derived::new(false);
        let command = ReactiveCommand::with_condition("reject", condition.clone());
        let ran = AtomicBool::new(false);

        let err = command
            .execute(|| async {
                ran.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::CommandDisabled { command: "reject" }));
        assert!(!ran.load(Ordering::SeqCst));

        condition.set(true);
        assert!(command.can_execute());
    }

    #[tokio::test]
    async fn second_invocation_while_running_is_rejected() {
        let command = Arc::new(ReactiveCommand::new("approve"));
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let (started_tx, started_rx) = oneshot::channel::<()>();

        let first = {
            let command = Arc::clone(&command);
            tokio::spawn(async move {
                command
                    .execute(|| async move {
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                        Ok(1)
                    })
                    .await
            })
        };

        started_rx.await.expect("first execution never started");
        assert!(command.is_executing());
        let err = command.execute(|| async { Ok(2) }).await.unwrap_err();
        assert!(matches!(err, Error::CommandBusy { command: "approve" }));

        release_tx.send(()).expect("first execution dropped");
        assert_eq!(first.await.expect("task panicked").expect("command failed"), 1);
        assert!(!command.is_executing());
    }

    #[tokio::test]
    async fn executing_flag_resets_after_failure() {
        let command = ReactiveCommand::new("load");
        let result: Result<()> = command
            .execute(|| async { Err(Error::NotFound { url: "x".into() }) })
            .await;
        assert!(result.is_err());
        assert!(!command.is_executing());
        assert!(command.run(|| Ok(())).is_ok());
    }

    #[test]
    fn run_reports_busy_when_reentered() {
        let command = ReactiveCommand::new("go_to_commits");
        let inner = command.run(|| command.run(|| Ok(())));
        assert!(matches!(inner, Err(Error::CommandBusy { .. })));
    }
}
