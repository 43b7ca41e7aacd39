use futures::channel::oneshot;

/// A blocking job running on its own thread, polled once per frame.
#[derive(Debug)]
pub struct InFlight<T> {
    label: &'static str,
    receiver: oneshot::Receiver<T>,
}

impl<T: Send + 'static> InFlight<T> {
    /// Runs `job` on a worker thread and calls `wake` once its result is
    /// ready, so an idle UI knows to poll again.
    pub fn spawn<F, W>(label: &'static str, job: F, wake: W) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
        W: FnOnce() + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        std::thread::spawn(move || {
            if sender.send(job()).is_err() {
                log::debug!("{label}: result dropped, nobody is waiting");
            }
            wake();
        });
        Self { label, receiver }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// `None` while running. `Some(Err(_))` if the worker died without
    /// producing a result.
    pub fn poll(&mut self) -> Option<Result<T, oneshot::Canceled>> {
        match self.receiver.try_recv() {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => None,
            Err(canceled) => {
                log::error!("{}: worker stopped without a result", self.label);
                Some(Err(canceled))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn result_arrives_through_poll() {
        let mut task = InFlight::spawn("test", || 41 + 1, || {});
        let deadline = Instant::now() + Duration::from_secs(5);
        let value = loop {
            if let Some(result) = task.poll() {
                break result;
            }
            assert!(Instant::now() < deadline, "worker never finished");
            std::thread::sleep(Duration::from_millis(5));
        };
        assert_eq!(value, Ok(42));
    }
}
