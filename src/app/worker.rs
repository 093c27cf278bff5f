use std::sync::mpsc;

/// Runs `work` on a detached thread and delivers its result on `tx`.
///
/// A dropped receiver (the overlay closed) discards the result silently.
pub(super) fn spawn_worker_action<T, W>(work: W, tx: mpsc::Sender<T>)
where
    T: Send + 'static,
    W: FnOnce() -> T + Send + 'static,
{
    std::thread::spawn(move || {
        let result = work();
        if tx.send(result).is_err() {
            tracing::debug!("worker result dropped; receiver is gone");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn worker_result_arrives_on_channel() {
        let (tx, rx) = mpsc::channel();
        spawn_worker_action(|| 21 * 2, tx);
        let value = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("worker should deliver a result");
        assert_eq!(value, 42);
    }

    #[test]
    fn worker_tolerates_dropped_receiver() {
        let (tx, rx) = mpsc::channel::<u8>();
        drop(rx);
        spawn_worker_action(|| 1, tx);
    }
}
