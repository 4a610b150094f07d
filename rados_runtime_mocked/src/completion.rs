use std::os::raw::c_int;

use parking_lot::{Condvar, Mutex};

/// Completion state shared between the mock and its worker tasks.
#[derive(Debug, Default)]
pub struct MockCompletion {
    result: Mutex<Option<c_int>>,
    done: Condvar,
}

impl MockCompletion {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the return value and wake all waiters. Only the first call
    /// has an effect.
    pub fn finish(&self, ret: c_int) {
        let mut result = self.result.lock();
        if result.is_none() {
            *result = Some(ret);
            self.done.notify_all();
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.result.lock().is_some()
    }

    /// Return value, or 0 while pending (as librados does).
    #[must_use]
    pub fn return_value(&self) -> c_int {
        self.result.lock().unwrap_or(0)
    }

    pub fn wait(&self) -> c_int {
        let mut result = self.result.lock();
        loop {
            if let Some(ret) = *result {
                return ret;
            }
            self.done.wait(&mut result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_pending_until_finished() {
        let completion = MockCompletion::new();
        assert!(!completion.is_complete());
        assert_eq!(completion.return_value(), 0);

        completion.finish(5);
        assert!(completion.is_complete());
        assert_eq!(completion.return_value(), 5);
    }

    #[test]
    fn test_first_finish_wins() {
        let completion = MockCompletion::new();
        completion.finish(-2);
        completion.finish(7);
        assert_eq!(completion.wait(), -2);
    }

    #[test]
    fn test_wait_wakes_up_from_other_thread() {
        let completion = Arc::new(MockCompletion::new());
        let worker = {
            let completion = Arc::clone(&completion);
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(20));
                completion.finish(3);
            })
        };
        assert_eq!(completion.wait(), 3);
        worker.join().unwrap();
    }
}
