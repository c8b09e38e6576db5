//! Lock helpers that recover from poisoning.
//!
//! A panic while a guard is held must not take every later cache call down
//! with it, so poisoned locks are logged and reused.

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard};

use tracing::warn;

pub(crate) fn mutex_lock<'a, T>(
    lock: &'a Mutex<T>,
    target: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                target_module = target,
                lock_kind = "mutex.lock",
                result = "poisoned_recovered",
                "Recovered from poisoned lock"
            );
            poisoned.into_inner()
        }
    }
}

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                target_module = target,
                lock_kind = "rwlock.read",
                result = "poisoned_recovered",
                "Recovered from poisoned lock"
            );
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use super::*;

    #[test]
    fn test_mutex_lock_recovers_after_panic() {
        let lock = Mutex::new(1);

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = lock.lock().expect("lock should be acquired");
            panic!("poison the mutex");
        }));

        *mutex_lock(&lock, "lock::tests", "write") = 2;
        assert_eq!(*mutex_lock(&lock, "lock::tests", "read"), 2);
    }

    #[test]
    fn test_rwlock_recovers_after_panic() {
        let lock = RwLock::new(vec![1]);

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = lock.write().expect("lock should be acquired");
            panic!("poison the rwlock");
        }));

        assert_eq!(rw_read(&lock, "lock::tests", "len").len(), 1);
    }
}
