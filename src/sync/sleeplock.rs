//! 睡眠锁
//!
//! 槽位内容锁：获取时若已被占用则挂起当前线程（`Condvar`），
//! 可以跨设备 I/O 持有。记录持有者线程，以便断言调用方确实持有锁。

use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

struct LockState {
    locked: bool,
    holder: Option<ThreadId>,
}

/// 可睡眠的互斥锁
pub struct SleepLock<T: ?Sized> {
    name: &'static str,
    state: Mutex<LockState>,
    cond: Condvar,
    value: UnsafeCell<T>,
}

// 对 `value` 的访问只经由 `SleepLockGuard`，而 guard 只在 `locked` 置位后产生。
unsafe impl<T: ?Sized + Send> Send for SleepLock<T> {}
unsafe impl<T: ?Sized + Send> Sync for SleepLock<T> {}

impl<T> SleepLock<T> {
    /// 创建未加锁的睡眠锁
    pub fn new(name: &'static str, value: T) -> Self {
        Self {
            name,
            state: Mutex::new(LockState {
                locked: false,
                holder: None,
            }),
            cond: Condvar::new(),
            value: UnsafeCell::new(value),
        }
    }
}

impl<T: ?Sized> SleepLock<T> {
    fn state(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 获取锁，必要时挂起当前线程直到锁可用
    pub fn lock(&self) -> SleepLockGuard<'_, T> {
        let mut state = self.state();
        while state.locked {
            state = self
                .cond
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.locked = true;
        state.holder = Some(thread::current().id());
        SleepLockGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// 当前线程是否持有该锁
    pub fn holding(&self) -> bool {
        let state = self.state();
        state.locked && state.holder == Some(thread::current().id())
    }

    /// 锁是否被任意线程持有
    pub fn is_locked(&self) -> bool {
        self.state().locked
    }

    /// 锁名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn unlock(&self) {
        let mut state = self.state();
        if !(state.locked && state.holder == Some(thread::current().id())) {
            panic!("releasesleep: {} not held by current thread", self.name);
        }
        state.locked = false;
        state.holder = None;
        drop(state);
        self.cond.notify_all();
    }
}

impl<T: ?Sized> core::fmt::Debug for SleepLock<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state();
        f.debug_struct("SleepLock")
            .field("name", &self.name)
            .field("locked", &state.locked)
            .field("holder", &state.holder)
            .finish()
    }
}

/// `SleepLock` 的 RAII 守卫，drop 时释放锁并唤醒等待者
///
/// 守卫不可跨线程移动，持有者始终是加锁的线程。
pub struct SleepLockGuard<'a, T: ?Sized> {
    lock: &'a SleepLock<T>,
    _not_send: PhantomData<*const ()>,
}

impl<'a, T: ?Sized> SleepLockGuard<'a, T> {
    /// 守卫所属的锁
    pub fn lock(&self) -> &'a SleepLock<T> {
        self.lock
    }
}

impl<T: ?Sized> Deref for SleepLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.value.get() }
    }
}

impl<T: ?Sized> DerefMut for SleepLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<T: ?Sized> Drop for SleepLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use std::vec::Vec;

    #[test]
    fn test_lock_unlock() {
        let lock = SleepLock::new("test", 5u32);
        assert!(!lock.is_locked());
        assert!(!lock.holding());

        {
            let mut guard = lock.lock();
            assert!(lock.holding());
            *guard += 1;
        }

        assert!(!lock.is_locked());
        assert_eq!(*lock.lock(), 6);
    }

    #[test]
    fn test_holding_is_per_thread() {
        let lock = Arc::new(SleepLock::new("test", ()));
        let _guard = lock.lock();

        let other = Arc::clone(&lock);
        let seen = thread::spawn(move || (other.is_locked(), other.holding()))
            .join()
            .unwrap();
        assert_eq!(seen, (true, false));
    }

    #[test]
    fn test_waiter_blocks_until_release() {
        let lock = Arc::new(SleepLock::new("test", 0u32));
        let guard = lock.lock();

        let other = Arc::clone(&lock);
        let waiter = thread::spawn(move || {
            let mut value = other.lock();
            *value += 1;
        });

        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());
        drop(guard);

        waiter.join().unwrap();
        assert_eq!(*lock.lock(), 1);
    }

    #[test]
    fn test_mutual_exclusion() {
        let lock = Arc::new(SleepLock::new("test", 0u64));
        let inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let inside = Arc::clone(&inside);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let mut guard = lock.lock();
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        *guard += 1;
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*lock.lock(), 1600);
    }
}
