//! Serialization of tests that touch process-wide state.
//!
//! Tests that change the configuration or the diagnostics sink take the
//! exclusive guard; tests whose outcome depends on them take the shared one.

use parking_lot::{const_rwlock, RwLock, RwLockReadGuard, RwLockWriteGuard};

static GLOBAL_STATE: RwLock<()> = const_rwlock(());

pub(crate) fn shared() -> RwLockReadGuard<'static, ()> {
    GLOBAL_STATE.read()
}

pub(crate) fn exclusive() -> RwLockWriteGuard<'static, ()> {
    GLOBAL_STATE.write()
}
