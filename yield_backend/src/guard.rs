use crate::types::StreamerError;
use candid::Principal;
use std::cell::RefCell;
use std::collections::BTreeSet;

thread_local! {
    static PENDING_OPERATIONS: RefCell<BTreeSet<Principal>> = RefCell::new(BTreeSet::new());
}

/// Guard to prevent concurrent state-mutating operations from the same caller.
/// Uses RAII pattern to automatically cleanup on drop.
///
/// Claims hold this across the async ledger transfer, so a caller cannot start
/// a second claim while the first is still awaiting its transfer result.
pub struct OperationGuard {
    caller: Principal,
}

impl OperationGuard {
    /// Acquire the guard for `caller`. Fails if that principal already has an
    /// operation in flight.
    pub fn acquire(caller: Principal) -> Result<Self, StreamerError> {
        PENDING_OPERATIONS.with(|ops| {
            let mut ops = ops.borrow_mut();
            if ops.contains(&caller) {
                return Err(StreamerError::OperationInProgress);
            }
            ops.insert(caller);
            Ok(Self { caller })
        })
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        PENDING_OPERATIONS.with(|ops| {
            ops.borrow_mut().remove(&self.caller);
        });
    }
}

/// Emergency safety valve: clear a stuck guard for a specific principal.
///
/// Exists in case a guard fails to drop (canister trap/upgrade mid-operation),
/// which would otherwise lock the principal out permanently. Owner-gated at
/// the endpoint layer.
///
/// Returns true if a guard was cleared, false if none existed.
pub fn clear_guard_for_principal(principal: Principal) -> bool {
    PENDING_OPERATIONS.with(|ops| ops.borrow_mut().remove(&principal))
}

/// Check whether a principal currently holds an active guard.
pub fn has_active_guard(principal: Principal) -> bool {
    PENDING_OPERATIONS.with(|ops| ops.borrow().contains(&principal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(n: u8) -> Principal {
        Principal::from_slice(&[n; 4])
    }

    #[test]
    fn test_guard_prevents_concurrent_operations() {
        let caller = principal(1);

        let guard1 = OperationGuard::acquire(caller);
        assert!(guard1.is_ok());

        // Second guard from the same caller must fail while the first lives.
        let guard2 = OperationGuard::acquire(caller);
        assert_eq!(guard2.err(), Some(StreamerError::OperationInProgress));
    }

    #[test]
    fn test_guard_cleanup_on_drop() {
        let caller = principal(2);

        {
            let _guard = OperationGuard::acquire(caller).unwrap();
            assert!(has_active_guard(caller));
        } // Guard dropped here

        assert!(!has_active_guard(caller));
        assert!(OperationGuard::acquire(caller).is_ok());
    }

    #[test]
    fn test_guards_are_per_caller() {
        let a = principal(3);
        let b = principal(4);

        let _guard_a = OperationGuard::acquire(a).unwrap();
        // A different caller is unaffected.
        assert!(OperationGuard::acquire(b).is_ok());
    }

    #[test]
    fn test_clear_stuck_guard() {
        let caller = principal(5);

        let guard = OperationGuard::acquire(caller).unwrap();
        std::mem::forget(guard); // Simulate a trap that skipped Drop

        assert!(has_active_guard(caller));
        assert!(clear_guard_for_principal(caller));
        assert!(OperationGuard::acquire(caller).is_ok());
    }
}
