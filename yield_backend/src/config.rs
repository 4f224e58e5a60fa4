use crate::memory_ids::CONFIG_MEMORY_ID;
use crate::types::{Config, StreamerError};
use crate::{Memory, MEMORY_MANAGER};
use candid::Principal;
use ic_stable_structures::memory_manager::MemoryId;
use ic_stable_structures::StableCell;
use std::cell::RefCell;

thread_local! {
    static CONFIG: RefCell<StableCell<Config, Memory>> = RefCell::new(
        StableCell::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(CONFIG_MEMORY_ID))),
            Config::default(),
        )
        .expect("Failed to init config cell")
    );
}

pub fn get() -> Config {
    CONFIG.with(|c| c.borrow().get().clone())
}

pub fn set(config: Config) {
    CONFIG.with(|c| {
        c.borrow_mut()
            .set(config)
            .expect("Failed to write config cell");
    });
}

pub fn update<F: FnOnce(&mut Config)>(f: F) {
    let mut config = get();
    f(&mut config);
    set(config);
}

pub fn genesis_day() -> u64 {
    CONFIG.with(|c| c.borrow().get().genesis_day)
}

pub fn token_ledger() -> Principal {
    CONFIG.with(|c| c.borrow().get().token_ledger)
}

pub fn fee_rate() -> u64 {
    CONFIG.with(|c| c.borrow().get().fee_rate)
}

pub fn fee_receiver() -> Principal {
    CONFIG.with(|c| c.borrow().get().fee_receiver)
}

/// Owner check for administrative endpoints. Access-control policy beyond
/// "single owner principal" is out of scope; this is the black-box boundary.
pub fn ensure_owner(caller: Principal) -> Result<(), StreamerError> {
    if caller == CONFIG.with(|c| c.borrow().get().owner) {
        Ok(())
    } else {
        Err(StreamerError::NotAuthorized)
    }
}
