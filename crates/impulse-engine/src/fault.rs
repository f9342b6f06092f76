// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Fault containment for user actions.
//!
//! A panic raised inside an action must never cross into the beat loop, a carousel
//! worker or a consumer lane. Each supervising boundary runs the action through
//! [`contain`], which logs the fault and reports it to the caller.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::error;

/// Run `f`, catching any panic. Returns `false` if the action faulted.
pub fn contain<F: FnOnce()>(boundary: &str, id: u64, f: F) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            error!(
                "[{}] Contained fault in {}: {}",
                boundary,
                id,
                panic_message(payload.as_ref())
            );
            false
        }
    }
}

pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contain_reports_faults() {
        assert!(contain("TEST", 1, || {}));
        assert!(!contain("TEST", 2, || panic!("boom")));
    }

    #[test]
    fn test_panic_message_variants() {
        let payload = panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "static");

        let payload = panic::catch_unwind(|| panic!("formatted {}", 7)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "formatted 7");

        let payload = panic::catch_unwind(|| std::panic::panic_any(42u8)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
