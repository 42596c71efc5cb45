//! Every failing call releases exactly what it allocated.
//!
//! Allocations are tallied per thread so the test harness running other
//! tests concurrently does not disturb the count.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

use scryptkit::{Budget, Error, FixedProbe, Scrypt, Scryptenc};

struct Counting;

thread_local! {
    static LIVE_BYTES: Cell<isize> = const { Cell::new(0) };
}

unsafe impl GlobalAlloc for Counting {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: forwarded unchanged to the system allocator.
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            let _ = LIVE_BYTES.try_with(|live| live.set(live.get() + layout.size() as isize));
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: `ptr` came from `alloc` above with the same layout.
        unsafe { System.dealloc(ptr, layout) };
        let _ = LIVE_BYTES.try_with(|live| live.set(live.get() - layout.size() as isize));
    }
}

#[global_allocator]
static GLOBAL: Counting = Counting;

fn live_bytes() -> isize {
    LIVE_BYTES.with(Cell::get)
}

/// Runs `op` once to settle lazy one-time allocations, then asserts a second
/// run leaves the live byte count unchanged.
fn assert_no_leak<F: Fn()>(op: F) {
    op();
    let before = live_bytes();
    op();
    assert_eq!(live_bytes(), before);
}

fn scrypt() -> Scrypt<Scryptenc<FixedProbe>> {
    Scrypt::with_primitive(Scryptenc::with_probe(FixedProbe::new(1 << 30, 1e6)))
}

fn fast() -> Budget {
    Budget::ENCRYPT.with_max_time(0.1)
}

#[test]
fn no_leak_on_failures_or_success() {
    let s = scrypt();
    let sealed = s.encrypt("message", "password", &fast()).unwrap();

    assert_no_leak(|| {
        let result = s.decrypt(&sealed, "wrong", &Budget::DECRYPT);
        assert!(matches!(result, Err(Error::PasswordIncorrect)));
    });

    assert_no_leak(|| {
        let result = s.decrypt(&sealed, "password", &Budget::DECRYPT.with_max_mem(1));
        assert!(matches!(result, Err(Error::MemoryBudgetExceeded)));
    });

    assert_no_leak(|| {
        let result = s.decrypt(&sealed[..100], "password", &Budget::DECRYPT);
        assert!(matches!(result, Err(Error::MalformedCiphertext)));
    });

    assert_no_leak(|| {
        let result = s.hash("pw", "salt", 3, 1, 1);
        assert!(matches!(result, Err(Error::InvalidParams(_))));
    });

    assert_no_leak(|| {
        let result = s.hash("pw", "salt", 16, 0, 1);
        assert!(matches!(result, Err(Error::DerivationFailed)));
    });

    assert_no_leak(|| {
        let opened = s.decrypt(&sealed, "password", &Budget::DECRYPT).unwrap();
        assert_eq!(opened.as_slice(), b"message");
    });
}
