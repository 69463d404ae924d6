//! End-to-end scenarios exercised through the public `Ring` API.

use std::future::Future;
use std::time::Duration;

use ringcoro::Ring;

/// Polls `fut` for up to a millisecond and reports whether it resolved.
async fn resolves<F: Future<Output = ()>>(fut: F) -> bool {
    tokio::time::timeout(Duration::from_millis(1), fut).await.is_ok()
}

#[tokio::test(flavor = "current_thread")]
async fn ping_pong_round_trip() {
    let mut ring = Ring::new(64, 16, 32).unwrap();
    ring.memcpy_in(&[1, 2, 3, 4]).unwrap();
    assert_eq!(ring.ready_size(), 4);
    assert_eq!(ring.peek_i32().unwrap(), 0x0403_0201);

    let mut out = [0u8; 4];
    ring.memcpy_out(&mut out).unwrap();
    assert_eq!(out, [1, 2, 3, 4]);
    assert_eq!(ring.ready_size(), 0);
}

#[tokio::test(flavor = "current_thread")]
async fn wrap_with_contiguity() {
    let mut ring = Ring::new(4096, 0, 0).unwrap();
    let cap = ring.ready_write_size();
    ring.consume(cap - 2).unwrap();
    ring.commit(cap - 2).unwrap();
    assert_eq!(ring.ready_size(), 0);

    ring.memcpy_in(&[0xAA, 0xBB, 0xCC, 0xDD]).unwrap();
    let readable = ring.readable();
    assert_eq!(readable.len(), 4);
    assert_eq!(readable, &[0xAA, 0xBB, 0xCC, 0xDD]);
}

#[tokio::test(flavor = "current_thread")]
async fn producer_blocks_consumer_wakes() {
    let mut ring = Ring::new(4096, 0, 0).unwrap();
    let mut seq = 0i32;
    while ring.ready_write_size() >= 4 {
        ring.memcpy_in(&seq.to_ne_bytes()).unwrap();
        seq += 1;
    }
    assert_eq!(ring.woken_up(), 0);

    tokio::pin!(let fut = ring.wait_not_full(4));
    assert!(!resolves(&mut fut).await, "wait must suspend while the ring is full");

    // `commit` takes `&self`, so the consumer side of this exchange is just
    // another shared borrow of the same `ring` the pending future already
    // holds, not a distinct exclusive owner.
    let v = ring.peek_i32().unwrap();
    assert_eq!(v, 0);
    ring.commit(4).unwrap();

    assert!(resolves(&mut fut).await, "commit should have woken the pending producer");
    assert_eq!(ring.woken_up(), 1);

    ring.memcpy_in(&seq.to_ne_bytes()).unwrap();
}

#[tokio::test(flavor = "current_thread")]
async fn cancellation_skip() {
    let mut ring = Ring::new(4096, 0, 0).unwrap();
    assert!(ring.is_empty());

    {
        tokio::pin!(let fut = ring.wait_not_empty(4));
        assert!(!resolves(&mut fut).await);
        // `fut` is dropped here, simulating the owning task being cancelled
        // before the ring ever becomes readable.
    }

    ring.memcpy_in(&42i32.to_ne_bytes()).unwrap();
    assert_eq!(ring.woken_up(), 0);
    assert_eq!(ring.woken_up_skipped(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn fifo_fairness() {
    let ring = Ring::new(4096, 0, 0).unwrap();
    // Leave only 5 bytes free, so a request for 10 genuinely suspends.
    let cap = ring.ready_write_size();
    ring.consume(cap - 5).unwrap();
    assert_eq!(ring.ready_write_size(), 5);

    tokio::pin!(let fut_a = ring.wait_not_full(10));
    tokio::pin!(let fut_b = ring.wait_not_full(100));
    tokio::pin!(let fut_c = ring.wait_not_full(20));
    assert!(!resolves(&mut fut_a).await);
    assert!(!resolves(&mut fut_b).await);
    assert!(!resolves(&mut fut_c).await);

    // Free 50 bytes (total free: 55). Only `a` (needs 10) can resume.
    ring.commit(50).unwrap();
    assert!(resolves(&mut fut_a).await);
    assert!(!resolves(&mut fut_b).await);
    assert!(!resolves(&mut fut_c).await);
    assert_eq!(ring.woken_up(), 1);

    // Free another 50 bytes (total free: 105). `b` resumes next, preserving
    // FIFO order even though `c` alone would have been satisfiable earlier.
    ring.commit(50).unwrap();
    assert!(resolves(&mut fut_b).await);
    assert!(resolves(&mut fut_c).await);
    assert_eq!(ring.woken_up(), 3);
}

#[tokio::test(flavor = "current_thread")]
async fn stress_throughput() {
    let mut ring = Ring::new(65535, 20000, 40000).unwrap();
    let mut produced = 0i32;
    let mut consumed = 0i32;

    while consumed < 100_000 {
        while produced < 100_000 && ring.ready_write_size() >= 4 {
            produced += 1;
            ring.memcpy_in(&produced.to_ne_bytes()).unwrap();
        }
        while ring.ready_size() >= 4 {
            consumed += 1;
            assert_eq!(ring.peek_i32().unwrap(), consumed);
            ring.commit(4).unwrap();
        }
    }

    assert_eq!(produced, 100_000);
    assert_eq!(consumed, 100_000);
    assert!(ring.is_empty());
}
