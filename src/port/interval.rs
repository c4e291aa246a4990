//! Inter-character read assembly.
//!
//! `serialport` exposes one timeout per port, applied to each `read` call.
//! The probe wants comm-timeouts semantics instead: wait up to the total
//! bound for the first byte, then keep collecting while bytes arrive no more
//! than `read_interval` apart, never past the total deadline and never past
//! the end of the buffer.

use super::traits::TimeoutPolicy;
use std::io;
use std::time::{Duration, Instant};

/// Fill `buffer` from `read_once` under `policy`.
///
/// `read_once` performs a single blocking read bounded by the given wait.
/// A timed-out read ends the assembly and is not an error; the bytes
/// collected so far (possibly none) are the result.
pub fn read_with_policy<F>(
    buffer: &mut [u8],
    policy: &TimeoutPolicy,
    mut read_once: F,
) -> io::Result<usize>
where
    F: FnMut(&mut [u8], Duration) -> io::Result<usize>,
{
    if buffer.is_empty() {
        return Ok(0);
    }

    let total = policy.read_total(buffer.len());
    // No representable deadline means the bound is effectively unlimited.
    let deadline = Instant::now().checked_add(total);
    let mut filled = 0;

    while filled < buffer.len() {
        let remaining = match deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => total,
        };
        if remaining.is_zero() {
            break;
        }
        let wait = if filled == 0 || policy.read_interval.is_zero() {
            remaining
        } else {
            remaining.min(policy.read_interval)
        };

        match read_once(&mut buffer[filled..], wait) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if is_timeout(&e) => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(filled)
}

/// Whether an I/O error means "nothing arrived in time".
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    fn chunked(chunks: Vec<Vec<u8>>) -> impl FnMut(&mut [u8], Duration) -> io::Result<usize> {
        let mut chunks: VecDeque<Vec<u8>> = chunks.into();
        move |buf, _wait| match chunks.pop_front() {
            Some(mut chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    chunks.push_front(chunk.split_off(n));
                }
                Ok(n)
            }
            None => Err(io::Error::new(io::ErrorKind::TimedOut, "timed out")),
        }
    }

    #[test]
    fn test_timeout_without_data_is_zero() {
        let mut buf = [0u8; 512];
        let n = read_with_policy(&mut buf, &TimeoutPolicy::default(), chunked(vec![])).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_collects_chunks_until_gap() {
        let mut buf = [0u8; 512];
        let read = chunked(vec![vec![0x01], vec![0x02, 0x03]]);
        let n = read_with_policy(&mut buf, &TimeoutPolicy::default(), read).unwrap();
        assert_eq!(&buf[..n], &[0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_stops_when_buffer_full() {
        let mut buf = [0u8; 4];
        let mut calls = 0;
        let mut inner = chunked(vec![b"abcdefgh".to_vec()]);
        let n = read_with_policy(&mut buf, &TimeoutPolicy::default(), |b, w| {
            calls += 1;
            inner(b, w)
        })
        .unwrap();
        assert_eq!(n, 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_first_wait_uses_total_then_interval() {
        let policy = TimeoutPolicy {
            read_interval: Duration::from_millis(50),
            read_total_constant: Duration::from_secs(5),
            ..TimeoutPolicy::default()
        };
        let mut waits = Vec::new();
        let mut inner = chunked(vec![vec![1], vec![2]]);
        let mut buf = [0u8; 8];
        read_with_policy(&mut buf, &policy, |b, w| {
            waits.push(w);
            inner(b, w)
        })
        .unwrap();

        assert_eq!(waits.len(), 3);
        assert!(waits[0] > Duration::from_secs(4));
        assert!(waits[1] <= Duration::from_millis(50));
        assert!(waits[2] <= Duration::from_millis(50));
    }

    #[test]
    fn test_device_error_propagates() {
        let mut buf = [0u8; 8];
        let err = read_with_policy(&mut buf, &TimeoutPolicy::default(), |_, _| {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "device gone"))
        })
        .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_interrupted_read_is_retried() {
        let mut buf = [0u8; 8];
        let mut first = true;
        let mut inner = chunked(vec![vec![7]]);
        let n = read_with_policy(&mut buf, &TimeoutPolicy::default(), |b, w| {
            if std::mem::take(&mut first) {
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            inner(b, w)
        })
        .unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn test_huge_total_bound_does_not_overflow() {
        let policy = TimeoutPolicy {
            read_total_multiplier: Duration::from_millis(u64::MAX),
            ..TimeoutPolicy::default()
        };
        let mut buf = [0u8; 512];
        let n = read_with_policy(&mut buf, &policy, chunked(vec![vec![0x2a]])).unwrap();
        assert_eq!(&buf[..n], &[0x2a]);
    }

    proptest! {
        #[test]
        fn prop_receipt_order_preserved(
            chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..32), 0..16),
            capacity in 1usize..600,
        ) {
            let expected: Vec<u8> = chunks.iter().flatten().copied().take(capacity).collect();
            let mut buf = vec![0u8; capacity];
            let n = read_with_policy(&mut buf, &TimeoutPolicy::default(), chunked(chunks)).unwrap();
            prop_assert!(n <= capacity);
            prop_assert_eq!(&buf[..n], expected.as_slice());
        }
    }
}
