//! Scatter/gather helpers.

use std::io::{IoSlice, IoSliceMut};

/// Total number of bytes in a gather list.
pub fn total_len(bufs: &[IoSlice<'_>]) -> usize {
    bufs.iter().map(|buf| buf.len()).sum()
}

/// Total number of bytes a scatter list can hold.
pub fn capacity(bufs: &[IoSliceMut<'_>]) -> usize {
    bufs.iter().map(|buf| buf.len()).sum()
}

/// `header` followed by every buffer of `msg`.
pub fn prepend<'a>(header: &'a [u8], msg: &[IoSlice<'a>]) -> Vec<IoSlice<'a>> {
    let mut out = Vec::with_capacity(msg.len() + 1);
    out.push(IoSlice::new(header));
    out.extend_from_slice(msg);
    out
}

/// Borrow the first `len` bytes of a scatter list, in order.
///
/// Empty buffers are skipped. If `len` exceeds the list's capacity the
/// result covers the whole list.
pub fn cut_mut<'a>(bufs: &'a mut [IoSliceMut<'_>], len: usize) -> Vec<IoSliceMut<'a>> {
    let mut out = Vec::new();
    let mut left = len;
    for buf in bufs.iter_mut() {
        if left == 0 {
            break;
        }
        let take = left.min(buf.len());
        if take == 0 {
            continue;
        }
        out.push(IoSliceMut::new(&mut buf[..take]));
        left -= take;
    }
    out
}
