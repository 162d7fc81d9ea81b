//! End-to-end usage scenarios for `GrowBuffer`, exercised through the public API only.

#![allow(clippy::indexing_slicing, reason = "panic is fine in tests")]

use grow_buffer::{GrowBuffer, StorageKind};

#[test]
fn stack_buffer_moves_to_heap_once_outgrown() {
    let mut stack = [0_u8; 8];
    let mut buf = GrowBuffer::borrowed(&mut stack);

    buf.append_str_nul("liigo").unwrap();

    assert_eq!(buf.as_slice(), b"liigo\0");
    assert_eq!(buf.len(), 6);
    assert_eq!(buf.capacity(), 8);
    assert_eq!(buf.storage_kind(), StorageKind::Borrowed);

    buf.append_bytes(b"23").unwrap();
    assert_eq!(buf.len(), 8);
    assert_eq!(buf.storage_kind(), StorageKind::Borrowed);

    buf.append_zeros(1).unwrap();
    assert_eq!(buf.storage_kind(), StorageKind::Owned);
    assert_eq!(buf.capacity(), 16);
    assert_eq!(buf.as_slice(), b"liigo\023\0");

    // Writes after promotion no longer reach the stack array.
    buf.offset_mut(0)[0] = b'L';

    drop(buf);
    assert_eq!(&stack, b"liigo\023");
}

#[test]
fn growth_from_zero_capacity_follows_doubling_policy() {
    let mut buf = GrowBuffer::new();
    assert_eq!(buf.capacity(), 0);

    buf.append_str("dummy").unwrap();
    assert_eq!(buf.capacity(), 5);

    buf.append_zeros(1).unwrap();
    assert_eq!(buf.capacity(), 10);

    buf.append_bytes(&[1; 5]).unwrap();
    assert_eq!(buf.capacity(), 20);
    assert_eq!(buf.len(), 11);
}

#[test]
fn exchange_between_default_and_sized_buffers() {
    let mut a = GrowBuffer::new();
    a.append_str_nul("123").unwrap();

    let mut b = GrowBuffer::with_capacity(8).unwrap();
    b.append_str_nul("abcde").unwrap();

    a.exchange(&mut b);

    assert_eq!(a.as_slice(), b"abcde\0");
    assert_eq!(a.len(), 6);
    assert_eq!(b.as_slice(), b"123\0");
    assert_eq!(b.len(), 4);

    a.exchange(&mut b);

    assert_eq!(a.as_slice(), b"123\0");
    assert_eq!(b.as_slice(), b"abcde\0");
}

#[test]
fn appends_concatenate_and_report_offsets() {
    let mut stack = [0_u8; 4];
    let mut buf = GrowBuffer::borrowed(&mut stack);

    let offsets = ["ab", "cde", "f", "ghijkl"]
        .into_iter()
        .map(|part| buf.append_str(part).unwrap())
        .collect::<Vec<_>>();

    assert_eq!(offsets, [0, 2, 5, 6]);
    assert_eq!(buf.as_slice(), b"abcdefghijkl");
    assert_eq!(buf.storage_kind(), StorageKind::Owned);
}

#[test]
fn detached_bytes_do_not_alias_buffer() {
    let mut buf = GrowBuffer::new();
    buf.append_str("first").unwrap();

    let detached = buf.detach();
    assert!(buf.is_empty());

    buf.append_str("second").unwrap();

    assert_eq!(detached, b"first");
    assert_eq!(buf.as_slice(), b"second");
}

#[test]
fn detach_from_stack_copies_and_leaves_stack_alone() {
    let mut stack = [0_u8; 16];

    let detached = {
        let mut buf = GrowBuffer::borrowed(&mut stack);
        buf.append_str("on the stack").unwrap();
        buf.detach()
    };

    assert_eq!(detached, b"on the stack");
    assert_eq!(detached.len(), 12);
    assert_eq!(&stack[..12], b"on the stack");
}

#[test]
fn reserve_preserves_content_across_promotion() {
    let mut stack = [0_u8; 4];
    let mut buf = GrowBuffer::borrowed(&mut stack);
    buf.append_str("abc").unwrap();

    buf.reserve(100).unwrap();

    assert!(buf.capacity() >= 103);
    assert_eq!(buf.as_slice(), b"abc");
    assert_eq!(buf.storage_kind(), StorageKind::Owned);
}

#[test]
fn edit_in_the_middle() {
    let mut buf = GrowBuffer::new();
    buf.append_str("hello world").unwrap();

    buf.remove(5, 6);
    buf.insert(5, b", there").unwrap();
    buf.insert(0, b">> ").unwrap();

    assert_eq!(buf.as_slice(), b">> hello, there");

    buf.offset_mut(3)[0] = b'H';
    assert_eq!(buf.offset(3), b"Hello, there");
}

#[test]
fn move_from_transfers_heap_content() {
    let mut source = GrowBuffer::new();
    source.append_str("content").unwrap();
    let ptr = source.as_slice().as_ptr();

    let target = GrowBuffer::move_from(&mut source);

    assert_eq!(target.as_slice(), b"content");
    assert_eq!(target.as_slice().as_ptr(), ptr);
    assert!(source.is_empty());
    assert_eq!(source.capacity(), 0);
}

#[test]
fn buffers_move_between_threads() {
    let mut buf = GrowBuffer::new();
    buf.append_str("sent").unwrap();

    let buf = std::thread::spawn(move || {
        buf.append_str(" back").unwrap();
        buf
    })
    .join()
    .unwrap();

    assert_eq!(buf.as_slice(), b"sent back");
}
