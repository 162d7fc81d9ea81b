use crate::{GrowBuffer, Storage};

impl GrowBuffer<'_> {
    /// Swaps the content of two buffers, whatever storage each of them uses.
    ///
    /// * Two owned buffers swap their heap allocations in O(1).
    /// * Two borrowed buffers swap bytes in place when each storage can hold the other's
    ///   content. The copy goes through a scratch allocation of the smaller of the two
    ///   contents. Both buffers stay borrowed.
    /// * In every other case both buffers end up owned. An owned buffer's heap allocation is
    ///   handed to the other side as-is, while borrowed content (which cannot be handed over)
    ///   is copied into an exactly-sized heap allocation.
    ///
    /// Exchanging twice restores the original content and length of both buffers. The
    /// storage kind is not necessarily restored: a borrowed buffer that had to move to the
    /// heap stays there.
    ///
    /// # Examples
    ///
    /// ```
    /// use grow_buffer::{GrowBuffer, StorageKind};
    ///
    /// let mut local = [0_u8; 8];
    /// let mut a = GrowBuffer::borrowed(&mut local);
    /// a.append_str_nul("abc").unwrap();
    ///
    /// let mut b = GrowBuffer::new();
    /// b.append_str_nul("12345").unwrap();
    ///
    /// a.exchange(&mut b);
    ///
    /// assert_eq!(a.as_slice(), b"12345\0");
    /// assert_eq!(b.as_slice(), b"abc\0");
    /// assert_eq!(a.storage_kind(), StorageKind::Owned);
    /// assert_eq!(b.storage_kind(), StorageKind::Owned);
    /// ```
    pub fn exchange(&mut self, other: &mut GrowBuffer<'_>) {
        let self_len = self.len();
        let other_len = other.len();

        match (self.storage_mut(), other.storage_mut()) {
            (Storage::Borrowed(mine), Storage::Borrowed(theirs))
                if mine.len() >= other_len && theirs.len() >= self_len =>
            {
                swap_in_place(mine, self_len, theirs, other_len);
            }
            _ => {
                let mine = self.storage_mut().take_owned(self_len);
                let theirs = other.storage_mut().take_owned(other_len);

                *self.storage_mut() = Storage::Owned(theirs);
                *other.storage_mut() = Storage::Owned(mine);
            }
        }

        self.set_len(other_len);
        other.set_len(self_len);
    }
}

/// Swaps the first `a_len` bytes of `a` with the first `b_len` bytes of `b`.
///
/// Both slices must be large enough to hold the other's content.
fn swap_in_place(a: &mut [u8], a_len: usize, b: &mut [u8], b_len: usize) {
    if a_len > b_len {
        swap_in_place(b, b_len, a, a_len);
        return;
    }

    // `a` holds the smaller content, so that is what goes into the scratch area.
    let scratch = a
        .get(..a_len)
        .expect("caller guarantees content fits into storage")
        .to_vec();

    a.get_mut(..b_len)
        .expect("caller guarantees other content fits into storage")
        .copy_from_slice(
            b.get(..b_len)
                .expect("caller guarantees content fits into storage"),
        );

    b.get_mut(..a_len)
        .expect("caller guarantees other content fits into storage")
        .copy_from_slice(&scratch);
}
