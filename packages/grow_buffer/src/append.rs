use std::io;

use crate::{GrowBuffer, Result};

macro_rules! append_native {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            #[doc = concat!(
                "Appends a `", stringify!($ty), "` in native byte order and returns the offset ",
                "at which it was written."
            )]
            ///
            /// # Errors
            ///
            /// Returns an error if the buffer has to grow and growth fails.
            pub fn $name(&mut self, value: $ty) -> Result<usize> {
                self.append_bytes(&value.to_ne_bytes())
            }
        )*
    };
}

impl GrowBuffer<'_> {
    append_native! {
        append_u8 => u8,
        append_u16 => u16,
        append_i16 => i16,
        append_u32 => u32,
        append_i32 => i32,
        append_u64 => u64,
        append_i64 => i64,
        append_usize => usize,
        append_f32 => f32,
        append_f64 => f64,
    }

    /// Appends the UTF-8 bytes of `text` and returns the offset at which they were written.
    ///
    /// Appending an empty string is a no-op that returns the current length.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer has to grow and growth fails.
    pub fn append_str(&mut self, text: &str) -> Result<usize> {
        if text.is_empty() {
            return Ok(self.len());
        }

        self.append_bytes(text.as_bytes())
    }

    /// Appends the UTF-8 bytes of `text` followed by a single zero byte and returns the
    /// offset at which the text was written.
    ///
    /// The buffer grows at most once for the text and its terminator together.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer has to grow and growth fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use grow_buffer::GrowBuffer;
    ///
    /// let mut buf = GrowBuffer::new();
    /// buf.append_str_nul("liigo").unwrap();
    ///
    /// assert_eq!(buf.as_slice(), b"liigo\0");
    /// assert_eq!(buf.capacity(), 6);
    /// ```
    pub fn append_str_nul(&mut self, text: &str) -> Result<usize> {
        // Cannot overflow: a str never exceeds isize::MAX bytes.
        self.reserve(text.len().wrapping_add(1))?;

        let offset = self.append_str(text)?;
        self.append_zeros(1)?;

        Ok(offset)
    }
}

impl io::Write for GrowBuffer<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        self.append_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io::Write;

    use crate::GrowBuffer;

    #[test]
    fn typed_appends_use_native_byte_order() {
        let mut buf = GrowBuffer::new();

        assert_eq!(buf.append_u8(1).unwrap(), 0);
        assert_eq!(buf.append_u16(0x0203).unwrap(), 1);
        assert_eq!(buf.append_i32(-4).unwrap(), 3);
        assert_eq!(buf.append_f64(1.5).unwrap(), 7);
        assert_eq!(buf.len(), 15);

        assert_eq!(buf.offset(1)[..2], 0x0203_u16.to_ne_bytes());
        assert_eq!(buf.offset(3)[..4], (-4_i32).to_ne_bytes());
        assert_eq!(buf.offset(7)[..8], 1.5_f64.to_ne_bytes());
    }

    #[test]
    fn append_str_returns_offset() {
        let mut buf = GrowBuffer::new();

        assert_eq!(buf.append_str("abc").unwrap(), 0);
        assert_eq!(buf.append_str("def").unwrap(), 3);
        assert_eq!(buf.as_slice(), b"abcdef");
    }

    #[test]
    fn append_empty_str_is_noop() {
        let mut buf = GrowBuffer::new();
        buf.append_str("abc").unwrap();

        assert_eq!(buf.append_str("").unwrap(), 3);
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn append_empty_str_nul_adds_terminator() {
        let mut buf = GrowBuffer::new();

        assert_eq!(buf.append_str_nul("").unwrap(), 0);
        assert_eq!(buf.as_slice(), b"\0");
    }

    #[test]
    fn append_str_nul_grows_once() {
        let mut local = [0_u8; 4];
        let mut buf = GrowBuffer::borrowed(&mut local);
        buf.append_str("ab").unwrap();

        buf.append_str_nul("cdef").unwrap();

        assert_eq!(buf.as_slice(), b"abcdef\0");
        assert_eq!(buf.capacity(), 8);
    }

    #[test]
    fn write_appends() {
        let mut buf = GrowBuffer::new();

        write!(buf, "{}-{}", 12, "ab").unwrap();
        buf.write_all(b"!").unwrap();
        buf.flush().unwrap();

        assert_eq!(buf.as_slice(), b"12-ab!");
    }

    #[test]
    fn write_empty_writes_nothing() {
        let mut buf = GrowBuffer::new();

        assert_eq!(buf.write(&[]).unwrap(), 0);
        assert!(buf.is_empty());
    }
}
