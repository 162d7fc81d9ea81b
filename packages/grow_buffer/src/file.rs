//! Saving buffer content to files and loading file content into buffers.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

use crate::GrowBuffer;

impl GrowBuffer<'_> {
    /// Writes `bom` followed by the buffer content to `path`, replacing any existing file.
    ///
    /// Returns the number of content bytes written, not counting `bom`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn save_to_file(&self, path: impl AsRef<Path>, bom: &[u8]) -> io::Result<usize> {
        let mut file = File::create(path)?;

        file.write_all(bom)?;
        file.write_all(self.as_slice())?;
        file.flush()?;

        Ok(self.len())
    }

    /// Appends the buffer content to the end of the file at `path`, creating it if needed.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or written.
    pub fn append_to_file(&self, path: impl AsRef<Path>) -> io::Result<usize> {
        let mut file = OpenOptions::new().append(true).create(true).open(path)?;

        file.write_all(self.as_slice())?;
        file.flush()?;

        Ok(self.len())
    }

    /// Appends the content of the file at `path` to the buffer, optionally followed by a
    /// single zero byte.
    ///
    /// The file is read straight into the spare capacity of the buffer. Returns the number
    /// of bytes read from the file, not counting the zero byte.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the buffer cannot grow to hold it.
    /// Bytes read before the error remain in the buffer.
    ///
    /// # Examples
    ///
    /// ```
    /// use grow_buffer::GrowBuffer;
    ///
    /// # let dir = tempfile::tempdir().unwrap();
    /// # let path = dir.path().join("greeting.txt");
    /// # std::fs::write(&path, "hello").unwrap();
    /// let mut buf = GrowBuffer::new();
    /// let read = buf.load_from_file(&path, true).unwrap();
    ///
    /// assert_eq!(read, 5);
    /// assert_eq!(buf.as_slice(), b"hello\0");
    /// ```
    pub fn load_from_file(
        &mut self,
        path: impl AsRef<Path>,
        append_nul: bool,
    ) -> io::Result<usize> {
        let mut file = File::open(path)?;

        let file_len = usize::try_from(file.metadata()?.len()).map_err(io::Error::other)?;

        let extra = if append_nul {
            file_len.checked_add(1).ok_or_else(|| {
                io::Error::new(io::ErrorKind::OutOfMemory, "file too large to load")
            })?
        } else {
            file_len
        };

        self.reserve(extra)?;

        let mut read_total: usize = 0;

        while read_total < file_len {
            // Cannot underflow: guarded by loop condition.
            let remaining = file_len.wrapping_sub(read_total);

            let target = self
                .spare_capacity_mut()
                .get_mut(..remaining)
                .expect("guarded by reserve() above");

            let read = match file.read(target) {
                Ok(0) => break,
                Ok(read) => read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            self.advance(read);
            // Cannot overflow: bounded by file_len.
            read_total = read_total.wrapping_add(read);
        }

        if append_nul {
            self.append_zeros(1)?;
        }

        Ok(read_total)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fs;

    use crate::GrowBuffer;

    #[test]
    fn save_writes_bom_and_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        let mut buf = GrowBuffer::new();
        buf.append_str("text").unwrap();

        let written = buf.save_to_file(&path, &[0xEF, 0xBB, 0xBF]).unwrap();

        assert_eq!(written, 4);
        assert_eq!(fs::read(&path).unwrap(), b"\xEF\xBB\xBFtext");
    }

    #[test]
    fn save_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "a much longer previous content").unwrap();

        let mut buf = GrowBuffer::new();
        buf.append_str("new").unwrap();
        buf.save_to_file(&path, &[]).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn append_to_file_extends_and_creates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");

        let mut buf = GrowBuffer::new();
        buf.append_str("line;").unwrap();

        assert_eq!(buf.append_to_file(&path).unwrap(), 5);
        assert_eq!(buf.append_to_file(&path).unwrap(), 5);

        assert_eq!(fs::read(&path).unwrap(), b"line;line;");
    }

    #[test]
    fn load_appends_to_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.bin");
        fs::write(&path, [1_u8, 2, 3]).unwrap();

        let mut buf = GrowBuffer::new();
        buf.append_u8(0xFF).unwrap();

        let read = buf.load_from_file(&path, false).unwrap();

        assert_eq!(read, 3);
        assert_eq!(buf.as_slice(), &[0xFF_u8, 1, 2, 3]);
    }

    #[test]
    fn load_into_borrowed_that_fits_stays_borrowed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.txt");
        fs::write(&path, "abc").unwrap();

        let mut local = [0_u8; 8];
        let mut buf = GrowBuffer::borrowed(&mut local);

        buf.load_from_file(&path, true).unwrap();

        assert_eq!(buf.as_slice(), b"abc\0");
        assert!(buf.is_borrowed());
    }

    #[test]
    fn load_empty_file_with_nul() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, "").unwrap();

        let mut buf = GrowBuffer::new();

        assert_eq!(buf.load_from_file(&path, true).unwrap(), 0);
        assert_eq!(buf.as_slice(), b"\0");
    }

    #[test]
    fn load_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();

        let mut buf = GrowBuffer::new();
        let result = buf.load_from_file(dir.path().join("missing"), false);

        assert!(result.is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn save_and_load_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");

        let mut original = GrowBuffer::new();
        for value in 0..1000_u32 {
            original.append_u32(value).unwrap();
        }
        original.save_to_file(&path, &[]).unwrap();

        let mut loaded = GrowBuffer::new();
        loaded.load_from_file(&path, false).unwrap();

        assert_eq!(loaded.as_slice(), original.as_slice());
    }
}
