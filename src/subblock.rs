//! Sub-block reader: reassembles the GIF sub-block chain (length-prefixed chunks of
//! 1..255 bytes, terminated by a zero-length chunk) into a contiguous byte stream, buffered in
//! a fixed scratch window.

use crate::config::MAX_SUB_BLOCK_LEN;
use crate::cursor::ByteCursor;
use crate::error::ErrorKind;

/// Reassembles one frame's LZW sub-block chain into `window`, compacting and refilling as the
/// bit reader consumes it. `window` must be at least [`crate::config::LZW_WINDOW_LEN`] bytes.
pub struct SubBlockReader<'scratch> {
    window: &'scratch mut [u8],
    read_off: usize,
    data_len: usize,
    end_of_frame: bool,
}

impl<'scratch> SubBlockReader<'scratch> {
    pub fn new(window: &'scratch mut [u8]) -> Self {
        SubBlockReader { window, read_off: 0, data_len: 0, end_of_frame: false }
    }

    pub fn reset(&mut self) {
        self.read_off = 0;
        self.data_len = 0;
        self.end_of_frame = false;
    }

    #[inline]
    pub fn available(&self) -> usize {
        self.data_len - self.read_off
    }

    pub fn available_bytes(&self) -> &[u8] {
        &self.window[self.read_off..self.data_len]
    }

    pub fn is_end_of_frame(&self) -> bool {
        self.end_of_frame && self.available() == 0
    }

    /// Marks `n` bytes (already returned via [`Self::available_bytes`]) as consumed.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(self.read_off + n <= self.data_len);
        self.read_off += n;
    }

    /// Tops up the window from `cursor` if fewer than one full sub-block's worth of data
    /// remains unread. No-op once the zero-length terminator has been seen and everything
    /// buffered before it has been consumed.
    pub fn fill(&mut self, cursor: &mut ByteCursor) -> Result<(), ErrorKind> {
        if self.end_of_frame || self.available() >= MAX_SUB_BLOCK_LEN {
            return Ok(());
        }

        if self.read_off > 0 {
            self.window.copy_within(self.read_off..self.data_len, 0);
            self.data_len -= self.read_off;
            self.read_off = 0;
        }

        while self.available() < MAX_SUB_BLOCK_LEN && self.data_len + MAX_SUB_BLOCK_LEN <= self.window.len() {
            let len = cursor.read_u8()? as usize;
            if len == 0 {
                self.end_of_frame = true;
                break;
            }
            let payload = cursor.read_bytes(len)?;
            self.window[self.data_len..self.data_len + len].copy_from_slice(payload);
            self.data_len += len;
        }
        Ok(())
    }

    /// Skips any remaining sub-blocks for this frame without buffering them, used when a frame
    /// is abandoned mid-stream (e.g. after the EOI code arrives with trailing padding blocks).
    pub fn skip_to_terminator(&mut self, cursor: &mut ByteCursor) -> Result<(), ErrorKind> {
        if self.end_of_frame {
            return Ok(());
        }
        // whatever is already buffered is simply dropped
        self.read_off = self.data_len;
        loop {
            let len = cursor.read_u8()? as usize;
            if len == 0 {
                break;
            }
            cursor.skip(len)?;
        }
        self.end_of_frame = true;
        Ok(())
    }
}
