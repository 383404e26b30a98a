//! String-table dictionary: each code stores an offset+length into a shared byte pool instead
//! of a single suffix byte, so emission can bulk-copy a whole run of bytes at once instead of
//! walking one table lookup per byte.
//!
//! Growing the table cheaply without copying the same bytes over and over is the interesting
//! part. Three cases, cheapest first:
//!
//! - The common case for a run of similar codes: the entry being extended sits at the very end
//!   of the pool already (nothing has been written since), so the new byte is appended in
//!   place and the entry's length just grows by one. No copy at all.
//! - If it isn't at the tail but its bytes are still valid where they are, the new entry shares
//!   that same pool range by reference and carries its one extra byte inline in the
//!   offset/flags word (bit 23 set, byte in bits 24..31), the "typically inherits the old
//!   entry's offset" path.
//! - If the entry being extended is itself one of those inline-flagged entries, it has to be
//!   flattened into real contiguous pool bytes before it can be shared again. That flatten also
//!   heals the entry in place, so the same code is never flattened twice.
//!
//! Root codes (`< clear_code`) aren't pool-resident at all until something extends them, at
//! which point their single byte is copied in lazily.

use byteorder::{ByteOrder, LittleEndian};

use super::Dictionary;
use crate::config::TABLE_ENTRIES;
use crate::error::{DecodeReason, ErrorKind};

const HAS_SUFFIX_BIT: u32 = 1 << 23;
const OFFSET_MASK: u32 = 0x007F_FFFF;

pub struct TurboDictionary<'a> {
    offset_flags: &'a mut [u8],
    length: &'a mut [u8],
    initial_suffix: &'a mut [u8],
    pool: &'a mut [u8],
    pool_len: usize,
    clear_code: u16,
    eoi_code: u16,
    next_code: u16,
}

impl<'a> TurboDictionary<'a> {
    fn get_offset_flags(&self, code: u16) -> u32 {
        LittleEndian::read_u32(&self.offset_flags[code as usize * 4..code as usize * 4 + 4])
    }

    fn set_offset_flags(&mut self, code: u16, value: u32) {
        LittleEndian::write_u32(&mut self.offset_flags[code as usize * 4..code as usize * 4 + 4], value);
    }

    fn get_length(&self, code: u16) -> u16 {
        LittleEndian::read_u16(&self.length[code as usize * 2..code as usize * 2 + 2])
    }

    fn set_length(&mut self, code: u16, value: u16) {
        LittleEndian::write_u16(&mut self.length[code as usize * 2..code as usize * 2 + 2], value);
    }

    fn push_pool(&mut self, byte: u8) -> Result<usize, ErrorKind> {
        if self.pool_len >= self.pool.len() {
            return Err(ErrorKind::Decode { offset: 0, reason: DecodeReason::TurboPoolOverrun });
        }
        let pos = self.pool_len;
        self.pool[pos] = byte;
        self.pool_len += 1;
        Ok(pos)
    }

    fn copy_pool_range(&mut self, src_offset: usize, len: usize) -> Result<usize, ErrorKind> {
        if self.pool_len + len > self.pool.len() {
            return Err(ErrorKind::Decode { offset: 0, reason: DecodeReason::TurboPoolOverrun });
        }
        let dest = self.pool_len;
        self.pool.copy_within(src_offset..src_offset + len, dest);
        self.pool_len += len;
        Ok(dest)
    }

    /// Resolves `code`'s current pool-backed span, materialising a root's literal byte lazily
    /// on first use. Does not resolve any pending inline suffix byte.
    fn materialized_span(&mut self, code: u16) -> Result<(usize, usize), ErrorKind> {
        if code < self.clear_code {
            let offset = self.push_pool(self.initial_suffix[code as usize])?;
            return Ok((offset, 1));
        }
        let word = self.get_offset_flags(code);
        Ok(((word & OFFSET_MASK) as usize, self.get_length(code) as usize))
    }
}

impl<'a> Dictionary<'a> for TurboDictionary<'a> {
    fn new(storage: &'a mut [u8], _reverse_buf: &'a mut [u8], min_code_size: u8) -> Self {
        let (offset_flags, rest) = storage.split_at_mut(TABLE_ENTRIES * 4);
        let (length, rest) = rest.split_at_mut(TABLE_ENTRIES * 2);
        let (initial_suffix, pool) = rest.split_at_mut(crate::config::MAX_COLORS);
        let clear_code = 1u16 << min_code_size;
        let mut dict = TurboDictionary {
            offset_flags,
            length,
            initial_suffix,
            pool,
            pool_len: 0,
            clear_code,
            eoi_code: clear_code + 1,
            next_code: 0,
        };
        dict.reset();
        dict
    }

    fn reset(&mut self) {
        for c in 0..self.clear_code {
            self.initial_suffix[c as usize] = c as u8;
        }
        self.pool_len = 0;
        self.next_code = self.eoi_code + 1;
    }

    fn clear_code(&self) -> u16 {
        self.clear_code
    }

    fn eoi_code(&self) -> u16 {
        self.eoi_code
    }

    fn next_code(&self) -> u16 {
        self.next_code
    }

    fn emit_known(&mut self, code: u16, mut sink: impl FnMut(u8) -> Result<(), ErrorKind>) -> Result<u8, ErrorKind> {
        if code < self.clear_code {
            let b = self.initial_suffix[code as usize];
            sink(b)?;
            return Ok(b);
        }
        let word = self.get_offset_flags(code);
        let offset = (word & OFFSET_MASK) as usize;
        let len = self.get_length(code) as usize;
        let has_suffix = word & HAS_SUFFIX_BIT != 0;

        let first_byte = if len > 0 {
            self.pool[offset]
        } else if has_suffix {
            (word >> 24) as u8
        } else {
            return Err(ErrorKind::Decode { offset: 0, reason: DecodeReason::CodeOutOfRange { code, next_code: self.next_code } });
        };
        for &b in &self.pool[offset..offset + len] {
            sink(b)?;
        }
        if has_suffix {
            sink((word >> 24) as u8)?;
        }
        Ok(first_byte)
    }

    fn emit_self_referential(
        &mut self,
        oldcode: u16,
        mut sink: impl FnMut(u8) -> Result<(), ErrorKind>,
    ) -> Result<u8, ErrorKind> {
        let first_byte = self.emit_known(oldcode, &mut sink)?;
        sink(first_byte)?;
        Ok(first_byte)
    }

    fn insert(&mut self, oldcode: u16, first_byte: u8) -> Result<(), ErrorKind> {
        let new_code = self.next_code;

        let (offset, len) = if oldcode < self.clear_code {
            self.materialized_span(oldcode)?
        } else {
            let word = self.get_offset_flags(oldcode);
            let has_suffix = word & HAS_SUFFIX_BIT != 0;
            let offset = (word & OFFSET_MASK) as usize;
            let len = self.get_length(oldcode) as usize;
            if has_suffix {
                // `oldcode` is itself a pending inline-suffix entry: flatten it into real pool
                // bytes, healing it in place so it is never flattened again.
                let suffix_byte = (word >> 24) as u8;
                let flat_offset = self.copy_pool_range(offset, len)?;
                self.push_pool(suffix_byte)?;
                let flat_len = len + 1;
                self.set_offset_flags(oldcode, flat_offset as u32);
                self.set_length(oldcode, flat_len as u16);
                (flat_offset, flat_len)
            } else {
                (offset, len)
            }
        };

        if offset + len == self.pool_len {
            // tail-adjacent: extend in place, no copy at all
            self.push_pool(first_byte)?;
            self.set_offset_flags(new_code, offset as u32);
            self.set_length(new_code, (len + 1) as u16);
        } else {
            // shares the existing bytes by reference; the new byte rides along as a flag
            self.set_offset_flags(new_code, (offset as u32 & OFFSET_MASK) | HAS_SUFFIX_BIT | ((first_byte as u32) << 24));
            self.set_length(new_code, len as u16);
        }
        self.next_code += 1;
        Ok(())
    }
}
