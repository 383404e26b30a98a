//! Chain-of-suffixes dictionary: one parent code and one suffix byte per table entry, walked
//! and reversed to emit. No growing byte pool, no bulk copies: every byte is produced one
//! table lookup at a time, which is what makes this representation easy to reason about.

use byteorder::{ByteOrder, LittleEndian};

use super::{Dictionary, SENTINEL};
use crate::config::TABLE_ENTRIES;
use crate::error::{DecodeReason, ErrorKind};

pub struct SafeDictionary<'a> {
    parent: &'a mut [u8],
    suffix: &'a mut [u8],
    reverse_buf: &'a mut [u8],
    clear_code: u16,
    eoi_code: u16,
    next_code: u16,
}

impl<'a> SafeDictionary<'a> {
    fn get_parent(&self, code: u16) -> u16 {
        LittleEndian::read_u16(&self.parent[code as usize * 2..code as usize * 2 + 2])
    }

    fn set_parent(&mut self, code: u16, value: u16) {
        LittleEndian::write_u16(&mut self.parent[code as usize * 2..code as usize * 2 + 2], value);
    }

    fn get_suffix(&self, code: u16) -> u8 {
        self.suffix[code as usize]
    }

    fn set_suffix(&mut self, code: u16, value: u8) {
        self.suffix[code as usize] = value;
    }
}

impl<'a> Dictionary<'a> for SafeDictionary<'a> {
    fn new(storage: &'a mut [u8], reverse_buf: &'a mut [u8], min_code_size: u8) -> Self {
        let (parent, suffix) = storage.split_at_mut(TABLE_ENTRIES * 2);
        let clear_code = 1u16 << min_code_size;
        let mut dict = SafeDictionary { parent, suffix, reverse_buf, clear_code, eoi_code: clear_code + 1, next_code: 0 };
        dict.reset();
        dict
    }

    fn reset(&mut self) {
        for c in 0..self.clear_code {
            self.set_parent(c, SENTINEL);
            self.set_suffix(c, c as u8);
        }
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
        let mut idx = code;
        let mut depth = 0usize;
        let first_byte = loop {
            if depth >= self.reverse_buf.len() {
                return Err(ErrorKind::Decode { offset: 0, reason: DecodeReason::ReverseBufferOverflow });
            }
            let suf = self.get_suffix(idx);
            self.reverse_buf[depth] = suf;
            depth += 1;
            let parent = self.get_parent(idx);
            if parent == SENTINEL {
                break suf;
            }
            idx = parent;
        };
        while depth > 0 {
            depth -= 1;
            sink(self.reverse_buf[depth])?;
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
        let code = self.next_code;
        self.set_parent(code, oldcode);
        self.set_suffix(code, first_byte);
        self.next_code += 1;
        Ok(())
    }
}
