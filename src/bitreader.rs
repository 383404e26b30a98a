//! Variable-width LZW code reader. Pulls 3..12 bit codes out of the sub-block reader's
//! window via a 32-bit little-endian accumulator, refilling from the current byte pointer
//! whenever fewer than `codesize` unread bits remain.

use crate::config::MAX_CODE_SIZE;
use crate::cursor::ByteCursor;
use crate::error::ErrorKind;
use crate::subblock::SubBlockReader;

pub struct BitReader {
    codesize: u8,
    initial_codesize: u8,
    bitnum: u8,
    accum: u32,
    needs_refill: bool,
}

impl BitReader {
    pub fn new(initial_codesize: u8) -> Self {
        BitReader {
            codesize: initial_codesize,
            initial_codesize,
            bitnum: 0,
            accum: 0,
            needs_refill: true,
        }
    }

    pub fn codesize(&self) -> u8 {
        self.codesize
    }

    pub fn reset_codesize(&mut self) {
        self.codesize = self.initial_codesize;
    }

    /// Widens the code by one bit, capped at [`MAX_CODE_SIZE`]. Once capped, further growth
    /// requests are silently ignored and the maximum width keeps being reused.
    pub fn increase_codesize(&mut self) {
        if self.codesize < MAX_CODE_SIZE {
            self.codesize += 1;
        }
    }

    fn refill(&mut self, sub: &mut SubBlockReader, cursor: &mut ByteCursor) -> Result<(), ErrorKind> {
        sub.fill(cursor)?;
        let avail = sub.available_bytes();
        let mut tmp = [0u8; 4];
        let n = avail.len().min(4);
        tmp[..n].copy_from_slice(&avail[..n]);
        self.accum = u32::from_le_bytes(tmp);
        self.needs_refill = false;
        Ok(())
    }

    /// Fetches the next code, refilling the accumulator from `sub`/`cursor` as needed. Returns
    /// `Ok(None)` once the sub-block chain is exhausted with no further bits to give.
    pub fn read_code(&mut self, sub: &mut SubBlockReader, cursor: &mut ByteCursor) -> Result<Option<u16>, ErrorKind> {
        if self.needs_refill || self.bitnum as u32 + self.codesize as u32 > 32 {
            if !self.needs_refill {
                let advance_bytes = (self.bitnum / 8) as usize;
                sub.consume(advance_bytes);
                self.bitnum %= 8;
            }
            self.refill(sub, cursor)?;
            if sub.is_end_of_frame() && sub.available_bytes().is_empty() {
                return Ok(None);
            }
        }

        let mask = (1u32 << self.codesize) - 1;
        let code = ((self.accum >> self.bitnum) & mask) as u16;
        self.bitnum += self.codesize;
        Ok(Some(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Packs `codes` LSB-first at `width` bits each, GIF sub-block framed, then decodes them
    /// back out through [`BitReader`] and checks round-trip fidelity.
    fn pack(codes: &[u16], width: u8) -> std::vec::Vec<u8> {
        let mut bitbuf: u32 = 0;
        let mut bitcount = 0u32;
        let mut bytes = std::vec::Vec::new();
        for &code in codes {
            bitbuf |= (code as u32) << bitcount;
            bitcount += width as u32;
            while bitcount >= 8 {
                bytes.push((bitbuf & 0xff) as u8);
                bitbuf >>= 8;
                bitcount -= 8;
            }
        }
        if bitcount > 0 {
            bytes.push((bitbuf & 0xff) as u8);
        }
        let mut out = std::vec::Vec::new();
        out.push(bytes.len() as u8);
        out.extend_from_slice(&bytes);
        out.push(0);
        out
    }

    #[test]
    fn reads_fixed_width_codes() {
        let codes = [3u16, 1, 2, 3, 0];
        let data = pack(&codes, 3);
        let mut cursor = ByteCursor::new(&data);
        let mut window = [0u8; crate::config::LZW_WINDOW_LEN];
        let mut sub = SubBlockReader::new(&mut window);
        let mut bits = BitReader::new(3);

        let mut out = std::vec::Vec::new();
        while let Some(code) = bits.read_code(&mut sub, &mut cursor).unwrap() {
            out.push(code);
            if out.len() == codes.len() {
                break;
            }
        }
        assert_eq!(out, codes);
    }

    #[test]
    fn widens_code_size_mid_stream() {
        // 4 codes at width 3, then widen to 4 bits for one more code
        let mut bitbuf: u32 = 0;
        let mut bitcount = 0u32;
        let mut bytes = std::vec::Vec::new();
        let mut push_code = |code: u16, width: u32| {
            bitbuf |= (code as u32) << bitcount;
            bitcount += width;
            while bitcount >= 8 {
                bytes.push((bitbuf & 0xff) as u8);
                bitbuf >>= 8;
                bitcount -= 8;
            }
        };
        push_code(5, 3);
        push_code(9, 4);
        if bitcount > 0 {
            bytes.push((bitbuf & 0xff) as u8);
        }
        let mut data = std::vec::Vec::new();
        data.push(bytes.len() as u8);
        data.extend_from_slice(&bytes);
        data.push(0);

        let mut cursor = ByteCursor::new(&data);
        let mut window = [0u8; crate::config::LZW_WINDOW_LEN];
        let mut sub = SubBlockReader::new(&mut window);
        let mut bits = BitReader::new(3);

        assert_eq!(bits.read_code(&mut sub, &mut cursor).unwrap(), Some(5));
        bits.increase_codesize();
        assert_eq!(bits.read_code(&mut sub, &mut cursor).unwrap(), Some(9));
    }
}
