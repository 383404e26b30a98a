//! Drives one frame's LZW code stream through a [`BitReader`]/[`SubBlockReader`] pair and a
//! [`Dictionary`], pushing decoded pixel indices to a caller-supplied sink (the line
//! reassembler). This is the classic LZW decode loop; the dictionary's representation is
//! opaque to it beyond the [`Dictionary`] contract.

use crate::bitreader::BitReader;
use crate::config::TABLE_ENTRIES;
use crate::cursor::ByteCursor;
use crate::dict::Dictionary;
use crate::error::{DecodeReason, ErrorKind};
use crate::subblock::SubBlockReader;

const TABLE_ENTRIES_U16: u16 = TABLE_ENTRIES as u16;

/// Decodes one frame's worth of LZW-compressed pixel indices, calling `sink` once per decoded
/// byte. Stops cleanly on the end-of-information code or when the sub-block chain runs dry.
pub fn decode_frame<'a, D: Dictionary<'a>>(
    cursor: &mut ByteCursor,
    sub: &mut SubBlockReader,
    bits: &mut BitReader,
    dict: &mut D,
    mut sink: impl FnMut(u8) -> Result<(), ErrorKind>,
) -> Result<(), ErrorKind> {
    let mut oldcode: Option<u16> = None;

    loop {
        let code = match bits.read_code(sub, cursor)? {
            Some(c) => c,
            None => break,
        };

        if code == dict.clear_code() {
            dict.reset();
            bits.reset_codesize();
            oldcode = None;
            continue;
        }
        if code == dict.eoi_code() {
            break;
        }

        let Some(old) = oldcode else {
            if code >= dict.clear_code() {
                return Err(ErrorKind::Decode { offset: cursor.pos() as u32, reason: DecodeReason::UnexpectedNonRootCode });
            }
            sink(code as u8)?;
            oldcode = Some(code);
            continue;
        };

        let first_byte = if code < dict.next_code() {
            dict.emit_known(code, &mut sink)?
        } else if code == dict.next_code() {
            dict.emit_self_referential(old, &mut sink)?
        } else {
            return Err(ErrorKind::Decode {
                offset: cursor.pos() as u32,
                reason: DecodeReason::CodeOutOfRange { code, next_code: dict.next_code() },
            });
        };

        if dict.next_code() < TABLE_ENTRIES_U16 {
            dict.insert(old, first_byte)?;
            if dict.next_code() == (1u16 << bits.codesize()) {
                bits.increase_codesize();
            }
        }

        oldcode = Some(code);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LZW_WINDOW_LEN;
    use pretty_assertions::assert_eq;

    fn pack_codes(codes: &[(u16, u8)]) -> std::vec::Vec<u8> {
        let mut bitbuf: u32 = 0;
        let mut bitcount = 0u32;
        let mut bytes = std::vec::Vec::new();
        for &(code, width) in codes {
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

    /// A minimal stream over a 2-colour (min code size 2) image: clear, root 0, root 1, root 0,
    /// eoi. No table growth exercised, just the clear/root/eoi skeleton.
    #[test]
    fn decodes_roots_and_stops_at_eoi() {
        let clear = 4u16;
        let eoi = 5u16;
        // widens to 4 bits right after the 4th code (next_code reaches 8 == 1<<3)
        let data = pack_codes(&[(clear, 3), (0, 3), (1, 3), (0, 3), (eoi, 4)]);
        let mut cursor = ByteCursor::new(&data);
        let mut window = [0u8; LZW_WINDOW_LEN];
        let mut sub = SubBlockReader::new(&mut window);
        let mut bits = BitReader::new(3);

        let mut storage = std::vec![0u8; crate::config::dict_scratch_len()];
        let mut reverse_buf = std::vec![0u8; 8];
        let mut dict = crate::dict::ActiveDictionary::new(&mut storage, &mut reverse_buf, 2);

        let mut out = std::vec::Vec::new();
        decode_frame(&mut cursor, &mut sub, &mut bits, &mut dict, |b| Ok(out.push(b))).unwrap();
        assert_eq!(out, std::vec![0u8, 1, 0]);
    }

    #[test]
    fn mid_stream_clear_resets_table_growth() {
        let clear = 4u16;
        let eoi = 5u16;
        // root, root, clear, root, eoi -- the second root after clear must still decode cleanly
        let data = pack_codes(&[(clear, 3), (0, 3), (1, 3), (clear, 3), (0, 3), (eoi, 3)]);
        let mut cursor = ByteCursor::new(&data);
        let mut window = [0u8; LZW_WINDOW_LEN];
        let mut sub = SubBlockReader::new(&mut window);
        let mut bits = BitReader::new(3);

        let mut storage = std::vec![0u8; crate::config::dict_scratch_len()];
        let mut reverse_buf = std::vec![0u8; 8];
        let mut dict = crate::dict::ActiveDictionary::new(&mut storage, &mut reverse_buf, 2);

        let mut out = std::vec::Vec::new();
        decode_frame(&mut cursor, &mut sub, &mut bits, &mut dict, |b| Ok(out.push(b))).unwrap();
        assert_eq!(out, std::vec![0u8, 1, 0]);
    }

    #[test]
    fn out_of_range_code_is_decode_error() {
        let clear = 4u16;
        // root 0, then code 7: next_code is still 6 at this point (no insert has happened
        // yet), so 7 is neither a known entry nor the self-referential next_code case
        let data = pack_codes(&[(clear, 3), (0, 3), (7, 3)]);
        let mut cursor = ByteCursor::new(&data);
        let mut window = [0u8; LZW_WINDOW_LEN];
        let mut sub = SubBlockReader::new(&mut window);
        let mut bits = BitReader::new(3);

        let mut storage = std::vec![0u8; crate::config::dict_scratch_len()];
        let mut reverse_buf = std::vec![0u8; 8];
        let mut dict = crate::dict::ActiveDictionary::new(&mut storage, &mut reverse_buf, 2);

        let err = decode_frame(&mut cursor, &mut sub, &mut bits, &mut dict, |_b| Ok(())).unwrap_err();
        assert!(matches!(err, ErrorKind::Decode { reason: DecodeReason::CodeOutOfRange { .. }, .. }));
    }
}
