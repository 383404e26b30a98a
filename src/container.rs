//! GIF container parsing: header, logical screen descriptor, colour tables, and the per-block
//! extension/image/trailer readers the top-level decoder drives its state machine with.
//!
//! Each `read_*` function consumes exactly the bytes of the block it names from `cursor` and
//! leaves the cursor positioned at the start of the next block. None of them loop across
//! blocks; the driving loop lives in [`crate::decoder`].

use crate::config::MAX_COLORS;
use crate::cursor::ByteCursor;
use crate::error::{BadFileDetail, ErrorKind, InvalidParamReason};

pub const SEPARATOR_EXTENSION: u8 = 0x21;
pub const SEPARATOR_IMAGE: u8 = 0x2C;
pub const SEPARATOR_TRAILER: u8 = 0x3B;

pub const LABEL_GRAPHIC_CONTROL: u8 = 0xF9;
pub const LABEL_APPLICATION: u8 = 0xFF;
pub const LABEL_COMMENT: u8 = 0xFE;
pub const LABEL_PLAIN_TEXT: u8 = 0x01;

const PACKED_TABLE_SIZE_MASK: u8 = 0x07;

bitflags::bitflags! {
    /// The single-bit fields shared by the logical screen descriptor's and the image
    /// descriptor's packed byte. `COLOR_TABLE` means "global table present" on the former and
    /// "local table present" on the latter; `INTERLACE` and `SORT` only appear on the image
    /// descriptor.
    struct DescriptorFlags: u8 {
        const SORT = 0x20;
        const INTERLACE = 0x40;
        const COLOR_TABLE = 0x80;
    }
}

/// Returns the number of colour table entries a packed size field of `size_bits` (the low 3
/// bits of a packed descriptor byte) declares: `2^(size_bits + 1)`.
pub fn table_size_from_bits(size_bits: u8) -> u16 {
    1u16 << (size_bits + 1)
}

pub struct LogicalScreenDescriptor {
    pub canvas_width: u16,
    pub canvas_height: u16,
    pub has_global_table: bool,
    pub global_table_size: u16,
    pub background_index: u8,
}

/// Verifies the 6-byte `"GIF87a"`/`"GIF89a"` signature and advances past it.
pub fn read_signature(cursor: &mut ByteCursor) -> Result<(), ErrorKind> {
    let sig = cursor.read_bytes(3)?;
    if sig != b"GIF" {
        return Err(cursor.bad_file(BadFileDetail::BadSignature));
    }
    let version = cursor.read_bytes(3)?;
    if version != b"87a" && version != b"89a" {
        return Err(cursor.bad_file(BadFileDetail::BadVersion));
    }
    Ok(())
}

pub fn read_logical_screen_descriptor(cursor: &mut ByteCursor) -> Result<LogicalScreenDescriptor, ErrorKind> {
    let canvas_width = cursor.read_u16_le()?;
    let canvas_height = cursor.read_u16_le()?;
    let packed = cursor.read_u8()?;
    let background_index = cursor.read_u8()?;
    let _pixel_aspect_ratio = cursor.read_u8()?;

    let has_global_table = DescriptorFlags::from_bits_truncate(packed).contains(DescriptorFlags::COLOR_TABLE);
    let global_table_size = table_size_from_bits(packed & PACKED_TABLE_SIZE_MASK);

    Ok(LogicalScreenDescriptor { canvas_width, canvas_height, has_global_table, global_table_size, background_index })
}

/// Reads `count` RGB triples into `dest` (which must be at least `MAX_COLORS * 3` bytes; entries
/// beyond `count` are left untouched).
pub fn read_color_table(cursor: &mut ByteCursor, dest: &mut [u8], count: u16) -> Result<(), ErrorKind> {
    if count as usize > MAX_COLORS {
        return Err(ErrorKind::UnsupportedColorDepth { declared: count, max: MAX_COLORS as u16 });
    }
    let bytes = cursor.read_bytes(count as usize * 3)?;
    dest[..bytes.len()].copy_from_slice(bytes);
    Ok(())
}

pub struct ImageDescriptor {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub has_local_table: bool,
    pub local_table_size: u16,
    pub interlaced: bool,
}

/// Reads an image descriptor's fields. The `0x2C` separator byte must already be consumed.
pub fn read_image_descriptor(cursor: &mut ByteCursor) -> Result<ImageDescriptor, ErrorKind> {
    let x = cursor.read_u16_le()?;
    let y = cursor.read_u16_le()?;
    let width = cursor.read_u16_le()?;
    let height = cursor.read_u16_le()?;
    let packed = cursor.read_u8()?;

    let flags = DescriptorFlags::from_bits_truncate(packed);
    let has_local_table = flags.contains(DescriptorFlags::COLOR_TABLE);
    let local_table_size = table_size_from_bits(packed & PACKED_TABLE_SIZE_MASK);
    let interlaced = flags.contains(DescriptorFlags::INTERLACE);

    Ok(ImageDescriptor { x, y, width, height, has_local_table, local_table_size, interlaced })
}

pub struct GraphicControl {
    pub delay_ms: u16,
    pub has_transparency: bool,
    pub transparent_index: u8,
    pub disposal_method: u8,
}

/// Reads a graphic control extension's body. The `0x21 0xF9` introducer must already be consumed.
pub fn read_graphic_control(cursor: &mut ByteCursor) -> Result<GraphicControl, ErrorKind> {
    let size = cursor.read_u8()?;
    if size != 4 {
        return Err(cursor.bad_file(BadFileDetail::BadGraphicControlSize { size }));
    }
    let packed = cursor.read_u8()?;
    let delay_units = cursor.read_u16_le()?;
    let transparent_index = cursor.read_u8()?;
    let terminator = cursor.read_u8()?;
    if terminator != 0 {
        return Err(cursor.bad_file(BadFileDetail::MissingTerminator));
    }

    Ok(GraphicControl {
        delay_ms: delay_units.saturating_mul(10),
        has_transparency: packed & 0x01 != 0,
        transparent_index,
        disposal_method: (packed >> 2) & 0x07,
    })
}

/// Reads and discards a chain of length-prefixed sub-blocks up to (and including) the
/// zero-length terminator. Used for comment and plain-text extensions, and for skipping any
/// application extension sub-block after the Netscape loop-count block has been consumed.
pub fn skip_sub_blocks(cursor: &mut ByteCursor) -> Result<(), ErrorKind> {
    loop {
        let len = cursor.read_u8()?;
        if len == 0 {
            return Ok(());
        }
        cursor.skip(len as usize)?;
    }
}

/// Reads an application extension's body, returning a Netscape-style loop count if the first
/// sub-block is the 3-byte `[0x01, lo, hi]` loop-count block. The `0x21 0xFF` introducer must
/// already be consumed. Any remaining sub-blocks (this one's continuation or an extension this
/// decoder does not special-case) are discarded.
pub fn read_application_extension(cursor: &mut ByteCursor) -> Result<Option<u16>, ErrorKind> {
    let size = cursor.read_u8()?;
    let _identifier_and_code = cursor.read_bytes(size as usize)?;

    let first_len = cursor.read_u8()?;
    if first_len == 0 {
        return Ok(None);
    }
    let first = cursor.read_bytes(first_len as usize)?;
    let loop_count = if first.len() == 3 && first[0] == 0x01 { Some(u16::from_le_bytes([first[1], first[2]])) } else { None };

    skip_sub_blocks(cursor)?;
    Ok(loop_count)
}

pub fn validate_frame_bounds(
    x: u16,
    y: u16,
    width: u16,
    height: u16,
    canvas_width: u16,
    canvas_height: u16,
) -> Result<(), ErrorKind> {
    let fits = x.checked_add(width).map_or(false, |right| right <= canvas_width)
        && y.checked_add(height).map_or(false, |bottom| bottom <= canvas_height);
    if fits {
        Ok(())
    } else {
        Err(ErrorKind::InvalidFrameDimensions { x, y, width, height, canvas_width, canvas_height })
    }
}

pub fn validate_canvas_limits(canvas_width: u16, canvas_height: u16, max_width: u16, max_height: u16) -> Result<(), ErrorKind> {
    if canvas_width as usize > max_width as usize || canvas_height as usize > max_height as usize {
        return Err(ErrorKind::InvalidParam(InvalidParamReason::CanvasExceedsLimits));
    }
    Ok(())
}
