//! Build-time configuration: the handful of constants the scratch-buffer size is a pure
//! function of.
//! `MAX_COLORS` and `MAX_CODE_SIZE` are properties of the GIF87a/89a wire format itself (a
//! palette index is always one byte; an LZW code in this container format never exceeds 12
//! bits), not of the embedding target, so they are crate-wide constants rather than generic
//! parameters. `MAX_WIDTH`/`MAX_HEIGHT` genuinely vary by deployment (a 160x128 embedded panel
//! versus a desktop preview canvas) and are carried as const generics on [`crate::GifDecoder`],
//! the way `heapless::Vec<T, N>` parameterizes capacity instead of hard-coding it.

/// Palette entries never exceed this many colours in GIF87a/89a.
pub const MAX_COLORS: usize = 256;

/// LZW code width never exceeds this many bits in the GIF container format.
pub const MAX_CODE_SIZE: u8 = 12;

/// Lowest LZW minimum-code-size the format allows (a 2-colour image still reserves a 2-bit root
/// alphabet, clear code, and end-of-information code).
pub const MIN_LZW_CODE_SIZE: u8 = 2;

/// Highest LZW minimum-code-size the format allows (one byte per palette index).
pub const MAX_LZW_CODE_SIZE: u8 = 8;

/// Total number of representable LZW codes once the table reaches [`MAX_CODE_SIZE`].
pub const TABLE_ENTRIES: usize = 1 << MAX_CODE_SIZE as usize;

/// Length-prefixed sub-block payloads are at most this many bytes.
pub const MAX_SUB_BLOCK_LEN: usize = 255;

/// Fixed capacity of the buffer an error callback's rendered message is written into.
pub const ERROR_MESSAGE_LEN: usize = 128;

/// Scratch window the sub-block reader reassembles the LZW byte stream into. Large enough to
/// hold two full sub-blocks, so a compaction-then-refill always has somewhere to land before the
/// bit reader could possibly starve.
pub const LZW_WINDOW_LEN: usize = 2 * MAX_SUB_BLOCK_LEN + 2;

/// Byte pool capacity for the Turbo dictionary: at most [`MAX_COLORS`] root single-byte strings
/// plus one freshly-appended byte per one of the [`TABLE_ENTRIES`] possible non-root codes. This
/// is a direct consequence of how entries are built; this bound is derived independently for
/// this scratch layout rather than reused from elsewhere.
pub const TURBO_POOL_LEN: usize = MAX_COLORS + TABLE_ENTRIES;

/// Which concrete LZW dictionary representation is active in this build. Exactly one of the
/// `dict-safe` / `dict-turbo` Cargo features must be enabled; they are mutually exclusive so
/// that scratch is sized for one table layout, never both at once.
#[cfg(all(feature = "dict-safe", feature = "dict-turbo"))]
compile_error!("features `dict-safe` and `dict-turbo` are mutually exclusive");

#[cfg(not(any(feature = "dict-safe", feature = "dict-turbo")))]
compile_error!("exactly one of `dict-safe` or `dict-turbo` must be enabled");

/// Number of bytes the dictionary representation needs from the scratch buffer.
#[cfg(feature = "dict-safe")]
pub const fn dict_scratch_len() -> usize {
    // parent: u16 per code, suffix: u8 per code
    TABLE_ENTRIES * 2 + TABLE_ENTRIES
}

#[cfg(feature = "dict-turbo")]
pub const fn dict_scratch_len() -> usize {
    // offset+flags: u32 per code, length: u16 per code, initial per-root suffix byte, byte pool
    TABLE_ENTRIES * 4 + TABLE_ENTRIES * 2 + MAX_COLORS + TURBO_POOL_LEN
}

/// Total scratch bytes required for a decoder configured with `max_width`. This is the pure
/// function of (MAX_WIDTH, MAX_COLORS, MAX_CODE_SIZE, MODE); `max_width` is
/// supplied as a `const` argument so callers can size a `[u8; N]` array at compile time:
///
/// ```
/// const WIDTH: usize = 160;
/// const LEN: usize = gif_core::required_scratch_len(WIDTH);
/// let mut scratch = [0u8; LEN];
/// ```
///
/// The layout is, in order: the LZW sub-block window, the active dictionary's tables, the
/// global and local colour palettes (24-bit RGB, [`MAX_COLORS`] entries each), the line
/// reassembly buffer, and a chain-walk scratch of the same size the line buffer uses (the
/// Safe dictionary walks parent links into it; the Turbo dictionary does not use it, but the
/// two representations share one partitioning scheme so callers can switch features without
/// re-deriving scratch size).
pub const fn required_scratch_len(max_width: usize) -> usize {
    LZW_WINDOW_LEN + dict_scratch_len() + 2 * (MAX_COLORS * 3) + max_width + max_width
}
