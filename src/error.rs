//! Closed error enumeration for the decoder's public API.
//!
//! Every fault the decoder can detect maps to exactly one [`ErrorKind`] variant; there is no
//! catch-all. Variants that can be attributed to a specific wire offset or declared size carry
//! that value as a field, so a formatted message is actionable without a source map.

use core::fmt;

use thiserror::Error;

/// Why a malformed LZW code stream was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeReason {
    #[error("code {code} is not yet present in the dictionary (next free code is {next_code})")]
    CodeOutOfRange { code: u16, next_code: u16 },
    #[error("interlace pass permutation could not place the next row within the frame")]
    InterlaceRowOutOfRange,
    #[error("turbo dictionary byte pool write would overrun its scratch region")]
    TurboPoolOverrun,
    #[error("code chain is longer than the reverse-walk scratch buffer can hold")]
    ReverseBufferOverflow,
    #[error("first code following a clear code was not a root (single-byte) code")]
    UnexpectedNonRootCode,
    #[error("emitted more pixels than the frame's width times height")]
    TooManyPixels,
}

/// Why an argument at the API boundary was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidParamReason {
    #[error("source buffer is empty")]
    EmptySource,
    #[error("scratch buffer is empty")]
    EmptyScratch,
    #[error("canvas dimensions exceed the compiled MAX_WIDTH/MAX_HEIGHT limits")]
    CanvasExceedsLimits,
    #[error("output buffer is too small for the current canvas")]
    OutputBufferTooSmall,
}

/// The complete set of faults this decoder can report: decode,
/// invalid-param, bad-file, early-eof, no-frame, buffer-too-small, invalid-frame-dimensions,
/// unsupported-color-depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("malformed LZW stream at LZW-stream offset {offset}: {reason}")]
    Decode { offset: u32, reason: DecodeReason },

    #[error("invalid argument: {0}")]
    InvalidParam(InvalidParamReason),

    #[error("bad GIF file at byte offset {offset}: {detail}")]
    BadFile { offset: u32, detail: BadFileDetail },

    #[error("input ended after {read} of {needed} required bytes at offset {offset}")]
    EarlyEof { offset: u32, needed: u16, read: u16 },

    #[error("next_frame called after the animation already finished")]
    NoFrame,

    #[error("scratch buffer is {actual} bytes, but {required} bytes are required for this configuration")]
    BufferTooSmall { required: usize, actual: usize },

    #[error(
        "frame at ({x},{y}) sized {width}x{height} does not fit within the {canvas_width}x{canvas_height} canvas"
    )]
    InvalidFrameDimensions { x: u16, y: u16, width: u16, height: u16, canvas_width: u16, canvas_height: u16 },

    #[error("colour table declares {declared} entries, exceeding the {max} entry limit")]
    UnsupportedColorDepth { declared: u16, max: u16 },
}

/// Detail attached to [`ErrorKind::BadFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BadFileDetail {
    #[error("expected signature \"GIF\"")]
    BadSignature,
    #[error("unsupported version (expected \"87a\" or \"89a\")")]
    BadVersion,
    #[error("byte 0x{byte:02x} is not a trailer, image separator, or extension introducer")]
    UnexpectedSeparator { byte: u8 },
    #[error("unknown extension label 0x{label:02x}")]
    UnknownExtension { label: u8 },
    #[error("graphic control extension block size {size} is not 4")]
    BadGraphicControlSize { size: u8 },
    #[error("sub-block or extension block is missing its terminator byte")]
    MissingTerminator,
}

/// A small fixed-capacity [`core::fmt::Write`] sink used to render an [`ErrorKind`] into a
/// caller-visible message without allocating. Truncates silently if the message does not fit.
pub struct MessageBuf<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> MessageBuf<N> {
    pub fn new() -> Self {
        MessageBuf { buf: [0; N], len: 0 }
    }

    pub fn as_str(&self) -> &str {
        // every byte written came through `fmt::Write::write_str`, which only accepts `&str`
        // slices, so the written prefix is always valid UTF-8.
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }
}

impl<const N: usize> fmt::Write for MessageBuf<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let remaining = N - self.len;
        let to_copy = remaining.min(s.len());
        self.buf[self.len..self.len + to_copy].copy_from_slice(&s.as_bytes()[..to_copy]);
        self.len += to_copy;
        Ok(())
    }
}

/// Renders `kind` into `buf` and returns the resulting message slice.
pub fn render_message<const N: usize>(kind: ErrorKind, buf: &mut MessageBuf<N>) -> &str {
    use fmt::Write;
    let _ = write!(buf, "{kind}");
    buf.as_str()
}
