//! Allocation-free GIF87a/89a streaming frame decoder.
//!
//! Every byte of working memory (the LZW sub-block window, the dictionary tables, both
//! colour palettes, and the line reassembly buffer) lives in one caller-supplied scratch
//! slice, sized by [`required_scratch_len`] and partitioned at [`GifDecoder::init`] time. There
//! is no heap: decoding a frame writes straight into a caller-supplied RGB24 output buffer.
//!
//! The LZW dictionary has two interchangeable representations, selected at compile time by the
//! mutually exclusive `dict-safe` (default) and `dict-turbo` Cargo features; see [`dict`] for
//! the tradeoff.
#![cfg_attr(not(test), no_std)]

mod bitreader;
mod compositor;
mod config;
mod container;
mod cursor;
mod decoder;
mod dict;
mod error;
mod line;
mod lzw;
mod subblock;

pub use compositor::GraphicControl;
pub use config::required_scratch_len;
pub use decoder::{format_error, GifDecoder, DONE, FRAME_ERROR, FRAME_READY};
pub use error::{BadFileDetail, DecodeReason, ErrorKind, InvalidParamReason, MessageBuf};
