//! Top-level public API: owns the decoder context, partitions the caller's scratch buffer into
//! its sub-regions, and drives the container state machine one `next_frame` call at a time.

use crate::compositor::{self, GraphicControl};
use crate::config::{self, MAX_COLORS};
use crate::container::{self, SEPARATOR_EXTENSION, SEPARATOR_IMAGE, SEPARATOR_TRAILER};
use crate::cursor::ByteCursor;
use crate::dict::{ActiveDictionary, Dictionary};
use crate::error::{BadFileDetail, ErrorKind, InvalidParamReason, MessageBuf};
use crate::line::LineAssembler;
use crate::lzw;
use crate::subblock::SubBlockReader;

/// `next_frame` produced a frame; the delay-out parameter now holds its delay in milliseconds.
pub const FRAME_READY: i32 = 1;
/// The animation has finished; no further frames remain until [`GifDecoder::rewind`].
pub const DONE: i32 = 0;
/// `next_frame` failed; no frame was written.
pub const FRAME_ERROR: i32 = -1;

pub struct GifDecoder<'src, 'scratch, const MAX_WIDTH: usize, const MAX_HEIGHT: usize> {
    cursor: ByteCursor<'src>,

    window: &'scratch mut [u8],
    dict_storage: &'scratch mut [u8],
    global_palette: &'scratch mut [u8],
    local_palette: &'scratch mut [u8],
    line_buf: &'scratch mut [u8],
    reverse_buf: &'scratch mut [u8],

    canvas_width: u16,
    canvas_height: u16,
    background_index: u8,
    has_global_table: bool,
    global_table_size: u16,

    loop_count: i32,
    anim_start_pos: usize,
    finished: bool,

    pending_control: GraphicControl,
    pending_delay_ms: u16,

    error_cb: Option<fn(ErrorKind, &str)>,
}

impl<'src, 'scratch, const MAX_WIDTH: usize, const MAX_HEIGHT: usize> GifDecoder<'src, 'scratch, MAX_WIDTH, MAX_HEIGHT> {
    pub fn init(source: &'src [u8], scratch: &'scratch mut [u8]) -> Result<Self, ErrorKind> {
        if source.is_empty() {
            return Err(ErrorKind::InvalidParam(InvalidParamReason::EmptySource));
        }
        if scratch.is_empty() {
            return Err(ErrorKind::InvalidParam(InvalidParamReason::EmptyScratch));
        }
        let required = config::required_scratch_len(MAX_WIDTH);
        if scratch.len() < required {
            return Err(ErrorKind::BufferTooSmall { required, actual: scratch.len() });
        }

        let (window, rest) = scratch.split_at_mut(config::LZW_WINDOW_LEN);
        let (dict_storage, rest) = rest.split_at_mut(config::dict_scratch_len());
        let (global_palette, rest) = rest.split_at_mut(MAX_COLORS * 3);
        let (local_palette, rest) = rest.split_at_mut(MAX_COLORS * 3);
        let (line_buf, reverse_buf) = rest.split_at_mut(MAX_WIDTH);

        let mut cursor = ByteCursor::new(source);
        container::read_signature(&mut cursor)?;
        let lsd = container::read_logical_screen_descriptor(&mut cursor)?;
        container::validate_canvas_limits(lsd.canvas_width, lsd.canvas_height, MAX_WIDTH as u16, MAX_HEIGHT as u16)?;

        if lsd.has_global_table {
            container::read_color_table(&mut cursor, global_palette, lsd.global_table_size)?;
        }

        let anim_start_pos = cursor.pos();

        Ok(GifDecoder {
            cursor,
            window,
            dict_storage,
            global_palette,
            local_palette,
            line_buf,
            reverse_buf,
            canvas_width: lsd.canvas_width,
            canvas_height: lsd.canvas_height,
            background_index: lsd.background_index,
            has_global_table: lsd.has_global_table,
            global_table_size: lsd.global_table_size,
            // No Netscape loop extension means "play once"; see DESIGN.md for why this differs
            // from an unconditional infinite default.
            loop_count: 0,
            anim_start_pos,
            finished: false,
            pending_control: GraphicControl::none(),
            pending_delay_ms: 0,
            error_cb: None,
        })
    }

    pub fn get_info(&self) -> (u16, u16) {
        (self.canvas_width, self.canvas_height)
    }

    pub fn set_error_callback(&mut self, cb: fn(ErrorKind, &str)) {
        self.error_cb = Some(cb);
    }

    pub fn rewind(&mut self) {
        self.cursor.seek(self.anim_start_pos);
        self.finished = false;
        self.pending_control = GraphicControl::none();
        self.pending_delay_ms = 0;
    }

    pub fn close(&mut self) {
        self.cursor.seek(self.cursor.len());
        self.window.fill(0);
        self.dict_storage.fill(0);
        self.global_palette.fill(0);
        self.local_palette.fill(0);
        self.line_buf.fill(0);
        self.reverse_buf.fill(0);
    }

    /// Advances the container state machine until a frame is composited into `output`, the
    /// animation finishes, or an error occurs.
    ///
    /// `output` must be at least `canvas_width * canvas_height * 3` bytes; a caller relying on
    /// the disposal=2-only transparency policy (see [`crate::compositor`]) must pre-fill it with
    /// whatever should show through transparent pixels under other disposal methods.
    pub fn next_frame(&mut self, output: &mut [u8], delay_ms_out: &mut u16) -> i32 {
        match self.run_state_machine(output, delay_ms_out) {
            Ok(result) => result,
            Err(kind) => {
                self.report_error(kind);
                FRAME_ERROR
            }
        }
    }

    fn report_error(&self, kind: ErrorKind) {
        if let Some(cb) = self.error_cb {
            let mut buf = MessageBuf::<{ config::ERROR_MESSAGE_LEN }>::new();
            let message = crate::error::render_message(kind, &mut buf);
            cb(kind, message);
        }
    }

    fn run_state_machine(&mut self, output: &mut [u8], delay_ms_out: &mut u16) -> Result<i32, ErrorKind> {
        if self.finished {
            return Err(ErrorKind::NoFrame);
        }

        let required_output = self.canvas_width as usize * self.canvas_height as usize * 3;
        if output.len() < required_output {
            return Err(ErrorKind::InvalidParam(InvalidParamReason::OutputBufferTooSmall));
        }

        loop {
            if self.cursor.remaining() == 0 {
                return Err(ErrorKind::BadFile { offset: self.cursor.pos() as u32, detail: BadFileDetail::MissingTerminator });
            }
            let separator = self.cursor.read_u8()?;
            match separator {
                SEPARATOR_TRAILER => {
                    if self.loop_count == -1 || self.loop_count > 0 {
                        if self.loop_count > 0 {
                            self.loop_count -= 1;
                        }
                        self.rewind();
                        continue;
                    }
                    self.finished = true;
                    return Ok(DONE);
                }
                SEPARATOR_EXTENSION => {
                    self.handle_extension()?;
                }
                SEPARATOR_IMAGE => {
                    self.decode_image(output)?;
                    *delay_ms_out = self.pending_delay_ms;
                    self.pending_control = GraphicControl::none();
                    self.pending_delay_ms = 0;
                    return Ok(FRAME_READY);
                }
                other => {
                    return Err(self.cursor.bad_file(BadFileDetail::UnexpectedSeparator { byte: other }));
                }
            }
        }
    }

    fn handle_extension(&mut self) -> Result<(), ErrorKind> {
        let label = self.cursor.read_u8()?;
        match label {
            container::LABEL_GRAPHIC_CONTROL => {
                let gc = container::read_graphic_control(&mut self.cursor)?;
                self.pending_delay_ms = gc.delay_ms;
                self.pending_control =
                    GraphicControl { has_transparency: gc.has_transparency, transparent_index: gc.transparent_index, disposal_method: gc.disposal_method };
                Ok(())
            }
            container::LABEL_APPLICATION => {
                if let Some(wire_count) = container::read_application_extension(&mut self.cursor)? {
                    // Netscape convention: a wire value of 0 means loop forever; N > 0 means
                    // repeat N more times after the first playback.
                    self.loop_count = if wire_count == 0 { -1 } else { wire_count as i32 };
                }
                Ok(())
            }
            _ => container::skip_sub_blocks(&mut self.cursor),
        }
    }

    fn decode_image(&mut self, output: &mut [u8]) -> Result<(), ErrorKind> {
        let desc = container::read_image_descriptor(&mut self.cursor)?;
        container::validate_frame_bounds(desc.x, desc.y, desc.width, desc.height, self.canvas_width, self.canvas_height)?;

        let palette: &[u8] = if desc.has_local_table {
            container::read_color_table(&mut self.cursor, self.local_palette, desc.local_table_size)?;
            &*self.local_palette
        } else if self.has_global_table {
            &*self.global_palette
        } else {
            // no local table on this image and no global table was declared in the header
            return Err(ErrorKind::BadFile { offset: self.cursor.pos() as u32, detail: BadFileDetail::UnexpectedSeparator { byte: SEPARATOR_IMAGE } });
        };

        let min_code_size = self.cursor.read_u8()?.max(config::MIN_LZW_CODE_SIZE);

        let mut sub = SubBlockReader::new(self.window);
        let mut bits = crate::bitreader::BitReader::new(min_code_size + 1);
        let mut dict = ActiveDictionary::new(self.dict_storage, self.reverse_buf, min_code_size);
        let mut line = LineAssembler::new(self.line_buf, desc.width, desc.height, desc.y, desc.interlaced);

        let control = &self.pending_control;
        let canvas_width = self.canvas_width;
        let background_index = self.background_index;
        let dest_col_start = desc.x;

        let sink = |byte: u8| -> Result<(), ErrorKind> {
            if let Some(dest_row) = line.push(byte)? {
                compositor::composite_line(output, canvas_width, dest_row, dest_col_start, line.line(), palette, background_index, control);
                line.advance();
            }
            Ok(())
        };

        lzw::decode_frame(&mut self.cursor, &mut sub, &mut bits, &mut dict, sink)?;

        sub.skip_to_terminator(&mut self.cursor)?;
        Ok(())
    }
}

/// Renders `kind` as a caller-visible message using a fixed-size buffer, matching the signature
/// an error callback installed via [`GifDecoder::set_error_callback`] would want to format with.
pub fn format_error<const N: usize>(kind: ErrorKind, buf: &mut MessageBuf<N>) -> &str {
    crate::error::render_message(kind, buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn encode_sub_blocks(chunks: &[&[u8]]) -> std::vec::Vec<u8> {
        let mut out = std::vec::Vec::new();
        for chunk in chunks {
            out.push(chunk.len() as u8);
            out.extend_from_slice(chunk);
        }
        out.push(0);
        out
    }

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
        bytes
    }

    /// Builds a minimal 1x1, 2-colour, single-frame GIF87a: palette {red, green}, pixel = root
    /// code 0 (red), clear=4, eoi=5.
    fn single_pixel_gif() -> std::vec::Vec<u8> {
        let mut data = std::vec::Vec::new();
        data.extend_from_slice(b"GIF87a");
        data.extend_from_slice(&[1, 0, 1, 0]); // 1x1 canvas
        data.push(0x80); // global table present, size field 0 -> 2 colours
        data.push(0); // background index
        data.push(0); // pixel aspect ratio
        data.extend_from_slice(&[255, 0, 0]); // palette[0] = red
        data.extend_from_slice(&[0, 255, 0]); // palette[1] = green

        data.push(SEPARATOR_IMAGE);
        data.extend_from_slice(&[0, 0, 0, 0]); // x,y = 0,0
        data.extend_from_slice(&[1, 0, 1, 0]); // w,h = 1,1
        data.push(0); // packed: no local table, no interlace
        data.push(2); // min code size

        let codes = pack_codes(&[(4, 3), (0, 3), (5, 3)]); // clear, root 0, eoi
        let blocks = encode_sub_blocks(&[&codes]);
        data.extend_from_slice(&blocks);

        data.push(SEPARATOR_TRAILER);
        data
    }

    #[test]
    fn decodes_single_pixel_frame_then_reports_done() {
        let data = single_pixel_gif();
        const WIDTH: usize = 4;
        let mut scratch = std::vec![0u8; config::required_scratch_len(WIDTH)];
        let mut decoder: GifDecoder<WIDTH, 4> = GifDecoder::init(&data, &mut scratch).unwrap();
        assert_eq!(decoder.get_info(), (1, 1));

        let mut output = std::vec![0u8; 3];
        let mut delay = 0u16;
        assert_eq!(decoder.next_frame(&mut output, &mut delay), FRAME_READY);
        assert_eq!(output, std::vec![255u8, 0, 0]);

        assert_eq!(decoder.next_frame(&mut output, &mut delay), DONE);
    }

    #[test]
    fn rewind_replays_the_same_frame() {
        let data = single_pixel_gif();
        const WIDTH: usize = 4;
        let mut scratch = std::vec![0u8; config::required_scratch_len(WIDTH)];
        let mut decoder: GifDecoder<WIDTH, 4> = GifDecoder::init(&data, &mut scratch).unwrap();

        let mut output = std::vec![0u8; 3];
        let mut delay = 0u16;
        decoder.next_frame(&mut output, &mut delay);
        decoder.next_frame(&mut output, &mut delay);

        decoder.rewind();
        output.fill(0);
        assert_eq!(decoder.next_frame(&mut output, &mut delay), FRAME_READY);
        assert_eq!(output, std::vec![255u8, 0, 0]);
    }

    #[test]
    fn truncated_stream_reports_early_eof() {
        let mut data = single_pixel_gif();
        data.truncate(data.len() - 6); // cut into the middle of the image sub-blocks
        const WIDTH: usize = 4;
        let mut scratch = std::vec![0u8; config::required_scratch_len(WIDTH)];
        let mut decoder: GifDecoder<WIDTH, 4> = GifDecoder::init(&data, &mut scratch).unwrap();

        let mut output = std::vec![0u8; 3];
        let mut delay = 0u16;
        assert_eq!(decoder.next_frame(&mut output, &mut delay), FRAME_ERROR);
    }

    #[test]
    fn next_frame_after_done_reports_no_frame() {
        let data = single_pixel_gif();
        const WIDTH: usize = 4;
        let mut scratch = std::vec![0u8; config::required_scratch_len(WIDTH)];
        let mut decoder: GifDecoder<WIDTH, 4> = GifDecoder::init(&data, &mut scratch).unwrap();

        let mut output = std::vec![0u8; 3];
        let mut delay = 0u16;
        assert_eq!(decoder.next_frame(&mut output, &mut delay), FRAME_READY);
        assert_eq!(decoder.next_frame(&mut output, &mut delay), DONE);
        assert_eq!(decoder.next_frame(&mut output, &mut delay), FRAME_ERROR);
    }

    static LAST_ERROR: std::sync::Mutex<Option<(ErrorKind, std::string::String)>> = std::sync::Mutex::new(None);

    fn record_error(kind: ErrorKind, message: &str) {
        *LAST_ERROR.lock().unwrap() = Some((kind, message.to_string()));
    }

    #[test]
    fn error_callback_receives_kind_and_rendered_message() {
        let data = single_pixel_gif();
        const WIDTH: usize = 4;
        let mut scratch = std::vec![0u8; config::required_scratch_len(WIDTH)];
        let mut decoder: GifDecoder<WIDTH, 4> = GifDecoder::init(&data, &mut scratch).unwrap();
        decoder.set_error_callback(record_error);

        let mut output = std::vec![0u8; 3];
        let mut delay = 0u16;
        decoder.next_frame(&mut output, &mut delay); // FRAME_READY
        decoder.next_frame(&mut output, &mut delay); // DONE
        decoder.next_frame(&mut output, &mut delay); // NoFrame, reported

        let recorded = LAST_ERROR.lock().unwrap();
        let (kind, message) = recorded.as_ref().unwrap();
        assert!(matches!(kind, ErrorKind::NoFrame));
        assert!(!message.is_empty());
    }

    #[test]
    fn out_of_bounds_frame_dimensions_is_decode_error() {
        let mut data = std::vec::Vec::new();
        data.extend_from_slice(b"GIF89a");
        data.extend_from_slice(&[50, 0, 50, 0]);
        data.push(0x80);
        data.push(0);
        data.push(0);
        data.extend_from_slice(&[0, 0, 0]);
        data.extend_from_slice(&[0, 0, 0]);

        data.push(SEPARATOR_IMAGE);
        data.extend_from_slice(&[10, 0, 10, 0]); // x,y
        data.extend_from_slice(&[100, 0, 100, 0]); // w,h -- exceeds 50x50 canvas
        data.push(0);
        data.push(2);
        data.extend_from_slice(&encode_sub_blocks(&[]));

        const WIDTH: usize = 100;
        let mut scratch = std::vec![0u8; config::required_scratch_len(WIDTH)];
        let mut decoder: GifDecoder<WIDTH, 100> = GifDecoder::init(&data, &mut scratch).unwrap();

        let mut output = std::vec![0u8; 50 * 50 * 3];
        let mut delay = 0u16;
        assert_eq!(decoder.next_frame(&mut output, &mut delay), FRAME_ERROR);
    }
}
