//! Line accumulator.
//!
//! Bytes arrive from the bridge one at a time.  Printable ASCII
//! (0x20..=0x7E) is appended to a bounded buffer; `\n` or `\r` ends the
//! line.  Everything else is ignored.
//!
//! ```text
//!  byte ──▶ printable? ──yes──▶ push (overflow → discard buffer)
//!            │
//!            └─ \n / \r ──▶ trim ──▶ non-empty? ──▶ Line
//! ```
//!
//! Overflow is a silent drop: the partial line is thrown away and
//! accumulation resumes from empty.  The sender gets no reply.

use log::debug;

/// Longest line the accumulator will ever hold.
pub const MAX_LINE_LEN: usize = 200;

/// One complete, trimmed command line.
pub type Line = heapless::String<MAX_LINE_LEN>;

/// Streaming line decoder.
pub struct LineAccumulator {
    buf: Line,
    limit: usize,
    overflows: u32,
}

impl LineAccumulator {
    /// `limit` is capped at [`MAX_LINE_LEN`].
    pub fn new(limit: usize) -> Self {
        Self {
            buf: Line::new(),
            limit: limit.min(MAX_LINE_LEN),
            overflows: 0,
        }
    }

    /// Feed one byte.  Returns a line when `byte` terminated a non-empty one.
    pub fn feed(&mut self, byte: u8) -> Option<Line> {
        match byte {
            b'\n' | b'\r' => {
                let trimmed = self.buf.trim();
                let line = if trimmed.is_empty() {
                    None
                } else {
                    let mut line = Line::new();
                    // Fits: `trimmed` is a slice of a buffer with the same capacity.
                    let _ = line.push_str(trimmed);
                    Some(line)
                };
                self.buf.clear();
                line
            }
            0x20..=0x7E => {
                if self.buf.len() >= self.limit {
                    debug!(
                        "Protocol: line exceeded {} chars, discarding",
                        self.limit
                    );
                    self.buf.clear();
                    self.overflows = self.overflows.wrapping_add(1);
                    return None;
                }
                let _ = self.buf.push(byte as char);
                None
            }
            _ => None,
        }
    }

    /// Bytes currently buffered.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Number of lines discarded for length since boot.
    pub fn overflow_count(&self) -> u32 {
        self.overflows
    }

    /// Drop any partial line.
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

impl Default for LineAccumulator {
    fn default() -> Self {
        Self::new(MAX_LINE_LEN)
    }
}
