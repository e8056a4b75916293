//! Output Buffer
//!
//! The growable buffer every expansion writes into:
//! - growth keeps a small slack zone past the data so short writes that
//!   follow a capacity check never reallocate
//! - nested expansions swap in a fresh buffer and restore the old one,
//!   so one buffer discipline serves arbitrarily deep nesting

/// Slack kept past the end of the data on every growth decision.
pub const OUTPUT_BUFFER_ZONE: usize = 5;

const INITIAL_CAPACITY: usize = 200;

/// A saved buffer, handed out when a nested expansion takes over and
/// consumed when the outer one resumes.
#[derive(Debug)]
pub struct SavedBuffer {
    buf: String,
}

/// The expansion output buffer.
#[derive(Debug)]
pub struct OutputBuffer {
    buf: String,
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputBuffer {
    pub fn new() -> Self {
        OutputBuffer { buf: String::with_capacity(INITIAL_CAPACITY) }
    }

    /// Append `text`, growing if the result plus the slack zone would not
    /// fit. Returns the offset where `text` landed.
    pub fn append(&mut self, text: &str) -> usize {
        let at = self.buf.len();
        let newlen = at + text.len();
        if newlen + OUTPUT_BUFFER_ZONE > self.buf.capacity() {
            let want = std::cmp::max(newlen + 100, 2 * self.buf.capacity());
            self.buf.reserve(want - self.buf.len());
        }
        self.buf.push_str(text);
        at
    }

    pub fn push(&mut self, c: char) {
        let mut tmp = [0u8; 4];
        self.append(c.encode_utf8(&mut tmp));
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Start a nested expansion: take the current buffer out and install a
    /// fresh one. The caller must later hand the saved buffer back to
    /// either `restore` or `swap`.
    pub fn install_fresh(&mut self) -> SavedBuffer {
        SavedBuffer { buf: std::mem::replace(&mut self.buf, String::with_capacity(INITIAL_CAPACITY)) }
    }

    /// Abandon the nested buffer and put the saved one back.
    pub fn restore(&mut self, saved: SavedBuffer) {
        self.buf = saved.buf;
    }

    /// Finish a nested expansion: take its content out and put the saved
    /// buffer back.
    pub fn swap(&mut self, saved: SavedBuffer) -> String {
        std::mem::replace(&mut self.buf, saved.buf)
    }
}
