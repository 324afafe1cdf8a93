//! Input controller: submission keys, the editable message buffer, and
//! height fitting for the input box.

/// Height cap used when the caller has no better idea.
pub const DEFAULT_MAX_HEIGHT: u16 = 200;

/// A key as far as submission is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKey {
    Enter,
    Char(char),
    Other,
}

/// Enter without Shift submits. Everything else, Shift-Enter included, is
/// left to normal editing.
pub fn submit_on_enter(key: InputKey, shift_held: bool) -> bool {
    key == InputKey::Enter && !shift_held
}

/// New input height: the content height, capped at `max_height`.
///
/// The current height plays no part; the box is always refitted from
/// scratch.
pub fn autosize(_current_height: u16, content_height: u16, max_height: u16) -> u16 {
    content_height.min(max_height)
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// The message being composed. Cursor positions count characters.
#[derive(Debug, Clone)]
pub struct InputBox {
    text: String,
    cursor: usize,
    height: u16,
    max_height: u16,
}

impl InputBox {
    pub fn new(max_height: u16) -> Self {
        Self {
            text: String::new(),
            cursor: 0,
            height: 1,
            max_height: max_height.max(1),
        }
    }

    pub fn value(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn insert_newline(&mut self) {
        self.insert_char('\n');
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.text.chars().count() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    /// Empty the box and shrink it back to one line.
    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
        self.height = 1;
    }

    /// Lines the current text occupies when wrapped at `width` columns.
    pub fn content_height(&self, width: u16) -> u16 {
        let width = width.max(1) as usize;
        let lines: usize = self
            .text
            .split('\n')
            .map(|line| {
                let chars = line.chars().count();
                if chars == 0 {
                    1
                } else {
                    chars.div_ceil(width)
                }
            })
            .sum();
        lines.min(u16::MAX as usize) as u16
    }

    /// Refit the box to its content for the given width.
    pub fn resize(&mut self, width: u16) -> u16 {
        self.height = autosize(self.height, self.content_height(width), self.max_height);
        self.height
    }

    /// (line, column) of the cursor within the unwrapped text.
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let before: String = self.text.chars().take(self.cursor).collect();
        let line = before.matches('\n').count();
        let col = before.rsplit('\n').next().map(|l| l.chars().count()).unwrap_or(0);
        (line, col)
    }
}
