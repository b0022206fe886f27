//! Text buffer abstraction for the proofread region.
//!
//! The `TextBuffer` trait provides a common interface for text storage, so the
//! engine can run against a ropey-backed buffer locally or a host-owned
//! editable region.

use smol_str::{SmolStr, ToSmolStr};
use std::ops::Range;

/// Storage for the text being proofread.
///
/// Offsets are Unicode scalar values (chars), never bytes or UTF-16 units.
/// Implementors supply the primitive edits and offset conversions; searching,
/// replacing and whole-text swaps have default implementations.
pub trait TextBuffer {
    fn len_chars(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    fn insert(&mut self, char_offset: usize, text: &str);

    fn delete(&mut self, char_range: Range<usize>);

    /// Swap the chars in `char_range` for `text`.
    fn replace(&mut self, char_range: Range<usize>, text: &str) {
        self.delete(char_range.clone());
        self.insert(char_range.start, text);
    }

    fn set_text(&mut self, text: &str) {
        self.replace(0..self.len_chars(), text);
    }

    /// Text in `char_range`, or None if the range is out of bounds.
    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr>;

    fn to_string(&self) -> String;

    fn char_to_byte(&self, char_offset: usize) -> usize;

    fn byte_to_char(&self, byte_offset: usize) -> usize;

    /// Char offset of the first exact occurrence of `needle` at or after `from`.
    fn find_from(&self, needle: &str, from: usize) -> Option<usize> {
        if from > self.len_chars() {
            return None;
        }
        let haystack = self.to_string();
        let from_byte = self.char_to_byte(from);
        haystack[from_byte..]
            .find(needle)
            .map(|pos| self.byte_to_char(from_byte + pos))
    }
}

/// The default buffer, backed by a [`ropey::Rope`].
#[derive(Clone, Debug, Default)]
pub struct TextRope {
    rope: ropey::Rope,
}

impl TextRope {
    pub fn from_str(s: &str) -> Self {
        Self {
            rope: ropey::Rope::from_str(s),
        }
    }
}

impl TextBuffer for TextRope {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn insert(&mut self, char_offset: usize, text: &str) {
        self.rope.insert(char_offset, text);
    }

    fn delete(&mut self, char_range: Range<usize>) {
        self.rope.remove(char_range);
    }

    fn set_text(&mut self, text: &str) {
        self.rope = ropey::Rope::from_str(text);
    }

    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr> {
        if char_range.start > char_range.end || char_range.end > self.len_chars() {
            return None;
        }
        Some(self.rope.slice(char_range).to_smolstr())
    }

    fn to_string(&self) -> String {
        self.rope.to_string()
    }

    fn char_to_byte(&self, char_offset: usize) -> usize {
        self.rope.char_to_byte(char_offset)
    }

    fn byte_to_char(&self, byte_offset: usize) -> usize {
        self.rope.byte_to_char(byte_offset)
    }
}

impl From<&str> for TextRope {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

impl From<String> for TextRope {
    fn from(s: String) -> Self {
        Self::from_str(&s)
    }
}
