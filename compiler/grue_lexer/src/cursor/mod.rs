//! Byte cursor with line tracking.
//!
//! The cursor never reads past the end of the buffer: [`Cursor::current`]
//! and [`Cursor::peek`] return `0` once exhausted, and `0` is never a
//! meaningful byte in script source (an interior NUL lexes as an
//! unexpected character because it is checked against [`Cursor::is_eof`]).

use memchr::{memchr, memchr3, memchr_iter};

/// Byte cursor over a UTF-8 source buffer.
///
/// [`Copy`] so the lexer can snapshot a position cheaply.
#[derive(Clone, Copy, Debug)]
pub struct Cursor<'src> {
    src: &'src str,
    pos: u32,
    line: u32,
}

impl<'src> Cursor<'src> {
    /// Create a cursor at the start of `src`, line 1.
    ///
    /// Sources longer than `u32::MAX` bytes are truncated; entity scripts are
    /// kilobytes.
    pub fn new(src: &'src str) -> Self {
        let src = if src.len() > u32::MAX as usize {
            &src[..floor_char_boundary(src, u32::MAX as usize)]
        } else {
            src
        };
        Self { src, pos: 0, line: 1 }
    }

    /// The full source text.
    #[inline]
    pub fn source(&self) -> &'src str {
        self.src
    }

    /// Current byte offset.
    #[inline]
    pub fn pos(&self) -> u32 {
        self.pos
    }

    /// Current 1-based line.
    #[inline]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos as usize >= self.src.len()
    }

    /// Byte at the current position, or `0` at EOF.
    #[inline]
    pub fn current(&self) -> u8 {
        self.byte_at(self.pos as usize)
    }

    /// Byte after the current one, or `0` past EOF.
    #[inline]
    pub fn peek(&self) -> u8 {
        self.byte_at(self.pos as usize + 1)
    }

    #[inline]
    fn byte_at(&self, index: usize) -> u8 {
        self.src.as_bytes().get(index).copied().unwrap_or(0)
    }

    /// Consume one byte and return it. Newlines bump the line counter.
    #[inline]
    pub fn bump(&mut self) -> u8 {
        let byte = self.current();
        if !self.is_eof() {
            self.pos += 1;
            if byte == b'\n' {
                self.line += 1;
            }
        }
        byte
    }

    /// Consume the current byte if it equals `expected`.
    #[inline]
    pub fn eat(&mut self, expected: u8) -> bool {
        if !self.is_eof() && self.current() == expected {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consume bytes while `pred` holds. Must not be used with a predicate
    /// accepting `\n` (line tracking is skipped here).
    #[inline]
    pub fn eat_while(&mut self, pred: impl Fn(u8) -> bool) {
        while !self.is_eof() && pred(self.current()) {
            self.pos += 1;
        }
    }

    /// Skip to the next `\n` (not consumed) or EOF.
    pub fn eat_until_newline(&mut self) {
        let rest = &self.src.as_bytes()[self.pos as usize..];
        let skip = memchr(b'\n', rest).unwrap_or(rest.len());
        self.pos += skip as u32;
    }

    /// Advance to the next byte that can end or split a string body: `"`,
    /// `\`, or `$`. Newlines in between are counted. Returns `false` (at EOF)
    /// when none remains.
    pub fn eat_string_body(&mut self) -> bool {
        let start = self.pos as usize;
        let rest = &self.src.as_bytes()[start..];
        match memchr3(b'"', b'\\', b'$', rest) {
            Some(found) => {
                self.count_lines(start, start + found);
                self.pos += found as u32;
                true
            }
            None => {
                self.count_lines(start, self.src.len());
                self.pos = self.src.len() as u32;
                false
            }
        }
    }

    fn count_lines(&mut self, from: usize, to: usize) {
        let newlines = memchr_iter(b'\n', &self.src.as_bytes()[from..to]).count();
        self.line += newlines as u32;
    }

    /// Source text between `start` and the current position.
    ///
    /// Both ends always fall on ASCII bytes the lexer stopped at, so they are
    /// char boundaries; a defensive empty string is returned otherwise.
    #[inline]
    pub fn slice_from(&self, start: u32) -> &'src str {
        self.slice(start, self.pos)
    }

    /// Source text in `start..end`.
    #[inline]
    pub fn slice(&self, start: u32, end: u32) -> &'src str {
        self.src.get(start as usize..end as usize).unwrap_or("")
    }

    /// Skip one UTF-8 encoded character starting at the current byte.
    pub fn bump_char(&mut self) {
        let width = self.src[self.pos as usize..]
            .chars()
            .next()
            .map_or(1, char::len_utf8);
        for _ in 0..width {
            self.bump();
        }
    }
}

fn floor_char_boundary(src: &str, mut index: usize) -> usize {
    while index > 0 && !src.is_char_boundary(index) {
        index -= 1;
    }
    index
}
