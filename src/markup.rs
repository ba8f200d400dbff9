//! Markup parsing and word wrapping
//!
//! Scans an annotated string left to right, recognizing `%%NAME%%` tags,
//! legacy `&x` codes, `\n` line breaks and apostrophe escapes, and folds the
//! result into wrapped [`Line`]s of [`StyledRun`]s. Tag substitutions (stats,
//! icons, gemstones) expand in place and are re-scanned, so their own markup
//! participates in wrapping.
//!
//! Parsing is all-or-nothing: the first malformed or unknown token aborts
//! with an error carrying the offending fragment.

use crate::chat::{ChatColor, Style, TextColor};
use crate::tags;
use thiserror::Error;

/// Line length bounds applied to every request, regardless of caller input.
pub const MIN_LINE_LENGTH: usize = 1;
pub const MAX_LINE_LENGTH: usize = 128;
pub const DEFAULT_LINE_LENGTH: usize = 38;

/// Substitution budget; exceeding it means a tag expansion loop.
const MAX_SUBSTITUTIONS: usize = 100;

/// Error type for markup parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    /// `%%` with no matching closing delimiter
    #[error("unclosed %% tag near `{context}`")]
    UnclosedTag { context: String },
    /// `%%%%` with nothing between the delimiters
    #[error("empty %% tag")]
    EmptyTag,
    /// Tag body matched no color, format, stat, icon or gemstone
    #[error("unknown tag `{tag}`")]
    UnknownTag { tag: String },
    /// `&` followed by a character that is not a color or format code
    #[error("invalid color code `&{0}`")]
    InvalidColorCode(char),
    /// `%%#...%%` that does not parse as a hex color
    #[error("invalid hex color `{value}`")]
    InvalidHexColor { value: String },
    /// Tag substitutions kept producing more tags
    #[error("tag expansion exceeded {MAX_SUBSTITUTIONS} substitutions")]
    ExpansionOverflow,
}

/// A contiguous run of text with one resolved color and style. Immutable
/// once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledRun {
    pub text: String,
    pub color: TextColor,
    pub style: Style,
}

/// One visual row of runs after wrapping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Line {
    pub runs: Vec<StyledRun>,
}

impl Line {
    /// Visible character count across all runs.
    pub fn visible_len(&self) -> usize {
        self.runs.iter().map(|r| r.text.chars().count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

/// Clamp a requested line length into the supported band.
pub fn clamp_line_length(max_length: usize) -> usize {
    max_length.clamp(MIN_LINE_LENGTH, MAX_LINE_LENGTH)
}

/// Parse markup into wrapped lines. `max_length` is clamped into
/// [`MIN_LINE_LENGTH`]..=[`MAX_LINE_LENGTH`] before use.
pub fn parse(text: &str, max_length: usize) -> Result<Vec<Line>, MarkupError> {
    let mut parser = Parser::new(text, clamp_line_length(max_length));
    parser.run()?;
    Ok(parser.finish())
}

/// Format code names accepted inside `%%...%%` in addition to colors.
fn format_code_from_name(name: &str) -> Option<char> {
    let code = match name.to_ascii_uppercase().as_str() {
        "BOLD" => 'l',
        "ITALIC" => 'o',
        "STRIKETHROUGH" => 'm',
        "UNDERLINE" => 'n',
        "OBFUSCATED" => 'k',
        "RESET" => 'r',
        _ => return None,
    };
    Some(code)
}

struct Parser {
    buf: Vec<char>,
    pos: usize,
    max_len: usize,
    substitutions: usize,

    lines: Vec<Line>,
    current_line: Vec<StyledRun>,
    run_text: String,
    line_len: usize,
    color: TextColor,
    style: Style,
}

impl Parser {
    fn new(text: &str, max_len: usize) -> Self {
        Self {
            buf: text.chars().collect(),
            pos: 0,
            max_len,
            substitutions: 0,
            lines: Vec::new(),
            current_line: Vec::new(),
            run_text: String::new(),
            line_len: 0,
            color: TextColor::Named(ChatColor::Gray),
            style: Style::default(),
        }
    }

    fn run(&mut self) -> Result<(), MarkupError> {
        while self.pos < self.buf.len() {
            if self.at_tag() {
                self.handle_tag()?;
            } else if self.at_legacy_code() {
                self.handle_legacy_code()?;
            } else if self.at_newline() {
                self.handle_newline();
            } else {
                self.consume_literal();
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Vec<Line> {
        self.flush_run();
        if !self.current_line.is_empty() {
            self.lines.push(Line { runs: std::mem::take(&mut self.current_line) });
        }
        // Wrapping an over-long first word leaves a blank leading line
        if self.lines.len() > 1 && self.lines[0].is_empty() {
            self.lines.remove(0);
        }
        self.lines
    }

    // --- token predicates -------------------------------------------------

    fn at_tag(&self) -> bool {
        self.buf[self.pos] == '%' && self.buf.get(self.pos + 1) == Some(&'%')
    }

    fn at_legacy_code(&self) -> bool {
        self.buf[self.pos] == '&'
            && self.buf.get(self.pos + 1).is_some_and(|c| *c != ' ')
    }

    fn at_newline(&self) -> bool {
        self.buf[self.pos] == '\\' && self.buf.get(self.pos + 1) == Some(&'n')
    }

    // --- state transitions ------------------------------------------------

    fn flush_run(&mut self) {
        if self.run_text.is_empty() {
            return;
        }
        self.current_line.push(StyledRun {
            text: std::mem::take(&mut self.run_text),
            color: self.color,
            style: self.style,
        });
    }

    fn set_color(&mut self, color: TextColor) {
        self.flush_run();
        self.color = color;
        // A real color change clears transient styles
        self.style = Style::default();
    }

    fn set_style(&mut self, code: char) {
        self.flush_run();
        match code {
            'l' => self.style.bold = true,
            'o' => self.style.italic = true,
            'm' => self.style.strikethrough = true,
            'n' => self.style.underlined = true,
            'k' => self.style.obfuscated = true,
            'r' => {
                self.color = TextColor::Named(ChatColor::Gray);
                self.style = Style::default();
            }
            _ => unreachable!("caller validates format codes"),
        }
    }

    /// Flush the current line. Color carries forward, styles reset.
    fn new_line(&mut self) {
        self.flush_run();
        self.lines.push(Line { runs: std::mem::take(&mut self.current_line) });
        self.line_len = 0;
        self.style = Style::default();
    }

    // --- token handlers ---------------------------------------------------

    fn handle_tag(&mut self) -> Result<(), MarkupError> {
        let close = match self.find_seq(self.pos + 2, &['%', '%']) {
            Some(i) => i,
            None => {
                let from = self.pos.saturating_sub(10);
                let to = (self.pos + 10).min(self.buf.len());
                let context: String = self.buf[from..to].iter().collect();
                return Err(MarkupError::UnclosedTag { context });
            }
        };

        if close == self.pos + 2 {
            return Err(MarkupError::EmptyTag);
        }

        let name: String = self.buf[self.pos + 2..close].iter().collect();

        if let Some(color) = ChatColor::from_name(&name) {
            self.set_color(TextColor::Named(color));
            self.pos = close + 2;
            return Ok(());
        }

        if let Some(code) = format_code_from_name(&name) {
            self.set_style(code);
            self.pos = close + 2;
            return Ok(());
        }

        if let Some(hex) = name.strip_prefix('#') {
            let rgb = parse_hex_rgb(hex)
                .ok_or_else(|| MarkupError::InvalidHexColor { value: name.clone() })?;
            self.set_color(TextColor::Rgb(rgb));
            self.pos = close + 2;
            return Ok(());
        }

        // Entity tags substitute pre-formatted markup in place and re-scan,
        // appending a restore sequence for the surrounding color and style.
        let restore = self.restore_sequence();

        if let Some(expanded) = tags::expand_gemstone(&name) {
            return self.substitute(close, format!("{expanded}{restore}"));
        }

        let (base, extra) = match name.split_once(':') {
            Some((base, extra)) => (base, extra),
            None => (name.as_str(), ""),
        };
        let (base, icon_only) = match base.strip_prefix('&') {
            Some(stripped) => (stripped, true),
            None => (base, false),
        };

        if let Some(expanded) = tags::expand_stat(base, extra, icon_only) {
            return self.substitute(close, format!("{expanded}{restore}"));
        }

        if let Some(expanded) = tags::expand_icon(base, extra) {
            return self.substitute(close, format!("{expanded}{restore}"));
        }

        // `%%RED:text%%` colors only the text inside the tag
        if let Some(color) = ChatColor::from_name(base) {
            let replacement = format!("&{}{extra}{restore}", color.code());
            return self.substitute(close, replacement);
        }
        if let Some(code) = format_code_from_name(base) {
            let replacement = format!("&{code}{extra}{restore}");
            return self.substitute(close, replacement);
        }

        Err(MarkupError::UnknownTag { tag: name })
    }

    /// Legacy sequence reproducing the active color and style, appended to
    /// tag substitutions so surrounding formatting resumes after them.
    fn restore_sequence(&self) -> String {
        let color = match self.color {
            TextColor::Named(c) => format!("&{}", c.code()),
            TextColor::Rgb([r, g, b]) => format!("%%#{r:02X}{g:02X}{b:02X}%%"),
        };
        format!("{color}{}", self.style.legacy_codes())
    }

    /// Replace `self.pos..close+2` with `replacement` and re-scan from the
    /// same position.
    fn substitute(&mut self, close: usize, replacement: String) -> Result<(), MarkupError> {
        self.substitutions += 1;
        if self.substitutions > MAX_SUBSTITUTIONS {
            return Err(MarkupError::ExpansionOverflow);
        }
        self.buf.splice(self.pos..close + 2, replacement.chars());
        Ok(())
    }

    fn handle_legacy_code(&mut self) -> Result<(), MarkupError> {
        let code = self.buf[self.pos + 1].to_ascii_lowercase();

        if let Some(color) = ChatColor::from_code(code) {
            self.set_color(TextColor::Named(color));
        } else if matches!(code, 'k' | 'l' | 'm' | 'n' | 'o' | 'r') {
            self.set_style(code);
        } else {
            return Err(MarkupError::InvalidColorCode(code));
        }

        self.pos += 2;
        Ok(())
    }

    fn handle_newline(&mut self) {
        self.new_line();
        self.pos += 2;
        // A single space after an explicit break is decorative
        if self.buf.get(self.pos) == Some(&' ') {
            self.pos += 1;
        }
    }

    // --- literal text and wrapping ----------------------------------------

    fn consume_literal(&mut self) {
        let split = self.next_split();
        let (mut chunk, mut raw, mut visible) = self.take_chunk(self.pos, split, usize::MAX);

        if self.line_len + visible >= self.max_len {
            // Over-long unbreakable chunks are cut to fit; the remainder is
            // consumed on the next iteration.
            if visible > self.max_len {
                let truncated = self.take_chunk(self.pos, split, self.max_len);
                (chunk, raw, visible) = truncated;
            }

            self.new_line();

            if chunk.starts_with(' ') {
                chunk.remove(0);
                visible -= 1;
            }
        }

        self.run_text.push_str(&chunk);
        self.line_len += visible;
        self.pos += raw;
    }

    /// Nearest wrap candidate after the cursor: next space, `%%`, `\n` or `&`.
    fn next_split(&self) -> usize {
        let from = self.pos + 1;
        [
            self.find_char(from, ' '),
            self.find_seq(from, &['%', '%']),
            self.find_seq(from, &['\\', 'n']),
            self.find_char(from, '&'),
        ]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(self.buf.len())
    }

    /// Collect up to `cap` visible characters from `start..end`, normalizing
    /// apostrophes (`'` becomes a typographic quote, `\'` a literal one).
    /// Returns (text, raw chars consumed, visible chars produced).
    fn take_chunk(&self, start: usize, end: usize, cap: usize) -> (String, usize, usize) {
        let mut out = String::new();
        let mut i = start;
        let mut visible = 0;

        while i < end && visible < cap {
            let c = self.buf[i];
            if c == '\\' && i + 1 < end && self.buf[i + 1] == '\'' {
                out.push('\'');
                i += 2;
            } else if c == '\'' {
                out.push('’');
                i += 1;
            } else {
                out.push(c);
                i += 1;
            }
            visible += 1;
        }

        (out, i - start, visible)
    }

    fn find_char(&self, from: usize, c: char) -> Option<usize> {
        self.buf[from.min(self.buf.len())..].iter().position(|x| *x == c).map(|i| i + from)
    }

    fn find_seq(&self, from: usize, seq: &[char]) -> Option<usize> {
        let buf = &self.buf;
        (from..buf.len().saturating_sub(seq.len() - 1))
            .find(|&i| buf[i..i + seq.len()] == *seq)
    }
}

fn parse_hex_rgb(hex: &str) -> Option<[u8; 3]> {
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let value = u32::from_str_radix(hex, 16).ok()?;
    Some([(value >> 16) as u8, (value >> 8) as u8, value as u8])
}
