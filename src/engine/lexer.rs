//! Character-level word reading.
//!
//! `read_word` is the only function that touches `buf`/`pos` directly.
//! Everything above it (variable replay, iteration replay, substitution)
//! is layered on top via `read_raw`.

use super::Engine;

fn is_separator(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | 0x0B | b'\n' | 0 | b'(' | b')')
}

impl Engine {
    fn peek(&self) -> u8 {
        self.buf.get(self.pos).copied().unwrap_or(0)
    }

    fn advance(&mut self) {
        if self.pos < self.buf.len() {
            self.pos += 1;
        }
    }

    fn update_state(&mut self, c: u8) {
        if c == b'\n' || c == 0 {
            self.eol_reached = true;
        }
        if c == 0 {
            self.eof_reached = true;
        }
    }

    /// Reads one raw word from the real input buffer, honoring single and
    /// double quoting (parens and whitespace are separators; `\n` and the
    /// end of the buffer always terminate a word, even inside quotes).
    /// Returns `None` at end-of-line or end-of-buffer without producing a
    /// word.
    pub fn read_word(&mut self) -> Option<String> {
        loop {
            let c = self.peek();
            if c == 0 {
                self.update_state(0);
                return None;
            }
            if c == b'\n' {
                self.advance();
                self.update_state(c);
                return None;
            }
            if is_separator(c) {
                self.advance();
                continue;
            }
            break;
        }

        let mut word = Vec::new();
        let mut quote: u8 = 0;
        loop {
            let c = self.peek();
            if c == 0 {
                self.update_state(0);
                break;
            }
            if c == b'\n' {
                self.advance();
                self.update_state(c);
                break;
            }
            if quote != 0 {
                if c == quote {
                    quote = 0;
                    self.advance();
                    continue;
                }
                word.push(c);
                self.advance();
                continue;
            }
            if c == b'\'' || c == b'"' {
                quote = c;
                self.advance();
                continue;
            }
            if is_separator(c) {
                break;
            }
            word.push(c);
            self.advance();
        }
        let mut word = String::from_utf8_lossy(&word).into_owned();
        crate::book::truncate_token(&mut word);
        Some(word)
    }

    /// Reads the next raw word, draining the variable replay cursor then
    /// the iteration replay cursor before falling through to the real
    /// buffer. Exhausting the iteration cursor ends the (virtual) line
    /// rather than falling through, since the real buffer position has
    /// already moved past the whole loop by the time a captured body line
    /// replays.
    pub fn read_raw(&mut self) -> Option<String> {
        if let Some(g) = self.var_group {
            if self.var_i < self.vars.group_len(g) {
                let w = self.vars.word(g, self.var_i).unwrap_or("").to_string();
                self.var_i += 1;
                return Some(w);
            }
            self.var_group = None;
        }
        if let Some(g) = self.it_group {
            if self.it_i < self.iteration.group_len(g) {
                let w = self.iteration.word(g, self.it_i).unwrap_or("").to_string();
                self.it_i += 1;
                return Some(w);
            }
            self.it_group = None;
            self.eol_reached = true;
            return None;
        }
        self.read_word()
    }

    /// Drops whatever is left of the current line: the rest of the real
    /// buffer's line, plus any unconsumed variable/iteration replay.
    pub fn goto_eol(&mut self) {
        self.var_group = None;
        self.var_i = 0;
        if self.it_group.is_some() {
            self.it_group = None;
            self.it_i = 0;
            self.eol_reached = true;
            return;
        }
        while !self.eol_reached {
            let c = self.peek();
            self.advance();
            self.update_state(c);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(text: &str) -> Engine {
        let mut e = Engine::new();
        e.buf = text.as_bytes().to_vec();
        e.eol_reached = false;
        e.eof_reached = false;
        e
    }

    #[test]
    fn parens_are_separators() {
        let mut e = engine_with("(+ 1 2)");
        assert_eq!(e.read_word().as_deref(), Some("+"));
        assert_eq!(e.read_word().as_deref(), Some("1"));
        assert_eq!(e.read_word().as_deref(), Some("2"));
        assert_eq!(e.read_word(), None);
        assert!(e.eol_reached);
    }

    #[test]
    fn quotes_preserve_internal_whitespace() {
        let mut e = engine_with("ns prop 'hello world'");
        assert_eq!(e.read_word().as_deref(), Some("ns"));
        assert_eq!(e.read_word().as_deref(), Some("prop"));
        assert_eq!(e.read_word().as_deref(), Some("hello world"));
    }

    #[test]
    fn empty_quoted_word_is_distinct_from_no_word() {
        let mut e = engine_with("ns prop ''");
        e.read_word();
        e.read_word();
        assert_eq!(e.read_word().as_deref(), Some(""));
    }

    #[test]
    fn newline_terminates_even_inside_quotes() {
        let mut e = engine_with("'unterminated\nnext");
        assert_eq!(e.read_word().as_deref(), Some("unterminated"));
        assert!(e.eol_reached);
    }

    #[test]
    fn var_replay_is_drained_before_the_real_buffer() {
        let mut e = engine_with("real");
        e.eol_reached = false;
        e.vars.begin_group();
        e.vars.push_word("replayed");
        e.var_group = Some(0);
        e.var_i = 0;
        assert_eq!(e.read_raw().as_deref(), Some("replayed"));
        assert_eq!(e.read_raw().as_deref(), Some("real"));
    }

    #[test]
    fn iteration_replay_ends_the_line_without_falling_through() {
        let mut e = engine_with("untouched");
        e.eol_reached = false;
        e.iteration.begin_group();
        e.iteration.push_word("body");
        e.it_group = Some(0);
        e.it_i = 0;
        assert_eq!(e.read_raw().as_deref(), Some("body"));
        assert_eq!(e.read_raw(), None);
        assert!(e.eol_reached);
        assert_eq!(e.pos, 0);
    }
}
