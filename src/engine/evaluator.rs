//! Substitution evaluation.
//!
//! `apply` is the heart of the language: given a raw word, it decides
//! whether the word is a keyword and, if so, recursively consumes
//! whatever further tokens that keyword needs. Everything that is not a
//! recognized keyword passes through unchanged as a `STRING`.

use super::{Engine, NS_ITERATION, NS_VARIABLE};
use crate::book::truncate_token;
use crate::color;
use crate::error::ConfigError;
use crate::token::{TokenKind, TOKEN_TABLE};
use rand::Rng;

#[derive(Debug, Clone)]
pub struct EvalResult {
    pub kind: TokenKind,
    pub text: String,
    pub number: Option<f64>,
}

impl EvalResult {
    pub fn invalid() -> Self {
        Self { kind: TokenKind::Invalid, text: String::new(), number: None }
    }

    pub fn string(text: impl Into<String>) -> Self {
        Self { kind: TokenKind::String, text: text.into(), number: None }
    }

    pub fn number(value: f64) -> Self {
        let mut text = format!("{value:.8}");
        truncate_token(&mut text);
        Self { kind: TokenKind::Number, text, number: Some(value) }
    }

    pub fn number_uint(value: u32) -> Self {
        Self { kind: TokenKind::Number, text: value.to_string(), number: Some(value as f64) }
    }
}

fn parse_leading_f64(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(v) = s.parse::<f64>() {
        return Some(v);
    }
    let mut end = s.len();
    while end > 0 {
        end -= 1;
        if !s.is_char_boundary(end) {
            continue;
        }
        if let Ok(v) = s[..end].parse::<f64>() {
            return Some(v);
        }
    }
    None
}

fn current_unix_timestamp() -> f64 {
    chrono::Utc::now().timestamp() as f64
}

impl Engine {
    /// Reads one raw word and substitutes it, recursing as deep as the
    /// keyword requires. Bumps and checks the recursion-depth counter so a
    /// pathological `(LAZY (LAZY (LAZY ...)))` chain cannot blow the stack.
    pub fn get_token(&mut self) -> EvalResult {
        match self.read_raw() {
            Some(word) => self.apply(&word),
            None => EvalResult::invalid(),
        }
    }

    pub fn get_token_numeral(&mut self) -> Option<f64> {
        let ev = self.get_token();
        match ev.kind {
            TokenKind::Number => ev.number,
            TokenKind::String => {
                if ev.text.starts_with('#') {
                    color::parse_hex(&ev.text).map(|v| v as f64)
                } else {
                    parse_leading_f64(&ev.text)
                }
            }
            _ => None,
        }
    }

    pub fn apply(&mut self, raw: &str) -> EvalResult {
        if self.depth >= super::MAX_DEPTH {
            self.set_sticky(ConfigError::Overflow);
            return EvalResult::invalid();
        }
        self.depth += 1;
        let result = self.apply_inner(raw);
        self.depth -= 1;
        result
    }

    fn apply_inner(&mut self, raw: &str) -> EvalResult {
        let kind = match TOKEN_TABLE.get(raw).copied() {
            Some(k) => k,
            None => return EvalResult::string(raw.to_string()),
        };
        match kind {
            TokenKind::Comment => EvalResult::invalid(),
            TokenKind::Eof => {
                self.eof_reached = true;
                self.eol_reached = true;
                EvalResult::invalid()
            }
            TokenKind::Escape => {
                self.eol_reached = false;
                match self.read_raw() {
                    Some(word) => EvalResult::string(word),
                    None => EvalResult::invalid(),
                }
            }
            TokenKind::Filler => self.get_token(),
            TokenKind::Join => {
                let a = self.get_token();
                let b = self.get_token();
                if a.kind == TokenKind::Invalid || b.kind == TokenKind::Invalid {
                    return EvalResult::invalid();
                }
                EvalResult::string(format!("{}{}", a.text, b.text))
            }
            TokenKind::VarInjection => self.eval_var_injection(),
            k if k.is_conditional() => self.eval_conditional(k),
            k if k.is_math() => self.eval_math(k),
            k if k.is_color() => self.eval_color(k),
            other => EvalResult { kind: other, text: raw.to_string(), number: None },
        }
    }

    fn eval_var_injection(&mut self) -> EvalResult {
        let name_ev = self.get_token();
        if name_ev.kind == TokenKind::Invalid {
            return EvalResult::invalid();
        }
        let name = name_ev.text;

        if let Some(global) = self.keys_vars.find(&name, NS_ITERATION) {
            let word = self.vars.word_at(global as usize).unwrap_or("").to_string();
            return self.apply(&word);
        }
        if let Some(group) = self.keys_vars.find(&name, NS_VARIABLE) {
            self.var_group = Some(group as usize);
            self.var_i = 0;
            return self.get_token();
        }
        if let Some(param) = self.parameters.get(&name) {
            return EvalResult::string(param.format());
        }
        EvalResult::invalid()
    }

    /// Evaluates the comparison, then walks the two branches in stream
    /// order. Each branch may itself be a parenthesized expression (parens
    /// are mere separators), so a branch cannot be read as a single raw
    /// word the way a flat token can -- it has to be either fully
    /// evaluated (`apply`, which pulls in as many further tokens as its
    /// own arity needs) or fully discarded structurally (`skip_next`,
    /// which walks the same arity table without evaluating anything), and
    /// either way it must happen before the other branch is even read, or
    /// the two branches' tokens interleave on the stream.
    fn eval_conditional(&mut self, kind: TokenKind) -> EvalResult {
        let a = self.get_token_numeral();
        let b = self.get_token_numeral();
        let (a, b) = match (a, b) {
            (Some(a), Some(b)) => (a, b),
            _ => return EvalResult::invalid(),
        };
        let cond = match kind {
            TokenKind::IfLt => a < b,
            TokenKind::IfLe => a <= b,
            TokenKind::IfGt => a > b,
            TokenKind::IfGe => a >= b,
            TokenKind::IfEq => a == b,
            TokenKind::IfNe => a != b,
            _ => unreachable!(),
        };
        let true_result = self.branch(cond);
        let false_result = self.branch(!cond);
        if cond { true_result } else { false_result }
    }

    /// Reads one conditional branch in stream order. When `take` is set
    /// the branch is evaluated and its result returned; otherwise it is
    /// discarded structurally (no evaluation, no side effects) and
    /// `EvalResult::invalid()` is returned since the caller never uses it.
    fn branch(&mut self, take: bool) -> EvalResult {
        match self.read_raw() {
            Some(word) if take => self.apply(&word),
            Some(word) => {
                self.skip_next(&word);
                EvalResult::invalid()
            }
            None => EvalResult::invalid(),
        }
    }

    fn skip_next(&mut self, word: &str) {
        if self.depth >= super::MAX_DEPTH {
            return;
        }
        self.depth += 1;
        self.skip_structural(word);
        self.depth -= 1;
    }

    fn skip_structural(&mut self, word: &str) {
        let kind = match TOKEN_TABLE.get(word).copied() {
            Some(k) => k,
            None => return,
        };
        match kind {
            TokenKind::Comment | TokenKind::Eof => {}
            TokenKind::Escape => {
                if let Some(w) = self.read_raw() {
                    let _ = w;
                }
            }
            TokenKind::Filler | TokenKind::VarInjection => self.skip_one(),
            TokenKind::Join => {
                self.skip_one();
                self.skip_one();
            }
            k if k.is_conditional() => {
                self.skip_one();
                self.skip_one();
                self.skip_one();
                self.skip_one();
            }
            k => {
                for _ in 0..k.arity() {
                    self.skip_one();
                }
            }
        }
    }

    fn skip_one(&mut self) {
        if let Some(word) = self.read_raw() {
            self.skip_next(&word);
        }
    }

    fn eval_math(&mut self, kind: TokenKind) -> EvalResult {
        let n = kind.arity();
        let mut args = Vec::with_capacity(n);
        for _ in 0..n {
            match self.get_token_numeral() {
                Some(v) => args.push(v),
                None => return EvalResult::invalid(),
            }
        }
        let value = match kind {
            TokenKind::ConstTimestamp => current_unix_timestamp(),
            TokenKind::ConstPi => std::f64::consts::PI,
            // Euler-Mascheroni gamma, not Euler's number -- kept for source compatibility.
            TokenKind::ConstEuler => 0.577_215_664_901_532_8,
            TokenKind::ConstTrue => 1.0,
            TokenKind::ConstFalse => 0.0,
            TokenKind::OpSqrt => args[0].sqrt(),
            TokenKind::OpCbrt => args[0].cbrt(),
            TokenKind::OpAbs => args[0].abs(),
            TokenKind::OpCeiling => args[0].ceil(),
            TokenKind::OpFloor => args[0].floor(),
            TokenKind::OpRound => args[0].round(),
            TokenKind::OpCos => args[0].cos(),
            TokenKind::OpSin => args[0].sin(),
            TokenKind::OpTan => args[0].tan(),
            TokenKind::OpAcos => args[0].acos(),
            TokenKind::OpAsin => args[0].asin(),
            TokenKind::OpAtan => args[0].atan(),
            TokenKind::OpCosh => args[0].cosh(),
            TokenKind::OpSinh => args[0].sinh(),
            TokenKind::OpLn => args[0].ln(),
            TokenKind::OpLog => args[0].log10(),
            TokenKind::OpAdd => args[0] + args[1],
            TokenKind::OpSubtract => args[0] - args[1],
            TokenKind::OpMultiply => args[0] * args[1],
            TokenKind::OpDivide => args[0] / args[1],
            TokenKind::OpMod => {
                let n = (args[0] / args[1]).round();
                args[0] - n * args[1]
            }
            TokenKind::OpPow => args[0].powf(args[1]),
            TokenKind::OpBiggest => args[0].max(args[1]),
            TokenKind::OpSmallest => args[0].min(args[1]),
            TokenKind::OpRandom => {
                let (lo, hi) = (args[0].min(args[1]), args[0].max(args[1]));
                if lo >= hi {
                    lo
                } else {
                    self.rng.gen_range(lo..=hi)
                }
            }
            TokenKind::OpInterpolate => args[0] + (args[1] - args[0]) * args[2],
            TokenKind::OpLimit => {
                let (lo, hi) = (args[1].min(args[2]), args[1].max(args[2]));
                args[0].clamp(lo, hi)
            }
            _ => unreachable!(),
        };
        EvalResult::number(value)
    }

    fn eval_color(&mut self, kind: TokenKind) -> EvalResult {
        let n = kind.arity();
        let mut args = Vec::with_capacity(n);
        for _ in 0..n {
            match self.get_token_numeral() {
                Some(v) => args.push(v),
                None => return EvalResult::invalid(),
            }
        }
        let packed = match kind {
            TokenKind::ClRgb => color::rgb(args[0], args[1], args[2]),
            TokenKind::ClRgba => color::rgba(args[0], args[1], args[2], args[3]),
            TokenKind::ClInterpolate => {
                color::interpolate(args[0] as u32, args[1] as u32, args[2])
            }
            _ => unreachable!(),
        };
        EvalResult::number_uint(packed)
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
    fn plain_word_passes_through() {
        let mut e = engine_with("hello");
        let ev = e.get_token();
        assert_eq!(ev.kind, TokenKind::String);
        assert_eq!(ev.text, "hello");
    }

    #[test]
    fn arithmetic_nests() {
        let mut e = engine_with("(+ 1 (* 2 3))");
        let ev = e.get_token();
        assert_eq!(ev.kind, TokenKind::Number);
        assert_eq!(ev.number, Some(7.0));
    }

    #[test]
    fn join_concatenates_two_tokens() {
        let mut e = engine_with("(JOIN foo bar)");
        let ev = e.get_token();
        assert_eq!(ev.text, "foobar");
    }

    #[test]
    fn conditional_does_not_evaluate_the_losing_branch() {
        let mut e = engine_with("(< 2 1 (RANDOM 0 1) chosen)");
        let ev = e.get_token();
        assert_eq!(ev.kind, TokenKind::String);
        assert_eq!(ev.text, "chosen");
    }

    #[test]
    fn conditional_branch_may_be_a_parenthesized_expression() {
        let mut e = engine_with("(== 1 1 (+ 2 3) (- 9 1))");
        let ev = e.get_token();
        assert_eq!(ev.kind, TokenKind::Number);
        assert_eq!(ev.number, Some(5.0));
    }

    #[test]
    fn conditional_skips_a_losing_parenthesized_branch_cleanly() {
        let mut e = engine_with("(== 1 1 (+ 2 3) (- 9 1)) tail");
        let ev = e.get_token();
        assert_eq!(ev.number, Some(5.0));
        assert_eq!(e.read_word().as_deref(), Some("tail"));
    }

    #[test]
    fn conditional_skips_a_nested_conditional_branch_structurally() {
        let mut e = engine_with("(> 5 1 winner (< 1 2 a b))");
        let ev = e.get_token();
        assert_eq!(ev.text, "winner");
        assert_eq!(e.read_word(), None);
    }

    #[test]
    fn hex_color_literal_coerces_to_a_numeral() {
        let mut e = engine_with("#336699");
        assert_eq!(e.get_token_numeral(), Some(0xFF33_6699_u32 as f64));
    }

    #[test]
    fn escape_bypasses_substitution_of_the_next_token() {
        let mut e = engine_with("(\\ PI)");
        let ev = e.get_token();
        assert_eq!(ev.kind, TokenKind::String);
        assert_eq!(ev.text, "PI");
    }
}
