//! The engine: the language-level state behind a [`crate::Config`].
//!
//! Everything in here is pure parser/interpreter state — no knowledge of
//! hosts, callbacks or the public facade. [`crate::config`] drives it.

mod dispatcher;
mod evaluator;
mod lexer;
mod loader;

pub(crate) use loader::{load_buffer, load_root_file};

use crate::book::Book;
use crate::dict::Dict;
use crate::error::ConfigError;
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

pub const MAX_DEPTH: u32 = 32;
pub const MAX_GROUPS: usize = 1 << 20;

pub(crate) const NS_NAMESPACE_TABLE: u32 = 0;
pub(crate) const NS_VARIABLE: u32 = 1;
pub(crate) const NS_SECTION: u32 = 2;
pub(crate) const NS_ITERATION: u32 = 3;

#[derive(Debug, Clone)]
pub enum ParamValue {
    Long(i64),
    Double(f64),
    Str(String),
}

impl ParamValue {
    pub fn format(&self) -> String {
        match self {
            ParamValue::Long(v) => v.to_string(),
            ParamValue::Double(v) => format!("{v:.8}"),
            ParamValue::Str(s) => s.clone(),
        }
    }
}

/// Parser/interpreter state for a single [`crate::Config`] instance.
///
/// `sequences`/`keys_sequences` hold declared resources. `vars`/`keys_vars`
/// hold `LET`-declared variables plus the transient `SECTION` and
/// `ITERATION` namespaces. `iteration` holds the raw, unevaluated lines
/// captured by the outermost `FOR_EACH` currently executing.
#[derive(Debug, Clone)]
pub(crate) struct Engine {
    pub sequences: Book,
    pub keys_sequences: Dict,
    pub vars: Book,
    pub keys_vars: Dict,
    pub iteration: Book,
    pub parameters: IndexMap<String, ParamValue>,

    pub buf: Vec<u8>,
    pub pos: usize,
    pub file_inode: u64,
    pub file_dir: PathBuf,
    pub eol_reached: bool,
    pub eof_reached: bool,
    pub depth: u32,

    pub it_group: Option<usize>,
    pub it_i: usize,
    pub var_group: Option<usize>,
    pub var_i: usize,

    pub skip_sequences: bool,
    pub restricted: bool,
    pub rng: StdRng,
    pub ancestors: Vec<u64>,
    pub sticky: Option<ConfigError>,
    pub print_log: Vec<String>,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            sequences: Book::new(),
            keys_sequences: Dict::new(),
            vars: Book::new(),
            keys_vars: Dict::new(),
            iteration: Book::new(),
            parameters: IndexMap::new(),
            buf: Vec::new(),
            pos: 0,
            file_inode: 0,
            file_dir: PathBuf::new(),
            eol_reached: true,
            eof_reached: true,
            depth: 0,
            it_group: None,
            it_i: 0,
            var_group: None,
            var_i: 0,
            skip_sequences: false,
            restricted: false,
            rng: StdRng::seed_from_u64(0x5EED),
            ancestors: Vec::new(),
            sticky: None,
            print_log: Vec::new(),
        }
    }

    pub fn set_sticky(&mut self, err: ConfigError) {
        if self.sticky.is_none() {
            log::warn!("configuration entered a sticky error state: {err}");
        }
        self.sticky = Some(err);
    }

    /// Resets everything parsed by a previous `load`, preserving the
    /// host-facing state that is meant to survive reloads: parameters,
    /// the restricted-mode flag and the RNG stream.
    pub fn reset_for_load(&mut self) {
        self.sequences.clear();
        self.keys_sequences.clear();
        self.vars.clear();
        self.keys_vars.clear();
        self.iteration.clear();
        self.buf.clear();
        self.pos = 0;
        self.eol_reached = false;
        self.eof_reached = false;
        self.depth = 0;
        self.it_group = None;
        self.it_i = 0;
        self.var_group = None;
        self.var_i = 0;
        self.skip_sequences = false;
        self.ancestors.clear();
        self.file_inode = 0;
        self.file_dir = PathBuf::new();
        self.sticky = None;
        self.print_log.clear();
    }
}
