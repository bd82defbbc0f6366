//! The host-facing facade.
//!
//! `Config` owns an [`Engine`] plus everything that is meaningful across
//! reloads but has no business living in the parser itself: the ordered
//! list of candidate source paths, host-injected parameters, reload
//! callbacks, and the read cursor used by `fetch`/`iterate`/`resource`.

use crate::engine::{Engine, ParamValue, NS_NAMESPACE_TABLE};
use crate::error::ConfigError;
use std::path::PathBuf;

pub struct Config {
    engine: Engine,
    sources: Vec<PathBuf>,
    callbacks: Vec<Box<dyn FnMut(&Config)>>,
    restricted: bool,
    fetch_cursor: Option<(usize, usize)>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("sources", &self.sources)
            .field("restricted", &self.restricted)
            .field("error", &self.engine.sticky)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Config {
    /// Deep-copies parsed state, sources and parameters. Registered
    /// callbacks are host-side hooks tied to the identity of the original
    /// instance and are not carried over.
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            sources: self.sources.clone(),
            callbacks: Vec::new(),
            restricted: self.restricted,
            fetch_cursor: self.fetch_cursor,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            engine: Engine::new(),
            sources: Vec::new(),
            callbacks: Vec::new(),
            restricted: false,
            fetch_cursor: None,
        }
    }

    /// A distinguished sentinel instance: every mutating operation is a
    /// no-op and [`Config::error`] always reports [`ConfigError::Invalid`].
    /// Useful as a safe default where a host API requires a `Config` but
    /// has none to hand yet.
    pub fn placeholder() -> Self {
        let mut c = Self::new();
        c.engine.sticky = Some(ConfigError::Invalid);
        c
    }

    fn is_usable(&self) -> bool {
        self.engine.sticky.is_none()
    }

    pub fn push_source(&mut self, path: impl Into<PathBuf>) {
        if !self.is_usable() {
            return;
        }
        self.sources.push(path.into());
    }

    pub fn push_param(&mut self, name: impl Into<String>, value: ParamValue) {
        if !self.is_usable() {
            return;
        }
        self.engine.parameters.insert(name.into(), value);
    }

    pub fn push_callback<F: FnMut(&Config) + 'static>(&mut self, f: F) {
        if !self.is_usable() {
            return;
        }
        self.callbacks.push(Box::new(f));
    }

    pub fn clear_params(&mut self) {
        self.engine.parameters.clear();
    }

    pub fn clear_resources(&mut self) {
        self.engine.sequences.clear();
        self.engine.keys_sequences.clear();
        self.fetch_cursor = None;
    }

    pub fn clear_sources(&mut self) {
        self.sources.clear();
    }

    /// The index of the first source in the list that can currently be
    /// opened, if any, without actually loading it.
    pub fn can_open_sources(&self) -> Option<usize> {
        self.sources.iter().position(|p| p.exists())
    }

    /// Clears prior resources, opens the first accessible source in
    /// fallback order, parses it, then runs the reload callbacks.
    pub fn load(&mut self) {
        if !self.is_usable() {
            return;
        }
        self.engine.reset_for_load();
        self.engine.restricted = self.restricted;
        match self.sources.iter().find(|p| p.exists()).cloned() {
            Some(path) => crate::engine::load_root_file(&mut self.engine, &path),
            None => log::debug!("no openable source among {} candidates", self.sources.len()),
        }
        self.restricted = self.engine.restricted;
        self.run_callbacks();
    }

    /// Parses `buffer` directly instead of a file. `INCLUDE` is disabled
    /// for in-memory sources since relative paths have nothing to resolve
    /// against.
    pub fn load_internal(&mut self, buffer: &str) {
        if !self.is_usable() {
            return;
        }
        self.engine.reset_for_load();
        self.engine.restricted = self.restricted;
        crate::engine::load_buffer(&mut self.engine, buffer);
        self.restricted = self.engine.restricted;
        self.run_callbacks();
    }

    fn run_callbacks(&mut self) {
        let mut callbacks = std::mem::take(&mut self.callbacks);
        for cb in callbacks.iter_mut() {
            cb(self);
        }
        self.callbacks = callbacks;
    }

    /// Points the read cursor at `namespace`/`property`, or at nothing if
    /// that resource was never declared.
    pub fn fetch(&mut self, namespace: &str, property: &str) {
        self.fetch_cursor = None;
        if let Some(ns_id) = self.engine.keys_sequences.find(namespace, NS_NAMESPACE_TABLE) {
            if let Some(group) = self.engine.keys_sequences.find(property, ns_id as u32) {
                self.fetch_cursor = Some((group as usize, 0));
            }
        }
    }

    /// Advances the read cursor. Returns whether a value is now available
    /// via [`Config::resource`].
    pub fn iterate(&mut self) -> bool {
        match self.fetch_cursor {
            Some((group, idx)) if idx < self.engine.sequences.group_len(group) => {
                self.fetch_cursor = Some((group, idx + 1));
                true
            }
            _ => false,
        }
    }

    /// The value at the current read cursor position, or `""` if `iterate`
    /// has not been called or has returned `false`.
    pub fn resource(&self) -> &str {
        match self.fetch_cursor {
            Some((group, idx)) if idx > 0 => self.engine.sequences.word(group, idx - 1).unwrap_or(""),
            _ => "",
        }
    }

    pub fn resource_length(&self) -> usize {
        match self.fetch_cursor {
            Some((group, _)) => self.engine.sequences.group_len(group),
            None => 0,
        }
    }

    pub fn error(&self) -> Option<ConfigError> {
        self.engine.sticky
    }

    pub fn last_error(&self) -> Option<&ConfigError> {
        self.engine.sticky.as_ref()
    }

    /// Clears `Overflow`/`Memory`; has no effect on the placeholder
    /// instance's `Invalid` state.
    pub fn repair(&mut self) {
        if self.engine.sticky != Some(ConfigError::Invalid) {
            self.engine.sticky = None;
        }
    }

    pub fn restrict(&mut self) {
        self.restricted = true;
        self.engine.restricted = true;
    }

    pub fn unrestrict(&mut self) {
        self.restricted = false;
        self.engine.restricted = false;
    }

    /// Lines collected by `PRINT` statements during the most recent load,
    /// in order.
    pub fn printed_lines(&self) -> &[String] {
        &self.engine.print_log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_inert() {
        let mut c = Config::placeholder();
        c.push_source("whatever.cfg");
        c.load();
        assert_eq!(c.error(), Some(ConfigError::Invalid));
        c.repair();
        assert_eq!(c.error(), Some(ConfigError::Invalid));
    }

    #[test]
    fn fetch_iterate_resource_walk_a_declared_value_list() {
        let mut c = Config::new();
        c.load_internal("window size 800 600\n");
        c.fetch("window", "size");
        assert_eq!(c.resource_length(), 2);
        assert!(c.iterate());
        assert_eq!(c.resource(), "800");
        assert!(c.iterate());
        assert_eq!(c.resource(), "600");
        assert!(!c.iterate());
    }

    #[test]
    fn fetch_of_unknown_resource_iterates_to_nothing() {
        let mut c = Config::new();
        c.load_internal("window size 800 600\n");
        c.fetch("window", "missing");
        assert!(!c.iterate());
        assert_eq!(c.resource(), "");
    }

    #[test]
    fn parameter_injection_falls_back_when_no_variable_matches() {
        let mut c = Config::new();
        c.push_param("scale", ParamValue::Double(1337.0));
        c.load_internal("display factor (% scale)\n");
        c.fetch("display", "factor");
        c.iterate();
        assert_eq!(c.resource(), "1337.00000000");
    }

    #[test]
    fn restrict_blocks_variable_declarations_but_not_resources() {
        let mut c = Config::new();
        c.restrict();
        c.load_internal("LET x 1\nwindow title visible\n");
        c.fetch("window", "title");
        c.iterate();
        assert_eq!(c.resource(), "visible");
    }

    #[test]
    fn reload_does_not_leak_variables_from_a_previous_load() {
        let mut c = Config::new();
        c.load_internal("LET x 1\nwindow title (% x)\n");
        c.load_internal("window title (% x)\n");
        c.fetch("window", "title");
        c.iterate();
        assert_eq!(c.resource(), "");
    }

    #[test]
    fn clone_is_independent_of_the_original() {
        let mut c = Config::new();
        c.load_internal("window title original\n");
        let mut cloned = c.clone();
        cloned.load_internal("window title changed\n");

        c.fetch("window", "title");
        c.iterate();
        assert_eq!(c.resource(), "original");

        cloned.fetch("window", "title");
        cloned.iterate();
        assert_eq!(cloned.resource(), "changed");
    }
}
