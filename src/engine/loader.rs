//! Source loading: opening the root file, driving the parse loop, and the
//! recursive `INCLUDE`/`FOR_EACH` body-capture machinery.

use super::Engine;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

#[cfg(unix)]
fn file_inode(meta: &std::fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.ino()
}

#[cfg(not(unix))]
fn file_inode(meta: &std::fs::Metadata) -> u64 {
    use std::time::UNIX_EPOCH;
    let stamp = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    meta.len() ^ stamp
}

pub(crate) fn parse_current_buffer(engine: &mut Engine) {
    while engine.sticky.is_none() && !engine.eof_reached {
        super::dispatcher::dispatch_line(engine);
    }
}

pub(crate) fn load_root_file(engine: &mut Engine, path: &Path) {
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            log::debug!("source not openable: {} ({e})", path.display());
            return;
        }
    };
    let content = match std::fs::read(path) {
        Ok(c) => c,
        Err(e) => {
            log::debug!("source not readable: {} ({e})", path.display());
            return;
        }
    };
    let inode = file_inode(&meta);
    engine.buf = content;
    engine.pos = 0;
    engine.eol_reached = false;
    engine.eof_reached = false;
    engine.file_inode = inode;
    engine.file_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    engine.ancestors.push(inode);

    log::debug!("loading {}", path.display());
    parse_current_buffer(engine);
    engine.ancestors.pop();
}

pub(crate) fn load_buffer(engine: &mut Engine, text: &str) {
    engine.buf = text.as_bytes().to_vec();
    engine.pos = 0;
    engine.eol_reached = false;
    engine.eof_reached = false;
    engine.file_inode = 0;
    engine.file_dir = PathBuf::new();
    parse_current_buffer(engine);
}

/// `INCLUDE` statement handler. A no-op (after consuming its arguments)
/// when the currently-loading buffer did not come from a real file, since
/// relative paths and cycle detection both need a filesystem identity.
pub(crate) fn include_stmt(engine: &mut Engine) {
    if engine.file_inode == 0 {
        while !engine.eol_reached {
            if engine.get_token().kind == crate::token::TokenKind::Invalid {
                break;
            }
        }
        return;
    }
    let mut paths = Vec::new();
    while !engine.eol_reached {
        let ev = engine.get_token();
        if ev.kind == crate::token::TokenKind::Invalid {
            break;
        }
        paths.push(ev.text);
    }
    for p in paths {
        if engine.sticky.is_some() {
            break;
        }
        let resolved = resolve_include_path(engine, &p);
        load_include_file(engine, &resolved);
    }
}

fn resolve_include_path(engine: &Engine, p: &str) -> PathBuf {
    let pb = PathBuf::from(p);
    if pb.is_absolute() {
        pb
    } else {
        engine.file_dir.join(pb)
    }
}

fn load_include_file(engine: &mut Engine, path: &Path) {
    if engine.depth >= super::MAX_DEPTH {
        engine.set_sticky(ConfigError::Overflow);
        return;
    }
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            log::debug!("include target not found: {} ({e})", path.display());
            return;
        }
    };
    let inode = file_inode(&meta);
    if engine.ancestors.contains(&inode) {
        log::warn!("include cycle detected at {}", path.display());
        return;
    }
    let content = match std::fs::read(path) {
        Ok(c) => c,
        Err(e) => {
            log::debug!("include target not readable: {} ({e})", path.display());
            return;
        }
    };

    let saved_buf = std::mem::replace(&mut engine.buf, content);
    let saved_pos = std::mem::replace(&mut engine.pos, 0);
    let saved_dir = std::mem::replace(
        &mut engine.file_dir,
        path.parent().map(Path::to_path_buf).unwrap_or_default(),
    );
    let saved_inode = std::mem::replace(&mut engine.file_inode, inode);
    let saved_eol = std::mem::replace(&mut engine.eol_reached, false);
    let saved_eof = std::mem::replace(&mut engine.eof_reached, false);
    engine.ancestors.push(inode);
    engine.depth += 1;

    log::debug!("entering include {}", path.display());
    parse_current_buffer(engine);
    log::debug!("leaving include {}", path.display());

    engine.depth -= 1;
    engine.ancestors.pop();
    engine.buf = saved_buf;
    engine.pos = saved_pos;
    engine.file_dir = saved_dir;
    engine.file_inode = saved_inode;
    engine.eol_reached = saved_eol;
    engine.eof_reached = saved_eof;
}

/// Captures the raw, unevaluated body of an outer-most `FOR_EACH` into the
/// iteration book, one source line per group, tracking nesting by the
/// literal first word of each captured line. Returns the half-open span
/// of captured body groups, excluding the matching `FOR_END` line itself.
pub(crate) fn preprocess_for_body(engine: &mut Engine) -> Option<(usize, usize)> {
    let start = engine.iteration.group_count();
    let mut nest = 1u32;
    loop {
        if engine.eof_reached {
            log::warn!("unbalanced FOR_EACH: missing FOR_END");
            return None;
        }
        engine.iteration.begin_group();
        let mut first_word: Option<String> = None;
        loop {
            match engine.read_word() {
                Some(word) => {
                    if first_word.is_none() {
                        first_word = Some(word.clone());
                    }
                    engine.iteration.push_word(word);
                }
                None => break,
            }
        }
        match first_word.as_deref() {
            Some("FOR_EACH") => nest += 1,
            Some("FOR_END") => {
                nest -= 1;
                if nest == 0 {
                    engine.iteration.undo_group();
                    break;
                }
            }
            _ => {}
        }
    }
    Some((start, engine.iteration.group_count()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn include_pulls_in_a_sibling_file() {
        let dir = tempfile::tempdir().unwrap();
        let child = dir.path().join("child.cfg");
        std::fs::File::create(&child).unwrap().write_all(b"window title child\n").unwrap();
        let root = dir.path().join("root.cfg");
        std::fs::File::create(&root)
            .unwrap()
            .write_all(b"INCLUDE child.cfg\n")
            .unwrap();

        let mut e = Engine::new();
        load_root_file(&mut e, &root);
        let ns = e.keys_sequences.find("window", super::super::NS_NAMESPACE_TABLE).unwrap() as u32;
        let g = e.keys_sequences.find("title", ns).unwrap() as usize;
        assert_eq!(e.sequences.word(g, 0), Some("child"));
    }

    #[test]
    fn include_cycle_is_not_followed_twice() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.cfg");
        let b = dir.path().join("b.cfg");
        std::fs::File::create(&a).unwrap().write_all(b"INCLUDE b.cfg\nwindow title a\n").unwrap();
        std::fs::File::create(&b).unwrap().write_all(b"INCLUDE a.cfg\nwindow title b\n").unwrap();

        let mut e = Engine::new();
        load_root_file(&mut e, &a);
        assert!(e.sticky.is_none());
        let ns = e.keys_sequences.find("window", super::super::NS_NAMESPACE_TABLE).unwrap() as u32;
        let g = e.keys_sequences.find("title", ns).unwrap() as usize;
        // both lines still run; the cycle only stops the re-entrant INCLUDE
        assert_eq!(e.sequences.group_len(g), 1);
    }

    #[test]
    fn missing_include_target_is_silently_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root.cfg");
        std::fs::File::create(&root)
            .unwrap()
            .write_all(b"INCLUDE does_not_exist.cfg\nwindow title still_here\n")
            .unwrap();

        let mut e = Engine::new();
        load_root_file(&mut e, &root);
        assert!(e.keys_sequences.find("window", super::super::NS_NAMESPACE_TABLE).is_some());
    }
}
