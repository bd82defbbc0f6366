//! Sequence dispatch: classifies the first token of a logical line and
//! runs the matching statement handler.

use super::evaluator::EvalResult;
use super::{Engine, NS_ITERATION, NS_NAMESPACE_TABLE, NS_SECTION, NS_VARIABLE};
use crate::error::ConfigError;
use crate::token::TokenKind;

pub(crate) fn dispatch_line(engine: &mut Engine) {
    if engine.sticky.is_some() {
        engine.goto_eol();
        return;
    }
    if engine.depth >= super::MAX_DEPTH {
        engine.set_sticky(ConfigError::Overflow);
        engine.goto_eol();
        return;
    }
    engine.depth += 1;
    let first = engine.get_token();
    dispatch_first(engine, first);
    engine.depth -= 1;
    engine.goto_eol();
}

fn should_skip(engine: &Engine, kind: TokenKind) -> bool {
    if kind == TokenKind::SectionBegin {
        return false;
    }
    engine.restricted || engine.skip_sequences
}

fn dispatch_first(engine: &mut Engine, first: EvalResult) {
    use TokenKind::*;
    match first.kind {
        String | Number => {
            if !engine.skip_sequences {
                declare_resource(engine, &first.text);
            }
        }
        VarDeclaration => {
            if !should_skip(engine, first.kind) {
                declare_variable(engine);
            }
        }
        EnumDeclaration => {
            if !should_skip(engine, first.kind) {
                declare_enum(engine);
            }
        }
        VarAppend | VarPrepend | VarMerge => {
            if !should_skip(engine, first.kind) {
                combine_var(engine, first.kind);
            }
        }
        SectionBegin => section_begin(engine),
        SectionAdd => {
            if !should_skip(engine, first.kind) {
                section_add(engine);
            }
        }
        SectionDel => {
            if !should_skip(engine, first.kind) {
                section_del(engine);
            }
        }
        Include => {
            if !should_skip(engine, first.kind) {
                super::loader::include_stmt(engine);
            }
        }
        ForBegin => {
            if !should_skip(engine, first.kind) {
                for_each(engine);
            }
        }
        Seed => {
            if !should_skip(engine, first.kind) {
                seed_stmt(engine);
            }
        }
        Print => {
            if !should_skip(engine, first.kind) {
                print_stmt(engine);
            }
        }
        Restrict => {
            if !should_skip(engine, first.kind) {
                engine.restricted = true;
            }
        }
        _ => {}
    }
}

fn declare_resource(engine: &mut Engine, namespace: &str) {
    if engine.sticky.is_some() {
        return;
    }
    let prop_ev = engine.get_token();
    if prop_ev.kind == TokenKind::Invalid {
        return;
    }
    let property = prop_ev.text;

    engine.sequences.begin_group();
    let new_group_index = engine.sequences.group_count() - 1;
    let mut count = 0usize;
    while !engine.eol_reached {
        let ev = engine.get_token();
        if ev.kind == TokenKind::Invalid {
            break;
        }
        engine.sequences.push_word(ev.text);
        count += 1;
    }
    if count == 0 {
        engine.sequences.undo_group();
        return;
    }
    if engine.sequences.group_count() > super::MAX_GROUPS {
        engine.set_sticky(ConfigError::Overflow);
        return;
    }

    let ns_id = match engine.keys_sequences.find(namespace, NS_NAMESPACE_TABLE) {
        Some(id) => id as u32,
        None => {
            let id = engine.sequences.group_count() as u32;
            engine.keys_sequences.write(namespace, NS_NAMESPACE_TABLE, id as u64);
            id
        }
    };
    engine.keys_sequences.write(&property, ns_id, new_group_index as u64);
}

fn declare_variable(engine: &mut Engine) {
    if engine.sticky.is_some() {
        return;
    }
    let name_ev = engine.get_token();
    if name_ev.kind == TokenKind::Invalid {
        return;
    }
    let name = name_ev.text;

    engine.vars.begin_group();
    let group_idx = engine.vars.group_count() - 1;
    while !engine.eol_reached {
        let ev = engine.get_token();
        if ev.kind == TokenKind::Invalid {
            break;
        }
        engine.vars.push_word(ev.text);
    }
    if engine.vars.group_count() > super::MAX_GROUPS {
        engine.set_sticky(ConfigError::Overflow);
        return;
    }
    engine.keys_vars.write(&name, NS_VARIABLE, group_idx as u64);
}

fn combine_var(engine: &mut Engine, kind: TokenKind) {
    if engine.sticky.is_some() {
        return;
    }
    let name_ev = engine.get_token();
    if name_ev.kind == TokenKind::Invalid {
        return;
    }
    let name = name_ev.text;
    let source_ev = engine.get_token();
    if source_ev.kind == TokenKind::Invalid {
        return;
    }
    let source_name = source_ev.text;
    let extra_ev = engine.get_token();
    if extra_ev.kind == TokenKind::Invalid {
        return;
    }
    let extra = extra_ev.text;

    let source_group = match engine.keys_vars.find(&source_name, NS_VARIABLE) {
        Some(g) => g as usize,
        None => return,
    };
    let len = engine.vars.group_len(source_group);
    let mut words = Vec::with_capacity(len);

    match kind {
        TokenKind::VarAppend => {
            for i in 0..len {
                let w = engine.vars.word(source_group, i).unwrap_or("");
                words.push(format!("{w}{extra}"));
            }
        }
        TokenKind::VarPrepend => {
            for i in 0..len {
                let w = engine.vars.word(source_group, i).unwrap_or("");
                words.push(format!("{extra}{w}"));
            }
        }
        TokenKind::VarMerge => {
            let other_group = match engine.keys_vars.find(&extra, NS_VARIABLE) {
                Some(g) => g as usize,
                None => return,
            };
            let other_len = engine.vars.group_len(other_group);
            for i in 0..len {
                let a = engine.vars.word(source_group, i).unwrap_or("");
                let b = if i < other_len { engine.vars.word(other_group, i).unwrap_or("") } else { "" };
                words.push(format!("{a}{b}"));
            }
        }
        _ => unreachable!(),
    }

    engine.vars.begin_group();
    let group_idx = engine.vars.group_count() - 1;
    for w in words {
        engine.vars.push_word(w);
    }
    engine.keys_vars.write(&name, NS_VARIABLE, group_idx as u64);
}

fn declare_enum(engine: &mut Engine) {
    if engine.sticky.is_some() {
        return;
    }
    let name_ev = engine.get_token();
    if name_ev.kind == TokenKind::Invalid {
        return;
    }
    let name = name_ev.text;

    let mut params = Vec::new();
    while !engine.eol_reached && params.len() < 4 {
        let ev = engine.get_token();
        if ev.kind == TokenKind::Invalid {
            break;
        }
        params.push(ev);
    }

    fn numeral(ev: &EvalResult) -> Option<f64> {
        if ev.kind == TokenKind::Number {
            ev.number
        } else if ev.text.starts_with('#') {
            crate::color::parse_hex(&ev.text).map(|v| v as f64)
        } else {
            ev.text.trim().parse::<f64>().ok()
        }
    }

    let (min, max, steps, precision) = match params.len() {
        0 => return,
        1 => {
            let max = match numeral(&params[0]) {
                Some(v) => v,
                None => return,
            };
            (0.0, max, max, 0.0)
        }
        2 => {
            let (Some(min), Some(max)) = (numeral(&params[0]), numeral(&params[1])) else { return };
            (min, max, max - min, 0.0)
        }
        3 => {
            let (Some(min), Some(max), Some(steps)) =
                (numeral(&params[0]), numeral(&params[1]), numeral(&params[2]))
            else {
                return;
            };
            (min, max, steps, 0.0)
        }
        _ => {
            let (Some(min), Some(max), Some(steps), Some(precision)) = (
                numeral(&params[0]),
                numeral(&params[1]),
                numeral(&params[2]),
                numeral(&params[3]),
            ) else {
                return;
            };
            (min, max, steps, precision)
        }
    };

    if !(steps >= 1.0) || !steps.is_finite() || steps >= usize::MAX as f64 {
        return;
    }
    if precision < 0.0 {
        return;
    }
    let precision = precision.min(16.0) as usize;
    let n = steps.floor() as usize;

    engine.vars.begin_group();
    let group_idx = engine.vars.group_count() - 1;
    for i in 0..=n {
        let t = i as f64 / steps;
        let value = min + (max - min) * t;
        engine.vars.push_word(format!("{value:.precision$}"));
    }
    if engine.vars.group_count() > super::MAX_GROUPS {
        engine.set_sticky(ConfigError::Overflow);
        return;
    }
    engine.keys_vars.write(&name, NS_VARIABLE, group_idx as u64);
}

fn section_begin(engine: &mut Engine) {
    let mut tags = Vec::new();
    while !engine.eol_reached {
        let ev = engine.get_token();
        if ev.kind == TokenKind::Invalid {
            break;
        }
        tags.push(ev.text);
    }
    let all_present = tags.iter().all(|t| engine.keys_vars.find(t, NS_SECTION).is_some());
    engine.skip_sequences = !all_present;
}

fn section_add(engine: &mut Engine) {
    while !engine.eol_reached {
        let ev = engine.get_token();
        if ev.kind == TokenKind::Invalid {
            break;
        }
        engine.keys_vars.write(&ev.text, NS_SECTION, 1);
    }
}

fn section_del(engine: &mut Engine) {
    while !engine.eol_reached {
        let ev = engine.get_token();
        if ev.kind == TokenKind::Invalid {
            break;
        }
        engine.keys_vars.erase(&ev.text, NS_SECTION);
    }
}

fn seed_stmt(engine: &mut Engine) {
    use rand::SeedableRng;
    if let Some(v) = engine.get_token_numeral() {
        engine.rng = rand::rngs::StdRng::seed_from_u64(v as i64 as u64);
    }
}

fn print_stmt(engine: &mut Engine) {
    let mut parts = Vec::new();
    while !engine.eol_reached {
        let ev = engine.get_token();
        if ev.kind == TokenKind::Invalid {
            break;
        }
        parts.push(ev.text);
    }
    let line = parts.join(" ");
    log::info!("{line}");
    engine.print_log.push(line);
}

fn for_each(engine: &mut Engine) {
    let var_ev = engine.get_token();
    let var_name = if var_ev.kind == TokenKind::Invalid { None } else { Some(var_ev.text) };

    let alias = if !engine.eol_reached {
        let ev = engine.get_token();
        if ev.kind == TokenKind::Invalid { None } else { Some(ev.text) }
    } else {
        None
    };
    let alias = alias.or_else(|| var_name.clone());

    let outer_most = engine.iteration.group_count() == 0;
    let span = if outer_most {
        super::loader::preprocess_for_body(engine)
    } else {
        let cur = engine.it_group;
        cur.and_then(|cur| find_nested_for_end(engine, cur))
    };
    let (start, end) = match span {
        Some(s) => s,
        None => {
            if outer_most {
                engine.iteration.clear();
            }
            return;
        }
    };

    if let (Some(var_name), Some(alias)) = (var_name, alias) {
        if engine.keys_vars.find(&alias, NS_ITERATION).is_none() {
            if let Some(group) = engine.keys_vars.find(&var_name, NS_VARIABLE).map(|g| g as usize) {
                let len = engine.vars.group_len(group);
                for i in 0..len {
                    if engine.sticky.is_some() {
                        break;
                    }
                    let global = engine.vars.global_index(group, i).unwrap();
                    engine.keys_vars.write(&alias, NS_ITERATION, global as u64);
                    run_body(engine, start, end);
                }
                engine.keys_vars.erase(&alias, NS_ITERATION);
            }
        }
    }

    if outer_most {
        engine.iteration.clear();
    }
}

/// Dispatches each captured body group exactly once. A body group that is
/// itself a nested `FOR_EACH` runs its own full iteration (over every
/// value of its own loop variable) when dispatched, so the cursor here
/// must jump past that nested loop's body and its closing `FOR_END`
/// rather than walking into those groups a second time as if they were
/// ordinary standalone lines.
fn run_body(engine: &mut Engine, start: usize, end: usize) {
    let mut g = start;
    while g < end {
        if engine.sticky.is_some() {
            break;
        }
        let nested_end = if engine.iteration.word(g, 0) == Some("FOR_EACH") {
            find_nested_for_end(engine, g).map(|(_, nested_end)| nested_end)
        } else {
            None
        };
        engine.it_group = Some(g);
        engine.it_i = 0;
        dispatch_line(engine);
        g = nested_end.map(|e| e + 1).unwrap_or(g + 1);
    }
}

fn find_nested_for_end(engine: &Engine, cur: usize) -> Option<(usize, usize)> {
    let mut nest = 1u32;
    let mut g = cur + 1;
    let total = engine.iteration.group_count();
    while g < total {
        match engine.iteration.word(g, 0) {
            Some("FOR_EACH") => nest += 1,
            Some("FOR_END") => {
                nest -= 1;
                if nest == 0 {
                    return Some((cur + 1, g));
                }
            }
            _ => {}
        }
        g += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> Engine {
        let mut e = Engine::new();
        super::super::load_buffer(&mut e, src);
        e
    }

    #[test]
    fn declares_a_resource() {
        let e = run("window title \"hello\"\n");
        let ns = e.keys_sequences.find("window", NS_NAMESPACE_TABLE).unwrap() as u32;
        let g = e.keys_sequences.find("title", ns).unwrap() as usize;
        assert_eq!(e.sequences.word(g, 0), Some("hello"));
    }

    #[test]
    fn zero_value_resource_is_dropped() {
        let e = run("window title\n");
        assert!(e.keys_sequences.find("window", NS_NAMESPACE_TABLE).is_none());
    }

    #[test]
    fn section_gates_following_statements() {
        let e = run("SECTION debug\nwindow title hidden\n");
        assert!(e.keys_sequences.find("window", NS_NAMESPACE_TABLE).is_none());
    }

    #[test]
    fn section_add_then_reload_passes_the_gate() {
        let mut e = Engine::new();
        super::super::load_buffer(&mut e, "SECTION_ADD debug\n");
        let tag = e.keys_vars.find("debug", NS_SECTION);
        assert!(tag.is_some());
    }

    #[test]
    fn restrict_mutes_everything_but_resources_and_sections() {
        let e = run("RESTRICT\nLET x 1\nwindow title visible\n");
        assert!(e.keys_vars.find("x", NS_VARIABLE).is_none());
        assert!(e.keys_sequences.find("window", NS_NAMESPACE_TABLE).is_some());
    }

    #[test]
    fn for_each_binds_the_alias_per_iteration() {
        let e = run("LET_ENUM n 0 2\nFOR_EACH n i\nitem name (% i)\nFOR_END\n");
        let ns = e.keys_sequences.find("item", NS_NAMESPACE_TABLE).unwrap() as u32;
        let g = e.keys_sequences.find("name", ns).unwrap() as usize;
        assert_eq!(e.sequences.group_len(g), 3);
        assert_eq!(e.sequences.word(g, 0), Some("0.00000000"));
        assert_eq!(e.sequences.word(g, 2), Some("2.00000000"));
    }

    #[test]
    fn nested_for_each_dispatches_each_body_line_exactly_once() {
        let e = run(
            "LET_ENUM n 0 1\nLET_ENUM m 0 1\nFOR_EACH n i\nFOR_EACH m j\nPRINT pair (% i) (% j)\nFOR_END\nFOR_END\n",
        );
        assert_eq!(e.print_log, vec!["pair 0 0", "pair 0 1", "pair 1 0", "pair 1 1"]);
    }
}
