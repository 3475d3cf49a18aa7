//! Line-oriented import extraction for files the Python parser rejects.
//!
//! Legacy sources (Python 2 `print` statements, `exec` statements, stray tabs) still carry
//! well-formed import lines. This scanner recovers them without building an AST. Quotes are
//! tracked within a single line only, so an import-looking line inside a docstring is picked up too.

use crate::visitor::{ImportRequest, ImportedName};
use regex::Regex;
use std::collections::HashSet;

lazy_static::lazy_static! {
    static ref IMPORT_RE: Regex = Regex::new(r"^import\s+(.+)$").unwrap();
    static ref FROM_RE: Regex = Regex::new(r"^from\s+(\.*)\s*([\w.]*)\s+import\s+(.+)$").unwrap();
    static ref IMPORT_START_RE: Regex = Regex::new(r"(?:^|;)\s*(?:from|import)\s").unwrap();
    static ref DOTTED_RE: Regex = Regex::new(r"^[A-Za-z_][\w]*(\.[A-Za-z_][\w]*)*$").unwrap();
}

/// Extracts import statements from raw source text.
pub fn scan_imports(source: &str, ignored_lines: &HashSet<usize>) -> Vec<ImportRequest> {
    let mut imports = Vec::new();
    for (line, statement) in logical_lines(source) {
        if ignored_lines.contains(&line) {
            continue;
        }
        for part in statement.split(';') {
            if let Some(request) = parse_statement(part.trim(), line) {
                imports.push(request);
            }
        }
    }
    imports
}

/// Joins backslash continuations and open parentheses into single logical lines.
///
/// Yields the 1-indexed line where each logical line starts, with comments stripped.
/// Only import statements are joined across open parentheses; any other statement ends
/// at its physical line, so an unbalanced call in broken code cannot swallow the rest of the file.
fn logical_lines(source: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut start = 0;
    let mut open_parens: i32 = 0;

    for (i, raw) in source.lines().enumerate() {
        let (code, balance) = split_code(raw);
        if current.is_empty() {
            start = i + 1;
        }
        let (code, continued) = match code.strip_suffix('\\') {
            Some(head) => (head, true),
            None => (code, false),
        };
        open_parens += balance;
        current.push_str(code);
        current.push(' ');

        let joining = open_parens > 0 && IMPORT_START_RE.is_match(current.trim_start());
        if !continued && !joining {
            lines.push((start, std::mem::take(&mut current)));
            open_parens = 0;
        }
    }
    if !current.trim().is_empty() {
        lines.push((start, current));
    }
    lines
}

/// Strips a trailing comment from `line` and returns the code with its parenthesis balance.
///
/// `#` and parentheses inside `'...'` or `"..."` literals are ignored.
fn split_code(line: &str) -> (&str, i32) {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut balance = 0;

    for (pos, c) in line.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '#' => return (line[..pos].trim_end(), balance),
            '(' => balance += 1,
            ')' => balance -= 1,
            _ => {}
        }
    }
    (line.trim_end(), balance)
}

fn parse_statement(statement: &str, line: usize) -> Option<ImportRequest> {
    if let Some(caps) = FROM_RE.captures(statement) {
        let level = caps[1].len() as u32;
        let module = Some(caps[2].to_string()).filter(|m| !m.is_empty());
        if module.as_deref() == Some("__future__") {
            return None;
        }
        if let Some(m) = &module {
            if !DOTTED_RE.is_match(m) {
                return None;
            }
        }
        if level == 0 && module.is_none() {
            return None;
        }
        let names = parse_names(caps[3].trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace()));
        if names.is_empty() {
            return None;
        }
        return Some(ImportRequest::From {
            module,
            level,
            names,
            line,
        });
    }

    if let Some(caps) = IMPORT_RE.captures(statement) {
        let names = parse_names(&caps[1]);
        if names.is_empty() {
            return None;
        }
        return Some(ImportRequest::Import { names, line });
    }
    None
}

/// Parses `a.b as x, c` into names. Malformed items are dropped.
fn parse_names(list: &str) -> Vec<ImportedName> {
    list.split(',')
        .filter_map(|item| {
            let mut words = item.split_whitespace();
            let name = words.next()?;
            if name != "*" && !DOTTED_RE.is_match(name) {
                return None;
            }
            let asname = match (words.next(), words.next()) {
                (Some("as"), Some(alias)) => Some(alias.to_string()),
                _ => None,
            };
            Some(ImportedName {
                name: name.to_string(),
                asname,
            })
        })
        .collect()
}
