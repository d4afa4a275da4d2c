//! Text form of a [`CrabConfig`].
//!
//! The output is the Python module the submission client loads with
//! `crab submit --config`. Parsing reads the same subset back through the
//! field table, so rendering followed by parsing gives back an equal value.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use pest::iterators::Pair;
use pest::Parser;

use super::{known_fields, CrabConfig, FieldValue, SCHEMA};
use crate::error::{GridError, GridResult};

#[derive(pest_derive::Parser)]
#[grammar = "crab/config.pest"]
struct ConfigParser;

const IMPORT_LINE: &str = "from WMCore.Configuration import Configuration";
const DECLARE_LINE: &str = "config = Configuration()";

pub fn render(config: &CrabConfig) -> String {
    render_with_banner(config, None)
}

/// Render with optional leading comment lines.
pub fn render_with_banner(config: &CrabConfig, banner: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(banner) = banner {
        for line in banner.lines() {
            let _ = writeln!(out, "# {}", line);
        }
    }
    let _ = writeln!(out, "{}", IMPORT_LINE);
    let _ = writeln!(out, "{}", DECLARE_LINE);
    for (section, fields) in SCHEMA {
        let _ = writeln!(out);
        let _ = writeln!(out, "config.section_({})", py_str(section));
        for field in *fields {
            // every (section, field) in SCHEMA has a slot
            if let Ok(Some(value)) = config.get(section, field) {
                let _ = writeln!(out, "config.{}.{} = {}", section, field, py_value(&value));
            }
        }
    }
    out
}

pub fn parse(source: &str) -> GridResult<CrabConfig> {
    let file = ConfigParser::parse(Rule::file, source)
        .map_err(|e| GridError::syntax(e.to_string()))?
        .next()
        .ok_or_else(|| GridError::syntax("empty input"))?;

    let mut config = CrabConfig::default();
    let mut declared: Vec<String> = Vec::new();
    for pair in file.into_inner() {
        match pair.as_rule() {
            Rule::import | Rule::declare | Rule::EOI => {}
            Rule::section => {
                let name = unquote(first_inner(pair)?)?;
                if known_fields(&name).is_none() {
                    return Err(GridError::UnknownSection { section: name });
                }
                if !declared.contains(&name) {
                    declared.push(name);
                }
            }
            Rule::assignment => {
                let (line, _) = pair.line_col();
                let mut inner = pair.into_inner();
                let section = next_text(&mut inner)?;
                let field = next_text(&mut inner)?;
                let value_pair = inner
                    .next()
                    .ok_or_else(|| GridError::syntax(format!("line {}: missing value", line)))?;
                if !declared.iter().any(|s| s == section) {
                    return Err(GridError::syntax(format!(
                        "line {}: section '{}' used before config.section_('{}')",
                        line, section, section
                    )));
                }
                let path = format!("{}.{}", section, field);
                let value = parse_value(value_pair)?;
                config.slot_mut(section, field)?.assign(&path, value)?;
            }
            other => {
                return Err(GridError::syntax(format!("unexpected element {:?}", other)));
            }
        }
    }
    Ok(config)
}

pub fn read_file<P: AsRef<Path>>(path: P) -> GridResult<CrabConfig> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|e| GridError::io(path, e))?;
    parse(&source)
}

fn first_inner(pair: Pair<'_, Rule>) -> GridResult<Pair<'_, Rule>> {
    pair.into_inner()
        .next()
        .ok_or_else(|| GridError::syntax("missing token"))
}

fn next_text<'a>(inner: &mut pest::iterators::Pairs<'a, Rule>) -> GridResult<&'a str> {
    inner
        .next()
        .map(|p| p.as_str())
        .ok_or_else(|| GridError::syntax("missing name"))
}

fn parse_value(pair: Pair<'_, Rule>) -> GridResult<Option<FieldValue>> {
    match pair.as_rule() {
        Rule::none => Ok(None),
        Rule::boolean => Ok(Some(FieldValue::Bool(pair.as_str() == "True"))),
        Rule::integer => pair
            .as_str()
            .parse::<i64>()
            .map(|i| Some(FieldValue::Int(i)))
            .map_err(|e| GridError::syntax(format!("bad integer {}: {}", pair.as_str(), e))),
        Rule::string => Ok(Some(FieldValue::Str(unquote(pair)?))),
        Rule::list => pair
            .into_inner()
            .map(|item| match item.as_rule() {
                Rule::string => unquote(item),
                _ => Err(GridError::syntax(format!(
                    "only strings are supported in lists, found {}",
                    item.as_str()
                ))),
            })
            .collect::<GridResult<Vec<_>>>()
            .map(|items| Some(FieldValue::List(items))),
        other => Err(GridError::syntax(format!("unexpected value {:?}", other))),
    }
}

/// Decode a `string` pair into its contents.
fn unquote(pair: Pair<'_, Rule>) -> GridResult<String> {
    let body = first_inner(pair)?;
    unescape(body.as_str())
}

fn unescape(raw: &str) -> GridResult<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escaped) = chars.next() else {
            return Err(GridError::syntax("dangling backslash in string"));
        };
        match escaped {
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'x' | 'u' | 'U' => {
                let width = match escaped {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = chars.by_ref().take(width).collect();
                let decoded = u32::from_str_radix(&digits, 16)
                    .ok()
                    .filter(|_| digits.len() == width)
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        GridError::syntax(format!("invalid escape \\{}{}", escaped, digits))
                    })?;
                out.push(decoded);
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Ok(out)
}

fn py_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Str(s) => py_str(s),
        FieldValue::Int(i) => i.to_string(),
        FieldValue::Bool(true) => "True".to_string(),
        FieldValue::Bool(false) => "False".to_string(),
        FieldValue::List(items) => {
            let items: Vec<String> = items.iter().map(|s| py_str(s)).collect();
            format!("[{}]", items.join(", "))
        }
    }
}

/// Python `repr` of a string.
fn py_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => {
                let code = c as u32;
                if code <= 0xff {
                    let _ = write!(out, "\\x{:02x}", code);
                } else {
                    let _ = write!(out, "\\u{:04x}", code);
                }
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
