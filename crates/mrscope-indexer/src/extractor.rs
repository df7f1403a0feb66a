//! Text pattern extractors
//!
//! Pure functions over raw file text. Nothing here touches the registry or
//! the filesystem; callers resolve the returned relative paths themselves.

use std::ops::Range;

use mrscope_core::{BindingType, ReferenceMark, SourceType};
use once_cell::sync::Lazy;
use regex::Regex;

static INCLUDE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[^']*?#\s*include\s*"([^"]*)""#).expect("valid regex")
});

static REFERENCE_MARK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*'+\s*"([^"]*)"\s*@\s*([A-Za-z_][A-Za-z0-9_]*)"#).expect("valid regex")
});

static KIND_MARK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*'+\s*(metadata|script)\b").expect("valid regex")
});

static COMPILER_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bmrscriptcl\b").expect("valid regex"));

static COMPILER_SWITCH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)/d:([A-Za-z0-9_]+)=("\\".*?\\""|\S*)"#).expect("valid regex")
});

static RUNNER_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bdmsrun\b").expect("valid regex"));

static RUNNER_SWITCH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)/d\s*"([A-Za-z_]\w*)\s+(\\".*?\\"|[0-9]+|[A-Za-z_][\w.]*)""#)
        .expect("valid regex")
});

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('\'')
}

/// Relative paths of every `#include` outside comments, in text order.
pub fn extract_includes(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !is_comment(line))
        .filter_map(|line| INCLUDE_RE.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|path| !path.is_empty())
        .collect()
}

/// First reference mark found in the leading run of comment lines.
pub fn extract_reference_mark(text: &str) -> Option<ReferenceMark> {
    text.lines()
        .take_while(|line| is_comment(line))
        .find_map(|line| REFERENCE_MARK_RE.captures(line))
        .map(|caps| ReferenceMark {
            path: caps[1].trim().to_string(),
            mark: caps[2].to_string(),
        })
}

/// `'metadata` / `'script` on the first line.
pub fn extract_source_type(text: &str) -> Option<SourceType> {
    let first_line = text.lines().next()?;
    let caps = KIND_MARK_RE.captures(first_line)?;
    if caps[1].eq_ignore_ascii_case("metadata") {
        Some(SourceType::Metadata)
    } else {
        Some(SourceType::Script)
    }
}

/// Type inferred from a macro's value text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacroValueType {
    Boolean,
    String,
    Number,
    Other,
}

impl MacroValueType {
    fn infer(value: &str) -> Self {
        if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
            MacroValueType::Boolean
        } else if value.starts_with("\\\"") || value.starts_with("\"\\\"") {
            MacroValueType::String
        } else if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            MacroValueType::Number
        } else {
            MacroValueType::Other
        }
    }

    /// Declared type of the constant synthesized for the macro.
    pub fn binding(self) -> BindingType {
        match self {
            MacroValueType::Boolean => BindingType::Boolean,
            MacroValueType::Number => BindingType::Long,
            MacroValueType::String => BindingType::String,
            MacroValueType::Other => BindingType::Variant,
        }
    }
}

/// Macro defined on a launcher command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherMacro {
    pub name: String,
    pub value_type: MacroValueType,
    /// Byte span of the whole switch in the launcher text.
    pub span: Range<usize>,
}

/// Macros from `mrscriptcl … /d:NAME=VALUE` and `dmsrun … /d "NAME VALUE"`
/// lines. The first definition of a name wins, ignoring case.
pub fn extract_launcher_macros(text: &str) -> Vec<LauncherMacro> {
    let mut macros: Vec<LauncherMacro> = Vec::new();
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let switches = if COMPILER_LINE_RE.is_match(line) {
            Some(&*COMPILER_SWITCH_RE)
        } else if RUNNER_LINE_RE.is_match(line) {
            Some(&*RUNNER_SWITCH_RE)
        } else {
            None
        };

        if let Some(re) = switches {
            for caps in re.captures_iter(line) {
                let (Some(whole), Some(name), Some(value)) = (caps.get(0), caps.get(1), caps.get(2))
                else {
                    continue;
                };
                let name = name.as_str();
                if macros.iter().any(|m| m.name.eq_ignore_ascii_case(name)) {
                    continue;
                }
                macros.push(LauncherMacro {
                    name: name.to_string(),
                    value_type: MacroValueType::infer(value.as_str()),
                    span: offset + whole.start()..offset + whole.end(),
                });
            }
        }
        offset += line.len();
    }

    macros
}
