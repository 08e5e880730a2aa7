//! Diagnostic Normalizer & Matcher
//!
//! Compiler output is compared line by line after canonicalization: all
//! spaces are removed and the standard library's inline namespaces
//! (`std::__1::`, `std::__cxx11::`, `std::__ndk1::`) collapse to `std::`.
//! Expected patterns are written in that canonical form.
//!
//! MSVC prints template arguments in a follow-up block:
//!
//! ```text
//! error C2338: ... NoBindingFoundError<Annotated<A,U>>
//!     with
//!     [
//!         A=Annotation1,
//!         U=std::function<...>
//!     ]
//! ```
//!
//! [`splice_context`] substitutes those `name=expr` pairs back into the line.

use crate::config::HarnessConfig;
use crate::error::CheckError;
use crate::source::replace_word;
use regex::Regex;
use std::sync::OnceLock;

fn inline_namespace_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"std::(?:__1::|__cxx11::|__ndk1::)+").ok())
        .as_ref()
}

fn binding_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z0-9_-]*)=(.*)$").ok())
        .as_ref()
}

/// Canonicalize one diagnostic line
pub fn normalize_line(line: &str) -> String {
    let compact: String = line.chars().filter(|c| *c != ' ' && *c != '\t').collect();
    match inline_namespace_regex() {
        Some(re) => re.replace_all(&compact, "std::").into_owned(),
        None => compact,
    }
}

/// Split output into canonicalized lines
pub fn normalize_lines(output: &str) -> Vec<String> {
    output.lines().map(normalize_line).collect()
}

/// Substitute an MSVC `with [ name=expr, ... ]` block from `following` into
/// `line`. Returns `line` unchanged when no such block follows.
pub fn splice_context<S: AsRef<str>>(line: &str, following: &[S]) -> Result<String, CheckError> {
    if following.len() < 4 || following[0].as_ref().trim() != "with" {
        return Ok(line.to_string());
    }
    if following[1].as_ref().trim() != "[" {
        return Err(CheckError::Diagnostic(format!(
            "expected '[' after 'with', found: {}",
            following[1].as_ref()
        )));
    }
    let binding = binding_regex()
        .ok_or_else(|| CheckError::Diagnostic("binding pattern unavailable".to_string()))?;

    let mut result = line.to_string();
    for raw in &following[2..] {
        let entry = raw.as_ref().trim();
        if entry == "]" {
            return Ok(result);
        }
        let entry = entry.strip_suffix(',').unwrap_or(entry);
        let caps = binding.captures(entry).ok_or_else(|| {
            CheckError::Diagnostic(format!("malformed 'with' entry: {}", raw.as_ref()))
        })?;
        let (name, expr) = (&caps[1], &caps[2]);
        result = replace_word(&result, name, expr)?;
    }
    Err(CheckError::Diagnostic(
        "unterminated 'with [' block".to_string(),
    ))
}

/// A diagnostic line found by an extraction pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    /// 0-based line index
    pub line: usize,
    /// Capture group 1, or the whole match without groups
    pub capture: String,
}

/// Find the first line matching `pattern`
pub fn find_first<S: AsRef<str>>(lines: &[S], pattern: &Regex) -> Option<Located> {
    lines.iter().enumerate().find_map(|(i, line)| {
        let caps = pattern.captures(line.as_ref())?;
        let capture = caps.get(1).or_else(|| caps.get(0))?.as_str().to_string();
        Some(Located { line: i, capture })
    })
}

/// Extraction patterns compiled from configuration
#[derive(Debug, Clone)]
pub struct DiagnosticPatterns {
    /// Locates the library's error type (searched in normalized lines)
    pub error_type: Regex,
    /// Locates the static assertion message (searched in raw lines)
    pub static_assert: Regex,
    /// Internal namespace forbidden before the expected error
    pub internal_namespace: Regex,
    /// Last 0-based line allowed to carry the expected error
    pub max_error_line: usize,
}

impl DiagnosticPatterns {
    /// Compile the patterns for a configuration
    pub fn from_config(config: &HarnessConfig) -> Result<Self, CheckError> {
        Ok(Self {
            error_type: compile_regex(&config.diagnostics.error_type_pattern)?,
            static_assert: compile_regex(config.static_assert_pattern())?,
            internal_namespace: compile_regex(&config.diagnostics.internal_namespace_pattern)?,
            max_error_line: config.diagnostics.max_error_line,
        })
    }

    /// First raw line, strictly before `end`, mentioning the internal namespace
    pub fn internal_leak<S: AsRef<str>>(&self, raw_lines: &[S], end: usize) -> Option<usize> {
        raw_lines
            .iter()
            .take(end)
            .position(|line| self.internal_namespace.is_match(line.as_ref()))
    }
}

pub(crate) fn compile_regex(pattern: &str) -> Result<Regex, CheckError> {
    Regex::new(pattern).map_err(|e| CheckError::regex(pattern, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_spaces_and_inline_namespaces() {
        assert_eq!(
            normalize_line("  std::__1::vector<std::__cxx11::basic_string<char> >"),
            "std::vector<std::basic_string<char>>"
        );
        assert_eq!(normalize_line("std::__ndk1::__1::map"), "std::map");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_line("fruit::impl::Foo< std::__1::unique_ptr<X> >");
        assert_eq!(normalize_line(&once), once);
    }

    #[test]
    fn test_splice_msvc_block() {
        let following = [
            "with",
            "[",
            "A=Annotation1,",
            "U=std::function<std::unique_ptr<ScalerImpl>(double)>",
            "]",
        ];
        let spliced = splice_context("NoBindingFoundError<Annotated<A,U>>", &following).unwrap();
        assert_eq!(
            spliced,
            "NoBindingFoundError<Annotated<Annotation1,std::function<std::unique_ptr<ScalerImpl>(double)>>>"
        );
    }

    #[test]
    fn test_splice_without_block_is_identity() {
        let following = ["note: see declaration", "x", "y", "z"];
        assert_eq!(splice_context("Foo<T>", &following).unwrap(), "Foo<T>");
        assert_eq!(splice_context("Foo<T>", &["with"]).unwrap(), "Foo<T>");
    }

    #[test]
    fn test_splice_requires_bracket() {
        let following = ["with", "T=int", "]", ""];
        assert!(matches!(
            splice_context("Foo<T>", &following),
            Err(CheckError::Diagnostic(_))
        ));
    }

    #[test]
    fn test_splice_is_whole_word() {
        let following = ["  with", "  [", "    T=int", "  ]"];
        assert_eq!(splice_context("Foo<T,TT>", &following).unwrap(), "Foo<int,TT>");
    }

    #[test]
    fn test_find_first_returns_group_one() {
        let re = Regex::new("fruit::impl::(.*Error<.*>)").unwrap();
        let lines = ["note: x", "error:fruit::impl::NoBindingFoundError<X>", "fruit::impl::OtherError<Y>"];
        assert_eq!(
            find_first(&lines, &re),
            Some(Located {
                line: 1,
                capture: "NoBindingFoundError<X>".to_string()
            })
        );
    }

    #[test]
    fn test_internal_leak_only_before_end() {
        let patterns = DiagnosticPatterns::from_config(&HarnessConfig::default()).unwrap();
        let lines = ["a", "b", "fruit::impl::meta::Eval<X>", "c"];
        assert_eq!(patterns.internal_leak(&lines, 2), None);
        assert_eq!(patterns.internal_leak(&lines, 3), Some(2));
    }
}
