//! Source Synthesizer
//!
//! Turns a test's `setup` prelude and `body` into a C++ translation unit on
//! disk. Parameters are substituted into the body as whole words only, so
//! substituting `X` leaves `XY` alone.

use crate::error::CheckError;
use cxxprobe_core::{ParameterMapping, SOURCE_SUFFIX, create_temp_file};
use regex::{NoExpand, Regex};
use std::path::PathBuf;
use tracing::debug;

/// The C++ text of one test invocation
#[derive(Debug, Clone, Default)]
pub struct SourceFragment {
    /// Common prelude, dedented but never substituted
    pub setup: String,
    /// Per-test code, dedented then substituted
    pub body: String,
    /// Placeholder values; only string values are substituted
    pub params: ParameterMapping,
}

impl SourceFragment {
    /// A fragment without parameters
    pub fn new(setup: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            setup: setup.into(),
            body: body.into(),
            params: ParameterMapping::new(),
        }
    }

    /// Set the parameters
    #[must_use]
    pub fn with_params(mut self, params: ParameterMapping) -> Self {
        self.params = params;
        self
    }

    /// The full translation unit
    pub fn render(&self) -> Result<String, CheckError> {
        let body = substitute_params(&dedent(&self.body), &self.params)?;
        Ok(dedent(&self.setup) + &body)
    }

    /// Write the translation unit to a new temp file and return its path.
    /// The caller removes it.
    pub fn materialize(&self) -> Result<PathBuf, CheckError> {
        let source = self.render()?;
        let path = create_temp_file(SOURCE_SUFFIX, &source).map_err(|source| CheckError::Io {
            path: std::env::temp_dir(),
            source,
        })?;
        debug!("Materialized test source at {}", path.display());
        Ok(path)
    }
}

/// Remove the whitespace prefix common to every non-blank line.
///
/// Whitespace-only lines become empty and do not count towards the prefix.
pub fn dedent(text: &str) -> String {
    let mut margin: Option<&str> = None;
    for line in text.split('\n') {
        if line.trim().is_empty() {
            continue;
        }
        let indent_len = line.len() - line.trim_start_matches([' ', '\t']).len();
        let indent = &line[..indent_len];
        margin = Some(match margin {
            None => indent,
            Some(current) => common_prefix(current, indent),
        });
    }
    let margin = margin.unwrap_or("");

    text.split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                ""
            } else {
                line.strip_prefix(margin).unwrap_or(line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let len = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    &a[..len]
}

/// Replace each whole-word occurrence of a string parameter's name with its
/// value. Non-string parameters are left alone.
pub fn substitute_params(text: &str, params: &ParameterMapping) -> Result<String, CheckError> {
    let mut result = text.to_string();
    for (name, value) in params.iter() {
        if let Some(value) = value.as_str() {
            result = replace_word(&result, name, value)?;
        }
    }
    Ok(result)
}

/// Replace whole-word occurrences of `word` with `replacement`, literally
pub(crate) fn replace_word(text: &str, word: &str, replacement: &str) -> Result<String, CheckError> {
    let pattern = format!(r"\b{}\b", regex::escape(word));
    let re = Regex::new(&pattern).map_err(|e| CheckError::regex(&pattern, e))?;
    Ok(re.replace_all(text, NoExpand(replacement)).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxxprobe_core::{params, try_remove};

    #[test]
    fn test_dedent_common_margin() {
        let text = "\n    struct X {};\n      int y;\n    \n    int main() {}\n";
        assert_eq!(dedent(text), "\nstruct X {};\n  int y;\n\nint main() {}\n");
    }

    #[test]
    fn test_dedent_without_margin_is_identity() {
        assert_eq!(dedent("a\n  b\n"), "a\n  b\n");
    }

    #[test]
    fn test_substitution_is_whole_word() {
        let params = params! { "X" => "Foo" };
        let out = substitute_params("X XY YX X::y (X)", &params).unwrap();
        assert_eq!(out, "Foo XY YX Foo::y (Foo)");
    }

    #[test]
    fn test_substitution_value_is_literal() {
        let params = params! { "T" => "$1 std::vector<int>" };
        assert_eq!(substitute_params("T t;", &params).unwrap(), "$1 std::vector<int> t;");
    }

    #[test]
    fn test_non_string_params_not_substituted() {
        let params = params! { "N" => 3 };
        assert_eq!(substitute_params("int a[N];", &params).unwrap(), "int a[N];");
    }

    #[test]
    fn test_setup_is_not_substituted() {
        let fragment = SourceFragment::new("  struct X {};\n", "  X x;\n")
            .with_params(params! { "X" => "int" });
        assert_eq!(fragment.render().unwrap(), "struct X {};\nint x;\n");
    }

    #[test]
    fn test_materialize_writes_cpp_file() {
        let fragment = SourceFragment::new("struct X{};\n", "int main(){}\n");
        let path = fragment.materialize().unwrap();
        assert!(path.to_string_lossy().ends_with(".cpp"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "struct X{};\nint main(){}\n"
        );
        try_remove(&path);
    }
}
