use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};

pub const PLACEHOLDER: &str = "{test}";

/// C prelude used when no `--template` is given. Provides `test_res`,
/// `test_asserteqm` and `test_expect`, the latter writing to the expectation
/// descriptor.
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/default.fmt");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    MissingPlaceholder,
    RepeatedPlaceholder { count: usize },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::MissingPlaceholder => {
                write!(f, "template has no {PLACEHOLDER} placeholder")
            }
            TemplateError::RepeatedPlaceholder { count } => write!(
                f,
                "template must contain exactly one {PLACEHOLDER} placeholder, found {count}"
            ),
        }
    }
}

impl std::error::Error for TemplateError {}

/// A source template with exactly one substitution point.
#[derive(Debug, Clone)]
pub struct Template {
    text: String,
    at: usize,
}

impl Template {
    pub fn parse(text: impl Into<String>) -> Result<Self, TemplateError> {
        let text = text.into();
        let count = text.matches(PLACEHOLDER).count();
        match count {
            0 => Err(TemplateError::MissingPlaceholder),
            1 => {
                let at = text.find(PLACEHOLDER).unwrap_or_default();
                Ok(Self { text, at })
            }
            count => Err(TemplateError::RepeatedPlaceholder { count }),
        }
    }

    pub fn builtin() -> Result<Self, TemplateError> {
        Self::parse(DEFAULT_TEMPLATE)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read template: {}", path.display()))?;
        Self::parse(text).with_context(|| format!("parse template: {}", path.display()))
    }

    /// Inserts `generated` at the placeholder. The generated text is inserted
    /// verbatim; braces or `{test}` inside it are not expanded again.
    pub fn render(&self, generated: &str) -> String {
        let (head, tail) = self.text.split_at(self.at);
        let tail = &tail[PLACEHOLDER.len()..];
        let mut out = String::with_capacity(head.len() + generated.len() + tail.len());
        out.push_str(head);
        out.push_str(generated);
        out.push_str(tail);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_template_has_one_placeholder() {
        let t = Template::builtin().unwrap();
        let out = t.render("    test_expect(\"hi\\n\");");
        assert!(out.contains("int main(void)"));
        assert!(out.contains("test_expect(\"hi\\n\");"));
        assert!(!out.contains(PLACEHOLDER));
    }

    #[test]
    fn render_is_verbatim() {
        let t = Template::parse("a{ {test} }b").unwrap();
        assert_eq!(t.render("{test} {x}"), "a{ {test} {x} }b");
    }

    #[test]
    fn rejects_missing_and_repeated_placeholders() {
        assert_eq!(
            Template::parse("int main() {}").unwrap_err(),
            TemplateError::MissingPlaceholder
        );
        assert_eq!(
            Template::parse("{test}{test}").unwrap_err(),
            TemplateError::RepeatedPlaceholder { count: 2 }
        );
    }
}
