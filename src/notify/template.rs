//! `{placeholder}` substitution for scheduled messages

use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::warn;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// Values available to a message template
pub type TemplateContext = BTreeMap<&'static str, String>;

/// Substitute every `{name}` found in `context`.
///
/// Unknown placeholders stay verbatim and are logged; rendering never fails.
pub fn render(template: &str, context: &TemplateContext) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            match context.get(name) {
                Some(value) => value.clone(),
                None => {
                    warn!(placeholder = name, "Unknown placeholder in message template");
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> TemplateContext {
        let mut context = TemplateContext::new();
        context.insert("project", "Roof".to_string());
        context.insert("count", "42".to_string());
        context
    }

    #[test]
    fn test_render_known_placeholders() {
        assert_eq!(
            render("{project}: {count} shots", &context()),
            "Roof: 42 shots"
        );
    }

    #[test]
    fn test_unknown_placeholder_left_verbatim() {
        assert_eq!(
            render("{project} {weather} {count}", &context()),
            "Roof {weather} 42"
        );
    }

    #[test]
    fn test_unbalanced_braces_pass_through() {
        assert_eq!(render("{project {count}} {", &context()), "{project 42} {");
    }
}
