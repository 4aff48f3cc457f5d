//! Notification message rendering.
//!
//! Messages are rendered from registered template strings with
//! `{placeholder}` substitution from the notice context. Lookup
//! falls back from the per-label template to the shared default,
//! so one generic template covers labels without a custom one.

use std::collections::HashMap;

use noticekit_common::{AppError, AppResult};
use serde_json::Value;

/// Per-notice template context.
///
/// Serialized into the stored notice row and replayed through queued
/// batches, so values are plain JSON.
pub type NoticeContext = serde_json::Map<String, Value>;

/// Registry of notification message templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: HashMap<String, String>,
}

impl TemplateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store preloaded with the generic default templates.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut store = Self::new();
        store.register("notification/default/short.txt", "{notice}");
        store.register("notification/default/full.txt", "{notice}\n");
        store.register("notification/default/full.html", "<p>{notice}</p>");
        store.register("notification/default/notice.html", "{notice}");
        store.register("notification/default/email_subject.txt", "{message}");
        store.register(
            "notification/default/email_body.txt",
            "{recipient},\n\n{message}\n\nUnsubscribe: {unsubscribe_link}\n",
        );
        store.register(
            "notification/default/email_body.html",
            "<p>{message}</p>\n<p><a href=\"{unsubscribe_link}\">Unsubscribe</a></p>\n",
        );
        store
    }

    /// Register (or replace) a template body under a name.
    pub fn register(&mut self, name: impl Into<String>, body: impl Into<String>) {
        self.templates.insert(name.into(), body.into());
    }

    /// Render the first registered candidate against the context.
    pub fn render(&self, candidates: &[String], context: &NoticeContext) -> AppResult<String> {
        for name in candidates {
            if let Some(body) = self.templates.get(name) {
                return Ok(substitute(body, context));
            }
        }
        Err(AppError::Template(format!(
            "no template registered for any of {candidates:?}"
        )))
    }

    /// Render a notification template for a label, falling back to the
    /// `default` label.
    pub fn format_notification(
        &self,
        template: &str,
        label: &str,
        context: &NoticeContext,
    ) -> AppResult<String> {
        self.render(
            &[
                format!("notification/{label}/{template}"),
                format!("notification/default/{template}"),
            ],
            context,
        )
    }
}

/// Single pass over the template body. Substituted values are emitted
/// verbatim and never rescanned, so braces inside context values stay
/// literal text. Unknown placeholders are left in place.
fn substitute(body: &str, context: &NoticeContext) -> String {
    let mut out = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        if let Some(value) = context.get(key) {
            out.push_str(&display_value(value));
        } else {
            out.push('{');
            out.push_str(key);
            out.push('}');
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(pairs: &[(&str, Value)]) -> NoticeContext {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_label_template_wins_over_default() {
        let mut store = TemplateStore::with_defaults();
        store.register("notification/comment_posted/short.txt", "New comment: {title}");

        let ctx = context(&[("title", json!("hello")), ("notice", json!("generic"))]);
        let rendered = store
            .format_notification("short.txt", "comment_posted", &ctx)
            .unwrap();

        assert_eq!(rendered, "New comment: hello");
    }

    #[test]
    fn test_falls_back_to_default() {
        let store = TemplateStore::with_defaults();
        let ctx = context(&[("notice", json!("you have mail"))]);

        let rendered = store
            .format_notification("short.txt", "unknown_label", &ctx)
            .unwrap();

        assert_eq!(rendered, "you have mail");
    }

    #[test]
    fn test_missing_template_is_an_error() {
        let store = TemplateStore::new();
        let ctx = NoticeContext::new();

        let err = store
            .format_notification("short.txt", "anything", &ctx)
            .unwrap_err();

        assert_eq!(err.error_code(), "TEMPLATE_ERROR");
    }

    #[test]
    fn test_braces_in_values_stay_literal() {
        // Context values come from application events, so a value must
        // not be able to pull other context entries (like the signed
        // unsubscribe link) into the rendered message.
        let mut store = TemplateStore::new();
        store.register("t", "{notice}");

        let ctx = context(&[
            ("notice", json!("hi {unsubscribe_link}")),
            (
                "unsubscribe_link",
                json!("https://example.com/unsub/SIGNED-TOKEN/"),
            ),
        ]);
        let rendered = store.render(&["t".to_string()], &ctx).unwrap();

        assert_eq!(rendered, "hi {unsubscribe_link}");
    }

    #[test]
    fn test_unmatched_brace_kept_as_text() {
        let mut store = TemplateStore::new();
        store.register("t", "{notice} trailing {brace");

        let ctx = context(&[("notice", json!("ok"))]);
        let rendered = store.render(&["t".to_string()], &ctx).unwrap();

        assert_eq!(rendered, "ok trailing {brace");
    }

    #[test]
    fn test_non_string_values_render() {
        let mut store = TemplateStore::new();
        store.register("t", "count={count} gone={gone}");

        let ctx = context(&[("count", json!(3)), ("gone", Value::Null)]);
        let rendered = store.render(&["t".to_string()], &ctx).unwrap();

        assert_eq!(rendered, "count=3 gone=");
    }
}
