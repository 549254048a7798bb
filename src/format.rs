//! Context-field extraction and message prefixing.

use std::borrow::Cow;
use std::fmt::Write;

use crate::config::ContextFieldConfig;
use crate::context::LogContext;

/// Returns `(name, value)` for every configured key present in `ctx` with a
/// non-empty value, in configured order.
pub fn extract_fields<'a>(keys: &'a [String], ctx: Option<&'a LogContext>) -> Vec<(&'a str, &'a str)> {
    let Some(ctx) = ctx else {
        return Vec::new();
    };

    keys.iter()
        .filter_map(|key| {
            ctx.field(key)
                .filter(|value| !value.is_empty())
                .map(|value| (key.as_str(), value))
        })
        .collect()
}

/// Renders `[name:value]...` prefixes in front of a message.
#[derive(Debug, Clone, Default)]
pub struct MessageFormatter {
    fields: ContextFieldConfig,
}

impl MessageFormatter {
    pub fn new(fields: ContextFieldConfig) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &ContextFieldConfig {
        &self.fields
    }

    /// Borrows `message` unchanged when there is nothing to prefix.
    pub fn format<'a>(&self, ctx: Option<&LogContext>, message: &'a str) -> Cow<'a, str> {
        let pairs = extract_fields(self.fields.keys(), ctx);
        if pairs.is_empty() {
            return Cow::Borrowed(message);
        }

        let prefix_len: usize = pairs.iter().map(|(k, v)| k.len() + v.len() + 3).sum();
        let mut out = String::with_capacity(prefix_len + 3 + message.len());
        for (name, value) in &pairs {
            // Writing to a String cannot fail.
            let _ = write!(out, "[{name}:{value}]");
        }
        out.push_str(" - ");
        out.push_str(message);
        Cow::Owned(out)
    }
}
