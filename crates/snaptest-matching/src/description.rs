//! Match descriptions

use snaptest_values::LiveValue;
use std::fmt;

/// Placeholder rendered for a value that could not be read
pub const DESCRIPTION_FAILED: &str = "<description failed>";

/// Text builder for expectations and mismatches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Description {
    text: String,
}

impl Description {
    /// Create an empty description
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append plain text
    pub fn text(&mut self, text: &str) -> &mut Self {
        self.text.push_str(text);
        self
    }

    /// Append a rendered value
    pub fn value(&mut self, value: &LiveValue) -> &mut Self {
        self.text.push_str(&value.to_string());
        self
    }

    /// Append `items` rendered by `render`, between `start` and `end`
    pub fn list<T>(
        &mut self,
        start: &str,
        separator: &str,
        end: &str,
        items: &[T],
        mut render: impl FnMut(&mut Self, &T),
    ) -> &mut Self {
        self.text.push_str(start);
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.text.push_str(separator);
            }
            render(self, item);
        }
        self.text.push_str(end);
        self
    }

    /// Text so far
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Finished text
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_lists() {
        let mut description = Description::new();
        description
            .text("values ")
            .list("[", ", ", "]", &[1, 2, 3], |d, v| {
                d.value(&LiveValue::Int(*v));
            });
        assert_eq!(description.as_str(), "values [1, 2, 3]");
    }
}
