//! SQL text utilities.

/// Escape a string for use in SQL (for identifiers, not values).
pub fn escape_identifier(name: &str) -> String {
    // Double any existing quotes
    let escaped = name.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Check if an identifier needs quoting.
pub fn needs_quoting(name: &str) -> bool {
    // Reserved keywords or names with special characters need quoting
    let reserved = [
        "user", "order", "group", "select", "from", "where", "table", "index",
        "key", "primary", "foreign", "check", "default", "null", "not", "and",
        "or", "in", "is", "like", "between", "case", "when", "then", "else",
        "end", "as", "on", "join", "left", "right", "inner", "outer", "cross",
        "natural", "using", "limit", "offset", "union", "intersect", "except",
        "all", "distinct", "having", "create", "alter", "drop", "insert",
        "update", "delete", "into", "values", "set", "returning",
    ];

    if name.is_empty() || reserved.contains(&name.to_lowercase().as_str()) {
        return true;
    }

    let mut chars = name.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    !starts_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quote an identifier if needed.
pub fn quote_identifier(name: &str) -> String {
    if needs_quoting(name) {
        escape_identifier(name)
    } else {
        name.to_string()
    }
}

/// Check that a configured table or alias name can be spliced into SQL text
/// verbatim.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Ordered bind parameters collected while encoding one query.
///
/// A fresh accumulator is created for every top-level encode and passed by
/// `&mut` through the recursion, so an encoder never holds per-call state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    values: Vec<String>,
}

impl Arguments {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter value.
    pub fn push(&mut self, value: impl Into<String>) -> &mut Self {
        self.values.push(value.into());
        self
    }

    /// Append several parameter values in order.
    pub fn extend<I, S>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values.extend(values.into_iter().map(Into::into));
        self
    }

    /// Number of parameters collected so far.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if no parameters were collected.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Borrow the collected parameters.
    pub fn as_slice(&self) -> &[String] {
        &self.values
    }

    /// Finish collection.
    pub fn into_vec(self) -> Vec<String> {
        self.values
    }
}

impl From<Arguments> for Vec<String> {
    fn from(args: Arguments) -> Self {
        args.into_vec()
    }
}

/// Count the parameter markers a driver would see in `sql`.
///
/// `%`-style markers follow pyformat rules: the whole text is scanned and
/// `%%` is a literal percent sign. Other markers follow SQL tokenization, so
/// text inside a double-quoted identifier is never a marker.
pub fn count_placeholders(sql: &str, placeholder: &str) -> usize {
    if placeholder.is_empty() {
        return 0;
    }
    let pyformat = placeholder.starts_with('%');
    let mut count = 0;
    let mut rest = sql;
    while let Some(c) = rest.chars().next() {
        if pyformat && rest.starts_with("%%") {
            rest = &rest[2..];
        } else if rest.starts_with(placeholder) {
            count += 1;
            rest = &rest[placeholder.len()..];
        } else if !pyformat && c == '"' {
            rest = skip_quoted_identifier(&rest[1..]);
        } else {
            rest = &rest[c.len_utf8()..];
        }
    }
    count
}

// `rest` starts just after an opening quote; `""` is an escaped quote.
fn skip_quoted_identifier(mut rest: &str) -> &str {
    while let Some(end) = rest.find('"') {
        rest = &rest[end + 1..];
        match rest.strip_prefix('"') {
            Some(after) => rest = after,
            None => return rest,
        }
    }
    ""
}
