// Structured query keys.
// Ordered scalar segments compared by value; a page cursor extends a prefix.

use std::fmt;

/// One scalar segment of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeySegment {
    Text(String),
    Number(u64),
    /// An unset parameter, e.g. a route without a tag yet.
    Empty,
}

impl fmt::Display for KeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySegment::Text(text) => write!(f, "{:?}", text),
            KeySegment::Number(n) => write!(f, "{}", n),
            KeySegment::Empty => f.write_str("_"),
        }
    }
}

impl From<&str> for KeySegment {
    fn from(value: &str) -> Self {
        KeySegment::Text(value.to_string())
    }
}

impl From<String> for KeySegment {
    fn from(value: String) -> Self {
        KeySegment::Text(value)
    }
}

impl From<u32> for KeySegment {
    fn from(value: u32) -> Self {
        KeySegment::Number(u64::from(value))
    }
}

impl From<u64> for KeySegment {
    fn from(value: u64) -> Self {
        KeySegment::Number(value)
    }
}

impl<T: Into<KeySegment>> From<Option<T>> for KeySegment {
    fn from(value: Option<T>) -> Self {
        value.map_or(KeySegment::Empty, Into::into)
    }
}

/// Identifies one cached query.
///
/// Equal iff the segments are equal in order and value. Keys are never
/// mutated; [`with_page`](Self::with_page) builds a new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<KeySegment>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<KeySegment>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// A single-segment key.
    pub fn named(name: &str) -> Self {
        Self(vec![KeySegment::from(name)])
    }

    /// Append a segment, consuming the key.
    pub fn with(mut self, segment: impl Into<KeySegment>) -> Self {
        self.0.push(segment.into());
        self
    }

    /// The key of page `index` under this prefix.
    pub fn with_page(&self, index: u32) -> Self {
        self.clone().with(KeySegment::Number(u64::from(index)))
    }

    pub fn segments(&self) -> &[KeySegment] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", segment)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        let a = QueryKey::named("metadatas-by-tag").with("cat");
        let b = QueryKey::new(["metadatas-by-tag", "cat"]);
        let c = QueryKey::new(["cat", "metadatas-by-tag"]);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_text_and_number_differ() {
        let text = QueryKey::named("page").with("1");
        let number = QueryKey::named("page").with(1u32);
        assert_ne!(text, number);
    }

    #[test]
    fn test_optional_segment() {
        let unset = QueryKey::named("metadata").with(None::<String>);
        assert_eq!(unset.segments()[1], KeySegment::Empty);
        assert_eq!(unset.to_string(), r#"["metadata", _]"#);
    }

    #[test]
    fn test_with_page_extends_prefix() {
        let prefix = QueryKey::named("metadatas");
        let page = prefix.with_page(2);

        assert!(page.starts_with(&prefix));
        assert!(!prefix.starts_with(&page));
        assert_eq!(page.to_string(), r#"["metadatas", 2]"#);
        assert_eq!(prefix.segments().len(), 1);
    }
}
