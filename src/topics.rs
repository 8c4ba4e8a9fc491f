//! Topic selection: explicit list or pattern.
//!
//! A [`TopicSelector`] is applied identically to every consumer in the pool,
//! exactly once per consumer. The two forms are mutually exclusive by
//! construction; the builder's `topics`/`topic_pattern` setters are
//! last-one-wins, and [`SourceBuilder::build`](crate::SourceBuilder::build)
//! rejects configurations where neither was set.

/// Which topics a pool consumer subscribes to.
///
/// Immutable after construction. Validation (non-empty list, non-empty
/// names/pattern) happens at build time, not here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TopicSelector {
    /// An explicit, ordered list of topic names.
    List(Vec<String>),

    /// A broker-side subscription pattern (e.g. `^events\..*`).
    ///
    /// The pattern syntax is owned by the consumer implementation; the pool
    /// passes it through untouched.
    Pattern(String),
}

impl TopicSelector {
    /// Builds a list selector from anything yielding topic names.
    pub fn list<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TopicSelector::List(topics.into_iter().map(Into::into).collect())
    }

    /// Builds a pattern selector.
    pub fn pattern(pattern: impl Into<String>) -> Self {
        TopicSelector::Pattern(pattern.into())
    }

    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            TopicSelector::List(topics) => format!("topics={topics:?}"),
            TopicSelector::Pattern(pattern) => format!("pattern={pattern:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_preserves_order() {
        let selector = TopicSelector::list(["one", "two"]);
        assert_eq!(
            selector,
            TopicSelector::List(vec!["one".to_string(), "two".to_string()])
        );
    }

    #[test]
    fn describe_names_the_form() {
        assert!(TopicSelector::list(["a"]).describe().starts_with("topics="));
        assert!(TopicSelector::pattern("^a").describe().starts_with("pattern="));
    }
}
