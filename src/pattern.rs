//! Filter patterns selecting triples and events.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::term::{Iri, Subject, Term};
use crate::triple::Triple;

/// A (subject?, predicate?, object?) template.
///
/// `None` in any position is a wildcard. A pattern matches a triple iff
/// every non-wildcard component equals the corresponding triple component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriplePattern {
    /// Subject to match, or `None` for any.
    pub subject: Option<Subject>,
    /// Predicate to match, or `None` for any.
    pub predicate: Option<Iri>,
    /// Object to match, or `None` for any.
    pub object: Option<Term>,
}

impl TriplePattern {
    /// The all-wildcard pattern matching every triple.
    #[must_use]
    pub const fn any() -> Self {
        Self {
            subject: None,
            predicate: None,
            object: None,
        }
    }

    /// The fully bound pattern matching exactly `triple`.
    #[must_use]
    pub fn of(triple: &Triple) -> Self {
        Self {
            subject: Some(triple.subject.clone()),
            predicate: Some(triple.predicate.clone()),
            object: Some(triple.object.clone()),
        }
    }

    /// Binds the subject position.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<Subject>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Binds the predicate position.
    #[must_use]
    pub fn with_predicate(mut self, predicate: Iri) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Binds the object position.
    #[must_use]
    pub fn with_object(mut self, object: impl Into<Term>) -> Self {
        self.object = Some(object.into());
        self
    }

    /// Returns true if every bound position equals the triple's component.
    #[must_use]
    pub fn matches(&self, triple: &Triple) -> bool {
        if let Some(subject) = &self.subject {
            if *subject != triple.subject {
                return false;
            }
        }
        if let Some(predicate) = &self.predicate {
            if *predicate != triple.predicate {
                return false;
            }
        }
        if let Some(object) = &self.object {
            if *object != triple.object {
                return false;
            }
        }
        true
    }

    /// Returns true if all three positions are wildcards.
    #[must_use]
    pub const fn is_wildcard(&self) -> bool {
        self.subject.is_none() && self.predicate.is_none() && self.object.is_none()
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn position(f: &mut fmt::Formatter<'_>, value: Option<&dyn fmt::Display>) -> fmt::Result {
            match value {
                Some(v) => write!(f, "{v}"),
                None => write!(f, "?"),
            }
        }

        write!(f, "(")?;
        position(f, self.subject.as_ref().map(|s| s as &dyn fmt::Display))?;
        write!(f, " ")?;
        position(f, self.predicate.as_ref().map(|p| p as &dyn fmt::Display))?;
        write!(f, " ")?;
        position(f, self.object.as_ref().map(|o| o as &dyn fmt::Display))?;
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{BlankNode, Literal};

    fn iri(s: &str) -> Iri {
        Iri::new(s).unwrap()
    }

    fn sample() -> Triple {
        Triple::new(
            iri("http://e.com/s"),
            iri("http://e.com/p"),
            Literal::plain("v"),
        )
    }

    #[test]
    fn test_wildcard_matches_everything() {
        let pattern = TriplePattern::any();
        assert!(pattern.is_wildcard());
        assert!(pattern.matches(&sample()));
        assert!(pattern.matches(&Triple::new(
            BlankNode::new(),
            iri("http://e.com/q"),
            BlankNode::new(),
        )));
    }

    #[test]
    fn test_bound_positions() {
        let triple = sample();

        let pattern = TriplePattern::any().with_subject(iri("http://e.com/s"));
        assert!(pattern.matches(&triple));

        let pattern = TriplePattern::any().with_subject(iri("http://e.com/other"));
        assert!(!pattern.matches(&triple));

        let pattern = TriplePattern::any()
            .with_predicate(iri("http://e.com/p"))
            .with_object(Literal::plain("v"));
        assert!(pattern.matches(&triple));

        let pattern = TriplePattern::any().with_object(Literal::plain("w"));
        assert!(!pattern.matches(&triple));
    }

    #[test]
    fn test_fully_bound_pattern() {
        let triple = sample();
        let pattern = TriplePattern::of(&triple);
        assert!(pattern.matches(&triple));
        assert!(!pattern.is_wildcard());

        let other = Triple::new(
            iri("http://e.com/s"),
            iri("http://e.com/p"),
            Literal::plain("other"),
        );
        assert!(!pattern.matches(&other));
    }

    #[test]
    fn test_blank_node_pattern_is_identity_based() {
        let node = BlankNode::new();
        let triple = Triple::new(node, iri("http://e.com/p"), Literal::plain("v"));

        assert!(TriplePattern::any().with_subject(node).matches(&triple));
        assert!(!TriplePattern::any()
            .with_subject(BlankNode::new())
            .matches(&triple));
    }

    #[test]
    fn test_display() {
        let pattern = TriplePattern::any().with_predicate(iri("http://e.com/p"));
        assert_eq!(format!("{pattern}"), "(? <http://e.com/p> ?)");
    }
}
