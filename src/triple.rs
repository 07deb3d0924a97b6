//! The atomic unit of a graph: the triple.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::term::{Iri, Subject, Term};

/// A (subject, predicate, object) statement.
///
/// Triples are immutable. Equality is component-wise and hashing combines
/// the three component hashes in order, so two triples that differ only in
/// blank-node identity are not equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    /// The subject: an IRI or blank node.
    pub subject: Subject,
    /// The predicate: always an IRI.
    pub predicate: Iri,
    /// The object: any term.
    pub object: Term,
}

impl Triple {
    /// Creates a triple from its three components.
    #[must_use]
    pub fn new(subject: impl Into<Subject>, predicate: Iri, object: impl Into<Term>) -> Self {
        Self {
            subject: subject.into(),
            predicate,
            object: object.into(),
        }
    }

    /// Returns a builder that validates all components are present.
    #[must_use]
    pub fn builder() -> TripleBuilder {
        TripleBuilder::default()
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// Builder for [`Triple`] that reports which component is missing.
///
/// [`Triple::new`] is infallible because the type system guarantees all
/// components; the builder is the checked path for callers assembling a
/// triple from optional inputs.
#[derive(Debug, Default)]
pub struct TripleBuilder {
    subject: Option<Subject>,
    predicate: Option<Iri>,
    object: Option<Term>,
}

impl TripleBuilder {
    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<Subject>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the predicate.
    #[must_use]
    pub fn predicate(mut self, predicate: Iri) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Sets the object.
    #[must_use]
    pub fn object(mut self, object: impl Into<Term>) -> Self {
        self.object = Some(object.into());
        self
    }

    /// Builds the triple.
    ///
    /// # Errors
    /// Returns [`ValidationError::MissingField`] naming the first absent
    /// component.
    pub fn build(self) -> Result<Triple, ValidationError> {
        let subject = self
            .subject
            .ok_or(ValidationError::MissingField { field: "subject" })?;
        let predicate = self.predicate.ok_or(ValidationError::MissingField {
            field: "predicate",
        })?;
        let object = self
            .object
            .ok_or(ValidationError::MissingField { field: "object" })?;
        Ok(Triple {
            subject,
            predicate,
            object,
        })
    }
}
