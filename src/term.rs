//! RDF term model: IRIs, blank nodes, and literals.
//!
//! Terms are immutable value types. Equality and hashing follow RDF
//! semantics: IRIs compare by string, literals field-wise, and blank nodes
//! by identity - each freshly minted blank node is a distinct existential
//! identifier, never structurally equal to another.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::vocab::xsd;

/// An internationalized resource identifier.
///
/// Equality and hash are string-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Iri(String);

impl Iri {
    /// Creates an IRI from a non-empty string.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyIri`] for an empty string.
    pub fn new(iri: impl Into<String>) -> Result<Self, ValidationError> {
        let iri = iri.into();
        if iri.is_empty() {
            return Err(ValidationError::EmptyIri);
        }
        Ok(Self(iri))
    }

    /// Returns the IRI as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

/// An existentially identified node with no global name.
///
/// Every call to [`BlankNode::new`] mints a distinct node. Equality is
/// identity-based: only copies of the same node compare equal, never two
/// independently created nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlankNode(Uuid);

impl BlankNode {
    /// Mints a fresh blank node.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BlankNode {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:{}", self.0.simple())
    }
}

/// A typed or language-tagged lexical value.
///
/// Equality compares lexical form, datatype, and language tag field-wise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Literal {
    /// A plain literal: lexical form with an optional language tag.
    Plain {
        /// The lexical form.
        lexical: String,
        /// Optional BCP 47 language tag.
        language: Option<String>,
    },

    /// A typed literal: lexical form with a datatype IRI.
    Typed {
        /// The lexical form.
        lexical: String,
        /// The datatype IRI.
        datatype: Iri,
    },
}

impl Literal {
    /// Creates a plain literal without a language tag.
    #[must_use]
    pub fn plain(lexical: impl Into<String>) -> Self {
        Self::Plain {
            lexical: lexical.into(),
            language: None,
        }
    }

    /// Creates a plain literal with a language tag.
    #[must_use]
    pub fn plain_with_language(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Self::Plain {
            lexical: lexical.into(),
            language: Some(language.into()),
        }
    }

    /// Creates a typed literal.
    #[must_use]
    pub fn typed(lexical: impl Into<String>, datatype: Iri) -> Self {
        Self::Typed {
            lexical: lexical.into(),
            datatype,
        }
    }

    /// Creates an `xsd:base64Binary` typed literal.
    ///
    /// These literals are offloaded to disk by
    /// [`crate::store::ExternalizedGraph`].
    #[must_use]
    pub fn base64_binary(lexical: impl Into<String>) -> Self {
        Self::Typed {
            lexical: lexical.into(),
            datatype: Iri(xsd::BASE64_BINARY.to_string()),
        }
    }

    /// Returns the lexical form.
    #[must_use]
    pub fn lexical_form(&self) -> &str {
        match self {
            Self::Plain { lexical, .. } | Self::Typed { lexical, .. } => lexical,
        }
    }

    /// Returns the datatype IRI for typed literals.
    #[must_use]
    pub const fn datatype(&self) -> Option<&Iri> {
        match self {
            Self::Plain { .. } => None,
            Self::Typed { datatype, .. } => Some(datatype),
        }
    }

    /// Returns the language tag for tagged plain literals.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        match self {
            Self::Plain { language, .. } => language.as_deref(),
            Self::Typed { .. } => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain {
                lexical,
                language: None,
            } => write!(f, "{lexical:?}"),
            Self::Plain {
                lexical,
                language: Some(tag),
            } => write!(f, "{lexical:?}@{tag}"),
            Self::Typed { lexical, datatype } => write!(f, "{lexical:?}^^{datatype}"),
        }
    }
}

/// A term allowed in the subject position: IRI or blank node.
///
/// Serialized with adjacent tagging (`kind` + `value`): the variant payloads
/// are plain strings, which an inline tag cannot carry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Subject {
    /// A named resource.
    Iri(Iri),
    /// An anonymous resource.
    BlankNode(BlankNode),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => iri.fmt(f),
            Self::BlankNode(node) => node.fmt(f),
        }
    }
}

impl From<Iri> for Subject {
    fn from(iri: Iri) -> Self {
        Self::Iri(iri)
    }
}

impl From<BlankNode> for Subject {
    fn from(node: BlankNode) -> Self {
        Self::BlankNode(node)
    }
}

/// Any RDF term: IRI, blank node, or literal.
///
/// This is the full range of the object position.
///
/// Adjacently tagged like [`Subject`]; this also keeps the nested
/// [`Literal`]'s own `kind` tag out of the term's field namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Term {
    /// A named resource.
    Iri(Iri),
    /// An anonymous resource.
    BlankNode(BlankNode),
    /// A lexical value.
    Literal(Literal),
}

impl Term {
    /// Returns the inner IRI, if this term is one.
    #[must_use]
    pub const fn as_iri(&self) -> Option<&Iri> {
        match self {
            Self::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// Returns the inner literal, if this term is one.
    #[must_use]
    pub const fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    /// Returns a human-readable term kind name.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Iri(_) => "iri",
            Self::BlankNode(_) => "blank_node",
            Self::Literal(_) => "literal",
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => iri.fmt(f),
            Self::BlankNode(node) => node.fmt(f),
            Self::Literal(literal) => literal.fmt(f),
        }
    }
}

impl From<Iri> for Term {
    fn from(iri: Iri) -> Self {
        Self::Iri(iri)
    }
}

impl From<BlankNode> for Term {
    fn from(node: BlankNode) -> Self {
        Self::BlankNode(node)
    }
}

impl From<Literal> for Term {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

impl From<Subject> for Term {
    fn from(subject: Subject) -> Self {
        match subject {
            Subject::Iri(iri) => Self::Iri(iri),
            Subject::BlankNode(node) => Self::BlankNode(node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iri_equality_is_string_based() {
        let a = Iri::new("http://example.com/a").unwrap();
        let b = Iri::new("http://example.com/a").unwrap();
        let c = Iri::new("http://example.com/c").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_iri_rejects_empty() {
        let err = Iri::new("").unwrap_err();
        assert!(matches!(err, ValidationError::EmptyIri));
    }

    #[test]
    fn test_iri_display() {
        let iri = Iri::new("http://example.com/a").unwrap();
        assert_eq!(format!("{iri}"), "<http://example.com/a>");
    }

    #[test]
    fn test_blank_node_identity() {
        let a = BlankNode::new();
        let b = BlankNode::new();
        assert_ne!(a, b);

        // Copies of the same node are the same node.
        let c = a;
        assert_eq!(a, c);
    }

    #[test]
    fn test_blank_node_display_prefix() {
        let node = BlankNode::new();
        assert!(format!("{node}").starts_with("_:"));
    }

    #[test]
    fn test_literal_fieldwise_equality() {
        assert_eq!(Literal::plain("a"), Literal::plain("a"));
        assert_ne!(Literal::plain("a"), Literal::plain("b"));
        assert_ne!(
            Literal::plain("a"),
            Literal::plain_with_language("a", "en")
        );
        assert_ne!(
            Literal::plain_with_language("a", "en"),
            Literal::plain_with_language("a", "de")
        );

        let xsd_string = Iri::new(xsd::STRING).unwrap();
        assert_eq!(
            Literal::typed("a", xsd_string.clone()),
            Literal::typed("a", xsd_string.clone())
        );
        // Same lexical form, different datatype vs. plain.
        assert_ne!(Literal::typed("a", xsd_string), Literal::plain("a"));
    }

    #[test]
    fn test_literal_accessors() {
        let tagged = Literal::plain_with_language("hallo", "de");
        assert_eq!(tagged.lexical_form(), "hallo");
        assert_eq!(tagged.language(), Some("de"));
        assert!(tagged.datatype().is_none());

        let typed = Literal::base64_binary("aGVsbG8=");
        assert_eq!(typed.lexical_form(), "aGVsbG8=");
        assert_eq!(typed.datatype().unwrap().as_str(), xsd::BASE64_BINARY);
        assert!(typed.language().is_none());
    }

    #[test]
    fn test_literal_display() {
        assert_eq!(format!("{}", Literal::plain("hi")), "\"hi\"");
        assert_eq!(
            format!("{}", Literal::plain_with_language("hi", "en")),
            "\"hi\"@en"
        );
        let typed = Literal::typed("42", Iri::new("http://www.w3.org/2001/XMLSchema#int").unwrap());
        assert_eq!(
            format!("{typed}"),
            "\"42\"^^<http://www.w3.org/2001/XMLSchema#int>"
        );
    }

    #[test]
    fn test_term_conversions() {
        let iri = Iri::new("http://example.com/a").unwrap();
        let term: Term = iri.clone().into();
        assert_eq!(term.as_iri(), Some(&iri));
        assert_eq!(term.kind_name(), "iri");

        let subject: Subject = BlankNode::new().into();
        let term: Term = subject.into();
        assert_eq!(term.kind_name(), "blank_node");

        let term: Term = Literal::plain("x").into();
        assert!(term.as_literal().is_some());
        assert!(term.as_iri().is_none());
    }

    #[test]
    fn test_term_serialization_round_trip() {
        let term = Term::Literal(Literal::plain_with_language("bonjour", "fr"));
        let json = serde_json::to_string(&term).unwrap();
        let back: Term = serde_json::from_str(&json).unwrap();
        assert_eq!(term, back);
    }

    #[test]
    fn test_string_payload_variants_serialize() {
        // IRI and blank-node variants carry bare strings; every variant of
        // Subject and Term must survive a round trip.
        let term = Term::Iri(Iri::new("http://example.com/a").unwrap());
        let back: Term = serde_json::from_str(&serde_json::to_string(&term).unwrap()).unwrap();
        assert_eq!(term, back);

        let term = Term::BlankNode(BlankNode::new());
        let back: Term = serde_json::from_str(&serde_json::to_string(&term).unwrap()).unwrap();
        assert_eq!(term, back);

        let subject = Subject::Iri(Iri::new("http://example.com/a").unwrap());
        let back: Subject =
            serde_json::from_str(&serde_json::to_string(&subject).unwrap()).unwrap();
        assert_eq!(subject, back);

        let subject = Subject::BlankNode(BlankNode::new());
        let back: Subject =
            serde_json::from_str(&serde_json::to_string(&subject).unwrap()).unwrap();
        assert_eq!(subject, back);

        // A typed literal nested in a term keeps its own inner tag.
        let term = Term::Literal(Literal::base64_binary("aGk="));
        let back: Term = serde_json::from_str(&serde_json::to_string(&term).unwrap()).unwrap();
        assert_eq!(term, back);
    }
}
