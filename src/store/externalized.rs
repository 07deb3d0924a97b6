//! Content-addressed offloading of oversized literal values.
//!
//! [`ExternalizedGraph`] decorates any base store: triples whose object is a
//! binary-encoded literal are stored with a `urn:x-litrep:<hash>` reference
//! IRI in the object position, while the literal's bytes live in a sharded
//! directory tree keyed by content hash. Cursors map references back to
//! literals, reading a blob only when its triple is actually yielded.
//!
//! The blob write and the base-store triple write are not transactionally
//! coupled: a crash between the two can leave an orphaned reference or an
//! orphaned file. Accepted risk, no retry logic.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{GraphResult, StorageError};
use crate::event::{ListenerRegistry, Scheduler, ThreadScheduler};
use crate::graph::{Cursor, GraphId, GraphLock, GraphStore, TripleCursor};
use crate::pattern::TriplePattern;
use crate::term::{Iri, Literal, Term};
use crate::triple::Triple;
use crate::vocab::xsd;

/// IRI scheme marking an offloaded literal.
///
/// Deliberately not a registered scheme such as `urn:hash`, to avoid
/// colliding with IRIs already present in a graph.
const REFERENCE_PREFIX: &str = "urn:x-litrep:";

/// Separates datatype IRI from lexical form in serialized blobs.
const DELIMITER: &[u8] = b"^^";

/// The content-addressed blob directory backing an [`ExternalizedGraph`].
///
/// Blobs are sharded `<hash[0:2]>/<hash[2:5]>/<hash[5:8]>/<hash[8:]>` under
/// the data directory to bound directory fan-out. The hash is the big-endian
/// CRC32 of the serialized literal followed by its BLAKE3 digest, rendered
/// lowercase hex; the leading CRC32 doubles as a cheap partitioning and
/// equality pre-check. Collisions between distinct literals are not guarded
/// against.
#[derive(Debug, Clone)]
pub struct LiteralStash {
    data_dir: PathBuf,
}

impl LiteralStash {
    /// Creates a stash rooted at `data_dir`. The directory is created lazily
    /// on first write.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        tracing::debug!(dir = %data_dir.display(), "created literal stash");
        Self { data_dir }
    }

    /// Root of the blob directory tree.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns true if `literal` is to be offloaded: its datatype marks it
    /// as binary-encoded content.
    #[must_use]
    pub fn needs_stashing(literal: &Literal) -> bool {
        literal
            .datatype()
            .is_some_and(|datatype| datatype.as_str() == xsd::BASE64_BINARY)
    }

    /// Returns true if `iri` uses the replacement scheme.
    #[must_use]
    pub fn is_reference(iri: &Iri) -> bool {
        iri.as_str().starts_with(REFERENCE_PREFIX)
    }

    /// `utf8(datatype) || "^^" || utf8(lexical-form)`; also the exact blob
    /// file content.
    fn serialize(literal: &Literal) -> Vec<u8> {
        let datatype = literal.datatype().map_or(xsd::STRING, Iri::as_str);
        let lexical = literal.lexical_form();
        let mut bytes = Vec::with_capacity(datatype.len() + DELIMITER.len() + lexical.len());
        bytes.extend_from_slice(datatype.as_bytes());
        bytes.extend_from_slice(DELIMITER);
        bytes.extend_from_slice(lexical.as_bytes());
        bytes
    }

    /// Deterministic lowercase-hex content hash of `literal`.
    #[must_use]
    pub fn hash_hex(literal: &Literal) -> String {
        let serialized = Self::serialize(literal);
        let crc = crc32fast::hash(&serialized);
        let digest = blake3::hash(&serialized);

        let mut bytes = Vec::with_capacity(4 + digest.as_bytes().len());
        bytes.extend_from_slice(&crc.to_be_bytes());
        bytes.extend_from_slice(digest.as_bytes());
        hex::encode(bytes)
    }

    /// The reference IRI for `literal`, computed without touching disk.
    #[must_use]
    pub fn reference(&self, literal: &Literal) -> Iri {
        Self::reference_for_hash(&Self::hash_hex(literal))
    }

    fn reference_for_hash(hash: &str) -> Iri {
        Iri::new(format!("{REFERENCE_PREFIX}{hash}")).expect("reference IRI is never empty")
    }

    /// Sharded blob path for a hex hash.
    ///
    /// # Panics
    /// Panics if `hash` has fewer than 9 characters; well-formed content
    /// hashes are 72 hex digits.
    #[must_use]
    pub fn blob_path(&self, hash: &str) -> PathBuf {
        assert!(hash.len() > 8, "content hash too short to shard: {hash:?}");
        self.data_dir
            .join(&hash[0..2])
            .join(&hash[2..5])
            .join(&hash[5..8])
            .join(&hash[8..])
    }

    /// Writes the literal's blob and returns its reference IRI.
    ///
    /// Content-addressed, so re-stashing an identical literal rewrites the
    /// same bytes to the same path.
    ///
    /// # Errors
    /// [`StorageError::Io`] on filesystem failure.
    pub fn stash(&self, literal: &Literal) -> GraphResult<Iri> {
        let serialized = Self::serialize(literal);
        let hash = Self::hash_hex(literal);
        let path = self.blob_path(&hash);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&path, &serialized).map_err(|source| StorageError::Io { path, source })?;

        Ok(Self::reference_for_hash(&hash))
    }

    /// Reads back the literal a reference IRI points at.
    ///
    /// # Errors
    /// - [`StorageError::BadReference`] if `reference` is not a well-formed
    ///   replacement IRI.
    /// - [`StorageError::MissingBlob`] if no blob exists for the hash.
    /// - [`StorageError::MalformedBlob`] if the blob bytes lack the
    ///   `datatype^^lexical` layout.
    pub fn load(&self, reference: &Iri) -> GraphResult<Literal> {
        let hash = reference
            .as_str()
            .strip_prefix(REFERENCE_PREFIX)
            .filter(|hash| hash.len() > 8 && hash.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| StorageError::BadReference {
                iri: reference.as_str().to_string(),
            })?;

        let path = self.blob_path(hash);
        let bytes = std::fs::read(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                StorageError::MissingBlob {
                    hash: hash.to_string(),
                }
            } else {
                StorageError::Io { path, source }
            }
        })?;

        let malformed = || StorageError::MalformedBlob {
            hash: hash.to_string(),
        };

        let split = bytes
            .windows(DELIMITER.len())
            .position(|window| window == DELIMITER)
            .ok_or_else(malformed)?;
        let datatype = std::str::from_utf8(&bytes[..split]).map_err(|_| malformed())?;
        let lexical =
            std::str::from_utf8(&bytes[split + DELIMITER.len()..]).map_err(|_| malformed())?;
        let datatype = Iri::new(datatype).map_err(|_| malformed())?;

        Ok(Literal::typed(lexical, datatype))
    }
}

/// A decorator offloading binary literals of any base store to a
/// [`LiteralStash`].
pub struct ExternalizedGraph<G> {
    base: G,
    stash: LiteralStash,
    registry: ListenerRegistry,
    lock: GraphLock,
}

impl<G> std::fmt::Debug for ExternalizedGraph<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalizedGraph")
            .field("stash", &self.stash)
            .finish_non_exhaustive()
    }
}

impl<G: GraphStore> ExternalizedGraph<G> {
    /// Wraps `base`, storing blobs under `data_dir`.
    #[must_use]
    pub fn new(base: G, data_dir: impl Into<PathBuf>) -> Self {
        Self::with_scheduler(base, data_dir, ThreadScheduler::shared())
    }

    /// Wraps `base` with delayed listener delivery on `scheduler`.
    #[must_use]
    pub fn with_scheduler(
        base: G,
        data_dir: impl Into<PathBuf>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            base,
            stash: LiteralStash::new(data_dir),
            registry: ListenerRegistry::new(GraphId::new(), scheduler),
            lock: GraphLock::new(),
        }
    }

    /// The wrapped base store.
    ///
    /// Triples observed here carry reference IRIs instead of offloaded
    /// literals.
    pub fn base(&self) -> &G {
        &self.base
    }

    /// The blob directory backing this graph.
    #[must_use]
    pub fn stash(&self) -> &LiteralStash {
        &self.stash
    }

    /// Consumes the decorator, returning the base store.
    pub fn into_inner(self) -> G {
        self.base
    }

    /// Rewrites an offloadable object to its reference IRI, writing the
    /// blob.
    fn externalize(&self, triple: &Triple) -> GraphResult<Triple> {
        match triple.object.as_literal() {
            Some(literal) if LiteralStash::needs_stashing(literal) => Ok(Triple::new(
                triple.subject.clone(),
                triple.predicate.clone(),
                self.stash.stash(literal)?,
            )),
            _ => Ok(triple.clone()),
        }
    }

    /// Like [`ExternalizedGraph::externalize`] but compute-only: no blob is
    /// written. Used for removals and queries.
    fn reference_triple(&self, triple: &Triple) -> Triple {
        match triple.object.as_literal() {
            Some(literal) if LiteralStash::needs_stashing(literal) => Triple::new(
                triple.subject.clone(),
                triple.predicate.clone(),
                self.stash.reference(literal),
            ),
            _ => triple.clone(),
        }
    }
}

impl<G: GraphStore> GraphStore for ExternalizedGraph<G> {
    fn size(&self) -> usize {
        self.base.size()
    }

    fn registry(&self) -> &ListenerRegistry {
        &self.registry
    }

    fn lock(&self) -> &GraphLock {
        &self.lock
    }

    fn perform_filter<'a>(&'a self, pattern: &TriplePattern) -> GraphResult<Box<dyn Cursor + 'a>> {
        match &pattern.object {
            Some(Term::Literal(literal)) if LiteralStash::needs_stashing(literal) => {
                // Lookups "by value": query the base store for the
                // reference IRI the literal would have been stored under.
                let rewritten = TriplePattern {
                    subject: pattern.subject.clone(),
                    predicate: pattern.predicate.clone(),
                    object: Some(Term::Iri(self.stash.reference(literal))),
                };
                Ok(Box::new(StashCursor {
                    inner: self.base.filter(&rewritten)?,
                    stash: &self.stash,
                }))
            }
            // Object fully bound to something that is never offloaded:
            // results cannot contain references, skip the mapping.
            Some(_) => Ok(Box::new(self.base.filter(pattern)?)),
            None => Ok(Box::new(StashCursor {
                inner: self.base.filter(pattern)?,
                stash: &self.stash,
            })),
        }
    }

    fn perform_add(&self, triple: &Triple) -> GraphResult<bool> {
        self.base.add(self.externalize(triple)?)
    }

    fn perform_remove(&self, triple: &Triple) -> GraphResult<bool> {
        self.base.remove(&self.reference_triple(triple))
    }
}

/// Maps reference IRIs in the object position back to literals.
///
/// The blob is read only when its triple is yielded; removal delegates to
/// the base cursor (which removes the reference triple and dispatches the
/// base store's event).
struct StashCursor<'a> {
    inner: TripleCursor<'a>,
    stash: &'a LiteralStash,
}

impl StashCursor<'_> {
    fn rehydrate(&self, triple: Triple) -> GraphResult<Triple> {
        let Some(iri) = triple.object.as_iri() else {
            return Ok(triple);
        };
        if !LiteralStash::is_reference(iri) {
            return Ok(triple);
        }
        let literal = self.stash.load(iri)?;
        Ok(Triple::new(triple.subject, triple.predicate, literal))
    }
}

impl Cursor for StashCursor<'_> {
    fn advance(&mut self) -> GraphResult<Option<Triple>> {
        match self.inner.advance()? {
            Some(triple) => Ok(Some(self.rehydrate(triple)?)),
            None => Ok(None),
        }
    }

    fn remove_current(&mut self) -> GraphResult<bool> {
        self.inner.remove_current()
    }
}
