//! Well-known vocabulary IRIs used by the engine.

/// XML Schema datatype IRIs.
pub mod xsd {
    /// `xsd:string`, the default datatype of plain lexical values.
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

    /// `xsd:base64Binary`, the datatype marking binary-encoded content.
    ///
    /// Literals carrying this datatype are candidates for content-addressed
    /// offloading by [`crate::store::ExternalizedGraph`].
    pub const BASE64_BINARY: &str = "http://www.w3.org/2001/XMLSchema#base64Binary";
}
