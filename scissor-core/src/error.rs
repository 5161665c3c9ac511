//! Error taxonomy for the split pipeline

/// Errors produced while splitting a document.
///
/// Any error aborts the whole invocation; there is no partial-success mode.
#[derive(thiserror::Error, Debug)]
pub enum SplitError {
    /// Script placement requires a `<head>` element the document lacks.
    #[error("document has no <head> element for the external script reference")]
    MissingHead,

    /// Script placement requires a `</body>` close tag the document lacks.
    #[error("document has no <body> element for the external script reference")]
    MissingBody,

    /// An embedded source-map comment carried base64 that did not decode.
    #[error("invalid base64 in embedded source map: {0}")]
    MapEncoding(#[from] base64::DecodeError),

    /// An embedded source map did not parse, or the unified map failed to encode.
    #[error("invalid source map: {0}")]
    SourceMap(#[from] sourcemap::Error),

    /// A mapping re-projected to a position before the start of the output,
    /// meaning the embedded map's coordinates disagree with the script
    /// element's position in the document.
    #[error("mapping re-projects outside the output (line {line}, column {column})")]
    MappingOutOfRange { line: i64, column: i64 },
}
