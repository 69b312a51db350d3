//! Infrastructure module - I/O and decoding concerns
//!
//! Payload decoding, manifest and content file reading, tolerant HTML
//! extraction helpers, the auxiliary CSV table writer, and the logging
//! bootstrap.

pub mod content;
pub mod html;
pub mod logging;
pub mod manifest;
pub mod payload;
pub mod table;

pub use content::{ContentFile, DecodedContent, RawRecord};
pub use manifest::{Manifest, ManifestError};
pub use payload::{DecodeError, Nesting, decode_layer, decode_payload};
