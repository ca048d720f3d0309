//! Compiled document archives (rkyv).

use overlay_protocol::AnnotatedDocument;
use rkyv::ser::{serializers::AllocSerializer, Serializer};
use rkyv::{AlignedVec, Deserialize, Infallible};
use tracing::debug;

use crate::SessionError;

pub fn encode_document(document: &AnnotatedDocument) -> Result<AlignedVec, SessionError> {
    let mut serializer = AllocSerializer::<256>::default();
    serializer
        .serialize_value(document)
        .map_err(|e| SessionError::Archive(format!("{e:?}")))?;
    Ok(serializer.into_serializer().into_inner())
}

/// Validates and decodes an archive. The bytes may come from an unaligned
/// buffer (e.g. a fetch() result), so they are copied into aligned storage
/// before validation.
pub fn decode_document(bytes: &[u8]) -> Result<AnnotatedDocument, SessionError> {
    let mut aligned = AlignedVec::with_capacity(bytes.len());
    aligned.extend_from_slice(bytes);

    let archived = rkyv::check_archived_root::<AnnotatedDocument>(&aligned)
        .map_err(|e| SessionError::Archive(format!("{e:?}")))?;
    let document: AnnotatedDocument = match archived.deserialize(&mut Infallible) {
        Ok(document) => document,
        Err(never) => match never {},
    };

    debug!(bytes = bytes.len(), tokens = document.tokens.len(), "decoded document archive");
    Ok(document)
}
