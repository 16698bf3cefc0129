//! Codec between a node's `{id, share}` pair and the store's string metadata.
//!
//! Writes are strict: settings that carry nothing (private, no users) are
//! written as an absent field, never as an empty object, so absence stays the
//! single "inherit" signal. Reads are permissive: keys created outside the
//! service lack the fields or carry garbage, and both decode as inherited.

use object_store::{apply_patch, Metadata, MetadataPatch};
use tracing::warn;

use super::share::{Share, ShareSettings};

pub const ID_FIELD: &str = "id";
pub const SHARE_FIELD: &str = "share";

/// The custom fields the tree keeps on every key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeMeta {
    pub id: Option<String>,
    pub share: Share,
}

#[derive(Debug, thiserror::Error)]
#[error("failed to encode share settings: {0}")]
pub struct MetadataError(#[from] serde_json::Error);

/// Encode into a patch. An absent id leaves the stored id untouched; an
/// inherited share removes the stored field.
pub fn encode(meta: &NodeMeta) -> Result<MetadataPatch, MetadataError> {
    let mut patch = MetadataPatch::new();
    if let Some(id) = &meta.id {
        patch.insert(ID_FIELD.to_string(), Some(id.clone()));
    }
    patch.insert(SHARE_FIELD.to_string(), encode_share(&meta.share)?);
    Ok(patch)
}

/// Encode only the share field.
pub fn encode_share_patch(share: &Share) -> Result<MetadataPatch, MetadataError> {
    let mut patch = MetadataPatch::new();
    patch.insert(SHARE_FIELD.to_string(), encode_share(share)?);
    Ok(patch)
}

fn encode_share(share: &Share) -> Result<Option<String>, MetadataError> {
    match share {
        Share::Explicit(settings) if !settings.is_empty() => {
            Ok(Some(serde_json::to_string(settings)?))
        }
        _ => Ok(None),
    }
}

/// Full metadata map for a freshly written key.
pub fn to_metadata(meta: &NodeMeta) -> Result<Metadata, MetadataError> {
    let mut metadata = Metadata::new();
    apply_patch(&mut metadata, &encode(meta)?);
    Ok(metadata)
}

/// Decode stored metadata. Never fails.
pub fn decode(raw: &Metadata) -> NodeMeta {
    let id = raw
        .get(ID_FIELD)
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    let share = match raw.get(SHARE_FIELD) {
        None => Share::Inherited,
        Some(payload) => match serde_json::from_str::<Option<ShareSettings>>(payload) {
            Ok(settings) => Share::from_settings(settings),
            Err(e) => {
                warn!(
                    payload = %payload,
                    error = %e,
                    "malformed share metadata, treating as inherited"
                );
                Share::Inherited
            }
        },
    };

    NodeMeta { id, share }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_encode_empty_settings_as_absent() {
        let meta = NodeMeta {
            id: Some("abc".into()),
            share: Share::Explicit(ShareSettings::default()),
        };
        let patch = encode(&meta).unwrap();
        assert_eq!(patch.get(ID_FIELD), Some(&Some("abc".to_string())));
        assert_eq!(patch.get(SHARE_FIELD), Some(&None));
    }

    #[test]
    fn test_encode_without_id_leaves_id_alone() {
        let patch = encode(&NodeMeta::default()).unwrap();
        assert!(!patch.contains_key(ID_FIELD));
    }

    #[test]
    fn test_decode_explicit_settings() {
        let meta = decode(&raw(&[
            ("id", "n1"),
            ("share", r#"{"isPublic":true,"uids":["u2","u1"]}"#),
        ]));
        assert_eq!(meta.id.as_deref(), Some("n1"));
        assert_eq!(
            meta.share,
            Share::Explicit(ShareSettings::new(true, ["u1", "u2"]))
        );
    }

    #[test]
    fn test_decode_malformed_share_is_inherited() {
        let meta = decode(&raw(&[("share", "{not json")]));
        assert_eq!(meta.share, Share::Inherited);

        let meta = decode(&raw(&[("share", "null")]));
        assert_eq!(meta.share, Share::Inherited);

        let meta = decode(&raw(&[("share", r#"{"isPublic":"yes"}"#)]));
        assert_eq!(meta.share, Share::Inherited);
    }

    #[test]
    fn test_decode_missing_fields() {
        let meta = decode(&Metadata::new());
        assert_eq!(meta, NodeMeta::default());

        let meta = decode(&raw(&[("id", "  ")]));
        assert_eq!(meta.id, None);
    }

    #[test]
    fn test_encoded_metadata_roundtrips() {
        let samples = [
            NodeMeta {
                id: Some("a1".into()),
                share: Share::Explicit(ShareSettings::new(false, ["u1"])),
            },
            NodeMeta {
                id: Some("a2".into()),
                share: Share::Inherited,
            },
            NodeMeta {
                id: None,
                share: Share::Explicit(ShareSettings::new(true, Vec::<String>::new())),
            },
        ];
        for meta in samples {
            let stored = to_metadata(&meta).unwrap();
            assert_eq!(to_metadata(&decode(&stored)).unwrap(), stored);
            assert_eq!(decode(&stored), meta);
        }
    }
}
