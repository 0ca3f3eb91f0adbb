//! Header schemas: a fixed, ordered mapping between wire metadata keys and
//! the string fields of a header record.

use std::fmt;

use tonic::metadata::{AsciiMetadataValue, MetadataMap};

use crate::tags::TagSink;

/// Whether extraction publishes a record into the call context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssociationPolicy {
    /// Always publish, even when no key of the schema was received. A context
    /// without an association is then indistinguishable from one carrying
    /// the zero value, and injection always emits every key.
    Always,
    /// Publish only when at least one key of the schema was received, even
    /// with an empty value. Injection emits nothing without an association.
    WhenPresent,
    /// Publish only when at least one received field is non-empty.
    WhenNonEmpty,
}

pub struct Field<R> {
    /// Lowercase wire key.
    pub key: &'static str,
    /// Key under which a non-empty value is forwarded to the tag sink.
    pub tag: Option<&'static str>,
    pub get: fn(&R) -> &str,
    pub set: fn(&mut R, String),
}

pub struct Schema<R: 'static> {
    pub name: &'static str,
    pub fields: &'static [Field<R>],
    pub policy: AssociationPolicy,
}

impl<R: 'static> fmt::Debug for Schema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("keys", &self.keys().collect::<Vec<_>>())
            .field("policy", &self.policy)
            .finish()
    }
}

impl<R: 'static> Schema<R> {
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.key)
    }
}

/// A record of one propagated header family.
///
/// Implementors are plain values whose zero value (`Default`) means "nothing
/// was sent". The record type doubles as the context marker, so each schema
/// gets its own association slot.
pub trait HeaderRecord: Clone + Default + fmt::Debug + Send + Sync + 'static {
    fn schema() -> &'static Schema<Self>;
}

/// A decoded record plus what the inbound metadata actually contained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoded<R> {
    pub record: R,
    /// At least one key of the schema was present.
    pub present: bool,
}

impl<R: HeaderRecord> Decoded<R> {
    /// Apply the schema's association policy.
    pub fn publishable(&self) -> bool {
        match R::schema().policy {
            AssociationPolicy::Always => true,
            AssociationPolicy::WhenPresent => self.present,
            AssociationPolicy::WhenNonEmpty => !is_empty(&self.record),
        }
    }

    pub fn into_published(self) -> Option<R> {
        self.publishable().then_some(self.record)
    }
}

/// Read every field of `R` out of `metadata`. Absent keys leave the field
/// empty; only the first value of a multi-valued key is used.
pub fn decode<R: HeaderRecord>(metadata: &MetadataMap) -> Decoded<R> {
    let mut record = R::default();
    let mut present = false;
    for field in R::schema().fields {
        let Some(value) = metadata.get(field.key) else {
            continue;
        };
        present = true;
        match value.to_str() {
            Ok(value) => (field.set)(&mut record, value.to_string()),
            Err(_) => tracing::debug!(key = field.key, "ignoring non-ascii header value"),
        }
    }
    Decoded { record, present }
}

/// Append every field of `record` to `metadata`, empty fields included.
pub fn encode<R: HeaderRecord>(record: &R, metadata: &mut MetadataMap) {
    for field in R::schema().fields {
        let value = (field.get)(record);
        match value.parse::<AsciiMetadataValue>() {
            Ok(value) => {
                metadata.append(field.key, value);
            }
            Err(_) => tracing::warn!(
                schema = R::schema().name,
                key = field.key,
                "skipping header value that is not valid metadata"
            ),
        }
    }
}

/// Forward tagged, non-empty fields of `record` to `sink`.
pub fn forward_tags<R: HeaderRecord>(record: &R, sink: &dyn TagSink) {
    for field in R::schema().fields {
        let value = (field.get)(record);
        if let Some(tag) = field.tag.filter(|_| !value.is_empty()) {
            sink.set(tag, value);
        }
    }
}

pub fn is_empty<R: HeaderRecord>(record: &R) -> bool {
    R::schema()
        .fields
        .iter()
        .all(|field| (field.get)(record).is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::{SsnHeaders, VmlHeaders};
    use crate::tags::RequestTags;

    fn metadata(pairs: &[(&'static str, &str)]) -> MetadataMap {
        let mut md = MetadataMap::new();
        for (key, value) in pairs {
            md.append(*key, value.parse().unwrap());
        }
        md
    }

    #[test]
    fn absent_keys_decode_to_zero_value() {
        let md = metadata(&[("authorization", "sup3rS3cr37")]);

        let vml = decode::<VmlHeaders>(&md);
        assert_eq!(vml.record, VmlHeaders::default());
        assert!(!vml.present);
        assert!(vml.publishable());

        let ssn = decode::<SsnHeaders>(&md);
        assert!(!ssn.present);
        assert_eq!(ssn.into_published(), None);
    }

    #[test]
    fn first_value_wins() {
        let md = metadata(&[("vml-username", "alice"), ("vml-username", "mallory")]);
        assert_eq!(decode::<VmlHeaders>(&md).record.username, "alice");
    }

    #[test]
    fn keys_are_case_insensitive() {
        let mut md = MetadataMap::new();
        md.insert(
            tonic::metadata::MetadataKey::from_bytes(b"X-SSN-Username").unwrap(),
            "bob".parse().unwrap(),
        );
        assert_eq!(decode::<SsnHeaders>(&md).record.username, "bob");
    }

    #[test]
    fn present_but_empty_still_publishes_when_present() {
        let md = metadata(&[("x-ssn-username", "")]);
        let decoded = decode::<SsnHeaders>(&md);
        assert!(decoded.present);
        assert_eq!(decoded.into_published(), Some(SsnHeaders::default()));
    }

    #[test]
    fn encode_emits_empty_fields() {
        let mut md = MetadataMap::new();
        encode(
            &VmlHeaders {
                username: "alice".into(),
                ..Default::default()
            },
            &mut md,
        );

        assert_eq!(md.len(), 2);
        assert_eq!(md.get("vml-username").unwrap(), "alice");
        assert_eq!(md.get("vml-ocr-cache").unwrap(), "");
    }

    fn assert_decodes_back<R: HeaderRecord + PartialEq>(record: R) {
        let mut md = MetadataMap::new();
        encode(&record, &mut md);
        let decoded = decode::<R>(&md);
        assert!(decoded.present, "{:?}", record);
        assert_eq!(decoded.record, record);
    }

    #[test]
    fn encoded_records_decode_back() {
        let vml = |username: &str, ocr_cache_control: &str| VmlHeaders {
            username: username.into(),
            ocr_cache_control: ocr_cache_control.into(),
        };
        for record in [
            vml("", ""),
            vml("JohnDoe", ""),
            vml("", "Allow"),
            vml("JohnDoe", "aLLoW"),
            vml("john.doe@example.com", "deny"),
        ] {
            assert_decodes_back(record);
        }

        for username in ["", "JohnDoe", "MiXeD-Case_01", "with spaces"] {
            assert_decodes_back(SsnHeaders {
                username: username.into(),
            });
        }
    }

    #[test]
    fn encode_keeps_unrelated_metadata() {
        let mut md = metadata(&[("authorization", "sup3rS3cr37")]);
        encode(
            &SsnHeaders {
                username: "JohnDoe".into(),
            },
            &mut md,
        );
        assert_eq!(md.get("x-ssn-username").unwrap(), "JohnDoe");
        assert_eq!(md.get("authorization").unwrap(), "sup3rS3cr37");
    }

    #[test]
    fn invalid_values_are_skipped() {
        let mut md = MetadataMap::new();
        encode(
            &VmlHeaders {
                username: "line\nbreak".into(),
                ocr_cache_control: "allow".into(),
            },
            &mut md,
        );
        assert!(md.get("vml-username").is_none());
        assert_eq!(md.get("vml-ocr-cache").unwrap(), "allow");
    }

    #[test]
    fn only_non_empty_tagged_fields_are_forwarded() {
        let tags = RequestTags::default();
        forward_tags(&VmlHeaders::default(), &tags);
        assert!(tags.is_empty());

        forward_tags(
            &VmlHeaders {
                username: "alice".into(),
                ocr_cache_control: "allow".into(),
            },
            &tags,
        );
        assert_eq!(tags.get("username").as_deref(), Some("alice"));
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn schema_keys_are_valid_metadata_keys() {
        for key in VmlHeaders::schema().keys().chain(SsnHeaders::schema().keys()) {
            assert_eq!(key, key.to_ascii_lowercase());
            assert!(tonic::metadata::AsciiMetadataKey::from_bytes(key.as_bytes()).is_ok());
        }
    }
}
