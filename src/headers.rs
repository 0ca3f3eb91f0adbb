//! The header families propagated by our services.

use crate::schema::{AssociationPolicy, Field, HeaderRecord, Schema};

/// Caller headers set by the VML gateway.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VmlHeaders {
    pub username: String,
    pub ocr_cache_control: String,
}

impl VmlHeaders {
    /// Whether the caller allows OCR results to be served from cache.
    pub fn ocr_cache_allow(&self) -> bool {
        self.ocr_cache_control.eq_ignore_ascii_case("allow")
    }
}

static VML_SCHEMA: Schema<VmlHeaders> = Schema {
    name: "vml",
    fields: &[
        Field {
            key: "vml-username",
            tag: Some("username"),
            get: |h| h.username.as_str(),
            set: |h, v| h.username = v,
        },
        Field {
            key: "vml-ocr-cache",
            tag: None,
            get: |h| h.ocr_cache_control.as_str(),
            set: |h, v| h.ocr_cache_control = v,
        },
    ],
    policy: AssociationPolicy::Always,
};

impl HeaderRecord for VmlHeaders {
    fn schema() -> &'static Schema<Self> {
        &VML_SCHEMA
    }
}

/// Caller headers set by the SSN frontend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SsnHeaders {
    pub username: String,
}

static SSN_SCHEMA: Schema<SsnHeaders> = Schema {
    name: "ssn",
    fields: &[Field {
        key: "x-ssn-username",
        tag: Some("username"),
        get: |h| h.username.as_str(),
        set: |h, v| h.username = v,
    }],
    policy: AssociationPolicy::WhenPresent,
};

impl HeaderRecord for SsnHeaders {
    fn schema() -> &'static Schema<Self> {
        &SSN_SCHEMA
    }
}
