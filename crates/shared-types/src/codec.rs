//! # Transaction Wire Codec
//!
//! Builds and reads the flat string payloads that travel from the transport
//! through authentication to the commit engine.
//!
//! ## Segment Format
//!
//! Every logical field is written as one tagged, self-delimited segment:
//!
//! ```text
//! <type>pothole</type><address>1 Main St</address>...<privkey>abc</privkey>
//! ```
//!
//! Values are entity-escaped (`&amp;`, `&lt;`, `&gt;`) so a `<` inside a
//! payload always starts a tag. A reader scans for its own opening tag and
//! extracts exactly one segment, independent of the other segments' lengths.
//!
//! ## Field Order (compatibility contract)
//!
//! | Operation | Segments |
//! |-----------|----------|
//! | submit | type, address, description, specfield, pubkey, privkey |
//! | find / resolve | form, pubkey, privkey |
//! | search | [type] [address] [specfield] pubkey, privkey |
//!
//! The specfield tag is kind-specific (see [`ServiceKind::field_label_for`]).
//! Search segments in brackets are written only when non-empty.

use crate::entities::{FormId, PublicKeyId, SearchCriteria, ServiceKind};
use crate::errors::CodecError;
use std::fmt;

/// Wire tags of the fixed segments.
pub mod tags {
    pub const TYPE: &str = "type";
    pub const ADDRESS: &str = "address";
    pub const DESCRIPTION: &str = "description";
    pub const PUBKEY: &str = "pubkey";
    pub const PRIVKEY: &str = "privkey";
    pub const FORM_ID: &str = "form";
}

// =============================================================================
// WRITER
// =============================================================================

/// Appends tagged segments in call order.
#[derive(Debug, Default, Clone)]
pub struct PayloadWriter {
    buf: String,
}

impl PayloadWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one segment.
    #[must_use]
    pub fn write(mut self, tag: &str, value: &str) -> Self {
        self.buf.push('<');
        self.buf.push_str(tag);
        self.buf.push('>');
        escape_into(value, &mut self.buf);
        self.buf.push_str("</");
        self.buf.push_str(tag);
        self.buf.push('>');
        self
    }

    /// Append a segment only when the value is present and non-empty.
    #[must_use]
    pub fn write_if_present(self, tag: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => self.write(tag, v),
            _ => self,
        }
    }

    #[must_use]
    pub fn finish(self) -> String {
        self.buf
    }
}

fn escape_into(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

fn unescape(raw: &str, tag: &str) -> Result<String, CodecError> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let (ch, len) = if tail.starts_with("&amp;") {
            ('&', 5)
        } else if tail.starts_with("&lt;") {
            ('<', 4)
        } else if tail.starts_with("&gt;") {
            ('>', 4)
        } else {
            return Err(CodecError::InvalidEscape {
                tag: tag.to_string(),
            });
        };
        out.push(ch);
        rest = &tail[len..];
    }
    out.push_str(rest);
    Ok(out)
}

// =============================================================================
// READERS
// =============================================================================

/// Byte offsets of one segment inside a payload.
struct Span {
    start: usize,
    value_start: usize,
    value_end: usize,
    end: usize,
}

fn locate(payload: &str, tag: &str) -> Result<Option<Span>, CodecError> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");

    let Some(start) = payload.find(&open) else {
        return Ok(None);
    };
    let value_start = start + open.len();
    let Some(rel_end) = payload[value_start..].find(&close) else {
        return Err(CodecError::Unterminated {
            tag: tag.to_string(),
        });
    };
    let value_end = value_start + rel_end;

    Ok(Some(Span {
        start,
        value_start,
        value_end,
        end: value_end + close.len(),
    }))
}

/// Read a segment that must be present.
pub fn read_field(payload: &str, tag: &str) -> Result<String, CodecError> {
    read_optional(payload, tag)?.ok_or_else(|| CodecError::MissingField {
        tag: tag.to_string(),
    })
}

/// Read a segment that may have been omitted.
pub fn read_optional(payload: &str, tag: &str) -> Result<Option<String>, CodecError> {
    match locate(payload, tag)? {
        Some(span) => unescape(&payload[span.value_start..span.value_end], tag).map(Some),
        None => Ok(None),
    }
}

#[must_use]
pub fn contains_field(payload: &str, tag: &str) -> bool {
    matches!(locate(payload, tag), Ok(Some(_)))
}

/// Remove the first segment with `tag`, leaving every other byte untouched.
#[must_use]
pub fn strip_field(payload: &str, tag: &str) -> String {
    match locate(payload, tag) {
        Ok(Some(span)) => {
            let mut out = String::with_capacity(payload.len() - (span.end - span.start));
            out.push_str(&payload[..span.start]);
            out.push_str(&payload[span.end..]);
            out
        }
        _ => payload.to_string(),
    }
}

pub fn read_public_key(payload: &str) -> Result<PublicKeyId, CodecError> {
    read_field(payload, tags::PUBKEY).map(PublicKeyId::new)
}

pub fn read_secret(payload: &str) -> Result<String, CodecError> {
    read_field(payload, tags::PRIVKEY)
}

/// Strip the auth secret, producing the transaction body.
#[must_use]
pub fn strip_secret(payload: &str) -> String {
    strip_field(payload, tags::PRIVKEY)
}

pub fn read_form_id(payload: &str) -> Result<FormId, CodecError> {
    read_field(payload, tags::FORM_ID).map(FormId::new)
}

// =============================================================================
// OPERATION FIELD SETS
// =============================================================================

/// Fields of a `submit-form` command, in wire order.
#[derive(Clone, PartialEq, Eq)]
pub struct SubmitFields {
    pub kind: String,
    pub address: String,
    pub description: String,
    pub spec_field: String,
    pub public_key: PublicKeyId,
    pub secret: String,
}

impl SubmitFields {
    #[must_use]
    pub fn encode(&self) -> String {
        self.body().writer().write(tags::PRIVKEY, &self.secret).finish()
    }

    pub fn decode(payload: &str) -> Result<Self, CodecError> {
        let body = TransactionBody::decode(payload)?;
        let secret = read_secret(payload)?;
        Ok(Self {
            kind: body.kind,
            address: body.address,
            description: body.description,
            spec_field: body.spec_field,
            public_key: body.submitter,
            secret,
        })
    }

    /// The secret-free part of the submission.
    #[must_use]
    pub fn body(&self) -> TransactionBody {
        TransactionBody {
            kind: self.kind.clone(),
            address: self.address.clone(),
            description: self.description.clone(),
            spec_field: self.spec_field.clone(),
            submitter: self.public_key.clone(),
        }
    }
}

impl fmt::Debug for SubmitFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmitFields")
            .field("kind", &self.kind)
            .field("address", &self.address)
            .field("description", &self.description)
            .field("spec_field", &self.spec_field)
            .field("public_key", &self.public_key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A submitted form with the auth secret removed; what gets committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionBody {
    pub kind: String,
    pub address: String,
    pub description: String,
    pub spec_field: String,
    pub submitter: PublicKeyId,
}

impl TransactionBody {
    fn writer(&self) -> PayloadWriter {
        PayloadWriter::new()
            .write(tags::TYPE, &self.kind)
            .write(tags::ADDRESS, &self.address)
            .write(tags::DESCRIPTION, &self.description)
            .write(ServiceKind::field_label_for(&self.kind), &self.spec_field)
            .write(tags::PUBKEY, self.submitter.as_str())
    }

    #[must_use]
    pub fn encode(&self) -> String {
        self.writer().finish()
    }

    pub fn decode(payload: &str) -> Result<Self, CodecError> {
        let kind = read_field(payload, tags::TYPE)?;
        let address = read_field(payload, tags::ADDRESS)?;
        let description = read_field(payload, tags::DESCRIPTION)?;
        let spec_field = read_field(payload, ServiceKind::field_label_for(&kind))?;
        let submitter = read_public_key(payload)?;
        Ok(Self {
            kind,
            address,
            description,
            spec_field,
            submitter,
        })
    }
}

/// Fields of `find-form` and `resolve-form`, in wire order.
#[derive(Clone, PartialEq, Eq)]
pub struct LookupFields {
    pub form_id: FormId,
    pub public_key: PublicKeyId,
    pub secret: String,
}

impl LookupFields {
    #[must_use]
    pub fn encode(&self) -> String {
        PayloadWriter::new()
            .write(tags::FORM_ID, self.form_id.as_str())
            .write(tags::PUBKEY, self.public_key.as_str())
            .write(tags::PRIVKEY, &self.secret)
            .finish()
    }

    pub fn decode(payload: &str) -> Result<Self, CodecError> {
        Ok(Self {
            form_id: read_form_id(payload)?,
            public_key: read_public_key(payload)?,
            secret: read_secret(payload)?,
        })
    }
}

impl fmt::Debug for LookupFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupFields")
            .field("form_id", &self.form_id)
            .field("public_key", &self.public_key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Fields of `search-forms`, in wire order. Empty criteria are `None`.
#[derive(Clone, PartialEq, Eq)]
pub struct SearchFields {
    pub kind: Option<String>,
    pub address: Option<String>,
    pub spec_field: Option<String>,
    pub public_key: PublicKeyId,
    pub secret: String,
}

impl SearchFields {
    /// Build from transport arguments, treating empty strings as absent.
    pub fn new(
        kind: &str,
        address: &str,
        spec_field: &str,
        public_key: PublicKeyId,
        secret: impl Into<String>,
    ) -> Self {
        let present = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            kind: present(kind),
            address: present(address),
            spec_field: present(spec_field),
            public_key,
            secret: secret.into(),
        }
    }

    fn spec_label(kind: Option<&str>) -> &'static str {
        ServiceKind::field_label_for(kind.unwrap_or_default())
    }

    #[must_use]
    pub fn encode(&self) -> String {
        PayloadWriter::new()
            .write_if_present(tags::TYPE, self.kind.as_deref())
            .write_if_present(tags::ADDRESS, self.address.as_deref())
            .write_if_present(
                Self::spec_label(self.kind.as_deref()),
                self.spec_field.as_deref(),
            )
            .write(tags::PUBKEY, self.public_key.as_str())
            .write(tags::PRIVKEY, &self.secret)
            .finish()
    }

    pub fn decode(payload: &str) -> Result<Self, CodecError> {
        let kind = read_optional(payload, tags::TYPE)?;
        let address = read_optional(payload, tags::ADDRESS)?;
        let spec_field = read_optional(payload, Self::spec_label(kind.as_deref()))?;
        Ok(Self {
            kind,
            address,
            spec_field,
            public_key: read_public_key(payload)?,
            secret: read_secret(payload)?,
        })
    }

    /// Search predicate described by these fields.
    #[must_use]
    pub fn criteria(&self) -> SearchCriteria {
        SearchCriteria {
            kind: self.kind.clone(),
            address: self.address.clone(),
            spec_field: self.spec_field.clone(),
            submitter: None,
        }
    }
}

impl fmt::Debug for SearchFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchFields")
            .field("kind", &self.kind)
            .field("address", &self.address)
            .field("spec_field", &self.spec_field)
            .field("public_key", &self.public_key)
            .field("secret", &"<redacted>")
            .finish()
    }
}
