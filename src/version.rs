//! Version records, their status graph and the configuration payload they carry
use super::error::ValidationError;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;
use std::fmt;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionStatus {
    #[n(0)]
    Draft,
    #[n(1)]
    Active,
    #[n(2)]
    Approved,
    #[n(3)]
    Archived,
}

impl VersionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionStatus::Draft => "DRAFT",
            VersionStatus::Active => "ACTIVE",
            VersionStatus::Approved => "APPROVED",
            VersionStatus::Archived => "ARCHIVED",
        }
    }

    /// Forward edges of the lifecycle graph. Nothing ever returns to `Draft`.
    pub fn can_become(self, next: VersionStatus) -> bool {
        matches!(
            (self, next),
            (VersionStatus::Draft, VersionStatus::Active)
                | (VersionStatus::Approved, VersionStatus::Active)
                | (VersionStatus::Active, VersionStatus::Archived)
                | (VersionStatus::Archived, VersionStatus::Active)
        )
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp(DateTime<Utc>);

impl TimeStamp {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    /// `None` when the parts do not name a valid UTC instant.
    pub fn new_with(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        min: u32,
        sec: u32,
    ) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(TimeStamp)
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp {
    fn default() -> Self {
        Self::new()
    }
}

impl From<DateTime<Utc>> for TimeStamp {
    fn from(value: DateTime<Utc>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

// The event configuration frozen by activation. Editors for fields, stages and
// indicators key their own rows by the version code, not by this struct.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, PartialEq, Eq)]
pub struct VersionPayload {
    #[n(0)]
    event_type: Option<String>,
    #[n(1)]
    event_group: Option<String>,
    #[n(2)]
    event_name: Option<String>,
    #[n(3)]
    remark: Option<String>,
    #[n(4)]
    attributes: BTreeMap<String, String>,
}

impl VersionPayload {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_event_type(mut self, event_type: &str) -> Self {
        self.event_type = Some(event_type.to_owned());
        self
    }
    pub fn set_event_group(mut self, event_group: &str) -> Self {
        self.event_group = Some(event_group.to_owned());
        self
    }
    pub fn set_event_name(mut self, event_name: &str) -> Self {
        self.event_name = Some(event_name.to_owned());
        self
    }
    pub fn set_remark(mut self, remark: &str) -> Self {
        self.remark = Some(remark.to_owned());
        self
    }
    pub fn set_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref()
    }
    pub fn event_group(&self) -> Option<&str> {
        self.event_group.as_deref()
    }
    pub fn event_name(&self) -> Option<&str> {
        self.event_name.as_deref()
    }
    pub fn remark(&self) -> Option<&str> {
        self.remark.as_deref()
    }
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Activation requires `eventType` and `eventGroup` to be present and non-blank.
    pub fn validate_for_activation(&self) -> Result<(), ValidationError> {
        let blank = |field: &Option<String>| field.as_deref().is_none_or(|v| v.trim().is_empty());

        let mut missing = Vec::new();
        if blank(&self.event_type) {
            missing.push("eventType");
        }
        if blank(&self.event_group) {
            missing.push("eventGroup");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingFields(missing))
        }
    }

    /// sha256 over the CBOR encoding of the payload
    pub fn fingerprint(&self) -> anyhow::Result<String> {
        let contents = minicbor::to_vec(self)?;
        Ok(sha256::digest(&contents))
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    #[n(0)]
    pub id: String, // assigned by the repository, bech32 encoded uuid7
    #[n(1)]
    pub event_key: String,
    #[n(2)]
    pub code: String, // unique within the event
    #[n(3)]
    pub description: String,
    #[n(4)]
    pub status: VersionStatus,
    #[n(5)]
    pub payload: VersionPayload,
    #[n(6)]
    pub created_at: TimeStamp,
    #[n(7)]
    pub created_by: String,
    #[n(8)]
    pub last_modified_at: TimeStamp,
    #[n(9)]
    pub last_modified_by: String,
}

impl VersionRecord {
    pub fn is_draft(&self) -> bool {
        self.status == VersionStatus::Draft
    }

    pub(crate) fn touch(&mut self, actor: &str) {
        self.last_modified_at = TimeStamp::new();
        self.last_modified_by = actor.to_owned();
    }
}

/// Input for [`crate::repository::VersionRepository::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVersion {
    pub code: String,
    pub description: String,
    pub payload: VersionPayload,
}

impl NewVersion {
    pub fn new(code: &str, description: &str) -> Self {
        Self {
            code: code.to_owned(),
            description: description.to_owned(),
            payload: VersionPayload::default(),
        }
    }
    pub fn with_payload(mut self, payload: VersionPayload) -> Self {
        self.payload = payload;
        self
    }
}

/// Partial update of a draft. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionUpdate {
    pub description: Option<String>,
    pub payload: Option<VersionPayload>,
}

impl VersionUpdate {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }
    pub fn set_payload(mut self, payload: VersionPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub(crate) fn apply_to(&self, record: &mut VersionRecord) {
        if let Some(description) = &self.description {
            record.description = description.clone();
        }
        if let Some(payload) = &self.payload {
            record.payload = payload.clone();
        }
    }
}

pub fn validate_code(code: &str, max_len: usize) -> Result<(), ValidationError> {
    if code.trim().is_empty() {
        return Err(ValidationError::EmptyCode);
    }
    if code.chars().count() > max_len {
        return Err(ValidationError::CodeTooLong(code.to_owned(), max_len));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-');
    if !code.chars().all(allowed) {
        return Err(ValidationError::InvalidCode(code.to_owned()));
    }
    Ok(())
}
