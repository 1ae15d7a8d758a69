use std::sync::OnceLock;

use serde::{Deserialize, Deserializer, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

static LOCAL_OFFSET: OnceLock<UtcOffset> = OnceLock::new();

/// Deserialize an RFC 3339 formatted string into an OffsetDateTime
pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    OffsetDateTime::parse(&s, &Rfc3339).map_err(serde::de::Error::custom)
}

/// Serialize an OffsetDateTime into an RFC 3339 formatted string
pub fn serialize<S>(datetime: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = datetime
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&s)
}

/// Resolves and caches the machine's UTC offset.
///
/// On Unix the offset can only be read while the process is single-threaded,
/// so call this before starting a multi-threaded runtime.  Later calls return
/// the cached value.
pub fn init_local_offset() -> UtcOffset {
    *LOCAL_OFFSET.get_or_init(|| {
        UtcOffset::current_local_offset().unwrap_or_else(|err| {
            tracing::debug!("local offset unavailable, using UTC: {err}");
            UtcOffset::UTC
        })
    })
}

/// The current time in the cached local offset.
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(init_local_offset())
}

/// Formats a timestamp as a two-digit `HH:MM` wall clock.
pub fn clock(datetime: &OffsetDateTime) -> String {
    format!("{:02}:{:02}", datetime.hour(), datetime.minute())
}
