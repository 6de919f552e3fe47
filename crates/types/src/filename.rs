//! Stream filename grammar
//!
//! Data, signature and sidecar artifacts are named
//! `<yyyy-MM-dd>T<HH_mm_ss>.<nanos>Z<suffix>`; block files are named by
//! their zero-padded block number instead.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use strand_errors::{Error, ParseError};

/// Extension of record stream data files
pub const RECORD_EXTENSION: &str = "rcd";
/// Suffix appended to compressed artifacts
pub const COMPRESSED_SUFFIX: &str = ".gz";
/// Suffix appended to the data extension for signature files
pub const SIGNATURE_SUFFIX: &str = "_sig";
/// Extension of block stream files
pub const BLOCK_EXTENSION: &str = ".blk.gz";

const BLOCK_DIGITS: usize = 36;
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H_%M_%S";
const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Kind of artifact a filename refers to
///
/// The declaration order is the tiebreak for filenames sharing a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Data,
    Sidecar,
    Signature,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data => write!(f, "data"),
            Self::Sidecar => write!(f, "sidecar"),
            Self::Signature => write!(f, "signature"),
        }
    }
}

/// Parsed, immutable stream filename
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamFilename {
    name: String,
    timestamp: i64,
    kind: FileKind,
    compressed: bool,
    sidecar_id: Option<u8>,
}

impl StreamFilename {
    /// Parse a filename such as `2022-06-21T09_15_38.325469003Z.rcd.gz`
    ///
    /// # Errors
    ///
    /// Returns an error if the timestamp portion or the suffix does not follow
    /// the stream filename grammar.
    pub fn parse(name: &str) -> Result<Self, Error> {
        let invalid = |reason: &str| ParseError::invalid_filename(name, reason);

        let z = name
            .find('Z')
            .ok_or_else(|| invalid("missing 'Z' timestamp terminator"))?;
        let (instant, suffix) = (&name[..z], &name[z + 1..]);
        let timestamp = parse_instant(instant).ok_or_else(|| invalid("malformed timestamp"))?;

        let (kind, compressed, sidecar_id) = parse_suffix(suffix)
            .ok_or_else(|| invalid("unrecognized artifact suffix"))?;

        Ok(Self {
            name: name.to_string(),
            timestamp,
            kind,
            compressed,
            sidecar_id,
        })
    }

    /// Render the canonical filename for a consensus timestamp
    #[must_use]
    pub fn from_timestamp(timestamp: i64, kind: FileKind, compressed: bool) -> Self {
        Self::render(timestamp, kind, compressed, None)
    }

    /// The signature filename sorting before every real file, used when no
    /// file has been accepted yet
    #[must_use]
    pub fn epoch(kind: FileKind) -> Self {
        Self::from_timestamp(0, kind, false)
    }

    fn render(timestamp: i64, kind: FileKind, compressed: bool, sidecar_id: Option<u8>) -> Self {
        let seconds = timestamp.div_euclid(NANOS_PER_SECOND);
        // rem_euclid keeps nanos within 0..1e9
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let nanos = timestamp.rem_euclid(NANOS_PER_SECOND) as u32;
        let instant = DateTime::from_timestamp(seconds, nanos)
            .unwrap_or_default()
            .format(DATE_TIME_FORMAT);
        let gz = if compressed { COMPRESSED_SUFFIX } else { "" };
        let suffix = match (kind, sidecar_id) {
            (FileKind::Data, _) => format!(".{RECORD_EXTENSION}{gz}"),
            (FileKind::Signature, _) => format!(".{RECORD_EXTENSION}{SIGNATURE_SUFFIX}"),
            (FileKind::Sidecar, id) => format!("_{:02}.{RECORD_EXTENSION}{gz}", id.unwrap_or(1)),
        };
        Self {
            name: format!("{instant}.{nanos:09}Z{suffix}"),
            timestamp,
            kind,
            compressed: compressed && kind != FileKind::Signature,
            sidecar_id: if kind == FileKind::Sidecar {
                Some(sidecar_id.unwrap_or(1))
            } else {
                None
            },
        }
    }

    /// Data filename sharing this filename's timestamp
    #[must_use]
    pub fn data_filename(&self, compressed: bool) -> Self {
        Self::render(self.timestamp, FileKind::Data, compressed, None)
    }

    /// Signature filename sharing this filename's timestamp
    #[must_use]
    pub fn signature_filename(&self) -> Self {
        Self::render(self.timestamp, FileKind::Signature, false, None)
    }

    /// Sidecar filename for the given sidecar id
    #[must_use]
    pub fn sidecar_filename(&self, id: u8) -> Self {
        Self::render(self.timestamp, FileKind::Sidecar, true, Some(id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Consensus timestamp in nanoseconds since the Unix epoch
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    #[must_use]
    pub fn kind(&self) -> FileKind {
        self.kind
    }

    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    #[must_use]
    pub fn sidecar_id(&self) -> Option<u8> {
        self.sidecar_id
    }
}

fn parse_instant(instant: &str) -> Option<i64> {
    let (date_time, fraction) = instant.split_once('.')?;
    if fraction.is_empty() || fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(date_time, DATE_TIME_FORMAT).ok()?;
    let padded = format!("{fraction:0<9}");
    let nanos: i64 = padded.parse().ok()?;
    naive
        .and_utc()
        .timestamp()
        .checked_mul(NANOS_PER_SECOND)?
        .checked_add(nanos)
}

fn parse_suffix(suffix: &str) -> Option<(FileKind, bool, Option<u8>)> {
    let data = format!(".{RECORD_EXTENSION}");
    if suffix == data {
        return Some((FileKind::Data, false, None));
    }
    if suffix == format!("{data}{COMPRESSED_SUFFIX}") {
        return Some((FileKind::Data, true, None));
    }
    if suffix == format!("{data}{SIGNATURE_SUFFIX}") {
        return Some((FileKind::Signature, false, None));
    }
    let rest = suffix.strip_prefix('_')?;
    let (id, ext) = rest.split_at_checked(2)?;
    let id: u8 = id.parse().ok()?;
    match ext.strip_prefix(&data)? {
        "" => Some((FileKind::Sidecar, false, Some(id))),
        COMPRESSED_SUFFIX => Some((FileKind::Sidecar, true, Some(id))),
        _ => None,
    }
}

impl Ord for StreamFilename {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then(self.kind.cmp(&other.kind))
            .then(self.sidecar_id.cmp(&other.sidecar_id))
            .then(self.name.cmp(&other.name))
    }
}

impl PartialOrd for StreamFilename {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for StreamFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl FromStr for StreamFilename {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for StreamFilename {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.name)
    }
}

impl<'de> Deserialize<'de> for StreamFilename {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Filename of a block stream file
///
/// # Errors
///
/// Returns an invalid-argument error for negative block numbers.
pub fn block_filename(block_number: i64) -> Result<String, Error> {
    if block_number < 0 {
        return Err(Error::invalid_argument("Block number must be non-negative"));
    }
    Ok(format!(
        "{block_number:0width$}{BLOCK_EXTENSION}",
        width = BLOCK_DIGITS
    ))
}

/// Block number encoded in a block stream filename
///
/// # Errors
///
/// Returns an error if the name is not a zero-padded block number followed by `.blk.gz`.
pub fn block_number(filename: &str) -> Result<i64, Error> {
    filename
        .strip_suffix(BLOCK_EXTENSION)
        .filter(|digits| digits.len() == BLOCK_DIGITS && digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| ParseError::invalid_filename(filename, "not a block stream filename").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_data_filename() {
        let name = StreamFilename::parse("2022-06-21T09_15_38.325469003Z.rcd.gz").unwrap();
        assert_eq!(name.kind(), FileKind::Data);
        assert!(name.is_compressed());
        assert_eq!(name.timestamp(), 1_655_802_938_325_469_003);
        assert_eq!(name.to_string(), "2022-06-21T09_15_38.325469003Z.rcd.gz");
    }

    #[test]
    fn test_parse_signature_and_sidecar() {
        let sig = StreamFilename::parse("2022-06-21T09_15_38.325469003Z.rcd_sig").unwrap();
        assert_eq!(sig.kind(), FileKind::Signature);
        assert!(!sig.is_compressed());

        let sidecar = StreamFilename::parse("2022-06-21T09_15_38.325469003Z_02.rcd.gz").unwrap();
        assert_eq!(sidecar.kind(), FileKind::Sidecar);
        assert_eq!(sidecar.sidecar_id(), Some(2));
        assert!(sidecar.is_compressed());
    }

    #[test]
    fn test_short_fraction_is_right_padded() {
        let name = StreamFilename::parse("2019-08-30T18_10_00.419072Z.rcd").unwrap();
        assert_eq!(name.timestamp() % 1_000_000_000, 419_072_000);
    }

    #[test]
    fn test_invalid_filenames() {
        for bad in [
            "2022-06-21T09_15_38.325469003.rcd",
            "2022-06-21 09:15:38.325469003Z.rcd",
            "2022-06-21T09_15_38Z.rcd",
            "2022-06-21T09_15_38.325469003Z.txt",
            "2022-06-21T09_15_38.325469003Z_xx.rcd",
            "",
        ] {
            assert!(StreamFilename::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_sibling_names() {
        let sig = StreamFilename::parse("2022-06-21T09_15_38.325469003Z.rcd_sig").unwrap();
        assert_eq!(
            sig.data_filename(true).as_str(),
            "2022-06-21T09_15_38.325469003Z.rcd.gz"
        );
        assert_eq!(
            sig.data_filename(false).as_str(),
            "2022-06-21T09_15_38.325469003Z.rcd"
        );
        assert_eq!(
            sig.sidecar_filename(1).as_str(),
            "2022-06-21T09_15_38.325469003Z_01.rcd.gz"
        );
        assert_eq!(sig.data_filename(true).signature_filename(), sig);
    }

    #[test]
    fn test_ordering_uses_kind_as_tiebreak() {
        let data = StreamFilename::parse("2022-06-21T09_15_38.325469003Z.rcd").unwrap();
        let sig = StreamFilename::parse("2022-06-21T09_15_38.325469003Z.rcd_sig").unwrap();
        let later = StreamFilename::parse("2022-06-21T09_15_40.000000000Z.rcd").unwrap();
        assert!(data < sig);
        assert!(sig < later);
        assert!(StreamFilename::epoch(FileKind::Signature) < data);
    }

    #[test]
    fn test_block_filenames() {
        assert_eq!(
            block_filename(0).unwrap(),
            "000000000000000000000000000000000000.blk.gz"
        );
        assert_eq!(
            block_filename(1).unwrap(),
            "000000000000000000000000000000000001.blk.gz"
        );
        let err = block_filename(-1).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert!(err.to_string().contains("Block number must be non-negative"));
    }

    #[test]
    fn test_block_number_parsing() {
        assert_eq!(block_number(&block_filename(42).unwrap()).unwrap(), 42);
        assert!(block_number("42.blk.gz").is_err());
        assert!(block_number("2022-06-21T09_15_38.325469003Z.rcd").is_err());
    }

    proptest! {
        #[test]
        fn prop_rendered_names_parse_back(
            timestamp in 0i64..4_102_444_800_000_000_000,
            kind in prop_oneof![Just(FileKind::Data), Just(FileKind::Signature), Just(FileKind::Sidecar)],
            compressed in any::<bool>(),
        ) {
            let rendered = StreamFilename::from_timestamp(timestamp, kind, compressed);
            let parsed = StreamFilename::parse(rendered.as_str()).unwrap();
            prop_assert_eq!(parsed.timestamp(), timestamp);
            prop_assert_eq!(parsed.kind(), kind);
            prop_assert_eq!(&parsed, &rendered);
        }

        #[test]
        fn prop_order_follows_timestamp(a in 0i64..4_000_000_000_000_000_000, b in 0i64..4_000_000_000_000_000_000) {
            let left = StreamFilename::from_timestamp(a, FileKind::Data, false);
            let right = StreamFilename::from_timestamp(b, FileKind::Data, false);
            prop_assert_eq!(left.cmp(&right), a.cmp(&b));
        }
    }
}
