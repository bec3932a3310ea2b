//! Lazy reader for gzip-compressed backup streams.
//!
//! # Design
//!
//! - The stream is a gzip file (multi-member allowed) of concatenated JSON
//!   records; nothing is buffered beyond the current record.
//! - Opening forces the first decompressed block so a bad header fails before
//!   any worker is spawned.
//! - The first decode error ends the sequence; the iterator yields `None` after it.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::de::IoRead;
use serde_json::value::RawValue;
use serde_json::{Deserializer, StreamDeserializer};

use crate::error::{RestoreError, RestoreResult};

/// One unit of restore work decoded from the backup stream.
///
/// Field names match case-insensitively (`Path`, `path`, `PATH`); unknown
/// fields are ignored and a repeated field keeps its last value. A missing or
/// `null` path decodes as empty.
#[derive(Debug)]
pub struct WorkItem {
    /// Logical path of the file in the store.
    pub path: String,
    /// File metadata, kept verbatim.
    pub meta: Option<Box<RawValue>>,
}

impl<'de> Deserialize<'de> for WorkItem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(WorkItemVisitor)
    }
}

struct WorkItemVisitor;

impl<'de> Visitor<'de> for WorkItemVisitor {
    type Value = WorkItem;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a backup record object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut path = None;
        let mut meta = None;
        while let Some(key) = map.next_key::<String>()? {
            if key.eq_ignore_ascii_case("path") {
                path = map.next_value::<Option<String>>()?;
            } else if key.eq_ignore_ascii_case("meta") {
                meta = map.next_value::<Option<Box<RawValue>>>()?;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(WorkItem {
            path: path.unwrap_or_default(),
            meta,
        })
    }
}

impl WorkItem {
    /// Metadata document as sent to the server; absent metadata is `null`.
    #[must_use]
    pub fn meta_json(&self) -> &str {
        self.meta.as_deref().map_or("null", RawValue::get)
    }
}

/// Decoder over a backup stream opened from disk.
pub type FileDecoder = RecordDecoder<BufReader<MultiGzDecoder<File>>>;

/// Forward-only sequence of [`WorkItem`] records.
pub struct RecordDecoder<R: Read> {
    records: StreamDeserializer<'static, IoRead<R>, WorkItem>,
    position: u64,
    failed: bool,
}

impl RecordDecoder<BufReader<MultiGzDecoder<File>>> {
    /// Open and decompress the backup stream at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RestoreError::OpenSource`] if the file cannot be opened and
    /// [`RestoreError::Decompress`] if it does not start with a gzip stream.
    pub fn open(path: &Path) -> RestoreResult<Self> {
        let file = File::open(path).map_err(|source| RestoreError::OpenSource {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(MultiGzDecoder::new(file));
        reader
            .fill_buf()
            .map_err(|source| RestoreError::Decompress {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_reader(reader))
    }
}

impl<R: Read> RecordDecoder<R> {
    /// Decode records from an already decompressed reader.
    pub fn from_reader(reader: R) -> Self {
        Self {
            records: Deserializer::from_reader(reader).into_iter::<WorkItem>(),
            position: 0,
            failed: false,
        }
    }

    /// Number of records pulled so far, including a failed one.
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.position
    }
}

impl<R: Read> Iterator for RecordDecoder<R> {
    type Item = RestoreResult<WorkItem>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let next = self.records.next()?;
        self.position += 1;
        let record = self.position;

        let result = match next {
            Ok(item) if item.path.is_empty() => Err(RestoreError::EmptyPath { record }),
            Ok(item) => Ok(item),
            Err(source) => Err(RestoreError::Decode { record, source }),
        };
        self.failed = result.is_err();
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use cbfs_test_support::{BackupFixture, record};
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_records_in_stream_order() {
        let fixture = BackupFixture::from_records(&[
            record("a", json!({"oid": "1", "length": 3})),
            record("b", json!({"oid": "2"})),
            record("c", json!(null)),
        ])
        .expect("fixture");

        let decoder = RecordDecoder::open(fixture.path()).expect("stream opens");
        let items: Vec<WorkItem> = decoder
            .collect::<RestoreResult<_>>()
            .expect("records decode");

        let paths: Vec<&str> = items.iter().map(|item| item.path.as_str()).collect();
        assert_eq!(paths, ["a", "b", "c"]);
        assert_eq!(items[0].meta_json(), r#"{"length":3,"oid":"1"}"#);
        assert_eq!(items[2].meta_json(), "null");
    }

    #[test]
    fn meta_passes_through_verbatim() {
        let body = br#"{"Path": "x", "Meta": {"b": 1,   "a": [true]}}"#;
        let fixture = BackupFixture::from_uncompressed(body).expect("fixture");
        let mut decoder = RecordDecoder::open(fixture.path()).expect("stream opens");

        let item = decoder.next().expect("one record").expect("valid record");
        assert_eq!(item.meta_json(), r#"{"b": 1,   "a": [true]}"#);
        assert!(decoder.next().is_none());
    }

    #[test]
    fn missing_meta_and_lowercase_fields_are_accepted() {
        let body = b"{\"path\": \"lower\"}\n{\"Path\": \"upper\", \"Extra\": 1}\n";
        let decoder = RecordDecoder::from_reader(&body[..]);
        let items: Vec<WorkItem> = decoder.collect::<RestoreResult<_>>().expect("decode");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].path, "lower");
        assert_eq!(items[1].meta_json(), "null");
    }

    #[test]
    fn field_names_match_any_case() {
        let body = br#"{"PATH": "one", "mEtA": {"k": 1}} {"pAth": "two", "Path": "three"}"#;
        let decoder = RecordDecoder::from_reader(&body[..]);
        let items: Vec<WorkItem> = decoder.collect::<RestoreResult<_>>().expect("decode");
        assert_eq!(items[0].path, "one");
        assert_eq!(items[0].meta_json(), r#"{"k": 1}"#);
        assert_eq!(items[1].path, "three");
    }

    #[test]
    fn missing_path_is_reported_as_empty() {
        let body = br#"{"Meta": {}}"#;
        let mut decoder = RecordDecoder::from_reader(&body[..]);
        assert!(matches!(
            decoder.next(),
            Some(Err(RestoreError::EmptyPath { record: 1 }))
        ));
        assert_eq!(decoder.position(), 1);
    }

    #[test]
    fn non_object_record_is_a_decode_error() {
        let body = br#"{"Path": "a"} [1, 2]"#;
        let mut decoder = RecordDecoder::from_reader(&body[..]);
        assert!(matches!(decoder.next(), Some(Ok(_))));
        assert!(matches!(
            decoder.next(),
            Some(Err(RestoreError::Decode { record: 2, .. }))
        ));
    }

    #[test]
    fn empty_stream_ends_cleanly() {
        let fixture = BackupFixture::from_uncompressed(b"").expect("fixture");
        let mut decoder = RecordDecoder::open(fixture.path()).expect("stream opens");
        assert!(decoder.next().is_none());
        assert_eq!(decoder.position(), 0);
    }

    #[test]
    fn malformed_record_stops_the_sequence() {
        let body = b"{\"Path\": \"a\", \"Meta\": {}}\n{\"Path\": \"b\", \"Meta\": {}}\n{\"Path\": 12";
        let mut decoder = RecordDecoder::from_reader(&body[..]);

        let first = decoder.next().and_then(Result::ok).map(|item| item.path);
        assert_eq!(first.as_deref(), Some("a"));
        let second = decoder.next().and_then(Result::ok).map(|item| item.path);
        assert_eq!(second.as_deref(), Some("b"));
        match decoder.next() {
            Some(Err(RestoreError::Decode { record, .. })) => assert_eq!(record, 3),
            other => panic!("expected decode error, got {other:?}"),
        }
        assert!(decoder.next().is_none());
    }

    #[test]
    fn empty_path_is_rejected() {
        let body = br#"{"Path": "", "Meta": {}}"#;
        let mut decoder = RecordDecoder::from_reader(&body[..]);
        assert!(matches!(
            decoder.next(),
            Some(Err(RestoreError::EmptyPath { record: 1 }))
        ));
        assert!(decoder.next().is_none());
    }

    #[test]
    fn open_rejects_uncompressed_input() {
        let fixture = BackupFixture::raw(b"{\"Path\": \"a\"}\n").expect("fixture");
        assert!(matches!(
            RecordDecoder::open(fixture.path()),
            Err(RestoreError::Decompress { .. })
        ));
    }

    #[test]
    fn open_reports_missing_file() {
        let missing = Path::new("/definitely/missing/backup.json.gz");
        assert!(matches!(
            RecordDecoder::open(missing),
            Err(RestoreError::OpenSource { .. })
        ));
    }
}
