//! Frame codec for the station's proprietary record format.
//!
//! This module is the only place in the system that inspects frame
//! bytes. Everything above it moves opaque [`RawFrame`] buffers around.
//!
//! The search and query messages, and the response layout, come from a
//! partially reverse-engineered protocol. The message trailers are
//! treated as opaque constants, not computed checksums, and the field
//! table below covers only the offsets that have been confirmed against
//! captured packets.

use std::collections::BTreeMap;
use tracing::trace;

/// An opaque byte sequence received from the station socket
pub type RawFrame = Vec<u8>;

/// Maximum size of a single response frame
pub const MAX_FRAME: usize = 1024;

/// Mapping from decoded field name to numeric value.
///
/// May be partial: a field that fails to parse is absent, never
/// defaulted to zero, so absence stays distinguishable from a
/// legitimate zero reading.
pub type DecodedRecord = BTreeMap<&'static str, f64>;

// FIXME: get more search and query string samples

/// Discovery broadcast payload: "PC2000" + "SEARCH" + opaque trailer
const SEARCH_MSG: [u8; 40] = [
    0x50, 0x43, 0x32, 0x30, 0x30, 0x30, 0x00, 0x00, // "PC2000"
    0x53, 0x45, 0x41, 0x52, 0x43, 0x48, 0x00, 0x00, // "SEARCH"
    0x00, 0xcd, 0xfd, 0x94, 0x2c, 0xfb, 0xe3, 0x0b,
    0x0c, 0xfb, 0xe3, 0x0b, 0x50, 0xab, 0xa5, 0x77,
    0x00, 0x00, 0x00, 0x00, 0x00, 0xdd, 0xbf, 0x77,
];

/// Query payload requesting the current record:
/// "PC2000" + "READ" + "NOWRECORD" + opaque trailer
const QUERY_MSG: [u8; 40] = [
    0x50, 0x43, 0x32, 0x30, 0x30, 0x30, 0x00, 0x00, // "PC2000"
    0x52, 0x45, 0x41, 0x44, 0x00, 0x00, 0x00, 0x00, // "READ"
    0x4e, 0x4f, 0x57, 0x52, 0x45, 0x43, 0x4f, 0x52, // "NOWRECORD"
    0x44, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xb8, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// The fixed discovery-broadcast payload
pub fn encode_discovery() -> &'static [u8] {
    &SEARCH_MSG
}

/// The fixed query payload requesting the current record
pub fn encode_query() -> &'static [u8] {
    &QUERY_MSG
}

/// Width and interpretation of one field in the response layout
#[derive(Debug, Clone, Copy)]
enum FieldKind {
    U8,
    U16,
    F32,
}

/// One entry in the fixed-offset response layout
struct FieldSpec {
    name: &'static str,
    offset: usize,
    kind: FieldKind,
}

const fn field(name: &'static str, offset: usize, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, offset, kind }
}

// Response layout: two 8-byte strings, a 16-byte null-terminated
// record-type string ("NOWRECORD"), then typed numeric fields at fixed
// offsets, little-endian. Offsets without a confirmed meaning are left
// out rather than guessed at.
const FIELDS: &[FieldSpec] = &[
    field("wind_dir", 38, FieldKind::U16),
    field("humidity_in", 40, FieldKind::U8),
    field("humidity_out", 41, FieldKind::U8),
    field("temperature_in", 42, FieldKind::F32),
    field("pressure", 50, FieldKind::F32),
    field("temperature_out", 54, FieldKind::F32),
    field("dewpoint", 58, FieldKind::F32),
    field("windchill", 62, FieldKind::F32),
    field("wind_speed", 66, FieldKind::F32),
    field("gust_speed", 70, FieldKind::F32),
    field("rain_delta", 74, FieldKind::F32),
    field("rain_year", 90, FieldKind::F32),
    field("solar_radiation", 94, FieldKind::F32),
    field("uv", 98, FieldKind::U8),
];

/// Decode a raw response buffer into named fields, best effort.
///
/// Never fails: a field whose bytes are missing or unparseable is
/// omitted from the result and decoding of the remaining fields
/// continues. Short or garbage input yields a record with zero or more
/// fields, never an error.
pub fn decode(raw: &[u8]) -> DecodedRecord {
    let mut record = DecodedRecord::new();
    for spec in FIELDS {
        match read_field(raw, spec) {
            Some(value) => {
                record.insert(spec.name, value);
            }
            None => {
                trace!(field = spec.name, offset = spec.offset, "field not decodable");
            }
        }
    }
    record
}

fn read_field(raw: &[u8], spec: &FieldSpec) -> Option<f64> {
    match spec.kind {
        FieldKind::U8 => raw.get(spec.offset).map(|b| f64::from(*b)),
        FieldKind::U16 => {
            let bytes = raw.get(spec.offset..spec.offset + 2)?;
            Some(f64::from(u16::from_le_bytes([bytes[0], bytes[1]])))
        }
        FieldKind::F32 => {
            let bytes = raw.get(spec.offset..spec.offset + 4)?;
            let value = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            // NaN/infinity means the bytes were not a reading
            value.is_finite().then(|| f64::from(value))
        }
    }
}

/// Hex-dump a buffer for debug logging
pub fn fmt_bytes(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
