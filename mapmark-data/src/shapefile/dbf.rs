//! Decoder for dBASE III attribute tables.

use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use mapmark_core::{AttributeRow, AttributeValue, FieldSchema};
use thiserror::Error;

const HEADER_LEN: usize = 32;
const DESCRIPTOR_LEN: usize = 32;
const TERMINATOR: u8 = 0x0D;
const DELETED: u8 = b'*';

/// Errors raised while decoding a `.dbf` file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbfError {
    /// The file is shorter than its 32-byte header.
    #[error("attribute table header is truncated")]
    TruncatedHeader,
    /// The field descriptor array is not terminated within the header.
    #[error("field descriptors are not terminated")]
    UnterminatedDescriptors,
    /// The declared record length disagrees with the field widths.
    #[error("record length {declared} does not fit fields totalling {fields} bytes")]
    RecordLength {
        /// Record length from the header, including the deletion flag.
        declared: usize,
        /// Sum of the field widths.
        fields: usize,
    },
    /// A record runs past the end of the file.
    #[error("record {record} is truncated")]
    TruncatedRecord {
        /// Zero-based record position.
        record: usize,
    },
}

#[derive(Debug, Clone)]
struct FieldDescriptor {
    kind: u8,
    width: usize,
}

/// Decoded attribute table.
#[derive(Debug, Clone, PartialEq)]
pub struct DbfTable {
    /// Field names in declaration order.
    pub schema: FieldSchema,
    /// One row per record, deleted records included to keep positions.
    pub rows: Vec<AttributeRow>,
}

/// Decode a dBASE III table.
///
/// # Errors
/// Returns [`DbfError`] when the header, descriptors or records are
/// truncated or inconsistent.
pub fn parse_dbf(bytes: &[u8]) -> Result<DbfTable, DbfError> {
    let header = bytes.get(..HEADER_LEN).ok_or(DbfError::TruncatedHeader)?;
    let record_count = header
        .get(4..8)
        .map(LittleEndian::read_u32)
        .and_then(|count| usize::try_from(count).ok())
        .ok_or(DbfError::TruncatedHeader)?;
    let header_len = header
        .get(8..10)
        .map_or(0, |len| usize::from(LittleEndian::read_u16(len)));
    let record_len = header
        .get(10..12)
        .map_or(0, |len| usize::from(LittleEndian::read_u16(len)));

    let (names, fields) = read_descriptors(bytes, header_len)?;
    let widths: usize = fields.iter().map(|field| field.width).sum();
    if record_len < widths + 1 {
        return Err(DbfError::RecordLength {
            declared: record_len,
            fields: widths,
        });
    }

    // The header count is untrusted; only reserve what the file can hold.
    let fits = record_count
        .checked_mul(record_len)
        .and_then(|len| len.checked_add(header_len))
        .is_some_and(|end| end <= bytes.len());
    let schema: FieldSchema = Arc::from(names);
    let mut rows = if fits {
        Vec::with_capacity(record_count)
    } else {
        Vec::new()
    };
    for record in 0..record_count {
        let start = header_len + record * record_len;
        let data = bytes
            .get(start..start + record_len)
            .ok_or(DbfError::TruncatedRecord { record })?;
        if data.first() == Some(&DELETED) {
            debug!("attribute record {record} is flagged deleted");
        }
        let values = decode_record(data.get(1..).unwrap_or_default(), &fields);
        let row = AttributeRow::new(Arc::clone(&schema), values)
            .map_err(|_| DbfError::TruncatedRecord { record })?;
        rows.push(row);
    }
    Ok(DbfTable { schema, rows })
}

fn read_descriptors(
    bytes: &[u8],
    header_len: usize,
) -> Result<(Vec<String>, Vec<FieldDescriptor>), DbfError> {
    let mut names = Vec::new();
    let mut fields = Vec::new();
    let mut offset = HEADER_LEN;
    loop {
        match bytes.get(offset) {
            Some(&TERMINATOR) => break,
            Some(_) if offset + DESCRIPTOR_LEN <= header_len => {}
            _ => return Err(DbfError::UnterminatedDescriptors),
        }
        let descriptor = bytes
            .get(offset..offset + DESCRIPTOR_LEN)
            .ok_or(DbfError::UnterminatedDescriptors)?;
        let raw_name = descriptor.get(..11).unwrap_or_default();
        let name_len = raw_name.iter().position(|b| *b == 0).unwrap_or(raw_name.len());
        let name = String::from_utf8_lossy(raw_name.get(..name_len).unwrap_or_default());
        names.push(name.trim().to_owned());
        fields.push(FieldDescriptor {
            kind: descriptor.get(11).copied().unwrap_or(b'C'),
            width: descriptor.get(16).map_or(0, |width| usize::from(*width)),
        });
        offset += DESCRIPTOR_LEN;
    }
    Ok((names, fields))
}

fn decode_record(data: &[u8], fields: &[FieldDescriptor]) -> Vec<AttributeValue> {
    let mut offset = 0;
    fields
        .iter()
        .map(|field| {
            let raw = data.get(offset..offset + field.width).unwrap_or_default();
            offset += field.width;
            decode_value(field.kind, &String::from_utf8_lossy(raw))
        })
        .collect()
}

fn decode_value(kind: u8, raw: &str) -> AttributeValue {
    let text = raw.trim_matches(|c: char| c == ' ' || c == '\0');
    match kind.to_ascii_uppercase() {
        b'N' | b'F' => text
            .parse()
            .map_or(AttributeValue::Null, AttributeValue::Number),
        b'L' => match text.chars().next() {
            Some('T' | 't' | 'Y' | 'y') => AttributeValue::Boolean(true),
            Some('F' | 'f' | 'N' | 'n') => AttributeValue::Boolean(false),
            _ => AttributeValue::Null,
        },
        b'D' => decode_date(text),
        _ => AttributeValue::Text(text.to_owned()),
    }
}

fn decode_date(text: &str) -> AttributeValue {
    if text.is_empty() {
        return AttributeValue::Null;
    }
    match (text.get(..4), text.get(4..6), text.get(6..8)) {
        (Some(year), Some(month), Some(day))
            if text.len() == 8 && text.bytes().all(|b| b.is_ascii_digit()) =>
        {
            AttributeValue::Date(format!("{year}-{month}-{day}"))
        }
        _ => AttributeValue::Text(text.to_owned()),
    }
}
