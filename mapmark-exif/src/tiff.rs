//! Typed model of the TIFF structure carried in an EXIF segment.
//!
//! Entry values are kept as raw bytes in the block's own byte order, so an
//! entry that is never edited is written back exactly as it was read. Only the
//! pointer tags that link IFDs together are structural; they are stripped on
//! parse and regenerated by [`ExifBlock::encode`].

use std::collections::HashSet;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::{debug, warn};
use mapmark_core::Rational;

use crate::ExifError;
use crate::tag::{
    EXIF_IFD_POINTER, GPS_IFD_POINTER, INTEROP_IFD_POINTER, THUMBNAIL_LENGTH, THUMBNAIL_OFFSET,
};

const HEADER_LEN: usize = 8;
const ENTRY_LEN: usize = 12;
const TIFF_MAGIC: u16 = 42;

/// Byte order declared by the TIFF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// Intel order, header `II*\0`.
    Little,
    /// Motorola order, header `MM\0*`.
    Big,
}

impl Endian {
    fn read_u16(self, buf: &[u8]) -> u16 {
        match self {
            Self::Little => LittleEndian::read_u16(buf),
            Self::Big => BigEndian::read_u16(buf),
        }
    }

    fn read_u32(self, buf: &[u8]) -> u32 {
        match self {
            Self::Little => LittleEndian::read_u32(buf),
            Self::Big => BigEndian::read_u32(buf),
        }
    }

    fn push_u16(self, out: &mut Vec<u8>, value: u16) {
        let mut buf = [0; 2];
        match self {
            Self::Little => LittleEndian::write_u16(&mut buf, value),
            Self::Big => BigEndian::write_u16(&mut buf, value),
        }
        out.extend_from_slice(&buf);
    }

    fn push_u32(self, out: &mut Vec<u8>, value: u32) {
        let mut buf = [0; 4];
        match self {
            Self::Little => LittleEndian::write_u32(&mut buf, value),
            Self::Big => BigEndian::write_u32(&mut buf, value),
        }
        out.extend_from_slice(&buf);
    }

    const fn header(self) -> [u8; 4] {
        match self {
            Self::Little => *b"II*\0",
            Self::Big => *b"MM\0*",
        }
    }
}

/// TIFF field types 1 through 13, EXIF 3.0 `UTF-8`, and any other code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// 8-bit unsigned integer.
    Byte,
    /// NUL-terminated 7-bit ASCII.
    Ascii,
    /// 16-bit unsigned integer.
    Short,
    /// 32-bit unsigned integer.
    Long,
    /// Two `Long`s: numerator and denominator.
    Rational,
    /// 8-bit signed integer.
    SByte,
    /// Opaque bytes.
    Undefined,
    /// 16-bit signed integer.
    SShort,
    /// 32-bit signed integer.
    SLong,
    /// Two `SLong`s.
    SRational,
    /// IEEE single-precision float.
    Float,
    /// IEEE double-precision float.
    Double,
    /// 32-bit offset to a child IFD.
    Ifd,
    /// NUL-terminated UTF-8 text (EXIF 3.0).
    Utf8,
    /// A type this codec cannot size. The entry keeps its raw value field.
    Unknown(u16),
}

impl FieldType {
    /// Look up a field type by its numeric code.
    #[must_use]
    pub const fn from_code(code: u16) -> Self {
        match code {
            1 => Self::Byte,
            2 => Self::Ascii,
            3 => Self::Short,
            4 => Self::Long,
            5 => Self::Rational,
            6 => Self::SByte,
            7 => Self::Undefined,
            8 => Self::SShort,
            9 => Self::SLong,
            10 => Self::SRational,
            11 => Self::Float,
            12 => Self::Double,
            13 => Self::Ifd,
            129 => Self::Utf8,
            other => Self::Unknown(other),
        }
    }

    /// Numeric code written to the IFD.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Byte => 1,
            Self::Ascii => 2,
            Self::Short => 3,
            Self::Long => 4,
            Self::Rational => 5,
            Self::SByte => 6,
            Self::Undefined => 7,
            Self::SShort => 8,
            Self::SLong => 9,
            Self::SRational => 10,
            Self::Float => 11,
            Self::Double => 12,
            Self::Ifd => 13,
            Self::Utf8 => 129,
            Self::Unknown(code) => code,
        }
    }

    /// Size in bytes of one value of this type, when known.
    #[must_use]
    pub const fn size(self) -> Option<usize> {
        Some(match self {
            Self::Byte | Self::Ascii | Self::SByte | Self::Undefined | Self::Utf8 => 1,
            Self::Short | Self::SShort => 2,
            Self::Long | Self::SLong | Self::Float | Self::Ifd => 4,
            Self::Rational | Self::SRational | Self::Double => 8,
            Self::Unknown(_) => return None,
        })
    }
}

/// One IFD entry with its value bytes in the block's byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Tag number.
    pub tag: u16,
    /// Value type.
    pub field_type: FieldType,
    /// Number of values.
    pub count: u32,
    /// Value bytes, exactly `count * field_type.size()` long. For
    /// [`FieldType::Unknown`] this is the entry's 4-byte value field as read.
    pub raw: Vec<u8>,
}

impl Entry {
    /// An `ASCII` entry holding `text` plus its NUL terminator.
    #[must_use]
    pub fn ascii(tag: u16, text: &[u8]) -> Self {
        let mut raw = text.to_vec();
        raw.push(0);
        Self::bytes(tag, FieldType::Ascii, raw)
    }

    /// A `BYTE` entry holding `values`.
    #[must_use]
    pub fn byte_values(tag: u16, values: &[u8]) -> Self {
        Self::bytes(tag, FieldType::Byte, values.to_vec())
    }

    /// A `RATIONAL` entry holding `values` encoded in `endian`.
    #[must_use]
    pub fn rationals(tag: u16, values: &[Rational], endian: Endian) -> Self {
        let mut raw = Vec::with_capacity(values.len() * 8);
        for value in values {
            endian.push_u32(&mut raw, value.numerator);
            endian.push_u32(&mut raw, value.denominator);
        }
        Self {
            tag,
            field_type: FieldType::Rational,
            count: u32::try_from(values.len()).unwrap_or(u32::MAX),
            raw,
        }
    }

    fn long(tag: u16, value: u32, endian: Endian) -> Self {
        let mut raw = Vec::with_capacity(4);
        endian.push_u32(&mut raw, value);
        Self {
            tag,
            field_type: FieldType::Long,
            count: 1,
            raw,
        }
    }

    fn bytes(tag: u16, field_type: FieldType, raw: Vec<u8>) -> Self {
        Self {
            tag,
            field_type,
            count: u32::try_from(raw.len()).unwrap_or(u32::MAX),
            raw,
        }
    }

    /// Decode a `RATIONAL` entry.
    ///
    /// Returns `None` for any other field type.
    #[must_use]
    pub fn as_rationals(&self, endian: Endian) -> Option<Vec<Rational>> {
        if self.field_type != FieldType::Rational {
            return None;
        }
        Some(
            self.raw
                .chunks_exact(8)
                .map(|pair| {
                    let (numerator, denominator) = pair.split_at(4);
                    Rational::new(endian.read_u32(numerator), endian.read_u32(denominator))
                })
                .collect(),
        )
    }

    /// First byte of an `ASCII` entry.
    #[must_use]
    pub fn first_ascii(&self) -> Option<u8> {
        if self.field_type != FieldType::Ascii {
            return None;
        }
        self.raw.first().copied()
    }

    fn as_offset(&self, endian: Endian) -> Option<usize> {
        let bytes = match self.field_type {
            FieldType::Long | FieldType::Ifd => self.raw.get(..4)?,
            _ => return None,
        };
        usize::try_from(endian.read_u32(bytes)).ok()
    }

    const fn padded_len(&self) -> usize {
        let len = self.raw.len();
        if len <= 4 { 0 } else { len + (len & 1) }
    }
}

/// An image file directory: entries in tag order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ifd {
    entries: Vec<Entry>,
}

impl Ifd {
    /// An empty directory.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Entries in ascending tag order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Look up an entry by tag.
    #[must_use]
    pub fn get(&self, tag: u16) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.tag == tag)
    }

    /// Insert `entry`, replacing any entry with the same tag.
    pub fn insert(&mut self, entry: Entry) {
        match self.entries.binary_search_by_key(&entry.tag, |e| e.tag) {
            Ok(index) => {
                if let Some(slot) = self.entries.get_mut(index) {
                    *slot = entry;
                }
            }
            Err(index) => self.entries.insert(index, entry),
        }
    }

    /// Remove and return the entry with `tag`.
    pub fn remove(&mut self, tag: u16) -> Option<Entry> {
        let index = self.entries.iter().position(|entry| entry.tag == tag)?;
        Some(self.entries.remove(index))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the directory has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn from_entries(mut entries: Vec<Entry>) -> Self {
        entries.sort_by_key(|entry| entry.tag);
        entries.dedup_by_key(|entry| entry.tag);
        Self { entries }
    }

    fn encoded_len(entries: &[Entry]) -> usize {
        2 + ENTRY_LEN * entries.len() + 4 + entries.iter().map(Entry::padded_len).sum::<usize>()
    }
}

/// IFD1 and the JPEG thumbnail it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    /// IFD1 without its offset and length entries.
    pub ifd: Ifd,
    /// Thumbnail JPEG bytes.
    pub data: Vec<u8>,
}

/// The TIFF structure of one EXIF segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExifBlock {
    endian: Endian,
    /// Primary image directory.
    pub ifd0: Ifd,
    /// Exif sub-IFD.
    pub exif: Option<Ifd>,
    /// GPS sub-IFD.
    pub gps: Option<Ifd>,
    /// Interoperability sub-IFD, linked from the Exif IFD.
    pub interop: Option<Ifd>,
    /// Thumbnail directory and data.
    pub thumbnail: Option<Thumbnail>,
}

impl ExifBlock {
    /// An empty block in `endian` order.
    #[must_use]
    pub const fn new(endian: Endian) -> Self {
        Self {
            endian,
            ifd0: Ifd::new(),
            exif: None,
            gps: None,
            interop: None,
            thumbnail: None,
        }
    }

    /// Byte order of the block.
    #[must_use]
    pub const fn endian(&self) -> Endian {
        self.endian
    }

    /// Decode the TIFF structure that follows the `Exif\0\0` identifier.
    ///
    /// # Errors
    /// Returns [`ExifError::InvalidImageFormat`] for an unknown header, an
    /// IFD outside the buffer, or IFDs linked in a cycle.
    pub fn parse(tiff: &[u8]) -> Result<Self, ExifError> {
        let endian = match tiff.get(..2) {
            Some(b"II") => Endian::Little,
            Some(b"MM") => Endian::Big,
            _ => return Err(ExifError::invalid("unrecognised TIFF byte order")),
        };
        let mut reader = Reader {
            data: tiff,
            endian,
            visited: HashSet::new(),
        };
        if reader.u16_at(2)? != TIFF_MAGIC {
            return Err(ExifError::invalid("bad TIFF magic number"));
        }
        let ifd0_offset = reader.offset_at(4)?;
        let (mut ifd0, next) = reader.ifd(ifd0_offset)?;

        let exif = reader.child(&mut ifd0, EXIF_IFD_POINTER)?;
        let gps = reader.child(&mut ifd0, GPS_IFD_POINTER)?;
        let (exif, interop) = match exif {
            Some(mut exif_ifd) => {
                let interop = reader.child(&mut exif_ifd, INTEROP_IFD_POINTER)?;
                (Some(exif_ifd), interop)
            }
            None => (None, None),
        };
        let thumbnail = match next {
            0 => None,
            offset => reader.thumbnail(offset)?,
        };

        Ok(Self {
            endian,
            ifd0,
            exif,
            gps,
            interop,
            thumbnail,
        })
    }

    /// Encode the block in its byte order.
    ///
    /// IFDs are laid out as IFD0, Exif, Interop, GPS, IFD1. Entries are
    /// written in ascending tag order with value data word-aligned, and all
    /// pointer tags are regenerated.
    ///
    /// # Errors
    /// Returns [`ExifError::SegmentTooLarge`] when offsets overflow 32 bits or
    /// a directory has more than 65535 entries, and
    /// [`ExifError::InvalidImageFormat`] when an entry of unknown type holds
    /// values, since its value field may be an offset that cannot be moved.
    pub fn encode(&self) -> Result<Vec<u8>, ExifError> {
        self.check_relocatable()?;
        let endian = self.endian;
        let placeholder = |tag| Entry::long(tag, 0, endian);

        let mut ifd0 = self.ifd0.entries.clone();
        if self.exif.is_some() {
            ifd0.push(placeholder(EXIF_IFD_POINTER));
        }
        if self.gps.is_some() {
            ifd0.push(placeholder(GPS_IFD_POINTER));
        }
        let mut exif = self.exif.as_ref().map(|ifd| ifd.entries.clone());
        if let Some(entries) = exif.as_mut().filter(|_| self.interop.is_some()) {
            entries.push(placeholder(INTEROP_IFD_POINTER));
        }
        let interop = self.interop.as_ref().filter(|_| self.exif.is_some());
        let gps = self.gps.as_ref();
        let mut ifd1 = self.thumbnail.as_ref().map(|thumb| {
            let mut entries = thumb.ifd.entries.clone();
            entries.push(placeholder(THUMBNAIL_OFFSET));
            entries.push(placeholder(THUMBNAIL_LENGTH));
            entries
        });

        let ifd0_at = HEADER_LEN;
        let exif_at = ifd0_at + Ifd::encoded_len(&ifd0);
        let interop_at = exif_at + exif.as_deref().map_or(0, Ifd::encoded_len);
        let gps_at = interop_at + interop.map_or(0, |ifd| Ifd::encoded_len(&ifd.entries));
        let ifd1_at = gps_at + gps.map_or(0, |ifd| Ifd::encoded_len(&ifd.entries));
        let thumb_at = ifd1_at + ifd1.as_deref().map_or(0, Ifd::encoded_len);

        let offset = |at: usize| {
            u32::try_from(at).map_err(|_| ExifError::SegmentTooLarge { size: at })
        };
        set_long(&mut ifd0, EXIF_IFD_POINTER, offset(exif_at)?, endian);
        set_long(&mut ifd0, GPS_IFD_POINTER, offset(gps_at)?, endian);
        if let Some(entries) = exif.as_mut() {
            set_long(entries, INTEROP_IFD_POINTER, offset(interop_at)?, endian);
        }
        if let (Some(entries), Some(thumb)) = (ifd1.as_mut(), self.thumbnail.as_ref()) {
            set_long(entries, THUMBNAIL_OFFSET, offset(thumb_at)?, endian);
            set_long(entries, THUMBNAIL_LENGTH, offset(thumb.data.len())?, endian);
        }

        let mut out = Vec::with_capacity(thumb_at);
        out.extend_from_slice(&endian.header());
        endian.push_u16(&mut out, TIFF_MAGIC);
        endian.push_u32(&mut out, offset(ifd0_at)?);

        let next_after_ifd0 = if ifd1.is_some() { offset(ifd1_at)? } else { 0 };
        write_ifd(&mut out, ifd0, next_after_ifd0, endian)?;
        if let Some(entries) = exif {
            write_ifd(&mut out, entries, 0, endian)?;
        }
        if let Some(ifd) = interop {
            write_ifd(&mut out, ifd.entries.clone(), 0, endian)?;
        }
        if let Some(ifd) = gps {
            write_ifd(&mut out, ifd.entries.clone(), 0, endian)?;
        }
        if let (Some(entries), Some(thumb)) = (ifd1, self.thumbnail.as_ref()) {
            write_ifd(&mut out, entries, 0, endian)?;
            out.extend_from_slice(&thumb.data);
        }
        Ok(out)
    }
}

impl ExifBlock {
    fn directories(&self) -> impl Iterator<Item = &Ifd> {
        [
            Some(&self.ifd0),
            self.exif.as_ref(),
            self.interop.as_ref(),
            self.gps.as_ref(),
            self.thumbnail.as_ref().map(|thumb| &thumb.ifd),
        ]
        .into_iter()
        .flatten()
    }

    fn check_relocatable(&self) -> Result<(), ExifError> {
        let stuck = self
            .directories()
            .flat_map(Ifd::entries)
            .find(|entry| matches!(entry.field_type, FieldType::Unknown(_)) && entry.count > 0);
        match stuck {
            Some(entry) => Err(ExifError::invalid(format!(
                "tag {:#06x} has unknown field type {} and cannot be relocated",
                entry.tag,
                entry.field_type.code()
            ))),
            None => Ok(()),
        }
    }
}

fn set_long(entries: &mut [Entry], tag: u16, value: u32, endian: Endian) {
    if let Some(entry) = entries.iter_mut().find(|entry| entry.tag == tag) {
        *entry = Entry::long(tag, value, endian);
    }
}

fn write_ifd(
    out: &mut Vec<u8>,
    mut entries: Vec<Entry>,
    next: u32,
    endian: Endian,
) -> Result<(), ExifError> {
    entries.sort_by_key(|entry| entry.tag);
    let count = u16::try_from(entries.len()).map_err(|_| ExifError::SegmentTooLarge {
        size: entries.len(),
    })?;
    let mut data_at = out.len() + 2 + ENTRY_LEN * entries.len() + 4;
    let mut data = Vec::new();

    endian.push_u16(out, count);
    for entry in &entries {
        endian.push_u16(out, entry.tag);
        endian.push_u16(out, entry.field_type.code());
        endian.push_u32(out, entry.count);
        if entry.raw.len() <= 4 {
            let mut inline = [0; 4];
            if let Some(slot) = inline.get_mut(..entry.raw.len()) {
                slot.copy_from_slice(&entry.raw);
            }
            out.extend_from_slice(&inline);
        } else {
            let at = u32::try_from(data_at)
                .map_err(|_| ExifError::SegmentTooLarge { size: data_at })?;
            endian.push_u32(out, at);
            data.extend_from_slice(&entry.raw);
            if entry.raw.len() & 1 == 1 {
                data.push(0);
            }
            data_at += entry.padded_len();
        }
    }
    endian.push_u32(out, next);
    out.extend_from_slice(&data);
    Ok(())
}

/// Bounds-checked view of the TIFF buffer.
struct Reader<'a> {
    data: &'a [u8],
    endian: Endian,
    visited: HashSet<usize>,
}

impl<'a> Reader<'a> {
    fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8], ExifError> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or_else(|| {
                ExifError::invalid(format!("{len} bytes at offset {offset} lie outside EXIF data"))
            })
    }

    fn u16_at(&self, offset: usize) -> Result<u16, ExifError> {
        self.bytes(offset, 2).map(|buf| self.endian.read_u16(buf))
    }

    fn offset_at(&self, offset: usize) -> Result<usize, ExifError> {
        let value = self.bytes(offset, 4).map(|buf| self.endian.read_u32(buf))?;
        usize::try_from(value).map_err(|_| ExifError::invalid("offset does not fit in memory"))
    }

    /// Read the directory at `offset`, returning it with its next-IFD link.
    fn ifd(&mut self, offset: usize) -> Result<(Ifd, usize), ExifError> {
        if !self.visited.insert(offset) {
            return Err(ExifError::invalid(format!(
                "IFD at offset {offset} is linked more than once"
            )));
        }
        let count = usize::from(self.u16_at(offset)?);
        let table = offset + 2;
        self.bytes(table, count * ENTRY_LEN + 4)?;

        let mut entries = Vec::with_capacity(count);
        for index in 0..count {
            let at = table + index * ENTRY_LEN;
            if let Some(entry) = self.entry(at)? {
                entries.push(entry);
            }
        }
        let next = self.offset_at(table + count * ENTRY_LEN)?;
        Ok((Ifd::from_entries(entries), next))
    }

    fn entry(&self, at: usize) -> Result<Option<Entry>, ExifError> {
        let tag = self.u16_at(at)?;
        let field_type = FieldType::from_code(self.u16_at(at + 2)?);
        let count = self.bytes(at + 4, 4).map(|buf| self.endian.read_u32(buf))?;
        let Some(size) = field_type.size() else {
            debug!(
                "keeping EXIF tag {tag:#06x} of unknown field type {} opaque",
                field_type.code()
            );
            return Ok(Some(Entry {
                tag,
                field_type,
                count,
                raw: self.bytes(at + 8, 4)?.to_vec(),
            }));
        };
        let Some(len) = usize::try_from(count)
            .ok()
            .and_then(|count| count.checked_mul(size))
        else {
            warn!("skipping EXIF tag {tag:#06x} with oversized count {count}");
            return Ok(None);
        };
        let value = if len <= 4 {
            self.bytes(at + 8, len)?
        } else {
            let data_at = self.offset_at(at + 8)?;
            match self.bytes(data_at, len) {
                Ok(value) => value,
                Err(err) => {
                    warn!("skipping EXIF tag {tag:#06x}: {err}");
                    return Ok(None);
                }
            }
        };
        Ok(Some(Entry {
            tag,
            field_type,
            count,
            raw: value.to_vec(),
        }))
    }

    /// Follow and strip the pointer `tag` from `parent`.
    fn child(&mut self, parent: &mut Ifd, tag: u16) -> Result<Option<Ifd>, ExifError> {
        let Some(pointer) = parent.remove(tag) else {
            return Ok(None);
        };
        let offset = pointer
            .as_offset(self.endian)
            .ok_or_else(|| ExifError::invalid(format!("tag {tag:#06x} is not an IFD pointer")))?;
        self.ifd(offset).map(|(ifd, _)| Some(ifd))
    }

    fn thumbnail(&mut self, offset: usize) -> Result<Option<Thumbnail>, ExifError> {
        let (mut ifd, _) = self.ifd(offset)?;
        let start = ifd.remove(THUMBNAIL_OFFSET);
        let length = ifd.remove(THUMBNAIL_LENGTH);
        let (Some(start), Some(length)) = (
            start.and_then(|entry| entry.as_offset(self.endian)),
            length.and_then(|entry| entry.as_offset(self.endian)),
        ) else {
            warn!("IFD1 has no JPEG thumbnail; dropping it");
            return Ok(None);
        };
        match self.bytes(start, length) {
            Ok(data) => Ok(Some(Thumbnail {
                ifd,
                data: data.to_vec(),
            })),
            Err(err) => {
                warn!("dropping unreadable thumbnail: {err}");
                Ok(None)
            }
        }
    }
}
