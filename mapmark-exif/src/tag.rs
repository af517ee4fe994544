//! Tag numbers used by the codec.

/// Pointer from IFD0 to the Exif sub-IFD.
pub const EXIF_IFD_POINTER: u16 = 0x8769;
/// Pointer from IFD0 to the GPS sub-IFD.
pub const GPS_IFD_POINTER: u16 = 0x8825;
/// Pointer from the Exif IFD to the Interoperability sub-IFD.
pub const INTEROP_IFD_POINTER: u16 = 0xA005;
/// Offset of the JPEG thumbnail described by IFD1.
pub const THUMBNAIL_OFFSET: u16 = 0x0201;
/// Length of the JPEG thumbnail described by IFD1.
pub const THUMBNAIL_LENGTH: u16 = 0x0202;

/// `GPSVersionID`.
pub const GPS_VERSION_ID: u16 = 0x0000;
/// `GPSLatitudeRef`.
pub const GPS_LATITUDE_REF: u16 = 0x0001;
/// `GPSLatitude`.
pub const GPS_LATITUDE: u16 = 0x0002;
/// `GPSLongitudeRef`.
pub const GPS_LONGITUDE_REF: u16 = 0x0003;
/// `GPSLongitude`.
pub const GPS_LONGITUDE: u16 = 0x0004;
