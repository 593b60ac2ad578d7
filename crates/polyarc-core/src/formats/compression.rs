//! Stream codecs shared by the tar family and the compressor-only provider.
//!
//! # Supported Codecs
//!
//! - **Gzip** (`gz`, `tgz`): deflate with a CRC-32 and size trailer
//! - **Bzip2** (`bz2`, `tbz`, `tbz2`): per-block CRC
//! - **Xz** (`xz`, `txz`): LZMA2 with a CRC-64 check
//! - **Zstd** (`zst`, `tzst`): written with a content checksum
//!
//! Every decoder verifies the codec's own checksum, which is what `test`
//! relies on for these formats.
//!
//! # Level Mapping
//!
//! Descriptor levels run 0-9. Each codec maps them onto its own scale:
//! levels 1-3 favor speed, 6 is the balanced default, 7-9 favor size.

use std::io;
use std::io::Read;
use std::io::Write;

use bzip2::read::MultiBzDecoder;
use bzip2::write::BzEncoder;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

/// Stream compression codec.
///
/// # Examples
///
/// ```
/// use polyarc_core::formats::compression::CompressionCodec;
///
/// assert_eq!(CompressionCodec::from_extension("TGZ"), Some(CompressionCodec::Gzip));
/// assert_eq!(CompressionCodec::from_extension("tar"), None);
/// assert_eq!(CompressionCodec::Zstd.suffix(), "zst");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionCodec {
    /// Gzip (deflate).
    Gzip,
    /// Bzip2 (Burrows-Wheeler).
    Bzip2,
    /// Xz (LZMA2).
    Xz,
    /// Zstandard.
    Zstd,
}

impl CompressionCodec {
    /// All codecs.
    pub const ALL: [Self; 4] = [Self::Gzip, Self::Bzip2, Self::Xz, Self::Zstd];

    /// Codec implied by a file extension, for both compressor-only tags and
    /// compressed-tar shorthands.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "gz" | "tgz" => Some(Self::Gzip),
            "bz2" | "tbz" | "tbz2" => Some(Self::Bzip2),
            "xz" | "txz" => Some(Self::Xz),
            "zst" | "tzst" => Some(Self::Zstd),
            _ => None,
        }
    }

    /// Detects the codec from the first bytes of a stream.
    ///
    /// ```
    /// use polyarc_core::formats::compression::CompressionCodec;
    ///
    /// assert_eq!(CompressionCodec::detect(&[0x1f, 0x8b, 0x08]), Some(CompressionCodec::Gzip));
    /// assert_eq!(CompressionCodec::detect(b"PK\x03\x04"), None);
    /// ```
    #[must_use]
    pub fn detect(header: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|codec| header.starts_with(codec.magic()))
    }

    /// Compressor-only file suffix (without the dot).
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Gzip => "gz",
            Self::Bzip2 => "bz2",
            Self::Xz => "xz",
            Self::Zstd => "zst",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
        }
    }

    /// Magic bytes every stream of this codec starts with.
    #[must_use]
    pub const fn magic(self) -> &'static [u8] {
        match self {
            Self::Gzip => &[0x1f, 0x8b],
            Self::Bzip2 => b"BZh",
            Self::Xz => &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00],
            Self::Zstd => &[0x28, 0xb5, 0x2f, 0xfd],
        }
    }

    /// Wraps `writer` in a compressing encoder.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder cannot be initialized.
    pub fn encoder<W: Write>(self, writer: W, level: u8) -> io::Result<Encoder<W>> {
        Ok(match self {
            Self::Gzip => Encoder::Gzip(GzEncoder::new(writer, level_to_flate2(level))),
            Self::Bzip2 => Encoder::Bzip2(BzEncoder::new(writer, level_to_bzip2(level))),
            Self::Xz => Encoder::Xz(XzEncoder::new(writer, level_to_xz(level))),
            Self::Zstd => {
                let mut encoder = zstd::Encoder::new(writer, level_to_zstd(level))?;
                encoder.include_checksum(true)?;
                Encoder::Zstd(encoder)
            }
        })
    }

    /// Wraps `reader` in a verifying decoder.
    ///
    /// # Errors
    ///
    /// Returns an error if the decoder cannot be initialized.
    pub fn decoder<'r, R: Read + 'r>(self, reader: R) -> io::Result<Box<dyn Read + 'r>> {
        Ok(match self {
            Self::Gzip => Box::new(MultiGzDecoder::new(reader)),
            Self::Bzip2 => Box::new(MultiBzDecoder::new(reader)),
            Self::Xz => Box::new(XzDecoder::new_multi_decoder(reader)),
            Self::Zstd => Box::new(zstd::Decoder::new(reader)?),
        })
    }
}

/// Compressing writer; `Plain` passes bytes through for uncompressed tar.
pub enum Encoder<W: Write> {
    /// No compression.
    Plain(W),
    /// Gzip.
    Gzip(GzEncoder<W>),
    /// Bzip2.
    Bzip2(BzEncoder<W>),
    /// Xz.
    Xz(XzEncoder<W>),
    /// Zstandard.
    Zstd(zstd::Encoder<'static, W>),
}

impl<W: Write> Encoder<W> {
    /// Creates an encoder for `codec`, or a pass-through when it is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder cannot be initialized.
    pub fn for_codec(codec: Option<CompressionCodec>, writer: W, level: u8) -> io::Result<Self> {
        match codec {
            None => Ok(Self::Plain(writer)),
            Some(codec) => codec.encoder(writer, level),
        }
    }

    /// Writes the trailer and returns the inner writer.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing the trailer fails.
    pub fn finish(self) -> io::Result<W> {
        match self {
            Self::Plain(writer) => Ok(writer),
            Self::Gzip(encoder) => encoder.finish(),
            Self::Bzip2(encoder) => encoder.finish(),
            Self::Xz(encoder) => encoder.finish(),
            Self::Zstd(encoder) => encoder.finish(),
        }
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(buf),
            Self::Gzip(w) => w.write(buf),
            Self::Bzip2(w) => w.write(buf),
            Self::Xz(w) => w.write(buf),
            Self::Zstd(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            Self::Gzip(w) => w.flush(),
            Self::Bzip2(w) => w.flush(),
            Self::Xz(w) => w.flush(),
            Self::Zstd(w) => w.flush(),
        }
    }
}

/// Maps a 0-9 level onto flate2.
///
/// ```
/// use polyarc_core::formats::compression::level_to_flate2;
///
/// assert_eq!(level_to_flate2(6), flate2::Compression::default());
/// assert_eq!(level_to_flate2(9), flate2::Compression::best());
/// ```
#[must_use]
pub fn level_to_flate2(level: u8) -> flate2::Compression {
    match level {
        6 => flate2::Compression::default(),
        1..=3 => flate2::Compression::fast(),
        7..=9 => flate2::Compression::best(),
        n => flate2::Compression::new(u32::from(n.min(9))),
    }
}

/// Maps a 0-9 level onto bzip2, whose scale starts at 1.
#[must_use]
pub fn level_to_bzip2(level: u8) -> bzip2::Compression {
    match level {
        6 => bzip2::Compression::default(),
        0 | 1 => bzip2::Compression::fast(),
        7..=9 => bzip2::Compression::best(),
        n => bzip2::Compression::new(u32::from(n.min(9))),
    }
}

/// Maps a 0-9 level onto xz presets.
#[must_use]
pub fn level_to_xz(level: u8) -> u32 {
    u32::from(level.min(9))
}

/// Maps a 0-9 level onto zstd's 1-22 range.
///
/// ```
/// use polyarc_core::formats::compression::level_to_zstd;
///
/// assert_eq!(level_to_zstd(6), 3);
/// assert_eq!(level_to_zstd(9), 19);
/// ```
#[allow(clippy::match_same_arms)]
#[must_use]
pub fn level_to_zstd(level: u8) -> i32 {
    match level {
        0 | 1 => 1,
        2 => 2,
        7 => 10,
        8 => 15,
        9.. => 19,
        _ => 3,
    }
}
