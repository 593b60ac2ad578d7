//! Built-in format providers.

pub mod common;
pub mod compression;
pub mod compressor;
pub mod sevenz;
pub mod tar;
pub mod zip;

pub use compressor::CompressorProvider;
pub use sevenz::SevenZProvider;
pub use tar::TarProvider;
pub use zip::ZipProvider;
