//! Browse, mutate and verify archives across formats through one entry model.
//!
//! `polyarc-core` puts zip, the tar family, 7z and single-stream compressors
//! (`gz`, `bz2`, `xz`, `zst`) behind a common provider contract. Listings come
//! back as a flattened, level-annotated tree with every ancestor folder
//! present; add and delete rebuild the archive in a scratch directory and
//! swap it in only once the successor is complete; every operation reports
//! progress and failures as events and always ends with a `Completed` event.
//!
//! # Examples
//!
//! ```no_run
//! use polyarc_core::events::{self, Session, SessionId};
//! use polyarc_core::{ArchiveDescriptor, Registry, RegistryConfig, StagingOptions, api, staging};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Registry::with_default_providers(RegistryConfig::default())?;
//! let (sink, receiver) = events::channel();
//! let session = Session::new(SessionId::new(1), &sink);
//!
//! let descriptor = ArchiveDescriptor::new("backup.tzst");
//! let entries = staging::stage(&["./notes"], &StagingOptions::default())?;
//! if api::create(&registry, &session, &descriptor, &entries) {
//!     for entry in api::list(&registry, &session, &descriptor) {
//!         println!("{:>2} {}", entry.level(), entry.path());
//!     }
//! }
//! for event in receiver.try_iter().filter_map(|e| e.as_error().cloned()) {
//!     eprintln!("{}: {}", event.title, event.body);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod descriptor;
pub mod entry;
pub mod error;
pub mod events;
pub mod formats;
pub mod migration;
pub mod mutation;
pub mod provider;
pub mod registry;
pub mod staging;
pub mod test_utils;
pub mod tree;

pub use config::DescriptorDefaults;
pub use config::RegistryConfig;
pub use config::StagingOptions;
pub use descriptor::ArchiveDescriptor;
pub use descriptor::CompressionMethod;
pub use descriptor::EncryptionMethod;
pub use descriptor::EncryptionStrength;
pub use descriptor::Password;
pub use entry::ArchiveEntry;
pub use error::ArchiveError;
pub use error::Result;
pub use events::ArchiveEvent;
pub use events::EventSink;
pub use events::Session;
pub use events::SessionId;
pub use migration::MigrationGuard;
pub use migration::MigrationKind;
pub use provider::ArchiveReader;
pub use provider::ArchiveWriter;
pub use provider::Capability;
pub use provider::FormatProvider;
pub use registry::Registry;
