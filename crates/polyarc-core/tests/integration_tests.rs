//! Integration tests for polyarc-core.
//!
//! These tests drive providers through the registry against real files in a
//! temporary directory.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use polyarc_core::events::{self, ArchiveEvent, ErrorKind, NoopSink, Phase};
use polyarc_core::formats::compression::CompressionCodec;
use polyarc_core::test_utils::{TarTestBuilder, ZipTestBuilder, write_fixture};
use polyarc_core::{
    ArchiveDescriptor, ArchiveEntry, ArchiveWriter, Capability, FormatProvider, Registry,
    RegistryConfig, Session, SessionId, StagingOptions, api, staging,
};
use tempfile::TempDir;
use zip::ZipArchive;

fn registry() -> Registry {
    Registry::with_default_providers(RegistryConfig::default()).unwrap()
}

fn paths(entries: &[ArchiveEntry]) -> Vec<String> {
    entries.iter().map(|e| e.path().to_string()).collect()
}

/// Raw compressed bytes of every member, keyed by name.
fn raw_members(path: &Path) -> Vec<(String, Vec<u8>)> {
    let mut archive = ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index_raw(i).unwrap();
            let mut bytes = Vec::new();
            std::io::Read::read_to_end(&mut file, &mut bytes).unwrap();
            (file.name().to_string(), bytes)
        })
        .collect()
}

#[test]
fn test_delete_then_list_keeps_untouched_entries_identical() {
    let temp = TempDir::new().unwrap();
    let descriptor = write_fixture(
        temp.path(),
        "site.zip",
        &ZipTestBuilder::new()
            .add_file("index.html", b"<html>")
            .add_file("assets/app.js", b"console.log(1)")
            .add_file("assets/img/logo.svg", b"<svg/>")
            .add_file("README", b"read me")
            .build(),
    );
    let registry = registry();
    let sink = NoopSink;
    let session = Session::new(SessionId::new(1), &sink);

    let before = api::list(&registry, &session, &descriptor);
    let raw_before = raw_members(descriptor.path());

    assert!(api::delete(&registry, &session, &descriptor, &ArchiveEntry::folder("assets")));

    let after = api::list(&registry, &session, &descriptor);
    let expected: Vec<String> = paths(&before)
        .into_iter()
        .filter(|p| p != "assets" && !p.starts_with("assets/"))
        .collect();
    assert_eq!(paths(&after), expected);

    let raw_after = raw_members(descriptor.path());
    let kept: Vec<_> = raw_before
        .into_iter()
        .filter(|(name, _)| !name.starts_with("assets/"))
        .collect();
    assert_eq!(raw_after, kept);
}

#[test]
fn test_add_then_list_is_union() {
    let temp = TempDir::new().unwrap();
    let descriptor = write_fixture(
        temp.path(),
        "docs.tgz",
        &TarTestBuilder::new()
            .add_directory("docs/")
            .add_file("docs/a.md", b"a")
            .build_compressed(CompressionCodec::Gzip),
    );
    let incoming = temp.path().join("incoming");
    fs::create_dir_all(incoming.join("img")).unwrap();
    fs::write(incoming.join("img/b.png"), b"png").unwrap();
    let registry = registry();
    let sink = NoopSink;
    let session = Session::new(SessionId::new(2), &sink);

    let before = api::list(&registry, &session, &descriptor);
    let staged = staging::stage(&[&incoming], &StagingOptions::default().with_prefix("docs")).unwrap();
    assert!(api::add(&registry, &session, &descriptor, &staged));

    let after = api::list(&registry, &session, &descriptor);
    for entry in &before {
        let same = after.iter().find(|e| e.path() == entry.path()).unwrap();
        assert_eq!(same.raw_size(), entry.raw_size());
        assert_eq!(same.is_folder(), entry.is_folder());
    }
    for entry in &staged {
        assert!(after.iter().any(|e| e.path() == entry.path()), "{}", entry.path());
    }
    assert_eq!(after.len(), before.len() + staged.len());
    assert!(api::test(&registry, &session, &descriptor));
}

#[test]
fn test_failed_rewrite_leaves_original_untouched() {
    let temp = TempDir::new().unwrap();
    let descriptor = write_fixture(
        temp.path(),
        "keep.zip",
        &ZipTestBuilder::new().add_file("a.txt", b"a").build(),
    );
    let original = fs::read(descriptor.path()).unwrap();
    let not_a_file = temp.path().join("a-directory");
    fs::create_dir(&not_a_file).unwrap();
    let registry = registry();
    let (sink, receiver) = events::channel();
    let session = Session::new(SessionId::new(3), &sink);

    let ok = api::add(
        &registry,
        &session,
        &descriptor,
        &[ArchiveEntry::staged("b.txt", &not_a_file)],
    );
    assert!(!ok);
    assert_eq!(fs::read(descriptor.path()).unwrap(), original);

    let leftovers: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(".polyarc-"))
        .collect();
    assert!(leftovers.is_empty(), "scratch left behind: {leftovers:?}");

    let received: Vec<ArchiveEvent> = receiver.try_iter().collect();
    let error = received.iter().find_map(ArchiveEvent::as_error).unwrap();
    assert_eq!(error.kind, ErrorKind::Mutation);
}

#[test]
fn test_delete_missing_entry_fails_without_touching_archive() {
    let temp = TempDir::new().unwrap();
    let descriptor = write_fixture(
        temp.path(),
        "t.tar",
        &TarTestBuilder::new().add_file("a.txt", b"a").build(),
    );
    let original = fs::read(descriptor.path()).unwrap();
    let sink = NoopSink;
    let session = Session::new(SessionId::new(4), &sink);

    assert!(!api::delete(&registry(), &session, &descriptor, &ArchiveEntry::file("nope.txt")));
    assert_eq!(fs::read(descriptor.path()).unwrap(), original);
}

#[test]
fn test_test_passes_empty_and_fails_on_corrupted_checksum() {
    let temp = TempDir::new().unwrap();
    let registry = registry();
    let sink = NoopSink;
    let session = Session::new(SessionId::new(5), &sink);

    let empty = write_fixture(temp.path(), "empty.zip", &ZipTestBuilder::new().build());
    assert!(api::test(&registry, &session, &empty));

    let bytes = ZipTestBuilder::new()
        .add_file("one.txt", b"first payload")
        .add_file("two.txt", b"second payload")
        .build();
    let good = write_fixture(temp.path(), "good.zip", &bytes);
    assert!(api::test(&registry, &session, &good));

    // CRC-32 field of the first central directory record.
    let central = bytes.windows(4).position(|w| w == b"PK\x01\x02").unwrap();
    let mut corrupted = bytes;
    corrupted[central + 16] ^= 0xff;
    let bad = write_fixture(temp.path(), "bad.zip", &corrupted);
    assert!(!api::test(&registry, &session, &bad));
}

#[test]
fn test_compressor_create_writes_magic() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("payload.log");
    fs::write(&source, b"line\n".repeat(64)).unwrap();
    let registry = registry();
    let sink = NoopSink;
    let session = Session::new(SessionId::new(6), &sink);

    for codec in CompressionCodec::ALL {
        let descriptor = ArchiveDescriptor::new(temp.path().join(format!("payload.log.{}", codec.suffix())));
        assert!(api::create(
            &registry,
            &session,
            &descriptor,
            &[ArchiveEntry::staged("payload.log", &source)],
        ));
        let bytes = fs::read(descriptor.path()).unwrap();
        assert!(bytes.starts_with(codec.magic()), "{}", codec.name());

        let listed = api::list(&registry, &session, &descriptor);
        assert_eq!(paths(&listed), vec!["payload.log"]);
        assert!(listed[0].is_nested_archive());
    }
}

#[test]
fn test_hardlink_extracts_as_copy() {
    let temp = TempDir::new().unwrap();
    let descriptor = write_fixture(
        temp.path(),
        "links.tar",
        &TarTestBuilder::new()
            .add_file("pkg/original.txt", b"shared")
            .add_hardlink("pkg/alias.txt", "pkg/original.txt")
            .build(),
    );
    let sink = NoopSink;
    let session = Session::new(SessionId::new(7), &sink);
    let dest = temp.path().join("out");

    assert!(api::extract(&registry(), &session, &dest, &descriptor, &ArchiveEntry::folder("pkg")));
    assert_eq!(fs::read(dest.join("alias.txt")).unwrap(), b"shared");
}

#[test]
fn test_traversal_entry_is_refused() {
    let temp = TempDir::new().unwrap();
    let descriptor = write_fixture(
        temp.path(),
        "evil.zip",
        &ZipTestBuilder::new()
            .add_file("safe/ok.txt", b"ok")
            .add_file("safe/../../escaped.txt", b"bad")
            .build(),
    );
    let sink = NoopSink;
    let session = Session::new(SessionId::new(8), &sink);
    let dest = temp.path().join("nested/out");

    assert!(!api::extract(&registry(), &session, &dest, &descriptor, &ArchiveEntry::folder("safe")));
    assert!(!temp.path().join("escaped.txt").exists());
    assert!(!temp.path().join("nested/escaped.txt").exists());
}

#[test]
fn test_every_operation_ends_with_one_completed() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("f.txt");
    fs::write(&source, b"f").unwrap();
    let descriptor = ArchiveDescriptor::new(temp.path().join("ops.zip"));
    let broken = write_fixture(temp.path(), "broken.zip", b"not a zip at all");
    let registry = registry();
    let (sink, receiver) = events::channel();

    let mut id = 100;
    let mut next = || {
        id += 1;
        SessionId::new(id)
    };
    let runs: Vec<(SessionId, bool)> = vec![
        {
            let id = next();
            let session = Session::new(id, &sink);
            (id, api::create(&registry, &session, &descriptor, &[ArchiveEntry::staged("f.txt", &source)]))
        },
        {
            let id = next();
            let session = Session::new(id, &sink);
            (id, !api::list(&registry, &session, &descriptor).is_empty())
        },
        {
            let id = next();
            let session = Session::new(id, &sink);
            (id, api::test(&registry, &session, &broken))
        },
        {
            let id = next();
            let session = Session::new(id, &sink);
            let out = temp.path().join("x");
            (id, api::extract(&registry, &session, &out, &descriptor, &ArchiveEntry::file("missing")))
        },
        {
            let id = next();
            let session = Session::new(id, &sink);
            (id, api::delete(&registry, &session, &descriptor, &ArchiveEntry::file("f.txt")))
        },
    ];
    assert_eq!(
        runs.iter().map(|(_, ok)| *ok).collect::<Vec<_>>(),
        vec![true, true, false, false, true]
    );

    let received: Vec<ArchiveEvent> = receiver.try_iter().collect();
    for (id, _) in runs {
        let session_events: Vec<&ArchiveEvent> =
            received.iter().filter(|e| e.session_id() == id).collect();
        assert_eq!(session_events.iter().filter(|e| e.is_completed()).count(), 1);
        assert!(session_events.last().unwrap().is_completed());
        match session_events[0] {
            ArchiveEvent::Progress(p) => assert_eq!(p.phase, Phase::Started),
            ArchiveEvent::Error(_) => panic!("first event must be Started"),
        }
    }
}

#[test]
fn test_password_never_reaches_events_or_display() {
    let temp = TempDir::new().unwrap();
    let mut descriptor = ArchiveDescriptor::new(temp.path().join("absent.zip"));
    descriptor.properties_mut().set_password("hunter2");
    let (sink, receiver) = events::channel();
    let session = Session::new(SessionId::new(9), &sink);

    assert!(!api::test(&registry(), &session, &descriptor));

    assert!(!format!("{descriptor}").contains("hunter2"));
    assert!(!format!("{descriptor:?}").contains("hunter2"));
    for event in receiver.try_iter() {
        assert!(!format!("{event:?}").contains("hunter2"));
    }
}

/// Claims `zip` for writing with a configurable name.
#[derive(Debug)]
struct ClaimingWriter(&'static str);

impl ArchiveWriter for ClaimingWriter {
    fn extensions(&self) -> &[&'static str] {
        &["zip"]
    }

    fn create(&self, _: &Session<'_>, _: &ArchiveDescriptor, _: &[ArchiveEntry]) -> bool {
        true
    }

    fn add(&self, _: &Session<'_>, _: &ArchiveDescriptor, _: &[ArchiveEntry]) -> bool {
        true
    }

    fn delete(&self, _: &Session<'_>, _: &ArchiveDescriptor, _: &ArchiveEntry) -> bool {
        true
    }
}

impl FormatProvider for ClaimingWriter {
    fn name(&self) -> &'static str {
        self.0
    }

    fn reader(&self) -> Option<&dyn polyarc_core::ArchiveReader> {
        None
    }

    fn writer(&self) -> Option<&dyn ArchiveWriter> {
        Some(self)
    }
}

#[test]
fn test_higher_priority_write_provider_wins() {
    let config = RegistryConfig::new()
        .with_priority("low", "0")
        .with_priority("high", "1");
    let mut registry = Registry::new(config);
    registry.register(Arc::new(ClaimingWriter("low"))).unwrap();
    registry.register(Arc::new(ClaimingWriter("high"))).unwrap();

    let resolved = registry
        .resolve_path(Capability::Write, Path::new("test.zip"))
        .unwrap();
    assert_eq!(resolved.name(), "high");
}

#[test]
fn test_malformed_priority_keeps_builtin_zip() {
    let config = RegistryConfig::new().with_priority("intruder", "eleven");
    let mut registry = Registry::with_default_providers(config).unwrap();
    registry.register(Arc::new(ClaimingWriter("intruder"))).unwrap();

    let resolved = registry.resolve(Capability::Write, "zip").unwrap();
    assert_eq!(resolved.name(), "zip");
}
