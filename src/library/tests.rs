use super::*;
use crate::config::LibrarySettings;
use crate::error::PlaybackError;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[test]
fn is_audio_file_matches_configured_extensions_case_insensitive() {
    let settings = LibrarySettings::default();
    assert!(is_audio_file(Path::new("/tmp/a.mp3"), &settings));
    assert!(is_audio_file(Path::new("/tmp/a.MP3"), &settings));
    assert!(is_audio_file(Path::new("/tmp/a.wav"), &settings));
    assert!(!is_audio_file(Path::new("/tmp/a.flac"), &settings));
    assert!(!is_audio_file(Path::new("/tmp/a.txt"), &settings));
    assert!(!is_audio_file(Path::new("/tmp/a"), &settings));

    let settings = LibrarySettings {
        extensions: vec![".FLAC".into()],
        ..LibrarySettings::default()
    };
    assert!(is_audio_file(Path::new("/tmp/a.flac"), &settings));
}

#[test]
fn display_name_strips_variant_suffix() {
    assert_eq!(display_name("Song", None), "Song");
    assert_eq!(display_name("Song_Dreamy", Some("_Dreamy")), "Song (dreamy)");
    assert_eq!(display_name("Song", Some("_Dreamy")), "Song");
}

#[test]
fn variant_marker_comes_from_the_suffix() {
    assert_eq!(display_name("Song_alt", Some("_alt")), "Song (alt)");
    assert_eq!(display_name("Song - Live", Some(" - Live")), "Song (live)");
    assert_eq!(display_name("Song_", Some("_")), "Song");
}

#[test]
fn candidates_lists_sorted_audio_siblings_only() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("c.wav"), b"x").unwrap();
    fs::write(dir.path().join("a.mp3"), b"x").unwrap();
    fs::write(dir.path().join("b.MP3"), b"x").unwrap();
    fs::write(dir.path().join("notes.txt"), b"x").unwrap();
    fs::write(dir.path().join(".hidden.mp3"), b"x").unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir_all(&sub).unwrap();
    fs::write(sub.join("nested.mp3"), b"x").unwrap();

    let names: Vec<String> = candidates(dir.path(), &LibrarySettings::default())
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.mp3", "b.MP3", "c.wav"]);

    let with_hidden = LibrarySettings {
        include_hidden: true,
        ..LibrarySettings::default()
    };
    assert_eq!(candidates(dir.path(), &with_hidden).len(), 4);
}

#[test]
fn track_open_validates_and_flags_variants() {
    let dir = tempdir().unwrap();
    let settings = LibrarySettings::default();

    let plain = dir.path().join("Song.mp3");
    fs::write(&plain, b"x").unwrap();
    let track = Track::open(&plain, &settings).unwrap();
    assert!(!track.variant);
    assert_eq!(track.display, "Song");
    assert_eq!(track.directory(), Some(dir.path().canonicalize().unwrap().as_path()));

    let dreamy = dir.path().join("Song_Dreamy.mp3");
    fs::write(&dreamy, b"x").unwrap();
    let track = Track::open(&dreamy, &settings).unwrap();
    assert!(track.variant);
    assert_eq!(track.display, "Song (dreamy)");

    let text = dir.path().join("notes.txt");
    fs::write(&text, b"x").unwrap();
    assert!(matches!(
        Track::open(&text, &settings),
        Err(PlaybackError::UnsupportedFile(_))
    ));
    assert!(matches!(
        Track::open(dir.path().join("gone.mp3"), &settings),
        Err(PlaybackError::MissingFile(_))
    ));
}
