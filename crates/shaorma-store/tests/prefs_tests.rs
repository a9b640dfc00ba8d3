use std::collections::BTreeSet;

use shaorma::VendorKey;
use shaorma_store::{CacheStore, DEFAULT_USER_NAME, PROFILE_IMAGE_FILE, PreferenceStore};

fn create_prefs() -> PreferenceStore {
    PreferenceStore::open_in_memory().unwrap()
}

#[test]
fn favorites_start_empty() {
    let prefs = create_prefs();
    assert!(prefs.favorites().unwrap().is_empty());
    assert!(!prefs.is_favorite(&VendorKey::new("a")).unwrap());
}

#[test]
fn toggle_twice_restores_membership() {
    let prefs = create_prefs();
    prefs.add_favorite(&VendorKey::new("keep")).unwrap();
    let original = prefs.favorites().unwrap();

    let key = VendorKey::new("-Nabc");
    assert!(prefs.toggle_favorite(&key).unwrap());
    assert!(prefs.is_favorite(&key).unwrap());
    assert!(!prefs.toggle_favorite(&key).unwrap());

    assert_eq!(prefs.favorites().unwrap(), original);
}

#[test]
fn adding_twice_keeps_one_entry() {
    let prefs = create_prefs();
    let key = VendorKey::new("a");
    prefs.add_favorite(&key).unwrap();
    prefs.add_favorite(&key).unwrap();
    assert_eq!(prefs.favorites().unwrap(), BTreeSet::from([key]));
}

#[test]
fn favorites_survive_cache_clear_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let prefs_path = dir.path().join("preferences.db");
    let cache_path = dir.path().join("cache.db");
    let key = VendorKey::new("-Nabc");

    {
        let prefs = PreferenceStore::open(&prefs_path).unwrap();
        prefs.add_favorite(&key).unwrap();
        prefs.set_user_name("Ana").unwrap();
        let cache = CacheStore::open(&cache_path).unwrap();
        cache.clear_vendors().unwrap();
    }

    let prefs = PreferenceStore::open(&prefs_path).unwrap();
    assert!(prefs.is_favorite(&key).unwrap());
    assert_eq!(prefs.user_name().unwrap(), "Ana");
}

#[test]
fn profile_defaults_to_guest() {
    let prefs = create_prefs();
    let profile = prefs.profile().unwrap();
    assert_eq!(profile.name, DEFAULT_USER_NAME);
    assert!(profile.image_path.is_none());
}

#[test]
fn user_name_is_trimmed() {
    let prefs = create_prefs();
    prefs.set_user_name("  Mihai  ").unwrap();
    assert_eq!(prefs.user_name().unwrap(), "Mihai");
}

#[test]
fn import_copies_image_into_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let picked = dir.path().join("IMG_0001.jpg");
    std::fs::write(&picked, b"jpeg bytes").unwrap();
    let data_dir = dir.path().join("data");

    let prefs = create_prefs();
    let stored = prefs.import_profile_image(&picked, &data_dir).unwrap();

    assert_eq!(stored, data_dir.join(PROFILE_IMAGE_FILE));
    assert_eq!(std::fs::read(&stored).unwrap(), b"jpeg bytes");
    assert_eq!(prefs.image_path().unwrap(), Some(stored));
}

#[test]
fn import_of_missing_file_fails_without_recording() {
    let dir = tempfile::tempdir().unwrap();
    let prefs = create_prefs();

    let result = prefs.import_profile_image(&dir.path().join("nope.jpg"), dir.path());

    assert!(result.is_err());
    assert!(prefs.image_path().unwrap().is_none());
}

#[test]
fn consent_lifecycle() {
    let prefs = create_prefs();
    assert!(!prefs.has_consent().unwrap());
    assert!(!prefs.has_asked_for_consent().unwrap());

    prefs.mark_consent_asked().unwrap();
    assert!(prefs.has_asked_for_consent().unwrap());
    assert!(!prefs.has_consent().unwrap());

    prefs.grant_consent(1_700_000_000_000).unwrap();
    assert!(prefs.has_consent().unwrap());
    assert_eq!(prefs.consent_timestamp().unwrap(), Some(1_700_000_000_000));

    prefs.revoke_consent().unwrap();
    assert!(!prefs.has_consent().unwrap());
    assert!(prefs.has_asked_for_consent().unwrap());

    prefs.reset_consent().unwrap();
    assert!(!prefs.has_asked_for_consent().unwrap());
    assert_eq!(prefs.consent_timestamp().unwrap(), None);
}
