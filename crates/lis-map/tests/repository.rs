use std::fs;
use std::time::{Duration, SystemTime};

use lis_map::{MappingError, ProfileRepository, TestAliasTable};
use lis_model::{Profile, TestDefinition};
use tempfile::TempDir;

fn sample_profile(id: &str) -> Profile {
    let mut profile = Profile::new(id).with_description("sample hospital");
    profile
        .column_mapping
        .insert("test_value", "检验结果".to_string());
    profile
        .test_mapping
        .insert("CEA", TestDefinition::new(["CEA", "癌胚抗原"]).with_unit("ng/mL"));
    profile
}

fn set_modified(path: &std::path::Path, offset_secs: u64) {
    let file = fs::File::options().write(true).open(path).expect("open profile");
    let time = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + offset_secs);
    file.set_modified(time).expect("set mtime");
}

#[test]
fn repository_save_and_load() {
    let dir = TempDir::new().unwrap();
    let repo = ProfileRepository::new(dir.path()).expect("create repo");

    let path = repo.save(&sample_profile("hospital_a")).expect("save profile");
    assert!(path.ends_with("hospital_a.yaml"));

    let loaded = repo.load("hospital_a").expect("load profile");
    assert_eq!(loaded.id, "hospital_a");
    assert_eq!(loaded.description, "sample hospital");
    assert!(loaded.created_at.is_some());
    assert_eq!(loaded.selected_tests(), vec!["CEA"]);

    let table = TestAliasTable::from_profile(&loaded);
    assert_eq!(table.standardize("癌胚抗原"), "CEA");
    assert_eq!(table.get_unit("CEA"), Some("ng/mL"));
}

#[test]
fn save_keeps_existing_created_at() {
    let dir = TempDir::new().unwrap();
    let repo = ProfileRepository::new(dir.path()).unwrap();

    let mut profile = sample_profile("stamped");
    profile.created_at = Some("2023-05-01 10:00:00".to_string());
    repo.save(&profile).unwrap();

    let loaded = repo.load("stamped").unwrap();
    assert_eq!(loaded.created_at.as_deref(), Some("2023-05-01 10:00:00"));
}

#[test]
fn ids_are_sanitized_into_file_names() {
    let dir = TempDir::new().unwrap();
    let repo = ProfileRepository::new(dir.path()).unwrap();

    let path = repo.save(&sample_profile("Hospital B / v2")).unwrap();
    assert!(path.ends_with("HospitalBv2.yaml"));
    assert!(repo.exists("Hospital B / v2"));
    assert!(repo.exists("HospitalBv2"));
}

#[test]
fn unusable_id_is_rejected() {
    let dir = TempDir::new().unwrap();
    let repo = ProfileRepository::new(dir.path()).unwrap();

    let err = repo.save(&sample_profile("医院")).unwrap_err();
    assert!(matches!(err, MappingError::InvalidProfileId { .. }));
    assert!(!repo.exists("医院"));
}

#[test]
fn load_missing_profile() {
    let dir = TempDir::new().unwrap();
    let repo = ProfileRepository::new(dir.path()).unwrap();

    let err = repo.load("nope").unwrap_err();
    assert!(matches!(err, MappingError::ProfileNotFound { id } if id == "nope"));
}

#[test]
fn delete_profile() {
    let dir = TempDir::new().unwrap();
    let repo = ProfileRepository::new(dir.path()).unwrap();
    repo.save(&sample_profile("to_delete")).unwrap();

    assert!(repo.delete("to_delete").unwrap());
    assert!(!repo.exists("to_delete"));
    assert!(!repo.delete("to_delete").unwrap());
}

#[test]
fn list_sorts_newest_first_and_skips_broken_files() {
    let dir = TempDir::new().unwrap();
    let repo = ProfileRepository::new(dir.path()).unwrap();

    let older = repo.save(&sample_profile("older")).unwrap();
    let newer = repo.save(&sample_profile("newer")).unwrap();
    set_modified(&older, 0);
    set_modified(&newer, 60);
    fs::write(dir.path().join("broken.yaml"), "id: [unclosed").unwrap();
    fs::write(dir.path().join("notes.txt"), "not a profile").unwrap();

    let listed = repo.list().unwrap();
    let ids: Vec<&str> = listed.iter().map(|meta| meta.id.as_str()).collect();
    assert_eq!(ids, ["newer", "older"]);
    assert_eq!(listed[0].test_count, 1);
    assert_eq!(listed[0].name, "newer");
}

#[test]
fn bundled_example_profile_loads() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../profiles/example_hospital_lis.yaml");
    let profile = lis_map::read_profile(&path).expect("read bundled profile");

    assert_eq!(profile.id, "example_hospital_lis");
    assert_eq!(profile.selected_tests(), vec!["CEA", "AFP", "WBC"]);
    assert!(lis_map::ColumnMapper::from_profile(&profile).validate().is_empty());

    let table = TestAliasTable::from_profile(&profile);
    assert!(table.collisions().is_empty());
    assert_eq!(table.standardize("白细胞计数"), "WBC");
}
