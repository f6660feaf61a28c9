// tests/integration/rewrite_scenarios.rs
use std::fs;

use min_ini::{DomainError, IniConfig, IniError, IniFile, MemoryStorage};

#[path = "../common/mod.rs"]
mod common;
use common::IniWorkspace;

const TWO_SECTIONS: &str = "[a]\nx = 1\n[b]\ny=2\n";

#[cfg(unix)]
fn inode(path: &std::path::Path) -> u64 {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(path).unwrap().ino()
}

#[test]
fn same_length_value_is_patched_in_place() {
    let ws = IniWorkspace::with_contents(TWO_SECTIONS);
    #[cfg(unix)]
    let before = inode(ws.path());

    ws.ini().put_string(Some("a"), "x", "7").unwrap();

    assert_eq!(ws.read(), "[a]\nx = 7\n[b]\ny=2\n");
    #[cfg(unix)]
    assert_eq!(inode(ws.path()), before);
}

#[test]
fn longer_value_replaces_the_file() {
    let ws = IniWorkspace::with_contents(TWO_SECTIONS);
    #[cfg(unix)]
    let before = inode(ws.path());

    ws.ini().put_string(Some("a"), "x", "9999999").unwrap();

    assert_eq!(ws.read(), "[a]\nx = 9999999\n[b]\ny=2\n");
    assert_eq!(ws.entries(), ["settings.ini"]);
    #[cfg(unix)]
    assert_ne!(inode(ws.path()), before);
}

#[test]
fn new_entry_in_missing_file() {
    let ws = IniWorkspace::new();
    ws.ini().put_string(Some("a"), "k", "v").unwrap();
    assert_eq!(ws.read(), "[a]\nk = v\n");
}

#[test]
fn new_entry_in_empty_file() {
    let ws = IniWorkspace::with_contents("");
    ws.ini().put_string(Some("a"), "k", "v").unwrap();
    assert_eq!(ws.read(), "[a]\nk = v\n");
}

#[test]
fn deleting_last_key_keeps_the_header() {
    let ws = IniWorkspace::with_contents(TWO_SECTIONS);
    let ini = ws.ini();

    ini.delete_key(Some("b"), "y").unwrap();

    assert_eq!(ws.read(), "[a]\nx = 1\n[b]\n");
    assert!(ini.has_section(Some("b")).unwrap());
    assert_eq!(ini.key_at(Some("b"), 0).unwrap(), None);
}

#[test]
fn deleting_a_section_removes_its_lines() {
    let ws = IniWorkspace::with_contents("[a]\nx = 1\n; about b\n[b]\ny=2\nz=3\n[c]\nw=4\n");
    ws.ini().delete_section(Some("B")).unwrap();
    assert_eq!(ws.read(), "[a]\nx = 1\n; about b\n[c]\nw=4\n");
}

#[test]
fn deleting_absent_things_is_a_no_op() {
    let ws = IniWorkspace::with_contents(TWO_SECTIONS);
    let ini = ws.ini();

    ini.delete_key(Some("a"), "nope").unwrap();
    ini.delete_key(Some("zz"), "x").unwrap();
    ini.delete_section(Some("zz")).unwrap();

    assert_eq!(ws.read(), TWO_SECTIONS);
    assert_eq!(ws.entries(), ["settings.ini"]);
}

#[test]
fn deleting_from_missing_file_creates_nothing() {
    let ws = IniWorkspace::new();
    ws.ini().delete_key(Some("a"), "x").unwrap();
    ws.ini().delete_section(Some("a")).unwrap();
    assert!(ws.entries().is_empty());
}

#[test]
fn special_values_are_quoted_and_read_back() {
    let ws = IniWorkspace::with_contents("[a]\n");
    let ini = ws.ini();

    for value in ["semi;colon", "hash#tag", "trailing  ", "  leading", "say \"hi\""] {
        ini.put_string(Some("a"), "v", value).unwrap();
        assert_eq!(ini.get(Some("a"), "v").unwrap().as_deref(), Some(value), "value {value:?}");
    }
    assert_eq!(ws.read(), "[a]\nv = \"say \\\"hi\\\"\"\n");
}

#[test]
fn keys_are_added_where_they_belong() {
    let ws = IniWorkspace::with_contents("top=1\n[a]\nx=1\n[b]\ny=2");
    let ini = ws.ini();

    ini.put_string(None, "g", "0").unwrap();
    ini.put_string(Some("a"), "n", "5").unwrap();
    ini.put_string(Some("b"), "m", "6").unwrap();
    ini.put_string(Some("c"), "k", "7").unwrap();

    assert_eq!(ws.read(), "top=1\ng = 0\n[a]\nx=1\nn = 5\n[b]\ny=2\nm = 6\n[c]\nk = 7\n");
}

#[test]
fn crlf_files_stay_crlf() {
    let ws = IniWorkspace::with_contents("[a]\r\nx=1\r\n");
    let config = IniConfig::builder().line_terminator("\r\n").build().unwrap();
    let ini = ws.ini_with(config);

    ini.put_string(Some("a"), "x", "22").unwrap();
    ini.put_string(Some("b"), "y", "3").unwrap();

    assert_eq!(ws.read(), "[a]\r\nx = 22\r\n[b]\r\ny = 3\r\n");
    assert_eq!(ini.get(Some("a"), "x").unwrap().as_deref(), Some("22"));
}

#[test]
fn large_file_is_copied_through_a_small_buffer() {
    let mut contents = String::new();
    for section in 0..20 {
        contents.push_str(&format!("[s{section}]\n"));
        for key in 0..10 {
            contents.push_str(&format!("k{key} = section {section} key {key}\n"));
        }
    }
    let ws = IniWorkspace::with_contents(&contents);
    let config = IniConfig::builder().buffer_capacity(40usize).build().unwrap();
    let ini = ws.ini_with(config);

    ini.put_string(Some("s10"), "k5", "changed value").unwrap();

    let expected = contents.replace("k5 = section 10 key 5\n", "k5 = changed value\n");
    assert_eq!(ws.read(), expected);
    assert_eq!(ini.get(Some("s19"), "k9").unwrap().as_deref(), Some("section 19 key 9"));
}

#[test]
fn read_only_handle_refuses_writes() {
    let ws = IniWorkspace::with_contents(TWO_SECTIONS);
    let config = IniConfig::builder().read_only(true).build().unwrap();
    let ini = ws.ini_with(config);

    let err = ini.put_string(Some("a"), "x", "2").unwrap_err();
    assert!(matches!(err, IniError::Domain(DomainError::ReadOnly { .. })));
    assert_eq!(ini.get(Some("a"), "x").unwrap().as_deref(), Some("1"));
    assert_eq!(ws.read(), TWO_SECTIONS);
}

#[test]
fn failed_rewrite_leaves_original_and_no_temp_file() {
    let storage = MemoryStorage::new();
    storage.insert("cfg.ini", TWO_SECTIONS);
    storage.fail_writes_to("cfg.in~");
    let ini = IniFile::new("cfg.ini", storage.clone());

    assert!(ini.put_string(Some("a"), "x", "longer value").is_err());
    assert!(ini.delete_section(Some("b")).is_err());

    assert_eq!(storage.contents("cfg.ini".as_ref()).unwrap(), TWO_SECTIONS.as_bytes());
    assert_eq!(storage.paths(), [std::path::PathBuf::from("cfg.ini")]);
}

#[test]
fn temp_file_that_cannot_be_created_aborts_the_write() {
    let storage = MemoryStorage::new();
    storage.insert("cfg.ini", TWO_SECTIONS);
    storage.fail_opens_for("cfg.in~");
    let ini = IniFile::new("cfg.ini", storage.clone());

    assert!(ini.put_string(Some("a"), "new", "1").is_err());
    assert_eq!(storage.contents("cfg.ini".as_ref()).unwrap(), TWO_SECTIONS.as_bytes());
}

#[test]
fn leftover_lock_file_does_not_block_later_writes() {
    let ws = IniWorkspace::with_contents(TWO_SECTIONS);
    let ini = ws.ini();
    ini.put_string(Some("a"), "x", "first").unwrap();
    ini.put_string(Some("a"), "x", "second").unwrap();
    assert_eq!(ini.get(Some("a"), "x").unwrap().as_deref(), Some("second"));
    assert!(ws.dir().join("settings.ini.lock").exists());
}
