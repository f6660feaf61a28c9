// tests/integration/lookup_scenarios.rs
use std::ops::ControlFlow;

#[path = "../common/mod.rs"]
mod common;
use common::IniWorkspace;

const SAMPLE: &str = "\
; settings
title = \"Main Window\"

[Network]
host = example.org   ; primary host
port : 8080
  retries=3

[Paths]
root = \"C:\\data;backup\"
empty =
";

#[test]
fn values_are_cleaned_on_read() {
    let ws = IniWorkspace::with_contents(SAMPLE);
    let ini = ws.ini();

    assert_eq!(ini.get(None, "title").unwrap().as_deref(), Some("Main Window"));
    assert_eq!(ini.get(Some("network"), "HOST").unwrap().as_deref(), Some("example.org"));
    assert_eq!(ini.get(Some("Network"), "port").unwrap().as_deref(), Some("8080"));
    assert_eq!(ini.get(Some("Network"), "retries").unwrap().as_deref(), Some("3"));
    assert_eq!(ini.get(Some("Paths"), "root").unwrap().as_deref(), Some("C:\\data;backup"));
    assert_eq!(ini.get(Some("Paths"), "empty").unwrap().as_deref(), Some(""));
    assert_eq!(ini.get(Some("Paths"), "host").unwrap(), None);
}

#[test]
fn typed_values_parse_leniently() {
    let ws = IniWorkspace::with_contents(SAMPLE);
    let ini = ws.ini();

    assert_eq!(ini.get_i64(Some("Network"), "port", 0).unwrap(), 8080);
    assert_eq!(ini.get_u64(Some("Network"), "missing", 5).unwrap(), 5);
    assert!(!ini.get_bool(Some("Network"), "host", false).unwrap());
}

#[test]
fn sections_and_keys_enumerate_in_file_order() {
    let ws = IniWorkspace::with_contents(SAMPLE);
    let ini = ws.ini();

    let sections: Vec<String> = (0..).map_while(|i| ini.section_at(i).unwrap()).collect();
    assert_eq!(sections, ["Network", "Paths"]);

    let keys: Vec<String> = (0..).map_while(|i| ini.key_at(Some("Network"), i).unwrap()).collect();
    assert_eq!(keys, ["host", "port", "retries"]);

    assert_eq!(ini.key_at(None, 0).unwrap().as_deref(), Some("title"));
}

#[test]
fn browse_reports_every_pair() {
    let ws = IniWorkspace::with_contents(SAMPLE);
    let mut seen = Vec::new();
    let existed = ws
        .ini()
        .browse(|entry| {
            seen.push(format!("{}/{}={}", entry.section, entry.key, entry.value));
            ControlFlow::Continue(())
        })
        .unwrap();

    assert!(existed);
    assert_eq!(
        seen,
        [
            "/title=Main Window",
            "Network/host=example.org",
            "Network/port=8080",
            "Network/retries=3",
            "Paths/root=C:\\data;backup",
            "Paths/empty=",
        ]
    );
}

#[test]
fn presence_checks() {
    let ws = IniWorkspace::with_contents(SAMPLE);
    let ini = ws.ini();

    assert!(ini.has_section(Some("paths")).unwrap());
    assert!(!ini.has_section(Some("Missing")).unwrap());
    assert!(ini.has_key(Some("Paths"), "empty").unwrap());
    assert!(!ini.has_key(Some("Paths"), "port").unwrap());
}

#[test]
fn missing_file_behaves_as_empty() {
    let ws = IniWorkspace::new();
    let ini = ws.ini();

    assert_eq!(ini.get(Some("a"), "k").unwrap(), None);
    assert_eq!(ini.get_string(Some("a"), "k", "dflt").unwrap(), "dflt");
    assert_eq!(ini.section_at(0).unwrap(), None);
    assert!(!ini.browse(|_| ControlFlow::Continue(())).unwrap());
}
