use std::{
    fs,
    path::{Path, PathBuf},
};

use min_ini::{Ini, IniConfig};
use tempfile::TempDir;

/// Scratch directory holding one INI file under test.
#[derive(Debug)]
pub struct IniWorkspace {
    dir: TempDir,
    file: PathBuf,
}

#[allow(dead_code)]
impl IniWorkspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("Failed to create temp dir: {e}"));
        let file = dir.path().join("settings.ini");
        Self { dir, file }
    }

    pub fn with_contents(contents: &str) -> Self {
        let workspace = Self::new();
        workspace.write(contents);
        workspace
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, contents: &str) {
        fs::write(&self.file, contents)
            .unwrap_or_else(|e| panic!("Failed to write {}: {e}", self.file.display()));
    }

    pub fn read(&self) -> String {
        fs::read_to_string(&self.file).unwrap_or_else(|e| panic!("Failed to read {}: {e}", self.file.display()))
    }

    pub fn ini(&self) -> Ini {
        min_ini::open(&self.file)
    }

    pub fn ini_with(&self, config: IniConfig) -> Ini {
        min_ini::open_with(&self.file, config).unwrap_or_else(|e| panic!("Invalid config: {e}"))
    }

    /// Names of everything in the directory except the lock file.
    pub fn entries(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.dir.path())
            .unwrap_or_else(|e| panic!("Failed to list {}: {e}", self.dir.path().display()))
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| !name.ends_with(".lock"))
            .collect();
        names.sort();
        names
    }
}
