//! Script sources served out of the game data archive.
//!
//! The scripting runtime itself lives outside this crate; hosts resolve
//! `require`-style module names here and hand the bytes to their interpreter.

use std::path::{Path, PathBuf};

use crate::archive::{self, ArchiveResult, ReloadWatcher};

pub const GAME_DATA: &str = "sausages.arc";
pub const ENTRY_CLIENT: &str = "client.lua";
pub const ENTRY_SERVER: &str = "server.lua";
pub const MODULE_SUFFIX: &str = ".lua";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

impl Role {
    pub fn entry_script(self) -> &'static str {
        match self {
            Role::Client => ENTRY_CLIENT,
            Role::Server => ENTRY_SERVER,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModuleLoader {
    archive: PathBuf,
}

impl Default for ModuleLoader {
    fn default() -> Self {
        Self::new(GAME_DATA)
    }
}

impl ModuleLoader {
    pub fn new<P: AsRef<Path>>(archive: P) -> Self {
        Self {
            archive: archive.as_ref().to_path_buf(),
        }
    }

    pub fn module_file(name: &str) -> String {
        format!("{name}{MODULE_SUFFIX}")
    }

    /// Loads module `name` (stored as `<name>.lua`).
    pub fn load_module(&self, name: &str) -> ArchiveResult<Vec<u8>> {
        archive::read_entry(&self.archive, &Self::module_file(name))
    }

    pub fn load_entry(&self, role: Role) -> ArchiveResult<Vec<u8>> {
        archive::read_entry(&self.archive, role.entry_script())
    }

    pub fn watcher(&self) -> ReloadWatcher {
        ReloadWatcher::new(&self.archive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveError;
    use std::fs;

    #[test]
    fn test_module_file_name() {
        assert_eq!(ModuleLoader::module_file("ui"), "ui.lua");
        assert_eq!(Role::Server.entry_script(), "server.lua");
    }

    #[test]
    fn test_loads_modules_from_archive() {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("client.lua");
        let module = dir.path().join("menu.lua");
        fs::write(&entry, "require('menu')").unwrap();
        fs::write(&module, "return {}").unwrap();

        let data = dir.path().join(GAME_DATA);
        archive::create(&data, &[&entry, &module]).unwrap();

        let loader = ModuleLoader::new(&data);
        assert_eq!(loader.load_entry(Role::Client).unwrap(), b"require('menu')");
        assert_eq!(loader.load_module("menu").unwrap(), b"return {}");
        assert!(matches!(
            loader.load_module("missing"),
            Err(ArchiveError::NoEntry { .. })
        ));
        assert!(matches!(
            loader.load_entry(Role::Server),
            Err(ArchiveError::NoEntry { .. })
        ));
    }
}
