//! Test helpers for preparing databases and JSON payloads on disk.

use super::*;
use camino::{Utf8Path, Utf8PathBuf};
use housing_core::Lot;
use housing_data::test_support::sample_lot;
use cap_std::{ambient_authority, fs_utf8};
use tempfile::TempDir;

pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root =
            Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn database(&self) -> Utf8PathBuf {
        self.root.join("housing.db")
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    /// Write a published Moscow flat with two rooms and return its path.
    pub(super) fn write_moscow_lot(&self) -> Utf8PathBuf {
        let mut lot = sample_lot(37.6, 55.7, &[15, 10]);
        lot.is_constructor = false;
        self.write_lot("lot.json", &lot)
    }

    pub(super) fn write_lot(&self, name: &str, lot: &Lot) -> Utf8PathBuf {
        let path = self.path(name);
        write_utf8(
            &path,
            serde_json::to_string(lot).expect("encode lot").as_bytes(),
        );
        path
    }
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    let parent = path.parent().expect("fixture paths have a parent");
    let name = path.file_name().expect("fixture paths have a file name");
    fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())
        .expect("open fixture directory")
        .write(name, contents)
        .expect("write fixture");
}

/// Parse `args` as a `housing` invocation and run it, capturing stdout.
pub(super) fn invoke(args: &[&str]) -> Result<String, CliError> {
    let mut invocation = vec!["housing"];
    invocation.extend_from_slice(args);
    let cli = Cli::try_parse_from(invocation)?;
    let mut output = Vec::new();
    run_command(cli.command, &mut output)?;
    Ok(String::from_utf8(output).expect("utf-8 output"))
}
