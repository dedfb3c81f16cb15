//! JSON input and output for command payloads.

use std::io::{BufReader, Write};

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8};
use serde::{Serialize, de::DeserializeOwned};

use crate::CliError;

/// Decode a JSON document from `path`.
///
/// Relative paths resolve against the working directory.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Utf8Path) -> Result<T, CliError> {
    let file = fs_utf8::File::open_ambient(path, ambient_authority()).map_err(|source| {
        CliError::OpenInput {
            path: path.to_path_buf(),
            source,
        }
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| CliError::ParseInput {
        path: path.to_path_buf(),
        source,
    })
}

/// Pretty-print `value` followed by a newline.
pub(crate) fn write_json<T: Serialize>(writer: &mut dyn Write, value: &T) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerialiseOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)
}
