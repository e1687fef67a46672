//! JSON file persistence for certificates and diffs.
//!
//! Writes go to a sibling temp file first and are renamed into place, so a
//! reader never observes a half-written certificate.

use crate::error::CasError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Pretty-printed JSON with two-space indentation.
pub fn to_json_pretty(value: &impl Serialize) -> Result<String, CasError> {
    serde_json::to_string_pretty(value).map_err(|e| CasError::Serialize(e.to_string()))
}

pub fn from_json_str<T: DeserializeOwned>(raw: &str) -> Result<T, CasError> {
    serde_json::from_str(raw).map_err(|e| CasError::Parse(e.to_string()))
}

pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, CasError> {
    let path = path.as_ref();
    let raw =
        fs::read_to_string(path).map_err(|e| CasError::Io(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&raw).map_err(|e| CasError::Parse(format!("{}: {e}", path.display())))
}

/// Write `value` as pretty JSON, creating parent directories as needed.
pub fn write_json(path: impl AsRef<Path>, value: &impl Serialize) -> Result<(), CasError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| CasError::Io(format!("{}: {e}", parent.display())))?;
    }

    let body = to_json_pretty(value)?;
    let tmp_path = tmp_write_path(path);
    let write_result = (|| -> Result<(), CasError> {
        let file = File::create(&tmp_path)
            .map_err(|e| CasError::Io(format!("{}: {e}", tmp_path.display())))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(body.as_bytes())
            .and_then(|()| writer.write_all(b"\n"))
            .and_then(|()| writer.flush())
            .map_err(|e| CasError::Io(format!("{}: {e}", tmp_path.display())))?;
        Ok(())
    })();

    if let Err(error) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        CasError::Io(format!(
            "{} -> {}: {e}",
            tmp_path.display(),
            path.display()
        ))
    })
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}
