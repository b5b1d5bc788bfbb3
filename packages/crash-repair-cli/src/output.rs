use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Serialize `value` as JSON to stdout, or to `dest` when given.
///
/// File output goes through a sibling `.part` file that is renamed into
/// place, so a reader never sees a half-written report or batch summary.
/// Missing parent directories of `dest` are created.
pub fn emit<T: Serialize>(value: &T, compact: bool, dest: Option<&Path>) -> Result<(), String> {
    match dest {
        Some(path) => write_file(value, compact, path),
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            write_json(&mut handle, value, compact)
                .map_err(|e| format!("Failed to write to stdout: {}", e))
        }
    }
}

fn write_file<T: Serialize>(value: &T, compact: bool, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create '{}': {}", parent.display(), e))?;
    }

    let partial = partial_path(path);
    let result = File::create(&partial)
        .map_err(|e| e.to_string())
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            write_json(&mut writer, value, compact)?;
            writer.flush().map_err(|e| e.to_string())
        })
        .and_then(|()| fs::rename(&partial, path).map_err(|e| e.to_string()));

    result.map_err(|e| {
        let _ = fs::remove_file(&partial);
        format!("Failed to write output file '{}': {}", path.display(), e)
    })
}

fn write_json<W: Write, T: Serialize>(writer: &mut W, value: &T, compact: bool) -> Result<(), String> {
    let serialized = if compact {
        serde_json::to_writer(&mut *writer, value)
    } else {
        serde_json::to_writer_pretty(&mut *writer, value)
    };
    serialized.map_err(|e| format!("JSON serialization failed: {}", e))?;
    writer.write_all(b"\n").map_err(|e| e.to_string())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}
