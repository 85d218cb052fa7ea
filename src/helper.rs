use std::{fs, io::Write, path::Path};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use log::{debug, error, trace};
use tempfile::NamedTempFile;

use crate::{NotepadError, Result};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parses an RFC 3339 timestamp, or a naive date-time in the local time zone.
///
/// A naive value that falls on a daylight-saving overlap resolves to the
/// earlier instant; one inside a gap is rejected.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|local| local.with_timezone(&Utc))
                .ok_or_else(|| {
                    NotepadError::validation(format!(
                        "{:?} does not exist in the local time zone",
                        value
                    ))
                });
        }
    }

    Err(NotepadError::validation(format!(
        "Invalid date/time: {:?} (expected RFC 3339 or YYYY-MM-DDTHH:MM)",
        value
    )))
}

/// Generates a time-based id that `taken` does not already claim.
///
/// Ids are unix milliseconds; on collision the value is bumped forward
/// until it is free.
pub fn next_id(now: DateTime<Utc>, taken: impl Fn(&str) -> bool) -> String {
    let mut candidate = now.timestamp_millis();
    loop {
        let id = candidate.to_string();
        if !taken(&id) {
            return id;
        }
        trace!("Id {} already in use, bumping", id);
        candidate += 1;
    }
}

/// Writes `contents` to `path` through a temp file in the same directory,
/// so readers see either the old or the new value.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    if !dir.exists() {
        debug!("Creating parent directory: {}", dir.display());
        fs::create_dir_all(dir)?;
    }

    let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| {
        error!("Failed to create temporary file in {}: {}", dir.display(), e);
        NotepadError::Io(e)
    })?;
    temp_file.write_all(contents.as_bytes())?;
    temp_file.flush()?;

    temp_file.persist(path).map_err(|e| {
        error!("Failed to persist file {}: {}", path.display(), e.error);
        NotepadError::Io(e.error)
    })?;

    trace!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// Reads an image file and encodes it as a `data:` URL.
pub fn image_data_url(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| {
        error!("Failed to read image {}: {}", path.display(), e);
        NotepadError::Io(e)
    })?;

    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if mime.type_() != mime_guess::mime::IMAGE {
        return Err(NotepadError::validation(format!(
            "Not an image file: {}",
            path.display()
        )));
    }

    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

/// First non-empty line, cut at `max_chars` characters.
pub fn content_preview(content: &str, max_chars: usize) -> String {
    let first_line = content
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");

    if first_line.chars().count() <= max_chars {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
