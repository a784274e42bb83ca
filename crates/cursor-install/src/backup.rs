//! Timestamped backups of the live artifact.
//!
//! Backups live next to the artifact as `<file name>.backup.<YYYYmmdd_HHMMSS>`
//! and are never pruned here. A second backup within the same second gets a
//! `.<n>` suffix instead of overwriting the first.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};

use crate::error::{InstallError, Result};

/// Timestamp format embedded in backup names. Sorts lexicographically.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Marker between the artifact name and the timestamp.
const BACKUP_MARKER: &str = ".backup.";

/// Upper bound on backups sharing one timestamp.
const MAX_SEQUENCE: u32 = 1000;

/// Backup file name for `artifact` taken at `at`.
pub fn backup_path(artifact: &Path, at: DateTime<Local>) -> Result<PathBuf> {
    let file_name = artifact
        .file_name()
        .ok_or_else(|| InstallError::Backup(format!("{} has no file name", artifact.display())))?
        .to_string_lossy();
    let name = format!("{file_name}{BACKUP_MARKER}{}", at.format(TIMESTAMP_FORMAT));
    Ok(artifact.with_file_name(name))
}

/// Parses the timestamp embedded in a backup path.
#[must_use]
pub fn backup_timestamp(backup: &Path) -> Option<NaiveDateTime> {
    backup_key(backup).map(|(stamp, _)| stamp)
}

/// Timestamp and same-second sequence number of a backup path.
fn backup_key(backup: &Path) -> Option<(NaiveDateTime, u32)> {
    let name = backup.file_name()?.to_str()?;
    let (_, suffix) = name.rsplit_once(BACKUP_MARKER)?;
    let (stamp, sequence) = match suffix.split_once('.') {
        Some((stamp, n)) => (stamp, n.parse().ok()?),
        None => (suffix, 0),
    };
    let stamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
    Some((stamp, sequence))
}

/// Copies `artifact` to a new timestamped backup and returns its path.
pub fn create(artifact: &Path) -> Result<PathBuf> {
    create_at(artifact, Local::now())
}

/// Copies `artifact` to a new backup stamped `at`. Existing backups are never
/// overwritten.
pub fn create_at(artifact: &Path, at: DateTime<Local>) -> Result<PathBuf> {
    let base = backup_path(artifact, at)?;
    let copy_failed = |backup: &Path, e: io::Error| {
        InstallError::Backup(format!(
            "failed to copy {} to {}: {e}",
            artifact.display(),
            backup.display()
        ))
    };

    let mut source = File::open(artifact).map_err(|e| copy_failed(&base, e))?;
    let permissions = source
        .metadata()
        .map_err(|e| copy_failed(&base, e))?
        .permissions();
    let (backup, mut dest) = open_unique(&base)?;

    io::copy(&mut source, &mut dest).map_err(|e| copy_failed(&backup, e))?;
    dest.sync_all().map_err(|e| copy_failed(&backup, e))?;
    fs::set_permissions(&backup, permissions).map_err(|e| copy_failed(&backup, e))?;

    tracing::info!("Backed up {} to {}", artifact.display(), backup.display());
    Ok(backup)
}

/// Creates `base`, or `base.<n>` for the first free `n`.
fn open_unique(base: &Path) -> Result<(PathBuf, File)> {
    for sequence in 0..MAX_SEQUENCE {
        let candidate = if sequence == 0 {
            base.to_path_buf()
        } else {
            let mut name = base.as_os_str().to_owned();
            name.push(format!(".{sequence}"));
            PathBuf::from(name)
        };
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(InstallError::Backup(format!(
                    "failed to create {}: {e}",
                    candidate.display()
                )));
            }
        }
    }
    Err(InstallError::Backup(format!(
        "too many backups named {}",
        base.display()
    )))
}

/// All backups of `artifact`, oldest first.
pub fn list(artifact: &Path) -> Result<Vec<PathBuf>> {
    let Some(dir) = artifact.parent() else {
        return Ok(Vec::new());
    };
    let Some(file_name) = artifact.file_name().and_then(|n| n.to_str()) else {
        return Ok(Vec::new());
    };
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let prefix = format!("{file_name}{BACKUP_MARKER}");
    let mut backups: Vec<((NaiveDateTime, u32), PathBuf)> = fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix))
        })
        .filter_map(|path| backup_key(&path).map(|key| (key, path)))
        .collect();

    backups.sort();
    Ok(backups.into_iter().map(|(_, path)| path).collect())
}

/// Most recent backup of `artifact`, if any.
pub fn latest(artifact: &Path) -> Result<Option<PathBuf>> {
    Ok(list(artifact)?.pop())
}

/// Copies the most recent backup back onto `artifact`. The backup is kept.
pub fn restore_latest(artifact: &Path) -> Result<PathBuf> {
    let backup = latest(artifact)?.ok_or_else(|| {
        InstallError::Backup(format!("no backup found for {}", artifact.display()))
    })?;
    fs::copy(&backup, artifact).map_err(|e| {
        InstallError::Backup(format!(
            "failed to restore {} from {}: {e}",
            artifact.display(),
            backup.display()
        ))
    })?;
    tracing::info!("Restored {} from {}", artifact.display(), backup.display());
    Ok(backup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_backup_path_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let path = backup_path(Path::new("/opt/cursor/cursor.AppImage"), at).unwrap();
        assert_eq!(
            path,
            PathBuf::from("/opt/cursor/cursor.AppImage.backup.20240309_140507")
        );
        let parsed = backup_timestamp(&path).unwrap();
        assert_eq!(parsed, at.naive_local());
    }

    #[test]
    fn test_latest_picks_newest_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("app.AppImage");
        fs::write(dir.path().join("app.AppImage.backup.20230101_000000"), b"old").unwrap();
        fs::write(dir.path().join("app.AppImage.backup.20240101_000000"), b"new").unwrap();
        fs::write(dir.path().join("app.AppImage.backup.garbage"), b"x").unwrap();
        fs::write(dir.path().join("other.backup.20250101_000000"), b"x").unwrap();

        let backups = list(&artifact).unwrap();
        assert_eq!(backups.len(), 2);

        let latest = latest(&artifact).unwrap().unwrap();
        assert!(latest.ends_with("app.AppImage.backup.20240101_000000"));
    }

    #[test]
    fn test_create_and_restore() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("app.AppImage");
        fs::write(&artifact, b"v1").unwrap();

        let backup = create(&artifact).unwrap();
        assert_eq!(fs::read(&backup).unwrap(), b"v1");

        fs::write(&artifact, b"partial").unwrap();
        let used = restore_latest(&artifact).unwrap();
        assert_eq!(used, backup);
        assert_eq!(fs::read(&artifact).unwrap(), b"v1");
        assert!(backup.exists());
    }

    #[test]
    fn test_same_second_backups_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("app.AppImage");
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();

        fs::write(&artifact, b"v1").unwrap();
        let first = create_at(&artifact, at).unwrap();
        fs::write(&artifact, b"v2").unwrap();
        let second = create_at(&artifact, at).unwrap();

        assert_ne!(first, second);
        assert!(second.ends_with("app.AppImage.backup.20240309_140507.1"));
        assert_eq!(fs::read(&first).unwrap(), b"v1");
        assert_eq!(fs::read(&second).unwrap(), b"v2");
        assert_eq!(backup_timestamp(&second), Some(at.naive_local()));

        assert_eq!(list(&artifact).unwrap(), vec![first, second.clone()]);
        assert_eq!(latest(&artifact).unwrap(), Some(second));
    }

    #[cfg(unix)]
    #[test]
    fn test_backup_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("app.AppImage");
        fs::write(&artifact, b"v1").unwrap();
        fs::set_permissions(&artifact, fs::Permissions::from_mode(0o755)).unwrap();

        let backup = create(&artifact).unwrap();
        let mode = fs::metadata(&backup).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_restore_without_backup_fails() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("app.AppImage");
        assert!(matches!(
            restore_latest(&artifact),
            Err(InstallError::Backup(_))
        ));
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let backups = list(Path::new("/nonexistent/dir/app.AppImage")).unwrap();
        assert!(backups.is_empty());
    }
}
