//! All-or-nothing file persistence.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::OutputResult;

/// Run `write` against a sibling `<path>.tmp`, then rename into place.
///
/// On any error the temporary file is removed and `path` is left untouched,
/// so readers never observe a half-written table.
pub fn atomic_write<F>(path: &Path, write: F) -> OutputResult<()>
where
    F: FnOnce(&Path) -> OutputResult<()>,
{
    let tmp = tmp_path(path);
    match write(&tmp) {
        Ok(()) => {
            std::fs::rename(&tmp, path)?;
            Ok(())
        }
        Err(e) => {
            let _ = std::fs::remove_file(&tmp);
            Err(e)
        }
    }
}

/// Like [`atomic_write`], but for two tables that must land together.
///
/// Both temporaries are fully written before either rename, so a failure
/// while producing the second table cannot leave the first one persisted.
pub fn atomic_write_pair<F, G>(
    path_a:  &Path,
    write_a: F,
    path_b:  &Path,
    write_b: G,
) -> OutputResult<()>
where
    F: FnOnce(&Path) -> OutputResult<()>,
    G: FnOnce(&Path) -> OutputResult<()>,
{
    let tmp_a = tmp_path(path_a);
    let tmp_b = tmp_path(path_b);

    if let Err(e) = write_a(&tmp_a).and_then(|()| write_b(&tmp_b)) {
        let _ = std::fs::remove_file(&tmp_a);
        let _ = std::fs::remove_file(&tmp_b);
        return Err(e);
    }

    std::fs::rename(&tmp_a, path_a)?;
    if let Err(e) = std::fs::rename(&tmp_b, path_b) {
        // Roll the first table back rather than leave half the stage output.
        let _ = std::fs::remove_file(path_a);
        let _ = std::fs::remove_file(&tmp_b);
        return Err(e.into());
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os: OsString = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}
