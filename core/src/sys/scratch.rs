use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::error::VaultkeepError;

/// A per-attempt scratch directory for a persisted hook script. Created with `0o700`
/// permissions; the script file inside is made executable. Removed on drop regardless of how
/// the hook exited, so a crashed or timed-out hook never leaves a script behind.
pub struct ScratchSpace {
    dir: PathBuf,
    script_path: PathBuf,
}

impl ScratchSpace {
    /// Writes `body` to a fresh scratch directory under `base`, prepending a `#!/bin/sh`
    /// shebang if the body doesn't already start with one.
    pub fn persist_script(base: &Path, body: &str) -> Result<ScratchSpace, VaultkeepError> {
        let dir = base.join(format!("vaultkeep-hook-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).map_err(|source| VaultkeepError::ScriptPersistenceFailed {
            path: dir.clone(),
            source,
        })?;
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o700)).map_err(|source| {
            VaultkeepError::ScriptPersistenceFailed {
                path: dir.clone(),
                source,
            }
        })?;

        let script_path = dir.join("script.sh");
        let contents = if body.starts_with("#!") {
            body.to_owned()
        } else {
            format!("#!/bin/sh\n{}", body)
        };

        let mut file = fs::File::create(&script_path).map_err(|source| VaultkeepError::ScriptPersistenceFailed {
            path: script_path.clone(),
            source,
        })?;
        file.write_all(contents.as_bytes())
            .map_err(|source| VaultkeepError::ScriptPersistenceFailed {
                path: script_path.clone(),
                source,
            })?;
        fs::set_permissions(&script_path, fs::Permissions::from_mode(0o700)).map_err(|source| {
            VaultkeepError::ScriptPersistenceFailed {
                path: script_path.clone(),
                source,
            }
        })?;

        Ok(ScratchSpace { dir, script_path })
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt as _;

    #[test]
    fn persisted_script_gets_a_shebang_when_missing_one() {
        let scratch = ScratchSpace::persist_script(&std::env::temp_dir(), "echo hi").unwrap();
        let contents = fs::read_to_string(scratch.script_path()).unwrap();
        assert!(contents.starts_with("#!/bin/sh\n"));
    }

    #[test]
    fn persisted_script_keeps_an_existing_shebang_verbatim() {
        let scratch = ScratchSpace::persist_script(&std::env::temp_dir(), "#!/usr/bin/env python3\nprint('hi')").unwrap();
        let contents = fs::read_to_string(scratch.script_path()).unwrap();
        assert!(contents.starts_with("#!/usr/bin/env python3\n"));
    }

    #[test]
    fn persisted_script_is_owner_executable() {
        let scratch = ScratchSpace::persist_script(&std::env::temp_dir(), "echo hi").unwrap();
        let mode = fs::metadata(scratch.script_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o700, 0o700);
    }

    #[test]
    fn scratch_directory_is_removed_on_drop() {
        let dir;
        {
            let scratch = ScratchSpace::persist_script(&std::env::temp_dir(), "echo hi").unwrap();
            dir = scratch.dir.clone();
            assert!(dir.exists());
        }
        assert!(!dir.exists());
    }
}
