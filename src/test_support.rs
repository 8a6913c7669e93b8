//! Stand-in executables for the command-line capability tests.

use std::path::{Path, PathBuf};

/// Write an executable shell script `name` into `dir`.
///
/// The script first records its arguments, one per line, in `<name>.args`
/// next to itself and then runs `body`.
#[cfg(unix)]
pub(crate) fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    let script = format!(
        "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\n{body}\n",
        args_path(dir, name).display()
    );
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Arguments the last run of `name` was called with
pub(crate) fn recorded_args(dir: &Path, name: &str) -> Vec<String> {
    std::fs::read_to_string(args_path(dir, name))
        .unwrap()
        .lines()
        .map(String::from)
        .collect()
}

fn args_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.args"))
}
