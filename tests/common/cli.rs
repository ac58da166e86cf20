use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use tempfile::TempDir;

/// A scratch working directory with an otherwise empty environment.
pub struct DeplabelWorkspace {
    temp_dir: TempDir,
    pub root: PathBuf,
}

impl DeplabelWorkspace {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let root = temp_dir.path().to_path_buf();
        Self { temp_dir, root }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write_env(&self, contents: &str) {
        fs::write(self.root.join(".env"), contents).expect("write .env");
    }

    pub fn write_config(&self, contents: &str) {
        fs::write(self.root.join("deplabel.yaml"), contents).expect("write deplabel.yaml");
    }

    /// A command for the binary, run in this workspace with a cleared environment.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_deplabel"));
        cmd.current_dir(&self.root)
            .env_clear()
            .env("HOME", &self.root)
            .env("NO_COLOR", "1");
        cmd
    }
}

pub struct CmdOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

pub fn run_deplabel<I, S>(workspace: &DeplabelWorkspace, args: I, label: &str) -> CmdOutput
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_deplabel_with_env(workspace, args, std::iter::empty::<(&str, &str)>(), label)
}

pub fn run_deplabel_with_env<I, S, E, K, V>(
    workspace: &DeplabelWorkspace,
    args: I,
    env: E,
    label: &str,
) -> CmdOutput
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    E: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let output = workspace
        .command()
        .args(args)
        .envs(env)
        .output()
        .unwrap_or_else(|e| panic!("{label}: failed to run deplabel: {e}"));

    CmdOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}
