use std::collections::VecDeque;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use gitty_command::CommandRunner;

pub(crate) type RecordedCall = (String, Vec<OsString>, Vec<(String, String)>);

pub(crate) struct StubRunner {
    pub(crate) calls: Mutex<Vec<RecordedCall>>,
    results: Mutex<VecDeque<io::Result<Output>>>,
}

impl StubRunner {
    pub(crate) fn with_results(results: Vec<io::Result<Output>>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            results: Mutex::new(VecDeque::from(results)),
        }
    }
}

impl CommandRunner for StubRunner {
    fn run(&self, program: &str, args: &[OsString], env: &[(&str, &str)]) -> io::Result<Output> {
        self.calls.lock().expect("lock").push((
            program.to_owned(),
            args.to_vec(),
            env.iter()
                .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
                .collect(),
        ));

        self.results
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| {
                Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "missing stubbed command output",
                ))
            })
    }
}

pub(crate) fn output_with_status(code: i32, stdout: &[u8], stderr: &[u8]) -> Output {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        Output {
            status: std::process::ExitStatus::from_raw(code << 8),
            stdout: stdout.to_vec(),
            stderr: stderr.to_vec(),
        }
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::ExitStatusExt;
        Output {
            status: std::process::ExitStatus::from_raw(code as u32),
            stdout: stdout.to_vec(),
            stderr: stderr.to_vec(),
        }
    }
}

pub(crate) fn success_output() -> Output {
    output_with_status(0, &[], &[])
}

pub(crate) struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub(crate) fn new(label: &str) -> Self {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "gitty-{label}-{}-{stamp}",
            std::process::id()
        ));
        std::fs::create_dir_all(&path).expect("create temp dir");
        Self { path }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}
