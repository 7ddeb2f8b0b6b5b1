use std::ffi::OsString;
use std::io;
use std::process::{Command, Output, Stdio};

pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[OsString], env: &[(&str, &str)]) -> io::Result<Output>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, program: &str, args: &[OsString], env: &[(&str, &str)]) -> io::Result<Output> {
        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null());
        for (key, value) in env {
            command.env(key, value);
        }
        command.output()
    }
}
