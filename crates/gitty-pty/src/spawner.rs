use std::io::{ErrorKind, Read, Write};

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use tokio::sync::{mpsc, oneshot};

use crate::error::process_error;
use crate::{PtyExit, PtyProcess, PtyResult, PtySpawnSpec, TerminalSize, TerminalSpawner};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Spawns through the platform PTY (`openpty` on Unix, ConPTY on Windows).
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeTerminalSpawner;

struct SpawnedPty {
    master: Box<dyn MasterPty + Send>,
    reader: Box<dyn Read + Send>,
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
}

impl TerminalSpawner for NativeTerminalSpawner {
    fn spawn(&self, spec: PtySpawnSpec) -> PtyResult<PtyProcess> {
        spec.validate()?;
        tracing::debug!(
            program = %spec.program,
            workdir = %spec.workdir.display(),
            cols = spec.size.cols,
            rows = spec.size.rows,
            "spawning pty process"
        );

        let spawned = spawn_pty_process(spec)?;
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = oneshot::channel();

        spawn_read_loop(spawned.reader, output_tx);
        spawn_write_loop(spawned.writer, input_rx);
        spawn_child_wait_loop(spawned.master, spawned.child, exit_tx);

        Ok(PtyProcess {
            output: output_rx,
            input: input_tx,
            exit: exit_rx,
        })
    }
}

fn to_pty_size(size: TerminalSize) -> PtySize {
    PtySize {
        cols: size.cols,
        rows: size.rows,
        pixel_width: 0,
        pixel_height: 0,
    }
}

fn spawn_pty_process(spec: PtySpawnSpec) -> PtyResult<SpawnedPty> {
    let pty_system = native_pty_system();
    let pair = pty_system
        .openpty(to_pty_size(spec.size))
        .map_err(process_error)?;

    let mut command = CommandBuilder::new(spec.program);
    command.cwd(spec.workdir);
    for arg in spec.args {
        command.arg(arg);
    }
    for (key, value) in spec.environment {
        command.env(key, value);
    }

    let child = pair.slave.spawn_command(command).map_err(process_error)?;
    drop(pair.slave);

    let reader = match pair.master.try_clone_reader() {
        Ok(reader) => reader,
        Err(error) => {
            terminate_child(child);
            return Err(process_error(error));
        }
    };

    let writer = match pair.master.take_writer() {
        Ok(writer) => writer,
        Err(error) => {
            terminate_child(child);
            return Err(process_error(error));
        }
    };

    Ok(SpawnedPty {
        master: pair.master,
        reader,
        writer,
        child,
    })
}

fn terminate_child(mut child: Box<dyn Child + Send + Sync>) {
    let _ = child.kill();
    let _ = child.wait();
}

fn spawn_read_loop(mut reader: Box<dyn Read + Send>, output_tx: mpsc::UnboundedSender<Vec<u8>>) {
    std::thread::spawn(move || {
        let mut buffer = [0_u8; READ_CHUNK_SIZE];
        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => {
                    if output_tx.send(buffer[..read].to_vec()).is_err() {
                        break;
                    }
                }
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                // EIO once the slave side is gone is the normal end of stream on Linux.
                Err(_) => break,
            }
        }
    });
}

fn spawn_write_loop(
    mut writer: Box<dyn Write + Send>,
    mut input_rx: mpsc::UnboundedReceiver<Vec<u8>>,
) {
    std::thread::spawn(move || {
        while let Some(input) = input_rx.blocking_recv() {
            if input.is_empty() {
                continue;
            }
            if writer.write_all(&input).is_err() {
                break;
            }
            if writer.flush().is_err() {
                break;
            }
        }
    });
}

/// The master is held until the child is reaped; dropping it earlier hangs up the terminal.
fn spawn_child_wait_loop(
    master: Box<dyn MasterPty + Send>,
    mut child: Box<dyn Child + Send + Sync>,
    exit_tx: oneshot::Sender<PtyExit>,
) {
    std::thread::spawn(move || {
        let exit = match child.wait() {
            Ok(status) => PtyExit {
                code: status.exit_code(),
                success: status.success(),
            },
            Err(error) => {
                tracing::warn!(error = %error, "failed to wait for pty child");
                PtyExit {
                    code: u32::MAX,
                    success: false,
                }
            }
        };
        drop(master);
        let _ = exit_tx.send(exit);
    });
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::PtyError;

    fn shell_spec(script: &str) -> PtySpawnSpec {
        PtySpawnSpec {
            program: "sh".to_owned(),
            args: vec!["-c".to_owned(), script.to_owned()],
            workdir: std::env::current_dir().expect("resolve current dir"),
            environment: Vec::new(),
            size: TerminalSize::default(),
        }
    }

    async fn collect_until(process: &mut PtyProcess, needle: &str) -> String {
        timeout(Duration::from_secs(5), async {
            let mut collected = Vec::new();
            while let Some(chunk) = process.output.recv().await {
                collected.extend_from_slice(&chunk);
                if String::from_utf8_lossy(&collected).contains(needle) {
                    break;
                }
            }
            String::from_utf8_lossy(&collected).to_string()
        })
        .await
        .expect("timed out waiting for pty output")
    }

    #[tokio::test]
    async fn spawn_streams_output_and_accepts_input() {
        let mut process = NativeTerminalSpawner
            .spawn(shell_spec(
                "printf 'ready\\n'; read line; printf 'echo:%s\\n' \"$line\"",
            ))
            .expect("spawn shell");

        let ready = collect_until(&mut process, "ready").await;
        assert!(ready.contains("ready"));

        process.input.send(b"hello\r".to_vec()).expect("write input");
        let echoed = collect_until(&mut process, "echo:hello").await;
        assert!(echoed.contains("echo:hello"));

        let exit = timeout(Duration::from_secs(5), process.exit)
            .await
            .expect("timed out waiting for exit")
            .expect("exit notification");
        assert!(exit.success);
        assert_eq!(exit.code, 0);
    }

    #[tokio::test]
    async fn exit_code_is_reported() {
        let process = NativeTerminalSpawner
            .spawn(shell_spec("exit 3"))
            .expect("spawn shell");

        let exit = timeout(Duration::from_secs(5), process.exit)
            .await
            .expect("timed out waiting for exit")
            .expect("exit notification");
        assert!(!exit.success);
        assert_eq!(exit.code, 3);
    }

    #[test]
    fn rejects_empty_program_and_zero_size() {
        let mut spec = shell_spec("true");
        spec.program = "  ".to_owned();
        assert!(matches!(
            NativeTerminalSpawner.spawn(spec).err(),
            Some(PtyError::Configuration(_))
        ));

        let mut spec = shell_spec("true");
        spec.size = TerminalSize { cols: 0, rows: 24 };
        assert!(matches!(
            NativeTerminalSpawner.spawn(spec).err(),
            Some(PtyError::Configuration(_))
        ));
    }

    #[test]
    fn missing_program_is_a_process_error() {
        let mut spec = shell_spec("true");
        spec.program = "gitty-definitely-not-a-binary".to_owned();
        assert!(matches!(
            NativeTerminalSpawner.spawn(spec).err(),
            Some(PtyError::Process(_))
        ));
    }
}
