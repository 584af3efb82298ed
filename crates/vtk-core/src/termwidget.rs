//! Hosts a child shell over plain pipes (no pseudoterminal allocation) and
//! pumps its output through an `Ecma48` emulator.

use std::io::{Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use tracing::{debug, error, info};
use vtk_common::{TKeypress, VtkError};

use crate::ecma48::{DeviceType, Ecma48};

const READ_CHUNK_CAP: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildStatus {
    Running,
    Offline,
}

pub struct TerminalWidget {
    emulator: Ecma48,
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
    status: ChildStatus,
}

impl TerminalWidget {
    pub fn spawn(cols: u16, rows: u16, shell: Option<&str>) -> Result<Self, VtkError> {
        let shell = shell
            .map(str::to_string)
            .or_else(|| std::env::var("SHELL").ok())
            .unwrap_or_else(|| "/bin/bash".to_string());

        info!("spawning {shell} ({cols}x{rows}) over pipes, no pty allocated");

        let mut cmd = Command::new("setsid");
        cmd.arg(&shell)
            .arg("-i")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        unsafe {
            use std::os::unix::process::CommandExt;
            cmd.pre_exec(|| {
                // merge stderr onto the stdout pipe, since pipes carry no
                // notion of a combined tty stream the way a pty would
                let rc = libc::dup2(1, 2);
                if rc < 0 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let mut child = cmd.spawn().map_err(|e| VtkError::Spawn(e.to_string()))?;
        let stdin = child.stdin.take().ok_or_else(|| VtkError::Spawn("no stdin".into()))?;
        let stdout = child.stdout.take().ok_or_else(|| VtkError::Spawn("no stdout".into()))?;

        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            let fd = stdout.as_raw_fd();
            unsafe {
                let flags = libc::fcntl(fd, libc::F_GETFL, 0);
                libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
            }
        }

        Ok(Self {
            emulator: Ecma48::new(cols, rows, DeviceType::Vt102),
            child,
            stdin,
            stdout,
            status: ChildStatus::Running,
        })
    }

    pub fn status(&self) -> ChildStatus {
        self.status
    }

    pub fn emulator(&self) -> &Ecma48 {
        &self.emulator
    }

    pub fn emulator_mut(&mut self) -> &mut Ecma48 {
        &mut self.emulator
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.emulator.resize(cols, rows);
    }

    /// Called once per main-loop tick. Reads at most `READ_CHUNK_CAP` bytes
    /// from the child's (non-blocking) stdout and feeds them to the
    /// emulator; any reply bytes the emulator produced are written back.
    pub fn on_idle(&mut self) {
        if self.status == ChildStatus::Offline {
            return;
        }
        let mut buf = [0u8; READ_CHUNK_CAP];
        match self.stdout.read(&mut buf) {
            Ok(0) => {
                debug!("child stdout closed");
                self.go_offline();
            }
            Ok(n) => {
                self.emulator.consume_bytes(&buf[..n]);
                let reply = self.emulator.take_reply();
                if !reply.is_empty() {
                    let _ = self.stdin.write_all(&reply);
                    let _ = self.stdin.flush();
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) => {
                error!("child stdout read error: {e}");
                self.go_offline();
            }
        }
    }

    pub fn send_key(&mut self, key: &TKeypress) {
        if self.status == ChildStatus::Offline {
            return;
        }
        let bytes = self.emulator.keypress(key);
        if self.stdin.write_all(&bytes).is_err() {
            self.go_offline();
            return;
        }
        let _ = self.stdin.flush();
    }

    fn go_offline(&mut self) {
        self.status = ChildStatus::Offline;
    }

    pub fn close(&mut self) {
        if self.status == ChildStatus::Running {
            #[cfg(unix)]
            unsafe {
                libc::kill(-(self.child.id() as libc::pid_t), libc::SIGTERM);
            }
            let _ = self.child.wait();
            self.status = ChildStatus::Offline;
        }
    }
}

impl Drop for TerminalWidget {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn spawned_shell_script_output_reaches_the_emulator() {
        let mut script = tempfile::NamedTempFile::new().expect("create temp script");
        writeln!(script, "#!/bin/sh").unwrap();
        writeln!(script, "echo vtk-ready").unwrap();
        writeln!(script, "exit 0").unwrap();
        script.flush().unwrap();
        std::fs::set_permissions(script.path(), std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut widget =
            TerminalWidget::spawn(80, 24, Some(script.path().to_str().unwrap())).expect("spawn");

        let mut seen = String::new();
        for _ in 0..50 {
            widget.on_idle();
            seen = widget.emulator().display()[0]
                .cells()
                .iter()
                .map(|c| c.ch)
                .collect();
            if seen.contains("vtk-ready") {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        assert!(seen.contains("vtk-ready"), "expected shell output, got {seen:?}");
    }
}
