//! BSD remote-execution transport.
//!
//! The historical alternative to spawning a remote shell: connect to the
//! peer's `exec` service (TCP port 512), authenticate with a cleartext user
//! name and password, and run the `rmt` helper with the socket serving as
//! both its stdin and stdout. One bidirectional socket therefore provides
//! both session endpoints.
//!
//! Credentials are prompted on the controlling terminal, not on the
//! process's stdin — archive programs routinely have stdin redirected onto
//! the archive itself.

#![allow(unsafe_code)]

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::os::fd::AsRawFd;

use tracing::debug;

use crate::connection::Connection;

/// TCP port of the BSD `exec` service.
pub const REXEC_PORT: u16 = 512;

/// Establishes a session by remote-executing `command` on `host`.
///
/// When `user` is absent the terminal prompt asks for one. The returned
/// connection uses one socket for both directions.
///
/// # Errors
///
/// Connection failures, an unopenable controlling terminal, or an
/// authentication rejection from the remote service (reported as
/// `PermissionDenied` with the server's message).
pub fn open(host: &str, user: Option<&str>, command: &str) -> io::Result<Connection> {
    let mut tty = ControllingTerminal::open()?;

    let user = match user {
        Some(user) => user.to_owned(),
        None => tty.prompt_line("Name: ")?,
    };
    let password = tty.prompt_password(&format!("Password ({host}:{user}): "))?;

    let mut stream = TcpStream::connect((host, REXEC_PORT))?;
    debug!(host, port = REXEC_PORT, "connected to exec service");

    // Wire form: stderr-port (empty = none), user, password, command — each
    // NUL-terminated — answered by a single status byte.
    stream.write_all(b"\0")?;
    stream.write_all(user.as_bytes())?;
    stream.write_all(b"\0")?;
    stream.write_all(password.as_bytes())?;
    stream.write_all(b"\0")?;
    stream.write_all(command.as_bytes())?;
    stream.write_all(b"\0")?;

    let mut status = [0u8; 1];
    stream.read_exact(&mut status)?;
    if status[0] != 0 {
        let mut message = String::new();
        let mut reader = BufReader::new(&mut stream);
        let _ = reader.read_line(&mut message);
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("rexec rejected: {}", message.trim_end()),
        ));
    }

    let reader = stream.try_clone()?;
    Ok(Connection::from_parts(Box::new(reader), Box::new(stream)))
}

/// The controlling terminal, opened for prompting.
struct ControllingTerminal {
    tty: File,
}

impl ControllingTerminal {
    fn open() -> io::Result<Self> {
        let tty = OpenOptions::new().read(true).write(true).open("/dev/tty")?;
        Ok(Self { tty })
    }

    /// Prints `prompt` and reads one line, without the newline.
    fn prompt_line(&mut self, prompt: &str) -> io::Result<String> {
        self.tty.write_all(prompt.as_bytes())?;
        self.tty.flush()?;
        self.read_line()
    }

    /// As [`prompt_line`](Self::prompt_line), with terminal echo disabled
    /// while the line is typed.
    fn prompt_password(&mut self, prompt: &str) -> io::Result<String> {
        self.tty.write_all(prompt.as_bytes())?;
        self.tty.flush()?;

        let _echo_guard = EchoGuard::disable(self.tty.as_raw_fd())?;
        let line = self.read_line();
        self.tty.write_all(b"\n")?;
        line
    }

    fn read_line(&mut self) -> io::Result<String> {
        read_line_from(&mut self.tty)
    }
}

/// Reads one line from `reader`, stripping the newline.
fn read_line_from(reader: &mut impl Read) -> io::Result<String> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => break,
            Ok(_) if byte[0] == b'\n' => break,
            Ok(_) => line.push(byte[0]),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    String::from_utf8(line)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "non-UTF-8 terminal input"))
}

/// RAII guard that clears the terminal's ECHO flag.
struct EchoGuard {
    fd: libc::c_int,
    saved: libc::termios,
}

impl EchoGuard {
    fn disable(fd: libc::c_int) -> io::Result<Self> {
        // SAFETY: `fd` is a live terminal descriptor and both termios
        // pointers reference locals that outlive the calls.
        unsafe {
            let mut saved: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(fd, &mut saved) != 0 {
                return Err(io::Error::last_os_error());
            }
            let mut silent = saved;
            silent.c_lflag &= !libc::ECHO;
            if libc::tcsetattr(fd, libc::TCSAFLUSH, &silent) != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(Self { fd, saved })
        }
    }
}

impl Drop for EchoGuard {
    fn drop(&mut self) {
        // SAFETY: restoring the attributes saved for this same descriptor.
        unsafe {
            let _ = libc::tcsetattr(self.fd, libc::TCSAFLUSH, &self.saved);
        }
    }
}
