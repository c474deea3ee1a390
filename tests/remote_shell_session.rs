//! End-to-end tests against a scripted fake remote shell.
//!
//! A generated `/bin/sh` script stands in for `rsh`: it logs the argv it was
//! invoked with, then speaks just enough of the rmt protocol on its stdio to
//! drive the client through a full open/read/write/seek/close cycle. This
//! exercises the real spawn path — pipes, argv composition, privilege hook,
//! child EOF shutdown — with no network involved.

use std::fs;
use std::io::SeekFrom;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use oc_rmt::{OpenFlags, SessionTable};
use tempfile::TempDir;

/// Writes an executable fake remote shell into `dir`.
///
/// The script records its argv into `argv.log` and every command line it
/// receives into `wire.log`, and answers: `A0` to open, `A5` + `hello` to
/// reads, a full acknowledgement to writes, the requested offset to seeks,
/// and `A0` to close.
fn write_fake_shell(dir: &Path) -> PathBuf {
    let argv_log = dir.join("argv.log");
    let wire_log = dir.join("wire.log");
    let script_path = dir.join("fake-rsh");

    let script = format!(
        r#"#!/bin/sh
printf '%s\n' "$@" > {argv}
IFS= read -r open_line
IFS= read -r flags_line
printf '%s\n%s\n' "$open_line" "$flags_line" > {wire}
printf 'A0\n'
while IFS= read -r line; do
  case "$line" in
    C*)
      printf '%s\n' "$line" >> {wire}
      printf 'A0\n'
      exit 0
      ;;
    R*)
      printf '%s\n' "$line" >> {wire}
      printf 'A5\nhello'
      ;;
    W*)
      count=${{line#W}}
      dd bs=1 count="$count" > /dev/null 2>&1
      printf '%s\n' "$line" >> {wire}
      printf 'A%s\n' "$count"
      ;;
    L*)
      IFS= read -r offset
      printf '%s %s\n' "$line" "$offset" >> {wire}
      printf 'A%s\n' "$offset"
      ;;
    I*)
      IFS= read -r count
      printf '%s %s\n' "$line" "$count" >> {wire}
      printf 'A0\n'
      ;;
  esac
done
"#,
        argv = shell_quote(&argv_log),
        wire = shell_quote(&wire_log),
    );

    fs::write(&script_path, script).expect("write fake shell");
    fs::set_permissions(&script_path, fs::Permissions::from_mode(0o755))
        .expect("make fake shell executable");
    script_path
}

/// Writes a fake shell that refuses the open with `E2`.
fn write_refusing_shell(dir: &Path) -> PathBuf {
    let script_path = dir.join("refusing-rsh");
    let script = "#!/bin/sh\n\
                  IFS= read -r open_line\n\
                  IFS= read -r flags_line\n\
                  printf 'E2\\nNo such file or directory\\n'\n";
    fs::write(&script_path, script).expect("write refusing shell");
    fs::set_permissions(&script_path, fs::Permissions::from_mode(0o755))
        .expect("make refusing shell executable");
    script_path
}

fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.display())
}

#[test]
fn full_session_cycle_over_a_spawned_child() {
    let dir = TempDir::new().expect("tempdir");
    let shell = write_fake_shell(dir.path());

    let mut table = SessionTable::new();
    let fd = table
        .open(
            "localhost:/dev/tape",
            OpenFlags::new(libc::O_RDONLY),
            128,
            Some(shell.as_path()),
            None,
        )
        .expect("open through fake shell");
    assert_eq!(fd, 128, "first handle plus the requested bias");
    let handle = (fd - 128) as usize;

    let mut buffer = [0u8; 100];
    assert_eq!(table.read(handle, &mut buffer).expect("read"), 5);
    assert_eq!(&buffer[..5], b"hello");

    assert_eq!(table.write(handle, b"abcde").expect("write"), 5);

    assert_eq!(
        table.seek(handle, SeekFrom::Start(10240)).expect("seek"),
        10240
    );

    assert_eq!(table.close(handle).expect("close"), 0);
    assert!(!table.is_active(handle));

    let argv = fs::read_to_string(dir.path().join("argv.log")).expect("argv log");
    let argv: Vec<&str> = argv.lines().collect();
    assert_eq!(argv, vec!["localhost", "/etc/rmt"]);

    let wire = fs::read_to_string(dir.path().join("wire.log")).expect("wire log");
    let expected_flags = format!("{} O_RDONLY", libc::O_RDONLY);
    let wire: Vec<&str> = wire.lines().collect();
    assert_eq!(
        wire,
        vec![
            "O/dev/tape",
            expected_flags.as_str(),
            "R100",
            "W5",
            "L0 10240",
            "C",
        ]
    );
}

#[test]
fn user_prefix_becomes_a_login_flag() {
    let dir = TempDir::new().expect("tempdir");
    let shell = write_fake_shell(dir.path());

    let mut table = SessionTable::new();
    let fd = table
        .open(
            "operator@localhost:/dev/tape",
            OpenFlags::new(libc::O_RDONLY),
            128,
            Some(shell.as_path()),
            Some("/usr/sbin/rmt"),
        )
        .expect("open with user");
    let handle = (fd - 128) as usize;
    table.close(handle).expect("close");

    let argv = fs::read_to_string(dir.path().join("argv.log")).expect("argv log");
    let argv: Vec<&str> = argv.lines().collect();
    assert_eq!(argv, vec!["localhost", "-l", "operator", "/usr/sbin/rmt"]);
}

#[test]
fn refused_open_reports_the_peer_errno_and_frees_the_slot() {
    let dir = TempDir::new().expect("tempdir");
    let shell = write_refusing_shell(dir.path());

    let mut table = SessionTable::new();
    let err = table
        .open(
            "localhost:/dev/missing",
            OpenFlags::new(libc::O_RDONLY),
            128,
            Some(shell.as_path()),
            None,
        )
        .unwrap_err();
    assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
    assert_eq!(table.active_count(), 0);
    assert_eq!(table.free_slot(), Some(0));
}

#[test]
fn missing_remote_shell_fails_the_open() {
    let mut table = SessionTable::new();
    let err = table
        .open(
            "localhost:/dev/tape",
            OpenFlags::new(libc::O_RDONLY),
            128,
            None,
            None,
        )
        .unwrap_err();
    assert_eq!(err.raw_os_error(), Some(libc::EIO));
    assert_eq!(table.active_count(), 0);
}

#[test]
fn unspawnable_remote_shell_reports_the_underlying_errno() {
    let mut table = SessionTable::new();
    let err = table
        .open(
            "localhost:/dev/tape",
            OpenFlags::new(libc::O_RDONLY),
            128,
            Some(Path::new("/no/such/remote-shell")),
            None,
        )
        .unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    assert_eq!(table.active_count(), 0);
}

#[test]
fn sessions_are_independent() {
    let dir_a = TempDir::new().expect("tempdir");
    let dir_b = TempDir::new().expect("tempdir");
    let shell_a = write_fake_shell(dir_a.path());
    let shell_b = write_fake_shell(dir_b.path());

    let mut table = SessionTable::new();
    let fd_a = table
        .open(
            "localhost:/dev/tape0",
            OpenFlags::new(libc::O_RDONLY),
            128,
            Some(shell_a.as_path()),
            None,
        )
        .expect("open a");
    let fd_b = table
        .open(
            "localhost:/dev/tape1",
            OpenFlags::new(libc::O_RDONLY),
            128,
            Some(shell_b.as_path()),
            None,
        )
        .expect("open b");
    assert_eq!((fd_a, fd_b), (128, 129));

    // Closing the first session leaves the second one fully usable.
    table.close(0).expect("close a");
    let mut buffer = [0u8; 16];
    assert_eq!(table.read(1, &mut buffer).expect("read b"), 5);
    table.close(1).expect("close b");
}
