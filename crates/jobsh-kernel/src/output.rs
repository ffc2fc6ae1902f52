//! Notification output that stays whole under concurrency.
//!
//! Job notifications are printed from two threads (the eval loop and the
//! signal thread), and in one case from a forked child that has not exec'd
//! yet. Lines therefore bypass stdio buffering and go out as a single
//! `write(2)` each, so concurrent notifications interleave at line
//! granularity, never mid-line. [`write_parts`] additionally assembles its
//! line in a stack buffer, which keeps the post-fork path free of
//! allocation.

use std::os::fd::{AsFd, BorrowedFd};

use nix::errno::Errno;
use nix::libc;

/// Longest assembled notification line.
pub const MAX_LINE: usize = 1024;

pub fn stdout() -> BorrowedFd<'static> {
    // Fd 1 is open for the lifetime of the process.
    unsafe { BorrowedFd::borrow_raw(libc::STDOUT_FILENO) }
}

pub fn stderr() -> BorrowedFd<'static> {
    unsafe { BorrowedFd::borrow_raw(libc::STDERR_FILENO) }
}

/// Write the whole buffer, retrying on EINTR and partial writes.
pub fn write_all<Fd: AsFd>(fd: Fd, mut buf: &[u8]) -> nix::Result<()> {
    while !buf.is_empty() {
        match nix::unistd::write(fd.as_fd(), buf) {
            Ok(0) => return Err(Errno::EIO),
            Ok(n) => buf = &buf[n..],
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Concatenate `parts` into one line and write it with a single call.
/// Stack-only; anything past [`MAX_LINE`] bytes is dropped.
pub fn write_parts<Fd: AsFd>(fd: Fd, parts: &[&[u8]]) -> nix::Result<()> {
    let mut buf = [0u8; MAX_LINE];
    let mut len = 0;
    for part in parts {
        let n = part.len().min(MAX_LINE - len);
        buf[len..len + n].copy_from_slice(&part[..n]);
        len += n;
        if len == MAX_LINE {
            break;
        }
    }
    write_all(fd, &buf[..len])
}

/// Emit one complete notification line on stdout. The shell exits when
/// the write fails.
pub fn emit(line: impl AsRef<[u8]>) {
    if write_all(stdout(), line.as_ref()).is_err() {
        std::process::exit(1);
    }
}

/// Emit one diagnostic line on stderr. Best effort.
pub fn emit_err(line: impl AsRef<[u8]>) {
    let _ = write_all(stderr(), line.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Read;
    use std::os::fd::OwnedFd;

    fn read_pipe(r: OwnedFd) -> Vec<u8> {
        let mut out = Vec::new();
        File::from(r).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn write_all_sends_every_byte() {
        let (r, w) = nix::unistd::pipe().unwrap();
        write_all(&w, b"hello pipe\n").unwrap();
        drop(w);
        assert_eq!(read_pipe(r), b"hello pipe\n");
    }

    #[test]
    fn write_parts_concatenates_in_order() {
        let (r, w) = nix::unistd::pipe().unwrap();
        write_parts(&w, &[b"Job [", b"3", b"] done\n"]).unwrap();
        drop(w);
        assert_eq!(read_pipe(r), b"Job [3] done\n");
    }

    #[test]
    fn write_parts_truncates_at_max_line() {
        let big = vec![b'x'; MAX_LINE + 100];
        let (r, w) = nix::unistd::pipe().unwrap();
        write_parts(&w, &[&big, b"tail"]).unwrap();
        drop(w);
        assert_eq!(read_pipe(r).len(), MAX_LINE);
    }
}
