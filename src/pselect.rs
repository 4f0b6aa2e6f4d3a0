use std::os::unix::io::RawFd;
use std::{io, mem, ptr, time};

#[derive(Clone, Copy)]
pub struct FdSet(libc::fd_set);

impl FdSet {
    pub fn new() -> FdSet {
        unsafe {
            let mut raw_fd_set = mem::MaybeUninit::<libc::fd_set>::uninit();
            libc::FD_ZERO(raw_fd_set.as_mut_ptr());
            FdSet(raw_fd_set.assume_init())
        }
    }

    pub fn set(&mut self, fd: RawFd) {
        unsafe {
            libc::FD_SET(fd, &mut self.0);
        }
    }

    pub fn is_set(&self, fd: RawFd) -> bool {
        unsafe { libc::FD_ISSET(fd, &self.0) }
    }
}

fn to_fdset_ptr(opt: Option<&mut FdSet>) -> *mut libc::fd_set {
    match opt {
        None => ptr::null_mut(),
        Some(&mut FdSet(ref mut raw_fd_set)) => raw_fd_set,
    }
}

fn to_ptr<T>(opt: Option<&T>) -> *const T {
    match opt {
        None => ptr::null::<T>(),
        Some(p) => p,
    }
}

/// Returns the number of ready descriptors, zero if the timeout expired first.
pub fn pselect(
    nfds: libc::c_int,
    readfds: Option<&mut FdSet>,
    writefds: Option<&mut FdSet>,
    errorfds: Option<&mut FdSet>,
    timeout: Option<&libc::timespec>,
    sigmask: Option<&libc::sigset_t>,
) -> io::Result<usize> {
    match unsafe {
        libc::pselect(
            nfds,
            to_fdset_ptr(readfds),
            to_fdset_ptr(writefds),
            to_fdset_ptr(errorfds),
            to_ptr(timeout),
            to_ptr(sigmask),
        )
    } {
        -1 => Err(io::Error::last_os_error()),
        res => Ok(res as usize),
    }
}

pub fn make_timespec(duration: time::Duration) -> libc::timespec {
    libc::timespec {
        tv_sec: duration.as_secs() as libc::time_t,
        tv_nsec: duration.subsec_nanos() as libc::c_long,
    }
}

/// Blocks until `fd` becomes readable or `timeout` elapses.
///
/// Returns `false` on timeout. Descriptors outside `0..FD_SETSIZE` cannot be waited on with
/// `pselect` and are rejected with `InvalidInput`.
pub fn wait_readable(fd: RawFd, timeout: time::Duration) -> io::Result<bool> {
    if fd < 0 || fd as usize >= libc::FD_SETSIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("descriptor {} out of range for pselect", fd),
        ));
    }

    let mut fds = FdSet::new();
    fds.set(fd);
    let ts = make_timespec(timeout);

    let ready = pselect(fd + 1, Some(&mut fds), None, None, Some(&ts), None)?;
    Ok(ready > 0 && fds.is_set(fd))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn timespec_splits_seconds_and_nanos() {
        let ts = make_timespec(Duration::from_millis(2_500));
        assert_eq!(ts.tv_sec, 2);
        assert_eq!(ts.tv_nsec, 500_000_000);
    }

    #[test]
    fn descriptors_beyond_fd_setsize_are_rejected() {
        let timeout = Duration::from_millis(1);
        for fd in [-1, libc::FD_SETSIZE as RawFd, RawFd::MAX] {
            let err = wait_readable(fd, timeout).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn pipe_readiness() {
        let mut fds = [0; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        let (rx, tx) = (fds[0], fds[1]);

        assert!(!wait_readable(rx, Duration::from_millis(10)).unwrap());

        let byte = 1u8;
        assert_eq!(
            unsafe { libc::write(tx, &byte as *const u8 as *const libc::c_void, 1) },
            1
        );
        assert!(wait_readable(rx, Duration::from_millis(10)).unwrap());

        unsafe {
            libc::close(rx);
            libc::close(tx);
        }
    }
}
