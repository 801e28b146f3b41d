//! Unix process probes

/// Check if a process exists.
///
/// `EPERM` means the process exists but belongs to another user.
pub fn is_process_running(pid: u32) -> bool {
    let pid = match libc::pid_t::try_from(pid) {
        Ok(pid) if pid > 0 => pid,
        _ => return false,
    };

    // kill with signal 0 checks if process exists without sending a signal
    let result = unsafe { libc::kill(pid, 0) };
    if result == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}
