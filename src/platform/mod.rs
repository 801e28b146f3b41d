//! Platform-specific process probes

#[cfg(unix)]
mod unix;

#[cfg(windows)]
mod windows;

/// Check if a process is running
pub fn is_process_running(pid: u32) -> bool {
    #[cfg(unix)]
    {
        unix::is_process_running(pid)
    }
    #[cfg(windows)]
    {
        windows::is_process_running(pid)
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = pid;
        false
    }
}
