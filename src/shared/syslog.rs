use std::ffi::CString;

// Destination for leveled daemon messages.
pub trait LogSink {
    fn info(&mut self, message: &str);
    fn error(&mut self, message: &str);
    fn close(&mut self);
}

// System log sink backed by openlog/syslog/closelog.
// The ident string must outlive the connection, so the sink owns it.
pub struct Syslog {
    _ident: CString,
    open: bool,
}

impl Syslog {
    // Open the system log with pid tagging and console fallback under the daemon facility.
    pub fn open(ident: &str) -> Self {
        let ident = to_c_message(ident);
        // SAFETY: `ident` is NUL-terminated and kept alive until closelog runs.
        unsafe {
            libc::openlog(
                ident.as_ptr(),
                libc::LOG_PID | libc::LOG_CONS,
                libc::LOG_DAEMON,
            )
        };
        Self {
            _ident: ident,
            open: true,
        }
    }

    fn emit(&self, priority: libc::c_int, message: &str) {
        if !self.open {
            return;
        }
        let message = to_c_message(message);
        // SAFETY: the message is passed as an argument to a constant "%s" format.
        unsafe { libc::syslog(priority, c"%s".as_ptr(), message.as_ptr()) };
    }
}

impl LogSink for Syslog {
    fn info(&mut self, message: &str) {
        self.emit(libc::LOG_INFO, message);
    }

    fn error(&mut self, message: &str) {
        self.emit(libc::LOG_ERR, message);
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            // SAFETY: closelog has no preconditions; `open` guarantees a single call.
            unsafe { libc::closelog() };
        }
    }
}

impl Drop for Syslog {
    // Close the log connection if the owner never did.
    fn drop(&mut self) {
        self.close();
    }
}

// Build a C string, dropping interior NUL bytes instead of failing.
fn to_c_message(text: &str) -> CString {
    let bytes: Vec<u8> = text.bytes().filter(|byte| *byte != 0).collect();
    CString::new(bytes).unwrap_or_default()
}
