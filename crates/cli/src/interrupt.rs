//! Ctrl-C handling for `gridseries run`.
//!
//! The first SIGINT only raises the run's cancel token, so the series being
//! merged finishes and the store is still saved. The handler then restores
//! the default action, so a second SIGINT kills the process.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, OnceLock};

use gridseries_recon::CancelToken;

static TOKEN: OnceLock<CancelToken> = OnceLock::new();

/// Install the SIGINT handler (unix only) and return the token it raises.
pub fn install() -> CancelToken {
    let token = TOKEN.get_or_init(|| Arc::new(AtomicBool::new(false))).clone();

    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGINT, on_sigint as libc::sighandler_t);
    }

    token
}

#[cfg(unix)]
extern "C" fn on_sigint(_signal: libc::c_int) {
    if let Some(token) = TOKEN.get() {
        token.store(true, std::sync::atomic::Ordering::SeqCst);
    }
    unsafe {
        libc::signal(libc::SIGINT, libc::SIG_DFL);
    }
}
