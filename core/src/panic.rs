use crate::{core::EXIT_CODE_ERROR, error};
use std::{any::Any, panic, process, thread};

/// Extracts the human readable part of a panic payload
pub fn payload_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "Box<dyn Any>"
    }
}

/// Installs a panic hook terminating the node with [`EXIT_CODE_ERROR`].
///
/// A panicking worker leaves the checkpoint state in an unknown condition, so the
/// process is not allowed to keep serving. Log appenders are flushed before exiting.
pub fn configure_panic() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown location".to_string());
        let current_thread = thread::current();
        let thread_name = current_thread.name().unwrap_or("<unnamed>");
        error!("worker '{}' panicked at {}: {}", thread_name, location, payload_message(panic_info.payload()));
        log::logger().flush();
        default_hook(panic_info);
        eprintln!("Exiting with code {}", EXIT_CODE_ERROR);
        process::exit(EXIT_CODE_ERROR);
    }));
}
