//! Process-wide budget of file descriptors shared by the storage engines

use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static ACQUIRED_FD: AtomicU64 = AtomicU64::new(0);

/// A share of the descriptor budget, given back on drop
#[derive(Debug)]
pub struct FDGuard(u64);

impl FDGuard {
    pub fn acquired(&self) -> u64 {
        self.0
    }
}

impl Drop for FDGuard {
    fn drop(&mut self) {
        ACQUIRED_FD.fetch_sub(self.0, Ordering::SeqCst);
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[error("file descriptor budget exceeded, acquired: {acquired}, requested: {requested}, limit: {limit}")]
pub struct BudgetError {
    pub acquired: u64,
    pub requested: u64,
    pub limit: u64,
}

pub fn acquire_guard(value: u64) -> Result<FDGuard, BudgetError> {
    let limit = limit();
    ACQUIRED_FD
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |acquired| (acquired + value <= limit).then_some(acquired + value))
        .map(|_| FDGuard(value))
        .map_err(|acquired| BudgetError { acquired, requested: value, limit })
}

pub fn acquired() -> u64 {
    ACQUIRED_FD.load(Ordering::SeqCst)
}

/// The soft limit of open files of the process
pub fn limit() -> u64 {
    cfg_if::cfg_if! {
        if #[cfg(test)] {
            100
        } else if #[cfg(target_os = "windows")] {
            rlimit::getmaxstdio() as u64
        } else if #[cfg(unix)] {
            rlimit::getrlimit(rlimit::Resource::NOFILE).map(|(soft, _)| soft).unwrap_or(1024)
        } else {
            1024
        }
    }
}

/// Raises the soft limit of open files toward `target`, returning the resulting limit
pub fn try_set_fd_limit(target: u64) -> std::io::Result<u64> {
    cfg_if::cfg_if! {
        if #[cfg(target_os = "windows")] {
            Ok(rlimit::setmaxstdio(target as u32)?.into())
        } else if #[cfg(unix)] {
            rlimit::increase_nofile_limit(target)
        } else {
            Ok(target)
        }
    }
}
