//! Global allocator of the node binaries
//!
//! The `heap` feature leaves the system allocator in place so that heap profilers
//! can hook it.

#[cfg(not(feature = "heap"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Returns the memory freed since the last collection to the operating system.
///
/// Called after storage compactions, which release large transient buffers.
pub fn reclaim_memory() {
    #[cfg(not(feature = "heap"))]
    // SAFETY: mi_collect only walks the allocator's own heaps
    unsafe {
        libmimalloc_sys::mi_collect(true);
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_reclaim_after_large_release() {
        let buffers = (0..16).map(|i| vec![i as u8; 1 << 20]).collect::<Vec<_>>();
        assert_eq!(buffers.iter().map(|b| b.len()).sum::<usize>(), 16 << 20);
        drop(buffers);
        super::reclaim_memory();
    }
}
