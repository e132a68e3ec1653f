extern crate tangle_alloc;

use std::sync::Arc;

use tangle_core::{info, signals::Signals};
use tangle_utils::fd_budget;
use tangled_lib::{
    args::parse_args,
    daemon::{DESIRED_DAEMON_SOFT_FD_LIMIT, MINIMUM_DAEMON_SOFT_FD_LIMIT, create_core},
};

pub fn main() {
    let args = parse_args();

    match fd_budget::try_set_fd_limit(DESIRED_DAEMON_SOFT_FD_LIMIT) {
        Ok(limit) => {
            if limit < MINIMUM_DAEMON_SOFT_FD_LIMIT {
                println!("Current OS file descriptor limit (soft FD limit) is set to {limit}");
                println!("The tangled node requires a setting of at least {DESIRED_DAEMON_SOFT_FD_LIMIT} to operate properly.");
                println!("Please increase the limits using the following command:");
                println!("ulimit -n {DESIRED_DAEMON_SOFT_FD_LIMIT}");
            }
        }
        Err(err) => {
            println!("Unable to initialize the necessary OS file descriptor limit (soft FD limit) to: {}", err);
            println!("The tangled node requires a setting of at least {DESIRED_DAEMON_SOFT_FD_LIMIT} to operate properly.");
        }
    }

    // Keep a few descriptors for logs and sockets
    let fd_total_budget = (fd_budget::limit().saturating_sub(32).min(i32::MAX as u64) as i32).max(64);
    let (core, _handles) = create_core(args, fd_total_budget);

    // Bind the keyboard signal to the core
    Arc::new(Signals::new(&core)).init();

    let exit_code = core.run();
    info!("tangled has stopped with exit code {}", exit_code);
    std::process::exit(exit_code);
}
