use crate::{
    args::{Args, validate_args},
    ingress::CheckpointIngress,
    requests::{PeerRequest, RequestQueue},
};
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::{fs, path::PathBuf, process::exit, sync::Arc, time::Duration};
use tangle_consensus::{
    consensus::Consensus,
    model::stores::{checkpoints::DbCheckpointStore, entries::DbTangleStore},
};
use tangle_consensus_core::checkpoint::MarkerHandle;
use tangle_core::{
    core::{Core, EXIT_CODE_DATABASE_VERSION_MISMATCH, EXIT_CODE_ERROR},
    error, info,
};
use tangle_notify::bus::EventBus;
use tangle_storagemanager::{
    StorageConfig, StorageError, StorageManager, maintenance::MaintenanceService, service::StorageService,
};

pub const DESIRED_DAEMON_SOFT_FD_LIMIT: u64 = 4 * 1024;
pub const MINIMUM_DAEMON_SOFT_FD_LIMIT: u64 = 1024;

const NETWORK_DIR: &str = "mainnet";
const DEFAULT_DATA_DIR: &str = "database";
const DEFAULT_LOG_DIR: &str = "logs";
const CHECKPOINT_CACHE_SIZE: u64 = 1024;
const ENTRY_CACHE_SIZE: u64 = 100_000;

fn get_home_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    return dirs::data_local_dir().unwrap_or_default();
    #[cfg(not(target_os = "windows"))]
    return dirs::home_dir().unwrap_or_default();
}

/// Get the default application directory.
pub fn get_app_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    return get_home_dir().join("tangled");
    #[cfg(not(target_os = "windows"))]
    return get_home_dir().join(".tangled");
}

fn expand_home(path: &str) -> String {
    path.replace('~', &get_home_dir().to_string_lossy())
}

fn get_user_approval_or_exit(message: &str, approve: bool) {
    if approve {
        return;
    }
    println!("{}", message);
    let mut input = String::new();
    match std::io::stdin().read_line(&mut input) {
        Ok(_) => {
            let lower = input.to_lowercase();
            let answer = lower.as_str().strip_suffix("\r\n").or(lower.as_str().strip_suffix('\n')).unwrap_or(lower.as_str());
            if answer == "y" || answer == "yes" {
                // return
            } else {
                println!("Operation was rejected ({}), exiting..", answer);
                exit(EXIT_CODE_ERROR);
            }
        }
        Err(error) => {
            println!("Error reading from console: {error}, exiting..");
            exit(EXIT_CODE_ERROR);
        }
    }
}

/// Get the application directory from the supplied [`Args`].
pub fn get_app_dir_from_args(args: &Args) -> PathBuf {
    let app_dir = args.appdir.as_deref().map(expand_home).unwrap_or_default();
    if app_dir.is_empty() { get_app_dir() } else { PathBuf::from(app_dir) }
}

/// Get the database directory from the supplied [`Args`].
pub fn get_db_dir(args: &Args) -> PathBuf {
    match args.db_path.as_deref().map(expand_home) {
        Some(db_path) if !db_path.is_empty() => PathBuf::from(db_path),
        _ => get_app_dir_from_args(args).join(NETWORK_DIR).join(DEFAULT_DATA_DIR),
    }
}

/// Get the log directory from the supplied [`Args`].
pub fn get_log_dir(args: &Args) -> Option<String> {
    if args.no_log_files {
        return None;
    }
    let log_dir = args.logdir.as_deref().map(expand_home).unwrap_or_default();
    let log_dir = if log_dir.is_empty() {
        get_app_dir_from_args(args).join(NETWORK_DIR).join(DEFAULT_LOG_DIR)
    } else {
        PathBuf::from(log_dir)
    };
    log_dir.to_str().map(String::from)
}

/// Runtime configuration struct for the application.
#[derive(Default)]
pub struct Runtime {
    log_dir: Option<String>,
}

impl Runtime {
    pub fn from_args(args: &Args) -> Self {
        // Configure the panic behavior
        tangle_core::panic::configure_panic();

        let log_dir = get_log_dir(args);

        // Initialize the logger
        if let Err(err) = tangle_core::log::init_logger(log_dir.as_deref(), &args.log_level) {
            println!("Cannot initialize the logger: {}", err);
            exit(EXIT_CODE_ERROR);
        }

        Self { log_dir }
    }
}

/// Endpoints of the node toward the external network layers. They must stay alive
/// while the core is running.
pub struct NodeHandles {
    /// Validated checkpoint markers are sent here
    pub checkpoints: Sender<MarkerHandle>,
    /// Ancestor and entry requests for the peer layer
    pub peer_requests: Receiver<PeerRequest>,
    /// Entries delivered by the peer layer are inserted here
    pub tangle: Arc<DbTangleStore>,
    pub bus: Arc<EventBus>,
}

/// Create [`Core`] instance with supplied [`Args`].
/// This function will automatically create a [`Runtime`]
/// instance with the supplied [`Args`] and then
/// call [`create_core_with_runtime`].
pub fn create_core(args: Args, fd_total_budget: i32) -> (Arc<Core>, NodeHandles) {
    let rt = Runtime::from_args(&args);
    create_core_with_runtime(&rt, &args, fd_total_budget)
}

/// Create [`Core`] instance with supplied [`Args`] and [`Runtime`].
///
/// Services are bound so that the storage is stopped last, once consensus and the
/// checkpoint ingress have stopped writing.
pub fn create_core_with_runtime(runtime: &Runtime, args: &Args, fd_total_budget: i32) -> (Arc<Core>, NodeHandles) {
    // Make sure args forms a valid set of properties
    if let Err(err) = validate_args(args) {
        println!("{}", err);
        exit(EXIT_CODE_ERROR);
    }

    let app_dir = get_app_dir_from_args(args);
    let db_dir = get_db_dir(args);

    // Print package name and version
    info!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    info!("Application directory: {}", app_dir.display());
    info!("Data directory: {}", db_dir.display());
    match runtime.log_dir.as_ref() {
        Some(s) => {
            info!("Logs directory: {}", s);
        }
        None => {
            info!("Logs to console only");
        }
    }

    if args.reset_db && db_dir.exists() {
        let msg = "Reset DB was requested -- this means the current database will be fully deleted, 
do you confirm? (answer y/n or pass --yes to the tangled command line to confirm all interactive questions)";
        get_user_approval_or_exit(msg, args.yes);
        info!("Deleting database");
        if let Err(err) = fs::remove_dir_all(&db_dir) {
            error!("Cannot delete {}: {}", db_dir.display(), err);
            exit(EXIT_CODE_ERROR);
        }
    }

    let bus = Arc::new(EventBus::new());
    let storage_config = StorageConfig {
        profile: args.db_profile,
        parallelism: args.db_parallelism,
        debug_log: args.db_debug_log,
        files_limit: fd_total_budget,
        memory_reclaimer: Some(tangle_alloc::reclaim_memory),
        ..StorageConfig::new(db_dir)
    };
    let storage = match StorageManager::open(storage_config, bus.clone()) {
        Ok(storage) => Arc::new(storage),
        Err(err @ StorageError::VersionMismatch { .. }) => {
            error!("{}", err);
            exit(EXIT_CODE_DATABASE_VERSION_MISMATCH);
        }
        Err(err) => {
            error!("Cannot open the database: {}", err);
            exit(EXIT_CODE_ERROR);
        }
    };

    // Reclaim the space left behind by the previous run. Failures are logged by the collector.
    let _ = storage.gc().run_full_garbage_collection(args.startup_gc_discard_ratio);

    let checkpoint_store = Arc::new(DbCheckpointStore::new(storage.db().clone(), CHECKPOINT_CACHE_SIZE));
    let tangle = Arc::new(DbTangleStore::new(storage.db().clone(), ENTRY_CACHE_SIZE));
    let (request_queue, peer_requests) = RequestQueue::new();
    let consensus = match Consensus::new(checkpoint_store, tangle.clone(), Arc::new(request_queue), bus.clone()) {
        Ok(consensus) => Arc::new(consensus),
        Err(err) => {
            error!("Cannot load the consensus state: {}", err);
            exit(EXIT_CODE_ERROR);
        }
    };

    let (checkpoints, checkpoint_receiver) = unbounded();
    let storage_service = Arc::new(StorageService::new(storage.clone()));
    let maintenance_service = Arc::new(MaintenanceService::new(storage.gc().clone(), Duration::from_secs(args.db_gc_interval)));
    let ingress = Arc::new(CheckpointIngress::new(consensus.clone(), checkpoint_receiver));

    let core = Arc::new(Core::new());
    core.bind(storage_service);
    core.bind(maintenance_service);
    core.bind(consensus);
    core.bind(ingress);

    (core, NodeHandles { checkpoints, peer_requests, tangle, bus })
}
