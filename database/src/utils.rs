use crate::prelude::{DB, delete_db};
use std::sync::Weak;
use tempfile::TempDir;

/// Destroys the underlying database once dropped, test use only
#[derive(Default)]
pub struct DbLifetime {
    weak_db_ref: Weak<DB>,
    optional_tempdir: Option<TempDir>,
}

impl DbLifetime {
    pub fn new(tempdir: TempDir, weak_db_ref: Weak<DB>) -> Self {
        Self { optional_tempdir: Some(tempdir), weak_db_ref }
    }
}

impl Drop for DbLifetime {
    fn drop(&mut self) {
        for _ in 0..16 {
            if self.weak_db_ref.strong_count() > 0 {
                // Some background threads may still hold a reference, wait a bit
                std::thread::sleep(std::time::Duration::from_millis(50));
            } else {
                break;
            }
        }
        if self.weak_db_ref.strong_count() > 0 {
            eprintln!("DbLifetime: database is still referenced while being destroyed");
        }
        if let Some(dir) = self.optional_tempdir.take() {
            let path = dir.path().to_owned();
            let _ = delete_db(&path);
            drop(dir);
        }
    }
}

pub fn get_tangle_tempdir() -> TempDir {
    let global_tempdir = std::env::temp_dir();
    let tangle_tempdir = global_tempdir.join("tangle-node");
    std::fs::create_dir_all(tangle_tempdir.as_path()).expect("cannot create the temp directory");
    tempfile::tempdir_in(tangle_tempdir.as_path()).expect("cannot create a temp database directory")
}

/// Creates a DB within a temp directory under `<OS SPECIFIC TEMP DIR>/tangle-node`.
/// Callers must keep the returned `DbLifetime` alive for as long as the DB is used.
#[macro_export]
macro_rules! create_temp_db {
    ($conn_builder: expr) => {{
        let db_tempdir = $crate::utils::get_tangle_tempdir();
        let db_path = db_tempdir.path().to_owned();
        let db = $conn_builder.with_db_path(db_path).build().unwrap();
        ($crate::utils::DbLifetime::new(db_tempdir, std::sync::Arc::downgrade(&db)), db)
    }};
}
