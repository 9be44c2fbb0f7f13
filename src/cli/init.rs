use std::path::PathBuf;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(data_dir: Option<String>, db_override: Option<&str>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    save_settings(&settings)?;

    let db_path = match db_override {
        Some(path) => PathBuf::from(shellexpand_path(path)),
        None => {
            let resolved = PathBuf::from(&settings.data_dir);
            std::fs::create_dir_all(&resolved)?;
            settings.db_path()
        }
    };

    let conn = get_connection(&db_path)?;
    init_db(&conn)?;

    println!("Initialized tally at {}", db_path.display());
    Ok(())
}
