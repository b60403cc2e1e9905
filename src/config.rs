use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Gradian";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default port for the local API server.
pub const DEFAULT_API_PORT: u16 = 7871;

/// Get the application data directory
/// ~/Gradian/ on all platforms (user-visible, next to the user's documents)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Gradian")
}

/// Path of the SQLite database file
pub fn database_path() -> PathBuf {
    app_data_dir().join("gradian.db")
}

/// Default tracing filter when RUST_LOG is not set
pub fn default_log_filter() -> String {
    "info,gradian=debug".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("Gradian"));
    }

    #[test]
    fn database_under_app_data() {
        let db = database_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("gradian.db"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }
}
