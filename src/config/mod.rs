pub mod settings;

use std::path::PathBuf;

/// Platform-specific app data directory
pub fn data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let mut dir = PathBuf::from(home);
            dir.push("Library/Application Support/com.forja.app");
            return dir;
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            let mut dir = PathBuf::from(appdata);
            dir.push("com.forja.app");
            return dir;
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let mut dir = PathBuf::from(home);
            dir.push(".local/share/com.forja.app");
            return dir;
        }
    }

    // Fallback
    PathBuf::from(".")
}

/// A file inside the app data directory
pub fn data_file(name: &str) -> PathBuf {
    data_dir().join(name)
}
