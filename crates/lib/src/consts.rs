/// Directory name used under the platform's config and data directories.
pub const APP_NAME: &str = "brewkit";

/// File name of the user configuration inside [`crate::platform::paths::config_dir`].
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Directory under the data directory where packages get their own prefix.
pub const CELLAR_DIR_NAME: &str = "cellar";
