/// Directory holding the per-archiver configuration directories.
pub(crate) const DEFAULT_CONFIG_DIR: &str = "/etc";
