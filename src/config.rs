use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration loaded from environment variables.
///
/// Loaded once at startup and passed by `Arc` into the router state; nothing
/// reads the process environment after that point.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub scripts_dir: PathBuf,
    pub files_dir: PathBuf,
    pub max_files: usize,
    pub max_file_bytes: u64,
    /// Lower-cased, no leading dot.
    pub allowed_extensions: Vec<String>,
    pub max_args: usize,
    pub max_arg_length: usize,
    pub exec_timeout_s: u64,
    /// When false, responses carry only a status code and an empty body.
    pub verbose: bool,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults on missing or unparseable values.
    pub fn from_env() -> Self {
        let host = std::env::var("GATE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = std::env::var("GATE_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let scripts_dir = PathBuf::from(
            std::env::var("GATE_SCRIPTS_DIR").unwrap_or_else(|_| "./scripts".to_string()),
        );

        let files_dir = PathBuf::from(
            std::env::var("GATE_FILES_DIR").unwrap_or_else(|_| "./files".to_string()),
        );

        let max_files = std::env::var("GATE_MAX_FILES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let max_file_bytes = std::env::var("GATE_MAX_FILE_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1024 * 1024);

        let allowed_extensions = std::env::var("GATE_ALLOWED_EXTENSIONS")
            .map(|v| parse_extensions(&v))
            .ok()
            .filter(|exts| !exts.is_empty())
            .unwrap_or_else(default_extensions);

        let max_args = std::env::var("GATE_MAX_ARGS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(64);

        let max_arg_length = std::env::var("GATE_MAX_ARG_LENGTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1024);

        let exec_timeout_s = std::env::var("GATE_EXEC_TIMEOUT_S")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);

        let verbose = std::env::var("GATE_VERBOSE").as_deref() == Ok("1");

        Self {
            host,
            port,
            scripts_dir,
            files_dir,
            max_files,
            max_file_bytes,
            allowed_extensions,
            max_args,
            max_arg_length,
            exec_timeout_s,
            verbose,
        }
    }

    /// Deadline for a single script execution.
    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_s)
    }

    /// Request body cap: the worst-case upload batch plus headroom for the
    /// script/args fields and multipart framing.
    pub fn body_limit(&self) -> usize {
        (self.max_files as u64)
            .saturating_mul(self.max_file_bytes)
            .saturating_add(64 * 1024) as usize
    }
}

/// Split a comma-separated extension list, lower-casing and stripping any
/// leading dot so "Txt, .CSV" and "txt,csv" mean the same thing.
fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

fn default_extensions() -> Vec<String> {
    vec!["txt".to_string(), "csv".to_string(), "json".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            scripts_dir: PathBuf::from("./scripts"),
            files_dir: PathBuf::from("./files"),
            max_files: 10,
            max_file_bytes: 1024 * 1024,
            allowed_extensions: default_extensions(),
            max_args: 64,
            max_arg_length: 1024,
            exec_timeout_s: 300,
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
        ENV_LOCK.lock().unwrap()
    }

    fn clear_env() {
        for var in &[
            "GATE_HOST",
            "GATE_PORT",
            "GATE_SCRIPTS_DIR",
            "GATE_FILES_DIR",
            "GATE_MAX_FILES",
            "GATE_MAX_FILE_BYTES",
            "GATE_ALLOWED_EXTENSIONS",
            "GATE_MAX_ARGS",
            "GATE_MAX_ARG_LENGTH",
            "GATE_EXEC_TIMEOUT_S",
            "GATE_VERBOSE",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let _env = env_lock();
        clear_env();

        let cfg = Config::from_env();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.scripts_dir, PathBuf::from("./scripts"));
        assert_eq!(cfg.files_dir, PathBuf::from("./files"));
        assert_eq!(cfg.max_files, 10);
        assert_eq!(cfg.max_file_bytes, 1024 * 1024);
        assert_eq!(cfg.allowed_extensions, vec!["txt", "csv", "json"]);
        assert_eq!(cfg.max_args, 64);
        assert_eq!(cfg.max_arg_length, 1024);
        assert_eq!(cfg.exec_timeout_s, 300);
        assert!(!cfg.verbose);
    }

    /// NOTE: env-var tests are inherently racy when run in parallel since the
    /// process environment is global shared state.  Every test takes the env
    /// lock and keeps its set/read/clear window as narrow as possible.

    #[test]
    fn test_custom_dirs() {
        let _env = env_lock();
        std::env::set_var("GATE_SCRIPTS_DIR", "/srv/scripts");
        std::env::set_var("GATE_FILES_DIR", "/srv/uploads");
        let cfg = Config::from_env();
        assert_eq!(cfg.scripts_dir, PathBuf::from("/srv/scripts"));
        assert_eq!(cfg.files_dir, PathBuf::from("/srv/uploads"));
        std::env::remove_var("GATE_SCRIPTS_DIR");
        std::env::remove_var("GATE_FILES_DIR");
    }

    #[test]
    fn test_custom_port() {
        let _env = env_lock();
        std::env::set_var("GATE_PORT", "9090");
        assert_eq!(Config::from_env().port, 9090);
        std::env::remove_var("GATE_PORT");
    }

    #[test]
    fn test_invalid_numeric_fields_use_defaults() {
        let _env = env_lock();
        std::env::set_var("GATE_PORT", "not-a-number");
        std::env::set_var("GATE_MAX_FILES", "");
        std::env::set_var("GATE_MAX_FILE_BYTES", "xyz");

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.max_files, 10);
        assert_eq!(cfg.max_file_bytes, 1024 * 1024);

        std::env::remove_var("GATE_PORT");
        std::env::remove_var("GATE_MAX_FILES");
        std::env::remove_var("GATE_MAX_FILE_BYTES");
    }

    #[test]
    fn test_extensions_normalized() {
        let _env = env_lock();
        std::env::set_var("GATE_ALLOWED_EXTENSIONS", " Txt, .CSV ,png,, .Json");
        let cfg = Config::from_env();
        assert_eq!(cfg.allowed_extensions, vec!["txt", "csv", "png", "json"]);
        std::env::remove_var("GATE_ALLOWED_EXTENSIONS");
    }

    #[test]
    fn test_empty_extension_list_uses_default() {
        let _env = env_lock();
        std::env::set_var("GATE_ALLOWED_EXTENSIONS", " , ,");
        let cfg = Config::from_env();
        assert_eq!(cfg.allowed_extensions, vec!["txt", "csv", "json"]);
        std::env::remove_var("GATE_ALLOWED_EXTENSIONS");
    }

    #[test]
    fn test_verbose_only_true_for_1() {
        let _env = env_lock();
        std::env::set_var("GATE_VERBOSE", "0");
        assert!(!Config::from_env().verbose);

        std::env::set_var("GATE_VERBOSE", "true");
        assert!(!Config::from_env().verbose);

        std::env::set_var("GATE_VERBOSE", "1");
        assert!(Config::from_env().verbose);

        std::env::remove_var("GATE_VERBOSE");
    }

    #[test]
    fn test_exec_timeout_duration() {
        let _env = env_lock();
        std::env::set_var("GATE_EXEC_TIMEOUT_S", "5");
        assert_eq!(Config::from_env().exec_timeout(), Duration::from_secs(5));
        std::env::remove_var("GATE_EXEC_TIMEOUT_S");
    }

    #[test]
    fn test_body_limit_scales_with_policy() {
        let cfg = Config {
            max_files: 4,
            max_file_bytes: 1000,
            ..Config::default()
        };
        assert_eq!(cfg.body_limit(), 4 * 1000 + 64 * 1024);
    }
}
