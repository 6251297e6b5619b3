//! Context options
//!
//! Native defaults resolved from a context's `Env` during initialization.
//! Keys live under the `nfi.` prefix; anything else in the env belongs to
//! other languages and is ignored.

use crate::error::{NfiError, NfiResult};
use raya_nfi_spi::Env;

/// Option key for the library consulted when a symbol has no explicit library
pub const DEFAULT_LIBRARY_KEY: &str = "nfi.default_library";
/// Option key for loading libraries into a private namespace
pub const ISOLATED_NAMESPACE_KEY: &str = "nfi.isolated_namespace";
/// Option key for the comma separated list of libraries to preload
pub const PRELOAD_KEY: &str = "nfi.preload";

const OPTION_PREFIX: &str = "nfi.";

/// Library name meaning "the process's global symbol scope"
pub const GLOBAL_SCOPE: &str = "<default>";

/// Per-context native defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfiOptions {
    /// Library searched for unqualified symbols
    pub default_library: String,

    /// Load libraries into an isolated namespace
    pub isolated_namespace: bool,

    /// Libraries the backend should load up front
    pub preload: Vec<String>,
}

impl Default for NfiOptions {
    fn default() -> Self {
        Self {
            default_library: GLOBAL_SCOPE.to_string(),
            isolated_namespace: false,
            preload: Vec::new(),
        }
    }
}

impl NfiOptions {
    /// Resolve options from `env`, rejecting malformed or unknown `nfi.` keys
    pub fn from_env(env: &Env) -> NfiResult<Self> {
        let mut options = Self::default();

        // Validate in key order
        let mut entries: Vec<(&str, &str)> = env
            .options()
            .filter(|(key, _)| key.starts_with(OPTION_PREFIX))
            .collect();
        entries.sort_unstable_by_key(|(key, _)| *key);

        for (key, value) in entries {
            match key {
                DEFAULT_LIBRARY_KEY => {
                    let value = value.trim();
                    if value.is_empty() {
                        return Err(NfiError::InitializationFailure(format!(
                            "{} must not be empty",
                            DEFAULT_LIBRARY_KEY
                        )));
                    }
                    options.default_library = value.to_string();
                }
                ISOLATED_NAMESPACE_KEY => {
                    options.isolated_namespace = parse_bool(key, value)?;
                }
                PRELOAD_KEY => {
                    options.preload = parse_list(key, value)?;
                }
                _ => {
                    return Err(NfiError::InitializationFailure(format!(
                        "unknown option '{}'",
                        key
                    )));
                }
            }
        }

        Ok(options)
    }
}

fn parse_bool(key: &str, value: &str) -> NfiResult<bool> {
    match value.trim() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(NfiError::InitializationFailure(format!(
            "{} expects a boolean, got '{}'",
            key, other
        ))),
    }
}

fn parse_list(key: &str, value: &str) -> NfiResult<Vec<String>> {
    if value.trim().is_empty() {
        return Ok(Vec::new());
    }
    value
        .split(',')
        .map(|item| {
            let item = item.trim();
            if item.is_empty() {
                Err(NfiError::InitializationFailure(format!(
                    "{} contains an empty library name",
                    key
                )))
            } else {
                Ok(item.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_options() {
        let options = NfiOptions::from_env(&Env::new()).unwrap();
        assert_eq!(options, NfiOptions::default());
        assert_eq!(options.default_library, GLOBAL_SCOPE);
    }

    #[test]
    fn test_all_options() {
        let env = Env::builder()
            .option(DEFAULT_LIBRARY_KEY, " libc.so.6 ")
            .option(ISOLATED_NAMESPACE_KEY, "yes")
            .option(PRELOAD_KEY, "libm.so.6, libz.so.1")
            .option("js.strict", "true")
            .build();
        let options = NfiOptions::from_env(&env).unwrap();
        assert_eq!(options.default_library, "libc.so.6");
        assert!(options.isolated_namespace);
        assert_eq!(options.preload, vec!["libm.so.6", "libz.so.1"]);
    }

    #[test]
    fn test_empty_default_library() {
        let env = Env::builder().option(DEFAULT_LIBRARY_KEY, "  ").build();
        assert!(matches!(
            NfiOptions::from_env(&env),
            Err(NfiError::InitializationFailure(_))
        ));
    }

    #[test]
    fn test_bad_boolean() {
        let env = Env::builder().option(ISOLATED_NAMESPACE_KEY, "maybe").build();
        let err = NfiOptions::from_env(&env).unwrap_err();
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn test_empty_preload_entry() {
        let env = Env::builder().option(PRELOAD_KEY, "libm.so.6,,").build();
        assert!(NfiOptions::from_env(&env).is_err());

        let env = Env::builder().option(PRELOAD_KEY, "").build();
        assert!(NfiOptions::from_env(&env).unwrap().preload.is_empty());
    }

    #[test]
    fn test_unknown_nfi_key() {
        let env = Env::builder().option("nfi.search_path", "/opt").build();
        let err = NfiOptions::from_env(&env).unwrap_err();
        assert_eq!(
            err,
            NfiError::InitializationFailure("unknown option 'nfi.search_path'".to_string())
        );
    }

    #[test]
    fn test_first_invalid_key_in_order_is_reported() {
        let env = Env::builder()
            .option("nfi.zzz", "1")
            .option(PRELOAD_KEY, ",")
            .option(ISOLATED_NAMESPACE_KEY, "maybe")
            .option("nfi.aaa", "1")
            .build();
        for _ in 0..8 {
            assert_eq!(
                NfiOptions::from_env(&env),
                Err(NfiError::InitializationFailure(
                    "unknown option 'nfi.aaa'".to_string()
                ))
            );
        }

        let env = Env::builder()
            .option(PRELOAD_KEY, ",")
            .option(ISOLATED_NAMESPACE_KEY, "maybe")
            .build();
        let err = NfiOptions::from_env(&env).unwrap_err();
        assert!(err.to_string().contains(ISOLATED_NAMESPACE_KEY));
    }
}
