//! Environment-variable override layer, modeled on the teacher's
//! `EnvRegistry`/`EnvVarDef` pattern: a small, named set of overridable
//! knobs rather than ad-hoc `std::env::var` calls scattered through the
//! codebase.

use std::env;

/// One overridable environment variable: its name, and how to apply it to
/// a mutable config value.
pub struct EnvOverride {
    pub var_name: &'static str,
    pub description: &'static str,
}

/// The knobs in spec §6 that are meant to be environment-overridable.
pub const KNOWN_VARS: &[EnvOverride] = &[
    EnvOverride {
        var_name: "KG_WORKER_POOL_SIZE",
        description: "number of concurrent job-processing workers",
    },
    EnvOverride {
        var_name: "KG_SIMILARITY_THRESHOLD",
        description: "concept-match cosine similarity floor",
    },
    EnvOverride {
        var_name: "KG_VECTOR_TOP_K",
        description: "concept-match candidate count",
    },
    EnvOverride {
        var_name: "KG_CONFIG_PATH",
        description: "path to the TOML configuration file",
    },
];

/// Read an environment variable and parse it, returning `None` if unset;
/// logs a warning (via `tracing`) and returns `None` if set but unparsable,
/// so a malformed override never silently becomes a default.
pub fn parse_env<T: std::str::FromStr>(var_name: &str) -> Option<T> {
    match env::var(var_name) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(var = var_name, value = %raw, "ignoring unparsable env override");
                None
            }
        },
        Err(_) => None,
    }
}
