//! Client identification
//!
//! Builds a stable, human readable client ID from an application prefix and
//! the local host context, so independent processes publishing under the same
//! namespace never collide:
//! `<prefix>-<short host>-h<7 hex digits of sha256(prefix, hostname, home)>`

use sha2::{Digest, Sha256};
use tracing::debug;

/// Length of the hash tag, leading `h` included.
const HASH_TAG_LEN: usize = 8;

/// Short host used when the hostname could not be determined.
const UNKNOWN_HOST: &str = "unknown";

/// Variable holding the user's home directory. Only the environment is
/// consulted, there is no fallback to the user database.
#[cfg(windows)]
const HOME_ENV: &str = "USERPROFILE";
#[cfg(not(windows))]
const HOME_ENV: &str = "HOME";

/// Client ID for `prefix` on this host and user.
///
/// Hostname and home directory lookups are best effort: a failure degrades to
/// an empty string and never aborts the derivation.
pub fn client_id(prefix: &str) -> String {
    let hostname = match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            debug!("hostname lookup failed, using empty hostname: {}", e);
            String::new()
        }
    };

    let home = home_from(std::env::var_os(HOME_ENV));
    if home.is_empty() {
        debug!("${} unset or empty, using empty home", HOME_ENV);
    }

    client_id_from(prefix, &hostname, &home)
}

/// Pure derivation behind [`client_id`].
pub fn client_id_from(prefix: &str, hostname: &str, home: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{prefix}\n{hostname}\n{home}\n").as_bytes());
    let digest = hex::encode(hasher.finalize());
    let tag = format!("h{}", &digest[..HASH_TAG_LEN - 1]);

    format!("{}-{}-{}", prefix, short_host(hostname), tag)
}

fn home_from(value: Option<std::ffi::OsString>) -> String {
    value
        .map(|home| home.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Hostname up to its first dot, or [`UNKNOWN_HOST`] when empty.
fn short_host(hostname: &str) -> &str {
    if hostname.is_empty() {
        return UNKNOWN_HOST;
    }
    hostname.split_once('.').map_or(hostname, |(host, _)| host)
}
