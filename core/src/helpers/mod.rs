mod felt;
mod hex;

pub use felt::{
    decode_short_string, format_felt, parse_felt, selector_hex, split_uint256, starknet_keccak,
    uint256_from_limbs,
};
pub use hex::{hex_eq, is_hex_string, normalize_hex};
use std::path::Path;

use dotenv::{dotenv, from_path};
use tracing::debug;

/// Loads the `.env` sitting next to the manifest, falling back to the working directory.
pub fn load_env_from_manifest_dir(manifest_path: &Path) {
    let env_path = manifest_path.parent().map(|dir| dir.join(".env"));

    match env_path {
        Some(path) if path.exists() => {
            if let Err(e) = from_path(&path) {
                debug!("Could not load env file {}: {}", path.display(), e);
            }
        }
        _ => {
            dotenv().ok();
        }
    }
}

/// Makes an identity safe to use as part of a file name.
pub fn sanitize_identity(identity: &str) -> String {
    identity
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
