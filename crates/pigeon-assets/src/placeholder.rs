//! Bundled image substituted for assets that cannot be relocated.

use std::sync::LazyLock;

use crate::digest::ContentDigest;

/// File name of the placeholder inside an asset folder.
pub const PLACEHOLDER_NAME: &str = "placeholder.png";

/// PNG bytes of the placeholder image.
pub static PLACEHOLDER_PNG: &[u8] = include_bytes!("../assets/placeholder.png");

pub(crate) static PLACEHOLDER_DIGEST: LazyLock<ContentDigest> =
    LazyLock::new(|| ContentDigest::of_bytes(PLACEHOLDER_PNG));
