//! Asset isolation for converted documents.
//!
//! A document's image references are first classified by [`resolve`] into
//! remote URLs (left alone) and local files. [`relocate`] then copies every
//! local file into the document's own asset folder, deduplicating identical
//! content by SHA-256 digest and renaming files whose names collide. The
//! resulting [`AssetMapping`] is what the renderer uses to rewrite image
//! sources.
//!
//! Asset folders are owned through [`OutputSlot`]s handed out by
//! [`SlotReservations`], so parallel conversions never write into the same
//! folder.

mod cancel;
mod digest;
mod placeholder;
mod relocator;
mod resolver;
mod slot;
mod warning;

pub use cancel::CancelToken;
pub use digest::ContentDigest;
pub use placeholder::{PLACEHOLDER_NAME, PLACEHOLDER_PNG};
pub use relocator::{AssetMapping, AssetRecord, RelocateError, Relocation, relocate};
pub use resolver::{AssetKind, AssetReference, is_remote, resolve};
pub use slot::{ASSETS_PREFIX, OutputSlot, PARTIAL_PREFIX, SlotReservations, folder_files};
pub use warning::{Warning, WarningKind};
