//! CLI command implementations.

pub(crate) mod convert;
pub(crate) mod themes;

pub(crate) use convert::ConvertArgs;
pub(crate) use themes::ThemesArgs;
