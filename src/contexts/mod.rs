mod registration;
mod static_asset_cache;

pub use registration::{ClientId, RegisterOutcome, Registration};
pub use static_asset_cache::{
    ActivateOutcome, FetchOutcome, InstallOutcome, ResponseSource, StaticAssetCache,
};
