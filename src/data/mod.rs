mod cache;
mod error;
mod network;
mod request;

pub use cache::CacheStorage;
pub use error::{
    ActivateError, CacheError, FetchError, InstallError, NetworkError, RegistrationError,
};
pub use network::Network;
pub use request::{Request, Response};
