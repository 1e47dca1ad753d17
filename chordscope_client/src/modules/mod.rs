pub mod analysis;
pub mod api;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod playback;
pub mod protocol;
pub mod refresh;
pub mod store;
pub mod transport;
