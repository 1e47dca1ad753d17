pub mod modules;

pub use modules::{
    analysis, api, auth, config, credentials, error, playback, protocol, refresh, store, transport,
};
