pub mod authenticator;
pub mod bootstrap;
mod client;
pub mod config;
pub mod errors;
pub mod navigation;
pub mod refresh;
pub mod request;
pub mod request_context;
mod session;
pub mod telemetry;
pub mod token;
pub mod types;

pub use client::{ApiClient, LOGOUT_PATH, ME_PATH, REISSUE_PATH};
pub use config::Config;
pub use errors::Error;
pub use navigation::{LogNavigator, Navigator, RecordingNavigator};
pub use request::{ApiRequest, FormPayload, RequestBody};
pub use session::Session;
pub use token::{Subscription, TokenStore};
pub use types::Profile;
