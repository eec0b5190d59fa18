//! Client-side conversation and messaging core for the HomeVista
//! marketplace. The UI layer consumes this crate through
//! [`MessagingService`]: fetch results and push events funnel through one
//! reconciliation point, so the conversation list stays consistent no
//! matter which arrives first.

pub mod api;
pub mod config;
pub mod error;
pub mod messages;

pub use api::client::ApiClient;
pub use api::events::{LiveChannel, LiveSubscription};
pub use api::models::{Conversation, IncomingEvent, Message, MessageContent, PartyRef};
pub use config::Settings;
pub use error::{Error, Result};
pub use messages::selector::{Selection, Target};
pub use messages::service::MessagingService;
