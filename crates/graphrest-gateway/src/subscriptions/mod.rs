//! Webhook-driven GraphQL subscriptions.

mod delivery;
mod manager;

pub use delivery::WebhookDelivery;
pub use manager::{StartEvent, StartOutcome, SubscriptionManager, UpdateEvent};
