//! Message I/O — outbound WhatsApp delivery and the inbound webhook.

pub mod webhook;
pub mod whatsapp;

pub use webhook::webhook_routes;
pub use whatsapp::{normalize_identity, Notifier, TwilioNotifier};
