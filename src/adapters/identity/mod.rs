//! Identity-provider webhooks (svix-signed) that keep local users in sync.

pub mod webhook;
