//! Identity resolution seam
//!
//! The hub treats credentials as opaque: whatever scheme issued them, the
//! resolver either maps one to a stable [`UserId`] or fails. The hub calls
//! it exactly once per connection attempt, before registering anything.

use async_trait::async_trait;

use crate::{error::Result, id::UserId};

/// Maps a presented credential to a stable authenticated identity.
///
/// Must be idempotent and side-effect-free from the hub's perspective. Any
/// failure is terminal for that connection attempt.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, credential: &str) -> Result<UserId>;
}
