/// Request-rate scheduler consulted before every fetch.
///
/// `wait_turn` resolves once the next request may be issued. It must be
/// cancel-safe: dropping the future gives up the turn without consuming it.
#[async_trait::async_trait]
pub trait Pacer: Send + Sync {
    async fn wait_turn(&self);
}
