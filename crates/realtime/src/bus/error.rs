#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("subscription not found")]
    SubscriptionNotFound,
}
