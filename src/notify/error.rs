#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeliveryError {
    #[error("Failed to deliver to {destination}: {message}")]
    DeliveryFailed { destination: u64, message: String },

    #[error("Destination {destination} is no longer reachable: {message}")]
    DestinationInvalid { destination: u64, message: String },
}

impl DeliveryError {
    pub fn is_destination_invalid(&self) -> bool {
        matches!(self, DeliveryError::DestinationInvalid { .. })
    }
}
