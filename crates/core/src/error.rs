/// Domain-level error taxonomy.
///
/// The store and the pure domain logic only ever distinguish these kinds;
/// mapping them to HTTP status codes happens in the api crate.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// A `NotFound` for the device entity, the only entity this service has.
    pub fn device_not_found(id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: "device",
            id: id.into(),
        }
    }
}
