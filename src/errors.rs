/// All error types that can occur while driving a relative light group.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to serialize data to JSON.
    #[error("failed to dump json: {0:?}")]
    JsonDump(serde_json::Error),

    /// Failed to deserialize JSON data.
    #[error("failed to load json: {0:?}")]
    JsonLoad(serde_json::Error),

    /// The host rejected or failed a service call.
    #[error("service {service} for {targets:?} failed: {reason}")]
    Dispatch {
        service: String,
        targets: Vec<String>,
        reason: String,
    },

    /// The entity is not a child of this group.
    #[error("{0} is not a member of this group")]
    UnknownChild(String),
}

impl Error {
    /// Create a new dispatch error
    pub fn dispatch(service: &str, targets: &[String], reason: impl Into<String>) -> Self {
        Error::Dispatch {
            service: service.to_string(),
            targets: targets.to_vec(),
            reason: reason.into(),
        }
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
