use thiserror::Error;

/// Problems with the acquisition metadata record itself. These are data errors and
/// are reported straight back to the caller.
#[derive(Debug,Error)]
pub enum MetadataFieldError {
    #[error("metadata field '{key}' is missing")]
    Missing {
        key:String,
    },

    #[error("metadata field '{key}' is malformed: expected {expected}")]
    Malformed {
        key:String,
        expected:&'static str,
    },

    #[error("cannot parse roi group json: {0}")]
    RoiJson(#[from] serde_json::Error),
}

impl MetadataFieldError {
    pub fn missing(key:&str) -> Self {
        MetadataFieldError::Missing {key:key.to_string()}
    }

    pub fn malformed(key:&str,expected:&'static str) -> Self {
        MetadataFieldError::Malformed {key:key.to_string(),expected}
    }

    /// the metadata key this error refers to, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            MetadataFieldError::Missing {key} => Some(key),
            MetadataFieldError::Malformed {key,..} => Some(key),
            MetadataFieldError::RoiJson(_) => None,
        }
    }
}
