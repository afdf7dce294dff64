pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Extraction timed out after {timeout_ms} ms.")]
	Timeout { timeout_ms: u64 },
	#[error("Unusable extraction output: {message}")]
	Unusable { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<daygrid_providers::Error> for Error {
	fn from(err: daygrid_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<daygrid_document::Error> for Error {
	fn from(err: daygrid_document::Error) -> Self {
		match err {
			daygrid_document::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			other => Self::Storage { message: other.to_string() },
		}
	}
}
