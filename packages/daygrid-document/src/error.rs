#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Document not found: {0}")]
	NotFound(String),
	#[error("Invalid offset: {0}")]
	InvalidOffset(String),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Store rejected mutation: {0}")]
	Rejected(String),
	#[error("Store unavailable: {0}")]
	Unavailable(String),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
}
