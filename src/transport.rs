//! Maps HTTP client failures into the crate's error taxonomy.

// crates.io
use oauth2::HttpClientError;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransientError, TransportError},
	http::ResponseMetadata,
};

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a crate error.
	fn map_transport_error(
		&self,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => map_generic_transport_error(meta, message),
			_ => map_unknown_transport_error(meta),
		}
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(meta: Option<&ResponseMetadata>, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::Endpoint {
			message: "Request timed out while calling the Graph API".into(),
			status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
		}
		.into();
	}

	TransportError::from(err).into()
}

/// Wraps a free-form client failure as a retryable endpoint error.
pub fn map_generic_transport_error(meta: Option<&ResponseMetadata>, message: impl Display) -> Error {
	TransientError::Endpoint {
		message: format!("HTTP client error occurred while calling the Graph API: {message}"),
		status: meta_status(meta),
	}
	.into()
}

fn map_unknown_transport_error(meta: Option<&ResponseMetadata>) -> Error {
	TransientError::Endpoint {
		message: "HTTP client error occurred while calling the Graph API".into(),
		status: meta_status(meta),
	}
	.into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}
