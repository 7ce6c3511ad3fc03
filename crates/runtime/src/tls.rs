//! TLS setup for the loopback HTTPS and WSS endpoints.
//!
//! The local service presents a self-signed certificate, so both clients skip
//! chain validation. Handshake signatures are still checked.

use std::sync::Arc;
use std::time::Duration;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tokio_tungstenite::Connector;

use crate::error::{Error, Result};

/// HTTPS client that accepts the local certificate.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
	reqwest::Client::builder()
		.danger_accept_invalid_certs(true)
		.no_proxy()
		.timeout(timeout)
		.build()
		.map_err(|e| Error::Transport(format!("failed to build HTTPS client: {e}")))
}

/// WebSocket TLS connector that accepts the local certificate.
pub fn websocket_connector() -> Result<Connector> {
	let provider = Arc::new(rustls::crypto::ring::default_provider());
	let verifier = AcceptLocalCertificate {
		provider: provider.clone(),
	};

	let config = rustls::ClientConfig::builder_with_provider(provider)
		.with_safe_default_protocol_versions()
		.map_err(|e| Error::Transport(format!("failed to configure TLS: {e}")))?
		.dangerous()
		.with_custom_certificate_verifier(Arc::new(verifier))
		.with_no_client_auth();

	Ok(Connector::Rustls(Arc::new(config)))
}

#[derive(Debug)]
struct AcceptLocalCertificate {
	provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptLocalCertificate {
	fn verify_server_cert(
		&self,
		_end_entity: &CertificateDer<'_>,
		_intermediates: &[CertificateDer<'_>],
		_server_name: &ServerName<'_>,
		_ocsp_response: &[u8],
		_now: UnixTime,
	) -> std::result::Result<ServerCertVerified, rustls::Error> {
		Ok(ServerCertVerified::assertion())
	}

	fn verify_tls12_signature(
		&self,
		message: &[u8],
		cert: &CertificateDer<'_>,
		dss: &DigitallySignedStruct,
	) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
		verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
	}

	fn verify_tls13_signature(
		&self,
		message: &[u8],
		cert: &CertificateDer<'_>,
		dss: &DigitallySignedStruct,
	) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
		verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
	}

	fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
		self.provider.signature_verification_algorithms.supported_schemes()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builds_both_clients() {
		assert!(http_client(Duration::from_secs(1)).is_ok());
		assert!(matches!(websocket_connector(), Ok(Connector::Rustls(_))));
	}
}
