use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use russh::{MethodSet, SshId};
use russh_keys::key::KeyPair;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::handler::{Capture, DecoySession};

/// Load the decoy host identity. Without it every restart would present a
/// new fingerprint, so a missing key is fatal.
pub fn load_host_key(path: &Path) -> anyhow::Result<KeyPair> {
    russh_keys::load_secret_key(path, None)
        .with_context(|| format!("failed to load host key {}", path.display()))
}

pub fn ssh_config(cfg: &Config, host_key: KeyPair) -> russh::server::Config {
    russh::server::Config {
        server_id: SshId::Standard(cfg.banner.clone()),
        methods: MethodSet::PASSWORD,
        // the capture delay already stalls each rejection
        auth_rejection_time: Duration::ZERO,
        inactivity_timeout: Some(cfg.inactivity_timeout()),
        keys: vec![host_key],
        ..Default::default()
    }
}

pub async fn bind(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %listener.local_addr()?, "listening");
    Ok(listener)
}

/// Accept connections forever, one task per connection.
pub async fn serve(
    listener: TcpListener,
    config: Arc<russh::server::Config>,
    capture: Arc<Capture>,
) -> anyhow::Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "accept failed");
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };
        let config = config.clone();
        let handler = DecoySession::new(peer, capture.clone());
        tokio::spawn(async move {
            debug!(%peer, "connection accepted");
            let result = match russh::server::run_stream(config, stream, handler).await {
                Ok(session) => session.await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                debug!(%peer, error = %e, "session ended");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use common::parse_record;
    use tokio::sync::mpsc;

    use crate::geo::Enricher;
    use crate::recorder::Recorder;

    fn fixture_key() -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata").join("host_ed25519")
    }

    struct TrustingClient;

    #[async_trait]
    impl russh::client::Handler for TrustingClient {
        type Error = russh::Error;

        async fn check_server_key(
            &mut self,
            _server_public_key: &russh_keys::key::PublicKey,
        ) -> Result<bool, Self::Error> {
            Ok(true)
        }
    }

    #[test]
    fn missing_host_key_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_host_key(&dir.path().join("id_rsa")).unwrap_err();
        assert!(err.to_string().contains("failed to load host key"));
    }

    #[test]
    fn config_advertises_password_only() {
        let cfg = Config::default();
        let ssh = ssh_config(&cfg, load_host_key(&fixture_key()).unwrap());
        assert_eq!(ssh.methods, MethodSet::PASSWORD);
        assert_eq!(ssh.keys.len(), 1);
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let first = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let taken = first.local_addr().unwrap();
        let err = bind(taken).await.unwrap_err();
        assert!(err.to_string().contains("failed to bind"));
    }

    #[tokio::test]
    async fn password_login_is_recorded_and_refused() {
        let cfg = Config::default();
        let ssh = Arc::new(ssh_config(&cfg, load_host_key(&fixture_key()).unwrap()));
        let (feed_tx, mut feed_rx) = mpsc::unbounded_channel();
        let (fatal_tx, _fatal_rx) = mpsc::unbounded_channel();
        let capture = Arc::new(Capture::new(
            Enricher::new(None, cfg.loopback_substitute),
            Arc::new(Recorder::new(tokio::io::sink(), Some(feed_tx), fatal_tx)),
            Duration::ZERO,
        ));
        let listener = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve(listener, ssh, capture));

        let client_cfg = Arc::new(russh::client::Config::default());
        let mut session = russh::client::connect(client_cfg, addr, TrustingClient).await.unwrap();
        let authenticated = session.authenticate_password("admin", "123456").await.unwrap();
        assert!(!authenticated);

        let attempt = parse_record(&feed_rx.recv().await.unwrap()).unwrap();
        assert_eq!(attempt.username, "admin");
        assert_eq!(attempt.password, "123456");
        assert_eq!(attempt.source_address, "127.0.0.1");
        assert!(attempt.location.is_unknown());

        server.abort();
    }
}
