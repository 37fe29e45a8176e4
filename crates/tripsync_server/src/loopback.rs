//! In-process endpoint for the engine's loopback HTTP client.

use crate::server::SyncServer;
use tripsync_engine::{HttpError, LoopbackServer};

impl LoopbackServer for SyncServer {
    fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, HttpError> {
        SyncServer::handle_post(self, path, body)
            .map_err(|e| HttpError::status(e.status_code(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::{ServerConfig, SyncServer};
    use std::sync::Arc;
    use tripsync_engine::{
        HttpClient, HttpTransport, LoopbackClient, LoopbackServer, SyncConfig, SyncTransport,
    };
    use tripsync_protocol::{RecordEnvelope, RecordKind, Timestamp, PUSH_PATH};
    use uuid::Uuid;

    fn envelope(ts: i64) -> RecordEnvelope {
        RecordEnvelope::new(
            RecordKind::Place,
            Uuid::new_v4(),
            Timestamp::from_millis(ts),
            vec![ts as u8],
        )
    }

    #[test]
    fn shared_server_round_trip() {
        let server = Arc::new(SyncServer::new(ServerConfig::new().with_max_pull_batch(2)));
        let config = SyncConfig::new(Uuid::new_v4(), "loopback://").with_pull_page_size(2);
        let transport = HttpTransport::new(&config, LoopbackClient::new(Arc::clone(&server)));

        transport.push(&[envelope(1), envelope(2), envelope(3)]).unwrap();
        assert_eq!(server.store().len(), 3);

        let pulled = transport.pull(Some(Timestamp::from_millis(1))).unwrap();
        assert_eq!(pulled.len(), 2);
    }

    #[test]
    fn server_errors_keep_their_status() {
        let server = SyncServer::new(ServerConfig::default());

        let err = LoopbackServer::handle_post(&server, "/sync/unknown", &[]).unwrap_err();
        assert_eq!(err.status, Some(404));
        assert!(!err.is_retryable());

        let err = LoopbackServer::handle_post(&server, PUSH_PATH, &[0xFF]).unwrap_err();
        assert_eq!(err.status, Some(400));
    }

    #[test]
    fn unhealthy_client_never_reaches_the_server() {
        let server = Arc::new(SyncServer::new(ServerConfig::default()));
        let client = LoopbackClient::new(Arc::clone(&server));
        client.set_healthy(false);

        let err = client.post("loopback://sync/push", Vec::new()).unwrap_err();
        assert_eq!(err.status, None);
        assert!(server.store().is_empty());
    }
}
