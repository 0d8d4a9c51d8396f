//! LightUpPi HTTP client.

use reqwest::Url;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use super::codec::{self, AlarmBatch, DecodeDefaults, EditAck};
use super::transport::HttpTransport;
use super::{SyncError, SyncResult};
use crate::config::{ServerConfig, TransportConfig};
use crate::models::{Alarm, RemoteId};

const PING: &str = "ping";
const GET_ALARM: &str = "getAlarm";
const ADD_ALARM: &str = "addAlarm";
const EDIT_ALARM: &str = "editAlarm";
const DELETE_ALARM: &str = "deleteAlarm";

/// Client for the LightUpPi alarm endpoints.
///
/// The server address is read on every request, so a settings change takes
/// effect without rebuilding the client.
pub struct LightUpPiClient {
    server: RwLock<ServerConfig>,
    transport: HttpTransport,
}

impl LightUpPiClient {
    pub fn new(server: ServerConfig, transport: TransportConfig) -> SyncResult<Self> {
        Ok(Self {
            server: RwLock::new(server),
            transport: HttpTransport::new(transport)?,
        })
    }

    pub async fn set_server(&self, server: ServerConfig) {
        *self.server.write().await = server;
    }

    pub async fn server(&self) -> ServerConfig {
        self.server.read().await.clone()
    }

    async fn url(&self, endpoint: &str, query: &[(&str, String)]) -> SyncResult<Url> {
        let server = self.server.read().await;
        if !server.is_configured() {
            return Err(SyncError::NotConfigured);
        }
        server
            .endpoint_url(endpoint, query)
            .map_err(SyncError::InvalidConfiguration)
    }

    /// Ping the server; `Ok` only on HTTP 200
    pub async fn ping(&self) -> SyncResult<()> {
        let url = self.url(PING, &[]).await?;
        match self.transport.get_status(url).await? {
            200 => Ok(()),
            status => Err(SyncError::Http(status)),
        }
    }

    /// Pull every alarm stored on the server
    pub async fn fetch_all_alarms(&self, defaults: &DecodeDefaults) -> SyncResult<AlarmBatch> {
        let url = self.url(GET_ALARM, &[("id", "all".to_string())]).await?;
        let body = self.transport.get_text(url).await?;
        let batch = codec::decode_alarm_batch(&body, defaults)?;
        debug!(
            count = batch.alarms.len(),
            skipped = batch.skipped,
            "Pulled LightUpPi alarms"
        );
        Ok(batch)
    }

    /// Pull a single alarm by server ID.
    ///
    /// The response is either an `alarms` envelope, from which the record
    /// with the requested ID is taken, or a bare alarm object.
    pub async fn fetch_alarm(
        &self,
        remote_id: RemoteId,
        defaults: &DecodeDefaults,
    ) -> SyncResult<Alarm> {
        let url = self
            .url(GET_ALARM, &[("id", remote_id.to_string())])
            .await?;
        let body = self.transport.get_text(url).await?;
        let value = serde_json::from_str::<Value>(&body)
            .map_err(|error| SyncError::Decode(error.to_string()))?;

        let record = match value {
            Value::Object(mut object) if object.contains_key("alarms") => {
                let Some(Value::Array(records)) = object.remove("alarms") else {
                    return Err(SyncError::Decode("'alarms' is not an array".to_string()));
                };
                records
                    .into_iter()
                    .find(|record| {
                        record.get("id").and_then(Value::as_i64) == Some(remote_id.get())
                    })
                    .ok_or_else(|| {
                        SyncError::Decode(format!("alarm {remote_id} missing from response"))
                    })?
            }
            other => other,
        };
        codec::decode_alarm(record, defaults)
    }

    /// Create `alarm` on the server and return its new server ID
    pub async fn add_alarm(&self, alarm: &Alarm) -> SyncResult<RemoteId> {
        let url = self.url(ADD_ALARM, &codec::encode_add(alarm)).await?;
        let body = self.transport.get_text(url).await?;
        codec::decode_add_response(&body)
    }

    /// Send the current state of a synced alarm to the server
    pub async fn edit_alarm(&self, alarm: &Alarm) -> SyncResult<EditAck> {
        let url = self.url(EDIT_ALARM, &codec::encode_edit(alarm)?).await?;
        let body = self.transport.get_text(url).await?;
        codec::decode_edit_response(&body)
    }

    pub async fn delete_alarm(&self, remote_id: RemoteId) -> SyncResult<()> {
        let url = self
            .url(DELETE_ALARM, &[("id", remote_id.to_string())])
            .await?;
        let body = self.transport.get_text(url).await?;
        codec::decode_delete_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{SyncKind, SyncOutcome};
    use crate::testing::{fast_transport, server_alarm_json, FakeLightUpPi};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn client_for(server: &FakeLightUpPi) -> LightUpPiClient {
        LightUpPiClient::new(ServerConfig::new(server.address()), fast_transport()).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unconfigured_server_is_not_configured() {
        let client = LightUpPiClient::new(ServerConfig::default(), fast_transport()).unwrap();
        assert!(matches!(client.ping().await, Err(SyncError::NotConfigured)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn malformed_address_is_invalid_configuration() {
        let client =
            LightUpPiClient::new(ServerConfig::new("pi.local:notaport"), fast_transport())
                .unwrap();
        assert!(matches!(
            client.ping().await,
            Err(SyncError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            SyncOutcome::from_error(SyncKind::Get, &client.ping().await.unwrap_err()),
            SyncOutcome::InvalidServerAddress
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ping_classifies_status() {
        let server = FakeLightUpPi::start().await;
        let client = client_for(&server);
        assert!(client.ping().await.is_ok());

        server.set_ping_status(503);
        assert!(matches!(client.ping().await, Err(SyncError::Http(503))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn set_server_redirects_requests() {
        let first = FakeLightUpPi::start().await;
        let second = FakeLightUpPi::start().await;
        let client = client_for(&first);

        client.set_server(ServerConfig::new(second.address())).await;
        client.ping().await.unwrap();

        assert!(first.requests().is_empty());
        assert_eq!(second.requests(), vec!["/LightUpPi/ping".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fetch_all_alarms_decodes_batch() {
        let server = FakeLightUpPi::start().await;
        server.set_alarms(json!([
            server_alarm_json(1, 7, 30, "Work"),
            {"id": 2, "label": "broken"},
        ]));
        let client = client_for(&server);

        let batch = client
            .fetch_all_alarms(&DecodeDefaults::default())
            .await
            .unwrap();
        assert_eq!(batch.alarms.len(), 1);
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.alarms[0].label, "Work");
        assert_eq!(
            server.requests(),
            vec!["/LightUpPi/getAlarm?id=all".to_string()]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fetch_alarm_picks_requested_record() {
        let server = FakeLightUpPi::start().await;
        server.set_alarms(json!([
            server_alarm_json(1, 7, 30, "Work"),
            server_alarm_json(2, 9, 0, "Weekend"),
        ]));
        let client = client_for(&server);

        let alarm = client
            .fetch_alarm(RemoteId::new(2), &DecodeDefaults::default())
            .await
            .unwrap();
        assert_eq!(alarm.remote_id, Some(RemoteId::new(2)));
        assert_eq!(alarm.label, "Weekend");

        let missing = client
            .fetch_alarm(RemoteId::new(3), &DecodeDefaults::default())
            .await;
        assert!(matches!(missing, Err(SyncError::Decode(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn add_alarm_sends_fields_and_returns_id() {
        let server = FakeLightUpPi::start().await;
        server.set_add_response(json!({"success": true, "id": 42}));
        let client = client_for(&server);

        let mut alarm = Alarm::new(6, 5).unwrap();
        alarm.label = "Early run".to_string();
        alarm.timestamp = 77;
        let remote_id = client.add_alarm(&alarm).await.unwrap();

        assert_eq!(remote_id, RemoteId::new(42));
        let request = &server.requests()[0];
        assert!(request.starts_with("/LightUpPi/addAlarm?hour=6&minute=5&monday=false"));
        assert!(request.contains("label=Early+run"));
        assert!(request.ends_with("timestamp=77"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn add_alarm_rejected_by_server() {
        let server = FakeLightUpPi::start().await;
        server.set_add_response(json!({"success": false}));
        let client = client_for(&server);

        let result = client.add_alarm(&Alarm::new(6, 5).unwrap()).await;
        assert!(matches!(result, Err(SyncError::ServerRejected)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn edit_alarm_returns_ack() {
        let server = FakeLightUpPi::start().await;
        server.set_edit_response(json!({"success": true, "id": 3, "timestamp": 555}));
        let client = client_for(&server);

        let mut alarm = Alarm::new(6, 5).unwrap();
        alarm.remote_id = Some(RemoteId::new(3));
        let ack = client.edit_alarm(&alarm).await.unwrap();

        assert_eq!(
            ack,
            EditAck {
                remote_id: RemoteId::new(3),
                timestamp: 555
            }
        );
        assert!(server.requests()[0].starts_with("/LightUpPi/editAlarm?id=3&hour=6"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_alarm_sends_id() {
        let server = FakeLightUpPi::start().await;
        let client = client_for(&server);

        client.delete_alarm(RemoteId::new(9)).await.unwrap();
        assert_eq!(
            server.requests(),
            vec!["/LightUpPi/deleteAlarm?id=9".to_string()]
        );
    }
}
