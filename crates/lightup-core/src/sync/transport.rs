//! HTTP GET transport for LightUpPi requests.

use reqwest::{StatusCode, Url};
use tracing::debug;

use super::{SyncError, SyncResult};
use crate::config::TransportConfig;
use crate::util::compact_text;

#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()
            .map_err(|error| {
                SyncError::InvalidConfiguration(format!("failed to build HTTP client: {error}"))
            })?;
        Ok(Self { client })
    }

    /// GET `url` and return the body of an HTTP 200 response.
    ///
    /// There is no overall deadline: a response keeps going as long as each
    /// read completes within the read timeout. Any other status maps to [`SyncError::Http`]; I/O failures, including
    /// timeouts, map to [`SyncError::Network`]. The response is dropped, and
    /// its connection released, on every return path.
    pub async fn get_text(&self, url: Url) -> SyncResult<String> {
        debug!(%url, "LightUpPi GET");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SyncError::Http(status.as_u16()));
        }

        let body = response.text().await.map_err(network_error)?;
        debug!(body = %compact_text(&body), "LightUpPi response");
        Ok(body)
    }

    /// GET `url` and return only the status code, without reading the body.
    pub async fn get_status(&self, url: Url) -> SyncResult<u16> {
        let response = self.client.get(url).send().await.map_err(network_error)?;
        Ok(response.status().as_u16())
    }
}

fn network_error(error: reqwest::Error) -> SyncError {
    if error.is_timeout() {
        SyncError::Network(format!("request timed out: {error}"))
    } else {
        SyncError::Network(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fast_transport, silent_server, FakeLightUpPi};

    fn url(address: &str, endpoint: &str) -> Url {
        Url::parse(&format!("http://{address}/LightUpPi/{endpoint}")).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn get_text_returns_body_on_200() {
        let server = FakeLightUpPi::start().await;
        let transport = HttpTransport::new(fast_transport()).unwrap();

        let body = transport
            .get_text(url(&server.address(), "getAlarm?id=all"))
            .await
            .unwrap();
        assert!(body.contains("alarms"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn get_text_tags_non_200_status() {
        let server = FakeLightUpPi::start().await;
        server.set_get_status(500);
        let transport = HttpTransport::new(fast_transport()).unwrap();

        let error = transport
            .get_text(url(&server.address(), "getAlarm?id=all"))
            .await
            .unwrap_err();
        assert!(matches!(error, SyncError::Http(500)));

        server.set_get_status(404);
        let error = transport
            .get_text(url(&server.address(), "getAlarm?id=all"))
            .await
            .unwrap_err();
        assert!(matches!(error, SyncError::Http(404)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn get_text_times_out_as_network_error() {
        let address = silent_server().await;
        let transport = HttpTransport::new(fast_transport()).unwrap();

        let error = transport.get_text(url(&address, "ping")).await.unwrap_err();
        assert!(matches!(error, SyncError::Network(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn get_text_accepts_slow_body_within_read_timeout() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let body = "{\"alarms\": []}";
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await.unwrap();
            let header = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(header.as_bytes()).await.unwrap();
            // Each gap stays under the read timeout; the total is well over
            // connect + read timeout.
            for byte in body.bytes() {
                tokio::time::sleep(std::time::Duration::from_millis(150)).await;
                socket.write_all(&[byte]).await.unwrap();
                socket.flush().await.unwrap();
            }
        });

        let transport = HttpTransport::new(fast_transport()).unwrap();
        let text = transport
            .get_text(url(&address, "getAlarm?id=all"))
            .await
            .unwrap();
        assert_eq!(text, body);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn get_text_connection_refused_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let transport = HttpTransport::new(fast_transport()).unwrap();
        let error = transport.get_text(url(&address, "ping")).await.unwrap_err();
        assert!(matches!(error, SyncError::Network(_)));
    }
}
