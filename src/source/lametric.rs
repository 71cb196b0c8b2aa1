/*
 *  source/lametric.rs
 *
 *  wled-icons - 8x8 matrix sequencer
 *  (c) 2020-26 Stuart Hunter
 *
 *  LaMetric icon gallery download
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */
use log::{debug, info};
use reqwest::{header, Client};
use std::time::Duration;

use crate::constants::{LAMETRIC_ICON_URL, LAMETRIC_TIMEOUT};
use crate::source::{BitmapSource, SourceError};

/// Downloads 8x8 icon thumbnails (JPEG, PNG or animated GIF) by id.
#[derive(Debug, Clone)]
pub struct LaMetricClient {
    client: Client,
    base_url: String,
}

impl LaMetricClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        const VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

        let mut headers = header::HeaderMap::new();
        headers.insert("User-Agent", header::HeaderValue::from_static(VERSION));

        let client = Client::builder().default_headers(headers).timeout(timeout).build()?;
        Ok(LaMetricClient { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    /// Client against the public icon gallery.
    pub fn gallery() -> Result<Self, SourceError> {
        Self::new(LAMETRIC_ICON_URL, LAMETRIC_TIMEOUT)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn icon_url(&self, icon_id: &str) -> String {
        format!("{}/{}", self.base_url, icon_id)
    }

    pub async fn fetch(&self, icon_id: &str) -> Result<BitmapSource, SourceError> {
        let icon_id = icon_id.trim();
        if icon_id.is_empty() || icon_id.contains('/') {
            return Err(SourceError::NotFound(icon_id.to_string()));
        }

        let url = self.icon_url(icon_id);
        debug!("fetching {url}");
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            debug!("icon {icon_id}: HTTP {}", response.status());
            return Err(SourceError::NotFound(icon_id.to_string()));
        }
        let bytes = response.bytes().await?;
        let source = BitmapSource::decode(&bytes)?;
        info!("LaMetric icon {icon_id}: {} frame(s)", source.frame_count());
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::Rgb;
    use crate::source::{FrameSource, RenderOptions};
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves one request with `status` and `body`, returning the request line.
    async fn serve_once(status: &'static str, body: Vec<u8>) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/icons", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];
            while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = sock.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
            }
            let head = format!(
                "HTTP/1.1 {status}\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            sock.write_all(head.as_bytes()).await.unwrap();
            sock.write_all(&body).await.unwrap();
            sock.shutdown().await.ok();
            String::from_utf8_lossy(&raw).lines().next().unwrap_or_default().to_string()
        });
        (base, handle)
    }

    fn red_png() -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255])).write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_icon_url() {
        let client = LaMetricClient::new("http://icons.example/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.icon_url("1486"), "http://icons.example/1486");
        assert_eq!(LaMetricClient::gallery().unwrap().base_url(), LAMETRIC_ICON_URL);
    }

    #[tokio::test]
    async fn test_fetch_decodes_icon() {
        let (base, server) = serve_once("200 OK", red_png()).await;
        let client = LaMetricClient::new(&base, Duration::from_secs(2)).unwrap();

        let source = client.fetch("1486").await.unwrap();
        let steps = source.render(&RenderOptions::default()).unwrap();
        assert_eq!(steps[0].frame.pixels()[0], Rgb::new(255, 0, 0));

        let request_line = server.await.unwrap();
        assert!(request_line.starts_with("GET /icons/1486 "));
    }

    #[tokio::test]
    async fn test_missing_icon_is_not_found() {
        let (base, server) = serve_once("404 Not Found", b"nope".to_vec()).await;
        let client = LaMetricClient::new(&base, Duration::from_secs(2)).unwrap();

        let err = client.fetch("999999").await.unwrap_err();
        assert!(matches!(err, SourceError::NotFound(id) if id == "999999"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_bad_ids_rejected_without_request() {
        let client = LaMetricClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        assert!(matches!(client.fetch("  ").await, Err(SourceError::NotFound(_))));
        assert!(matches!(client.fetch("../etc").await, Err(SourceError::NotFound(_))));
    }
}
