/*
 *  transport/wled.rs
 *
 *  wled-icons - 8x8 matrix sequencer
 *  (c) 2020-26 Stuart Hunter
 *
 *  WLED JSON API client
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
use log::debug;
use reqwest::{header, Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::constants::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_DEVICE_TIMEOUT, WLED_SEGMENT_ID, WLED_STATE_PATH};
use crate::error::TransportError;
use crate::pixel::PixelFrame;
use crate::transport::FrameTransport;

/// Body of a per-frame state update: `{"seg":[{"id":0,"i":[...],"bri":n}]}`
#[derive(Debug, Serialize)]
struct StateUpdate<'a> {
    seg: [SegmentUpdate<'a>; 1],
}

#[derive(Debug, Serialize)]
struct SegmentUpdate<'a> {
    id: u8,
    i: &'a PixelFrame,
    bri: u8,
}

/// Subset of the `/json/state` reply we care about.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceState {
    pub on: bool,
    pub bri: u8,
    pub seg: Vec<SegmentState>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmentState {
    pub id: u8,
    pub start: u16,
    pub stop: u16,
    pub on: Option<bool>,
    pub bri: Option<u8>,
}

/// HTTP client for a WLED controller's JSON API.
#[derive(Debug, Clone)]
pub struct WledClient {
    client: Client,
}

impl WledClient {
    /// Creates a client with the default request timeout.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_DEVICE_TIMEOUT)
    }

    /// Creates a client with populated headers and the given whole-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        const VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

        let mut headers = header::HeaderMap::new();
        headers.insert("User-Agent", header::HeaderValue::from_static(VERSION));
        headers.insert("Accept", header::HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(WledClient { client })
    }

    /// `host`, `host:port` or a full `http://` base all resolve to the state endpoint.
    pub fn state_url(target: &str) -> String {
        let target = target.trim().trim_end_matches('/');
        if target.starts_with("http://") || target.starts_with("https://") {
            format!("{}{}", target, WLED_STATE_PATH)
        } else {
            format!("http://{}{}", target, WLED_STATE_PATH)
        }
    }

    async fn post_state<T: Serialize + ?Sized>(&self, target: &str, body: &T) -> Result<(), TransportError> {
        let url = Self::state_url(target);
        let response = self.client.post(&url).json(body).send().await?;
        check_status(response).await?;
        Ok(())
    }

    /// Switch the controller on or off.
    pub async fn set_power(&self, target: &str, on: bool) -> Result<(), TransportError> {
        debug!("{target}: power {}", if on { "on" } else { "off" });
        self.post_state(target, &json!({ "on": on })).await
    }

    /// Set the controller's master brightness.
    pub async fn set_brightness(&self, target: &str, brightness: u8) -> Result<(), TransportError> {
        debug!("{target}: brightness {brightness}");
        self.post_state(target, &json!({ "bri": brightness })).await
    }

    /// Blank the matrix.
    pub async fn clear(&self, target: &str) -> Result<(), TransportError> {
        self.send(target, &PixelFrame::blank(), 0).await
    }

    /// Read back the controller state.
    pub async fn state(&self, target: &str) -> Result<DeviceState, TransportError> {
        let url = Self::state_url(target);
        let response = check_status(self.client.get(&url).send().await?).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| TransportError::Device(format!("bad state JSON: {e}")))
    }
}

impl FrameTransport for WledClient {
    async fn send(&self, target: &str, frame: &PixelFrame, brightness: u8) -> Result<(), TransportError> {
        let body = StateUpdate {
            seg: [SegmentUpdate { id: WLED_SEGMENT_ID, i: frame, bri: brightness }],
        };
        self.post_state(target, &body).await
    }
}

/// Anything but 2xx becomes a `Status` error carrying the reply body.
async fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TransportError::Status { code: status.as_u16(), body })
}
