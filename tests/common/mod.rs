#![allow(dead_code)]

pub use felicity_bridge::felicity::client::COMMAND;
pub use felicity_bridge::prelude::*;

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub struct Factory;

impl Factory {
    /// A complete reply as sent by a current battery firmware.
    pub fn payload() -> &'static str {
        r#"{"CommVer":1,"wifiSN":"F600012345678","modID":1,"version":"1.01","DevSN":"061234567890","Type":112,"SubType":2,"Estate":960,"Bfault":0,"Bwarn":0,"Bstate":0,"Batt":[[53120,-17,0]],"Batsoc":[[9900,1000,200000]],"BMaxMin":[[3326,3318],[1,2]],"LVolCur":[[576,480],[1000,1000]],"BatcelVol":[[3319,3320,3318,3321]],"BTemp":[[170,160]]}"#
    }

    /// A hybrid inverter reply: battery readings one value per row, plus
    /// the AC side.
    pub fn inverter_payload() -> &'static str {
        r#"{"CommVer":1,"wifiSN":"F600087654321","modID":5,"DevSN":"081234500001","Type":81,"SubType":1036,"Estate":1,"workM":2,"warn":0,"fault":0,"wan2F":0,"Batt":[[52100],[-17],[0]],"Batsoc":[[8700],[1000],[0]],"ACin":[[2301],[12],[2760],[500]],"ACout":[[2298],[8],[1840],[500]],"busVp":3850,"lPerc":23,"pFlow":1213,"Temp":[[310,295,0]]}"#
    }

    pub fn settings() -> TransportSettings {
        TransportSettings {
            connect_timeout: Duration::from_millis(1000),
            write_timeout: Duration::from_millis(1000),
            read_timeout: Duration::from_millis(200),
            read_attempts: 10,
        }
    }
}

/// What the fake device does once it has read the request.
pub struct Reply {
    pub chunks: Vec<Vec<u8>>,
    pub gap: Duration,
    pub hold_open: Duration,
}

impl Reply {
    pub fn once(bytes: &[u8]) -> Self {
        Self {
            chunks: vec![bytes.to_vec()],
            gap: Duration::ZERO,
            hold_open: Duration::ZERO,
        }
    }

    pub fn silent(hold_open: Duration) -> Self {
        Self {
            chunks: Vec::new(),
            gap: Duration::ZERO,
            hold_open,
        }
    }
}

/// Accepts a single connection on a loopback port, reads the request and
/// plays back `reply`. The join handle yields the request bytes.
pub async fn fake_device(reply: Reply) -> (Endpoint, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut request = vec![0u8; COMMAND.len()];
        socket.read_exact(&mut request).await.unwrap();

        for chunk in reply.chunks {
            if socket.write_all(&chunk).await.is_err() {
                break;
            }
            let _ = socket.flush().await;
            tokio::time::sleep(reply.gap).await;
        }
        tokio::time::sleep(reply.hold_open).await;

        request
    });

    (Endpoint::new("127.0.0.1", port), handle)
}

/// Like `fake_device`, but once the reply is out it waits for the client to
/// close its side. The join handle yields whether EOF arrived in time.
pub async fn watching_device(reply: Reply) -> (Endpoint, JoinHandle<bool>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut request = vec![0u8; COMMAND.len()];
        socket.read_exact(&mut request).await.unwrap();

        for chunk in reply.chunks {
            if socket.write_all(&chunk).await.is_err() {
                break;
            }
            let _ = socket.flush().await;
            tokio::time::sleep(reply.gap).await;
        }

        let mut rest = [0u8; 64];
        matches!(
            tokio::time::timeout(Duration::from_secs(3), socket.read(&mut rest)).await,
            Ok(Ok(0))
        )
    });

    (Endpoint::new("127.0.0.1", port), handle)
}

/// A loopback port with nothing listening on it.
pub async fn closed_port() -> Endpoint {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    Endpoint::new("127.0.0.1", port)
}
