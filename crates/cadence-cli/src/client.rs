use cadence_protocol::{encode_frame, frame_length, Request, Response};
use interprocess::local_socket::{
    tokio::{prelude::*, Stream},
    GenericFilePath,
};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("the daemon is not running")]
    DaemonNotRunning,
    #[error("timed out talking to the daemon")]
    Timeout,
    #[error("connection error: {0}")]
    Connection(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("input/output error: {0}")]
    InputOutput(String),
}

pub fn default_socket_path() -> PathBuf {
    let uid = unsafe { libc::getuid() };
    PathBuf::from(format!("/run/user/{}/cadence.sock", uid))
}

pub struct DaemonClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl DaemonClient {
    pub fn new() -> Self {
        Self {
            socket_path: default_socket_path(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let mut stream = self.connect().await?;
        self.write_request(&mut stream, &request).await?;

        timeout(self.timeout, read_response(&mut stream))
            .await
            .map_err(|_| ClientError::Timeout)?
    }

    /// Opens an event subscription. The first frame is the current status.
    pub async fn subscribe(&self) -> Result<Subscription, ClientError> {
        let mut stream = self.connect().await?;
        self.write_request(&mut stream, &Request::Subscribe).await?;
        Ok(Subscription { stream })
    }

    async fn connect(&self) -> Result<Stream, ClientError> {
        let connect_future = Stream::connect(
            self.socket_path
                .as_os_str()
                .to_fs_name::<GenericFilePath>()
                .map_err(|error| ClientError::Connection(error.to_string()))?,
        );

        match timeout(self.timeout, connect_future).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(_)) => Err(ClientError::DaemonNotRunning),
            Err(_) => Err(ClientError::Timeout),
        }
    }

    async fn write_request(&self, stream: &mut Stream, request: &Request) -> Result<(), ClientError> {
        let frame =
            encode_frame(request).map_err(|error| ClientError::Serialization(error.to_string()))?;

        let write_future = async {
            stream.write_all(&frame).await?;
            stream.flush().await?;
            Ok::<_, std::io::Error>(())
        };

        timeout(self.timeout, write_future)
            .await
            .map_err(|_| ClientError::Timeout)?
            .map_err(|error| ClientError::InputOutput(error.to_string()))
    }
}

impl Default for DaemonClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Long-lived connection receiving one response frame per timer event.
pub struct Subscription {
    stream: Stream,
}

impl Subscription {
    pub async fn next_response(&mut self) -> Result<Response, ClientError> {
        read_response(&mut self.stream).await
    }
}

async fn read_response(stream: &mut Stream) -> Result<Response, ClientError> {
    let mut length_buffer = [0u8; 4];
    stream
        .read_exact(&mut length_buffer)
        .await
        .map_err(|error| ClientError::InputOutput(error.to_string()))?;

    let length = frame_length(length_buffer)
        .ok_or_else(|| ClientError::Serialization("frame exceeds the maximum length".to_string()))?;

    let mut payload = vec![0u8; length];
    stream
        .read_exact(&mut payload)
        .await
        .map_err(|error| ClientError::InputOutput(error.to_string()))?;

    bincode::deserialize(&payload).map_err(|error| ClientError::Serialization(error.to_string()))
}
