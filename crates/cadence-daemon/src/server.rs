use crate::actors::TimerHandle;
use crate::plans::PlanCatalog;
use anyhow::{bail, Context, Result};
use cadence_protocol::{encode_frame, frame_length, Request, Response, TimerEvent};
use interprocess::local_socket::{
    tokio::{prelude::*, Stream},
    GenericFilePath, ListenerOptions,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, instrument, warn};

pub fn default_socket_path() -> PathBuf {
    let uid = unsafe { libc::getuid() };
    PathBuf::from(format!("/run/user/{}/cadence.sock", uid))
}

#[derive(Clone)]
struct ConnectionContext {
    timer: TimerHandle,
    catalog: PlanCatalog,
}

pub struct Server {
    socket_path: PathBuf,
    context: ConnectionContext,
}

impl Server {
    pub fn new(socket_path: PathBuf, timer: TimerHandle, catalog: PlanCatalog) -> Self {
        Self {
            socket_path,
            context: ConnectionContext { timer, catalog },
        }
    }

    fn cleanup_stale_socket(&self) -> Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).context("failed to remove stale socket")?;
            debug!("removed stale socket file");
        }
        Ok(())
    }

    #[instrument(skip_all, fields(path = %self.socket_path.display()))]
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        self.cleanup_stale_socket()?;

        let listener = ListenerOptions::new()
            .name(self.socket_path.as_os_str().to_fs_name::<GenericFilePath>()?)
            .create_tokio()
            .context("failed to bind daemon socket")?;

        info!("server listening");

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok(stream) => {
                            let context = self.context.clone();
                            tokio::spawn(async move {
                                if let Err(error) = handle_connection(stream, context).await {
                                    error!(%error, "connection handler failed");
                                }
                            });
                        }
                        Err(error) => {
                            error!(%error, "failed to accept connection");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        self.cleanup_socket();
        Ok(())
    }

    fn cleanup_socket(&self) {
        if let Err(error) = std::fs::remove_file(&self.socket_path) {
            debug!(%error, "socket file already removed");
        } else {
            debug!("socket file cleaned up");
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.cleanup_socket();
    }
}

async fn read_frame<T, S>(stream: &mut S) -> Result<T>
where
    T: DeserializeOwned,
    S: AsyncRead + Unpin,
{
    let mut length_buffer = [0u8; 4];
    stream.read_exact(&mut length_buffer).await?;

    let Some(length) = frame_length(length_buffer) else {
        bail!("frame exceeds the maximum length");
    };

    let mut payload = vec![0u8; length];
    stream.read_exact(&mut payload).await?;

    bincode::deserialize(&payload).context("failed to deserialize frame")
}

async fn write_frame<T, S>(stream: &mut S, message: &T) -> Result<()>
where
    T: Serialize,
    S: AsyncWrite + Unpin,
{
    let frame = encode_frame(message).context("failed to serialize frame")?;
    stream.write_all(&frame).await?;
    stream.flush().await?;
    Ok(())
}

async fn handle_connection(mut stream: Stream, context: ConnectionContext) -> Result<()> {
    debug!("new connection accepted");

    let request: Request = read_frame(&mut stream).await?;
    debug!(?request, "received request");

    // Subscribe before taking the snapshot so no event falls in between.
    let subscription = matches!(request, Request::Subscribe).then(|| context.timer.subscribe());

    let response = handle_request(request, &context).await;
    debug!(?response, "sending response");
    write_frame(&mut stream, &response).await?;

    if let Some(events) = subscription {
        stream_events(&mut stream, events).await?;
    }

    Ok(())
}

/// Writes one `Event` frame per timer event until the session ends or the
/// subscriber hangs up.
async fn stream_events<S>(stream: &mut S, mut events: broadcast::Receiver<TimerEvent>) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut scratch = [0u8; 1];

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    let terminal = event.is_terminal();
                    write_frame(stream, &Response::Event(event)).await?;
                    if terminal {
                        debug!("subscription ended with the session");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber lagged behind timer events");
                }
                Err(RecvError::Closed) => break,
            },
            read = stream.read(&mut scratch) => {
                if matches!(read, Ok(0) | Err(_)) {
                    debug!("subscriber hung up");
                    break;
                }
            }
        }
    }

    Ok(())
}

async fn handle_request(request: Request, context: &ConnectionContext) -> Response {
    let timer = &context.timer;

    match request {
        Request::Ping => Response::Pong,

        Request::GetStatus | Request::Subscribe => match timer.get_status().await {
            Some(status) => Response::Status(status),
            None => Response::Error {
                message: "timer is unavailable".to_string(),
            },
        },

        Request::StartSession {
            plan,
            total_work_seconds,
        } => {
            let (plan, sequence) = match context
                .catalog
                .prepare(plan.as_deref(), total_work_seconds)
            {
                Ok(prepared) => prepared,
                Err(error) => {
                    return Response::Error {
                        message: error.to_string(),
                    }
                }
            };

            let plan_name = plan.name.clone();
            let started = async {
                timer.set_plan_and_sequence(plan, sequence.clone()).await?;
                timer.start_next_segment().await
            };
            match started.await {
                Ok(_) => Response::SessionStarted {
                    plan_name,
                    sequence,
                },
                Err(error) => Response::Error {
                    message: error.to_string(),
                },
            }
        }

        Request::PreviewSequence {
            plan,
            total_work_seconds,
        } => match context
            .catalog
            .prepare(plan.as_deref(), total_work_seconds)
        {
            Ok((plan, sequence)) => Response::Sequence {
                plan_name: plan.name,
                sequence,
            },
            Err(error) => Response::Error {
                message: error.to_string(),
            },
        },

        Request::NextSegment => acknowledge(timer.start_next_segment().await.map(|_| ())),
        Request::PauseSession => acknowledge(timer.pause().await),
        Request::ResumeSession => acknowledge(timer.resume().await),
        Request::DeleteSession => acknowledge(timer.delete().await),
    }
}

fn acknowledge(result: Result<(), cadence_core::TimerError>) -> Response {
    match result {
        Ok(()) => Response::Ok,
        Err(error) => Response::Error {
            message: error.to_string(),
        },
    }
}
