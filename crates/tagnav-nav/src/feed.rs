use anyhow::{Context, Result};
use std::io::BufRead;
use tagnav_proto::TransformBatch;
use time::OffsetDateTime;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

use crate::TransformObserver;

const MAX_DATAGRAM: usize = 64 * 1024;
const LINE_BACKLOG: usize = 64;

/// Source of tracker deliveries, one JSON `TransformBatch` per line
/// (or per datagram for UDP).
pub enum TransformFeed {
    /// Lines read by a dedicated OS thread. Dropping the feed never waits on
    /// that thread, so a tracker pipe that stays open cannot hold the process.
    Lines(mpsc::Receiver<std::io::Result<String>>),
    File(BufReader<File>),
    Serial(BufReader<SerialStream>),
    Udp { sock: UdpSocket, buf: Vec<u8> },
}

impl TransformFeed {
    pub fn stdin() -> Self {
        Self::from_reader(std::io::BufReader::new(std::io::stdin()))
    }

    pub fn from_reader<R>(reader: R) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(LINE_BACKLOG);
        std::thread::spawn(move || {
            for line in reader.lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        });
        Self::Lines(rx)
    }

    pub fn file(path: &str) -> Result<Self> {
        let f = std::fs::File::open(path)
            .with_context(|| format!("open transform file {}", path))?;
        Ok(Self::File(BufReader::new(File::from_std(f))))
    }

    pub fn serial(dev: &str, baud: u32) -> Result<Self> {
        let port = tokio_serial::new(dev, baud)
            .open_native_async()
            .with_context(|| format!("open serial {}", dev))?;
        Ok(Self::Serial(BufReader::new(port)))
    }

    pub async fn udp(bind: &str) -> Result<Self> {
        let sock = UdpSocket::bind(bind).await.with_context(|| format!("bind udp {}", bind))?;
        info!("feed: listening on udp {}", sock.local_addr()?);
        Ok(Self::Udp { sock, buf: vec![0u8; MAX_DATAGRAM] })
    }

    /// Next well-formed batch. `None` once a stream source hits EOF.
    /// Malformed input is logged and skipped.
    pub async fn next_batch(&mut self) -> Result<Option<TransformBatch>> {
        loop {
            let line = match self {
                TransformFeed::Lines(rx) => match rx.recv().await {
                    Some(line) => line?,
                    None => return Ok(None),
                },
                TransformFeed::File(r) => match read_line(r).await? {
                    Some(line) => line,
                    None => return Ok(None),
                },
                TransformFeed::Serial(r) => match read_line(r).await? {
                    Some(line) => line,
                    None => return Ok(None),
                },
                TransformFeed::Udp { sock, buf } => {
                    let (len, peer) = sock.recv_from(buf).await?;
                    match serde_json::from_slice::<TransformBatch>(&buf[..len]) {
                        Ok(batch) => return Ok(Some(batch)),
                        Err(e) => {
                            warn!("feed: bad datagram from {}: {}", peer, e);
                            continue;
                        }
                    }
                }
            };
            match parse_batch_line(&line) {
                Ok(Some(batch)) => return Ok(Some(batch)),
                Ok(None) => continue,
                Err(e) => warn!("feed: skipping line: {:#}", e),
            }
        }
    }
}

async fn read_line<R: AsyncBufRead + Unpin>(r: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if r.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Blank lines and `#` comments yield `None`.
pub fn parse_batch_line(s: &str) -> Result<Option<TransformBatch>> {
    let s = s.trim();
    if s.is_empty() || s.starts_with('#') {
        return Ok(None);
    }
    let batch = serde_json::from_str(s).context("parse transform batch json")?;
    Ok(Some(batch))
}

/// Forwards every batch into the observer until the source ends.
pub async fn pump(mut feed: TransformFeed, observer: TransformObserver) -> Result<()> {
    while let Some(batch) = feed.next_batch().await? {
        debug!("feed: batch with {} transform(s)", batch.transforms.len());
        observer.publish(batch.into_observations(OffsetDateTime::now_utc()));
    }
    info!("feed: source closed; keeping last observation");
    Ok(())
}
