//! Consumer-side reader for the metrics stream
//!
//! Reads newline-delimited packets from the bridge and keeps track of
//! dropped samples through their sequence numbers.

use crate::framing::decode_line;
use bridge_core::{BridgeError, BridgeResult, MetricsPacket, SequenceTracker};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::net::TcpStream;
use tracing::warn;

/// Reads metrics packets line by line
pub struct PacketReader<R> {
    lines: Lines<BufReader<R>>,
    line_number: u64,
    tracker: SequenceTracker,
}

impl PacketReader<TcpStream> {
    /// Connect to a running bridge
    pub async fn connect(addr: SocketAddr) -> BridgeResult<Self> {
        let stream = TcpStream::connect(addr).await.map_err(|e| BridgeError::ConnectFailed {
            address: addr.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(stream))
    }
}

impl<R: AsyncRead + Unpin> PacketReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_tracker(reader, SequenceTracker::new())
    }

    /// Reader using a specific tracker, e.g. one for a wrapping counter
    pub fn with_tracker(reader: R, tracker: SequenceTracker) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            line_number: 0,
            tracker,
        }
    }

    /// Next packet, or `None` once the bridge closes the stream
    pub async fn next_packet(&mut self) -> BridgeResult<Option<MetricsPacket>> {
        let line = match self.lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(None),
            Err(e) => {
                return Err(BridgeError::Protocol {
                    line: self.line_number + 1,
                    reason: e.to_string(),
                })
            }
        };
        self.line_number += 1;

        let packet = decode_line(&line, self.line_number)?;
        for sample in &packet.samples {
            if let Some(gap) = self.tracker.observe(sample.seq) {
                warn!(
                    previous = gap.previous,
                    current = gap.current,
                    missing = gap.missing,
                    "Dropped samples detected"
                );
            }
        }
        Ok(Some(packet))
    }

    /// Packets read so far
    pub fn packets_read(&self) -> u64 {
        self.line_number
    }

    /// Samples missing according to sequence numbers
    pub fn dropped_samples(&self) -> u64 {
        self.tracker.dropped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::encode_line;
    use bridge_core::ProcessedSample;
    use tokio::io::AsyncWriteExt;

    fn packet(seqs: &[i64]) -> MetricsPacket {
        MetricsPacket {
            samples: seqs
                .iter()
                .map(|&seq| ProcessedSample { timestamp: 0.0, ecg: 0.0, eda: 0.0, seq })
                .collect(),
            heart_rate: 70.0,
            stress_level: 0.3,
        }
    }

    #[tokio::test]
    async fn test_reads_packets_and_counts_gaps() {
        let (mut writer, reader) = tokio::io::duplex(4096);
        writer.write_all(&encode_line(&packet(&[0, 1, 2])).unwrap()).await.unwrap();
        writer.write_all(&encode_line(&packet(&[5, 6])).unwrap()).await.unwrap();
        drop(writer);

        let mut reader = PacketReader::new(reader);
        let first = reader.next_packet().await.unwrap().unwrap();
        let second = reader.next_packet().await.unwrap().unwrap();

        assert_eq!(first.sequence_numbers(), vec![0, 1, 2]);
        assert_eq!(second.sequence_numbers(), vec![5, 6]);
        assert!(reader.next_packet().await.unwrap().is_none());
        assert_eq!(reader.packets_read(), 2);
        assert_eq!(reader.dropped_samples(), 2);
    }

    #[tokio::test]
    async fn test_wrapping_tracker() {
        let (mut writer, reader) = tokio::io::duplex(4096);
        writer.write_all(&encode_line(&packet(&[14, 15, 0, 1])).unwrap()).await.unwrap();
        drop(writer);

        let mut reader = PacketReader::with_tracker(reader, SequenceTracker::wrapping(16));
        reader.next_packet().await.unwrap();
        assert_eq!(reader.dropped_samples(), 0);
    }

    #[tokio::test]
    async fn test_malformed_line_is_protocol_error() {
        let (mut writer, reader) = tokio::io::duplex(4096);
        writer.write_all(b"{\"samples\": 3}\n").await.unwrap();
        drop(writer);

        let mut reader = PacketReader::new(reader);
        assert!(matches!(
            reader.next_packet().await,
            Err(BridgeError::Protocol { line: 1, .. })
        ));
    }
}
