//! Newline-delimited JSON framing of metrics packets
//!
//! One packet per line, compact JSON, `\n` terminator. Compact JSON never
//! contains a raw newline, so the terminator is unambiguous.

use bridge_core::{BridgeError, BridgeResult, MetricsPacket};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Frame delimiter
pub const DELIMITER: u8 = b'\n';

/// Serialize a packet into one delimited line
pub fn encode_line(packet: &MetricsPacket) -> BridgeResult<Vec<u8>> {
    let mut line = serde_json::to_vec(packet)?;
    line.push(DELIMITER);
    Ok(line)
}

/// Parse one line (without its delimiter) back into a packet
pub fn decode_line(line: &str, line_number: u64) -> BridgeResult<MetricsPacket> {
    serde_json::from_str(line.trim_end_matches(['\r', '\n'])).map_err(|e| BridgeError::Protocol {
        line: line_number,
        reason: e.to_string(),
    })
}

/// Write a framed line and flush it
///
/// Blocks for as long as the peer is not reading; there is no backpressure
/// signal beyond the socket itself.
pub async fn write_line<W>(writer: &mut W, line: &[u8]) -> BridgeResult<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line).await.map_err(BridgeError::WriteFailed)?;
    writer.flush().await.map_err(BridgeError::WriteFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::ProcessedSample;

    fn packet() -> MetricsPacket {
        MetricsPacket {
            samples: (0..10)
                .map(|seq| ProcessedSample {
                    timestamp: 1_700_000_000.25,
                    ecg: -0.5,
                    eda: 3.2,
                    seq,
                })
                .collect(),
            heart_rate: 72.5,
            stress_level: 0.32,
        }
    }

    #[test]
    fn test_single_trailing_delimiter() {
        let line = encode_line(&packet()).unwrap();
        assert_eq!(line.last(), Some(&DELIMITER));
        assert_eq!(line.iter().filter(|&&b| b == DELIMITER).count(), 1);
    }

    #[test]
    fn test_line_is_self_describing() {
        let line = encode_line(&packet()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&line).unwrap();

        assert_eq!(value["samples"].as_array().unwrap().len(), 10);
        for key in ["timestamp", "ecg", "eda", "seq"] {
            assert!(value["samples"][0].get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["heart_rate"], 72.5);
        assert_eq!(value["stress_level"], 0.32);
    }

    #[test]
    fn test_decode_reports_line_number() {
        match decode_line("{not json", 42) {
            Err(BridgeError::Protocol { line, .. }) => assert_eq!(line, 42),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_write_line_to_closed_peer_fails() {
        let (mut writer, reader) = tokio::io::duplex(64);
        drop(reader);

        let line = encode_line(&packet()).unwrap();
        let result = write_line(&mut writer, &line).await;
        assert!(matches!(result, Err(BridgeError::WriteFailed(_))));
    }
}
