//! Capture file records: `<seconds>\t<base64 payload>\n`

use base64::{engine::general_purpose::STANDARD, Engine};

/// One captured datagram
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Seconds since the first datagram of the capture
    pub timestamp: f64,
    pub payload: Vec<u8>,
}

impl Record {
    /// Encode as a single line, including the trailing newline
    pub fn to_line(&self) -> String {
        format!("{:.10}\t{}\n", self.timestamp, STANDARD.encode(&self.payload))
    }
}

/// Parse one line of a capture file. A trailing newline is allowed.
pub fn parse_record(line: &str) -> Result<Record, RecordError> {
    let line = line.trim_end_matches(['\r', '\n']);

    let mut parts = line.split('\t');
    let (Some(time), Some(data), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(RecordError::Malformed(line.to_string()));
    };

    let timestamp: f64 = time
        .parse()
        .map_err(|_| RecordError::InvalidTimestamp(line.to_string()))?;
    if !timestamp.is_finite() || timestamp < 0.0 {
        return Err(RecordError::InvalidTimestamp(line.to_string()));
    }

    let payload = STANDARD
        .decode(data.trim_end())
        .map_err(|e| RecordError::InvalidPayload {
            line: line.to_string(),
            reason: e.to_string(),
        })?;

    Ok(Record { timestamp, payload })
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Could not split timestamp and data in record '{0}'")]
    Malformed(String),

    #[error("Invalid timestamp in record '{0}'")]
    InvalidTimestamp(String),

    #[error("Invalid payload in record '{line}': {reason}")]
    InvalidPayload { line: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_line_format() {
        let record = Record {
            timestamp: 0.0,
            payload: b"hello".to_vec(),
        };
        assert_eq!(record.to_line(), "0.0000000000\taGVsbG8=\n");

        let record = Record {
            timestamp: 1.25,
            payload: Vec::new(),
        };
        assert_eq!(record.to_line(), "1.2500000000\t\n");
    }

    #[test]
    fn test_parse_record() {
        let record = parse_record("2.5000000000\tAAEC/w==\n").unwrap();
        assert_eq!(record.timestamp, 2.5);
        assert_eq!(record.payload, vec![0x00, 0x01, 0x02, 0xff]);
    }

    #[test]
    fn test_parse_record_rejects_bad_lines() {
        assert!(matches!(
            parse_record("no tab here"),
            Err(RecordError::Malformed(_))
        ));
        assert!(matches!(
            parse_record("1.0\tAA==\textra"),
            Err(RecordError::Malformed(_))
        ));
        assert!(matches!(
            parse_record("abc\tAA=="),
            Err(RecordError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            parse_record("-1.0\tAA=="),
            Err(RecordError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            parse_record("NaN\tAA=="),
            Err(RecordError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            parse_record("1.0\t!!!"),
            Err(RecordError::InvalidPayload { .. })
        ));
    }
}
