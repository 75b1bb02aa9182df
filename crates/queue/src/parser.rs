//! Parse queue message bodies into [`Job`]s.

use chiffre_core::Job;

use crate::consumer::QueueMessage;
use crate::error::QueueError;

/// Parse a single queue message body into a [`Job`].
///
/// The body is the JSON the gateway published. A body that does not
/// deserialize is a poison message; the caller decides whether to ack it
/// out or let it redeliver.
pub fn parse_job(msg: &QueueMessage) -> Result<Job, QueueError> {
    serde_json::from_str(&msg.body).map_err(|e| {
        QueueError::Parse(format!(
            "message {} is not a valid job: {e}",
            msg.id
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chiffre_core::{CipherMode, CipherOperation};
    use chrono::Utc;

    fn message_with_body(body: &str) -> QueueMessage {
        QueueMessage {
            id: "msg-1".to_string(),
            body: body.to_string(),
            receipt_handle: "rh-1".to_string(),
            timestamp: Utc::now(),
            attempt_count: 1,
        }
    }

    #[test]
    fn test_parse_job_roundtrip() {
        let job = Job::new(
            vec![1, 2, 3, 4, 5],
            "in.bmp".to_string(),
            CipherMode::Cbc,
            CipherOperation::Encrypt,
            "key".to_string(),
        );
        let msg = message_with_body(&serde_json::to_string(&job).unwrap());

        let parsed = parse_job(&msg).unwrap();
        assert_eq!(parsed.correlation_id, job.correlation_id);
        assert_eq!(parsed.payload, vec![1, 2, 3, 4, 5]);
        assert_eq!(parsed.file_name, "in.bmp");
    }

    #[test]
    fn test_parse_job_malformed_body() {
        let msg = message_with_body("{not json");
        let err = parse_job(&msg).unwrap_err();
        assert!(matches!(err, QueueError::Parse(_)));
        assert!(err.to_string().contains("msg-1"));
    }

    #[test]
    fn test_parse_job_missing_fields() {
        let msg = message_with_body(r#"{"file_name":"x.bmp"}"#);
        assert!(matches!(parse_job(&msg), Err(QueueError::Parse(_))));
    }
}
