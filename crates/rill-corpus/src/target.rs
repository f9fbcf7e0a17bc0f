//! The fuzz target: every parser that accepts bytes from outside the
//! process, behind one entry point.

use serde::{Deserialize, Serialize};

use rill_core::{ShardId, TablePartitioning};
use rill_dataflow::{ConnectorSettings, SourceDescriptor};
use rill_longtx::{route_batch, WritePayload};

/// What became of one corpus case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseOutcome {
    /// The bytes made it through a full parse, validate, and route pass.
    Parsed,
    /// The bytes were turned away at some stage. Rejection is a pass too;
    /// the target only fails by panicking.
    Rejected,
}

/// Settings shape that exercises the typed decode path.
#[derive(Debug, Serialize, Deserialize)]
struct ProbeSettings {
    path: String,
    #[serde(default)]
    batch_rows: usize,
}

impl ConnectorSettings for ProbeSettings {
    const TYPE_URL: &'static str = "rill.connectors.ProbeSettings";
}

/// Key space the payload surface routes against.
fn probe_layout() -> TablePartitioning {
    TablePartitioning::ranged_i64(
        "id",
        0,
        1_000,
        &[ShardId(1), ShardId(2), ShardId(3), ShardId(4)],
    )
}

/// Feed one corpus case to the untrusted-input surfaces: plan descriptors
/// (JSON envelope, declared-type check, settings decode) and write payloads
/// (JSON envelope, IPC decode, partition routing).
///
/// Must never panic; malformed input is the expected input here.
pub fn run_case(data: &[u8]) -> CaseOutcome {
    let mut parsed = false;

    if let Ok(descriptor) = serde_json::from_slice::<SourceDescriptor>(data) {
        // Identity before decode, the same order the factory enforces.
        if descriptor.settings.is::<ProbeSettings>()
            && descriptor.settings.decode::<ProbeSettings>().is_ok()
        {
            parsed = true;
        }
    }

    if let Ok(payload) = serde_json::from_slice::<WritePayload>(data) {
        if let Ok(batch) = payload.to_batch() {
            if route_batch(&probe_layout(), &batch).is_ok() {
                parsed = true;
            }
        }
    }

    if parsed {
        CaseOutcome::Parsed
    } else {
        CaseOutcome::Rejected
    }
}


#[cfg(test)]
mod tests {
    use rill_dataflow::SettingsAny;

    use super::fixtures::{descriptor_bytes, payload_bytes};
    use super::*;

    #[test]
    fn test_valid_descriptor_parses() {
        assert_eq!(run_case(&descriptor_bytes()), CaseOutcome::Parsed);
    }

    #[test]
    fn test_mismatched_settings_identity_is_rejected() {
        #[derive(Debug, Serialize, Deserialize)]
        struct OtherSettings {
            url: String,
        }
        impl ConnectorSettings for OtherSettings {
            const TYPE_URL: &'static str = "rill.connectors.OtherSettings";
        }

        let settings = SettingsAny::pack(&OtherSettings {
            url: "nats://broker".to_string(),
        })
        .unwrap();
        let bytes = serde_json::to_vec(&SourceDescriptor {
            source_type: "csv".to_string(),
            settings,
        })
        .unwrap();
        assert_eq!(run_case(&bytes), CaseOutcome::Rejected);
    }

    #[test]
    fn test_valid_payload_routes() {
        assert_eq!(run_case(&payload_bytes(&[3, 400, 999])), CaseOutcome::Parsed);
    }

    #[test]
    fn test_payload_with_unroutable_keys_is_rejected() {
        assert_eq!(run_case(&payload_bytes(&[3, -7])), CaseOutcome::Rejected);
    }

    #[test]
    fn test_garbage_and_empty_inputs_are_rejected() {
        assert_eq!(run_case(b"\xff\xfe{{{"), CaseOutcome::Rejected);
        assert_eq!(run_case(b""), CaseOutcome::Rejected);
        assert_eq!(run_case(b"[1, 2, 3]"), CaseOutcome::Rejected);
    }

    #[test]
    fn test_truncated_ipc_payload_is_rejected() {
        let bytes = payload_bytes(&[5, 6, 7]);
        let mut payload: WritePayload = serde_json::from_slice(&bytes).unwrap();
        payload.data.truncate(payload.data.len() / 2);
        let truncated = serde_json::to_vec(&payload).unwrap();
        assert_eq!(run_case(&truncated), CaseOutcome::Rejected);
    }

    // Every prefix of a valid case must be handled without panicking.
    #[test]
    fn test_prefixes_of_valid_cases_never_panic() {
        for bytes in [descriptor_bytes(), payload_bytes(&[1, 2])] {
            for len in 0..bytes.len() {
                run_case(&bytes[..len]);
            }
        }
    }
}
