//! Collector upload: when to send, what to send, and the HTTP framing.

pub mod http;
pub mod payload;
pub mod trigger;

pub use http::{find_header_end, is_success, parse_status_code, write_request_head};
pub use payload::{payload_len, write_head, write_payload, write_record, PayloadHeader};
pub use trigger::{TriggerDecision, UploadTrigger};
