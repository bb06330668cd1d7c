// crates/batch-ledger-core/tests/proptest_codec.rs
// ============================================================================
// Module: Blob Codec Property-Based Tests
// Description: Property tests for blob framing and codec round-trips.
// Purpose: Ensure any payload round-trips and damaged frames never decode.
// ============================================================================

//! Property-based tests for blob codec invariants.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use batch_ledger_core::BlobCodec;
use batch_ledger_core::FrameCodec;
use batch_ledger_core::JobParameters;
use batch_ledger_core::JsonCodec;
use batch_ledger_core::RawBytesCodec;
use batch_ledger_core::codec::FRAME_HEADER_LEN;
use batch_ledger_core::codec::decode_frame;
use batch_ledger_core::codec::decode_value;
use batch_ledger_core::codec::encode_value;
use proptest::prelude::*;

proptest! {
    #[test]
    fn raw_bytes_round_trip_through_frame(bytes in prop::collection::vec(any::<u8>(), 0 .. 512)) {
        let framed = encode_value(&RawBytesCodec, &bytes).unwrap();
        prop_assert_eq!(framed.len(), FRAME_HEADER_LEN + bytes.len());
        prop_assert_eq!(decode_value(&RawBytesCodec, &framed).unwrap(), bytes);
    }

    #[test]
    fn optional_payload_round_trips(payload in prop::option::of(prop::collection::vec(any::<u8>(), 0 .. 256))) {
        let framed = FrameCodec.encode(&payload).unwrap();
        prop_assert_eq!(FrameCodec.decode(&framed).unwrap(), payload);
    }

    #[test]
    fn truncated_frames_never_decode(
        bytes in prop::collection::vec(any::<u8>(), 1 .. 256),
        cut in any::<prop::sample::Index>(),
    ) {
        let framed = encode_value(&RawBytesCodec, &bytes).unwrap();
        let keep = cut.index(framed.len());
        prop_assert!(decode_frame(&framed[.. keep]).is_err());
    }

    #[test]
    fn job_parameters_round_trip_as_json(
        entries in prop::collection::btree_map("[a-zA-Z0-9._-]{1,12}", ".{0,24}", 0 .. 8),
    ) {
        let parameters: JobParameters = entries.into_iter().collect();
        let codec = JsonCodec::<JobParameters>::new();
        let framed = encode_value(&codec, &parameters).unwrap();
        prop_assert_eq!(decode_value(&codec, &framed).unwrap(), parameters);
    }
}

#[test]
fn null_frame_is_not_a_value() {
    let framed = FrameCodec.encode(&None).unwrap();
    assert!(decode_value(&RawBytesCodec, &framed).is_err());
}

#[test]
fn json_codec_rejects_garbage_payload() {
    let codec = JsonCodec::<JobParameters>::new();
    assert!(codec.decode(b"{not json").is_err());
}
