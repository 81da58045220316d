//! Round-trip validation of encoded containers

mod roundtrip;

pub use roundtrip::validate_container;
