//! Build-time configuration constants, generated by `build.rs` from
//! `btmalloc.toml` (path overridable via the `BTMALLOC_CONFIG` environment
//! variable).

include!(concat!(env!("OUT_DIR"), "/config_gen.rs"));

// build.rs validates these, but the generated file can be edited by hand.
const _: () = assert!(MIN_SPAN_SIZE.is_power_of_two());
const _: () = assert!(MIN_SPAN_SIZE >= 65536);
