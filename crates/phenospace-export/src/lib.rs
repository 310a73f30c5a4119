//! phenospace-export: Pure table serializers (sans-IO)
//!
//! Converts analysis results into tab-delimited text, the format the
//! downstream reporting layer reads. Every function returns a `String`;
//! writing it anywhere is the caller's job.

pub mod tsv;

pub use tsv::{
    mutual_touch_to_tsv, nearest_distances_to_tsv, nearest_to_tsv, touch_to_tsv, within_to_tsv,
};
