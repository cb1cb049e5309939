mod const_gql {
    include!(concat!(env!("OUT_DIR"), "/const_gql.rs"));
}

mod fetcher;
pub use fetcher::*;

mod types;
pub use types::*;

use crate::config::ProtocolVersion;

const TIMESTAMP_PLACEHOLDER: &str = "$timestamp_gt";

/// Builds the swaps query for `version`, selecting swaps newer than `timestamp_gt`.
pub fn swaps_query(version: ProtocolVersion, timestamp_gt: u64) -> String {
    let template = match version {
        ProtocolVersion::V2 => const_gql::SWAPS_V2,
        ProtocolVersion::V3 => const_gql::SWAPS_V3,
    };

    template.replace(TIMESTAMP_PLACEHOLDER, &timestamp_gt.to_string())
}
