//! Custom test assertions for allocated runs and stream chains

use seqlog::traits::TokenResponse;
use seqlog::types::LogPosition;

/// Assert that runs are strictly increasing and never overlap
pub fn assert_disjoint_runs(responses: &[TokenResponse]) {
    let mut runs: Vec<(u64, u64)> = responses
        .iter()
        .filter(|r| r.count > 0)
        .map(|r| (r.first_position.value(), r.first_position.value() + r.count))
        .collect();
    runs.sort_unstable();

    for pair in runs.windows(2) {
        assert!(
            pair[0].1 <= pair[1].0,
            "Runs {:?} and {:?} overlap",
            pair[0],
            pair[1]
        );
    }
}

/// Assert that the runs exactly cover `[0, end)`
pub fn assert_dense_prefix(responses: &[TokenResponse], end: LogPosition) {
    let mut positions: Vec<u64> = responses
        .iter()
        .flat_map(|r| r.positions())
        .map(LogPosition::value)
        .collect();
    positions.sort_unstable();

    let expected: Vec<u64> = (0..end.value()).collect();
    assert_eq!(positions, expected, "Allocated positions leave gaps or repeat");
}
