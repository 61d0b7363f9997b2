//! Block-count formatting helpers.

/// Format a span of blocks with its approximate wall-clock duration,
/// e.g. `144 blocks (~1d 0h)` at a 600-second block time.
pub fn format_blocks(blocks: u64, block_time_secs: u64) -> String {
    let secs = blocks.saturating_mul(block_time_secs);
    let approx = if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    };
    let unit = if blocks == 1 { "block" } else { "blocks" };
    format!("{blocks} {unit} (~{approx})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_each_scale() {
        assert_eq!(format_blocks(1, 30), "1 block (~30s)");
        assert_eq!(format_blocks(3, 600), "3 blocks (~30m 0s)");
        assert_eq!(format_blocks(144, 600), "144 blocks (~1d 0h)");
        assert_eq!(format_blocks(9, 600), "9 blocks (~1h 30m)");
    }
}
