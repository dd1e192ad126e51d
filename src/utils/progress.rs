use std::io::Write;

/// Render a console progress bar in place (carriage-return overwrite).
/// `done` is clamped to `limit`.
pub fn progbar(done: u64, limit: u64, width: usize) {
    let limit = limit.max(1);
    let done = done.min(limit);
    let filled = (done as usize * width) / limit as usize;
    let pct = done * 100 / limit;
    print!(
        "\r{pct:02}% {}{}",
        "\u{2593}".repeat(filled),
        "\u{2591}".repeat(width - filled)
    );
    let _ = std::io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::progbar;

    #[test]
    fn test_progbar_clamps_overshoot() {
        // must not panic or underflow the unfilled width
        progbar(10, 5, 50);
        progbar(0, 0, 50);
    }
}
