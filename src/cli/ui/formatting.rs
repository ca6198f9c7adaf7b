/// Money with two decimals and the configured symbol, sign first.
pub fn format_amount(symbol: &str, value: f64) -> String {
    if value < 0.0 {
        format!("-{symbol}{:.2}", value.abs())
    } else {
        format!("{symbol}{:.2}", value)
    }
}

/// Fixed-width ASCII bar, e.g. `[#####-----]` for 50%.
pub fn progress_bar(percent: u32, width: usize) -> String {
    let filled = (percent.min(100) as usize * width + 50) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_use_two_decimals() {
        assert_eq!(format_amount("$", 1500.0), "$1500.00");
        assert_eq!(format_amount("€", 12.345), "€12.35");
        assert_eq!(format_amount("$", -4.5), "-$4.50");
    }

    #[test]
    fn bars_round_to_nearest_cell() {
        assert_eq!(progress_bar(50, 10), "[#####-----]");
        assert_eq!(progress_bar(0, 4), "[----]");
        assert_eq!(progress_bar(100, 4), "[####]");
    }
}
