/// Position of a cell on the wall, `0..cell_count`.
pub type CellIndex = u16;

/// Position of a card in the dealt deck, `0..CARD_COUNT`.
pub type CardId = u8;

/// Whole seconds, used by the countdown.
pub type Seconds = u32;

/// Milliseconds, used for timer periods and delays.
pub type Millis = u32;

/// Store namespace holding one thumbnail per unlocked cell.
pub const STORE_NAMESPACE: &str = "logos";

/// Key of a cell inside [`STORE_NAMESPACE`].
pub fn store_key(index: CellIndex) -> String {
    index.to_string()
}

/// Full store path of a cell, `logos/<index>`.
pub fn store_path(index: CellIndex) -> String {
    format!("{}/{}", STORE_NAMESPACE, index)
}

/// Decodes a store key back into a cell index, rejecting anything that isn't a plain decimal number.
pub fn parse_store_key(key: &str) -> Option<CellIndex> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_paths_live_under_logos() {
        assert_eq!(store_key(42), "42");
        assert_eq!(store_path(42), "logos/42");
    }

    #[test]
    fn store_keys_must_be_plain_decimals() {
        assert_eq!(parse_store_key("0"), Some(0));
        assert_eq!(parse_store_key("999"), Some(999));
        assert_eq!(parse_store_key(""), None);
        assert_eq!(parse_store_key("+1"), None);
        assert_eq!(parse_store_key("-1"), None);
        assert_eq!(parse_store_key("4 2"), None);
        assert_eq!(parse_store_key("70000"), None);
    }
}
