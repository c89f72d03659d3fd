//! Blockchain-id normalization (spec §6).
//!
//! Market-data and token-listing collaborators refer to chains under several
//! aliases (`bnb`/`bsc`, `sol`/`solana`, `eth`/`ethereum`). Every lookup key
//! built from a blockchain id must first pass through `normalize` so that the
//! same chain never splits across two string spellings.

/// Maps a known alias to its canonical id. `None` if the alias isn't
/// recognized — callers typically fall back to the lowercased input in that
/// case rather than failing outright, since new chains get added to the
/// collaborator side faster than to this registry.
pub fn normalize(alias: &str) -> Option<&'static str> {
    match alias.to_lowercase().as_str() {
        "eth" | "ethereum" => Some("ethereum"),
        "bnb" | "bsc" => Some("bsc"),
        "sol" | "solana" => Some("solana"),
        "base" => Some("base"),
        "arb" | "arbitrum" => Some("arbitrum"),
        _ => None,
    }
}

/// Builds the `{address}-{canonicalSuffix}` id market-data APIs expect
/// (spec §6).
pub fn market_data_id(address: &str, blockchain: &str) -> String {
    let suffix = normalize(blockchain)
        .map(str::to_string)
        .unwrap_or_else(|| blockchain.to_lowercase());
    format!("{address}-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_collapse_to_one_canonical_id() {
        assert_eq!(normalize("bnb"), Some("bsc"));
        assert_eq!(normalize("BSC"), Some("bsc"));
        assert_eq!(normalize("sol"), Some("solana"));
        assert_eq!(normalize("eth"), Some("ethereum"));
    }

    #[test]
    fn unknown_alias_returns_none() {
        assert_eq!(normalize("doge"), None);
    }

    #[test]
    fn market_data_id_formats_with_canonical_suffix() {
        assert_eq!(market_data_id("0xabc", "bnb"), "0xabc-bsc");
    }
}
