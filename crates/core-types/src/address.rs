//! Address canonicalization.
//!
//! EVM addresses are case-insensitive; Solana (Base58) addresses are
//! case-significant. `TokenPool`, `PortfolioManager`, and every collaborator
//! adapter must key on the same canonical form or state silently splits
//! across casing variants (spec §4.1, §9).

/// Lowercases EVM-style addresses, leaves everything else (notably Base58
/// Solana addresses) untouched.
///
/// We can't reliably tell an address's chain family from its shape alone in
/// every case, so canonicalization is driven by the blockchain id the caller
/// already knows, not by sniffing the address string.
pub fn canonicalize(raw_address: &str, blockchain: &str) -> String {
    if is_case_insensitive_chain(blockchain) {
        raw_address.to_lowercase()
    } else {
        raw_address.to_string()
    }
}

fn is_case_insensitive_chain(blockchain: &str) -> bool {
    !matches!(crate::chain::normalize(blockchain).as_deref(), Some("solana"))
}

/// The composite key every per-token state store (`TokenPool`, `Portfolio`
/// positions) indexes by.
pub fn key(raw_address: &str, blockchain: &str) -> (String, String) {
    let canonical_chain = crate::chain::normalize(blockchain)
        .unwrap_or_else(|| blockchain.to_lowercase());
    (canonicalize(raw_address, &canonical_chain), canonical_chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evm_addresses_are_lowercased() {
        let mixed = "0xABCDef1234567890ABCDef1234567890ABCDef12";
        assert_eq!(canonicalize(mixed, "ethereum"), mixed.to_lowercase());
        assert_eq!(canonicalize(mixed, "bsc"), mixed.to_lowercase());
    }

    #[test]
    fn solana_addresses_are_preserved_verbatim() {
        let base58 = "4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R";
        assert_eq!(canonicalize(base58, "solana"), base58);
    }

    #[test]
    fn key_normalizes_chain_alias_and_case() {
        let (addr, chain) = key("0xAAA", "bnb");
        assert_eq!(addr, "0xaaa");
        assert_eq!(chain, "bsc");
    }
}
