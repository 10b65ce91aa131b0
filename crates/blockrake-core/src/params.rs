//! LBRY chain parameters.
//!
//! Only mainnet is compiled in; the reader never talks to the network, so
//! these exist for address encoding and block-file framing rather than
//! peer-to-peer negotiation.

/// Static parameters of an LBRY chain.
#[derive(Debug, Clone, Copy)]
pub struct ChainParams {
    /// Base58check version byte for pay-to-pubkey-hash addresses.
    pub pubkey_hash_prefix: u8,
    /// Base58check version byte for pay-to-script-hash addresses.
    pub script_hash_prefix: u8,
    /// WIF private key prefix.
    pub privkey_prefix: u8,
    /// Human-readable part for witness v0 bech32 addresses.
    pub bech32_hrp: &'static str,
    /// Block-file record magic as it appears on disk (0xFAE4AAF1, little-endian).
    pub magic: [u8; 4],
    /// Default peer-to-peer port.
    pub default_port: u16,
    /// Height at which BIP34 (height in coinbase) activated.
    pub bip34_height: u64,
    /// Height at which BIP65 (CHECKLOCKTIMEVERIFY) activated.
    pub bip65_height: u64,
    /// Height at which BIP66 (strict DER) activated.
    pub bip66_height: u64,
}

/// LBRY mainnet.
pub const MAINNET: ChainParams = ChainParams {
    pubkey_hash_prefix: 0x55,
    script_hash_prefix: 0x7a,
    privkey_prefix: 0x1c,
    bech32_hrp: "lbc",
    magic: [0xfa, 0xe4, 0xaa, 0xf1],
    default_port: 9246,
    bip34_height: 1,
    bip65_height: 200_000,
    bip66_height: 200_000,
};
