//! Cashaddr encoding for P2PKH and P2SH destinations.

const CHARSET: &[u8] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

const GENERATOR: [u64; 5] = [
    0x98f2bc8e61,
    0x79b76d99e2,
    0xf33e5fb3c4,
    0xae2eabe2a8,
    0x1e4f43e470,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    PubKeyHash,
    ScriptHash,
}

impl AddressKind {
    fn version_byte(self) -> u8 {
        // type bits << 3, size bits 0 for 160-bit hashes
        match self {
            AddressKind::PubKeyHash => 0,
            AddressKind::ScriptHash => 8,
        }
    }
}

/// Encode a 20-byte hash as `prefix:payload`.
pub fn encode(prefix: &str, kind: AddressKind, hash: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(kind.version_byte());
    payload.extend_from_slice(hash);

    let mut data = convert_bits(&payload);

    let mut checksum_input: Vec<u8> = prefix.bytes().map(|b| b & 0x1f).collect();
    checksum_input.push(0);
    checksum_input.extend_from_slice(&data);
    checksum_input.extend_from_slice(&[0u8; 8]);

    let checksum = polymod(&checksum_input);
    for i in 0..8 {
        data.push(((checksum >> (5 * (7 - i))) & 0x1f) as u8);
    }

    let encoded: String = data.iter().map(|&d| CHARSET[d as usize] as char).collect();
    format!("{prefix}:{encoded}")
}

fn convert_bits(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() * 8 / 5 + 1);
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    for &b in payload {
        acc = (acc << 8) | b as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(((acc >> bits) & 0x1f) as u8);
        }
    }
    if bits > 0 {
        out.push(((acc << (5 - bits)) & 0x1f) as u8);
    }
    out
}

fn polymod(values: &[u8]) -> u64 {
    let mut c: u64 = 1;
    for &d in values {
        let c0 = (c >> 35) as u8;
        c = ((c & 0x07ff_ffff_ff) << 5) ^ d as u64;
        for (i, gen) in GENERATOR.iter().enumerate() {
            if c0 & (1 << i) != 0 {
                c ^= gen;
            }
        }
    }
    c ^ 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_p2pkh_vector() {
        // hash160 of the all-zero 20-byte array, reference vector from the
        // cashaddr announcement
        let hash: [u8; 20] = hex::decode("76a04053bda0a88bda5177b86a15c3b29f559873")
            .unwrap()
            .try_into()
            .unwrap();
        assert_eq!(
            encode("bitcoincash", AddressKind::PubKeyHash, &hash),
            "bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a"
        );
    }

    #[test]
    fn known_p2sh_vector() {
        let hash: [u8; 20] = hex::decode("76a04053bda0a88bda5177b86a15c3b29f559873")
            .unwrap()
            .try_into()
            .unwrap();
        assert_eq!(
            encode("bitcoincash", AddressKind::ScriptHash, &hash),
            "bitcoincash:ppm2qsznhks23z7629mms6s4cwef74vcwvn0h829pq"
        );
    }

    #[test]
    fn prefix_changes_checksum() {
        let hash = [5u8; 20];
        let mainnet = encode("bitcoincash", AddressKind::PubKeyHash, &hash);
        let testnet = encode("bchtest", AddressKind::PubKeyHash, &hash);
        assert_ne!(
            mainnet.split(':').nth(1).unwrap(),
            testnet.split(':').nth(1).unwrap()
        );
    }
}
