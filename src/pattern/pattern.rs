use std::fmt;

/// Byte pattern with wildcard mask, written as "48 8B 05 ?? ?? ?? ??".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    bytes: Vec<u8>,
    mask: Vec<bool>,
}

impl Pattern {
    pub fn new(bytes: Vec<u8>, mask: Vec<bool>) -> Self {
        assert_eq!(bytes.len(), mask.len(), "pattern bytes and mask must have same length");
        Self { bytes, mask }
    }

    pub fn from_hex(hex: &str) -> Result<Self, String> {
        let mut bytes = Vec::new();
        let mut mask = Vec::new();
        for part in hex.split_whitespace() {
            if part == "??" || part == "?" {
                bytes.push(0);
                mask.push(false);
            } else {
                let byte = u8::from_str_radix(part, 16)
                    .map_err(|_| format!("bad pattern token '{}'", part))?;
                bytes.push(byte);
                mask.push(true);
            }
        }
        if bytes.is_empty() {
            return Err("empty pattern".to_string());
        }
        Ok(Self { bytes, mask })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn matches(&self, data: &[u8]) -> bool {
        if data.len() < self.bytes.len() {
            return false;
        }
        self.bytes
            .iter()
            .zip(self.mask.iter())
            .zip(data.iter())
            .all(|((pattern_byte, &significant), &data_byte)| {
                !significant || *pattern_byte == data_byte
            })
    }

    pub fn find_in(&self, data: &[u8]) -> Option<usize> {
        if self.bytes.is_empty() || data.len() < self.bytes.len() {
            return None;
        }

        let first_significant = self.mask.iter().position(|&m| m).unwrap_or(0);
        let first_byte = self.bytes[first_significant];

        for i in 0..=(data.len() - self.bytes.len()) {
            if data[i + first_significant] == first_byte && self.matches(&data[i..]) {
                return Some(i);
            }
        }
        None
    }

    pub fn to_hex_string(&self) -> String {
        self.bytes
            .iter()
            .zip(self.mask.iter())
            .map(|(b, &m)| if m { format!("{:02X}", b) } else { "??".to_string() })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trip() {
        let p = Pattern::from_hex("48 8B 05 ?? ?? ?? ?? C3").unwrap();
        assert_eq!(p.len(), 8);
        assert_eq!(p.to_hex_string(), "48 8B 05 ?? ?? ?? ?? C3");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Pattern::from_hex("48 XY").is_err());
        assert!(Pattern::from_hex("").is_err());
    }

    #[test]
    fn wildcard_match() {
        let p = Pattern::from_hex("48 8B ?? C3").unwrap();
        assert!(p.matches(&[0x48, 0x8B, 0x99, 0xC3]));
        assert!(!p.matches(&[0x48, 0x8B, 0x99, 0xC4]));
        assert!(!p.matches(&[0x48, 0x8B]));
    }

    #[test]
    fn find_in_buffer() {
        let p = Pattern::from_hex("DE AD ?? EF").unwrap();
        let data = [0x00, 0x11, 0xDE, 0xAD, 0x42, 0xEF, 0x33];
        assert_eq!(p.find_in(&data), Some(2));
        assert_eq!(p.find_in(&[0x00; 16]), None);
    }
}
