//! Demo market-data tick carried as a queue payload.
//!
//! The struct is POD and padding-free so its wire form is exactly its
//! fields; the codec below writes them little-endian at fixed offsets,
//! matching what every process on the bus expects:
//!
//! ```text
//! offset 0   symbol:  [u8; 16]   NUL-padded ASCII
//! offset 16  price:   f64
//! offset 24  volume:  u64
//! ```

/// Encoded size of one tick on the bus.
pub const MARKET_DATA_WIRE_BYTES: usize = 32;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MarketData {
    /// Instrument symbol, NUL-padded.
    pub symbol: [u8; 16],
    pub price: f64,
    pub volume: u64,
}

impl MarketData {
    /// Build a tick, truncating `symbol` to 16 bytes.
    pub fn new(symbol: &str, price: f64, volume: u64) -> MarketData {
        let mut buf = [0u8; 16];
        let bytes = symbol.as_bytes();
        let len = bytes.len().min(buf.len());
        buf[..len].copy_from_slice(&bytes[..len]);
        MarketData {
            symbol: buf,
            price,
            volume,
        }
    }

    /// Symbol with the NUL padding stripped.
    pub fn symbol_str(&self) -> &str {
        let end = self
            .symbol
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.symbol.len());
        std::str::from_utf8(&self.symbol[..end]).unwrap_or("")
    }

    /// Encode as a queue payload.
    pub fn to_bytes(&self) -> [u8; MARKET_DATA_WIRE_BYTES] {
        let mut buf = [0u8; MARKET_DATA_WIRE_BYTES];
        buf[0..16].copy_from_slice(&self.symbol);
        buf[16..24].copy_from_slice(&self.price.to_le_bytes());
        buf[24..32].copy_from_slice(&self.volume.to_le_bytes());
        buf
    }

    /// Decode from the payload bytes of a consumed frame.
    ///
    /// # Panics
    /// Panics if `buf` is shorter than [`MARKET_DATA_WIRE_BYTES`].
    pub fn read_from(buf: &[u8]) -> MarketData {
        let mut symbol = [0u8; 16];
        symbol.copy_from_slice(&buf[0..16]);
        MarketData {
            symbol,
            price: f64::from_le_bytes(buf[16..24].try_into().unwrap()),
            volume: u64::from_le_bytes(buf[24..32].try_into().unwrap()),
        }
    }
}
