/// Python `complex`: a pair of IEEE doubles.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    #[must_use]
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Native-endian bytes of the real then imaginary part.
    #[must_use]
    pub fn to_ne_bytes(self) -> [u8; 16] {
        let mut out = [0_u8; 16];
        out[..8].copy_from_slice(&self.re.to_ne_bytes());
        out[8..].copy_from_slice(&self.im.to_ne_bytes());
        out
    }
}
