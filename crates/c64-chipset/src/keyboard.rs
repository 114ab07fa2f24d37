//! Keyboard matrix scanned through CIA 1.
//!
//! The 64 keys form an 8x8 matrix. CIA 1 drives a column-select pattern
//! on port A (active low) and reads the row lines back on port B, also
//! active low: a pressed key pulls its row low whenever its column is
//! selected.

/// Pressed-key state for the 8x8 matrix, one bit per key.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyboardMatrix {
    mask: u64,
}

impl KeyboardMatrix {
    #[must_use]
    pub fn new() -> Self {
        Self { mask: 0 }
    }

    /// Press or release the key at `(col, row)`.
    pub fn set_key(&mut self, col: u8, row: u8, pressed: bool) {
        let bit = 1u64 << (u32::from(col & 7) * 8 + u32::from(row & 7));
        if pressed {
            self.mask |= bit;
        } else {
            self.mask &= !bit;
        }
    }

    /// Replace the whole matrix state, one byte per column.
    pub fn set_mask(&mut self, mask: u64) {
        self.mask = mask;
    }

    /// Row lines for a column-select pattern on port A. Selected columns
    /// (low bits of `pa`) merge their pressed rows, then the result is
    /// inverted for the active-low port B pins.
    #[must_use]
    pub fn scan(&self, pa: u8) -> u8 {
        let mut rows = 0u8;
        for col in 0..8 {
            if pa & (1 << col) == 0 {
                rows |= (self.mask >> (col * 8)) as u8;
            }
        }
        !rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_matrix_reads_all_high() {
        let kb = KeyboardMatrix::new();
        assert_eq!(kb.scan(0x00), 0xFF);
        assert_eq!(kb.scan(0xFE), 0xFF);
    }

    #[test]
    fn pressed_key_pulls_its_row_low() {
        let mut kb = KeyboardMatrix::new();
        kb.set_key(1, 2, true);
        // Column 1 selected (bit 1 low): row 2 reads low.
        assert_eq!(kb.scan(0xFD), 0xFB);
        // Column not selected: nothing pulls.
        assert_eq!(kb.scan(0xFE), 0xFF);

        kb.set_key(1, 2, false);
        assert_eq!(kb.scan(0xFD), 0xFF);
    }

    #[test]
    fn multiple_selected_columns_merge() {
        let mut kb = KeyboardMatrix::new();
        kb.set_key(0, 0, true);
        kb.set_key(3, 7, true);
        // Both columns selected: both rows pull low.
        assert_eq!(kb.scan(!0b0000_1001), 0x7E);
        // Scanning all columns at once sees every pressed key.
        assert_eq!(kb.scan(0x00), 0x7E);
    }
}
