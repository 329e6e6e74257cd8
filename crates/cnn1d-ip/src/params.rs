//! Layer dimensions shared by decoder, engine and encoder.

/// Convolution kernel width. Fixed: the sliding window carries three taps.
pub const KERNEL_WIDTH: usize = 3;

/// Dimensions of one kernel instance.
///
/// A deployment fixes these once; decoder, engine and encoder all read the
/// same value, so word counts and table shapes can never disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dims {
    /// Input vector length (`D_IN`).
    pub d_in: usize,
    /// Number of convolution filters (`CONV1_OUT`).
    pub conv_out: usize,
    /// Number of output classes (`CLASSES`).
    pub classes: usize,
}

impl Dims {
    /// Create a dimension set.
    #[must_use]
    pub const fn new(d_in: usize, conv_out: usize, classes: usize) -> Self {
        Self {
            d_in,
            conv_out,
            classes,
        }
    }

    /// Number of words the decoder reads per invocation.
    #[must_use]
    pub const fn input_words(&self) -> usize {
        self.d_in
    }

    /// Number of words the encoder writes per invocation.
    #[must_use]
    pub const fn output_words(&self) -> usize {
        self.classes
    }

    /// Flat length of the `CONV1_OUT × 3` convolution weight table.
    #[must_use]
    pub const fn conv_weight_len(&self) -> usize {
        self.conv_out * KERNEL_WIDTH
    }

    /// Rows of the dense weight table (`D_IN · CONV1_OUT`).
    #[must_use]
    pub const fn dense_rows(&self) -> usize {
        self.d_in * self.conv_out
    }

    /// Flat length of the `(D_IN · CONV1_OUT) × CLASSES` dense weight table.
    #[must_use]
    pub const fn dense_weight_len(&self) -> usize {
        self.dense_rows() * self.classes
    }

    /// Size of the intermediate activation map the fused engine never stores.
    #[must_use]
    pub const fn activation_map_len(&self) -> usize {
        self.dense_rows()
    }

    /// Total number of weights and biases.
    #[must_use]
    pub const fn parameter_count(&self) -> usize {
        self.conv_weight_len() + self.conv_out + self.dense_weight_len() + self.classes
    }

    /// Multiplies performed by one sweep (3 conv taps plus one per class, per `(t, f)`).
    #[must_use]
    pub const fn multiplies_per_call(&self) -> usize {
        self.dense_rows() * (KERNEL_WIDTH + self.classes)
    }
}

impl std::fmt::Display for Dims {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "D_IN={} CONV1_OUT={} CLASSES={}",
            self.d_in, self.conv_out, self.classes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_sizes() {
        let d = Dims::new(4, 1, 2);
        assert_eq!(d.conv_weight_len(), 3);
        assert_eq!(d.dense_rows(), 4);
        assert_eq!(d.dense_weight_len(), 8);
        assert_eq!(d.parameter_count(), 3 + 1 + 8 + 2);
        assert_eq!(d.multiplies_per_call(), 4 * (3 + 2));
    }

    #[test]
    fn display_names_all_three() {
        assert_eq!(Dims::new(64, 16, 7).to_string(), "D_IN=64 CONV1_OUT=16 CLASSES=7");
    }
}
