//! Stream decoder and encoder
//!
//! The only place words and floats meet. The decoder reads exactly `D_IN`
//! words and reinterprets each bit pattern as binary32; the encoder writes one
//! word per class and sets the end-of-message flag on the last one only.

use crate::engine::{InputVector, Logits};
use crate::error::Result;
use crate::io::{WordSink, WordSource};
use cnn1d_ip::{Dims, StreamWord};
use tracing::trace;

/// Read one input vector.
///
/// Any end-of-message flag on the input side is ignored; length conformance is
/// the caller's obligation.
///
/// # Errors
///
/// Returns [`Cnn1dError::ChannelClosed`](crate::Cnn1dError::ChannelClosed) if
/// the source runs dry before `D_IN` words.
pub fn decode_vector<S: WordSource + ?Sized>(source: &mut S, dims: &Dims) -> Result<InputVector> {
    let n = dims.input_words();
    let mut values = Vec::with_capacity(n);
    for i in 0..n {
        let word = source.read_word(i, n)?;
        values.push(word.value());
    }
    trace!("decoded {n} words");
    Ok(InputVector::from_decoded(values))
}

/// Write finished logits as one framed message.
///
/// Returns the number of words written.
///
/// # Errors
///
/// Returns [`Cnn1dError::SinkClosed`](crate::Cnn1dError::SinkClosed) if the
/// consumer goes away mid-message.
pub fn encode_logits<S: WordSink + ?Sized>(logits: &Logits, sink: &mut S) -> Result<usize> {
    let values = logits.as_slice();
    let n = values.len();
    for (c, &v) in values.iter().enumerate() {
        let word = StreamWord::from_f32(v).with_last(c + 1 == n);
        sink.write_word(word, c, n)?;
    }
    trace!("encoded {n} words");
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LogitsAccumulator;
    use crate::error::Cnn1dError;
    use crate::io::frame_vector;
    use std::collections::VecDeque;

    #[test]
    fn decode_reads_exactly_d_in_and_leaves_the_rest() {
        let dims = Dims::new(3, 1, 1);
        let mut src: VecDeque<StreamWord> = frame_vector(&[1.0, -2.0, 3.5, 99.0]).into();
        let x = decode_vector(&mut src, &dims).unwrap();
        assert_eq!(x.as_slice(), &[1.0, -2.0, 3.5]);
        assert_eq!(src.len(), 1);
    }

    #[test]
    fn decode_ignores_input_last_flag() {
        let dims = Dims::new(2, 1, 1);
        let mut src: VecDeque<StreamWord> = VecDeque::from(vec![
            StreamWord::from_f32(1.0).with_last(true),
            StreamWord::from_f32(2.0).with_last(true),
        ]);
        let x = decode_vector(&mut src, &dims).unwrap();
        assert_eq!(x.as_slice(), &[1.0, 2.0]);
    }

    #[test]
    fn decode_is_bit_exact_for_odd_patterns() {
        let dims = Dims::new(2, 1, 1);
        let mut src: VecDeque<StreamWord> = VecDeque::from(vec![
            StreamWord { data: 0x8000_0000, last: false },
            StreamWord { data: 0x0000_0001, last: false },
        ]);
        let x = decode_vector(&mut src, &dims).unwrap();
        assert_eq!(x.as_slice()[0].to_bits(), 0x8000_0000);
        assert_eq!(x.as_slice()[1].to_bits(), 0x0000_0001);
    }

    #[test]
    fn short_input_is_channel_closed() {
        let dims = Dims::new(4, 1, 1);
        let mut src: VecDeque<StreamWord> = frame_vector(&[1.0, 2.0]).into();
        let err = decode_vector(&mut src, &dims).unwrap_err();
        assert!(matches!(
            err,
            Cnn1dError::ChannelClosed { received: 2, expected: 4 }
        ));
    }

    #[test]
    fn encoder_sets_last_on_final_word_only() {
        let logits = LogitsAccumulator::from_bias(&[0.5, -1.0, 2.0]).finish();
        let mut out = Vec::new();
        assert_eq!(encode_logits(&logits, &mut out).unwrap(), 3);
        let flags: Vec<bool> = out.iter().map(|w| w.last).collect();
        assert_eq!(flags, [false, false, true]);
        let values: Vec<f32> = out.iter().map(StreamWord::value).collect();
        assert_eq!(values, [0.5, -1.0, 2.0]);
    }

    #[test]
    fn single_class_message_is_its_own_last_word() {
        let logits = LogitsAccumulator::from_bias(&[1.0]).finish();
        let mut out = Vec::new();
        encode_logits(&logits, &mut out).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].last);
    }
}
