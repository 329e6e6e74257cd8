//! Word channels
//!
//! The kernel talks to the outside world through two blocking word streams.
//! A read suspends until a word is available; a write suspends while the
//! consumer applies backpressure. Neither side inspects anything beyond the
//! data word and the end-of-message flag.

use crate::error::{Cnn1dError, Result};
use cnn1d_ip::StreamWord;
use crossbeam_channel::{Receiver, Sender};
use std::collections::VecDeque;

/// Blocking source of input words.
pub trait WordSource {
    /// Read one word, blocking until it arrives.
    ///
    /// `position` and `expected` describe where the reader is within the
    /// current message and are only used to describe a premature close.
    ///
    /// # Errors
    ///
    /// Returns [`Cnn1dError::ChannelClosed`] if the source has no more words.
    fn read_word(&mut self, position: usize, expected: usize) -> Result<StreamWord>;
}

/// Blocking sink for output words.
pub trait WordSink {
    /// Write one word, blocking while the consumer is not ready.
    ///
    /// # Errors
    ///
    /// Returns [`Cnn1dError::SinkClosed`] if the consumer is gone.
    fn write_word(&mut self, word: StreamWord, position: usize, expected: usize) -> Result<()>;
}

impl WordSource for Receiver<StreamWord> {
    fn read_word(&mut self, position: usize, expected: usize) -> Result<StreamWord> {
        self.recv().map_err(|_| Cnn1dError::ChannelClosed {
            received: position,
            expected,
        })
    }
}

impl WordSink for Sender<StreamWord> {
    fn write_word(&mut self, word: StreamWord, position: usize, expected: usize) -> Result<()> {
        self.send(word).map_err(|_| Cnn1dError::SinkClosed {
            written: position,
            expected,
        })
    }
}

impl WordSource for VecDeque<StreamWord> {
    fn read_word(&mut self, position: usize, expected: usize) -> Result<StreamWord> {
        self.pop_front().ok_or(Cnn1dError::ChannelClosed {
            received: position,
            expected,
        })
    }
}

impl WordSink for Vec<StreamWord> {
    fn write_word(&mut self, word: StreamWord, _position: usize, _expected: usize) -> Result<()> {
        self.push(word);
        Ok(())
    }
}

impl<S: WordSource + ?Sized> WordSource for &mut S {
    fn read_word(&mut self, position: usize, expected: usize) -> Result<StreamWord> {
        (**self).read_word(position, expected)
    }
}

impl<S: WordSink + ?Sized> WordSink for &mut S {
    fn write_word(&mut self, word: StreamWord, position: usize, expected: usize) -> Result<()> {
        (**self).write_word(word, position, expected)
    }
}

/// Frame a float vector as words, setting `last` on the final one.
///
/// This is how a host drives the input channel; the decoder ignores the flag.
pub fn frame_vector(values: &[f32]) -> Vec<StreamWord> {
    let n = values.len();
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| StreamWord::from_f32(v).with_last(i + 1 == n))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deque_reports_position_on_close() {
        let mut src: VecDeque<StreamWord> = frame_vector(&[1.0]).into();
        assert!(src.read_word(0, 3).is_ok());
        match src.read_word(1, 3) {
            Err(Cnn1dError::ChannelClosed { received, expected }) => {
                assert_eq!((received, expected), (1, 3));
            }
            other => panic!("expected ChannelClosed, got {other:?}"),
        }
    }

    #[test]
    fn disconnected_sender_is_sink_closed() {
        let (mut tx, rx) = crossbeam_channel::bounded::<StreamWord>(1);
        drop(rx);
        let err = tx.write_word(StreamWord::default(), 0, 2).unwrap_err();
        assert!(matches!(err, Cnn1dError::SinkClosed { written: 0, expected: 2 }));
    }

    #[test]
    fn framed_vector_marks_only_final_word() {
        let words = frame_vector(&[1.0, 2.0, 3.0]);
        let flags: Vec<bool> = words.iter().map(|w| w.last).collect();
        assert_eq!(flags, [false, false, true]);
    }
}
