//! The closed command vocabulary and its wire protocol.
//!
//! Every spoken command maps to exactly one printable ASCII byte, which is
//! what actually crosses the serial link. Classifier class indices refer to
//! positions in this set, so the order here must match the label order the
//! model was trained with.

use crate::error::{Result, VoxdriveError};

/// One spoken command and the byte its firmware counterpart expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Spoken label, lower-case, in the target language.
    pub label: String,
    /// Single ASCII byte written to the serial link.
    pub code: u8,
}

impl CommandSpec {
    pub fn new(label: impl Into<String>, code: u8) -> Self {
        Self {
            label: label.into(),
            code,
        }
    }
}

/// Ordered, validated set of recognizable commands.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    commands: Vec<CommandSpec>,
    stop_index: usize,
}

impl Vocabulary {
    /// Build a vocabulary, validating the label/code mapping.
    ///
    /// # Errors
    ///
    /// `VoxdriveError::Vocabulary` if the set is empty, a label is blank, a
    /// code is not printable ASCII, two commands share a label or a code, or
    /// `stop_index` is out of range.
    pub fn new(commands: Vec<CommandSpec>, stop_index: usize) -> Result<Self> {
        if commands.is_empty() {
            return Err(VoxdriveError::Vocabulary("no commands defined".into()));
        }
        if stop_index >= commands.len() {
            return Err(VoxdriveError::Vocabulary(format!(
                "stop index {} out of range for {} commands",
                stop_index,
                commands.len()
            )));
        }
        for (i, cmd) in commands.iter().enumerate() {
            if cmd.label.trim().is_empty() {
                return Err(VoxdriveError::Vocabulary(format!("command {i} has a blank label")));
            }
            if !cmd.code.is_ascii_graphic() {
                return Err(VoxdriveError::Vocabulary(format!(
                    "command '{}' has non-printable code 0x{:02x}",
                    cmd.label, cmd.code
                )));
            }
            for other in &commands[..i] {
                if other.label == cmd.label {
                    return Err(VoxdriveError::Vocabulary(format!("duplicate label '{}'", cmd.label)));
                }
                if other.code == cmd.code {
                    return Err(VoxdriveError::Vocabulary(format!(
                        "commands '{}' and '{}' share code '{}'",
                        other.label, cmd.label, cmd.code as char
                    )));
                }
            }
        }
        Ok(Self { commands, stop_index })
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(|c| c.label.as_str())
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.commands.get(index).map(|c| c.label.as_str())
    }

    pub fn code(&self, index: usize) -> Option<u8> {
        self.commands.get(index).map(|c| c.code)
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.commands.iter().position(|c| c.label == label)
    }

    /// Index of the command that halts the vehicle.
    pub fn stop_index(&self) -> usize {
        self.stop_index
    }

    /// Wire code of the stop command. Sent once more during shutdown.
    pub fn stop_code(&self) -> u8 {
        self.commands[self.stop_index].code
    }
}

impl Default for Vocabulary {
    /// The five Turkish drive commands understood by the rover firmware.
    fn default() -> Self {
        Self::new(
            vec![
                CommandSpec::new("ileri git", b'0'),
                CommandSpec::new("geri gel", b'1'),
                CommandSpec::new("saga dön", b'2'),
                CommandSpec::new("sola dön", b'3'),
                CommandSpec::new("dur", b'4'),
            ],
            4,
        )
        .expect("built-in vocabulary is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_vocabulary_has_five_commands_with_digit_codes() {
        let vocab = Vocabulary::default();
        assert_eq!(vocab.len(), 5);
        let codes: Vec<u8> = (0..vocab.len()).map(|i| vocab.code(i).unwrap()).collect();
        assert_eq!(codes, vec![b'0', b'1', b'2', b'3', b'4']);
        assert_eq!(vocab.stop_code(), b'4');
        assert_eq!(vocab.label(vocab.stop_index()), Some("dur"));
    }

    #[test]
    fn index_lookup_is_total_over_labels() {
        let vocab = Vocabulary::default();
        for (i, label) in vocab.labels().enumerate() {
            assert_eq!(vocab.index_of(label), Some(i));
        }
        assert_eq!(vocab.index_of("merhaba"), None);
    }

    #[test]
    fn duplicate_code_is_rejected() {
        let result = Vocabulary::new(
            vec![CommandSpec::new("a", b'0'), CommandSpec::new("b", b'0')],
            0,
        );
        assert!(matches!(result, Err(VoxdriveError::Vocabulary(_))));
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let result = Vocabulary::new(
            vec![CommandSpec::new("a", b'0'), CommandSpec::new("a", b'1')],
            0,
        );
        assert!(matches!(result, Err(VoxdriveError::Vocabulary(_))));
    }

    #[test]
    fn non_printable_code_is_rejected() {
        let result = Vocabulary::new(vec![CommandSpec::new("a", 0x07)], 0);
        assert!(matches!(result, Err(VoxdriveError::Vocabulary(_))));
    }

    #[test]
    fn stop_index_out_of_range_is_rejected() {
        let result = Vocabulary::new(vec![CommandSpec::new("a", b'0')], 3);
        assert!(matches!(result, Err(VoxdriveError::Vocabulary(_))));
    }

    #[test]
    fn empty_vocabulary_is_rejected() {
        assert!(matches!(
            Vocabulary::new(vec![], 0),
            Err(VoxdriveError::Vocabulary(_))
        ));
    }
}
