//! Speak fragments through an external TTS program (`say`, `espeak-ng` …).

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::Mutex;

use super::{Voice, VoiceError};

/// Runs `command[0] command[1..] <fragment>` and waits for it to exit.
#[derive(Debug)]
pub struct CommandVoice {
    program: String,
    args: Vec<String>,
    playing: Mutex<()>,
}

impl CommandVoice {
    /// `command` is the program followed by any leading arguments.
    pub fn new(command: &[String]) -> Result<Self, VoiceError> {
        let (program, args) = command.split_first().ok_or(VoiceError::NoCommand)?;
        if program.trim().is_empty() {
            return Err(VoiceError::NoCommand);
        }
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            playing: Mutex::new(()),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl Voice for CommandVoice {
    async fn speak(&self, text: &str) -> Result<(), VoiceError> {
        let _playing = self.playing.lock().await;

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| VoiceError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(VoiceError::ExitStatus {
                program: self.program.clone(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(matches!(CommandVoice::new(&[]), Err(VoiceError::NoCommand)));
        assert!(matches!(
            CommandVoice::new(&cmd(&[" "])),
            Err(VoiceError::NoCommand)
        ));
    }

    #[test]
    fn program_and_args_are_split() {
        let v = CommandVoice::new(&cmd(&["espeak-ng", "-v", "en"])).unwrap();
        assert_eq!(v.program(), "espeak-ng");
        assert_eq!(v.args, vec!["-v", "en"]);
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let v = CommandVoice::new(&cmd(&["/nonexistent/tts-binary"])).unwrap();
        assert!(matches!(v.speak("hi").await, Err(VoiceError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_status_is_checked() {
        let ok = CommandVoice::new(&cmd(&["true"])).unwrap();
        ok.speak("hello").await.unwrap();

        let failing = CommandVoice::new(&cmd(&["false"])).unwrap();
        assert!(matches!(
            failing.speak("hello").await,
            Err(VoiceError::ExitStatus { .. })
        ));
    }
}
