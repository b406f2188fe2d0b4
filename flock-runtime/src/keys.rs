use flock::TimelineHandle;
use std::io::Read;
use std::thread::{self, JoinHandle};
#[allow(unused)]
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyCommand {
    Pause,
    Resume,
    Quit,
}

impl KeyCommand {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'p' => Some(KeyCommand::Pause),
            b'r' => Some(KeyCommand::Resume),
            b'q' => Some(KeyCommand::Quit),
            _ => None,
        }
    }
}

/// Read keys from stdin on a dedicated thread and turn them into timeline commands.
///
/// The thread only posts commands; it stops once the timeline is gone or stdin closes.
pub(crate) fn spawn_key_control(handle: TimelineHandle) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("flock-keys".to_string())
        .spawn(move || {
            info!("Key control: p = pause, r = resume, q = quit");
            for byte in std::io::stdin().lock().bytes() {
                let byte = match byte {
                    Ok(byte) => byte,
                    Err(err) => {
                        warn!("Stopped reading keys: {err}");
                        return;
                    }
                };
                let Some(command) = KeyCommand::from_byte(byte) else {
                    continue;
                };
                debug!("Key command {command:?}");
                let posted = match command {
                    KeyCommand::Pause => handle.pause_all(),
                    KeyCommand::Resume => handle.resume_all(),
                    KeyCommand::Quit => handle.shutdown(),
                };
                if !posted || command == KeyCommand::Quit {
                    return;
                }
            }
        })
}
