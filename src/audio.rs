use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use std::process::{Child, Command, Stdio};

/// Looping background music played by an external player process.
///
/// The player is killed when the handle drops.
pub struct BackgroundMusic {
    child: Child,
}

impl BackgroundMusic {
    pub fn spawn(command: &[String]) -> Result<Self> {
        let Some((program, args)) = command.split_first() else {
            bail!("No music command configured");
        };
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start music player '{}'", program))?;
        info!("Background music started (pid {})", child.id());
        Ok(Self { child })
    }

    /// Like [`spawn`](Self::spawn) but logs failures instead of returning
    /// them; the scene carries on silently.
    pub fn try_play(command: &[String]) -> Option<Self> {
        if command.is_empty() {
            debug!("Music disabled");
            return None;
        }
        match Self::spawn(command) {
            Ok(music) => Some(music),
            Err(e) => {
                warn!("{:#}", e);
                None
            }
        }
    }

    pub fn is_playing(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

impl Drop for BackgroundMusic {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            debug!("Music player already gone: {}", e);
        }
        let _ = self.child.wait();
        debug!("Background music released");
    }
}
