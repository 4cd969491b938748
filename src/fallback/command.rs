use crate::error::{EraseError, EraseResult};
use crate::settings::CommandConfig;
use crate::DeviceIdentity;
use std::fmt;
use std::process::Command;

const DEVICE_PLACEHOLDER: &str = "{device}";
const DISK_PLACEHOLDER: &str = "{disk}";

/// diskpart script: zero every sector of the selected disk
pub const DISKPART_SCRIPT: &str =
    "select disk {disk}\nonline disk\nattributes disk clear readonly\nclean all\n";

/// Template for the external whole-disk wipe utility
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackCommand {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl FallbackCommand {
    /// Utility shipped with the OS, if this platform has one
    pub fn platform_default() -> Option<Self> {
        if cfg!(windows) {
            Some(Self::diskpart())
        } else if cfg!(target_os = "linux") {
            Some(Self::blkdiscard())
        } else {
            None
        }
    }

    pub fn diskpart() -> Self {
        Self {
            program: "diskpart".to_string(),
            args: Vec::new(),
            stdin: Some(DISKPART_SCRIPT.to_string()),
        }
    }

    pub fn blkdiscard() -> Self {
        Self {
            program: "blkdiscard".to_string(),
            args: vec!["--zeroout".to_string(), DEVICE_PLACEHOLDER.to_string()],
            stdin: None,
        }
    }

    pub fn from_config(config: &CommandConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            stdin: config.stdin.clone(),
        }
    }

    fn needs_disk_number(&self) -> bool {
        self.args.iter().any(|arg| arg.contains(DISK_PLACEHOLDER))
            || self.stdin.as_deref().is_some_and(|s| s.contains(DISK_PLACEHOLDER))
    }

    /// Substitute the device's path and disk number into the template
    pub fn render(&self, device: &DeviceIdentity) -> EraseResult<RenderedCommand> {
        let disk = match device.disk_number {
            Some(n) => n.to_string(),
            None if self.needs_disk_number() => {
                return Err(EraseError::ExternalToolFailure(format!(
                    "{} needs a disk number, none known for {}",
                    self.program,
                    device.path.display()
                )));
            }
            None => String::new(),
        };
        let path = device.key();
        let fill = |text: &str| text.replace(DEVICE_PLACEHOLDER, &path).replace(DISK_PLACEHOLDER, &disk);

        Ok(RenderedCommand {
            program: self.program.clone(),
            args: self.args.iter().map(|arg| fill(arg)).collect(),
            stdin: self.stdin.as_deref().map(fill),
        })
    }
}

/// Command line ready to spawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCommand {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl RenderedCommand {
    /// On unix the utility leads its own process group so a kill reaches
    /// everything it started
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        command
    }
}

impl fmt::Display for RenderedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        if let Some(script) = &self.stdin {
            let first = script.lines().next().unwrap_or_default();
            write!(f, " < script ({}...)", first)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diskpart_script_rendering() {
        let device = DeviceIdentity::new(r"\\.\PhysicalDrive2");
        let rendered = FallbackCommand::diskpart().render(&device).unwrap();
        assert_eq!(rendered.program, "diskpart");
        assert_eq!(
            rendered.stdin.as_deref(),
            Some("select disk 2\nonline disk\nattributes disk clear readonly\nclean all\n")
        );
    }

    #[test]
    fn test_diskpart_without_disk_number_is_refused() {
        let device = DeviceIdentity::new("/dev/nvme0n1");
        let err = FallbackCommand::diskpart().render(&device).unwrap_err();
        assert!(matches!(err, EraseError::ExternalToolFailure(_)));
    }

    #[test]
    fn test_blkdiscard_targets_device_path() {
        let device = DeviceIdentity::new("/dev/nvme0n1");
        let rendered = FallbackCommand::blkdiscard().render(&device).unwrap();
        assert_eq!(rendered.args, vec!["--zeroout", "/dev/nvme0n1"]);
        assert_eq!(rendered.to_string(), "blkdiscard --zeroout /dev/nvme0n1");
    }

    #[test]
    fn test_custom_command_from_config() {
        let config = CommandConfig {
            program: "shred".to_string(),
            args: vec!["-n".into(), "1".into(), "{device}".into()],
            stdin: None,
        };
        let rendered = FallbackCommand::from_config(&config)
            .render(&DeviceIdentity::new("/dev/sdc"))
            .unwrap();
        assert_eq!(rendered.args, vec!["-n", "1", "/dev/sdc"]);
    }
}
