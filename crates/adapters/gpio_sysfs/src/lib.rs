//! # dehum-adapter-gpio-sysfs
//!
//! Hardware-backed [`ActuatorIo`] using the Linux sysfs GPIO interface.
//!
//! Each actuator group is wired as an output pin driving the relay and an
//! input pin reading the relay's contact back. On a BeagleBone Black the
//! dehumidifier relay uses GPIO 60 (P9.12) with feedback on GPIO 48 (P9.15),
//! and the fan relay uses GPIO 50 (P9.14) with feedback on GPIO 51 (P9.16).
//!
//! ## Dependency rule
//! Same as other adapters: depends on `dehum-app` and `dehum-domain`.

mod error;

use std::fs;
use std::path::{Path, PathBuf};

use dehum_app::ports::ActuatorIo;
use dehum_domain::error::DehumError;

pub use error::GpioError;

/// Default sysfs GPIO root.
pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// An output pin and the input pin that observes it.
#[derive(Debug, Clone)]
pub struct SysfsGpioPin {
    output_value: PathBuf,
    input_value: PathBuf,
}

impl SysfsGpioPin {
    /// Open a pin pair under [`SYSFS_GPIO_ROOT`].
    ///
    /// # Errors
    ///
    /// See [`open_at`](Self::open_at).
    pub fn open(output: u32, input: u32) -> Result<Self, GpioError> {
        Self::open_at(SYSFS_GPIO_ROOT, output, input)
    }

    /// Export both pins if needed, set their directions and drive the
    /// output low.
    ///
    /// # Errors
    ///
    /// Returns [`GpioError::Io`] if any sysfs attribute cannot be written.
    pub fn open_at(root: impl AsRef<Path>, output: u32, input: u32) -> Result<Self, GpioError> {
        let root = root.as_ref();
        let output_dir = export(root, output)?;
        let input_dir = export(root, input)?;

        write_attr(&output_dir.join("direction"), "out")?;
        write_attr(&input_dir.join("direction"), "in")?;

        let pin = Self {
            output_value: output_dir.join("value"),
            input_value: input_dir.join("value"),
        };
        write_attr(&pin.output_value, "0")?;
        tracing::debug!(output, input, root = %root.display(), "GPIO pin pair configured");
        Ok(pin)
    }
}

impl ActuatorIo for SysfsGpioPin {
    fn set_level(&mut self, high: bool) -> Result<(), DehumError> {
        write_attr(&self.output_value, if high { "1" } else { "0" })?;
        Ok(())
    }

    fn read_level(&self) -> Result<bool, DehumError> {
        Ok(read_value(&self.input_value)?)
    }
}

fn export(root: &Path, pin: u32) -> Result<PathBuf, GpioError> {
    let dir = root.join(format!("gpio{pin}"));
    if !dir.exists() {
        write_attr(&root.join("export"), &pin.to_string())?;
    }
    Ok(dir)
}

fn write_attr(path: &Path, value: &str) -> Result<(), GpioError> {
    fs::write(path, value).map_err(|source| GpioError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_value(path: &Path) -> Result<bool, GpioError> {
    let raw = fs::read_to_string(path).map_err(|source| GpioError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match raw.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(GpioError::InvalidValue {
            path: path.to_path_buf(),
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_sysfs(pins: &[u32]) -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        for pin in pins {
            let dir = root.path().join(format!("gpio{pin}"));
            fs::create_dir(&dir).unwrap();
            fs::write(dir.join("direction"), "in").unwrap();
            fs::write(dir.join("value"), "1").unwrap();
        }
        root
    }

    fn read(path: PathBuf) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn should_configure_directions_and_drive_output_low() {
        let root = fake_sysfs(&[60, 48]);
        SysfsGpioPin::open_at(root.path(), 60, 48).unwrap();

        assert_eq!(read(root.path().join("gpio60/direction")), "out");
        assert_eq!(read(root.path().join("gpio48/direction")), "in");
        assert_eq!(read(root.path().join("gpio60/value")), "0");
        assert!(!root.path().join("export").exists());
    }

    #[test]
    fn should_write_output_value() {
        let root = fake_sysfs(&[50, 51]);
        let mut pin = SysfsGpioPin::open_at(root.path(), 50, 51).unwrap();

        pin.set_level(true).unwrap();
        assert_eq!(read(root.path().join("gpio50/value")), "1");
        pin.set_level(false).unwrap();
        assert_eq!(read(root.path().join("gpio50/value")), "0");
    }

    #[test]
    fn should_read_feedback_from_input_pin() {
        let root = fake_sysfs(&[60, 48]);
        let pin = SysfsGpioPin::open_at(root.path(), 60, 48).unwrap();

        fs::write(root.path().join("gpio48/value"), "1\n").unwrap();
        assert!(pin.read_level().unwrap());
        fs::write(root.path().join("gpio48/value"), "0\n").unwrap();
        assert!(!pin.read_level().unwrap());
    }

    #[test]
    fn should_reject_garbage_value() {
        let root = fake_sysfs(&[60, 48]);
        fs::write(root.path().join("gpio48/value"), "high").unwrap();
        let err = read_value(&root.path().join("gpio48/value")).unwrap_err();
        assert!(matches!(err, GpioError::InvalidValue { value, .. } if value == "high"));
    }

    #[test]
    fn should_export_missing_pin_before_configuring() {
        let root = tempfile::tempdir().unwrap();
        let err = SysfsGpioPin::open_at(root.path(), 60, 48).unwrap_err();

        // The fake root has no kernel behind it, so the pin directory never
        // appears and configuring the direction fails.
        assert_eq!(read(root.path().join("export")), "48");
        assert!(matches!(err, GpioError::Io { path, .. } if path.ends_with("gpio60/direction")));
    }

    #[test]
    fn should_surface_io_errors_as_actuator_errors() {
        let root = fake_sysfs(&[60, 48]);
        let pin = SysfsGpioPin::open_at(root.path(), 60, 48).unwrap();
        fs::remove_file(root.path().join("gpio48/value")).unwrap();
        assert!(matches!(pin.read_level(), Err(DehumError::Actuator(_))));
    }
}
