//! Helpers for [`std::process::Command`].

use std::ffi::OsStr;
use std::process::Command;

/// Extension trait for [`Command`].
pub trait CommandRunExt {
    /// Render the program and its arguments as a single shell-quoted line,
    /// suitable for logging or for pasting into a terminal.
    fn to_string_pretty(&self) -> String;
}

fn quote_arg(arg: &OsStr) -> String {
    let arg = arg.to_string_lossy();
    // NUL bytes can't be quoted; show them as-is rather than failing.
    shlex::try_quote(&arg)
        .map(|q| q.into_owned())
        .unwrap_or_else(|_| arg.to_string())
}

impl CommandRunExt for Command {
    fn to_string_pretty(&self) -> String {
        std::iter::once(self.get_program())
            .chain(self.get_args())
            .map(quote_arg)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_plain() {
        let mut cmd = Command::new("nydus-image");
        cmd.args(["create", "--bootstrap", "/out/boot", "/rootfs"]);
        similar_asserts::assert_eq!(
            cmd.to_string_pretty(),
            "nydus-image create --bootstrap /out/boot /rootfs"
        );
    }

    #[test]
    fn test_pretty_quoting() {
        let mut cmd = Command::new("/usr/bin/nydus-image");
        cmd.args(["check", "--bootstrap", "/var/tmp/my layer", "--output-json", ""]);
        let pretty = cmd.to_string_pretty();
        assert!(pretty.ends_with(" ''"), "{pretty}");
        let split = shlex::split(&pretty).unwrap();
        assert_eq!(
            split,
            [
                "/usr/bin/nydus-image",
                "check",
                "--bootstrap",
                "/var/tmp/my layer",
                "--output-json",
                ""
            ]
        );
    }
}
