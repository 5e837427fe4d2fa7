// src/gadget/command.rs

//! Gadget commands and the job scripts rendered from them.

use crate::config::CommandEntry;

/// One shell command produced by a gadget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub text: String,
    /// Echoed as `>>>> comment` before the command runs.
    pub comment: Option<String>,
    /// Stop the script if this command fails (only when there are several).
    pub check_exit_after: bool,
    /// Run through the module tool when the gadget loads modules.
    pub use_module_prefix: bool,
}

impl Command {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            comment: None,
            check_exit_after: true,
            use_module_prefix: true,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn without_exit_check(mut self) -> Self {
        self.check_exit_after = false;
        self
    }

    pub fn without_modules(mut self) -> Self {
        self.use_module_prefix = false;
        self
    }

    /// Build from a config entry whose command text has already been
    /// expanded to `text`.
    pub fn from_entry(entry: &CommandEntry, text: String) -> Self {
        match entry {
            CommandEntry::Plain(_) => Command::new(text),
            CommandEntry::Detailed {
                comment,
                check_exit,
                use_modules,
                ..
            } => Command {
                text,
                comment: comment.clone(),
                check_exit_after: *check_exit,
                use_module_prefix: *use_modules,
            },
        }
    }
}

/// Quote `s` for a POSIX shell.
pub fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:+,@%".contains(c));
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

/// Render commands as a POSIX `sh` script.
///
/// With more than one command, every command except the last that asks for
/// it is followed by an exit-status check, so the script stops at the first
/// failure and exits with that status.
pub fn render_script(commands: &[Command], module_tool: &str, modules: &[String]) -> String {
    let prefix = if modules.is_empty() {
        None
    } else {
        let flags: Vec<String> = modules
            .iter()
            .map(|m| format!("-m {}", shell_quote(m)))
            .collect();
        Some(format!("{module_tool} {}", flags.join(" ")))
    };
    let check_exits = commands.len() > 1;

    let mut script = String::from("#!/bin/sh\n");
    for (idx, cmd) in commands.iter().enumerate() {
        if let Some(comment) = &cmd.comment {
            script.push_str(&format!("echo {}\n", shell_quote(&format!(">>>> {comment}"))));
        }
        match (&prefix, cmd.use_module_prefix) {
            (Some(prefix), true) => script.push_str(&format!("{prefix} {}\n", cmd.text)),
            _ => script.push_str(&format!("{}\n", cmd.text)),
        }
        let last = idx + 1 == commands.len();
        if check_exits && cmd.check_exit_after && !last {
            script.push_str("rc=$?; if [ $rc -ne 0 ]; then exit $rc; fi\n");
        }
    }
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_command_has_no_exit_check() {
        let script = render_script(&[Command::new("./simv")], "runmod", &[]);
        assert_eq!(script, "#!/bin/sh\n./simv\n");
    }

    #[test]
    fn comments_modules_and_exit_checks() {
        let commands = vec![
            Command::new("export SYNOPSYS_SIM_SETUP=cn.setup")
                .without_exit_check()
                .without_modules(),
            Command::new("vlogan -f cn.flist").with_comment("Running vlogan..."),
            Command::new("vcs -genip cn").with_comment("Running vcs..."),
        ];
        let script = render_script(&commands, "runmod", &["vcs".into(), "verdi".into()]);
        assert_eq!(
            script,
            "#!/bin/sh\n\
             export SYNOPSYS_SIM_SETUP=cn.setup\n\
             echo '>>>> Running vlogan...'\n\
             runmod -m vcs -m verdi vlogan -f cn.flist\n\
             rc=$?; if [ $rc -ne 0 ]; then exit $rc; fi\n\
             echo '>>>> Running vcs...'\n\
             runmod -m vcs -m verdi vcs -genip cn\n"
        );
    }

    #[test]
    fn quoting() {
        assert_eq!(shell_quote("/p/.gogo/.cn.sh"), "/p/.gogo/.cn.sh");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }
}
